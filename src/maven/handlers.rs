use std::collections::HashMap;

/// How a dependency type is stored in a repository. Several types share the "jar" extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandler {
    pub extension: String,
}

/// Maps dependency types (e.g. "test-jar") to their handler. Types without a registered handler
///  use the type name as file extension.
#[derive(Debug, Clone)]
pub struct ArtifactHandlers {
    handlers: HashMap<String, ArtifactHandler>,
}
impl ArtifactHandlers {
    pub fn empty() -> ArtifactHandlers {
        ArtifactHandlers {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, artifact_type: &str, extension: &str) {
        self.handlers.insert(artifact_type.to_string(), ArtifactHandler {
            extension: extension.to_string(),
        });
    }

    pub fn handler(&self, artifact_type: &str) -> ArtifactHandler {
        self.handlers.get(artifact_type)
            .cloned()
            .unwrap_or_else(|| ArtifactHandler { extension: artifact_type.to_string() })
    }

    pub fn extension_for(&self, artifact_type: &str) -> String {
        self.handler(artifact_type).extension
    }
}

impl Default for ArtifactHandlers {
    fn default() -> Self {
        let mut result = ArtifactHandlers::empty();
        for (artifact_type, extension) in [
            ("pom", "pom"),
            ("jar", "jar"),
            ("test-jar", "jar"),
            ("maven-plugin", "jar"),
            ("ejb", "jar"),
            ("ejb-client", "jar"),
            ("java-source", "jar"),
            ("javadoc", "jar"),
            ("bundle", "jar"),
            ("war", "war"),
            ("ear", "ear"),
            ("rar", "rar"),
            ("par", "par"),
        ] {
            result.register(artifact_type, extension);
        }
        result
    }
}
