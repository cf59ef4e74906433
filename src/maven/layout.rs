use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::maven::coordinates::{MavenArtifactId, MavenArtifactRef, MavenGroupId};
use crate::maven::paths::{as_maven_path, maven_file_name, metadata_path, MAVEN_METADATA_XML};

pub const DEFAULT_LAYOUT: &str = "default";
pub const FLAT_LAYOUT: &str = "flat";

/// Maps artifacts to relative paths inside a remote repository
pub trait RepositoryLayout: Debug + Send + Sync {
    fn id(&self) -> &str;

    fn path_of(&self, artifact_ref: &MavenArtifactRef) -> String;

    fn metadata_path_of(&self, group_id: &MavenGroupId, artifact_id: &MavenArtifactId, version: Option<&str>) -> String;
}

/// groupId (dots as slashes) / artifactId / version / file
#[derive(Debug)]
pub struct DefaultLayout;
impl RepositoryLayout for DefaultLayout {
    fn id(&self) -> &str {
        DEFAULT_LAYOUT
    }

    fn path_of(&self, artifact_ref: &MavenArtifactRef) -> String {
        as_maven_path(artifact_ref)
    }

    fn metadata_path_of(&self, group_id: &MavenGroupId, artifact_id: &MavenArtifactId, version: Option<&str>) -> String {
        metadata_path(group_id, artifact_id, version)
    }
}

/// all files in a single directory
#[derive(Debug)]
pub struct FlatLayout;
impl RepositoryLayout for FlatLayout {
    fn id(&self) -> &str {
        FLAT_LAYOUT
    }

    fn path_of(&self, artifact_ref: &MavenArtifactRef) -> String {
        maven_file_name(artifact_ref)
    }

    fn metadata_path_of(&self, _group_id: &MavenGroupId, _artifact_id: &MavenArtifactId, _version: Option<&str>) -> String {
        MAVEN_METADATA_XML.to_string()
    }
}

/// Named layouts that repository specifications can refer to
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    layouts: HashMap<String, Arc<dyn RepositoryLayout>>,
}
impl LayoutRegistry {
    pub fn empty() -> LayoutRegistry {
        LayoutRegistry {
            layouts: HashMap::new(),
        }
    }

    pub fn register(&mut self, layout: Arc<dyn RepositoryLayout>) {
        self.layouts.insert(layout.id().to_string(), layout);
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<dyn RepositoryLayout>> {
        self.layouts.get(id).cloned()
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        let mut result = LayoutRegistry::empty();
        result.register(Arc::new(DefaultLayout));
        result.register(Arc::new(FlatLayout));
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::maven::coordinates::*;

    #[test]
    fn test_lookup() {
        let registry = LayoutRegistry::default();
        assert_eq!(registry.lookup("default").unwrap().id(), "default");
        assert_eq!(registry.lookup("flat").unwrap().id(), "flat");
        assert!(registry.lookup("legacy").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_flat_layout() {
        let artifact_ref = MavenArtifactRef {
            coordinates: MavenCoordinates {
                group_id: MavenGroupId("org.example".to_string()),
                artifact_id: MavenArtifactId("lib".to_string()),
                version: MavenVersion::parse("1.2"),
            },
            classifier: MavenClassifier::Classified("javadoc".to_string()),
            file_extension: "jar".to_string(),
        };
        assert_eq!(FlatLayout.path_of(&artifact_ref), "lib-1.2-javadoc.jar");
        assert_eq!(DefaultLayout.path_of(&artifact_ref), "org/example/lib/1.2/lib-1.2-javadoc.jar");
    }
}
