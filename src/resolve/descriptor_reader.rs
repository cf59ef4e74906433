use std::path::PathBuf;
use std::sync::Arc;

use async_recursion::async_recursion;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::maven::coordinates::{ArtifactCoordinate, MavenClassifier, DEFAULT_PACKAGING};
use crate::maven::pom::{self, effective_model, Project};
use crate::maven::repository::RemoteRepository;
use crate::resolve::artifact_resolver::ArtifactResolver;

/// ancestors beyond this are treated as a broken (probably cyclic) parent chain
const MAX_PARENT_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyScope {
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
}
impl DependencyScope {
    /// missing or unknown scopes mean 'compile'
    pub fn from_declared(scope: Option<&str>) -> DependencyScope {
        match scope.map(str::trim) {
            Some("provided") => DependencyScope::Provided,
            Some("runtime") => DependencyScope::Runtime,
            Some("test") => DependencyScope::Test,
            Some("system") => DependencyScope::System,
            Some("import") => DependencyScope::Import,
            _ => DependencyScope::Compile,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyScope::Compile => "compile",
            DependencyScope::Provided => "provided",
            DependencyScope::Runtime => "runtime",
            DependencyScope::Test => "test",
            DependencyScope::System => "system",
            DependencyScope::Import => "import",
        }
    }

    /// The scope a transitive dependency with scope `declared` gets when reached through a
    ///  dependency with this scope
    pub fn propagate(&self, declared: DependencyScope) -> DependencyScope {
        match self {
            DependencyScope::Compile => declared,
            other => *other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub coordinate: ArtifactCoordinate,
    pub scope: DependencyScope,
    pub optional: bool,
    /// (groupId, artifactId), either may be '*'
    pub exclusions: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub coordinate: ArtifactCoordinate,
    pub packaging: String,
    pub dependencies: Vec<DeclaredDependency>,
}

/// Source of an artifact's declared dependencies
#[async_trait]
pub trait DescriptorReader: Send + Sync {
    async fn read(&self, coordinate: &ArtifactCoordinate, repositories: &[RemoteRepository]) -> Result<ArtifactDescriptor, ResolveError>;
}

/// Reads descriptors from POM files, fetching them (and their parents) through an artifact
///  resolver so that they end up in the local repository
pub struct PomDescriptorReader {
    resolver: Arc<dyn ArtifactResolver>,
}
impl PomDescriptorReader {
    pub fn new(resolver: Arc<dyn ArtifactResolver>) -> PomDescriptorReader {
        PomDescriptorReader {
            resolver,
        }
    }

    async fn load(&self, coordinate: &ArtifactCoordinate, repositories: &[RemoteRepository]) -> Result<(PathBuf, Project), ResolveError> {
        let pom_coordinate = coordinate.clone()
            .with_packaging("pom")
            .with_classifier(MavenClassifier::Unclassified);

        let resolved = self.resolver.resolve(&pom_coordinate, repositories).await?;
        let data = tokio::fs::read(&resolved.path).await
            .map_err(|source| ResolveError::Io { path: resolved.path.clone(), source })?;
        let project = pom::parse(&data)
            .map_err(|e| ResolveError::InvalidDescriptor { path: resolved.path.clone(), message: format!("{:#}", e) })?;
        Ok((resolved.path, project))
    }

    /// appends the parent of the last POM in `chain`, its parent and so on
    #[async_recursion]
    async fn load_ancestors(&self, chain: &mut Vec<(PathBuf, Project)>, repositories: &[RemoteRepository]) -> Result<(), ResolveError> {
        let Some((path, project)) = chain.last() else {
            return Ok(());
        };
        let Some(parent) = &project.parent else {
            return Ok(());
        };
        if chain.len() > MAX_PARENT_DEPTH {
            return Err(ResolveError::InvalidDescriptor {
                path: path.clone(),
                message: format!("more than {} parent POMs", MAX_PARENT_DEPTH),
            });
        }

        let parent_coordinate = ArtifactCoordinate::new(&parent.groupId, &parent.artifactId, &parent.version);
        debug!("reading parent POM {}", parent_coordinate);

        let loaded = self.load(&parent_coordinate, repositories).await
            .map_err(|e| ResolveError::Descriptor {
                artifact: parent_coordinate.to_string(),
                source: Box::new(e),
            })?;
        chain.push(loaded);
        self.load_ancestors(chain, repositories).await
    }
}

#[async_trait]
impl DescriptorReader for PomDescriptorReader {
    async fn read(&self, coordinate: &ArtifactCoordinate, repositories: &[RemoteRepository]) -> Result<ArtifactDescriptor, ResolveError> {
        let mut chain = vec![self.load(coordinate, repositories).await?];
        self.load_ancestors(&mut chain, repositories).await?;

        let projects: Vec<Project> = chain.iter().map(|(_, p)| p.clone()).collect();
        let model = effective_model(&projects)
            .map_err(|message| ResolveError::InvalidDescriptor { path: chain[0].0.clone(), message })?;

        let mut dependencies = vec![];
        for d in model.dependencies {
            let Some(version) = d.version.as_deref() else {
                warn!("dependency {}:{} of {} has no version, skipping it", d.groupId, d.artifactId, coordinate);
                continue;
            };
            let dependency_coordinate = ArtifactCoordinate::new(&d.groupId, &d.artifactId, version)
                .with_packaging(d.dependency_type.as_deref().unwrap_or(DEFAULT_PACKAGING))
                .with_classifier(MavenClassifier::from_optional(d.classifier.as_deref()));

            dependencies.push(DeclaredDependency {
                coordinate: dependency_coordinate,
                scope: DependencyScope::from_declared(d.scope.as_deref()),
                optional: d.is_optional(),
                exclusions: d.exclusion_list().iter()
                    .map(|e| (e.groupId.clone(), e.artifactId.clone()))
                    .collect(),
            });
        }

        Ok(ArtifactDescriptor {
            coordinate: coordinate.clone(),
            packaging: model.packaging,
            dependencies,
        })
    }
}
