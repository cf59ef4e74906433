//! The `get` goal: resolve one artifact, or an artifact and its dependencies, into the local
//! repository.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, GetError};
use crate::local::fs_local_repository::FsLocalRepository;
use crate::maven::coordinates::{ArtifactCoordinate, MavenClassifier, DEFAULT_PACKAGING};
use crate::maven::handlers::ArtifactHandlers;
use crate::maven::layout::{LayoutRegistry, DEFAULT_LAYOUT};
use crate::maven::registry::build_repository_list;
use crate::maven::repository::{RemoteRepository, RepositoryPolicy};
use crate::maven::settings::Settings;
use crate::resolve::artifact_resolver::{ArtifactResolver, DefaultArtifactResolver, ResolvedArtifact};
use crate::resolve::connector::DefaultRepositoryConnector;
use crate::resolve::dependency_collector::DependencyCollector;
use crate::resolve::dependency_resolver::{DependencyResolver, NodeFailure, TransitiveResolver};
use crate::resolve::descriptor_reader::PomDescriptorReader;

pub const REPOSITORY_BASE_ID: &str = "repositoryBase";

/// One invocation's parameters. A compact `artifact` takes precedence over the discrete fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub artifact: Option<String>,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub packaging: String,
    pub transitive: bool,
    pub remote_repositories: Option<String>,
    pub repository_base: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
}
impl Default for GetRequest {
    fn default() -> Self {
        GetRequest {
            artifact: None,
            group_id: None,
            artifact_id: None,
            version: None,
            classifier: None,
            packaging: DEFAULT_PACKAGING.to_string(),
            transitive: true,
            remote_repositories: None,
            repository_base: None,
            output_directory: None,
        }
    }
}
impl GetRequest {
    pub fn coordinate(&self) -> Result<ArtifactCoordinate, ConfigError> {
        let given = |s: &Option<String>| s.clone().filter(|s| !s.trim().is_empty());

        if let Some(artifact) = given(&self.artifact) {
            return ArtifactCoordinate::parse(artifact.trim());
        }

        match (given(&self.group_id), given(&self.artifact_id), given(&self.version)) {
            (Some(group_id), Some(artifact_id), Some(version)) => {
                Ok(ArtifactCoordinate::new(&group_id, &artifact_id, &version)
                    .with_packaging(&self.packaging)
                    .with_classifier(MavenClassifier::from_optional(self.classifier.as_deref())))
            }
            _ => Err(ConfigError::MissingArtifact),
        }
    }
}

/// What an invocation retrieved. In transitive mode, nodes that could not be resolved are listed
///  in `failed` rather than failing the whole invocation.
#[derive(Debug, Default)]
pub struct GetReport {
    pub resolved: Vec<ResolvedArtifact>,
    pub failed: Vec<NodeFailure>,
}
impl GetReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            resolved: self.resolved.iter()
                .map(|r| ResolvedEntry {
                    coordinate: r.coordinate.to_string(),
                    path: r.path.clone(),
                    repository: r.repository.clone(),
                })
                .collect(),
            failed: self.failed.iter()
                .map(|f| FailedEntry {
                    coordinate: f.coordinate.to_string(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summary())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub resolved: Vec<ResolvedEntry>,
    pub failed: Vec<FailedEntry>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub coordinate: String,
    pub path: PathBuf,
    pub repository: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub coordinate: String,
    pub error: String,
}

pub struct GetGoal {
    artifact_resolver: Arc<dyn ArtifactResolver>,
    dependency_resolver: Arc<dyn DependencyResolver>,
    layouts: LayoutRegistry,
    settings: Settings,
    project_repositories: Vec<RemoteRepository>,
}
impl GetGoal {
    pub fn new(
        artifact_resolver: Arc<dyn ArtifactResolver>,
        dependency_resolver: Arc<dyn DependencyResolver>,
        layouts: LayoutRegistry,
        settings: Settings,
        project_repositories: Vec<RemoteRepository>,
    ) -> GetGoal {
        GetGoal {
            artifact_resolver,
            dependency_resolver,
            layouts,
            settings,
            project_repositories,
        }
    }

    /// HTTP(S) and file repositories, a local repository on the file system, POM descriptors
    pub fn standard(local_repository: &Path, settings: Settings, project_repositories: Vec<RemoteRepository>, timeout: Duration) -> GetGoal {
        let connector = Arc::new(DefaultRepositoryConnector::new(timeout));
        let local = Arc::new(FsLocalRepository::new(local_repository));
        let artifact_resolver: Arc<dyn ArtifactResolver> = Arc::new(DefaultArtifactResolver::new(connector, local, ArtifactHandlers::default()));

        let reader = Arc::new(PomDescriptorReader::new(artifact_resolver.clone()));
        let dependency_resolver = Arc::new(TransitiveResolver::new(DependencyCollector::new(reader), artifact_resolver.clone()));

        GetGoal::new(artifact_resolver, dependency_resolver, LayoutRegistry::default(), settings, project_repositories)
    }

    pub async fn execute(&self, request: &GetRequest) -> Result<GetReport, GetError> {
        let coordinate = request.coordinate()?;
        let repositories = self.repositories(request)?;

        let mut report = GetReport::default();
        if request.transitive {
            debug!("resolving {} with its dependencies", coordinate);
            let mut outcomes = self.dependency_resolver
                .resolve_transitive(&coordinate, Arc::from(repositories))
                .await?;
            while let Some(outcome) = outcomes.next().await {
                match outcome {
                    Ok(resolved) => report.resolved.push(resolved),
                    Err(failure) => {
                        warn!("Couldn't download artifact {}: {}", failure.coordinate, failure.error);
                        report.failed.push(failure);
                    }
                }
            }
        }
        else {
            info!("Resolving {}", coordinate);
            let resolved = self.artifact_resolver.resolve(&coordinate, &repositories).await?;
            report.resolved.push(resolved);
        }

        if let Some(output_directory) = &request.output_directory {
            copy_to(output_directory, &report.resolved).await?;
        }

        info!("resolved {} artifact(s), {} failed", report.resolved.len(), report.failed.len());
        Ok(report)
    }

    /// Mirrors, proxies and credentials never apply to the repository base, so it is added
    ///  after injection
    fn repositories(&self, request: &GetRequest) -> Result<Vec<RemoteRepository>, ConfigError> {
        let mut result = build_repository_list(
            &self.project_repositories,
            request.remote_repositories.as_deref(),
            &self.layouts,
            &self.settings,
        )?;

        if let Some(base) = &request.repository_base {
            let layout = self.layouts.lookup(DEFAULT_LAYOUT)
                .ok_or_else(|| ConfigError::InvalidLayout { id: DEFAULT_LAYOUT.to_string() })?;
            let url = format!("file://{}", base.display());
            result.insert(0, RemoteRepository::new(REPOSITORY_BASE_ID, &url, layout, RepositoryPolicy::always_warn()));
        }
        Ok(result)
    }
}

async fn copy_to(output_directory: &Path, resolved: &[ResolvedArtifact]) -> Result<(), GetError> {
    tokio::fs::create_dir_all(output_directory).await
        .map_err(|source| GetError::Copy {
            from: output_directory.to_path_buf(),
            to: output_directory.to_path_buf(),
            source,
        })?;

    for r in resolved {
        let Some(file_name) = r.path.file_name() else {
            continue;
        };
        let target = output_directory.join(file_name);
        tokio::fs::copy(&r.path, &target).await
            .map_err(|source| GetError::Copy {
                from: r.path.clone(),
                to: target.clone(),
                source,
            })?;
        debug!("copied {} to {}", r.path.display(), target.display());
    }
    Ok(())
}
