use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::error::{RepositoryFailure, ResolveError};
use crate::local::local_repository::LocalRepository;
use crate::maven::coordinates::{ArtifactCoordinate, MavenArtifactRef, MavenCoordinates};
use crate::maven::handlers::ArtifactHandlers;
use crate::maven::repository::{ChecksumPolicy, RemoteRepository, RepositoryPolicy};
use crate::resolve::connector::RepositoryConnector;
use crate::resolve::version_resolver::VersionResolver;
use crate::util::blob::Blob;
use crate::util::validating_stream::{parse_checksum, BodyValidator, Md5BodyValidator, Sha1BodyValidator, ValidatingStream};

/// An artifact that is now present in the local repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// the requested coordinate with its version made concrete
    pub coordinate: ArtifactCoordinate,
    pub artifact: MavenArtifactRef,
    pub path: PathBuf,
    /// `None` if the local copy was used without downloading
    pub repository: Option<String>,
}

#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve(&self, coordinate: &ArtifactCoordinate, repositories: &[RemoteRepository]) -> Result<ResolvedArtifact, ResolveError>;
}

/// Tries repositories in order and stores the first successful download in the local repository
pub struct DefaultArtifactResolver {
    connector: Arc<dyn RepositoryConnector>,
    local: Arc<dyn LocalRepository>,
    handlers: ArtifactHandlers,
    versions: VersionResolver,
}
impl DefaultArtifactResolver {
    pub fn new(connector: Arc<dyn RepositoryConnector>, local: Arc<dyn LocalRepository>, handlers: ArtifactHandlers) -> DefaultArtifactResolver {
        DefaultArtifactResolver {
            versions: VersionResolver::new(connector.clone()),
            connector,
            local,
            handlers,
        }
    }

    async fn try_repository(&self, repository: &RemoteRepository, artifact_ref: &MavenArtifactRef, policy: &RepositoryPolicy) -> anyhow::Result<Option<PathBuf>> {
        let remote_ref = self.versions.resolve_snapshot(repository, artifact_ref).await;
        let path = repository.layout.path_of(&remote_ref);
        debug!("looking for {} in {}", path, repository);

        let Some(Blob { data, md5, sha1 }) = self.connector.get(repository, &path).await? else {
            return Ok(None);
        };

        let description = format!("{} from {}", remote_ref, repository.id);
        let validators = self.validators_for(repository, &path, sha1, md5, policy.checksum, &description).await?;
        let data = ValidatingStream::new(data, validators, policy.checksum, &description);

        let local_path = self.local.insert(artifact_ref, Box::pin(data)).await?;
        Ok(Some(local_path))
    }

    /// Checksums announced in response headers take precedence over sidecar files, SHA1 over MD5
    async fn validators_for(
        &self,
        repository: &RemoteRepository,
        path: &str,
        header_sha1: Option<[u8;20]>,
        header_md5: Option<[u8;16]>,
        policy: ChecksumPolicy,
        description: &str,
    ) -> anyhow::Result<Vec<Box<dyn BodyValidator>>> {
        if policy == ChecksumPolicy::Ignore {
            return Ok(vec![]);
        }

        let sha1 = match header_sha1 {
            Some(sha1) => Some(sha1),
            None => self.sidecar_checksum::<[u8;20]>(repository, &format!("{}.sha1", path)).await,
        };
        if let Some(sha1) = sha1 {
            let validator: Box<dyn BodyValidator> = Box::new(Sha1BodyValidator::new(sha1));
            return Ok(vec![validator]);
        }

        let md5 = match header_md5 {
            Some(md5) => Some(md5),
            None => self.sidecar_checksum::<[u8;16]>(repository, &format!("{}.md5", path)).await,
        };
        if let Some(md5) = md5 {
            let validator: Box<dyn BodyValidator> = Box::new(Md5BodyValidator::new(md5));
            return Ok(vec![validator]);
        }

        match policy {
            ChecksumPolicy::Fail => Err(anyhow::Error::msg(format!("no valid checksum available for {}", description))),
            _ => {
                warn!("no valid checksum available for {}, accepting it unverified", description);
                Ok(vec![])
            }
        }
    }

    async fn sidecar_checksum<T: hex::FromHex>(&self, repository: &RemoteRepository, path: &str) -> Option<T> {
        let content = match self.connector.get(repository, path).await {
            Ok(Some(blob)) => blob.into_bytes().await,
            Ok(None) => return None,
            Err(e) => Err(e),
        };
        match content {
            Ok(content) => {
                let result = parse_checksum(&content);
                if result.is_none() {
                    debug!("{} in {} is not a valid checksum", path, repository.id);
                }
                result
            }
            Err(e) => {
                debug!("could not fetch {} from {}: {:#}", path, repository.id, e);
                None
            }
        }
    }
}

#[async_trait]
impl ArtifactResolver for DefaultArtifactResolver {
    async fn resolve(&self, coordinate: &ArtifactCoordinate, repositories: &[RemoteRepository]) -> Result<ResolvedArtifact, ResolveError> {
        let version = self.versions.resolve(coordinate, repositories).await?;

        let artifact_ref = MavenArtifactRef {
            coordinates: MavenCoordinates {
                group_id: coordinate.group_id.clone(),
                artifact_id: coordinate.artifact_id.clone(),
                version: version.clone(),
            },
            classifier: coordinate.classifier.clone(),
            file_extension: self.handlers.extension_for(&coordinate.packaging),
        };
        let resolved = |path: PathBuf, repository: Option<&str>| ResolvedArtifact {
            coordinate: coordinate.clone().with_version(version.base_version()),
            artifact: artifact_ref.clone(),
            path,
            repository: repository.map(str::to_string),
        };

        let cached = match self.local.last_updated(&artifact_ref).await {
            Ok(c) => c,
            Err(e) => {
                debug!("could not check local copy of {}: {:#}", artifact_ref, e);
                None
            }
        };
        if let Some(last_updated) = cached {
            let now = SystemTime::now();
            let enabled: Vec<&RepositoryPolicy> = repositories.iter()
                .map(|r| r.policy_for(&version))
                .filter(|p| p.enabled)
                .collect();
            // the strictest update policy in the list decides
            if !enabled.is_empty() && enabled.iter().all(|p| !p.update.is_update_required(last_updated, now)) {
                trace!("local copy of {} is up to date for every repository", artifact_ref);
                return Ok(resolved(self.local.path_of(&artifact_ref), None));
            }
        }

        let mut failures = vec![];
        for repository in repositories {
            let policy = repository.policy_for(&version);
            if !policy.enabled {
                let kind = if version.is_snapshot() { "snapshots" } else { "releases" };
                failures.push(RepositoryFailure {
                    repository: repository.id.clone(),
                    reason: format!("disabled for {}", kind),
                });
                continue;
            }

            match self.try_repository(repository, &artifact_ref, policy).await {
                Ok(Some(path)) => {
                    debug!("downloaded {} from {} to {}", artifact_ref, repository.id, path.display());
                    return Ok(resolved(path, Some(&repository.id)));
                }
                Ok(None) => {
                    failures.push(RepositoryFailure {
                        repository: repository.id.clone(),
                        reason: "not found".to_string(),
                    });
                }
                Err(e) => {
                    debug!("failed to fetch {} from {}: {:#}", artifact_ref, repository.id, e);
                    failures.push(RepositoryFailure {
                        repository: repository.id.clone(),
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        if cached.is_some() {
            warn!("could not refresh {} from any repository, using local copy", artifact_ref);
            return Ok(resolved(self.local.path_of(&artifact_ref), None));
        }

        Err(ResolveError::ArtifactNotFound {
            artifact: artifact_ref.to_string(),
            failures,
        })
    }
}
