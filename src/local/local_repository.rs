use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::maven::coordinates::MavenArtifactRef;
use crate::util::blob::BlobStream;

/// The on-disk cache that resolved artifacts are materialized into
#[async_trait]
pub trait LocalRepository: Send + Sync {
    /// Where an artifact lives (or would live) in this repository
    fn path_of(&self, artifact_ref: &MavenArtifactRef) -> PathBuf;

    /// modification time of the cached file, `None` if it is not cached
    async fn last_updated(&self, artifact_ref: &MavenArtifactRef) -> anyhow::Result<Option<SystemTime>>;

    /// Stores the data, replacing any previous version. Either the complete file is in place
    ///  afterwards, or nothing changed.
    async fn insert(&self, artifact_ref: &MavenArtifactRef, data: BlobStream) -> anyhow::Result<PathBuf>;
}
