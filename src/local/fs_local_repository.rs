use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use futures::StreamExt;
use sha1::{Digest, Sha1};
use tokio::fs::{create_dir_all, metadata, remove_file, rename, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, trace};
use uuid::Uuid;

use crate::local::local_repository::LocalRepository;
use crate::maven::coordinates::MavenArtifactRef;
use crate::maven::paths::as_local_path;
use crate::util::blob::BlobStream;

/// Local repository in the standard Maven directory layout, with a '.sha1' file next to each
///  artifact
pub struct FsLocalRepository {
    root: PathBuf,
}
impl FsLocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> FsLocalRepository {
        FsLocalRepository {
            root: root.into(),
        }
    }

    fn temp_path_for(target: &Path) -> PathBuf {
        let file_name = target.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        target.with_file_name(format!("{}.{}.part", file_name, Uuid::new_v4().as_hyphenated()))
    }

    fn sha1_path_for(target: &Path) -> PathBuf {
        let mut result = target.as_os_str().to_owned();
        result.push(".sha1");
        result.into()
    }

    async fn do_insert(temp_path: &Path, mut data: BlobStream) -> anyhow::Result<[u8;20]> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(temp_path)
            .await?;

        let mut sha1_hasher: Sha1 = Default::default();

        while let Some(bytes) = data.next().await {
            let bytes = bytes?;
            sha1_hasher.update(&bytes);
            file.write_all(&bytes).await?;
        }
        file.flush().await?;

        Ok(sha1_hasher.finalize().into())
    }
}

#[async_trait]
impl LocalRepository for FsLocalRepository {
    fn path_of(&self, artifact_ref: &MavenArtifactRef) -> PathBuf {
        self.root.join(as_local_path(artifact_ref))
    }

    async fn last_updated(&self, artifact_ref: &MavenArtifactRef) -> anyhow::Result<Option<SystemTime>> {
        match metadata(self.path_of(artifact_ref)).await {
            Ok(m) if m.is_file() => Ok(Some(m.modified()?)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(&self, artifact_ref: &MavenArtifactRef, data: BlobStream) -> anyhow::Result<PathBuf> {
        let target = self.path_of(artifact_ref);
        let temp_path = Self::temp_path_for(&target);

        trace!("inserting {} - temp file is {}", artifact_ref, temp_path.display());

        if let Some(parent) = target.parent() {
            create_dir_all(parent).await?;
        }

        match Self::do_insert(&temp_path, data).await {
            Ok(sha1) => {
                rename(&temp_path, &target).await?;
                tokio::fs::write(Self::sha1_path_for(&target), hex::encode(sha1)).await?;
                trace!("stored {} at {}", artifact_ref, target.display());
                Ok(target)
            }
            Err(e) => {
                match remove_file(&temp_path).await {
                    Ok(_) => {}
                    Err(cleanup) if cleanup.kind() == ErrorKind::NotFound => {}
                    Err(cleanup) => {
                        error!("error cleaning up {} after failed attempt to insert: {}", temp_path.display(), cleanup);
                    }
                }
                Err(e)
            }
        }
    }
}
