use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::trace;

use crate::maven::repository::RemoteRepository;
use crate::util::blob::Blob;
use crate::util::validating_http_downloader::ValidatingHttpDownloader;

/// Transport seam: fetches files from a remote repository by layout-relative path
#[async_trait]
pub trait RepositoryConnector: Send + Sync {
    /// `None` if the repository does not have the file
    async fn get(&self, repository: &RemoteRepository, path: &str) -> anyhow::Result<Option<Blob>>;
}

/// HTTP(S), keeping one downloader (and thus one connection pool) per repository
pub struct HttpRepositoryConnector {
    timeout: Duration,
    downloaders: Mutex<HashMap<(String, String), Arc<ValidatingHttpDownloader>>>,
}
impl HttpRepositoryConnector {
    pub fn new(timeout: Duration) -> HttpRepositoryConnector {
        HttpRepositoryConnector {
            timeout,
            downloaders: Default::default(),
        }
    }

    fn downloader_for(&self, repository: &RemoteRepository) -> anyhow::Result<Arc<ValidatingHttpDownloader>> {
        let mut downloaders = self.downloaders.lock()
            .map_err(|_| anyhow::Error::msg("downloader cache poisoned"))?;

        let key = (repository.id.clone(), repository.url.clone());
        if let Some(d) = downloaders.get(&key) {
            return Ok(d.clone());
        }

        let downloader = Arc::new(ValidatingHttpDownloader::new(repository, self.timeout)?);
        downloaders.insert(key, downloader.clone());
        Ok(downloader)
    }
}

#[async_trait]
impl RepositoryConnector for HttpRepositoryConnector {
    async fn get(&self, repository: &RemoteRepository, path: &str) -> anyhow::Result<Option<Blob>> {
        let downloader = self.downloader_for(repository)?;
        downloader.get(path).await
    }
}

/// Repositories on the local file system, e.g. `file:///var/cache/m2`
pub struct FileRepositoryConnector {}

impl FileRepositoryConnector {
    fn base_dir(repository: &RemoteRepository) -> anyhow::Result<PathBuf> {
        let url = &repository.url;
        let path = url.strip_prefix("file://")
            .or_else(|| url.strip_prefix("file:"))
            .ok_or_else(|| anyhow::Error::msg(format!("not a file URL: {}", url)))?;
        Ok(PathBuf::from(path))
    }
}

#[async_trait]
impl RepositoryConnector for FileRepositoryConnector {
    async fn get(&self, repository: &RemoteRepository, path: &str) -> anyhow::Result<Option<Blob>> {
        let file_path = Self::base_dir(repository)?.join(path);
        trace!("reading {}", file_path.display());

        match File::open(&file_path).await {
            Ok(file) => {
                if !file.metadata().await?.is_file() {
                    return Ok(None);
                }
                let data = ReaderStream::new(file)
                    .map(|chunk| chunk.map_err(anyhow::Error::from));
                Ok(Some(Blob::new(data)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Dispatches on the repository URL's protocol
pub struct DefaultRepositoryConnector {
    http: HttpRepositoryConnector,
    file: FileRepositoryConnector,
}
impl DefaultRepositoryConnector {
    pub fn new(timeout: Duration) -> DefaultRepositoryConnector {
        DefaultRepositoryConnector {
            http: HttpRepositoryConnector::new(timeout),
            file: FileRepositoryConnector {},
        }
    }
}

#[async_trait]
impl RepositoryConnector for DefaultRepositoryConnector {
    async fn get(&self, repository: &RemoteRepository, path: &str) -> anyhow::Result<Option<Blob>> {
        match repository.protocol().as_str() {
            "http" | "https" => self.http.get(repository, path).await,
            "file" => self.file.get(repository, path).await,
            other => Err(anyhow::Error::msg(format!("unsupported protocol '{}' of repository {}", other, repository.id))),
        }
    }
}
