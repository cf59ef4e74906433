use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use futures_core::Stream;

pub type BlobStream = Pin<Box<dyn Stream<Item = anyhow::Result<Bytes>> + Send + 'static>>;

/// A file's content as it arrives from a repository, with checksums the repository announced
///  for it (if any)
pub struct Blob {
    pub data: BlobStream,
    pub md5: Option<[u8;16]>,
    pub sha1: Option<[u8;20]>,
}
impl Blob {
    pub fn new(data: impl Stream<Item = anyhow::Result<Bytes>> + Send + 'static) -> Blob {
        Blob {
            data: Box::pin(data),
            md5: None,
            sha1: None,
        }
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Blob {
        let data: Bytes = data.into();
        Blob::new(futures::stream::once(async move { Ok(data) }))
    }

    /// Collects the entire stream, for small files like checksums and metadata
    pub async fn into_bytes(self) -> anyhow::Result<Bytes> {
        let mut data = self.data;
        let mut result = BytesMut::new();
        while let Some(chunk) = data.next().await {
            result.extend_from_slice(&chunk?);
        }
        Ok(result.freeze())
    }
}
