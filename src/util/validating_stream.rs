use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::{ready, Stream};
use hex::FromHex;
use pin_project_lite::pin_project;
use sha1::{Digest, Sha1};
use sha1::digest::consts::U20;
use sha1::digest::generic_array::GenericArray;
use tracing::{trace, warn};

use crate::maven::repository::ChecksumPolicy;
use crate::util::blob::BlobStream;

/// This struct wraps a data stream, allowing it to be consumed asynchronously without materializing
///  it but at the same time performing validation that requires knowledge of the entire data
///  (e.g. SHA1 checksum check).
///
/// What happens on a failed validation depends on the checksum policy: with `Fail`, an (empty)
///  chunk with an error is appended to the stream, and once that was returned this stream stops
///  polling from upstream and always returns an error. With `Warn` the failure is logged and the
///  stream ends normally.
pin_project! {
    pub struct ValidatingStream {
        #[pin]
        inner: BlobStream,
        validators: Vec<Box<dyn BodyValidator>>,
        policy: ChecksumPolicy,
        description: String,
        is_failed: bool,
        is_done: bool,
    }
}
impl ValidatingStream {
    pub fn new(inner: BlobStream, validators: Vec<Box<dyn BodyValidator>>, policy: ChecksumPolicy, description: &str) -> ValidatingStream {
        ValidatingStream {
            inner,
            validators,
            policy,
            description: description.to_string(),
            is_failed: false,
            is_done: false,
        }
    }
}

impl Stream for ValidatingStream {
    type Item = anyhow::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.is_failed {
            return Poll::Ready(Some(Err(anyhow::Error::msg("polling from failed stream"))));
        }
        if self.is_done {
            return Poll::Ready(None);
        }

        let this = self.project();
        let inner = ready!(this.inner.poll_next(cx));
        match inner {
            Some(Ok(data)) => {
                // available data from the wrapped stream -> pass this on
                for v in this.validators.iter_mut() {
                    v.add_data(&data);
                }
                Poll::Ready(Some(Ok(data)))
            }
            None => {
                // wrapped stream is fully drained -> finalize validation
                *this.is_done = true;

                let failures: Vec<String> = this.validators.iter()
                    .filter_map(|v| v.do_validate().err())
                    .collect();
                if failures.is_empty() {
                    return Poll::Ready(None);
                }

                let message = format!("checksum validation failed for {}: {}", this.description, failures.join(", "));
                match this.policy {
                    ChecksumPolicy::Fail => {
                        *this.is_failed = true;
                        Poll::Ready(Some(Err(anyhow::Error::msg(message))))
                    }
                    ChecksumPolicy::Warn => {
                        warn!("{}", message);
                        Poll::Ready(None)
                    }
                    ChecksumPolicy::Ignore => {
                        Poll::Ready(None)
                    }
                }
            }
            Some(Err(e)) => {
                *this.is_failed = true;
                Poll::Ready(Some(Err(e)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub trait BodyValidator: Send {
    fn add_data(&mut self, data: &Bytes);

    /// Err with a description of the mismatch
    fn do_validate(&self) -> Result<(), String>;
}

pub struct Sha1BodyValidator {
    hasher: Sha1,
    expected_hash: GenericArray<u8, U20>,
}
impl Sha1BodyValidator {
    pub fn new(expected_hash: [u8; 20]) -> Sha1BodyValidator {
        Sha1BodyValidator {
            hasher: Default::default(),
            expected_hash: expected_hash.into(),
        }
    }
}
impl BodyValidator for Sha1BodyValidator {
    fn add_data(&mut self, data: &Bytes) {
        self.hasher.update(data);
    }

    fn do_validate(&self) -> Result<(), String> {
        let hash = self.hasher.clone().finalize();
        trace!("validating SHA1 hash");
        if hash == self.expected_hash {
            Ok(())
        }
        else {
            Err(format!("expected SHA1 {}, was {}", hex::encode(&self.expected_hash), hex::encode(hash)))
        }
    }
}

pub struct Md5BodyValidator {
    context: md5::Context,
    expected_hash: [u8; 16],
}
impl Md5BodyValidator {
    pub fn new(expected_hash: [u8; 16]) -> Md5BodyValidator {
        Md5BodyValidator {
            context: md5::Context::new(),
            expected_hash,
        }
    }
}
impl BodyValidator for Md5BodyValidator {
    fn add_data(&mut self, data: &Bytes) {
        self.context.consume(data);
    }

    fn do_validate(&self) -> Result<(), String> {
        let hash: [u8;16] = self.context.clone()
            .compute()
            .into();
        trace!("validating MD5 hash");
        if hash == self.expected_hash {
            Ok(())
        }
        else {
            Err(format!("expected MD5 {}, was {}", hex::encode(&self.expected_hash), hex::encode(hash)))
        }
    }
}

/// Parses the content of a checksum sidecar file: the hex digest, optionally followed by
///  whitespace and a file name
pub fn parse_checksum<T: FromHex>(content: &[u8]) -> Option<T> {
    let text = std::str::from_utf8(content).ok()?;
    let digest = text.split_whitespace().next()?;
    T::from_hex(digest).ok()
}

#[cfg(test)]
mod test {
    use futures::StreamExt;
    use rstest::*;
    use super::*;

    const DATA: &[u8] = b"hello world";
    const SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
    const MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

    fn stream(chunks: &[&'static [u8]]) -> BlobStream {
        let chunks: Vec<anyhow::Result<Bytes>> = chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
        Box::pin(futures::stream::iter(chunks))
    }

    fn sha1(s: &str) -> Box<dyn BodyValidator> {
        Box::new(Sha1BodyValidator::new(<[u8;20]>::from_hex(s).unwrap()))
    }

    fn md5(s: &str) -> Box<dyn BodyValidator> {
        Box::new(Md5BodyValidator::new(<[u8;16]>::from_hex(s).unwrap()))
    }

    async fn drain(mut s: ValidatingStream) -> (Vec<u8>, Option<String>) {
        let mut data = vec![];
        while let Some(chunk) = s.next().await {
            match chunk {
                Ok(bytes) => data.extend_from_slice(&bytes),
                Err(e) => return (data, Some(e.to_string())),
            }
        }
        (data, None)
    }

    #[rstest]
    #[case::sha1(ChecksumPolicy::Fail, vec![sha1(SHA1)])]
    #[case::md5(ChecksumPolicy::Fail, vec![md5(MD5)])]
    #[case::both(ChecksumPolicy::Fail, vec![sha1(SHA1), md5(MD5)])]
    #[case::none(ChecksumPolicy::Fail, vec![])]
    #[tokio::test]
    async fn test_valid(#[case] policy: ChecksumPolicy, #[case] validators: Vec<Box<dyn BodyValidator>>) {
        let s = ValidatingStream::new(stream(&[b"hello", b" ", b"world"]), validators, policy, "test");
        let (data, error) = drain(s).await;
        assert_eq!(data, DATA);
        assert_eq!(error, None);
    }

    #[tokio::test]
    async fn test_mismatch_fails() {
        let s = ValidatingStream::new(stream(&[DATA]), vec![sha1("0000000000000000000000000000000000000000")], ChecksumPolicy::Fail, "g:a:jar:1.0");
        let (data, error) = drain(s).await;
        assert_eq!(data, DATA);
        let error = error.unwrap();
        assert!(error.contains("g:a:jar:1.0"));
        assert!(error.contains(SHA1));
    }

    #[rstest]
    #[case(ChecksumPolicy::Warn)]
    #[case(ChecksumPolicy::Ignore)]
    #[tokio::test]
    async fn test_mismatch_accepted(#[case] policy: ChecksumPolicy) {
        let s = ValidatingStream::new(stream(&[DATA]), vec![md5("00000000000000000000000000000000")], policy, "test");
        let (data, error) = drain(s).await;
        assert_eq!(data, DATA);
        assert_eq!(error, None);
    }

    #[tokio::test]
    async fn test_failed_stream_stays_failed() {
        let mut s = ValidatingStream::new(stream(&[DATA]), vec![sha1("0000000000000000000000000000000000000000")], ChecksumPolicy::Fail, "test");
        assert!(s.next().await.unwrap().is_ok());
        assert!(s.next().await.unwrap().is_err());
        assert!(s.next().await.unwrap().is_err());
    }

    #[rstest]
    #[case::plain(b"2aae6c35c94fcfb415dbe95f408b9ce91ee846ed", true)]
    #[case::with_file_name(b"2aae6c35c94fcfb415dbe95f408b9ce91ee846ed  cool-artifact-1.0.jar\n", true)]
    #[case::newline(b"\n2aae6c35c94fcfb415dbe95f408b9ce91ee846ed\n", true)]
    #[case::too_short(b"2aae6c35c94fcfb415dbe95f408b9ce91ee846", false)]
    #[case::not_hex(b"this is not a checksum at all, just text", false)]
    #[case::binary(&[0xff, 0xfe, 0x00, 0x12], false)]
    #[case::empty(b"", false)]
    fn test_parse_checksum(#[case] content: &[u8], #[case] valid: bool) {
        assert_eq!(parse_checksum::<[u8;20]>(content).is_some(), valid);
    }
}
