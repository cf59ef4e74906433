use std::time::Duration;

use futures::StreamExt;
use hex::FromHex;
use hyper::{Body, Client, HeaderMap, Request, StatusCode, Uri};
use hyper::header::{HeaderValue, AUTHORIZATION, ETAG, LOCATION, PROXY_AUTHORIZATION, USER_AGENT};
use hyper_tls::HttpsConnector;
use lazy_static::lazy_static;
use tracing::{debug, trace};

use crate::maven::repository::RemoteRepository;
use crate::util::blob::Blob;
use crate::util::proxy_connector::{ProxyConnector, ProxyTarget};

const MAX_REDIRECTS: usize = 5;

lazy_static! {
    static ref USER_AGENT_VALUE: String = format!("arti-get/{}", env!("CARGO_PKG_VERSION"));
}

/// Downloads files relative to a repository's base URI. Checksums announced in response headers
///  are attached to the returned blob; validating them is up to the caller.
///
/// Instances do HTTP connection caching internally, so keeping them alive has performance benefits.
pub struct ValidatingHttpDownloader {
    client: Client<HttpsConnector<ProxyConnector>>,
    base_uri: String, // with trailing '/'
    /// only sent to the repository's own scheme and authority, not to redirect targets elsewhere
    authorization: Option<HeaderValue>,
    /// sent with plain HTTP requests through a proxy, CONNECT carries it for HTTPS
    proxy_authorization: Option<HeaderValue>,
    timeout: Duration,
}
impl ValidatingHttpDownloader {
    pub fn new(repository: &RemoteRepository, timeout: Duration) -> anyhow::Result<ValidatingHttpDownloader> {
        let mut base_uri = repository.url.clone();
        if !base_uri.ends_with('/') {
            base_uri.push('/');
        }

        // check that the base URI is valid
        Uri::try_from(base_uri.clone())?;

        let authorization = match &repository.authentication {
            Some(auth) => Some(HeaderValue::from_str(&auth.basic_header())?),
            None => None,
        };

        let proxy = match &repository.proxy {
            Some(proxy) => {
                let authorization = match &proxy.authentication {
                    Some(auth) => Some(HeaderValue::from_str(&auth.basic_header())?),
                    None => None,
                };
                Some(ProxyTarget {
                    uri: Uri::try_from(proxy.uri())?,
                    authorization,
                })
            }
            None => None,
        };

        let proxy_authorization = proxy.as_ref()
            .and_then(|p| p.authorization.clone());

        Ok(ValidatingHttpDownloader {
            client: Client::builder()
                .build::<_, Body>(HttpsConnector::new_with_connector(ProxyConnector::new(proxy))),
            base_uri,
            authorization,
            proxy_authorization,
            timeout,
        })
    }

    /// `None` if the repository does not have the file
    pub async fn get(&self, path: &str) -> anyhow::Result<Option<Blob>> {
        let origin = Uri::try_from(format!("{}{}", self.base_uri, path))?;
        let mut uri = origin.clone();

        for _ in 0..=MAX_REDIRECTS {
            let mut request = Request::builder()
                .method("GET")
                .uri(uri.clone())
                .header(USER_AGENT, USER_AGENT_VALUE.as_str());
            if let Some(authorization) = self.authorization.as_ref().filter(|_| is_same_origin(&origin, &uri)) {
                request = request.header(AUTHORIZATION, authorization.clone());
            }
            if let Some(proxy_authorization) = self.proxy_authorization.as_ref().filter(|_| uri.scheme_str() == Some("http")) {
                request = request.header(PROXY_AUTHORIZATION, proxy_authorization.clone());
            }
            let request = request.body(Body::empty())?;

            trace!("getting {:?}", request.uri());

            let response = tokio::time::timeout(self.timeout, self.client.request(request))
                .await
                .map_err(|_| anyhow::Error::msg(format!("timeout after {:?} requesting {}", self.timeout, uri)))??;

            let status = response.status();
            if status.is_success() {
                let (sha1, md5) = expected_checksums(response.headers());
                let data = response.into_body()
                    .map(|chunk| chunk.map_err(anyhow::Error::from));
                return Ok(Some(Blob {
                    data: Box::pin(data),
                    md5,
                    sha1,
                }));
            }
            if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
                debug!("{} returned {}", uri, status);
                return Ok(None);
            }
            if status.is_redirection() {
                let location = response.headers().get(LOCATION)
                    .and_then(|l| l.to_str().ok())
                    .ok_or_else(|| anyhow::Error::msg(format!("{} returned {} without location", uri, status)))?;
                let next = resolve_location(&uri, location)?;
                debug!("{} redirected to {}", uri, next);
                uri = next;
                continue;
            }

            return Err(anyhow::Error::msg(format!("{} returned {}", uri, status)));
        }

        Err(anyhow::Error::msg(format!("too many redirects requesting {}{}", self.base_uri, path)))
    }
}

fn header_string<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
}

/// Checksums that repository managers announce in response headers. Unparseable values are ignored.
fn expected_checksums(headers: &HeaderMap) -> (Option<[u8;20]>, Option<[u8;16]>) {
    let quoted_etag_sha1 = header_string(headers, ETAG.as_str())
        .filter(|s| s.len() == 42 && s.starts_with('"') && s.ends_with('"'))
        .map(|s| &s[1..41]);

    let sha1 = header_string(headers, "x-checksum-sha1")
        .or_else(|| header_string(headers, "x-goog-meta-checksum-sha1"))
        .or(quoted_etag_sha1)
        .and_then(|s| {
            let parsed = <[u8;20]>::from_hex(s).ok();
            if parsed.is_none() {
                debug!("ignoring invalid SHA1 header value {:?}", s);
            }
            parsed
        });

    let md5 = header_string(headers, "x-checksum-md5")
        .or_else(|| header_string(headers, "x-goog-meta-checksum-md5"))
        .and_then(|s| <[u8;16]>::from_hex(s).ok());

    (sha1, md5)
}

fn is_same_origin(a: &Uri, b: &Uri) -> bool {
    a.scheme() == b.scheme() && a.authority() == b.authority()
}

fn resolve_location(current: &Uri, location: &str) -> anyhow::Result<Uri> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return Ok(Uri::try_from(location)?);
    }

    let scheme = current.scheme_str().unwrap_or("http");
    let authority = current.authority()
        .map(|a| a.as_str())
        .ok_or_else(|| anyhow::Error::msg(format!("no authority in {}", current)))?;

    let path = if location.starts_with('/') {
        location.to_string()
    }
    else {
        let current_path = current.path();
        let directory = &current_path[..current_path.rfind('/').map(|i| i + 1).unwrap_or(0)];
        format!("{}{}", directory, location)
    };
    Ok(Uri::try_from(format!("{}://{}{}", scheme, authority, path))?)
}
