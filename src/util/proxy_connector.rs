use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::client::connect::{Connected, Connection};
use hyper::client::HttpConnector;
use hyper::header::HeaderValue;
use hyper::Uri;
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tower::Service;
use tracing::trace;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const MAX_CONNECT_RESPONSE_SIZE: usize = 8192;

#[derive(Clone, Debug)]
pub struct ProxyTarget {
    pub uri: Uri,
    pub authorization: Option<HeaderValue>,
}

/// Opens TCP connections either directly or through an HTTP proxy. Plain HTTP goes to the proxy
///  with absolute-form request targets, HTTPS is tunnelled with CONNECT so that TLS is done end to
///  end by the wrapping connector.
#[derive(Clone)]
pub struct ProxyConnector {
    http: HttpConnector,
    proxy: Option<ProxyTarget>,
}
impl ProxyConnector {
    pub fn new(proxy: Option<ProxyTarget>) -> ProxyConnector {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        ProxyConnector {
            http,
            proxy,
        }
    }
}

impl Service<Uri> for ProxyConnector {
    type Response = ProxyStream;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<ProxyStream, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.http.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let mut http = self.http.clone();

        match self.proxy.clone() {
            None => Box::pin(async move {
                let inner = http.call(dst).await?;
                Ok(ProxyStream { inner, is_proxied: false })
            }),
            Some(proxy) => Box::pin(async move {
                trace!("connecting to {} through proxy {}", dst, proxy.uri);
                let mut inner = http.call(proxy.uri.clone()).await?;

                if dst.scheme_str() == Some("https") {
                    tunnel(&mut inner, &dst, proxy.authorization.as_ref()).await?;
                    Ok(ProxyStream { inner, is_proxied: false })
                }
                else {
                    Ok(ProxyStream { inner, is_proxied: true })
                }
            }),
        }
    }
}

async fn tunnel(stream: &mut TcpStream, dst: &Uri, authorization: Option<&HeaderValue>) -> Result<(), BoxError> {
    let host = dst.host()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("no host in {}", dst)))?;
    let port = dst.port_u16().unwrap_or(443);

    let mut request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n");
    if let Some(authorization) = authorization {
        request.push_str("Proxy-Authorization: ");
        request.push_str(authorization.to_str()?);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "proxy closed connection during CONNECT").into());
        }
        response.extend_from_slice(&buf[..n]);

        if response.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if response.len() > MAX_CONNECT_RESPONSE_SIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "proxy response to CONNECT too large").into());
        }
    }

    let status_line = String::from_utf8_lossy(&response);
    let status_line = status_line.lines().next().unwrap_or("");
    if is_success_status_line(status_line) {
        trace!("CONNECT tunnel to {}:{} established", host, port);
        Ok(())
    }
    else {
        Err(io::Error::new(io::ErrorKind::Other, format!("proxy refused CONNECT to {}:{}: {}", host, port, status_line)).into())
    }
}

fn is_success_status_line(status_line: &str) -> bool {
    let mut parts = status_line.split_whitespace();
    matches!(parts.next(), Some(v) if v.starts_with("HTTP/1."))
        && matches!(parts.next(), Some(code) if code.len() == 3 && code.starts_with('2'))
}

pin_project! {
    pub struct ProxyStream {
        #[pin]
        inner: TcpStream,
        is_proxied: bool,
    }
}

impl Connection for ProxyStream {
    fn connected(&self) -> Connected {
        self.inner.connected().proxy(self.is_proxied)
    }
}

impl AsyncRead for ProxyStream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_read(cx, buf)
    }
}

impl AsyncWrite for ProxyStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.project().inner.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().inner.poll_shutdown(cx)
    }
}

#[cfg(test)]
mod test {
    use rstest::*;
    use tokio::net::TcpListener;
    use super::*;

    #[rstest]
    #[case("HTTP/1.1 200 Connection established", true)]
    #[case("HTTP/1.0 200 OK", true)]
    #[case("HTTP/1.1 407 Proxy Authentication Required", false)]
    #[case("HTTP/1.1 2000 Weird", false)]
    #[case("garbage", false)]
    #[case("", false)]
    fn test_is_success_status_line(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_success_status_line(line), expected);
    }

    async fn fake_proxy(response: &'static str) -> (Uri, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8(received).unwrap()
        });

        (format!("http://{}", addr).parse().unwrap(), handle)
    }

    #[tokio::test]
    async fn test_connect_tunnel() {
        let (proxy_uri, handle) = fake_proxy("HTTP/1.1 200 Connection established\r\n\r\n").await;
        let mut connector = ProxyConnector::new(Some(ProxyTarget {
            uri: proxy_uri,
            authorization: Some(HeaderValue::from_static("Basic dTpw")),
        }));

        let stream = connector.call("https://repo.example:8443/m2".parse().unwrap()).await.unwrap();
        assert!(!stream.is_proxied);

        let request = handle.await.unwrap();
        assert!(request.starts_with("CONNECT repo.example:8443 HTTP/1.1\r\n"));
        assert!(request.contains("Proxy-Authorization: Basic dTpw\r\n"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (proxy_uri, _handle) = fake_proxy("HTTP/1.1 407 Proxy Authentication Required\r\n\r\n").await;
        let mut connector = ProxyConnector::new(Some(ProxyTarget { uri: proxy_uri, authorization: None }));

        let result = connector.call("https://repo.example/m2".parse().unwrap()).await;
        assert!(result.err().unwrap().to_string().contains("407"));
    }

    #[tokio::test]
    async fn test_plain_http_is_proxied() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_uri: Uri = format!("http://{}", listener.local_addr().unwrap()).parse().unwrap();
        let mut connector = ProxyConnector::new(Some(ProxyTarget { uri: proxy_uri, authorization: None }));

        let stream = connector.call("http://repo.example/m2".parse().unwrap()).await.unwrap();
        assert!(stream.is_proxied);
    }
}
