//! The transport collaborator boundary.
//!
//! A [`Transport`] turns one translated request into one raw response; the
//! [`Client`][crate::Client] owns everything around that exchange (body
//! translation, content decoding, materialization). The built-in
//! [`HttpTransport`] speaks HTTP/1.1 over a hyper connection pool; other
//! engines plug in by implementing the trait and handing the client to
//! [`ClientBuilder::transport`][crate::ClientBuilder::transport].

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, PROXY_AUTHORIZATION};
use http::{Method, StatusCode, Uri};
use http_body_util::BodyExt;
use hyper_util::client::legacy;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use log::debug;
use tokio::net::TcpStream;
use tower_service::Service;

use crate::proxy::Proxy;
use crate::Result;

pub use crate::body::TransportBody;

/// Boxed error type used at the transport boundary.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A future returned by [`Transport::send`].
pub type TransportFuture =
    Pin<Box<dyn Future<Output = std::result::Result<TransportResponse, BoxError>> + Send>>;

/// A fully translated request, ready for the wire.
pub struct TransportRequest {
    /// The request method.
    pub method: Method,
    /// The target URI.
    pub uri: Uri,
    /// Outgoing headers, already normalized by the client.
    pub headers: HeaderMap,
    /// The streaming body producer.
    pub body: TransportBody,
    /// Per-request read timeout, enforced by the transport.
    pub read_timeout: Option<Duration>,
}

/// The raw result of one transport exchange.
pub struct TransportResponse {
    /// The response status code.
    pub status: StatusCode,
    /// The status line's reason phrase, when the engine exposes one.
    pub reason: Option<String>,
    /// Response headers, multi-valued names preserved in server order.
    pub headers: HeaderMap,
    /// The raw, still-encoded body bytes.
    pub body: Bytes,
}

/// The connection engine a [`Client`][crate::Client] executes requests on.
///
/// A transport owns connecting, TLS, and proxy negotiation. It must support
/// many concurrent sends over one instance; the client never serializes
/// access to it.
pub trait Transport: Send + Sync + 'static {
    /// Perform one request/response exchange.
    ///
    /// Connection failures, timeouts, and protocol violations are reported
    /// through the returned future's error channel.
    fn send(&self, request: TransportRequest) -> TransportFuture;

    /// Release the engine's execution resources.
    ///
    /// Called at most once by a client that owns this transport. The
    /// default does nothing.
    fn shutdown(&self) {}
}

/// The built-in HTTP/1.1 transport over a hyper connection pool.
pub struct HttpTransport {
    client: legacy::Client<Connector, TransportBody>,
    proxy_auth: Option<http::header::HeaderValue>,
}

impl HttpTransport {
    /// A transport with a fresh connection pool and no proxy.
    pub fn new() -> HttpTransport {
        HttpTransport::with_proxy(None).expect("building a transport without a proxy cannot fail")
    }

    /// A transport routing every request through the given proxy.
    pub fn with_proxy(proxy: Option<Proxy>) -> Result<HttpTransport> {
        let proxy_uri = match proxy {
            Some(ref proxy) => Some(proxy.uri()?),
            None => None,
        };
        let proxy_auth = proxy.as_ref().and_then(|p| p.authorization().cloned());

        let connector = Connector {
            http: HttpConnector::new(),
            proxy: proxy_uri,
        };
        let client = legacy::Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .build(connector);

        Ok(HttpTransport { client, proxy_auth })
    }
}

impl Default for HttpTransport {
    fn default() -> HttpTransport {
        HttpTransport::new()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: TransportRequest) -> TransportFuture {
        let client = self.client.clone();
        let proxy_auth = self.proxy_auth.clone();

        Box::pin(async move {
            let TransportRequest {
                method,
                uri,
                headers,
                body,
                read_timeout,
            } = request;

            let mut outgoing = http::Request::builder()
                .method(method)
                .uri(uri)
                .body(body)?;
            *outgoing.headers_mut() = headers;
            if let Some(auth) = proxy_auth {
                outgoing.headers_mut().insert(PROXY_AUTHORIZATION, auth);
            }

            let exchange = async move {
                let response = client.request(outgoing).await?;
                let (parts, body) = response.into_parts();
                let bytes = body.collect().await?.to_bytes();
                Ok::<_, BoxError>((parts, bytes))
            };

            let (parts, bytes) = match read_timeout {
                Some(timeout) => tokio::time::timeout(timeout, exchange)
                    .await
                    .map_err(|_| {
                        debug!("request timed out after {timeout:?}");
                        Box::new(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            "request timed out",
                        )) as BoxError
                    })??,
                None => exchange.await?,
            };

            Ok(TransportResponse {
                status: parts.status,
                // hyper does not surface the server's reason phrase
                reason: None,
                headers: parts.headers,
                body: bytes,
            })
        })
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HttpTransport").finish()
    }
}

/// Dials the request target, or the proxy when one is configured.
#[derive(Clone)]
struct Connector {
    http: HttpConnector,
    proxy: Option<Uri>,
}

impl Service<Uri> for Connector {
    type Response = TokioIo<TcpStream>;
    type Error = BoxError;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.http.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let target = match self.proxy {
            Some(ref proxy) => {
                debug!("connecting to {dst} via proxy {proxy}");
                proxy.clone()
            }
            None => dst,
        };
        let connecting = self.http.call(target);
        Box::pin(async move { connecting.await.map_err(Into::into) })
    }
}
