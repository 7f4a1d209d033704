use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::Method;
use log::debug;

use crate::decode;
use crate::into_url::{try_uri, IntoUrl};
use crate::proxy::Proxy;
use crate::request::{Request, RequestBuilder};
use crate::response::{materialize, Response, ResponseAs};
use crate::transport::{HttpTransport, Transport, TransportRequest};
use crate::{error, Result};

/// A `Client` to make Requests with.
///
/// The Client translates each request for its transport, sends it, decodes
/// the compressed response body if any, and materializes the result the way
/// the request asked for.
///
/// The Client holds the transport's connection pool internally, so it is
/// advised that you create one and **reuse** it. Cloning is cheap; clones
/// share the same transport.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientRef>,
}

struct ClientRef {
    transport: Arc<dyn Transport>,
    owns_transport: bool,
    closed: AtomicBool,
    streaming: bool,
    timeout: Option<Duration>,
}

/// A `ClientBuilder` can be used to create a `Client` with custom
/// configuration.
pub struct ClientBuilder {
    config: Config,
}

struct Config {
    transport: Option<(Arc<dyn Transport>, bool)>,
    proxy: Option<Proxy>,
    streaming: bool,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Constructs a new `ClientBuilder`.
    pub fn new() -> ClientBuilder {
        ClientBuilder {
            config: Config {
                transport: None,
                proxy: None,
                streaming: false,
                timeout: None,
            },
        }
    }

    /// Use an externally supplied transport.
    ///
    /// A client built this way does not own the transport: closing the
    /// client leaves the transport's resources untouched.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> ClientBuilder {
        self.config.transport = Some((transport, false));
        self
    }

    /// Use the given transport and take ownership of its lifecycle.
    ///
    /// Closing the client shuts this transport down, exactly once, the
    /// same way it would shut down the built-in one.
    pub fn transport_owned(mut self, transport: Arc<dyn Transport>) -> ClientBuilder {
        self.config.transport = Some((transport, true));
        self
    }

    /// Route requests of the built-in transport through a proxy.
    pub fn proxy(mut self, proxy: Proxy) -> ClientBuilder {
        self.config.proxy = Some(proxy);
        self
    }

    /// Enable streaming request and response bodies.
    ///
    /// Without this, sending a [`Body::wrap_stream`][crate::Body::wrap_stream]
    /// body or requesting [`ResponseAs::Stream`] fails before any I/O.
    pub fn streaming(mut self, enabled: bool) -> ClientBuilder {
        self.config.streaming = enabled;
        self
    }

    /// Set a default read timeout applied to every request that does not
    /// carry its own.
    pub fn timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.config.timeout = Some(timeout);
        self
    }

    /// Returns a `Client` that uses this `ClientBuilder` configuration.
    ///
    /// # Errors
    ///
    /// This method fails if the proxy configuration is invalid, or if a
    /// proxy was combined with an externally supplied transport.
    pub fn build(self) -> Result<Client> {
        let config = self.config;

        let (transport, owns_transport): (Arc<dyn Transport>, bool) = match config.transport {
            Some((transport, owned)) => {
                if config.proxy.is_some() {
                    return Err(error::builder(
                        "proxy configuration requires the built-in transport",
                    ));
                }
                (transport, owned)
            }
            None => (Arc::new(HttpTransport::with_proxy(config.proxy)?), true),
        };

        Ok(Client {
            inner: Arc::new(ClientRef {
                transport,
                owns_transport,
                closed: AtomicBool::new(false),
                streaming: config.streaming,
                timeout: config.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl Client {
    /// Constructs a new `Client` with the default configuration.
    ///
    /// # Panics
    ///
    /// This method panics if the default transport cannot be initialized.
    /// Use `Client::builder()` if you wish to handle the failure as an
    /// `Error` instead of panicking.
    pub fn new() -> Client {
        ClientBuilder::new().build().expect("Client::new()")
    }

    /// Creates a `ClientBuilder` to configure a `Client`.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Convenience method to make a `GET` request to a URL.
    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a `POST` request to a URL.
    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Convenience method to make a `PUT` request to a URL.
    pub fn put<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Convenience method to make a `PATCH` request to a URL.
    pub fn patch<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Convenience method to make a `DELETE` request to a URL.
    pub fn delete<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Convenience method to make a `HEAD` request to a URL.
    pub fn head<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Start building a `Request` with the `Method` and `Url`.
    ///
    /// Returns a `RequestBuilder`, which will allow setting headers, the
    /// request body, the read timeout, and the response handling strategy
    /// before sending.
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        let request = url.into_url().map(|url| Request::new(method, url));
        RequestBuilder::new(self.clone(), request)
    }

    /// Executes a `Request`.
    ///
    /// # Errors
    ///
    /// This method fails if there was an error while sending request,
    /// decoding the response body, or materializing it.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let (method, url, mut headers, body, timeout, response_as) = request.pieces();

        // fail fast, before any I/O, when the strategy needs a capability
        // this client was not built with
        if response_as == ResponseAs::Stream && !self.inner.streaming {
            return Err(error::stream_unsupported().with_url(url));
        }

        let uri = try_uri(&url)?;
        let replace_content_type = body.is_multipart();
        let (transport_body, media_type) = match body.into_transport(self.inner.streaming) {
            Ok(translated) => translated,
            Err(err) => return Err(err.with_url(url)),
        };

        // the transport computes the length from the body producer, or
        // omits it for chunked bodies
        headers.remove(CONTENT_LENGTH);
        if let Some(media_type) = media_type {
            if replace_content_type || !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, media_type);
            }
        }

        debug!("sending {method} {url}");
        let transport_request = TransportRequest {
            method: method.clone(),
            uri,
            headers,
            body: transport_body,
            read_timeout: timeout.or(self.inner.timeout),
        };

        let raw = self
            .inner
            .transport
            .send(transport_request)
            .await
            .map_err(|e| error::transport(e).with_url(url.clone()))?;
        debug!("response {} for {method} {url}", raw.status);

        let decoded = decode::decode(&method, &raw.headers, raw.body)
            .map_err(|e| e.with_url(url.clone()))?;
        let body = materialize(response_as, decoded, self.inner.streaming)
            .await
            .map_err(|e| e.with_url(url.clone()))?;

        Ok(Response::new(raw.status, raw.reason, raw.headers, body, url))
    }

    /// Shut the client down.
    ///
    /// If this client owns its transport, the transport's execution
    /// resources are released exactly once; closing again is a no-op. A
    /// client built around an externally supplied transport never touches
    /// that transport's resources.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) && self.inner.owns_transport {
            debug!("shutting down owned transport");
            self.inner.transport.shutdown();
        }
    }
}

impl Default for Client {
    fn default() -> Client {
        Client::new()
    }
}

impl Drop for ClientRef {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) && self.owns_transport {
            self.transport.shutdown();
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Client")
            .field("owns_transport", &self.inner.owns_transport)
            .field("streaming", &self.inner.streaming)
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("streaming", &self.config.streaming)
            .field("timeout", &self.config.timeout)
            .field("proxy", &self.config.proxy)
            .finish()
    }
}
