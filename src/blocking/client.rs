use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use tokio::runtime::Runtime;

use super::request::RequestBuilder;
use crate::proxy::Proxy;
use crate::transport::Transport;
use crate::{error, IntoUrl, Request, Response, Result};

/// A blocking `Client` to make Requests with.
///
/// Like the async [`Client`][crate::Client], cloning is cheap and clones
/// share the same transport and runtime.
#[derive(Clone)]
pub struct Client {
    inner: crate::Client,
    rt: Arc<Runtime>,
}

/// A `ClientBuilder` for a blocking [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    inner: crate::ClientBuilder,
}

impl ClientBuilder {
    /// Constructs a new `ClientBuilder`.
    pub fn new() -> ClientBuilder {
        ClientBuilder {
            inner: crate::ClientBuilder::new(),
        }
    }

    /// Use an externally supplied transport.
    ///
    /// A client built this way does not own the transport: closing the
    /// client leaves the transport's resources untouched.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> ClientBuilder {
        self.inner = self.inner.transport(transport);
        self
    }

    /// Use the given transport and take ownership of its lifecycle.
    ///
    /// Closing the client shuts this transport down, exactly once.
    pub fn transport_owned(mut self, transport: Arc<dyn Transport>) -> ClientBuilder {
        self.inner = self.inner.transport_owned(transport);
        self
    }

    /// Route requests of the built-in transport through a proxy.
    pub fn proxy(mut self, proxy: Proxy) -> ClientBuilder {
        self.inner = self.inner.proxy(proxy);
        self
    }

    /// Set a default read timeout applied to every request that does not
    /// carry its own.
    pub fn timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Returns a `Client` that uses this `ClientBuilder` configuration.
    ///
    /// # Errors
    ///
    /// This method fails if the configuration is invalid or the internal
    /// runtime cannot be created.
    pub fn build(self) -> Result<Client> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(error::builder)?;
        Ok(Client {
            inner: self.inner.build()?,
            rt: Arc::new(rt),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl Client {
    /// Constructs a new blocking `Client` with the default configuration.
    ///
    /// # Panics
    ///
    /// This method panics if the default transport or the internal runtime
    /// cannot be initialized. Use `Client::builder()` to handle the failure
    /// as an `Error` instead of panicking.
    pub fn new() -> Client {
        ClientBuilder::new().build().expect("blocking::Client::new()")
    }

    /// Creates a `ClientBuilder` to configure a blocking `Client`.
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
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        RequestBuilder::new(self.rt.clone(), self.inner.request(method, url))
    }

    /// Executes a `Request`, blocking until the response has been
    /// materialized.
    pub fn execute(&self, request: Request) -> Result<Response> {
        self.rt.block_on(self.inner.execute(request))
    }

    /// Shut the client down.
    ///
    /// Same ownership semantics as [`Client::close`][crate::Client::close]:
    /// an owned transport is shut down exactly once, an externally supplied
    /// one is left untouched.
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Default for Client {
    fn default() -> Client {
        Client::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("blocking::Client")
            .field("inner", &self.inner)
            .finish()
    }
}
