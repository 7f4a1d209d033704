use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::runtime::Runtime;

use crate::body::Body;
use crate::multipart;
use crate::response::ResponseAs;
use crate::{Request, Response, Result};

/// A builder to construct the properties of a blocking `Request`.
///
/// Mirrors the async [`RequestBuilder`][crate::RequestBuilder]; only
/// [`send`][RequestBuilder::send] differs, blocking the calling thread
/// until the response has been materialized.
pub struct RequestBuilder {
    rt: Arc<Runtime>,
    inner: crate::RequestBuilder,
}

impl RequestBuilder {
    pub(crate) fn new(rt: Arc<Runtime>, inner: crate::RequestBuilder) -> RequestBuilder {
        RequestBuilder { rt, inner }
    }

    /// Add a header to this request, replacing any previous value under
    /// the same name.
    pub fn header<K, V>(self, key: K, value: V) -> RequestBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.map(|inner| inner.header(key, value))
    }

    /// Add a header to this request without replacing previous values,
    /// preserving their order.
    pub fn header_append<K, V>(self, key: K, value: V) -> RequestBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.map(|inner| inner.header_append(key, value))
    }

    /// Add a set of Headers to the existing ones on this Request.
    pub fn headers(self, headers: HeaderMap) -> RequestBuilder {
        self.map(|inner| inner.headers(headers))
    }

    /// Enables a request timeout, overriding the client-level one.
    pub fn timeout(self, timeout: Duration) -> RequestBuilder {
        self.map(|inner| inner.timeout(timeout))
    }

    /// Set the request body.
    pub fn body<T: Into<Body>>(self, body: T) -> RequestBuilder {
        self.map(|inner| inner.body(body))
    }

    /// Sends a multipart/form-data body.
    pub fn multipart(self, form: multipart::Form) -> RequestBuilder {
        self.map(|inner| inner.multipart(form))
    }

    /// Choose how the response body will be materialized.
    ///
    /// [`ResponseAs::Stream`] is never supported by a blocking client and
    /// fails before any I/O.
    pub fn response_as(self, strategy: ResponseAs) -> RequestBuilder {
        self.map(|inner| inner.response_as(strategy))
    }

    /// Build a `Request`, which can be inspected, modified and executed
    /// with `Client::execute()`.
    pub fn build(self) -> Result<Request> {
        self.inner.build()
    }

    /// Constructs the Request and sends it to the target URL, blocking
    /// until the Response arrives or an error occurs.
    pub fn send(self) -> Result<Response> {
        let RequestBuilder { rt, inner } = self;
        rt.block_on(inner.send())
    }

    fn map<F>(self, f: F) -> RequestBuilder
    where
        F: FnOnce(crate::RequestBuilder) -> crate::RequestBuilder,
    {
        RequestBuilder {
            rt: self.rt,
            inner: f(self.inner),
        }
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("blocking::RequestBuilder")
            .field("inner", &self.inner)
            .finish()
    }
}
