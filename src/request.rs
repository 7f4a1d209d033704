use std::fmt;
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use url::Url;

use crate::body::Body;
use crate::client::Client;
use crate::multipart;
use crate::response::{Response, ResponseAs};
use crate::{error, Result};

/// A request which can be executed with `Client::execute()`.
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Body,
    timeout: Option<Duration>,
    response_as: ResponseAs,
}

/// A builder to construct the properties of a `Request`.
pub struct RequestBuilder {
    client: Client,
    request: Result<Request>,
}

impl Request {
    /// Constructs a new request.
    pub fn new(method: Method, url: Url) -> Self {
        Request {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::empty(),
            timeout: None,
            response_as: ResponseAs::Bytes,
        }
    }

    /// Get the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get a mutable reference to the method.
    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    /// Get the url.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get a mutable reference to the url.
    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Get a mutable reference to the body.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Get the read timeout.
    pub fn timeout(&self) -> Option<&Duration> {
        self.timeout.as_ref()
    }

    /// Get a mutable reference to the read timeout.
    pub fn timeout_mut(&mut self) -> &mut Option<Duration> {
        &mut self.timeout
    }

    /// Get the response handling strategy.
    pub fn response_as(&self) -> &ResponseAs {
        &self.response_as
    }

    /// Get a mutable reference to the response handling strategy.
    pub fn response_as_mut(&mut self) -> &mut ResponseAs {
        &mut self.response_as
    }

    pub(crate) fn pieces(
        self,
    ) -> (Method, Url, HeaderMap, Body, Option<Duration>, ResponseAs) {
        (
            self.method,
            self.url,
            self.headers,
            self.body,
            self.timeout,
            self.response_as,
        )
    }
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, request: Result<Request>) -> RequestBuilder {
        RequestBuilder { client, request }
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
        self.header_inner(key, value, false)
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
        self.header_inner(key, value, true)
    }

    fn header_inner<K, V>(mut self, key: K, value: V, append: bool) -> RequestBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let mut err = None;
        if let Ok(ref mut req) = self.request {
            match <HeaderName as TryFrom<K>>::try_from(key) {
                Ok(key) => match <HeaderValue as TryFrom<V>>::try_from(value) {
                    Ok(value) => {
                        if append {
                            req.headers_mut().append(key, value);
                        } else {
                            req.headers_mut().insert(key, value);
                        }
                    }
                    Err(e) => err = Some(error::builder(e.into())),
                },
                Err(e) => err = Some(error::builder(e.into())),
            }
        }
        if let Some(err) = err {
            self.request = Err(err);
        }
        self
    }

    /// Add a set of Headers to the existing ones on this Request.
    ///
    /// The headers will be merged in to any already set.
    pub fn headers(mut self, headers: HeaderMap) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            req.headers_mut().extend(headers);
        }
        self
    }

    /// Enables a request timeout.
    ///
    /// The timeout is applied from when the request starts connecting
    /// until the response body has been read, enforced by the transport.
    /// It overrides the client-level timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            *req.timeout_mut() = Some(timeout);
        }
        self
    }

    /// Set the request body.
    pub fn body<T: Into<Body>>(mut self, body: T) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            *req.body_mut() = body.into();
        }
        self
    }

    /// Sends a multipart/form-data body.
    ///
    /// ```
    /// # use courier::Error;
    ///
    /// # async fn run() -> Result<(), Error> {
    /// let client = courier::Client::new();
    /// let form = courier::multipart::Form::new()
    ///     .text("user", "courier")
    ///     .file("upload", "/tmp/upload.bin");
    ///
    /// let response = client
    ///     .post("http://example.local/upload")
    ///     .multipart(form)
    ///     .send()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn multipart(mut self, form: multipart::Form) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            *req.body_mut() = Body::multipart(form);
        }
        self
    }

    /// Choose how the response body will be materialized.
    ///
    /// Defaults to [`ResponseAs::Bytes`].
    pub fn response_as(mut self, strategy: ResponseAs) -> RequestBuilder {
        if let Ok(ref mut req) = self.request {
            *req.response_as_mut() = strategy;
        }
        self
    }

    /// Build a `Request`, which can be inspected, modified and executed
    /// with `Client::execute()`.
    pub fn build(self) -> Result<Request> {
        self.request
    }

    /// Constructs the Request and sends it to the target URL, returning a
    /// future Response.
    ///
    /// # Errors
    ///
    /// This method fails if there was an error while sending request or
    /// materializing the response body.
    pub async fn send(self) -> Result<Response> {
        self.client.execute(self.request?).await
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .finish()
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("RequestBuilder");
        match self.request {
            Ok(ref req) => builder
                .field("method", req.method())
                .field("url", req.url())
                .finish(),
            Err(ref err) => builder.field("error", err).finish(),
        }
    }
}
