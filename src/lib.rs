#![deny(missing_docs)]

//! # courier
//!
//! The `courier` crate executes typed HTTP requests over a pluggable
//! transport and takes care of the things around the exchange itself:
//!
//! - Plain, reader, file, stream, and multipart request bodies
//! - Transparent gzip/deflate response decoding
//! - A closed set of response materialization strategies: discard,
//!   buffer to bytes, stream, or save to a file
//! - An async core with a [`blocking`] variant driving the same pipeline
//!
//! Connecting, TLS, redirects, and proxy negotiation belong to the
//! [`transport`] collaborator; a hyper-based HTTP/1.1 transport is built
//! in, and anything else can be plugged in through
//! [`ClientBuilder::transport`].
//!
//! ## Making a GET request
//!
//! For a single request, you can use the [`get`] shortcut method.
//!
//! ```no_run
//! # async fn run() -> Result<(), courier::Error> {
//! let resp = courier::get("http://www.rust-lang.org").await?;
//! assert!(resp.status().is_success());
//! # Ok(())
//! # }
//! ```
//!
//! If you plan to perform multiple requests, it is best to create a
//! [`Client`] and **reuse** it, taking advantage of keep-alive connection
//! pooling.
//!
//! ## Choosing how the body is materialized
//!
//! ```no_run
//! use courier::ResponseAs;
//!
//! # async fn run() -> Result<(), courier::Error> {
//! let client = courier::Client::new();
//! let resp = client
//!     .get("http://example.local/report.pdf")
//!     .response_as(ResponseAs::SaveToFile("/tmp/report.pdf".into()))
//!     .send()
//!     .await?;
//! assert!(resp.body().path().is_some());
//! # Ok(())
//! # }
//! ```

pub use http::header;
pub use http::Method;
pub use http::StatusCode;
pub use url::Url;

pub use self::body::{Body, BytesStream};
pub use self::client::{Client, ClientBuilder};
pub use self::error::{Error, Result};
pub use self::into_url::IntoUrl;
pub use self::proxy::Proxy;
pub use self::request::{Request, RequestBuilder};
pub use self::response::{Response, ResponseAs, ResponseBody};

mod body;
mod client;
mod decode;
mod error;
mod into_url;
mod proxy;
mod request;
mod response;

pub mod blocking;
pub mod multipart;
pub mod transport;

/// Shortcut method to quickly make a `GET` request.
///
/// See also the methods on the [`Response`] for how the body
/// is read.
///
/// **NOTE**: This allocates a new internal connection pool for every call,
/// so if calling this function several times, it is best to create a
/// [`Client`] instead.
///
/// # Examples
///
/// ```no_run
/// # async fn run() -> Result<(), courier::Error> {
/// let body = courier::get("http://www.rust-lang.org").await?
///     .text()?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// This function fails if there was an error while sending request or
/// materializing the response body.
pub async fn get<U: IntoUrl>(url: U) -> Result<Response> {
    Client::builder().build()?.get(url).send().await
}
