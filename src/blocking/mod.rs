//! A blocking client API.
//!
//! The blocking variant interprets the same request pipeline synchronously
//! by driving it on an owned single-threaded runtime. It supports every
//! strategy except streaming: stream bodies and
//! [`ResponseAs::Stream`][crate::ResponseAs::Stream] are rejected before
//! any I/O, since this client is built without the streaming capability.
//!
//! Conversely, the blocking client should *not* be used within an async
//! runtime, or it may panic when attempting to block.
//!
//! # Making a GET request
//!
//! ```no_run
//! # fn run() -> Result<(), courier::Error> {
//! let body = courier::blocking::get("https://www.rust-lang.org")?
//!     .text()?;
//! # Ok(())
//! # }
//! ```

pub use self::client::{Client, ClientBuilder};
pub use self::request::RequestBuilder;

mod client;
mod request;

use crate::{IntoUrl, Response, Result};

/// Shortcut method to quickly make a blocking `GET` request.
///
/// **NOTE**: This allocates a new internal connection pool for every call,
/// so if calling this function several times, it is best to create a
/// [`Client`] instead.
pub fn get<U: IntoUrl>(url: U) -> Result<Response> {
    Client::builder().build()?.get(url).send()
}
