use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::HeaderValue;
use http::Uri;

use crate::{error, Result};

/// Configuration of a forward proxy for the built-in transport.
///
/// Requests are routed through the proxy host; credentials, when supplied,
/// are sent as a `Proxy-Authorization: Basic` header.
#[derive(Clone)]
pub struct Proxy {
    host: String,
    port: u16,
    auth: Option<HeaderValue>,
}

impl Proxy {
    /// A proxy at the given host and port.
    pub fn new<H>(host: H, port: u16) -> Proxy
    where
        H: Into<String>,
    {
        Proxy {
            host: host.into(),
            port,
            auth: None,
        }
    }

    /// Supply basic credentials for the proxy.
    pub fn basic_auth(mut self, username: &str, password: &str) -> Proxy {
        let credentials = STANDARD.encode(format!("{username}:{password}"));
        let header = format!("Basic {credentials}");
        let mut value = HeaderValue::from_str(&header)
            .expect("base64 credentials are always a valid header value");
        value.set_sensitive(true);
        self.auth = Some(value);
        self
    }

    pub(crate) fn uri(&self) -> Result<Uri> {
        format!("http://{}:{}", self.host, self.port)
            .parse()
            .map_err(error::builder)
    }

    pub(crate) fn authorization(&self) -> Option<&HeaderValue> {
        self.auth.as_ref()
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth", &self.auth.is_some())
            .finish()
    }
}
