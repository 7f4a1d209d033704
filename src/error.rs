use std::error::Error as StdError;
use std::fmt;

use url::Url;

/// A `Result` alias where the `Err` case is `courier::Error`.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// The Errors that may occur when building or executing a `Request`.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    url: Option<Url>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                url: None,
            }),
        }
    }

    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Add a url related to this error (overwriting any existing).
    pub fn with_url(mut self, url: Url) -> Error {
        self.inner.url = Some(url);
        self
    }

    /// Returns true if the error originated while building the request.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the error came from the transport collaborator
    /// (connect failure, timeout, protocol violation).
    pub fn is_transport(&self) -> bool {
        matches!(self.inner.kind, Kind::Transport)
    }

    /// Returns true if the error is related to decoding the response body.
    pub fn is_decode(&self) -> bool {
        matches!(self.inner.kind, Kind::Decode)
    }

    /// Returns true if the error occurred while writing the response body
    /// to a file.
    pub fn is_file(&self) -> bool {
        matches!(self.inner.kind, Kind::File)
    }

    /// Returns true if a streaming body was requested from a client that
    /// does not support streaming.
    pub fn is_stream_unsupported(&self) -> bool {
        matches!(self.inner.kind, Kind::Stream)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("courier::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref url) = self.inner.url {
            builder.field("url", url);
        }
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("builder error")?,
            Kind::Transport => f.write_str("error sending request")?,
            Kind::Decode => f.write_str("error decoding response body")?,
            Kind::File => f.write_str("error writing response body to file")?,
            Kind::Stream => f.write_str("streaming is not supported by this client")?,
        }

        if let Some(ref url) = self.inner.url {
            write!(f, " for url ({url})")?;
        }

        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Builder,
    Transport,
    Decode,
    File,
    Stream,
}

// constructors

pub(crate) fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder, Some(e))
}

pub(crate) fn transport<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Transport, Some(e))
}

pub(crate) fn decode<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Decode, Some(e))
}

pub(crate) fn file<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::File, Some(e))
}

pub(crate) fn stream_unsupported() -> Error {
    Error::new(Kind::Stream, None::<Error>)
}

pub(crate) fn url_bad_scheme(url: Url) -> Error {
    builder("URL scheme is not allowed").with_url(url)
}

pub(crate) fn unsupported_part_body(part: &str) -> Error {
    builder(format!(
        "multipart part `{part}` has a body that is neither text nor file backed"
    ))
}
