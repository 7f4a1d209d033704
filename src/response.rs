use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use encoding_rs::Encoding;
use futures_util::{future, stream};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use log::debug;
use mime::Mime;
use url::Url;

use crate::body::BytesStream;
use crate::{error, Result};

/// How the response body should be materialized.
///
/// The set of strategies is closed; the orchestrator dispatches over it
/// exhaustively after the body has been decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseAs {
    /// Discard the body.
    Ignore,
    /// Buffer the decoded body in memory.
    Bytes,
    /// Adapt the decoded body into a chunk stream.
    ///
    /// Requires a client built with
    /// [`streaming`][crate::ClientBuilder::streaming] enabled; other
    /// clients fail the request before any I/O happens.
    Stream,
    /// Write the decoded body to the given path, creating or truncating
    /// the file. Parent directories are assumed to exist.
    SaveToFile(PathBuf),
}

/// The materialized body of a [`Response`], shaped by the requested
/// [`ResponseAs`] strategy.
pub enum ResponseBody {
    /// The body was discarded.
    None,
    /// The decoded body, buffered.
    Bytes(Bytes),
    /// The decoded body as a chunk stream.
    Stream(BytesStream),
    /// The decoded body was written to this path.
    File(PathBuf),
}

impl ResponseBody {
    /// The buffered bytes, if the body was materialized with
    /// [`ResponseAs::Bytes`].
    pub fn bytes(&self) -> Option<&Bytes> {
        match *self {
            ResponseBody::Bytes(ref bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The saved file path, if the body was materialized with
    /// [`ResponseAs::SaveToFile`].
    pub fn path(&self) -> Option<&std::path::Path> {
        match *self {
            ResponseBody::File(ref path) => Some(path),
            _ => None,
        }
    }

    /// The chunk stream, if the body was materialized with
    /// [`ResponseAs::Stream`].
    pub fn into_stream(self) -> Option<BytesStream> {
        match self {
            ResponseBody::Stream(stream) => Some(stream),
            _ => None,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ResponseBody::None => f.write_str("None"),
            ResponseBody::Bytes(ref bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream"),
            ResponseBody::File(ref path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// Materialize decoded bytes according to the requested strategy.
///
/// Every outcome, success or failure, is reported through the returned
/// `Result`; strategy failures never escape as panics.
pub(crate) async fn materialize(
    strategy: ResponseAs,
    decoded: Bytes,
    streaming: bool,
) -> Result<ResponseBody> {
    match strategy {
        ResponseAs::Ignore => Ok(ResponseBody::None),
        ResponseAs::Bytes => Ok(ResponseBody::Bytes(decoded)),
        ResponseAs::Stream => {
            if !streaming {
                return Err(error::stream_unsupported());
            }
            Ok(ResponseBody::Stream(Box::pin(stream::once(future::ready(
                Ok(decoded),
            )))))
        }
        ResponseAs::SaveToFile(path) => {
            debug!("saving {} response bytes to {:?}", decoded.len(), path);
            tokio::fs::write(&path, &decoded)
                .await
                .map_err(error::file)?;
            Ok(ResponseBody::File(path))
        }
    }
}

/// A Response to a submitted `Request`.
pub struct Response {
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    url: Url,
    body: ResponseBody,
    trailers: HeaderMap,
}

impl Response {
    pub(crate) fn new(
        status: StatusCode,
        reason: Option<String>,
        headers: HeaderMap,
        body: ResponseBody,
        url: Url,
    ) -> Response {
        Response {
            status,
            reason,
            headers,
            url,
            body,
            trailers: HeaderMap::new(),
        }
    }

    /// Get the `StatusCode` of this `Response`.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the status line's reason phrase.
    ///
    /// Transports that do not expose the server's reason phrase fall back
    /// to the canonical phrase for the status code, or the empty string.
    pub fn reason(&self) -> &str {
        match self.reason {
            Some(ref reason) => reason,
            None => self.status.canonical_reason().unwrap_or(""),
        }
    }

    /// Get the `Headers` of this `Response`.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the `Headers` of this `Response`.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the trailer headers of this `Response`.
    ///
    /// Reserved; always empty in this design.
    pub fn trailers(&self) -> &HeaderMap {
        &self.trailers
    }

    /// Get the final `Url` of this `Response`.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the content length of the response, if it is known.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
    }

    /// Get the materialized body.
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Consume the response, returning the materialized body.
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// The buffered body bytes, if the request asked for
    /// [`ResponseAs::Bytes`].
    pub fn bytes(&self) -> Option<&Bytes> {
        self.body.bytes()
    }

    /// Decode the buffered body as text.
    ///
    /// The character encoding is taken from the `charset` parameter of the
    /// `Content-Type` header, defaulting to UTF-8. Fails if the body was
    /// not materialized as bytes.
    pub fn text(&self) -> Result<String> {
        self.text_with_charset("utf-8")
    }

    /// Decode the buffered body as text with a fallback encoding.
    ///
    /// The `Content-Type` charset still wins when present; `default_encoding`
    /// is the label used when it is absent.
    pub fn text_with_charset(&self, default_encoding: &str) -> Result<String> {
        let bytes = self
            .body
            .bytes()
            .ok_or_else(|| error::decode("response body was not materialized as bytes"))?;
        let content_type = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<Mime>().ok());
        let encoding_name = content_type
            .as_ref()
            .and_then(|mime| mime.get_param(mime::CHARSET).map(|charset| charset.as_str()))
            .unwrap_or(default_encoding);
        let encoding = Encoding::for_label(encoding_name.as_bytes()).unwrap_or(encoding_rs::UTF_8);

        let (text, _, _) = encoding.decode(bytes);
        Ok(text.into_owned())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(body: ResponseBody, headers: HeaderMap) -> Response {
        Response::new(
            StatusCode::OK,
            None,
            headers,
            body,
            Url::parse("http://example.local/").unwrap(),
        )
    }

    #[tokio::test]
    async fn ignore_discards_the_body() {
        let body = materialize(ResponseAs::Ignore, Bytes::from_static(b"x"), false)
            .await
            .unwrap();
        assert!(matches!(body, ResponseBody::None));
    }

    #[tokio::test]
    async fn bytes_never_performs_io() {
        let body = materialize(ResponseAs::Bytes, Bytes::from_static(b"abc"), false)
            .await
            .unwrap();
        assert_eq!(body.bytes().unwrap(), &Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn stream_fails_without_capability() {
        let err = materialize(ResponseAs::Stream, Bytes::new(), false)
            .await
            .unwrap_err();
        assert!(err.is_stream_unsupported());
    }

    #[tokio::test]
    async fn stream_succeeds_with_capability() {
        use futures_util::TryStreamExt;

        let body = materialize(ResponseAs::Stream, Bytes::from_static(b"flow"), true)
            .await
            .unwrap();
        let chunks: Vec<Bytes> = body.into_stream().unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"flow");
    }

    #[tokio::test]
    async fn save_to_file_writes_and_returns_the_path() {
        let path = std::env::temp_dir().join("courier-response-save.bin");
        let body = materialize(
            ResponseAs::SaveToFile(path.clone()),
            Bytes::from_static(b"saved"),
            false,
        )
        .await
        .unwrap();
        assert_eq!(body.path().unwrap(), path);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"saved");
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn save_to_file_reports_the_underlying_cause() {
        let path = std::path::Path::new("/definitely/missing/parent/dir/file.bin");
        let err = materialize(
            ResponseAs::SaveToFile(path.to_path_buf()),
            Bytes::from_static(b"lost"),
            false,
        )
        .await
        .unwrap_err();
        assert!(err.is_file());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn reason_falls_back_to_canonical() {
        let res = response_with(ResponseBody::None, HeaderMap::new());
        assert_eq!(res.reason(), "OK");
    }

    #[test]
    fn text_honors_content_type_charset() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            "text/plain; charset=windows-1252".parse().unwrap(),
        );
        let res = response_with(
            ResponseBody::Bytes(Bytes::from_static(b"h\xe9llo")),
            headers,
        );
        assert_eq!(res.text().unwrap(), "héllo");
    }

    #[test]
    fn trailers_are_reserved_and_empty() {
        let res = response_with(ResponseBody::None, HeaderMap::new());
        assert!(res.trailers().is_empty());
    }
}
