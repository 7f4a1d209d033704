use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use encoding_rs::Encoding;
use futures_core::Stream;
use futures_util::{stream, TryStreamExt};
use http::header::HeaderValue;
use http_body::{Frame, SizeHint};
use mime::Mime;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::BoxError;
use crate::multipart::Form;
use crate::{error, Result};

/// A stream of body chunks.
///
/// This is the native streaming representation of this crate: responses
/// materialized with [`ResponseAs::Stream`][crate::ResponseAs::Stream] yield
/// one, and [`Body::wrap_stream`] accepts anything convertible into one.
pub type BytesStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, BoxError>> + Send>>;

/// The body of an outgoing `Request`.
///
/// A body is exactly one of a closed set of kinds: empty, text (with a
/// declared character encoding), in-memory bytes, an async reader, a file
/// streamed from disk, a caller-supplied chunk stream, or a multipart form.
pub struct Body {
    pub(crate) kind: Kind,
    pub(crate) media_type: Option<Mime>,
}

pub(crate) enum Kind {
    Empty,
    Text {
        content: Cow<'static, str>,
        encoding: &'static Encoding,
    },
    Bytes(Bytes),
    Reader(Pin<Box<dyn AsyncRead + Send + 'static>>),
    File(PathBuf),
    Stream(BytesStream),
    Multipart(Form),
}

impl Body {
    /// An empty body with zero content length.
    pub fn empty() -> Body {
        Body {
            kind: Kind::Empty,
            media_type: None,
        }
    }

    /// A UTF-8 text body.
    pub fn text<T>(content: T) -> Body
    where
        T: Into<Cow<'static, str>>,
    {
        Body::text_with_encoding(content, encoding_rs::UTF_8)
    }

    /// A text body encoded with the given character encoding at send time.
    pub fn text_with_encoding<T>(content: T, encoding: &'static Encoding) -> Body
    where
        T: Into<Cow<'static, str>>,
    {
        Body {
            kind: Kind::Text {
                content: content.into(),
                encoding,
            },
            media_type: None,
        }
    }

    /// A body from in-memory bytes.
    pub fn bytes<B>(content: B) -> Body
    where
        B: Into<Bytes>,
    {
        Body {
            kind: Kind::Bytes(content.into()),
            media_type: None,
        }
    }

    /// A body streamed from an async reader.
    ///
    /// The backend does not assume a known length for reader bodies; the
    /// transport sends them chunked.
    pub fn reader<R>(reader: R) -> Body
    where
        R: AsyncRead + Send + 'static,
    {
        Body {
            kind: Kind::Reader(Box::pin(reader)),
            media_type: None,
        }
    }

    /// A body streamed from a file on disk.
    ///
    /// The file is opened lazily when the request is sent, not when the
    /// body is constructed.
    pub fn file<P>(path: P) -> Body
    where
        P: Into<PathBuf>,
    {
        Body {
            kind: Kind::File(path.into()),
            media_type: None,
        }
    }

    /// A body from a caller-supplied stream of chunks.
    ///
    /// Sending a stream body requires a client built with
    /// [`streaming`][crate::ClientBuilder::streaming] enabled; other clients
    /// reject it before any I/O happens.
    pub fn wrap_stream<S, E>(stream: S) -> Body
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Body {
            kind: Kind::Stream(Box::pin(stream.map_err(Into::into))),
            media_type: None,
        }
    }

    pub(crate) fn multipart(form: Form) -> Body {
        Body {
            kind: Kind::Multipart(form),
            media_type: None,
        }
    }

    /// Declare the media type of this body.
    ///
    /// The declared type fills the outgoing `Content-Type` header when the
    /// caller did not set one; multipart bodies ignore it since their
    /// boundary content type always wins.
    pub fn with_media_type(mut self, media_type: Mime) -> Body {
        self.media_type = Some(media_type);
        self
    }

    pub(crate) fn is_multipart(&self) -> bool {
        matches!(self.kind, Kind::Multipart(_))
    }

    /// Translate into the transport-level body producer plus the content
    /// type the outgoing request should carry (if any).
    pub(crate) fn into_transport(self, streaming: bool) -> Result<(TransportBody, Option<HeaderValue>)> {
        match self.kind {
            Kind::Empty => Ok((TransportBody::empty(), content_type_value(self.media_type)?)),
            Kind::Text { content, encoding } => {
                let media_type = match self.media_type {
                    Some(mime) => Some(HeaderValue::from_str(mime.as_ref()).map_err(error::builder)?),
                    None => Some(
                        HeaderValue::from_str(&format!("text/plain; charset={}", encoding.name()))
                            .map_err(error::builder)?,
                    ),
                };
                Ok((TransportBody::buffered(encode_text(&content, encoding)), media_type))
            }
            Kind::Bytes(content) => Ok((
                TransportBody::buffered(content),
                content_type_value(self.media_type)?,
            )),
            Kind::Reader(reader) => {
                let chunks = ReaderStream::new(reader).map_err(|e| Box::new(e) as BoxError);
                Ok((
                    TransportBody::streaming(chunks),
                    content_type_value(self.media_type)?,
                ))
            }
            Kind::File(path) => Ok((
                TransportBody::from_stream(file_stream(path)),
                content_type_value(self.media_type)?,
            )),
            Kind::Stream(chunks) => {
                if !streaming {
                    return Err(error::stream_unsupported());
                }
                Ok((
                    TransportBody::from_stream(chunks),
                    content_type_value(self.media_type)?,
                ))
            }
            Kind::Multipart(form) => {
                let media_type =
                    HeaderValue::from_str(&form.content_type()).map_err(error::builder)?;
                Ok((TransportBody::from_stream(form.into_stream()?), Some(media_type)))
            }
        }
    }
}

fn content_type_value(media_type: Option<Mime>) -> Result<Option<HeaderValue>> {
    match media_type {
        Some(mime) => Ok(Some(
            HeaderValue::from_str(mime.as_ref()).map_err(error::builder)?,
        )),
        None => Ok(None),
    }
}

pub(crate) fn encode_text(content: &str, encoding: &'static Encoding) -> Bytes {
    let (encoded, _, _) = encoding.encode(content);
    match encoded {
        Cow::Borrowed(_) => Bytes::copy_from_slice(&encoded),
        Cow::Owned(vec) => Bytes::from(vec),
    }
}

/// A lazily-opened chunk stream over a file.
///
/// The handle is acquired on first poll and dropped when the stream is, on
/// every exit path.
pub(crate) fn file_stream(path: PathBuf) -> BytesStream {
    let chunks = stream::once(async move {
        let file = tokio::fs::File::open(path).await?;
        Ok::<_, std::io::Error>(ReaderStream::new(file))
    })
    .try_flatten()
    .map_err(|e| Box::new(e) as BoxError);
    Box::pin(chunks)
}

impl From<String> for Body {
    fn from(content: String) -> Body {
        Body::text(content)
    }
}

impl From<&'static str> for Body {
    fn from(content: &'static str) -> Body {
        Body::text(content)
    }
}

impl From<Vec<u8>> for Body {
    fn from(content: Vec<u8>) -> Body {
        Body::bytes(content)
    }
}

impl From<Bytes> for Body {
    fn from(content: Bytes) -> Body {
        Body::bytes(content)
    }
}

impl From<&'static [u8]> for Body {
    fn from(content: &'static [u8]) -> Body {
        Body::bytes(content)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind: &dyn fmt::Debug = match self.kind {
            Kind::Empty => &"Empty",
            Kind::Text { ref content, .. } => content,
            Kind::Bytes(ref content) => content,
            Kind::Reader(_) => &"Reader",
            Kind::File(ref path) => path,
            Kind::Stream(_) => &"Stream",
            Kind::Multipart(ref form) => form,
        };
        f.debug_struct("Body")
            .field("kind", kind)
            .field("media_type", &self.media_type)
            .finish()
    }
}

/// The body handed to a [`Transport`][crate::transport::Transport].
///
/// Buffered bodies report an exact length so the transport can compute
/// `Content-Length`; streaming bodies report no length and go out chunked.
pub struct TransportBody {
    kind: TransportKind,
}

enum TransportKind {
    Buffered(Option<Bytes>),
    Streaming(BytesStream),
}

impl TransportBody {
    pub(crate) fn empty() -> TransportBody {
        TransportBody::buffered(Bytes::new())
    }

    pub(crate) fn buffered(content: Bytes) -> TransportBody {
        TransportBody {
            kind: TransportKind::Buffered(Some(content)),
        }
    }

    pub(crate) fn streaming<S>(chunks: S) -> TransportBody
    where
        S: Stream<Item = std::result::Result<Bytes, BoxError>> + Send + 'static,
    {
        TransportBody::from_stream(Box::pin(chunks))
    }

    pub(crate) fn from_stream(chunks: BytesStream) -> TransportBody {
        TransportBody {
            kind: TransportKind::Streaming(chunks),
        }
    }
}

impl http_body::Body for TransportBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Bytes>, BoxError>>> {
        match self.get_mut().kind {
            TransportKind::Buffered(ref mut content) => {
                Poll::Ready(content.take().filter(|b| !b.is_empty()).map(|b| Ok(Frame::data(b))))
            }
            TransportKind::Streaming(ref mut chunks) => match chunks.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(Frame::data(chunk)))),
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        match self.kind {
            TransportKind::Buffered(ref content) => {
                content.as_ref().map(|b| b.is_empty()).unwrap_or(true)
            }
            TransportKind::Streaming(_) => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self.kind {
            TransportKind::Buffered(ref content) => {
                SizeHint::with_exact(content.as_ref().map(|b| b.len() as u64).unwrap_or(0))
            }
            TransportKind::Streaming(_) => SizeHint::default(),
        }
    }
}

impl fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TransportKind::Buffered(ref content) => f
                .debug_tuple("TransportBody::Buffered")
                .field(&content.as_ref().map(|b| b.len()).unwrap_or(0))
                .finish(),
            TransportKind::Streaming(_) => f.debug_tuple("TransportBody::Streaming").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn collect(body: TransportBody) -> Vec<u8> {
        body.collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn empty_round_trip() {
        let (body, media_type) = Body::empty().into_transport(false).unwrap();
        assert!(media_type.is_none());
        assert_eq!(collect(body).await, b"");
    }

    #[tokio::test]
    async fn text_round_trip_utf8() {
        let (body, media_type) = Body::text("hello").into_transport(false).unwrap();
        assert_eq!(media_type.unwrap(), "text/plain; charset=UTF-8");
        assert_eq!(collect(body).await, b"hello");
    }

    #[tokio::test]
    async fn text_encodes_with_declared_charset() {
        let (body, media_type) = Body::text_with_encoding("héllo", encoding_rs::WINDOWS_1252)
            .into_transport(false)
            .unwrap();
        assert_eq!(media_type.unwrap(), "text/plain; charset=windows-1252");
        assert_eq!(collect(body).await, b"h\xe9llo");
    }

    #[tokio::test]
    async fn bytes_round_trip() {
        let input = vec![0u8, 159, 146, 150];
        let (body, media_type) = Body::bytes(input.clone()).into_transport(false).unwrap();
        assert!(media_type.is_none());
        assert_eq!(collect(body).await, input);
    }

    #[tokio::test]
    async fn bytes_report_exact_length() {
        let (body, _) = Body::bytes(&b"12345"[..]).into_transport(false).unwrap();
        assert_eq!(http_body::Body::size_hint(&body).exact(), Some(5));
    }

    #[tokio::test]
    async fn reader_round_trip_has_no_known_length() {
        let (body, _) = Body::reader(&b"streamed bytes"[..])
            .into_transport(false)
            .unwrap();
        assert_eq!(http_body::Body::size_hint(&body).exact(), None);
        assert_eq!(collect(body).await, b"streamed bytes");
    }

    #[tokio::test]
    async fn file_round_trip() {
        let path = std::env::temp_dir().join("courier-body-file-round-trip.txt");
        tokio::fs::write(&path, b"file contents").await.unwrap();

        let (body, _) = Body::file(&path).into_transport(false).unwrap();
        assert_eq!(collect(body).await, b"file contents");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_surfaces_on_send_not_build() {
        let (body, _) = Body::file("/definitely/not/here.txt")
            .into_transport(false)
            .unwrap();
        let err = body.collect().await.unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().expect("io error");
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn stream_body_requires_capability() {
        let chunks = stream::iter([Ok::<_, std::io::Error>(Bytes::from_static(b"x"))]);
        let err = Body::wrap_stream(chunks).into_transport(false).unwrap_err();
        assert!(err.is_stream_unsupported());
    }

    #[tokio::test]
    async fn stream_body_round_trip_when_enabled() {
        let chunks = stream::iter([
            Ok::<_, std::io::Error>(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ]);
        let (body, _) = Body::wrap_stream(chunks).into_transport(true).unwrap();
        assert_eq!(collect(body).await, b"abcd");
    }

    #[tokio::test]
    async fn declared_media_type_is_reported() {
        let (_, media_type) = Body::bytes(&b"{}"[..])
            .with_media_type(mime::APPLICATION_JSON)
            .into_transport(false)
            .unwrap();
        assert_eq!(media_type.unwrap(), "application/json");
    }
}
