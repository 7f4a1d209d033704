//! multipart/form-data
//!
//! A multipart body is assembled as a stream: the framing (boundaries and
//! part headers) is interleaved with each part's content without ever
//! buffering the whole payload, so file-backed parts may be arbitrarily
//! large.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use futures_util::{stream, StreamExt};
use http::HeaderMap;
use mime::Mime;
use percent_encoding::{self, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use uuid::Uuid;

use crate::body::{self, Body, BytesStream};
use crate::error::BoxError;
use crate::{error, Result};

/// A multipart/form-data request body.
pub struct Form {
    boundary: String,
    fields: Vec<(Cow<'static, str>, Part)>,
    percent_encoding: PercentEncoding,
}

/// A field in a multipart form.
///
/// A part's body must be text- or file-backed; anything else is rejected
/// when the request is built, before any network activity.
pub struct Part {
    body: Body,
    mime: Option<Mime>,
    file_name: Option<Cow<'static, str>>,
    headers: HeaderMap,
}

impl Form {
    /// Creates a new Form without any content.
    ///
    /// Every form gets its own randomly generated boundary.
    pub fn new() -> Form {
        Form {
            boundary: format!("{}", Uuid::new_v4().simple()),
            fields: Vec::new(),
            percent_encoding: PercentEncoding::PathSegment,
        }
    }

    /// Get the boundary that this form will use.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field with supplied name and value.
    ///
    /// # Examples
    ///
    /// ```
    /// let form = courier::multipart::Form::new()
    ///     .text("username", "ferris")
    ///     .text("password", "secret");
    /// ```
    pub fn text<T, U>(self, name: T, value: U) -> Form
    where
        T: Into<Cow<'static, str>>,
        U: Into<Cow<'static, str>>,
    {
        self.part(name, Part::text(value))
    }

    /// Add a file field, streamed from disk when the request is sent.
    pub fn file<T, P>(self, name: T, path: P) -> Form
    where
        T: Into<Cow<'static, str>>,
        P: Into<PathBuf>,
    {
        self.part(name, Part::file(path))
    }

    /// Adds a customized Part.
    pub fn part<T>(mut self, name: T, part: Part) -> Form
    where
        T: Into<Cow<'static, str>>,
    {
        self.fields.push((name.into(), part));
        self
    }

    /// Configure this `Form` to percent-encode using the `path-segment` rules.
    pub fn percent_encode_path_segment(mut self) -> Form {
        self.percent_encoding = PercentEncoding::PathSegment;
        self
    }

    /// Configure this `Form` to percent-encode using the `attr-char` rules.
    pub fn percent_encode_attr_chars(mut self) -> Form {
        self.percent_encoding = PercentEncoding::AttrChar;
        self
    }

    pub(crate) fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Consume this instance and transform into a chunk stream framing every
    /// part between boundary delimiters.
    ///
    /// Fails fast if any part's body is neither text- nor file-backed.
    pub(crate) fn into_stream(self) -> Result<BytesStream> {
        let mut pieces: Vec<BytesStream> = Vec::with_capacity(self.fields.len() * 3 + 1);

        for (name, part) in &self.fields {
            let head = self.part_head(name, part);
            let content: BytesStream = match part.body.kind {
                body::Kind::Text {
                    ref content,
                    encoding,
                } => chunk(body::encode_text(content, encoding)),
                body::Kind::File(ref path) => body::file_stream(path.clone()),
                _ => return Err(error::unsupported_part_body(name)),
            };
            pieces.push(chunk(head));
            pieces.push(content);
            pieces.push(chunk(Bytes::from_static(b"\r\n")));
        }

        pieces.push(chunk(format!("--{}--\r\n", self.boundary)));
        Ok(Box::pin(stream::iter(pieces).flatten()))
    }

    /// The boundary line and header block of a single part, through the
    /// blank line separating headers from content.
    ///
    /// Custom headers come first, then the part's `Content-Type`, and the
    /// synthesized `Content-Disposition` is always the last header line.
    fn part_head(&self, name: &str, part: &Part) -> Bytes {
        let mut head = Vec::new();
        head.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());

        for (key, value) in part.headers.iter() {
            head.extend_from_slice(key.as_str().as_bytes());
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }

        if let Some(ref mime) = part.mime {
            head.extend_from_slice(format!("Content-Type: {mime}\r\n").as_bytes());
        }

        head.extend_from_slice(self.percent_encoding.encode_disposition(name, part).as_bytes());
        head.extend_from_slice(b"\r\n\r\n");
        head.into()
    }
}

impl Default for Form {
    fn default() -> Form {
        Form::new()
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Form")
            .field("boundary", &self.boundary)
            .field("parts", &self.fields)
            .finish()
    }
}

impl Part {
    /// Makes a text parameter.
    pub fn text<T>(value: T) -> Part
    where
        T: Into<Cow<'static, str>>,
    {
        Part::new(Body::text(value.into()))
    }

    /// Makes a file parameter, streamed from disk at send time.
    ///
    /// The file name defaults to the path's final component and the MIME
    /// type is guessed from the extension. The file is opened lazily when
    /// the request is sent; a missing file surfaces then, not here.
    pub fn file<P>(path: P) -> Part
    where
        P: Into<PathBuf>,
    {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| Cow::Owned(name.to_string_lossy().into_owned()));
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        Part {
            body: Body::file(path),
            mime: Some(mime),
            file_name,
            headers: HeaderMap::default(),
        }
    }

    /// Makes a parameter from an arbitrary [`Body`].
    ///
    /// Only text- and file-backed bodies are valid part bodies; any other
    /// kind is rejected when the request is built.
    pub fn from_body(body: Body) -> Part {
        Part::new(body)
    }

    fn new(body: Body) -> Part {
        Part {
            body,
            mime: None,
            file_name: None,
            headers: HeaderMap::default(),
        }
    }

    /// Tries to set the mime of this part.
    pub fn mime_str(mut self, mime: &str) -> Result<Part> {
        self.mime = Some(mime.parse().map_err(error::builder)?);
        Ok(self)
    }

    #[cfg(test)]
    fn mime(mut self, mime: Mime) -> Part {
        self.mime = Some(mime);
        self
    }

    /// Sets the filename, builder style.
    pub fn file_name<T>(mut self, filename: T) -> Part
    where
        T: Into<Cow<'static, str>>,
    {
        self.file_name = Some(filename.into());
        self
    }

    /// Returns a reference to the map with additional header fields.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the map with additional header fields.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Part")
            .field("body", &self.body)
            .field("mime", &self.mime)
            .field("file_name", &self.file_name)
            .field("headers", &self.headers)
            .finish()
    }
}

fn chunk<B: Into<Bytes>>(content: B) -> BytesStream {
    Box::pin(stream::iter([Ok::<_, BoxError>(content.into())]))
}

// https://url.spec.whatwg.org/#fragment-percent-encode-set
const FRAGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

// https://url.spec.whatwg.org/#path-percent-encode-set
const PATH: &AsciiSet = &FRAGMENT.add(b'#').add(b'?').add(b'{').add(b'}');

const PATH_SEGMENT: &AsciiSet = &PATH.add(b'/').add(b'%');

// https://tools.ietf.org/html/rfc8187#section-3.2.1
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

enum PercentEncoding {
    PathSegment,
    AttrChar,
}

impl PercentEncoding {
    fn encode_disposition(&self, name: &str, part: &Part) -> String {
        format!(
            "Content-Disposition: form-data; {}{}",
            self.format_parameter("name", name),
            match part.file_name {
                Some(ref file_name) => format!("; {}", self.format_parameter("filename", file_name)),
                None => String::new(),
            },
        )
    }

    fn format_parameter(&self, name: &str, value: &str) -> String {
        let legal_value = match *self {
            PercentEncoding::PathSegment => {
                percent_encoding::utf8_percent_encode(value, PATH_SEGMENT).to_string()
            }
            PercentEncoding::AttrChar => {
                percent_encoding::utf8_percent_encode(value, ATTR_CHAR).to_string()
            }
        };
        if value.len() == legal_value.len() {
            // nothing has been percent encoded
            format!("{name}=\"{value}\"")
        } else {
            // something has been percent encoded
            format!("{name}*=utf-8''{legal_value}")
        }
    }
}
