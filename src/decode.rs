//! Transparent decoding of compressed response bodies.
//!
//! The decoder runs after the transport call resolves, on the fully
//! buffered raw body. HEAD responses are never decoded: their headers
//! describe the representation a GET would have returned, so the (empty)
//! raw bytes pass through untouched.

use std::io::Read;

use bytes::Bytes;
use flate2::bufread::{DeflateDecoder, GzDecoder};
use http::header::CONTENT_ENCODING;
use http::{HeaderMap, Method};
use log::{trace, warn};

use crate::{error, Result};

/// Decode a response body according to its `Content-Encoding` header.
///
/// Values other than `gzip` and `deflate` pass the raw bytes through
/// unchanged. `deflate` is interpreted as a raw deflate stream, the
/// interpretation common HTTP servers use.
pub(crate) fn decode(method: &Method, headers: &HeaderMap, raw: Bytes) -> Result<Bytes> {
    if *method == Method::HEAD {
        return Ok(raw);
    }

    let encoding = headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase());

    match encoding.as_deref() {
        Some("gzip") => {
            if raw.is_empty() {
                warn!("gzip response with an empty body");
                return Ok(raw);
            }
            trace!("decoding gzip body of {} bytes", raw.len());
            inflate(GzDecoder::new(&raw[..]))
        }
        Some("deflate") => {
            if raw.is_empty() {
                warn!("deflate response with an empty body");
                return Ok(raw);
            }
            trace!("decoding deflate body of {} bytes", raw.len());
            inflate(DeflateDecoder::new(&raw[..]))
        }
        _ => Ok(raw),
    }
}

/// Run a decoder to completion, requiring it to consume its whole input.
///
/// Truncated or corrupt streams and trailing garbage after the compressed
/// stream both surface as decode errors; partial output is never returned.
fn inflate<D>(mut decoder: D) -> Result<Bytes>
where
    D: Read + Remaining,
{
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).map_err(error::decode)?;
    if decoder.remaining() != 0 {
        return Err(error::decode(
            "unexpected data after the compressed stream ended",
        ));
    }
    Ok(decoded.into())
}

/// Bytes of input a decoder left unconsumed.
trait Remaining {
    fn remaining(&self) -> usize;
}

impl<'a> Remaining for GzDecoder<&'a [u8]> {
    fn remaining(&self) -> usize {
        self.get_ref().len()
    }
}

impl<'a> Remaining for DeflateDecoder<&'a [u8]> {
    fn remaining(&self) -> usize {
        self.get_ref().len()
    }
}
