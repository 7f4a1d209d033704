#![allow(dead_code)]
//! A mock transport builder helper for the integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use courier::transport::{Transport, TransportFuture, TransportRequest, TransportResponse};
use http::{HeaderMap, Method, StatusCode};
use http_body_util::BodyExt;

/// A transport that replays one canned reply and records everything the
/// client hands to it.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

struct Inner {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    error: Option<String>,
    seen: Mutex<Vec<SeenRequest>>,
    shutdowns: AtomicUsize,
}

/// One request as the transport saw it, body fully collected.
#[derive(Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub read_timeout: Option<Duration>,
}

impl MockTransport {
    pub fn replying<B: Into<Vec<u8>>>(status: u16, headers: HeaderMap, body: B) -> MockTransport {
        MockTransport {
            inner: Arc::new(Inner {
                status: StatusCode::from_u16(status).expect("test status"),
                headers,
                body: body.into(),
                error: None,
                seen: Mutex::new(Vec::new()),
                shutdowns: AtomicUsize::new(0),
            }),
        }
    }

    pub fn ok<B: Into<Vec<u8>>>(body: B) -> MockTransport {
        MockTransport::replying(200, HeaderMap::new(), body)
    }

    pub fn failing(message: &str) -> MockTransport {
        MockTransport {
            inner: Arc::new(Inner {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Vec::new(),
                error: Some(message.to_owned()),
                seen: Mutex::new(Vec::new()),
                shutdowns: AtomicUsize::new(0),
            }),
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.inner.seen.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.inner.seen.lock().unwrap().len()
    }

    pub fn shutdowns(&self) -> usize {
        self.inner.shutdowns.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn send(&self, request: TransportRequest) -> TransportFuture {
        let inner = self.inner.clone();
        Box::pin(async move {
            let TransportRequest {
                method,
                uri,
                headers,
                body,
                read_timeout,
            } = request;

            let collected = body.collect().await?.to_bytes();
            inner.seen.lock().unwrap().push(SeenRequest {
                method,
                uri: uri.to_string(),
                headers,
                body: collected.to_vec(),
                read_timeout,
            });

            if let Some(ref message) = inner.error {
                return Err(message.clone().into());
            }

            Ok(TransportResponse {
                status: inner.status,
                reason: None,
                headers: inner.headers.clone(),
                body: Bytes::from(inner.body.clone()),
            })
        })
    }

    fn shutdown(&self) {
        self.inner.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Gzip-compress a fixture body.
pub fn gzip(input: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(input).unwrap();
    encoder.finish().unwrap()
}

/// Deflate-compress a fixture body with a raw deflate stream.
pub fn deflate(input: &[u8]) -> Vec<u8> {
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(input).unwrap();
    encoder.finish().unwrap()
}
