mod support;

use std::sync::Arc;
use std::time::Duration;

use courier::header::{HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use courier::{Body, Client, ResponseAs, ResponseBody};
use support::MockTransport;

fn client_with(mock: &MockTransport) -> Client {
    Client::builder()
        .transport(Arc::new(mock.clone()))
        .build()
        .unwrap()
}

fn encoding_headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_ENCODING, HeaderValue::from_str(value).unwrap());
    headers
}

#[tokio::test]
async fn headers_are_copied_verbatim_except_content_length() {
    let mock = MockTransport::ok("");
    let client = client_with(&mock);

    client
        .post("http://example.local/echo")
        .header("x-custom", "yes")
        .header_append("x-many", "1")
        .header_append("x-many", "2")
        .header(CONTENT_LENGTH, "999")
        .body(Body::reader(&b"streamed"[..]))
        .send()
        .await
        .unwrap();

    let seen = &mock.requests()[0];
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.headers.get("x-custom").unwrap(), "yes");
    let many: Vec<_> = seen
        .headers
        .get_all("x-many")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(many, ["1", "2"]);
    assert!(seen.headers.get(CONTENT_LENGTH).is_none());
    assert_eq!(seen.body, b"streamed");
}

#[tokio::test]
async fn text_body_fills_content_type_when_caller_did_not() {
    let mock = MockTransport::ok("");
    let client = client_with(&mock);

    client
        .post("http://example.local/text")
        .body("hello")
        .send()
        .await
        .unwrap();

    let seen = &mock.requests()[0];
    assert_eq!(
        seen.headers.get(CONTENT_TYPE).unwrap(),
        "text/plain; charset=UTF-8"
    );
    assert_eq!(seen.body, b"hello");
}

#[tokio::test]
async fn caller_content_type_wins_for_plain_bodies() {
    let mock = MockTransport::ok("");
    let client = client_with(&mock);

    client
        .post("http://example.local/text")
        .header(CONTENT_TYPE, "application/csv")
        .body("a,b")
        .send()
        .await
        .unwrap();

    let seen = &mock.requests()[0];
    assert_eq!(seen.headers.get(CONTENT_TYPE).unwrap(), "application/csv");
}

#[tokio::test]
async fn multipart_sets_boundary_content_type_and_strips_content_length() {
    let mock = MockTransport::ok("");
    let client = client_with(&mock);

    let form = courier::multipart::Form::new()
        .text("field", "v")
        .text("other", "w");
    let boundary = form.boundary().to_owned();

    client
        .post("http://example.local/upload")
        .header(CONTENT_LENGTH, "42")
        .header(CONTENT_TYPE, "text/plain")
        .multipart(form)
        .send()
        .await
        .unwrap();

    let seen = &mock.requests()[0];
    assert!(seen.headers.get(CONTENT_LENGTH).is_none());
    assert_eq!(
        seen.headers.get(CONTENT_TYPE).unwrap().to_str().unwrap(),
        format!("multipart/form-data; boundary={boundary}")
    );

    let body = std::str::from_utf8(&seen.body).unwrap();
    assert_eq!(body.matches(&format!("--{boundary}\r\n")).count(), 2);
    assert_eq!(body.matches(&format!("--{boundary}--\r\n")).count(), 1);
    let field_at = body.find("name=\"field\"").unwrap();
    let other_at = body.find("name=\"other\"").unwrap();
    assert!(field_at < other_at);
}

#[tokio::test]
async fn gzip_response_is_transparently_decoded() {
    let mock = MockTransport::replying(200, encoding_headers("gzip"), support::gzip(b"world"));
    let client = client_with(&mock);

    let res = client
        .get("http://example.local/gzip")
        .body("hello")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.bytes().unwrap().as_ref(), b"world");
}

#[tokio::test]
async fn deflate_response_is_transparently_decoded() {
    let mock = MockTransport::replying(200, encoding_headers("deflate"), support::deflate(b"world"));
    let client = client_with(&mock);

    let res = client
        .get("http://example.local/deflate")
        .send()
        .await
        .unwrap();

    assert_eq!(res.bytes().unwrap().as_ref(), b"world");
}

#[tokio::test]
async fn head_responses_skip_decoding() {
    let raw = b"not actually gzip".to_vec();
    let mock = MockTransport::replying(200, encoding_headers("gzip"), raw.clone());
    let client = client_with(&mock);

    let res = client
        .head("http://example.local/gzip")
        .send()
        .await
        .unwrap();

    assert_eq!(res.bytes().unwrap().as_ref(), &raw[..]);
}

#[tokio::test]
async fn corrupt_gzip_is_a_decode_error_not_a_transport_error() {
    let mock = MockTransport::replying(200, encoding_headers("gzip"), &b"junk"[..]);
    let client = client_with(&mock);

    let err = client
        .get("http://example.local/gzip")
        .send()
        .await
        .unwrap_err();

    assert!(err.is_decode());
    assert!(!err.is_transport());
    assert_eq!(err.url().unwrap().as_str(), "http://example.local/gzip");
}

#[tokio::test]
async fn ignore_strategy_discards_the_body() {
    let mock = MockTransport::ok("does not matter");
    let client = client_with(&mock);

    let res = client
        .get("http://example.local/")
        .response_as(ResponseAs::Ignore)
        .send()
        .await
        .unwrap();

    assert!(matches!(res.body(), ResponseBody::None));
    assert!(res.bytes().is_none());
}

#[tokio::test]
async fn save_to_file_strategy_writes_the_decoded_body() {
    let path = std::env::temp_dir().join("courier-client-save-to-file.bin");
    let mock = MockTransport::replying(200, encoding_headers("gzip"), support::gzip(b"to disk"));
    let client = client_with(&mock);

    let res = client
        .get("http://example.local/download")
        .response_as(ResponseAs::SaveToFile(path.clone()))
        .send()
        .await
        .unwrap();

    assert_eq!(res.body().path().unwrap(), path);
    assert_eq!(tokio::fs::read(&path).await.unwrap(), b"to disk");
    tokio::fs::remove_file(&path).await.unwrap();
}

#[tokio::test]
async fn save_to_file_failure_carries_the_cause() {
    let mock = MockTransport::ok("body");
    let client = client_with(&mock);

    let err = client
        .get("http://example.local/download")
        .response_as(ResponseAs::SaveToFile("/no/such/parent/file.bin".into()))
        .send()
        .await
        .unwrap_err();

    assert!(err.is_file());
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn stream_strategy_fails_before_any_io_by_default() {
    let mock = MockTransport::ok("body");
    let client = client_with(&mock);

    let err = client
        .get("http://example.local/stream")
        .response_as(ResponseAs::Stream)
        .send()
        .await
        .unwrap_err();

    assert!(err.is_stream_unsupported());
    assert_eq!(mock.request_count(), 0, "must fail before any I/O");
}

#[tokio::test]
async fn stream_strategy_works_on_a_streaming_client() {
    use futures_util::TryStreamExt;

    let mock = MockTransport::replying(200, encoding_headers("gzip"), support::gzip(b"flowing"));
    let client = Client::builder()
        .transport(Arc::new(mock.clone()))
        .streaming(true)
        .build()
        .unwrap();

    let res = client
        .get("http://example.local/stream")
        .response_as(ResponseAs::Stream)
        .send()
        .await
        .unwrap();

    let chunks: Vec<_> = res.into_body().into_stream().unwrap().try_collect().await.unwrap();
    assert_eq!(chunks.concat(), b"flowing");
}

#[tokio::test]
async fn stream_bodies_are_rejected_without_the_capability() {
    let mock = MockTransport::ok("");
    let client = client_with(&mock);

    let chunks =
        futures_util::stream::iter([Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"x"))]);
    let err = client
        .post("http://example.local/upload")
        .body(Body::wrap_stream(chunks))
        .send()
        .await
        .unwrap_err();

    assert!(err.is_stream_unsupported());
    assert_eq!(mock.request_count(), 0, "must fail before any I/O");
}

#[tokio::test]
async fn stream_bodies_are_sent_by_a_streaming_client() {
    let mock = MockTransport::ok("");
    let client = Client::builder()
        .transport(Arc::new(mock.clone()))
        .streaming(true)
        .build()
        .unwrap();

    let chunks = futures_util::stream::iter([
        Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"ab")),
        Ok(bytes::Bytes::from_static(b"cd")),
    ]);
    client
        .post("http://example.local/upload")
        .body(Body::wrap_stream(chunks))
        .send()
        .await
        .unwrap();

    assert_eq!(mock.requests()[0].body, b"abcd");
}

#[tokio::test]
async fn transport_errors_propagate_verbatim() {
    let mock = MockTransport::failing("connection refused");
    let client = client_with(&mock);

    let err = client
        .get("http://example.local/down")
        .send()
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(mock.request_count(), 1, "no retries");
}

#[tokio::test]
async fn file_bodies_stream_from_disk() {
    let path = std::env::temp_dir().join("courier-client-file-body.bin");
    tokio::fs::write(&path, b"from disk").await.unwrap();

    let mock = MockTransport::ok("");
    let client = client_with(&mock);
    client
        .put("http://example.local/upload")
        .body(Body::file(path.clone()))
        .send()
        .await
        .unwrap();

    assert_eq!(mock.requests()[0].body, b"from disk");
    tokio::fs::remove_file(&path).await.unwrap();
}

#[tokio::test]
async fn read_timeout_is_handed_to_the_transport() {
    let mock = MockTransport::ok("");
    let client = Client::builder()
        .transport(Arc::new(mock.clone()))
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap();

    client.get("http://example.local/a").send().await.unwrap();
    client
        .get("http://example.local/b")
        .timeout(Duration::from_secs(2))
        .send()
        .await
        .unwrap();

    let seen = mock.requests();
    assert_eq!(seen[0].read_timeout, Some(Duration::from_secs(30)));
    assert_eq!(seen[1].read_timeout, Some(Duration::from_secs(2)));
}

#[tokio::test]
async fn reason_phrase_falls_back_to_canonical() {
    let mock = MockTransport::replying(404, HeaderMap::new(), "");
    let client = client_with(&mock);

    let res = client
        .get("http://example.local/missing")
        .response_as(ResponseAs::Ignore)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(res.reason(), "Not Found");
    assert!(res.trailers().is_empty());
}

#[test]
fn owned_transport_is_shut_down_exactly_once() {
    let mock = MockTransport::ok("");
    let client = Client::builder()
        .transport_owned(Arc::new(mock.clone()))
        .build()
        .unwrap();

    client.close();
    client.close();
    assert_eq!(mock.shutdowns(), 1);

    drop(client);
    assert_eq!(mock.shutdowns(), 1);
}

#[test]
fn owned_transport_is_shut_down_on_drop() {
    let mock = MockTransport::ok("");
    let client = Client::builder()
        .transport_owned(Arc::new(mock.clone()))
        .build()
        .unwrap();

    drop(client);
    assert_eq!(mock.shutdowns(), 1);
}

#[test]
fn external_transport_is_left_untouched() {
    let mock = MockTransport::ok("");
    let client = Client::builder()
        .transport(Arc::new(mock.clone()))
        .build()
        .unwrap();

    client.close();
    client.close();
    drop(client);
    assert_eq!(mock.shutdowns(), 0);
}
