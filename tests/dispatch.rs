//! Outcome classification: what the client sees for each handler result.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;
use restgate::{
    Api, ApiError, Context, ErrorMessage, HandlerError, HandlerResult, Request, ResponseWriter,
};

struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    body: Bytes,
}

impl Reply {
    fn errors(&self) -> Vec<String> {
        serde_json::from_slice::<ErrorMessage>(&self.body)
            .expect("error body is an ErrorMessage")
            .errors
    }
}

async fn get(api: &Api) -> Reply {
    let req = http::Request::builder()
        .method(Method::GET)
        .uri("/")
        .body(Bytes::new())
        .unwrap();
    let res = api.serve(Request::from(req)).await;
    let status = res.status();
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_owned());
    let body = res.into_body().collect().await.unwrap().to_bytes();
    Reply { status, content_type, body }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn silent(_: Context, _: ResponseWriter, _: Request) -> HandlerResult {
    Ok(())
}

async fn status_only(_: Context, w: ResponseWriter, _: Request) -> HandlerResult {
    w.write_header(StatusCode::OK);
    Ok(())
}

async fn body_only(_: Context, w: ResponseWriter, _: Request) -> HandlerResult {
    w.write(br#"{"ok":true}"#)?;
    Ok(())
}

async fn created(_: Context, w: ResponseWriter, _: Request) -> HandlerResult {
    w.set_header(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    w.write_header(StatusCode::CREATED);
    w.write(b"id\n7\n")?;
    Ok(())
}

async fn opaque(_: Context, _: ResponseWriter, _: Request) -> HandlerResult {
    Err(HandlerError::opaque("mocked error in test case: password=hunter2"))
}

async fn io_failure(_: Context, _: ResponseWriter, _: Request) -> HandlerResult {
    Err(std::io::Error::other("connection reset by database").into())
}

async fn bad_request(_: Context, _: ResponseWriter, _: Request) -> HandlerResult {
    Err(ApiError::bad_request(["something went wrong"]).into())
}

async fn api_error_with_cause(_: Context, _: ResponseWriter, _: Request) -> HandlerResult {
    Err(ApiError::with_cause(
        StatusCode::INTERNAL_SERVER_ERROR,
        std::io::Error::other("test server error"),
        ["custom error message"],
    )
    .into())
}

async fn api_error_without_messages(_: Context, _: ResponseWriter, _: Request) -> HandlerResult {
    Err(ApiError::new(StatusCode::FORBIDDEN, Vec::<String>::new()).into())
}

async fn many_messages(_: Context, _: ResponseWriter, _: Request) -> HandlerResult {
    Err(ApiError::validation(["name is required", "age must be positive", "a"]).into())
}

async fn half_written_then_error(_: Context, w: ResponseWriter, _: Request) -> HandlerResult {
    w.write_header(StatusCode::OK);
    w.write(br#"{"items":["#)?;
    Err(ApiError::validation(["page must be positive"]).into())
}

async fn io_wrapping_api_error(_: Context, _: ResponseWriter, _: Request) -> HandlerResult {
    Err(std::io::Error::other(ApiError::not_found()).into())
}

#[derive(Debug, thiserror::Error)]
#[error("repository lookup failed")]
struct LookupFailed(#[source] ApiError);

async fn chained_api_error(_: Context, _: ResponseWriter, _: Request) -> HandlerResult {
    Err(HandlerError::opaque(LookupFailed(ApiError::validation(["id must be numeric"]))))
}

async fn decodes_garbage(_: Context, _: ResponseWriter, _: Request) -> HandlerResult {
    let _: serde_json::Value = restgate::json::decode_json(b"{oops")?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn default_response_is_501_not_implemented() {
    let reply = get(&Api::new(silent)).await;
    assert_eq!(reply.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(reply.errors(), ["Not Implemented"]);
    assert_eq!(reply.content_type.as_deref(), Some("application/json; charset=utf-8"));
}

#[tokio::test]
async fn writing_a_status_overrides_the_default() {
    let reply = get(&Api::new(status_only)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn writing_a_body_overrides_the_default() {
    let reply = get(&Api::new(body_only)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(&reply.body[..], br#"{"ok":true}"#);
}

#[tokio::test]
async fn successful_response_is_untouched() {
    let reply = get(&Api::new(created)).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.content_type.as_deref(), Some("text/csv"));
    assert_eq!(&reply.body[..], b"id\n7\n");
}

#[tokio::test]
async fn opaque_errors_become_500_without_details() {
    for api in [Api::new(opaque), Api::new(io_failure)] {
        let reply = get(&api).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.errors(), ["Internal Server Error"]);
        let text = String::from_utf8_lossy(&reply.body);
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("database"));
    }
}

#[tokio::test]
async fn api_error_status_and_message_are_sent() {
    let reply = get(&Api::new(bad_request)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.errors(), ["something went wrong"]);
}

#[tokio::test]
async fn api_error_cause_is_not_sent() {
    let reply = get(&Api::new(api_error_with_cause)).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.errors(), ["custom error message"]);
}

#[tokio::test]
async fn api_error_without_messages_sends_reason_phrase() {
    let reply = get(&Api::new(api_error_without_messages)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.errors(), ["Forbidden"]);
}

#[tokio::test]
async fn api_error_messages_keep_their_order() {
    let reply = get(&Api::new(many_messages)).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.errors(), ["name is required", "age must be positive", "a"]);
}

#[tokio::test]
async fn error_wins_over_partial_write() {
    let reply = get(&Api::new(half_written_then_error)).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.errors(), ["page must be positive"]);
}

#[tokio::test]
async fn wrapped_api_error_decides_the_response() {
    let reply = get(&Api::new(io_wrapping_api_error)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.errors(), ["item not found"]);

    let reply = get(&Api::new(chained_api_error)).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.errors(), ["id must be numeric"]);
    assert!(!String::from_utf8_lossy(&reply.body).contains("repository"));
}

#[tokio::test]
async fn malformed_body_helper_yields_400() {
    let reply = get(&Api::new(decodes_garbage)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.errors(), ["expecting well formed request body"]);
}

#[tokio::test]
async fn handler_runs_once_per_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let api = Api::new(move |_: Context, w: ResponseWriter, _: Request| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            w.write_header(StatusCode::NO_CONTENT);
            HandlerResult::Ok(())
        }
    });

    for _ in 0..3 {
        assert_eq!(get(&api).await.status, StatusCode::NO_CONTENT);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn writes_after_the_response_was_sent_are_refused() {
    let (tx, rx) = tokio::sync::oneshot::channel::<ResponseWriter>();
    let tx = Arc::new(parking_lot::Mutex::new(Some(tx)));
    let api = Api::new(move |_: Context, w: ResponseWriter, _: Request| {
        let tx = tx.lock().take();
        async move {
            w.write(b"first")?;
            if let Some(tx) = tx {
                let _ = tx.send(w.clone());
            }
            HandlerResult::Ok(())
        }
    });

    let reply = get(&api).await;
    assert_eq!(&reply.body[..], b"first");

    let leaked = rx.await.unwrap();
    assert!(leaked.is_sealed());
    let err = leaked.write(b"second").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn background_writer_cannot_corrupt_an_error_response() {
    let api = Api::new(|_: Context, w: ResponseWriter, _: Request| async move {
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let spinner = w.clone();
        std::thread::spawn(move || {
            let _ = spinner.write(b"X");
            let _ = started_tx.send(());
            while spinner.write(b"X").is_ok() {}
        });
        let _ = started_rx.await;
        HandlerResult::Err(ApiError::validation(["page must be positive"]).into())
    });

    for _ in 0..50 {
        let reply = get(&api).await;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(&reply.body[..], b"{\"errors\":[\"page must be positive\"]}\n");
    }
}
