//! Request timeouts. Time is paused, so the sleeps below cost nothing.

use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::BodyExt;
use restgate::{Api, Cancellation, Context, ErrorMessage, HandlerResult, Request, ResponseWriter};
use tokio::sync::mpsc;

async fn get(api: &Api) -> (StatusCode, Bytes) {
    let req = http::Request::get("/slow").body(Bytes::new()).unwrap();
    let res = api.serve(req.into()).await;
    let status = res.status();
    (status, res.into_body().collect().await.unwrap().to_bytes())
}

fn with_timeout(ms: u64, handler: impl restgate::Handler) -> Api {
    Api::builder()
        .timeout(Duration::from_millis(ms))
        .build(handler)
        .unwrap()
}

async fn sleeps_one_second(_: Context, w: ResponseWriter, _: Request) -> HandlerResult {
    tokio::time::sleep(Duration::from_secs(1)).await;
    w.write_header(StatusCode::OK);
    Ok(())
}

async fn quick(_: Context, w: ResponseWriter, _: Request) -> HandlerResult {
    w.write(b"done")?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn slow_handler_gets_429() {
    let api = with_timeout(50, sleeps_one_second);
    let (status, body) = get(&api).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let msg: ErrorMessage = serde_json::from_slice(&body).unwrap();
    assert_eq!(msg.errors, ["request took too long to complete"]);
}

#[tokio::test(start_paused = true)]
async fn timeout_is_measured_from_the_start_of_the_request() {
    let api = with_timeout(50, sleeps_one_second);
    let started = tokio::time::Instant::now();
    let _ = get(&api).await;
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(50), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn fast_handler_is_unaffected() {
    let api = with_timeout(50, quick);
    let (status, body) = get(&api).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"done");

    // The context is cancelled on completion; the deadline passing later
    // must not produce anything.
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test(start_paused = true)]
async fn without_timeout_slow_handlers_finish() {
    let api = Api::new(sleeps_one_second);
    let (status, _) = get(&api).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn handler_sees_deadline_exceeded() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let api = with_timeout(20, move |ctx: Context, _: ResponseWriter, _: Request| {
        let tx = tx.clone();
        async move {
            // Hand the context out; the handler itself is dropped at the deadline.
            let _ = tx.send(ctx.clone());
            std::future::pending::<()>().await;
            HandlerResult::Ok(())
        }
    });

    let (status, _) = get(&api).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let ctx = rx.recv().await.unwrap();
    assert_eq!(ctx.err(), Some(Cancellation::DeadlineExceeded));
}

#[tokio::test(start_paused = true)]
async fn completed_handler_sees_plain_cancellation() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let api = with_timeout(20, move |ctx: Context, w: ResponseWriter, _: Request| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(ctx);
            w.write_header(StatusCode::ACCEPTED);
            HandlerResult::Ok(())
        }
    });

    let (status, _) = get(&api).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let ctx = rx.recv().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ctx.err(), Some(Cancellation::Canceled));
}

#[tokio::test(start_paused = true)]
async fn handler_cancelling_its_own_context_is_not_a_timeout() {
    let api = with_timeout(1_000, |ctx: Context, w: ResponseWriter, _: Request| async move {
        ctx.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        w.write_header(StatusCode::OK);
        HandlerResult::Ok(())
    });

    let (status, _) = get(&api).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn partial_write_before_timeout_is_replaced() {
    let api = with_timeout(30, |_: Context, w: ResponseWriter, _: Request| async move {
        w.write_header(StatusCode::OK);
        w.write(br#"{"items":["#)?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        w.write(b"]}")?;
        HandlerResult::Ok(())
    });

    let (status, body) = get(&api).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let msg: ErrorMessage = serde_json::from_slice(&body).unwrap();
    assert_eq!(msg.errors, ["request took too long to complete"]);
}

#[tokio::test(start_paused = true)]
async fn spawned_writer_cannot_touch_the_timeout_response() {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let api = with_timeout(30, move |_: Context, w: ResponseWriter, _: Request| {
        let done_tx = done_tx.clone();
        async move {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                let _ = done_tx.send(w.write(b"too late").is_err());
            });
            std::future::pending::<()>().await;
            HandlerResult::Ok(())
        }
    });

    let (status, _) = get(&api).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(done_rx.recv().await, Some(true));
}
