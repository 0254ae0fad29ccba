//! Minimal restgate example: a tiny link store with JSON and form input.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/links/1
//!   curl -X POST http://localhost:3000/links \
//!        -H 'content-type: application/json' \
//!        -d '{"url":"https://example.com"}'
//!   curl -X POST http://localhost:3000/links -d 'url=https://example.com'
//!   curl -X POST http://localhost:3000/links -H 'content-type: text/plain' -d hi   # 415
//!   curl http://localhost:3000/slow                                               # 429
//!   curl http://localhost:3000/todo                                               # 501

use std::time::Duration;

use http::{Method, StatusCode};
use restgate::{json, Api, ApiError, Context, HandlerResult, Request, ResponseWriter, Server};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
struct Link {
    url: String,
}

#[tokio::main]
async fn main() -> Result<(), restgate::Error> {
    tracing_subscriber::fmt::init();

    let api = Api::builder()
        .timeout(Duration::from_secs(2))
        .build(links)
        .expect("valid configuration");

    Server::bind("0.0.0.0:3000").await?.serve(api).await
}

async fn links(ctx: Context, w: ResponseWriter, req: Request) -> HandlerResult {
    let method = req.method();
    match req.path() {
        "/links/1" if method == Method::GET => {
            json::write_json(&w, StatusCode::OK, &Link { url: "https://example.com".into() })?;
        }
        "/links" if method == Method::POST => {
            let link: Link = if req.header("content-type").is_some_and(|t| t.starts_with("application/json")) {
                req.json()?
            } else {
                req.form()?
            };
            if link.url.is_empty() {
                return Err(ApiError::validation(["url must not be empty"]).into());
            }
            json::write_json(&w, StatusCode::CREATED, &link)?;
        }
        "/slow" if method == Method::GET => {
            // Outlives the 2 s timeout; the client gets 429.
            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs(5)) => {}
                _ = ctx.done() => return Ok(()),
            }
            w.write_header(StatusCode::OK);
        }
        // Forgot to respond: the client gets 501.
        "/todo" => {}
        _ => return Err(ApiError::not_found().into()),
    }
    Ok(())
}
