//! # restgate
//!
//! Context-aware HTTP handlers that return errors instead of writing them.
//!
//! ## The contract
//!
//! A handler either writes its response and returns `Ok(())`, or returns an
//! error and writes nothing. restgate owns every error response: one JSON
//! shape, one content type, one place that decides the status code.
//!
//! ```text
//! {"errors": ["item not found"]}
//! ```
//!
//! Around that contract the [`Api`] dispatcher adds three checks:
//!
//! - **Content-type gate**: `POST`, `PUT` and `PATCH` without a JSON or form
//!   body are refused with `415` before the handler runs.
//! - **Silent handlers**: `Ok(())` with nothing written is a bug, answered
//!   with `501 Not Implemented` so it cannot ship unnoticed.
//! - **Timeouts**: with a timeout configured, a handler that overruns it is
//!   abandoned and the client gets `429`.
//!
//! What restgate does not do: routing, middleware stacks, templates. Put a
//! router inside your handler if you need one.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use http::StatusCode;
//! use restgate::{json, Api, ApiError, Context, HandlerResult, Request, ResponseWriter, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restgate::Error> {
//!     let api = Api::builder()
//!         .timeout(Duration::from_secs(10))
//!         .build(users)
//!         .expect("valid configuration");
//!
//!     Server::bind("0.0.0.0:3000").await?.serve(api).await
//! }
//!
//! async fn users(_ctx: Context, w: ResponseWriter, req: Request) -> HandlerResult {
//!     match req.path() {
//!         "/users/42" => json::write_json(&w, StatusCode::OK, &serde_json::json!({"id": 42}))?,
//!         _ => return Err(ApiError::not_found().into()),
//!     }
//!     Ok(())
//! }
//! ```

mod api;
mod api_error;
mod config;
mod context;
mod error;
mod gate;
mod handler;
mod request;
mod responder;
mod response;
mod server;
mod tracker;
mod writer;

pub mod json;

pub use api::{Api, ApiBuilder, TIMEOUT_MESSAGE};
pub use api_error::{ApiError, BoxError, HandlerError};
pub use config::{Config, ConfigError};
pub use context::{Cancellation, Context};
pub use error::Error;
pub use gate::{ContentTypeGate, DEFAULT_CONTENT_TYPES};
pub use handler::{Handler, HandlerResult};
pub use request::Request;
pub use responder::ErrorMessage;
pub use response::{Recorder, ResponseSink};
pub use server::Server;
pub use tracker::{ResponseState, Tracked};
pub use writer::ResponseWriter;
