//! The dispatcher: one handler in, exactly one response out.
//!
//! For every request [`Api::serve`] walks the same decision table:
//!
//! | Situation | Response |
//! |---|---|
//! | `POST`/`PUT`/`PATCH` without an accepted content type | `415`, handler not called |
//! | deadline passed before the handler returned | `429 "request took too long to complete"` |
//! | `Ok(())`, nothing written | `501 Not Implemented` |
//! | `Ok(())`, something written | the handler's response, untouched |
//! | `Err(HandlerError::Api(e))` | `e.status()` with `e`'s messages |
//! | `Err(HandlerError::Opaque(_))` | `500 Internal Server Error` |
//!
//! An error always wins over a partial write: a handler that started a `200`
//! body and then returned an error sends the error, not the fragment.

use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use tracing::{debug, error, info, warn};

use crate::api_error::{find_api_error, HandlerError};
use crate::config::{Config, ConfigError};
use crate::context::{Cancellation, Context};
use crate::gate::ContentTypeGate;
use crate::handler::{BoxedHandler, Handler, HandlerResult};
use crate::request::Request;
use crate::responder::write_error;
use crate::writer::ResponseWriter;

/// Message sent with the `429` timeout response.
pub const TIMEOUT_MESSAGE: &str = "request took too long to complete";

/// Wraps a [`Handler`] with content-type enforcement, outcome classification
/// and optional request timeouts.
///
/// ```rust
/// use http::StatusCode;
/// use restgate::{Api, ApiError, Context, HandlerResult, Request, ResponseWriter};
///
/// async fn handle(_ctx: Context, _w: ResponseWriter, _req: Request) -> HandlerResult {
///     Err(ApiError::not_found().into())
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let api = Api::new(handle);
/// let req = http::Request::get("/things/1").body(bytes::Bytes::new()).unwrap();
/// let res = api.serve(req.into()).await;
/// assert_eq!(res.status(), StatusCode::NOT_FOUND);
/// # }
/// ```
pub struct Api {
    handler: BoxedHandler,
    gate: ContentTypeGate,
    timeout: Option<Duration>,
}

enum Outcome {
    Completed(HandlerResult),
    TimedOut,
}

impl Api {
    /// An API with default settings: JSON and form bodies, no timeout.
    pub fn new(handler: impl Handler) -> Self {
        Self {
            handler: handler.into_boxed_handler(),
            gate: ContentTypeGate::default(),
            timeout: None,
        }
    }

    pub fn builder() -> ApiBuilder {
        ApiBuilder { config: Config::default() }
    }

    /// An API built from a validated [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` does not validate.
    pub fn with_config(handler: impl Handler, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            handler: handler.into_boxed_handler(),
            gate: ContentTypeGate::new(config.accepted_content_types.iter().cloned()),
            timeout: config.timeout(),
        })
    }

    pub fn gate(&self) -> &ContentTypeGate {
        &self.gate
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Handles one request and returns the terminal response.
    pub async fn serve(&self, req: Request) -> http::Response<Full<Bytes>> {
        let w = ResponseWriter::new();
        let path = req.path().to_owned();

        let failure = match self.gate.check(req.method(), req.headers()) {
            Err(rejection) => {
                info!(method = %req.method(), path = %path, "rejected request content type");
                Some(Failure { status: rejection.status(), messages: rejection.public_messages() })
            }
            Ok(()) => self.dispatch(req, &w, &path).await,
        };

        // Sealing first makes this the only terminal response: anything the
        // handler's leftover tasks write from here on is refused, and the
        // error below is written to a recorder no one else can reach.
        let mut recorder = w.finish().unwrap_or_default();
        if let Some(Failure { status, messages }) = failure {
            write_error(&mut recorder, status, &messages);
        }
        recorder.into_response()
    }

    /// Runs the handler and classifies its outcome. `None` means the
    /// handler's own response stands.
    async fn dispatch(&self, req: Request, w: &ResponseWriter, path: &str) -> Option<Failure> {
        let ctx = match self.timeout {
            Some(timeout) => Context::background().with_timeout(timeout),
            None => Context::background(),
        };

        let handler = self.handler.call(ctx.clone(), w.clone(), req);
        let outcome = tokio::select! {
            biased;
            result = handler => Outcome::Completed(result),
            // A plain cancellation disables this branch and keeps waiting.
            Cancellation::DeadlineExceeded = ctx.done() => Outcome::TimedOut,
        };
        ctx.cancel();

        match outcome {
            Outcome::TimedOut => {
                let timeout_ms = self.timeout.map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
                warn!(timeout_ms, path, "request timed out");
                Some(Failure {
                    status: StatusCode::TOO_MANY_REQUESTS,
                    messages: vec![TIMEOUT_MESSAGE.to_owned()],
                })
            }
            Outcome::Completed(Ok(())) if !w.is_written() => {
                warn!(path, "handler returned without writing a response");
                Some(Failure { status: StatusCode::NOT_IMPLEMENTED, messages: Vec::new() })
            }
            Outcome::Completed(Ok(())) => {
                log_outcome(w.status(), path, None);
                None
            }
            Outcome::Completed(Err(HandlerError::Api(e))) => {
                log_outcome(e.status(), path, e.cause().map(|c| c as &dyn std::error::Error));
                Some(Failure { status: e.status(), messages: e.public_messages() })
            }
            Outcome::Completed(Err(HandlerError::Opaque(e))) => {
                let cause: &dyn std::error::Error = &*e;
                // An ApiError wrapped inside another error still decides the
                // response; the outer error is what gets logged.
                match find_api_error(&*e) {
                    Some(api) => {
                        log_outcome(api.status(), path, Some(cause));
                        Some(Failure { status: api.status(), messages: api.public_messages() })
                    }
                    None => {
                        log_outcome(StatusCode::INTERNAL_SERVER_ERROR, path, Some(cause));
                        Some(Failure { status: StatusCode::INTERNAL_SERVER_ERROR, messages: Vec::new() })
                    }
                }
            }
        }
    }
}

/// An error response decided by the dispatcher.
struct Failure {
    status: StatusCode,
    messages: Vec<String>,
}

fn log_outcome(status: StatusCode, path: &str, cause: Option<&dyn std::error::Error>) {
    let code = status.as_u16();
    match (code, cause) {
        (400..=499, _) => info!(status = code, path, "client error"),
        (500 | 502.., Some(cause)) => error!(status = code, path, error = %cause, "server error"),
        (500 | 502.., None) => error!(status = code, path, "server error"),
        _ => debug!(status = code, path, "request handled"),
    }
}

// ── ApiBuilder ────────────────────────────────────────────────────────────────

/// Fluent builder for [`Api`]. Obtain via [`Api::builder()`].
///
/// ```rust
/// use std::time::Duration;
/// use restgate::{Api, Context, HandlerResult, Request, ResponseWriter};
///
/// async fn handle(_: Context, _: ResponseWriter, _: Request) -> HandlerResult { Ok(()) }
///
/// let api = Api::builder()
///     .timeout(Duration::from_secs(5))
///     .accept(["application/json"])
///     .build(handle)
///     .unwrap();
/// assert_eq!(api.timeout(), Some(Duration::from_secs(5)));
/// ```
pub struct ApiBuilder {
    config: Config,
}

impl ApiBuilder {
    /// Replaces every setting with `config`.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Per-request deadline. `Duration::ZERO` disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.set_timeout(timeout);
        self
    }

    /// Replaces the accepted content types.
    pub fn accept<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.accepted_content_types = content_types.into_iter().map(Into::into).collect();
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if the accumulated settings do not validate.
    pub fn build(self, handler: impl Handler) -> Result<Api, ConfigError> {
        Api::with_config(handler, self.config)
    }
}
