//! Structured API errors and the handler error type.
//!
//! A handler reports failure by returning a [`HandlerError`]. There are two
//! kinds, and the dispatcher treats them very differently:
//!
//! | Variant | Client sees | Logged |
//! |---|---|---|
//! | [`HandlerError::Api`] | the error's status and messages | the cause, for 5xx |
//! | [`HandlerError::Opaque`] | `500 Internal Server Error` | the full error |
//!
//! An opaque error that wraps an [`ApiError`] somewhere in its `source()`
//! chain is answered like that `ApiError`.
//!
//! An opaque error's text never reaches the client. If you want the client to
//! read something, return an [`ApiError`].

use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// Boxed, thread-safe error used for causes and opaque failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ── ApiError ──────────────────────────────────────────────────────────────────

/// An error carrying an HTTP status and client-facing messages.
///
/// The optional `cause` is for diagnostics only. It is logged for server-side
/// failures and never serialized into the response body.
///
/// ```rust
/// use http::StatusCode;
/// use restgate::ApiError;
///
/// let err = ApiError::new(StatusCode::CONFLICT, ["username already taken"]);
/// assert_eq!(err.status(), StatusCode::CONFLICT);
/// assert_eq!(err.public_messages(), vec!["username already taken"]);
///
/// // No messages: the reason phrase stands in.
/// let err = ApiError::new(StatusCode::NOT_FOUND, Vec::<String>::new());
/// assert_eq!(err.public_messages(), vec!["Not Found"]);
/// ```
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    messages: Vec<String>,
    cause: Option<BoxError>,
}

impl ApiError {
    pub fn new<I, S>(status: StatusCode, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status,
            messages: messages.into_iter().map(Into::into).collect(),
            cause: None,
        }
    }

    /// Builds an error that wraps an internal `cause`.
    pub fn with_cause<I, S>(status: StatusCode, cause: impl Into<BoxError>, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(status, messages).caused_by(cause)
    }

    /// Attaches (or replaces) the internal cause.
    pub fn caused_by(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// `400 Bad Request`.
    pub fn bad_request<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(StatusCode::BAD_REQUEST, messages)
    }

    /// `422 Unprocessable Entity`, for data that parsed but failed validation.
    pub fn validation<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, messages)
    }

    /// `401 Unauthorized`: "authorization required".
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ["authorization required"])
    }

    /// `404 Not Found`: "item not found".
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, ["item not found"])
    }

    /// `400 Bad Request`: "expecting well formed request body".
    pub fn invalid_request_body() -> Self {
        Self::new(StatusCode::BAD_REQUEST, [MALFORMED_BODY])
    }

    /// `500 Internal Server Error`: "internal server error".
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ["internal server error"])
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The messages exactly as given, possibly empty.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// The messages sent to the client: [`messages`](Self::messages), or the
    /// status reason phrase when there are none.
    pub fn public_messages(&self) -> Vec<String> {
        if self.messages.is_empty() {
            vec![reason_phrase(self.status).to_owned()]
        } else {
            self.messages.clone()
        }
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cause) = &self.cause {
            return fmt::Display::fmt(cause, f);
        }
        match self.messages.first() {
            Some(message) => f.write_str(message),
            None => f.write_str("unknown API error"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

pub(crate) const MALFORMED_BODY: &str = "expecting well formed request body";

/// Standard reason phrase for `status`, or `""` for unregistered codes.
pub(crate) fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}

// ── HandlerError ──────────────────────────────────────────────────────────────

/// The error half of a handler's result.
///
/// Most conversions land in [`HandlerError::Opaque`], so `?` on an I/O or
/// serde error produces a 500 without leaking details. [`ApiError`]s convert
/// into [`HandlerError::Api`], including an `ApiError` that was boxed along
/// the way.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Opaque(BoxError),
}

impl HandlerError {
    /// Wraps any error. A boxed [`ApiError`] is recovered as
    /// [`HandlerError::Api`].
    pub fn opaque(err: impl Into<BoxError>) -> Self {
        let boxed: BoxError = err.into();
        Self::from(boxed)
    }

    /// The status code this error resolves to on the wire.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Api(e) => e.status(),
            Self::Opaque(e) => find_api_error(&**e).map_or(StatusCode::INTERNAL_SERVER_ERROR, ApiError::status),
        }
    }
}

/// Finds the first [`ApiError`] in `err`'s chain, starting with `err` itself.
///
/// `io::Error` keeps a custom payload out of its `source()`, so the payload of
/// an `io::Error` is inspected directly.
pub(crate) fn find_api_error<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a ApiError> {
    let mut next = Some(err);
    while let Some(current) = next {
        if let Some(api) = current.downcast_ref::<ApiError>() {
            return Some(api);
        }
        next = match current.downcast_ref::<std::io::Error>().and_then(std::io::Error::get_ref) {
            Some(payload) => Some(payload as &(dyn std::error::Error + 'static)),
            None => current.source(),
        };
    }
    None
}

impl From<BoxError> for HandlerError {
    fn from(err: BoxError) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => Self::Api(*api),
            Err(other) => Self::Opaque(other),
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::Opaque(err.into())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Opaque(err.into())
    }
}

impl From<http::Error> for HandlerError {
    fn from(err: http::Error) -> Self {
        Self::Opaque(err.into())
    }
}
