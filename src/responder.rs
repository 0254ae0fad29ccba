//! The JSON error response format.

use std::io;

use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::api_error::reason_phrase;
use crate::json::{to_json_line, JSON_CONTENT_TYPE};
use crate::response::ResponseSink;

/// Body of every error response: `{"errors": [...]}`.
///
/// `errors` is always an array, never `null`, even when empty.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ErrorMessage {
    pub fn new<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { errors: errors.into_iter().map(Into::into).collect() }
    }
}

/// Replaces whatever `sink` holds with a JSON error response.
///
/// The dispatcher calls this on the sealed, owned [`Recorder`] it took from
/// the [`ResponseWriter`], so nothing the handler left running can interleave.
/// An empty `messages` slice sends the reason phrase of `status`. A failure to
/// encode is logged and leaves the status with an empty body.
///
/// [`Recorder`]: crate::response::Recorder
/// [`ResponseWriter`]: crate::writer::ResponseWriter
pub(crate) fn write_error(sink: &mut impl ResponseSink, status: StatusCode, messages: &[String]) {
    let body = if messages.is_empty() {
        ErrorMessage::new([reason_phrase(status)])
    } else {
        ErrorMessage::new(messages.iter().cloned())
    };

    sink.reset();
    sink.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    sink.write_header(status);
    let written = to_json_line(&body)
        .map_err(io::Error::from)
        .and_then(|buf| sink.write(&buf));
    if let Err(e) = written {
        error!(%status, error = %e, "failed to write JSON error response");
    }
}
