//! JSON and form codecs that fail with [`ApiError`]s.
//!
//! Encoding failures become `500` errors (the server produced something it
//! cannot serialize); decoding failures become `400 "expecting well formed
//! request body"` (the client sent something unreadable). Either way the
//! underlying serde error rides along as the cause, so it shows up in logs
//! and not in the response.

use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api_error::ApiError;
use crate::writer::ResponseWriter;

/// `application/json; charset=utf-8`
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Serializes `value` into the response body, followed by a newline.
///
/// Does not touch the status or headers; see [`write_json`] for that.
pub fn encode_json<T: Serialize + ?Sized>(w: &ResponseWriter, value: &T) -> Result<(), ApiError> {
    let buf = to_json_line(value).map_err(internal)?;
    w.write(&buf).map(|_| ()).map_err(internal)
}

/// Sets the JSON content type and `status`, then encodes `value`.
///
/// ```rust,no_run
/// use http::StatusCode;
/// use restgate::{Context, HandlerResult, Request, ResponseWriter};
///
/// async fn create(_ctx: Context, w: ResponseWriter, req: Request) -> HandlerResult {
///     let input: serde_json::Value = req.json()?;
///     restgate::json::write_json(&w, StatusCode::CREATED, &input)?;
///     Ok(())
/// }
/// ```
pub fn write_json<T: Serialize + ?Sized>(
    w: &ResponseWriter,
    status: StatusCode,
    value: &T,
) -> Result<(), ApiError> {
    // Serialize first: a failure must not leave a committed success status.
    let buf = to_json_line(value).map_err(internal)?;
    w.set_header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    w.write_header(status);
    w.write(&buf).map(|_| ()).map_err(internal)
}

/// Deserializes a JSON request body.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::invalid_request_body().caused_by(e))
}

/// Deserializes an `application/x-www-form-urlencoded` request body.
///
/// Every field arrives as a string; a key repeated in the body keeps its last
/// value. Target types should use `String` (or `Option<String>`) fields.
pub fn decode_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let fields: serde_json::Map<String, serde_json::Value> = url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
        .collect();
    serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|e| ApiError::invalid_request_body().caused_by(e))
}

/// `value` as compact JSON plus a trailing newline.
pub(crate) fn to_json_line<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = serde_json::to_vec(value)?;
    buf.push(b'\n');
    Ok(buf)
}

fn internal(cause: impl Into<crate::api_error::BoxError>) -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, Vec::<String>::new()).caused_by(cause)
}
