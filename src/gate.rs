//! Content-type policy for requests that carry a body.
//!
//! `POST`, `PUT` and `PATCH` must declare a `Content-Type` the API
//! understands. Everything else passes untouched: a `GET` with a stray
//! content type is not our problem.
//!
//! The header may list several media types separated by commas. Each is
//! parsed on its own; parameters such as `charset` are ignored and an entry
//! that does not parse is skipped. The request passes if any entry *starts
//! with* one of the accepted types.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use crate::api_error::ApiError;

/// Media types accepted when nothing else is configured.
pub const DEFAULT_CONTENT_TYPES: [&str; 2] = ["application/json", "application/x-www-form-urlencoded"];

/// Pre-dispatch check on the request content type.
#[derive(Clone, Debug)]
pub struct ContentTypeGate {
    accepted: Vec<String>,
    rejection: String,
}

impl ContentTypeGate {
    pub fn new<I, S>(accepted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accepted: Vec<String> = accepted
            .into_iter()
            .map(|t| t.into().trim().to_ascii_lowercase())
            .collect();
        let quoted: Vec<String> = accepted.iter().map(|t| format!("{t:?}")).collect();
        let rejection = format!(
            "POST, PUT, and PATCH methods require request content type of {}",
            quoted.join(" or ")
        );
        Self { accepted, rejection }
    }

    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }

    /// The single message sent with a `415` rejection.
    pub fn rejection_message(&self) -> &str {
        &self.rejection
    }

    /// Whether the gate has an opinion about `method` at all.
    pub fn applies_to(method: &Method) -> bool {
        *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
    }

    /// Whether a `Content-Type` header value names an accepted type.
    pub fn allows(&self, content_type: Option<&str>) -> bool {
        let Some(header) = content_type else { return false };
        header.split(',').any(|entry| self.allows_entry(entry))
    }

    /// Like [`allows`](Self::allows), for a raw header value. Entries that
    /// are not UTF-8 are skipped; the rest are still considered.
    pub fn allows_value(&self, value: &HeaderValue) -> bool {
        value
            .as_bytes()
            .split(|&b| b == b',')
            .filter_map(|entry| std::str::from_utf8(entry).ok())
            .any(|entry| self.allows_entry(entry))
    }

    fn allows_entry(&self, entry: &str) -> bool {
        parse_media_type(entry)
            .is_some_and(|media| self.accepted.iter().any(|prefix| media.starts_with(prefix.as_str())))
    }

    /// `Ok` to proceed, or the `415` error to send instead.
    pub fn check(&self, method: &Method, headers: &HeaderMap) -> Result<(), ApiError> {
        if !Self::applies_to(method) {
            return Ok(());
        }
        if headers.get(CONTENT_TYPE).is_some_and(|v| self.allows_value(v)) {
            Ok(())
        } else {
            Err(ApiError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, [self.rejection.clone()]))
        }
    }
}

impl Default for ContentTypeGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_TYPES)
    }
}

// ── Media type parsing ────────────────────────────────────────────────────────

/// Parses one `type/subtype; key=value` entry, returning the lowercased media
/// type without parameters. `None` if any part is malformed.
pub(crate) fn parse_media_type(entry: &str) -> Option<String> {
    let mut parts = entry.split(';');
    let media = parts.next()?.trim().to_ascii_lowercase();
    if !is_media_type(&media) {
        return None;
    }
    for param in parts {
        let param = param.trim();
        // Trailing semicolons are tolerated.
        if param.is_empty() {
            continue;
        }
        let (key, value) = param.split_once('=')?;
        if !is_token(key.trim()) || !is_param_value(value.trim()) {
            return None;
        }
    }
    Some(media)
}

/// `type` or `type/subtype`, both tokens.
fn is_media_type(s: &str) -> bool {
    match s.split_once('/') {
        Some((kind, sub)) => is_token(kind) && is_token(sub),
        None => is_token(s),
    }
}

fn is_param_value(s: &str) -> bool {
    is_token(s) || (s.len() >= 2 && s.starts_with('"') && s.ends_with('"'))
}

/// RFC 9110 `token`: one or more visible ASCII characters, no delimiters.
fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_byte)
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !br#"()<>@,;:\"/[]?={}"#.contains(&b)
}
