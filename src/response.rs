//! The response sink abstraction and its buffering implementation.
//!
//! Handlers never build a response value. They write into a sink, the way a
//! socket-backed writer would be written to: headers, then a status line, then
//! body bytes. [`Recorder`] is the sink the dispatcher uses. It buffers
//! everything and is turned into an [`http::Response`] once the request is
//! over, which is what lets the error path replace a half-written success.

use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

/// Something a response can be written into.
///
/// The status line is committed by the first [`write_header`] or [`write`];
/// later status writes are ignored by sinks that model a real transport.
///
/// [`write_header`]: ResponseSink::write_header
/// [`write`]: ResponseSink::write
pub trait ResponseSink: Send {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn write_header(&mut self, status: StatusCode);

    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Discards any buffered status, headers and body.
    fn reset(&mut self);
}

// ── Recorder ──────────────────────────────────────────────────────────────────

/// A buffering [`ResponseSink`].
///
/// A body write without a preceding status write commits `200 OK`, as it
/// would on the wire.
#[derive(Debug, Default)]
pub struct Recorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, or `200 OK` if nothing was committed.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts the buffered state into the response handed to hyper.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let status = self.status();
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for Recorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
