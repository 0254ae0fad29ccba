//! Response-write tracking.
//!
//! [`Tracked`] decorates any [`ResponseSink`] and remembers whether anything
//! reached it. The dispatcher relies on this, not on the handler's return
//! value, to tell a handler that answered from one that forgot to.

use std::io;

use http::{HeaderMap, StatusCode};

use crate::response::ResponseSink;

/// What a [`Tracked`] sink has observed so far.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResponseState {
    /// Set by the first status or body write. Header edits do not count.
    pub is_written: bool,
    /// The last status passed to `write_header`; `200 OK` if none was.
    pub status: StatusCode,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self { is_written: false, status: StatusCode::OK }
    }
}

/// A pass-through [`ResponseSink`] that records writes.
#[derive(Debug, Default)]
pub struct Tracked<S> {
    inner: S,
    state: ResponseState,
}

impl<S: ResponseSink> Tracked<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, state: ResponseState::default() }
    }

    pub fn state(&self) -> ResponseState {
        self.state
    }

    pub fn is_written(&self) -> bool {
        self.state.is_written
    }

    pub fn status(&self) -> StatusCode {
        self.state.status
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ResponseSink> ResponseSink for Tracked<S> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.inner.write_header(status);
        self.state.status = status;
        self.state.is_written = true;
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf);
        self.state.is_written = true;
        n
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}
