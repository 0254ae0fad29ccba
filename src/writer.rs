//! The handle handlers write their response through.

use std::io;
use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use parking_lot::Mutex;
use tracing::debug;

use crate::response::{Recorder, ResponseSink};
use crate::tracker::{ResponseState, Tracked};

/// A cloneable, tracked response sink for one request.
///
/// Clones write to the same response, so a handler may move one into a
/// spawned task. Once the dispatcher has taken the terminal response the
/// writer is *sealed*: body writes fail with [`io::ErrorKind::BrokenPipe`]
/// and status or header writes are dropped.
///
/// `ResponseWriter` implements [`io::Write`], so serializers that write to
/// an `io::Write` can target it directly.
#[derive(Clone, Debug)]
pub struct ResponseWriter {
    slot: Arc<Mutex<Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    sink: Tracked<Recorder>,
    sealed: bool,
}

impl ResponseWriter {
    pub(crate) fn new() -> Self {
        Self { slot: Arc::new(Mutex::new(Slot::default())) }
    }

    /// Replaces any existing values of `name`.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.with_headers(|headers| {
            headers.insert(name, value);
        });
    }

    /// Adds a value to `name`, keeping existing ones.
    pub fn append_header(&self, name: HeaderName, value: HeaderValue) {
        self.with_headers(|headers| {
            headers.append(name, value);
        });
    }

    /// Runs `f` against the buffered headers. A no-op once sealed.
    pub fn with_headers(&self, f: impl FnOnce(&mut HeaderMap)) {
        let mut slot = self.slot.lock();
        if slot.sealed {
            debug!("header write after response was sent, ignored");
            return;
        }
        f(slot.sink.headers_mut());
    }

    pub fn write_header(&self, status: StatusCode) {
        let mut slot = self.slot.lock();
        if slot.sealed {
            debug!(%status, "status write after response was sent, ignored");
            return;
        }
        slot.sink.write_header(status);
    }

    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut slot = self.slot.lock();
        if slot.sealed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "response already sent"));
        }
        slot.sink.write(buf)
    }

    pub fn is_written(&self) -> bool {
        self.slot.lock().sink.is_written()
    }

    /// The last status written, `200 OK` by default.
    pub fn status(&self) -> StatusCode {
        self.slot.lock().sink.status()
    }

    pub fn state(&self) -> ResponseState {
        self.slot.lock().sink.state()
    }

    pub fn is_sealed(&self) -> bool {
        self.slot.lock().sealed
    }

    /// Takes the buffered response and seals the writer in one step. Only the
    /// first call gets the response; later calls get `None`.
    pub(crate) fn finish(&self) -> Option<Recorder> {
        let mut slot = self.slot.lock();
        if slot.sealed {
            return None;
        }
        slot.sealed = true;
        let sink = std::mem::take(&mut slot.sink);
        Some(sink.into_inner())
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ResponseWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for &ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ResponseWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
