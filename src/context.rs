//! Request-scoped cancellation and deadlines.
//!
//! Every handler invocation receives a [`Context`]. It becomes *done* when the
//! dispatcher cancels it (the request finished) or when its deadline passes.
//! Handlers doing long work should race that work against
//! [`Context::done`]; the dispatcher stops waiting for them at the deadline
//! regardless.
//!
//! ```rust
//! use std::time::Duration;
//! use restgate::{Cancellation, Context};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ctx = Context::background().with_timeout(Duration::from_millis(5));
//! assert_eq!(ctx.done().await, Cancellation::DeadlineExceeded);
//! # }
//! ```
//!
//! Contexts form a tree. Cancelling a parent cancels every child; a child's
//! deadline is never later than its parent's.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`Context`] is done.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Cancellation {
    /// [`Context::cancel`] was called, here or on an ancestor.
    Canceled,
    /// The deadline passed before anyone cancelled.
    DeadlineExceeded,
}

/// Cancellation signal and optional deadline for one request.
///
/// Cheap to clone; clones share the same signal.
#[derive(Clone, Debug)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
    // First writer wins: a deadline that fires after cancel() stays Canceled.
    reason: OnceLock<Cancellation>,
    parent: Option<Context>,
}

impl Context {
    /// A root context: no deadline, never done until cancelled.
    pub fn background() -> Self {
        Self::from_parts(CancellationToken::new(), None, None)
    }

    /// A child context that is done after `timeout`, or earlier if `self` is.
    ///
    /// A timeout too large to represent as an instant adds no deadline of its
    /// own; the child keeps its parent's.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => Self::from_parts(
                self.inner.token.child_token(),
                self.inner.deadline,
                Some(self.clone()),
            ),
        }
    }

    /// A child context that is done at `deadline`, or earlier if `self` is.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self::from_parts(self.inner.token.child_token(), Some(deadline), Some(self.clone()))
    }

    fn from_parts(token: CancellationToken, deadline: Option<Instant>, parent: Option<Self>) -> Self {
        Self {
            inner: Arc::new(Inner { token, deadline, reason: OnceLock::new(), parent }),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline, saturating at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Cancels this context and all of its children. Idempotent.
    pub fn cancel(&self) {
        self.finish(Cancellation::Canceled);
    }

    /// Resolves once the context is done and reports why.
    pub async fn done(&self) -> Cancellation {
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.inner.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {
                        self.finish(Cancellation::DeadlineExceeded);
                    }
                }
            }
            None => self.inner.token.cancelled().await,
        }
        self.err().unwrap_or(Cancellation::Canceled)
    }

    /// `None` while the context is live; afterwards, why it is done.
    pub fn err(&self) -> Option<Cancellation> {
        if let Some(reason) = self.inner.reason.get() {
            return Some(*reason);
        }
        if self.inner.deadline.is_some_and(|d| Instant::now() >= d) {
            self.finish(Cancellation::DeadlineExceeded);
            return self.inner.reason.get().copied();
        }
        if self.inner.token.is_cancelled() {
            let inherited = self.inner.parent.as_ref().and_then(Self::err);
            return Some(inherited.unwrap_or(Cancellation::Canceled));
        }
        None
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// A token that fires together with this context, for APIs that accept
    /// `tokio_util` tokens directly.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    fn finish(&self, reason: Cancellation) {
        let _ = self.inner.reason.set(reason);
        self.inner.token.cancel();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
