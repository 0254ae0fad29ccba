//! Handler trait and type erasure.
//!
//! # The handler contract
//!
//! A handler gets the request [`Context`], a [`ResponseWriter`] and the
//! [`Request`]. It either writes a response and returns `Ok(())`, or returns
//! an error and lets the dispatcher write the error response:
//!
//! ```text
//! async fn get_user(ctx: Context, w: ResponseWriter, req: Request) -> HandlerResult
//! ```
//!
//! Returning `Ok(())` without writing anything is a bug in the handler; the
//! client gets `501 Not Implemented`.
//!
//! # How handlers are stored
//!
//! The dispatcher holds one handler for its whole life and calls it
//! concurrently from many connection tasks, so it is stored as a trait object
//! behind an `Arc`:
//!
//! ```text
//! async fn handle(ctx, w, req) -> HandlerResult { … }  ← user writes this
//!        ↓ Api::new(handle)
//! handle.into_boxed_handler()                        ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(handle))                        ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(ctx, w, req)  at request time         ← one vtable dispatch
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::api_error::HandlerError;
use crate::context::Context;
use crate::request::Request;
use crate::writer::ResponseWriter;

/// What a handler returns. `Ok(())` means "I wrote the response".
pub type HandlerResult = Result<(), HandlerError>;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased handler future.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of the public
/// `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: Context, w: ResponseWriter, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature:
///
/// ```text
/// Fn(Context, ResponseWriter, Request) -> impl Future<Output = HandlerResult>
/// ```
///
/// The trait is sealed; only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut> private::Sealed for F
where
    F: Fn(Context, ResponseWriter, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Context, ResponseWriter, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut> ErasedHandler for FnHandler<F>
where
    F: Fn(Context, ResponseWriter, Request) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context, w: ResponseWriter, req: Request) -> BoxFuture {
        Box::pin((self.0)(ctx, w, req))
    }
}
