//! Handler type and type erasure.
//!
//! # How async handlers are stored
//!
//! The route table holds handlers of *different* closure types, and
//! middleware has to wrap any of them in another handler. Both need one
//! concrete type, so every handler is erased behind an `Arc<dyn Fn>`:
//!
//! ```text
//! |c| Box::pin(async move { … })          ← user writes this
//!        ↓ app.get("/", …)
//! Handler::new(closure)                   ← Arc<dyn Fn(&mut Context) -> BoxFuture>
//!        ↓ stored in the route table, cloned per request
//! handler.call(&mut ctx)  at request time ← one vtable dispatch
//! ```
//!
//! The handler borrows the [`Context`] mutably for the lifetime of its
//! future, which is why the closure returns a boxed future tied to that
//! borrow instead of an `impl Future`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;

/// A heap-allocated, type-erased future borrowing from the request.
///
/// `Send` lets tokio move the connection task across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What every handler and middleware step resolves to.
pub type HandlerResult = Result<(), Error>;

type HandlerFn = dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync;

/// A request handler: an async function from `&mut Context` to
/// [`HandlerResult`].
///
/// Cloning is one atomic increment. Handlers are shared by every concurrent
/// request that matches their route.
///
/// ```rust
/// use mows::{Handler, StatusCode};
///
/// let hello = Handler::new(|c| Box::pin(async move {
///     c.text(StatusCode::OK, "hello")
/// }));
/// ```
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the handler against `ctx`.
    pub fn call<'a>(&self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}
