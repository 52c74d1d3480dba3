//! Middleware layer.
//!
//! A [`Middleware`] turns one [`Handler`] into another. The wrapper may do
//! work before and after awaiting `next`, or return without calling it at
//! all (short-circuit). Errors from `next` travel back out through every
//! wrapper that already ran, so outer middleware always sees them.
//!
//! Per request the engine composes, outermost first:
//!
//! ```text
//! global  →  group  →  route  →  handler
//! ```
//!
//! Within each level declaration order is execution order on the way in and
//! reverse order on the way out.
//!
//! Built-in middleware:
//! - [`logger`]: one `tracing` event per request with status and latency
//! - [`recover`]: turns a handler panic into [`Error::Panic`](crate::Error::Panic)

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::handler::{BoxFuture, Handler, HandlerResult};

mod logger;
mod recover;

pub use logger::logger;
pub use recover::recover;

type Wrap = dyn Fn(Handler) -> Handler + Send + Sync;

/// A transform from one handler to another.
#[derive(Clone)]
pub struct Middleware(Arc<Wrap>);

impl Middleware {
    /// Builds a middleware from a handler-to-handler function.
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        Self(Arc::new(wrap))
    }

    /// Builds a middleware from a closure receiving the context and the
    /// next handler in the chain.
    ///
    /// ```rust
    /// use mows::{middleware::Middleware, Error};
    ///
    /// let require_token = Middleware::from_fn(|c, next| Box::pin(async move {
    ///     if c.header("x-token").is_none() {
    ///         return Err(Error::msg("missing token"));
    ///     }
    ///     next.call(c).await
    /// }));
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context, Handler) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        let f = Arc::new(f);
        Self::new(move |next| {
            let f = Arc::clone(&f);
            Handler::new(move |c| f(c, next.clone()))
        })
    }

    /// Adapts a non-final route handler: run `handler`, then `next`,
    /// stopping at the first error.
    pub fn before(handler: Handler) -> Self {
        Self::from_fn(move |c, next| {
            let handler = handler.clone();
            Box::pin(async move {
                handler.call(c).await?;
                next.call(c).await
            })
        })
    }

    /// Wraps `next`.
    pub fn apply(&self, next: Handler) -> Handler {
        (self.0)(next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

/// Folds `middlewares` right-to-left over `handler`, so `middlewares[0]`
/// becomes the outermost wrapper.
pub(crate) fn compose(middlewares: &[Middleware], handler: Handler) -> Handler {
    middlewares
        .iter()
        .rev()
        .fold(handler, |next, mw| mw.apply(next))
}
