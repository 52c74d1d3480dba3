//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::error;

use super::Middleware;
use crate::error::Error;

/// Catches a panic anywhere downstream and returns [`Error::Panic`] instead,
/// so the engine's error handler answers (500 with the default handler) and
/// the connection keeps serving.
///
/// Opt-in: without it a panic unwinds the connection task.
pub fn recover() -> Middleware {
    Middleware::from_fn(|c, next| {
        Box::pin(async move {
            match AssertUnwindSafe(next.call(c)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    error!(
                        panic = panic_message(payload.as_ref()),
                        method = %c.method(),
                        path = c.path(),
                        "handler panicked",
                    );
                    Err(Error::Panic)
                }
            }
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handler::{Handler, HandlerResult};

    async fn explode(_: &mut Context) -> HandlerResult {
        panic!("boom")
    }

    #[tokio::test]
    async fn panic_becomes_error() {
        let boom = Handler::new(|c| Box::pin(explode(c)));
        let err = recover().apply(boom).call(&mut Context::for_test("/")).await.unwrap_err();
        assert!(matches!(err, Error::Panic));
    }

    #[tokio::test]
    async fn ordinary_errors_pass_through() {
        let failing = Handler::new(|_| Box::pin(async { Err(Error::msg("nope")) }));
        let err = recover().apply(failing).call(&mut Context::for_test("/")).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn extracts_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let number: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(number.as_ref()), "non-string panic payload");
    }
}
