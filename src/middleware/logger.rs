//! Request logging.

use std::time::Instant;

use tracing::{info, warn};

use super::Middleware;

/// Logs one `tracing` event per request: status, latency, method, path and
/// client address.
///
/// Errors returning from the chain are logged at `WARN` and passed on
/// untouched; the error handler still decides the response.
pub fn logger() -> Middleware {
    Middleware::from_fn(|c, next| {
        Box::pin(async move {
            let start = Instant::now();
            let result = next.call(c).await;
            let latency = start.elapsed();

            let ip = c
                .remote_addr()
                .map_or_else(|| "-".to_owned(), |addr| addr.ip().to_string());

            match &result {
                Ok(()) => info!(
                    status = c.writer().status().as_u16(),
                    ?latency,
                    method = %c.method(),
                    path = c.path(),
                    %ip,
                    "request",
                ),
                Err(err) => warn!(
                    error = %err,
                    ?latency,
                    method = %c.method(),
                    path = c.path(),
                    %ip,
                    "request failed",
                ),
            }

            result
        })
    })
}
