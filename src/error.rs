//! Unified error type.

use http::StatusCode;

/// The error type flowing through handlers, middleware and the server.
///
/// Handlers return `Err(Error)` to stop the chain. The dispatcher hands the
/// error to the engine's error handler, which is the only place an error
/// becomes a response. Infrastructure failures (binding a port, loading TLS
/// material) are returned from [`Engine::run`](crate::Engine::run) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("content-type must be application/json")]
    ContentType,

    #[error("empty json body")]
    EmptyBody,

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("invalid value for query parameter `{key}`: {reason}")]
    Query { key: String, reason: String },

    #[error("templates not loaded")]
    TemplatesNotLoaded,

    #[error("template: {0}")]
    Template(#[from] tera::Error),

    #[error("tls: {0}")]
    Tls(String),

    /// A panic caught by [`middleware::recover`](crate::middleware::recover).
    /// The payload is logged, never echoed to the client.
    #[error("internal server error")]
    Panic,

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// An application error carrying only a message.
    ///
    /// ```rust
    /// let err = mows::Error::msg("user not found");
    /// assert_eq!(err.to_string(), "user not found");
    /// ```
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wraps any foreign error.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }

    /// Status code the default error handler answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Panic => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_displays_verbatim() {
        assert_eq!(Error::from("user not found").to_string(), "user not found");
    }

    #[test]
    fn only_panics_map_to_server_error() {
        assert_eq!(Error::Panic.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Error::EmptyBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::msg("nope").status(), StatusCode::BAD_REQUEST);
    }
}
