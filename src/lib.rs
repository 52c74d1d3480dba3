//! # mows
//!
//! A minimal HTTP web framework for small services: routing, middleware,
//! route groups, JSON binding and validation, templates and static files,
//! on top of hyper and tokio.
//!
//! ## The request pipeline
//!
//! Every request goes through the same steps:
//!
//! 1. The [`Engine`] looks the method + path up in its route table. Static
//!    paths are checked first; parameterized paths (`/users/:id`) are
//!    scanned in registration order and the first match wins.
//! 2. A miss answers `404` right away. No middleware runs.
//! 3. A hit builds the chain **global → group → route → handler** and runs
//!    it against a fresh [`Context`].
//! 4. An error escaping the chain goes to the error handler, by default
//!    `400 {"error": "<message>"}`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mows::{Engine, Error, StatusCode, middleware};
//! use serde::Deserialize;
//! use validator::Validate;
//!
//! #[derive(Deserialize, Validate)]
//! struct NewUser {
//!     #[validate(length(min = 3))]
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let mut app = Engine::new();
//!     app.use_middleware(middleware::logger())
//!         .use_middleware(middleware::recover());
//!
//!     let mut api = app.group("/api", []);
//!     api.get("/users/:id", |c| Box::pin(async move {
//!         let id = c.param("id").to_owned();
//!         c.json(StatusCode::OK, &serde_json::json!({ "id": id }))
//!     }));
//!     api.post("/users", |c| Box::pin(async move {
//!         let user: NewUser = c.bind_json_and_validate()?;
//!         c.json(StatusCode::CREATED, &serde_json::json!({ "name": user.name }))
//!     }));
//!
//!     app.run(":8080").await
//! }
//! ```

mod context;
mod engine;
mod error;
mod group;
mod handler;
mod method;
mod router;
mod server;
mod static_files;
mod templates;
mod writer;

pub mod middleware;

pub use context::Context;
pub use engine::{Engine, ErrorHandler};
pub use error::Error;
pub use group::RouterGroup;
pub use handler::{BoxFuture, Handler, HandlerResult};
pub use http::StatusCode;
pub use method::{Method, UnknownMethod};
pub use router::Params;
pub use templates::{TemplateEngine, TemplateFn};
pub use writer::{ContentType, ResponseWriter};
