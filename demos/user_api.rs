//! JSON user API with groups, middleware and validation.
//!
//! Run with:
//!   cargo run --example user_api
//!
//! Try:
//!   curl http://localhost:8080/api/users/42
//!   curl 'http://localhost:8080/api/users?page=2&active=true'
//!   curl -X POST http://localhost:8080/api/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice","email":"alice@example.com"}'
//!   curl -H 'x-admin-token: letmein' http://localhost:8080/api/admin/stats

use std::time::Duration;

use mows::middleware::{self, Middleware};
use mows::{Context, Engine, Error, HandlerResult, StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Deserialize, Validate)]
struct CreateUser {
    #[validate(length(min = 2, max = 32))]
    name: String,
    #[validate(email)]
    email: String,
}

#[derive(Serialize)]
struct User {
    id: i64,
    name: String,
    email: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut app = Engine::new();
    app.use_middleware(middleware::logger())
        .use_middleware(middleware::recover())
        .shutdown_timeout(Duration::from_secs(10));

    let mut api = app.group("/api", []);
    api.get("/users", |c| Box::pin(list_users(c)));
    api.get("/users/:id", |c| Box::pin(get_user(c)));
    api.post("/users", |c| Box::pin(create_user(c)));

    let mut admin = api.group("/admin", [require_admin()]);
    admin.get("/stats", |c| Box::pin(async move {
        c.json(StatusCode::OK, &serde_json::json!({ "users": 1 }))
    }));

    app.run(":8080").await
}

// GET /api/users?page=2&active=true
async fn list_users(c: &mut Context) -> HandlerResult {
    let page = c.default_query_int("page", 1);
    let active = c.default_query_bool("active", false);
    c.json(StatusCode::OK, &serde_json::json!({ "page": page, "active": active, "users": [] }))
}

// GET /api/users/:id
async fn get_user(c: &mut Context) -> HandlerResult {
    let id: i64 = c
        .param("id")
        .parse()
        .map_err(|_| Error::msg("user not found"))?;
    let user = User { id, name: "alice".into(), email: "alice@example.com".into() };
    c.json(StatusCode::OK, &user)
}

// POST /api/users
async fn create_user(c: &mut Context) -> HandlerResult {
    let input: CreateUser = c.bind_json_and_validate()?;
    let user = User { id: 99, name: input.name, email: input.email };
    c.writer_mut()
        .headers_mut()
        .insert(http::header::LOCATION, http::HeaderValue::from_static("/api/users/99"));
    c.json(StatusCode::CREATED, &user)
}

fn require_admin() -> Middleware {
    Middleware::from_fn(|c, next| Box::pin(async move {
        if c.header("x-admin-token") != Some("letmein") {
            return c.text(StatusCode::FORBIDDEN, "forbidden");
        }
        next.call(c).await
    }))
}
