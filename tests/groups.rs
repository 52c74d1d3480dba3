use std::sync::{Arc, Mutex};

use mows::middleware::Middleware;
use mows::{Engine, StatusCode};

mod common;
use common::get;

fn tag(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Middleware {
    let log = Arc::clone(log);
    Middleware::from_fn(move |c, next| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push(name);
            next.call(c).await
        })
    })
}

#[tokio::test]
async fn it_prefixes_group_routes() {
    let mut app = Engine::new();
    let mut api = app.group("/api", []);
    api.get("/ping", |c| Box::pin(async move { c.text(StatusCode::OK, "pong") }));

    assert_eq!(get(&app, "/api/ping").await.text(), "pong");
    assert_eq!(get(&app, "/ping").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn it_nests_prefixes_and_middleware() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut app = Engine::new();
    let mut api = app.group("/api", [tag(&log, "api")]);
    let mut admin = api.group("/admin", [tag(&log, "admin")]);
    assert_eq!(admin.prefix(), "/api/admin");
    assert_eq!(admin.middlewares().len(), 2);
    admin.get("/users", |c| Box::pin(async move { c.text(StatusCode::OK, "users") }));

    let res = get(&app, "/api/admin/users").await;

    assert_eq!(res.text(), "users");
    assert_eq!(*log.lock().unwrap(), ["api", "admin"]);
}

#[tokio::test]
async fn it_does_not_leak_child_middleware_into_the_parent() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut app = Engine::new();
    let mut api = app.group("/api", [tag(&log, "api")]);
    api.group("/admin", [tag(&log, "admin")])
        .get("/stats", |c| Box::pin(async move { c.text(StatusCode::OK, "stats") }));
    api.get("/public", |c| Box::pin(async move { c.text(StatusCode::OK, "public") }));

    get(&app, "/api/public").await;
    assert_eq!(*log.lock().unwrap(), ["api"]);
}

#[tokio::test]
async fn it_applies_group_middleware_only_to_later_routes() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut app = Engine::new();
    let mut api = app.group("/api", []);
    api.get("/early", |c| Box::pin(async move { c.text(StatusCode::OK, "early") }));
    api.use_middleware(tag(&log, "late"));
    api.get("/late", |c| Box::pin(async move { c.text(StatusCode::OK, "late") }));

    get(&app, "/api/early").await;
    assert!(log.lock().unwrap().is_empty());

    get(&app, "/api/late").await;
    assert_eq!(*log.lock().unwrap(), ["late"]);
}

#[tokio::test]
async fn it_skips_middleware_on_a_routing_miss() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut app = Engine::new();
    app.use_middleware(tag(&log, "global"));
    app.group("/api", [tag(&log, "api")])
        .get("/ping", |c| Box::pin(async move { c.text(StatusCode::OK, "pong") }));

    let res = get(&app, "/api/missing").await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(log.lock().unwrap().is_empty());
}
