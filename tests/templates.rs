use std::fs;
use std::path::PathBuf;

use mows::{Engine, StatusCode};
use rust_embed::RustEmbed;
use serde_json::{Value, json};

mod common;
use common::get;

#[derive(RustEmbed)]
#[folder = "tests/fixtures/site/"]
struct Site;

/// A fresh directory under the system temp dir.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mows-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn it_renders_in_memory_templates_with_inheritance() {
    let mut app = Engine::new();
    app.load_templates_from([
        ("base.html", "<title>{% block title %}{% endblock %}</title>"),
        ("home.html", r#"{% extends "base.html" %}{% block title %}Hi {{ name }}{% endblock %}"#),
    ])
    .unwrap();
    app.get("/", |c| Box::pin(async move {
        c.html(StatusCode::OK, "home.html", &json!({ "name": "<ana>" }))
    }));

    let res = get(&app, "/").await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.content_type(), "text/html; charset=utf-8");
    assert_eq!(res.text(), "<title>Hi &lt;ana&gt;</title>");
}

#[tokio::test]
async fn it_calls_custom_template_functions() {
    let mut app = Engine::new();
    app.add_template_func("shout", |args| {
        let word = args.get("word").and_then(Value::as_str).unwrap_or_default();
        Ok(Value::String(format!("{}!", word.to_uppercase())))
    });
    app.load_templates_from([("shout.html", r#"{{ shout(word="hey") }} {{ html | safe_html }}"#)])
        .unwrap();
    app.get("/shout", |c| Box::pin(async move {
        c.html(StatusCode::OK, "shout.html", &json!({ "html": "<br>" }))
    }));

    assert_eq!(get(&app, "/shout").await.text(), "HEY! <br>");
}

#[tokio::test]
async fn it_fails_without_loaded_templates() {
    let mut app = Engine::new();
    app.get("/", |c| Box::pin(async move { c.html(StatusCode::OK, "home.html", &()) }));

    let res = get(&app, "/").await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json(), json!({ "error": "templates not loaded" }));
}

#[tokio::test]
async fn it_reports_template_syntax_errors_at_load_time() {
    let mut app = Engine::new();
    assert!(app.load_templates_from([("broken.html", "{% if %}")]).is_err());
}

#[tokio::test]
async fn it_reloads_glob_templates_in_dev_mode() {
    let dir = scratch_dir("templates");
    let page = dir.join("page.html");
    fs::write(&page, "v1 {{ n }}").unwrap();

    let mut app = Engine::new();
    app.dev_mode(true);
    app.load_templates(&format!("{}/*.html", dir.display())).unwrap();
    app.get("/page", |c| Box::pin(async move {
        c.html(StatusCode::OK, "page.html", &json!({ "n": 1 }))
    }));

    assert_eq!(get(&app, "/page").await.text(), "v1 1");

    fs::write(&page, "v2 {{ n }}").unwrap();
    assert_eq!(get(&app, "/page").await.text(), "v2 1");

    fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn it_keeps_the_compiled_set_outside_dev_mode() {
    let dir = scratch_dir("templates-prod");
    let page = dir.join("page.html");
    fs::write(&page, "v1").unwrap();

    let mut app = Engine::new();
    app.load_templates(&format!("{}/*.html", dir.display())).unwrap();
    app.get("/page", |c| Box::pin(async move { c.html(StatusCode::OK, "page.html", &json!({})) }));

    fs::write(&page, "v2").unwrap();
    assert_eq!(get(&app, "/page").await.text(), "v1");

    fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn it_renders_embedded_templates_from_a_pattern() {
    let mut app = Engine::new();
    app.load_templates_embed::<Site>("views/**/*.html").unwrap();
    app.get("/", |c| Box::pin(async move {
        c.html(StatusCode::OK, "home.html", &json!({ "title": "Welcome" }))
    }));
    app.get("/hello/:name", |c| Box::pin(async move {
        let data = json!({ "name": c.param("name") });
        c.html(StatusCode::OK, "pages/hello.html", &data)
    }));

    assert_eq!(get(&app, "/").await.text(), "<title>mows</title><h1>Welcome</h1>");
    assert_eq!(get(&app, "/hello/ana%20b").await.text(), "<title>Hello ana b</title>");
}

#[tokio::test]
async fn it_rejects_a_pattern_matching_no_embedded_templates() {
    let mut app = Engine::new();
    assert!(app.load_templates_embed::<Site>("templates/*.html").is_err());
}
