use std::fs;
use std::path::PathBuf;

use mows::{Engine, StatusCode};
use rust_embed::RustEmbed;

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
async fn it_serves_files_from_a_directory() {
    let root = scratch_dir("static");
    fs::create_dir_all(root.join("css")).unwrap();
    fs::write(root.join("css/app.css"), "body { margin: 0 }").unwrap();
    fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();

    let mut app = Engine::new();
    app.static_dir("/static", &root);

    let css = get(&app, "/static/css/app.css").await;
    assert_eq!(css.status, StatusCode::OK);
    assert_eq!(css.content_type(), "text/css");
    assert_eq!(css.text(), "body { margin: 0 }");

    let index = get(&app, "/static/").await;
    assert_eq!(index.content_type(), "text/html");
    assert_eq!(index.text(), "<h1>home</h1>");

    assert_eq!(get(&app, "/static/missing.js").await.status, StatusCode::NOT_FOUND);

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn it_answers_404_for_a_directory_without_index() {
    let root = scratch_dir("static-noindex");
    fs::create_dir_all(root.join("css")).unwrap();
    fs::write(root.join("css/app.css"), "a {}").unwrap();

    let mut app = Engine::new();
    app.static_dir("/static", &root);

    let res = get(&app, "/static/css").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.text(), "404 page not found");

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn it_serves_percent_encoded_file_names() {
    let root = scratch_dir("static-encoded");
    fs::write(root.join("my file.txt"), "spaced out").unwrap();
    fs::write(root.join("café.txt"), "crème").unwrap();

    let mut app = Engine::new();
    app.static_dir("/static", &root);

    let spaced = get(&app, "/static/my%20file.txt").await;
    assert_eq!(spaced.status, StatusCode::OK);
    assert_eq!(spaced.text(), "spaced out");

    assert_eq!(get(&app, "/static/caf%C3%A9.txt").await.text(), "crème");

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn it_refuses_to_leave_the_root() {
    let root = scratch_dir("static-jail");
    let mut app = Engine::new();
    app.static_dir("/static", root.join("public"));
    fs::create_dir_all(root.join("public")).unwrap();
    fs::write(root.join("x"), "outside").unwrap();

    for uri in ["/static/../x", "/static/%2e%2e/x", "/static/%2E%2E/x", "/static/a/%2e%2e/%2e%2e/x"] {
        let res = get(&app, uri).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "{uri}");
    }

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn it_serves_embedded_assets_from_a_subdirectory() {
    let mut app = Engine::new();
    app.static_embed::<Site>("/assets", "public");

    let robots = get(&app, "/assets/robots.txt").await;
    assert_eq!(robots.status, StatusCode::OK);
    assert_eq!(robots.content_type(), "text/plain");
    assert_eq!(robots.text(), "User-agent: *");

    assert_eq!(get(&app, "/assets/css/app.css").await.text(), "body { margin: 0 }");
    assert_eq!(get(&app, "/assets/").await.text(), "<h1>home</h1>");
    assert_eq!(get(&app, "/assets/docs").await.text(), "<p>docs</p>");
    assert_eq!(get(&app, "/assets/nope.js").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/assets/private/secret.txt").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/assets/%2e%2e/private/secret.txt").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn it_serves_the_whole_embedded_folder_with_an_empty_root() {
    let mut app = Engine::new();
    app.static_embed::<Site>("/all", "");

    assert_eq!(get(&app, "/all/private/secret.txt").await.text(), "not public");
}

#[tokio::test]
async fn it_runs_global_middleware_for_static_routes() {
    let mut app = Engine::new();
    app.use_middleware(mows::middleware::Middleware::from_fn(|c, next| Box::pin(async move {
        next.call(c).await?;
        c.writer_mut()
            .headers_mut()
            .insert(http::header::CACHE_CONTROL, http::HeaderValue::from_static("max-age=60"));
        Ok(())
    })));
    app.static_embed::<Site>("/assets", "public");

    let res = get(&app, "/assets/robots.txt").await;

    assert_eq!(res.headers[http::header::CACHE_CONTROL], "max-age=60");
}
