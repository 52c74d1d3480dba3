//! Server-rendered pages and static assets, both compiled into the binary
//! from `demos/site/` with rust-embed.
//!
//! Run with:
//!   cargo run --example static_and_template
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/hello/alice
//!   curl http://localhost:3000/assets/app.css

use mows::{Engine, Error, StatusCode, middleware};
use rust_embed::RustEmbed;
use serde_json::json;

#[derive(RustEmbed)]
#[folder = "demos/site/"]
struct Site;

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
        .use_middleware(middleware::recover());

    app.load_templates_embed::<Site>("views/*.html")?;
    app.static_embed::<Site>("/assets", "public");

    app.get("/", |c| Box::pin(async move {
        let data = json!({ "title": "mows", "intro": "<p>A <em>small</em> web framework.</p>" });
        c.html(StatusCode::OK, "home.html", &data)
    }));
    app.get("/hello/:name", |c| Box::pin(async move {
        let data = json!({ "name": c.param("name") });
        c.html(StatusCode::OK, "hello.html", &data)
    }));

    app.run(":3000").await
}
