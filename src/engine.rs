//! The application engine and the request dispatcher.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use rust_embed::RustEmbed;
use serde::Serialize;
use tracing::{debug, error};

use crate::context::Context;
use crate::error::Error;
use crate::group::RouterGroup;
use crate::handler::{BoxFuture, Handler, HandlerResult};
use crate::method::Method;
use crate::middleware::{self, Middleware};
use crate::router::Router;
use crate::static_files::{self, Root};
use crate::templates::{self, FuncMap, TemplateEngine, TemplateFn};

/// Turns an error that escaped the middleware chain into a response.
pub type ErrorHandler = Arc<dyn Fn(&mut Context, Error) + Send + Sync>;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of every error response written by the default error handler.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Answers with [`Error::status`] and `{"error": "<message>"}`.
fn default_error_handler(c: &mut Context, err: Error) {
    let body = ErrorBody { error: err.to_string() };
    if let Err(e) = c.json(err.status(), &body) {
        error!(error = %e, "failed to write error response");
    }
}

/// One configured dispatch pipeline.
///
/// Build it once at startup: register routes, groups and middleware, load
/// templates, then hand it to [`Engine::run`]. Registration needs `&mut`;
/// serving only reads, so every request shares the same engine. Engines are
/// independent values and any number of them can coexist.
///
/// ```rust,no_run
/// use mows::{Engine, Error, StatusCode, middleware};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Error> {
///     let mut app = Engine::new();
///     app.use_middleware(middleware::logger())
///         .use_middleware(middleware::recover());
///
///     app.get("/hello", |c| Box::pin(async move {
///         c.json(StatusCode::OK, &serde_json::json!({ "message": "hello" }))
///     }));
///
///     app.run(":8080").await
/// }
/// ```
pub struct Engine {
    router: Router,
    middlewares: Vec<Middleware>,
    error_handler: ErrorHandler,
    templates: Option<Arc<TemplateEngine>>,
    template_funcs: FuncMap,
    dev_mode: bool,
    pub(crate) shutdown_timeout: Duration,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            middlewares: Vec::new(),
            error_handler: Arc::new(default_error_handler),
            templates: None,
            template_funcs: FuncMap::with_defaults(),
            dev_mode: false,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    /// Adds global middleware, run for every matched request before group
    /// and route middleware.
    pub fn use_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Replaces the error handler. The handler must write the response.
    ///
    /// It receives every error that escapes the chain, including the
    /// [`Error::Panic`] produced by [`middleware::recover`], so it should map
    /// that variant to a 500 itself ([`Error::status`] does).
    pub fn set_error_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context, Error) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Reload glob-loaded templates before every render.
    ///
    /// Development only: every render recompiles the whole set.
    pub fn dev_mode(&mut self, enable: bool) -> &mut Self {
        self.dev_mode = enable;
        self
    }

    /// How long a graceful shutdown waits for in-flight connections before
    /// closing them. Defaults to 5 seconds.
    pub fn shutdown_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.shutdown_timeout = timeout;
        self
    }

    // ── Routes ────────────────────────────────────────────────────────────────

    /// The root group: no prefix, no group middleware.
    fn root(&mut self) -> RouterGroup<'_> {
        RouterGroup::new(self, String::new(), Vec::new())
    }

    /// A top-level group with `prefix` and its own middleware.
    pub fn group(
        &mut self,
        prefix: &str,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) -> RouterGroup<'_> {
        RouterGroup::new(self, prefix.to_owned(), middlewares.into_iter().collect())
    }

    /// Registers `handler` for `method` + `path`.
    ///
    /// Path segments starting with `:` capture one segment; a final `*name`
    /// segment captures the rest of the path.
    pub fn on<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.root().on(method, path, handler);
        self
    }

    /// Registers `handler` behind `before`, a list of handlers run first as
    /// route middleware.
    pub fn on_with<F>(
        &mut self,
        method: Method,
        path: &str,
        before: impl IntoIterator<Item = Handler>,
        handler: F,
    ) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.root().on_with(method, path, before, handler);
        self
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.on(Method::Get, path, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.on(Method::Post, path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.on(Method::Put, path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.on(Method::Delete, path, handler)
    }

    /// Route registration entry point shared by the engine and its groups.
    pub(crate) fn add_route(
        &mut self,
        method: Method,
        path: &str,
        group_middlewares: &[Middleware],
        before: Vec<Handler>,
        handler: Handler,
    ) {
        let mut middlewares = group_middlewares.to_vec();
        middlewares.extend(before.into_iter().map(Middleware::before));
        debug!(%method, path, middlewares = middlewares.len(), "route registered");
        self.router.add_with_middleware(method, path, handler, middlewares);
    }

    // ── Static files ──────────────────────────────────────────────────────────

    /// Serves files under `root` at `prefix`: `/static/app.css` with prefix
    /// `/static` and root `./public` serves `./public/app.css`.
    ///
    /// A directory serves its `index.html`, or 404 without one; there are no
    /// directory listings. `Range` and conditional requests
    /// (`If-Modified-Since`, `If-None-Match`) are not supported: every hit
    /// answers 200 with the whole file.
    pub fn static_dir(&mut self, prefix: &str, root: impl Into<PathBuf>) -> &mut Self {
        self.serve_static(prefix, Root::Dir(root.into()))
    }

    /// Serves the assets of a `rust-embed` type found under `root`, a
    /// `/`-separated subdirectory of its folder (`""` for all of it).
    ///
    /// ```rust,ignore
    /// #[derive(rust_embed::RustEmbed)]
    /// #[folder = "site/"]
    /// struct Site;
    ///
    /// // GET /static/css/app.css serves site/public/css/app.css
    /// app.static_embed::<Site>("/static", "public");
    /// ```
    ///
    /// Same limits as [`static_dir`](Self::static_dir).
    pub fn static_embed<A: RustEmbed>(&mut self, prefix: &str, root: &str) -> &mut Self {
        self.serve_static(prefix, Root::embedded::<A>(root))
    }

    fn serve_static(&mut self, prefix: &str, root: Root) -> &mut Self {
        let path = static_files::route_path(prefix);
        self.add_route(Method::Get, &path, &[], Vec::new(), static_files::handler(root));
        self
    }

    // ── Templates ─────────────────────────────────────────────────────────────

    /// Loads the templates matching a glob such as `"views/**/*.html"`.
    /// Templates are named by their path relative to the glob's directory.
    pub fn load_templates(&mut self, pattern: &str) -> Result<&mut Self, Error> {
        let templates = TemplateEngine::from_glob(pattern, self.template_funcs.clone())?;
        self.templates = Some(Arc::new(templates));
        Ok(self)
    }

    /// Loads the assets of a `rust-embed` type matching `pattern`, named like
    /// [`load_templates`](Self::load_templates) names them:
    /// `"views/**/*.html"` loads `views/pages/a.html` as `pages/a.html`.
    ///
    /// Dev mode never reloads embedded templates.
    pub fn load_templates_embed<A: RustEmbed>(&mut self, pattern: &str) -> Result<&mut Self, Error> {
        let sources = templates::embedded_sources::<A>(pattern)?;
        let templates = TemplateEngine::from_sources(sources, self.template_funcs.clone())?;
        self.templates = Some(Arc::new(templates));
        Ok(self)
    }

    /// Loads templates from `(name, source)` pairs, typically
    /// `include_str!` contents. Dev mode never reloads these.
    pub fn load_templates_from<I, N, S>(&mut self, sources: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let sources = sources
            .into_iter()
            .map(|(name, source)| (name.into(), source.into()))
            .collect();
        let templates = TemplateEngine::from_sources(sources, self.template_funcs.clone())?;
        self.templates = Some(Arc::new(templates));
        Ok(self)
    }

    /// Registers a template function, callable as `{{ name(arg=value) }}`.
    ///
    /// Takes effect for template sets loaded after this call.
    pub fn add_template_func<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&std::collections::HashMap<String, tera::Value>) -> tera::Result<tera::Value>
            + Send
            + Sync
            + 'static,
    {
        let f: TemplateFn = Arc::new(f);
        self.template_funcs.insert(name, f);
        self
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Wraps `handler` in the global middleware, first declared outermost.
    pub(crate) fn build_chain(&self, handler: Handler) -> Handler {
        middleware::compose(&self.middlewares, handler)
    }

    /// Dispatches one request and returns its response.
    ///
    /// A routing miss answers `404 page not found` without running any
    /// middleware. Otherwise the chain runs as global → group → route →
    /// handler, and an error escaping it goes to the error handler.
    ///
    /// The server calls this for every request; tests can call it directly.
    pub async fn handle(&self, request: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let mut ctx = Context::new(request, self.templates.clone(), self.dev_mode);

        let found = Method::try_from(ctx.method())
            .ok()
            .and_then(|method| self.router.find(method, ctx.path()));
        let Some((route, params)) = found else {
            debug!(method = %ctx.method(), path = ctx.path(), "no route");
            ctx.writer_mut().not_found();
            return ctx.into_response();
        };

        ctx.set_params(params);

        let handler = middleware::compose(&route.middlewares, route.handler.clone());
        let handler = self.build_chain(handler);

        if let Err(err) = handler.call(&mut ctx).await {
            (self.error_handler)(&mut ctx, err);
        }

        ctx.into_response()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("router", &self.router)
            .field("middlewares", &self.middlewares.len())
            .field("templates", &self.templates)
            .field("dev_mode", &self.dev_mode)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish_non_exhaustive()
    }
}
