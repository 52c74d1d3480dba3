//! Route groups.
//!
//! A group is a resolved snapshot: its prefix is every ancestor prefix
//! concatenated, its middleware list every ancestor list followed by its
//! own. Registering a route copies the group's current list into the route,
//! so later [`RouterGroup::use_middleware`] calls only affect routes
//! registered after them.

use crate::context::Context;
use crate::engine::Engine;
use crate::handler::{BoxFuture, Handler, HandlerResult};
use crate::method::Method;
use crate::middleware::Middleware;

/// Routes sharing a path prefix and middleware.
///
/// ```rust
/// use mows::{Engine, StatusCode, middleware};
///
/// let mut app = Engine::new();
/// let mut api = app.group("/api", [middleware::logger()]);
/// api.get("/ping", |c| Box::pin(async move { c.text(StatusCode::OK, "pong") }));
///
/// let mut admin = api.group("/admin", []);
/// assert_eq!(admin.prefix(), "/api/admin");
/// admin.get("/stats", |c| Box::pin(async move { c.text(StatusCode::OK, "{}") }));
/// ```
#[derive(Debug)]
pub struct RouterGroup<'e> {
    prefix: String,
    middlewares: Vec<Middleware>,
    engine: &'e mut Engine,
}

impl<'e> RouterGroup<'e> {
    pub(crate) fn new(
        engine: &'e mut Engine,
        prefix: String,
        middlewares: Vec<Middleware>,
    ) -> Self {
        Self { prefix, middlewares, engine }
    }

    /// A nested group. The prefix is concatenated as-is, without slash
    /// normalization.
    pub fn group(
        &mut self,
        prefix: &str,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) -> RouterGroup<'_> {
        let mut inherited = self.middlewares.clone();
        inherited.extend(middlewares);
        RouterGroup::new(self.engine, format!("{}{prefix}", self.prefix), inherited)
    }

    /// Appends middleware for routes registered on this group from now on.
    pub fn use_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }

    /// Registers `handler` for `method` at the group prefix + `path`.
    pub fn on<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.route(method, path, Vec::new(), Handler::new(handler))
    }

    /// Like [`on`](Self::on), with `before` handlers that run first, in
    /// order, as route middleware. The first error stops the chain.
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
        self.route(method, path, before.into_iter().collect(), Handler::new(handler))
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

    fn route(&mut self, method: Method, path: &str, before: Vec<Handler>, handler: Handler) -> &mut Self {
        let full_path = format!("{}{path}", self.prefix);
        self.engine
            .add_route(method, &full_path, &self.middlewares, before, handler);
        self
    }
}
