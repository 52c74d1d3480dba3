//! Route table.
//!
//! Two buckets per HTTP method:
//!
//! - **static** paths in a hash map, O(1) exact lookup;
//! - **param** paths (`/users/:id`, `/files/*path`) in a list scanned in
//!   registration order.
//!
//! Lookups run on the percent-decoded request path, so `/caf%C3%A9` finds a
//! route registered as `/café` and captures hold decoded text. A path that
//! does not decode to UTF-8 matches nothing.
//!
//! A static path always wins over a param route, whatever order they were
//! registered in. Among param routes the first registered match wins. There
//! is no conflict detection: registering the same static path twice keeps
//! the last handler.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use crate::handler::Handler;
use crate::method::Method;
use crate::middleware::Middleware;

/// Parameters bound by a param route, capture name → request segment.
pub type Params = HashMap<String, String>;

/// A registered handler and the middleware captured at registration time.
#[derive(Clone, Debug)]
pub(crate) struct Route {
    pub(crate) handler: Handler,
    pub(crate) middlewares: Vec<Middleware>,
}

#[derive(Debug)]
struct ParamRoute {
    parts: Vec<String>,
    route: Route,
}

impl ParamRoute {
    /// Matches `request` segment by segment, binding captures as it goes.
    fn matches(&self, request: &[&str]) -> Option<Params> {
        let catch_all = self.parts.last().filter(|p| p.starts_with('*'));

        match catch_all {
            Some(_) if request.len() + 1 < self.parts.len() => return None,
            None if request.len() != self.parts.len() => return None,
            _ => {}
        }

        let mut params = Params::new();
        for (i, part) in self.parts.iter().enumerate() {
            if let Some(name) = part.strip_prefix('*').filter(|_| i == self.parts.len() - 1) {
                params.insert(name.to_owned(), request.get(i..).unwrap_or_default().join("/"));
                break;
            }
            if let Some(name) = part.strip_prefix(':') {
                params.insert(name.to_owned(), request[i].to_owned());
            } else if part != request[i] {
                return None;
            }
        }
        Some(params)
    }
}

/// The engine's route table.
#[derive(Debug, Default)]
pub(crate) struct Router {
    static_routes: HashMap<Method, HashMap<String, Route>>,
    param_routes: HashMap<Method, Vec<ParamRoute>>,
}

impl Router {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` behind `middlewares` for `method` + `path`.
    pub(crate) fn add_with_middleware(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
        middlewares: Vec<Middleware>,
    ) {
        let route = Route { handler, middlewares };

        if !has_params(path) {
            self.static_routes
                .entry(method)
                .or_default()
                .insert(path.to_owned(), route);
            return;
        }

        let parts = split(path).map(str::to_owned).collect();
        self.param_routes
            .entry(method)
            .or_default()
            .push(ParamRoute { parts, route });
    }

    /// Looks up `method` + the raw request `path`. Static routes carry no
    /// parameters.
    pub(crate) fn find(&self, method: Method, path: &str) -> Option<(&Route, Params)> {
        let path = percent_decode_str(path).decode_utf8().ok()?;

        if let Some(route) = self.static_routes.get(&method).and_then(|m| m.get(&*path)) {
            return Some((route, Params::new()));
        }

        let request: Vec<&str> = split(&path).collect();
        self.param_routes
            .get(&method)?
            .iter()
            .find_map(|candidate| {
                candidate
                    .matches(&request)
                    .map(|params| (&candidate.route, params))
            })
    }
}

/// `true` when the pattern has a `:` capture or a trailing `*` catch-all.
fn has_params(path: &str) -> bool {
    path.contains(':') || split(path).last().is_some_and(|p| p.starts_with('*'))
}

/// Trims every leading and trailing `/`, then splits on `/`.
/// `"/"` yields one empty segment.
fn split(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/')
}
