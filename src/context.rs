//! Per-request context.
//!
//! A [`Context`] is created by the dispatcher for every matched request,
//! threaded through the whole middleware chain as `&mut Context`, and turned
//! into the response once the chain returns. It is never shared between
//! requests.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode, Uri};
use serde::Serialize;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::Error;
use crate::handler::HandlerResult;
use crate::router::Params;
use crate::templates::TemplateEngine;
use crate::writer::{ContentType, ResponseWriter};

/// Peer address of the connection, stored as a request extension.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RemoteAddr(pub(crate) SocketAddr);

/// Request data, response writer and path parameters for one request.
pub struct Context {
    request: http::Request<Bytes>,
    params: Params,
    writer: ResponseWriter,
    templates: Option<Arc<TemplateEngine>>,
    dev_mode: bool,
}

impl Context {
    pub(crate) fn new(
        request: http::Request<Bytes>,
        templates: Option<Arc<TemplateEngine>>,
        dev_mode: bool,
    ) -> Self {
        Self {
            request,
            params: Params::new(),
            writer: ResponseWriter::new(),
            templates,
            dev_mode,
        }
    }

    // ── Request ───────────────────────────────────────────────────────────────

    pub fn request(&self) -> &http::Request<Bytes> {
        &self.request
    }

    pub fn method(&self) -> &http::Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// The request path as sent, still percent-encoded. Routing and
    /// [`param`](Self::param) work on the decoded form.
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Header value as a string. `None` if absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name)?.to_str().ok()
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// Address of the connected client, when served over a socket.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.request.extensions().get::<RemoteAddr>().map(|r| r.0)
    }

    // ── Path parameters ───────────────────────────────────────────────────────

    /// Value of a path capture, or `""` when the route has no such capture.
    ///
    /// For a route `/users/:id`, `c.param("id")` on `/users/42` is `"42"`.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map_or("", String::as_str)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    // ── Query string ──────────────────────────────────────────────────────────

    /// First value of query parameter `key`, or `""`.
    ///
    /// `/users?page=2` → `c.query("page") == "2"`.
    pub fn query(&self, key: &str) -> String {
        let Some(raw) = self.request.uri().query() else {
            return String::new();
        };
        serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
            .unwrap_or_default()
            .into_iter()
            .find_map(|(k, v)| (k == key).then_some(v))
            .unwrap_or_default()
    }

    /// Query value, or `default` when missing or empty.
    pub fn default_query(&self, key: &str, default: &str) -> String {
        let value = self.query(key);
        if value.is_empty() { default.to_owned() } else { value }
    }

    /// Query value as an integer. Missing is `0`; malformed is an error.
    pub fn query_int(&self, key: &str) -> Result<i64, Error> {
        let value = self.query(key);
        if value.is_empty() {
            return Ok(0);
        }
        value.parse().map_err(|e: std::num::ParseIntError| Error::Query {
            key: key.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Query value as an integer, or `default` when missing or malformed.
    ///
    /// `?page=5` → `5`, no `page` → `default`, `?page=abc` → `default`.
    pub fn default_query_int(&self, key: &str, default: i64) -> i64 {
        self.query(key).parse().unwrap_or(default)
    }

    /// Query value as a boolean. Missing is `false`; malformed is an error.
    ///
    /// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
    pub fn query_bool(&self, key: &str) -> Result<bool, Error> {
        let value = self.query(key);
        if value.is_empty() {
            return Ok(false);
        }
        parse_bool(&value).ok_or_else(|| Error::Query {
            key: key.to_owned(),
            reason: format!("`{value}` is not a boolean"),
        })
    }

    /// Query value as a boolean, or `default` when missing or malformed.
    pub fn default_query_bool(&self, key: &str, default: bool) -> bool {
        parse_bool(&self.query(key)).unwrap_or(default)
    }

    // ── Body binding ──────────────────────────────────────────────────────────

    /// Decodes the JSON body.
    ///
    /// Fails with [`Error::ContentType`] unless the request says
    /// `application/json`, with [`Error::EmptyBody`] on an empty body and
    /// with [`Error::Json`] when decoding fails.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let is_json = self
            .header(CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.contains("application/json"));
        if !is_json {
            return Err(Error::ContentType);
        }
        if self.body().is_empty() {
            return Err(Error::EmptyBody);
        }
        Ok(serde_json::from_slice(self.body())?)
    }

    /// Runs the `validator` constraints declared on `value`.
    pub fn validate<T: Validate>(&self, value: &T) -> Result<(), Error> {
        Ok(value.validate()?)
    }

    /// [`bind_json`](Self::bind_json) followed by [`validate`](Self::validate).
    pub fn bind_json_and_validate<T: DeserializeOwned + Validate>(&self) -> Result<T, Error> {
        let value = self.bind_json()?;
        self.validate(&value)?;
        Ok(value)
    }

    // ── Response ──────────────────────────────────────────────────────────────

    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    /// Responds with `value` serialized as JSON.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> HandlerResult {
        let body = serde_json::to_vec(value)?;
        self.writer.send(status, ContentType::Json.as_str(), body);
        Ok(())
    }

    /// Responds with a plain-text body.
    pub fn text(&mut self, status: StatusCode, body: impl Into<String>) -> HandlerResult {
        self.writer.send(status, ContentType::Text.as_str(), body.into());
        Ok(())
    }

    /// Renders template `name` with `data`.
    ///
    /// Fails with [`Error::TemplatesNotLoaded`] until the engine has loaded a
    /// template set. In dev mode the set is reloaded first.
    pub fn html<T: Serialize + ?Sized>(&mut self, status: StatusCode, name: &str, data: &T) -> HandlerResult {
        let templates = self.templates.as_ref().ok_or(Error::TemplatesNotLoaded)?;
        if self.dev_mode {
            templates.reload()?;
        }
        let body = templates.render(name, data)?;
        self.writer.send(status, ContentType::Html.as_str(), body);
        Ok(())
    }

    pub(crate) fn into_response(self) -> http::Response<http_body_util::Full<Bytes>> {
        self.writer.into_response()
    }

    #[cfg(test)]
    pub(crate) fn for_test(uri: &str) -> Self {
        let request = http::Request::builder()
            .uri(uri)
            .body(Bytes::new())
            .expect("valid test uri");
        Self::new(request, None, false)
    }
}

/// Boolean spellings accepted in query strings.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
