//! HTML templates on top of `tera`.
//!
//! Every template set is built with the engine's helper map: the
//! `safe_html` filter plus the `now()` and `date(t, layout)` functions, and
//! whatever [`Engine::add_template_func`](crate::Engine::add_template_func)
//! registered before loading.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Local};
use glob::{MatchOptions, Pattern};
use rust_embed::RustEmbed;
use serde::Serialize;
use tera::{Tera, Value};

use crate::error::Error;

/// A template helper callable, invoked with its named arguments.
pub type TemplateFn = Arc<dyn Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;

const DEFAULT_DATE_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Named template helpers.
#[derive(Clone)]
pub(crate) struct FuncMap(HashMap<String, TemplateFn>);

impl FuncMap {
    pub(crate) fn with_defaults() -> Self {
        let mut funcs = Self(HashMap::new());
        funcs.insert("now", Arc::new(now));
        funcs.insert("date", Arc::new(date));
        funcs
    }

    pub(crate) fn insert(&mut self, name: &str, f: TemplateFn) {
        self.0.insert(name.to_owned(), f);
    }

    fn register(&self, tera: &mut Tera) {
        tera.register_filter("safe_html", SafeHtml);
        for (name, f) in &self.0 {
            let f = Arc::clone(f);
            tera.register_function(name, move |args: &HashMap<String, Value>| f(args));
        }
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

enum Source {
    Glob(String),
    Embedded(Vec<(String, String)>),
}

/// A compiled template set.
///
/// Shared read-only by concurrent renders. Dev-mode reloads swap the set
/// under the write lock.
pub struct TemplateEngine {
    source: Source,
    funcs: FuncMap,
    tera: RwLock<Tera>,
}

impl TemplateEngine {
    /// Loads every template matching `pattern` (e.g. `"views/**/*.html"`).
    pub(crate) fn from_glob(pattern: &str, funcs: FuncMap) -> Result<Self, Error> {
        Self::build(Source::Glob(pattern.to_owned()), funcs)
    }

    /// Loads templates from in-memory `(name, source)` pairs.
    pub(crate) fn from_sources(sources: Vec<(String, String)>, funcs: FuncMap) -> Result<Self, Error> {
        Self::build(Source::Embedded(sources), funcs)
    }

    fn build(source: Source, funcs: FuncMap) -> Result<Self, Error> {
        let tera = compile(&source, &funcs)?;
        Ok(Self { source, funcs, tera: RwLock::new(tera) })
    }

    /// Recompiles a glob-loaded set. Embedded sets never change.
    pub(crate) fn reload(&self) -> Result<(), Error> {
        if let Source::Embedded(_) = self.source {
            return Ok(());
        }
        let fresh = compile(&self.source, &self.funcs)?;
        *self.tera.write().map_err(|_| poisoned())? = fresh;
        Ok(())
    }

    pub(crate) fn render<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<String, Error> {
        let context = tera::Context::from_serialize(data)?;
        let tera = self.tera.read().map_err(|_| poisoned())?;
        Ok(tera.render(name, &context)?)
    }
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Glob(pattern) => pattern.as_str(),
            Source::Embedded(_) => "<embedded>",
        };
        f.debug_struct("TemplateEngine")
            .field("source", &source)
            .field("funcs", &self.funcs)
            .finish_non_exhaustive()
    }
}

/// Collects the `A` assets matching `pattern` (e.g. `"views/**/*.html"`) as
/// `(name, source)` pairs, named relative to the pattern's literal directory
/// like a glob-loaded set.
pub(crate) fn embedded_sources<A: RustEmbed>(pattern: &str) -> Result<Vec<(String, String)>, Error> {
    let glob = Pattern::new(pattern)
        .map_err(|e| tera::Error::msg(format!("invalid template pattern `{pattern}`: {e}")))?;
    let options = MatchOptions { require_literal_separator: true, ..MatchOptions::new() };
    let base = glob_base(pattern);

    let mut sources = Vec::new();
    for path in A::iter() {
        if !glob.matches_with(&path, options) {
            continue;
        }
        let file = A::get(&path)
            .ok_or_else(|| tera::Error::msg(format!("embedded template `{path}` vanished")))?;
        let source = String::from_utf8(file.data.into_owned())
            .map_err(|e| tera::Error::msg(format!("template `{path}` is not utf-8: {e}")))?;
        let name = path.strip_prefix(base).unwrap_or(&path).to_owned();
        sources.push((name, source));
    }

    if sources.is_empty() {
        return Err(tera::Error::msg(format!("pattern `{pattern}` matches no embedded templates")).into());
    }
    Ok(sources)
}

/// The directory part of `pattern` before its first wildcard, with the
/// trailing `/`: `"views/**/*.html"` → `"views/"`.
fn glob_base(pattern: &str) -> &str {
    let literal = &pattern[..pattern.find(['*', '?', '[']).unwrap_or(pattern.len())];
    &literal[..literal.rfind('/').map_or(0, |i| i + 1)]
}

fn compile(source: &Source, funcs: &FuncMap) -> Result<Tera, Error> {
    let mut tera = match source {
        Source::Glob(pattern) => Tera::parse(pattern)?,
        Source::Embedded(sources) => {
            let mut tera = Tera::default();
            tera.add_raw_templates(sources.iter().map(|(n, s)| (n.as_str(), s.as_str())))?;
            tera
        }
    };
    funcs.register(&mut tera);
    if let Source::Glob(_) = source {
        tera.build_inheritance_chains()?;
    }
    Ok(tera)
}

fn poisoned() -> Error {
    Error::Template(tera::Error::msg("template set lock poisoned"))
}

// ── Default helpers ───────────────────────────────────────────────────────────

/// `{{ body | safe_html }}` outputs the value without escaping.
struct SafeHtml;

impl tera::Filter for SafeHtml {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        Ok(value.clone())
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// `{{ now() }}`: current local time, RFC 3339.
fn now(_args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(Local::now().to_rfc3339()))
}

/// `{{ date(t=created_at, layout="%d %b %Y") }}`
///
/// `t` is an RFC 3339 string or a unix timestamp in seconds; `layout` is a
/// strftime format and defaults to `%Y-%m-%d %H:%M:%S`.
fn date(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let time = match args.get("t") {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map_err(|e| tera::Error::msg(format!("date: `{s}`: {e}")))?,
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|t| t.fixed_offset())
            .ok_or_else(|| tera::Error::msg(format!("date: `{n}` is not a unix timestamp")))?,
        Some(other) => return Err(tera::Error::msg(format!("date: cannot format `{other}`"))),
        None => return Err(tera::Error::msg("date: missing argument `t`")),
    };

    let layout = args
        .get("layout")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_DATE_LAYOUT);

    let mut out = String::new();
    write!(out, "{}", time.format(layout))
        .map_err(|_| tera::Error::msg(format!("date: invalid layout `{layout}`")))?;
    Ok(Value::String(out))
}
