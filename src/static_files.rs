//! Static file serving.
//!
//! [`Engine::static_dir`](crate::Engine::static_dir) and
//! [`Engine::static_embed`](crate::Engine::static_embed) register a
//! `GET <prefix>/*filepath` catch-all route whose handler serves the
//! captured remainder from a directory or from a `rust-embed` asset set.
//! The router hands over the capture already percent-decoded, so
//! `my%20file.txt` is looked up as `my file.txt` and `%2e%2e` is a `..`
//! segment that `clean` rejects.

use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use rust_embed::{EmbeddedFile, RustEmbed};

use crate::context::Context;
use crate::handler::{Handler, HandlerResult};

/// Name of the catch-all capture holding the requested file path.
pub(crate) const FILEPATH: &str = "filepath";

const INDEX: &str = "index.html";

/// `RustEmbed::get` of one embedded asset type.
type EmbedGet = fn(&str) -> Option<EmbeddedFile>;

/// Where a static route reads from.
pub(crate) enum Root {
    Dir(PathBuf),
    /// Files of a `RustEmbed` type under the `/`-separated `subdir`.
    Embedded { get: EmbedGet, subdir: String },
}

impl Root {
    pub(crate) fn embedded<A: RustEmbed>(subdir: &str) -> Self {
        Self::Embedded { get: A::get, subdir: subdir.trim_matches('/').to_owned() }
    }
}

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dir(dir) => f.debug_tuple("Dir").field(dir).finish(),
            Self::Embedded { subdir, .. } => f.debug_struct("Embedded").field("subdir", subdir).finish_non_exhaustive(),
        }
    }
}

/// `<prefix>/*filepath`, with exactly one `/` at the join.
pub(crate) fn route_path(prefix: &str) -> String {
    format!("{}/*{FILEPATH}", prefix.trim_end_matches('/'))
}

/// The catch-all handler serving files from `root`.
pub(crate) fn handler(root: Root) -> Handler {
    let root = Arc::new(root);
    Handler::new(move |c| {
        let root = Arc::clone(&root);
        Box::pin(async move { serve(&root, c).await })
    })
}

async fn serve(root: &Root, c: &mut Context) -> HandlerResult {
    let Some(relative) = clean(c.param(FILEPATH)) else {
        c.writer_mut().not_found();
        return Ok(());
    };

    let found = match root {
        Root::Dir(dir) => read_from_dir(dir, &relative).await?,
        Root::Embedded { get, subdir } => lookup(*get, subdir, &relative)
            .map(|(name, bytes)| (content_type(&name), bytes)),
    };

    match found {
        Some((content_type, bytes)) => c.writer_mut().send(StatusCode::OK, &content_type, bytes),
        None => c.writer_mut().not_found(),
    }
    Ok(())
}

/// Reads `relative` under `dir`; a directory serves its `index.html`.
/// `Ok(None)` when there is nothing to serve.
async fn read_from_dir(dir: &Path, relative: &str) -> std::io::Result<Option<(String, Bytes)>> {
    let mut path = dir.join(relative);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => path.push(INDEX),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some((content_type(&path.to_string_lossy()), Bytes::from(bytes)))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Resolves `relative` under `subdir`, falling back to its `index.html`.
/// Returns the resolved asset name with the contents.
fn lookup(get: EmbedGet, subdir: &str, relative: &str) -> Option<(String, Bytes)> {
    let name = [subdir, relative]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    let index = if name.is_empty() { INDEX.to_owned() } else { format!("{name}/{INDEX}") };

    [name, index].into_iter().find_map(|name| {
        let file = get(&name)?;
        let bytes = match file.data {
            Cow::Borrowed(data) => Bytes::from_static(data),
            Cow::Owned(data) => Bytes::from(data),
        };
        Some((name, bytes))
    })
}

fn content_type(path: &str) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

/// Normalizes the captured path. `None` if it tries to climb out of the root.
fn clean(raw: &str) -> Option<String> {
    let mut parts = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            _ => parts.push(part),
        }
    }
    Some(parts.join("/"))
}
