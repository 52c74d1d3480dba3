//! Buffered response writer.
//!
//! Handlers never touch the connection. Everything they write lands in a
//! [`ResponseWriter`], which the dispatcher turns into one hyper response
//! after the chain returns. Status and byte count stay observable the
//! whole time, which is what the request logger reads.

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::StatusCode;
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content types the context helpers write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// The per-request response under construction.
///
/// Starts as `200 OK` with no headers and an empty body.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub(crate) fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Bytes written to the body so far.
    pub fn size(&self) -> usize {
        self.body.len()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn write_header(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Appends to the body. Returns the number of bytes written.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        self.body.extend_from_slice(bytes);
        bytes.len()
    }

    /// Replaces status, content type and body in one go.
    pub fn send(&mut self, status: StatusCode, content_type: &str, body: impl Into<Bytes>) {
        self.status = status;
        self.set_content_type(content_type);
        self.body.clear();
        self.body.extend_from_slice(&body.into());
    }

    /// Forgets everything written so far.
    pub fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
    }

    pub(crate) fn set_content_type(&mut self, content_type: &str) {
        match HeaderValue::from_str(content_type) {
            Ok(value) => {
                self.headers.insert(CONTENT_TYPE, value);
            }
            Err(_) => {
                self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::OctetStream.as_str()));
            }
        }
    }

    /// `404 page not found`, the answer to a routing miss.
    pub(crate) fn not_found(&mut self) {
        self.send(StatusCode::NOT_FOUND, ContentType::Text.as_str(), "404 page not found");
    }

    pub(crate) fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_status_and_size() {
        let mut w = ResponseWriter::new();
        assert_eq!(w.status(), StatusCode::OK);

        w.write_header(StatusCode::CREATED);
        assert_eq!(w.write(b"abc"), 3);
        w.write(b"de");

        assert_eq!(w.status(), StatusCode::CREATED);
        assert_eq!(w.size(), 5);
        assert_eq!(w.body(), b"abcde");
    }

    #[test]
    fn send_replaces_previous_body() {
        let mut w = ResponseWriter::new();
        w.send(StatusCode::OK, ContentType::Text.as_str(), "partial");
        w.send(StatusCode::BAD_REQUEST, ContentType::Json.as_str(), r#"{"error":"x"}"#);

        assert_eq!(w.status(), StatusCode::BAD_REQUEST);
        assert_eq!(w.body(), br#"{"error":"x"}"#);
        assert_eq!(w.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn reset_clears_everything() {
        let mut w = ResponseWriter::new();
        w.headers_mut().insert("x-trace", HeaderValue::from_static("1"));
        w.send(StatusCode::ACCEPTED, ContentType::Html.as_str(), "<p>");
        w.reset();

        assert_eq!(w.status(), StatusCode::OK);
        assert!(w.headers().is_empty());
        assert_eq!(w.size(), 0);
    }
}
