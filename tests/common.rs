//! Common test utilities

#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use mows::Engine;

/// A response with its body collected.
pub struct TestResponse {
    pub status: http::StatusCode,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap())
            .unwrap_or_default()
    }
}

pub async fn send(app: &Engine, method: &str, uri: &str) -> TestResponse {
    let request = http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap();
    collect(app.handle(request).await).await
}

pub async fn get(app: &Engine, uri: &str) -> TestResponse {
    send(app, "GET", uri).await
}

pub async fn post_json(app: &Engine, uri: &str, body: &str) -> TestResponse {
    let request = http::Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Bytes::copy_from_slice(body.as_bytes()))
        .unwrap();
    collect(app.handle(request).await).await
}

async fn collect(response: http::Response<Full<Bytes>>) -> TestResponse {
    let (parts, body) = response.into_parts();
    TestResponse {
        status: parts.status,
        headers: parts.headers,
        body: body.collect().await.unwrap().to_bytes(),
    }
}
