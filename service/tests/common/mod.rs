//! Common test utilities for integration tests.
//!
//! This module provides:
//!
//! - [`app_builder::TestAppBuilder`] - Build test Axum apps that mirror main.rs wiring
//! - [`send`] / [`body_string`] - Shorthand for driving a router with `oneshot`
//!
//! # Usage
//!
//! ```ignore
//! use crate::common::{app_builder::TestAppBuilder, send};
//!
//! #[tokio::test]
//! async fn test_with_app() {
//!     let app = TestAppBuilder::new().build();
//!     let response = send(&app, get("/health")).await;
//! }
//! ```

#![allow(dead_code)]

pub mod app_builder;

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use tower::ServiceExt;

/// Send one request through a clone of the router.
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("response")
}

/// Build a bodiless GET request.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

/// Collect a response body into a UTF-8 string.
pub async fn body_string(response: Response<Body>) -> String {
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    String::from_utf8(body.to_vec()).expect("utf8")
}
