//! Static response headers middleware.
//!
//! Every response leaving the application carries the configured static
//! headers (`Test-2: Value` by default) and a `Cache-Control` directive
//! (`public, max-age=2592000` by default).

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header::CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
    Extension,
};

use crate::config::ResponseHeadersConfig;

/// Build the static response headers from configuration.
///
/// Returns an `Arc`-wrapped `HeaderMap` that can be shared across requests
/// via Axum's `Extension` layer. Entries that are not valid header names or
/// values are skipped; `Config::validate` rejects them before startup.
#[must_use]
pub fn build_response_headers(config: &ResponseHeadersConfig) -> Arc<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.custom {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid static response header"),
        }
    }

    if let Some(directive) = config.cache_control.directive() {
        if let Ok(value) = HeaderValue::from_str(&directive) {
            headers.insert(CACHE_CONTROL, value);
        }
    }

    Arc::new(headers)
}

/// Middleware to add the static headers to all responses.
///
/// Headers are written after the downstream handler completes and replace
/// any value the handler set for the same name.
///
/// # Example
///
/// ```ignore
/// use axum::{middleware, Router, Extension};
/// use headerdemo_api::http::response_headers::{build_response_headers, response_headers_middleware};
/// use headerdemo_api::config::ResponseHeadersConfig;
///
/// let headers = build_response_headers(&ResponseHeadersConfig::default());
///
/// let app = Router::new()
///     // ... routes ...
///     .layer(middleware::from_fn(response_headers_middleware))
///     .layer(Extension(headers));
/// ```
pub async fn response_headers_middleware(
    Extension(headers): Extension<Arc<HeaderMap>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let response_headers = response.headers_mut();
    for (k, v) in headers.iter() {
        response_headers.insert(k.clone(), v.clone());
    }
    response
}
