//! HTTP utilities and middleware.
//!
//! This module provides the response pipeline stages used by the application
//! server, plus request helpers shared between them.

pub mod cookie_policy;
pub mod cors;
pub mod errors;
pub mod hsts;
pub mod https_redirect;
pub mod response_cache;
pub mod response_headers;

use axum::http::{header::HOST, uri::Scheme, Request};

pub use cookie_policy::{apply_cookie_policy, cookie_policy_middleware, CookiePolicy};
pub use cors::build_cors_layer;
pub use errors::catch_panic_layer;
pub use hsts::{hsts_middleware, HstsPolicy};
pub use https_redirect::{https_redirect_middleware, HttpsRedirect};
pub use response_cache::{response_cache_middleware, ResponseCache};
pub use response_headers::{build_response_headers, response_headers_middleware};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Whether the request arrived over HTTPS.
///
/// An absolute request URI with an `https` scheme always counts. The
/// `X-Forwarded-Proto` header is only consulted when the deployment trusts
/// the proxy in front of it.
#[must_use]
pub fn request_is_https<B>(request: &Request<B>, trust_forwarded_proto: bool) -> bool {
    if request.uri().scheme() == Some(&Scheme::HTTPS) {
        return true;
    }
    if !trust_forwarded_proto {
        return false;
    }
    request
        .headers()
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// Host the client addressed, without port.
///
/// Prefers the `Host` header and falls back to the URI authority. IPv6
/// literals keep their brackets.
#[must_use]
pub fn request_host<B>(request: &Request<B>) -> Option<String> {
    let raw = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(ToString::to_string))?;

    let host = strip_port(raw.trim());
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        return authority
            .find(']')
            .map_or(authority, |end| &authority[..=end]);
    }
    authority
        .rsplit_once(':')
        .map_or(authority, |(host, _port)| host)
}
