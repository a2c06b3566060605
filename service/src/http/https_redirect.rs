//! Redirect plain HTTP requests to HTTPS.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::LOCATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{request_host, request_is_https};
use crate::config::HttpsRedirectionConfig;

/// Resolved redirect settings shared by every request.
#[derive(Debug, Clone)]
pub struct HttpsRedirect {
    https_port: u16,
    status: StatusCode,
    trust_forwarded_proto: bool,
}

impl HttpsRedirect {
    /// Build the redirect stage, or `None` when it is disabled or no HTTPS
    /// port is known.
    #[must_use]
    pub fn from_config(
        config: &HttpsRedirectionConfig,
        trust_forwarded_proto: bool,
    ) -> Option<Arc<Self>> {
        if !config.enabled {
            return None;
        }
        let https_port = config.https_port?;
        let status = StatusCode::from_u16(config.status).ok()?;
        Some(Arc::new(Self {
            https_port,
            status,
            trust_forwarded_proto,
        }))
    }

    /// Absolute HTTPS location for the given request.
    fn location(&self, request: &Request) -> Option<String> {
        let host = request_host(request)?;
        let path = request
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        if self.https_port == 443 {
            Some(format!("https://{host}{path}"))
        } else {
            Some(format!("https://{host}:{}{path}", self.https_port))
        }
    }
}

/// Middleware answering non-HTTPS requests with a redirect.
pub async fn https_redirect_middleware(
    State(redirect): State<Arc<HttpsRedirect>>,
    request: Request,
    next: Next,
) -> Response {
    if request_is_https(&request, redirect.trust_forwarded_proto) {
        return next.run(request).await;
    }

    let Some(location) = redirect.location(&request) else {
        tracing::debug!(uri = %request.uri(), "no host to redirect to, passing through");
        return next.run(request).await;
    };

    match HeaderValue::from_str(&location) {
        Ok(value) => {
            tracing::debug!(%location, status = %redirect.status, "redirecting to https");
            (redirect.status, [(LOCATION, value)]).into_response()
        }
        Err(_) => {
            tracing::warn!(%location, "redirect location is not a valid header value");
            next.run(request).await
        }
    }
}
