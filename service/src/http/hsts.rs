//! HTTP Strict Transport Security.
//!
//! The header is only meaningful on a secure connection, so plain HTTP
//! responses never carry it. Loopback hosts are excluded by default so a
//! developer machine does not pin itself to HTTPS.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::STRICT_TRANSPORT_SECURITY, HeaderValue},
    middleware::Next,
    response::Response,
};

use super::{request_host, request_is_https};
use crate::config::HstsConfig;

/// Resolved HSTS settings shared by every request.
#[derive(Debug, Clone)]
pub struct HstsPolicy {
    header: HeaderValue,
    excluded_hosts: Vec<String>,
    trust_forwarded_proto: bool,
}

impl HstsPolicy {
    /// Build the policy, or `None` when HSTS is disabled.
    #[must_use]
    pub fn from_config(config: &HstsConfig, trust_forwarded_proto: bool) -> Option<Arc<Self>> {
        if !config.enabled {
            return None;
        }
        let header = HeaderValue::from_str(&config.header_value()).ok()?;
        Some(Arc::new(Self {
            header,
            excluded_hosts: config
                .excluded_hosts
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            trust_forwarded_proto,
        }))
    }

    /// Header value sent on qualifying responses.
    #[must_use]
    pub const fn header(&self) -> &HeaderValue {
        &self.header
    }

    fn applies_to(&self, request: &Request) -> bool {
        if !request_is_https(request, self.trust_forwarded_proto) {
            return false;
        }
        match request_host(request) {
            Some(host) => {
                let host = host.to_ascii_lowercase();
                !self.excluded_hosts.iter().any(|excluded| *excluded == host)
            }
            None => true,
        }
    }
}

/// Middleware adding `Strict-Transport-Security` to HTTPS responses.
pub async fn hsts_middleware(
    State(policy): State<Arc<HstsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let applies = policy.applies_to(&request);
    let mut response = next.run(request).await;
    if applies {
        response
            .headers_mut()
            .insert(STRICT_TRANSPORT_SECURITY, policy.header().clone());
    }
    response
}
