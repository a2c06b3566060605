//! Cookie policy enforcement.
//!
//! Handlers set cookies however they like; this stage rewrites every
//! outgoing `Set-Cookie` header so it satisfies the configured minimum
//! `SameSite`, `Secure` and `HttpOnly` requirements.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderValue},
    middleware::Next,
    response::Response,
};

use super::request_is_https;
use crate::config::{CookiePolicyConfig, CookieSecurePolicy, HttpOnlyPolicy, SameSitePolicy};

/// Resolved cookie policy shared by every request.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    config: CookiePolicyConfig,
    trust_forwarded_proto: bool,
}

impl CookiePolicy {
    /// Build the policy, or `None` when cookie rewriting is disabled.
    #[must_use]
    pub fn from_config(
        config: &CookiePolicyConfig,
        trust_forwarded_proto: bool,
    ) -> Option<Arc<Self>> {
        config.enabled.then(|| {
            Arc::new(Self {
                config: config.clone(),
                trust_forwarded_proto,
            })
        })
    }
}

fn parse_same_site(value: Option<&str>) -> SameSitePolicy {
    match value {
        Some(v) if v.eq_ignore_ascii_case("strict") => SameSitePolicy::Strict,
        Some(v) if v.eq_ignore_ascii_case("lax") => SameSitePolicy::Lax,
        Some(v) if v.eq_ignore_ascii_case("none") => SameSitePolicy::None,
        _ => SameSitePolicy::Unspecified,
    }
}

/// Rewrite a single `Set-Cookie` value according to the policy.
///
/// The name/value pair and unrelated attributes keep their original order;
/// `Secure`, `SameSite` and `HttpOnly` are re-emitted at the end.
#[must_use]
pub fn apply_cookie_policy(
    set_cookie: &str,
    config: &CookiePolicyConfig,
    request_is_https: bool,
) -> String {
    let mut parts = set_cookie.split(';').map(str::trim).filter(|p| !p.is_empty());
    let Some(pair) = parts.next() else {
        return set_cookie.to_string();
    };

    let mut same_site = SameSitePolicy::Unspecified;
    let mut secure = false;
    let mut http_only = false;
    let mut attributes = Vec::new();

    for part in parts {
        let (name, value) = part
            .split_once('=')
            .map_or((part, None), |(n, v)| (n.trim(), Some(v.trim())));
        if name.eq_ignore_ascii_case("samesite") {
            same_site = parse_same_site(value);
        } else if name.eq_ignore_ascii_case("secure") {
            secure = true;
        } else if name.eq_ignore_ascii_case("httponly") {
            http_only = true;
        } else {
            attributes.push(part);
        }
    }

    if same_site < config.minimum_same_site {
        same_site = config.minimum_same_site;
    }

    secure = match config.secure {
        CookieSecurePolicy::Always => true,
        CookieSecurePolicy::None => false,
        CookieSecurePolicy::SameAsRequest => request_is_https,
    };

    if config.http_only == HttpOnlyPolicy::Always {
        http_only = true;
    }

    let mut rewritten = pair.to_string();
    for attribute in attributes {
        rewritten.push_str("; ");
        rewritten.push_str(attribute);
    }
    if secure {
        rewritten.push_str("; Secure");
    }
    if let Some(value) = same_site.attribute_value() {
        rewritten.push_str("; SameSite=");
        rewritten.push_str(value);
    }
    if http_only {
        rewritten.push_str("; HttpOnly");
    }
    rewritten
}

/// Middleware rewriting every `Set-Cookie` header on the response.
pub async fn cookie_policy_middleware(
    State(policy): State<Arc<CookiePolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let is_https = request_is_https(&request, policy.trust_forwarded_proto);
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    if !headers.contains_key(SET_COOKIE) {
        return response;
    }

    let original: Vec<HeaderValue> = headers.get_all(SET_COOKIE).iter().cloned().collect();
    headers.remove(SET_COOKIE);

    for value in original {
        let rewritten = value
            .to_str()
            .ok()
            .map(|raw| apply_cookie_policy(raw, &policy.config, is_https))
            .and_then(|raw| HeaderValue::from_str(&raw).ok());
        match rewritten {
            Some(rewritten) => {
                tracing::debug!(cookie = ?rewritten, "applied cookie policy");
                headers.append(SET_COOKIE, rewritten);
            }
            None => {
                tracing::warn!("leaving unparseable Set-Cookie header untouched");
                headers.append(SET_COOKIE, value);
            }
        }
    }

    response
}
