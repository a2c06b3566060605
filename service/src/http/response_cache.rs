//! In-memory response caching.
//!
//! Successful `GET`/`HEAD` responses that declare themselves publicly
//! cacheable are kept in memory and replayed until their freshness lifetime
//! runs out. Entries are keyed by method, scheme, host, path and query, so a
//! response produced for an HTTPS request is never replayed over plain HTTP
//! and vice versa.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::{to_bytes, Body, Bytes, HttpBody},
    extract::{Request, State},
    http::{
        header::{AGE, AUTHORIZATION, CACHE_CONTROL, PRAGMA, SET_COOKIE, VARY},
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::time::Instant;

use super::{request_host, request_is_https};
use crate::{config::ResponseCachingConfig, rest::ProblemDetails};

#[derive(Debug, Clone)]
struct CachedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedResponse {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) >= self.ttl
    }

    fn size(&self) -> usize {
        self.body.len()
            + self
                .headers
                .iter()
                .map(|(k, v)| k.as_str().len() + v.len())
                .sum::<usize>()
    }

    fn to_response(&self, now: Instant) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        let age = now.duration_since(self.stored_at).as_secs();
        response.headers_mut().insert(AGE, HeaderValue::from(age));
        response
    }
}

/// Shared response store with byte accounting.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CachedResponse>,
    size: AtomicUsize,
    maximum_body_size: usize,
    size_limit: usize,
    trust_forwarded_proto: bool,
}

impl ResponseCache {
    /// Create an empty cache with the configured limits, whether or not
    /// caching is enabled.
    #[must_use]
    pub fn new(config: &ResponseCachingConfig, trust_forwarded_proto: bool) -> Self {
        Self {
            entries: DashMap::new(),
            size: AtomicUsize::new(0),
            maximum_body_size: config.maximum_body_size,
            size_limit: config.size_limit,
            trust_forwarded_proto,
        }
    }

    /// Build the cache, or `None` when response caching is disabled.
    #[must_use]
    pub fn from_config(
        config: &ResponseCachingConfig,
        trust_forwarded_proto: bool,
    ) -> Option<Arc<Self>> {
        config
            .enabled
            .then(|| Arc::new(Self::new(config, trust_forwarded_proto)))
    }

    /// Number of cached responses, including expired ones not yet evicted.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Bytes currently accounted to cached responses.
    pub(crate) fn size_bytes(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    fn lookup(&self, key: &str) -> Option<Response> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.to_response(now));
            }
        }
        if let Some((_, removed)) = self.entries.remove_if(key, |_, e| e.is_expired(now)) {
            self.size.fetch_sub(removed.size(), Ordering::Relaxed);
        }
        None
    }

    /// Bytes the cache would hold after replacing `key` with `size` bytes.
    fn projected_size(&self, key: &str, size: usize) -> usize {
        let replaced = self.entries.get(key).map_or(0, |previous| previous.size());
        self.size_bytes().saturating_sub(replaced) + size
    }

    /// Store `entry` under `key`. Returns `false` when it does not fit.
    fn store(&self, key: String, entry: CachedResponse) -> bool {
        let size = entry.size();
        if self.projected_size(&key, size) > self.size_limit {
            self.purge_expired();
            if self.projected_size(&key, size) > self.size_limit {
                return false;
            }
        }

        self.size.fetch_add(size, Ordering::Relaxed);
        if let Some(previous) = self.entries.insert(key, entry) {
            self.size.fetch_sub(previous.size(), Ordering::Relaxed);
        }
        true
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| {
            if entry.is_expired(now) {
                self.size.fetch_sub(entry.size(), Ordering::Relaxed);
                false
            } else {
                true
            }
        });
    }
}

/// Parsed `Cache-Control` directives, lowercased names.
fn directives(headers: &HeaderMap) -> Vec<(String, Option<String>)> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| match d.split_once('=') {
            Some((name, value)) => (
                name.trim().to_ascii_lowercase(),
                Some(value.trim().trim_matches('"').to_string()),
            ),
            None => (d.to_ascii_lowercase(), None),
        })
        .collect()
}

fn has_directive(directives: &[(String, Option<String>)], name: &str) -> bool {
    directives.iter().any(|(n, _)| n == name)
}

fn seconds_directive(directives: &[(String, Option<String>)], name: &str) -> Option<u64> {
    directives
        .iter()
        .find(|(n, _)| n == name)
        .and_then(|(_, v)| v.as_deref())
        .and_then(|v| v.parse().ok())
}

/// Freshness lifetime of a response, or `None` if it must not be stored.
fn storable_lifetime(response: &Response) -> Option<Duration> {
    if response.status() != StatusCode::OK {
        return None;
    }
    let headers = response.headers();
    if headers.contains_key(SET_COOKIE) {
        return None;
    }
    if headers
        .get_all(VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(',').any(|f| f.trim() == "*"))
    {
        return None;
    }

    let directives = directives(headers);
    if !has_directive(&directives, "public")
        || has_directive(&directives, "no-store")
        || has_directive(&directives, "no-cache")
        || has_directive(&directives, "private")
    {
        return None;
    }

    let seconds = seconds_directive(&directives, "s-maxage")
        .or_else(|| seconds_directive(&directives, "max-age"))?;
    (seconds > 0).then_some(Duration::from_secs(seconds))
}

fn cache_key(request: &Request, trust_forwarded_proto: bool) -> String {
    let scheme = if request_is_https(request, trust_forwarded_proto) {
        "https"
    } else {
        "http"
    };
    let host = request_host(request).unwrap_or_default().to_ascii_lowercase();
    let path = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    format!("{}\n{scheme}\n{host}\n{path}", request.method())
}

/// Middleware serving and populating the response cache.
pub async fn response_cache_middleware(
    State(cache): State<Arc<ResponseCache>>,
    request: Request,
    next: Next,
) -> Response {
    if !matches!(*request.method(), Method::GET | Method::HEAD)
        || request.headers().contains_key(AUTHORIZATION)
    {
        return next.run(request).await;
    }

    let request_directives = directives(request.headers());
    if has_directive(&request_directives, "no-store") {
        return next.run(request).await;
    }
    let skip_lookup = has_directive(&request_directives, "no-cache")
        || request
            .headers()
            .get(PRAGMA)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("no-cache"));

    let key = cache_key(&request, cache.trust_forwarded_proto);
    if !skip_lookup {
        if let Some(response) = cache.lookup(&key) {
            tracing::debug!(key = %key.replace('\n', " "), "response cache hit");
            return response;
        }
    }

    let response = next.run(request).await;
    let Some(ttl) = storable_lifetime(&response) else {
        return response;
    };

    let (parts, body) = response.into_parts();
    let limit = u64::try_from(cache.maximum_body_size).unwrap_or(u64::MAX);
    if !body.size_hint().exact().is_some_and(|len| len <= limit) {
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, cache.maximum_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to buffer response for caching: {e}");
            return ProblemDetails::internal_error("Failed to read response body").into_response();
        }
    };

    let log_key = key.replace('\n', " ");
    let stored = cache.store(
        key,
        CachedResponse {
            status: parts.status,
            headers: parts.headers.clone(),
            body: bytes.clone(),
            stored_at: Instant::now(),
            ttl,
        },
    );
    if stored {
        tracing::debug!(
            key = %log_key,
            ttl_secs = ttl.as_secs(),
            entries = cache.len(),
            "response cached"
        );
    } else {
        tracing::debug!(key = %log_key, "response cache full, not storing");
    }

    Response::from_parts(parts, Body::from(bytes))
}
