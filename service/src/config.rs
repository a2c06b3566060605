use std::collections::BTreeMap;

use axum::http::{HeaderName, HeaderValue};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_aux::prelude::deserialize_vec_from_string_or_vec;
use utoipa::ToSchema;

/// Application configuration loaded from multiple sources.
///
/// Configuration is loaded in priority order (lowest to highest):
/// 1. Struct defaults
/// 2. config.yaml file (if exists)
/// 3. Environment variables with HD_ prefix (always wins)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub cookie_policy: CookiePolicyConfig,
    #[serde(default)]
    pub hsts: HstsConfig,
    #[serde(default)]
    pub https_redirection: HttpsRedirectionConfig,
    #[serde(default)]
    pub response_headers: ResponseHeadersConfig,
    #[serde(default)]
    pub response_caching: ResponseCachingConfig,
    #[serde(default)]
    pub swagger: SwaggerConfig,
}

/// Hosting environment name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP server bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Treat `X-Forwarded-Proto: https` as an HTTPS request.
    /// Only enable behind a TLS-terminating proxy that sets the header.
    #[serde(default)]
    pub trust_forwarded_proto: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests.
    /// Use `"*"` to allow any origin (cannot be combined with credentials).
    /// Accepts either an array or comma-separated string.
    #[serde(
        default = "default_allowed_origins",
        deserialize_with = "deserialize_origins"
    )]
    pub allowed_origins: Vec<String>,

    /// Send `Access-Control-Allow-Credentials: true`.
    #[serde(default = "default_true")]
    pub allow_credentials: bool,
}

/// Deserialize origins from comma-separated string or array, filtering empty values.
fn deserialize_origins<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let origins: Vec<String> = deserialize_vec_from_string_or_vec(deserializer)?;
    Ok(origins.into_iter().filter(|s| !s.is_empty()).collect())
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            allow_credentials: default_true(),
        }
    }
}

/// `SameSite` strength, ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSitePolicy {
    Unspecified,
    None,
    Lax,
    Strict,
}

impl SameSitePolicy {
    /// Attribute value as written in a `Set-Cookie` header.
    #[must_use]
    pub const fn attribute_value(self) -> Option<&'static str> {
        match self {
            Self::Unspecified => None,
            Self::None => Some("None"),
            Self::Lax => Some("Lax"),
            Self::Strict => Some("Strict"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieSecurePolicy {
    SameAsRequest,
    Always,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpOnlyPolicy {
    None,
    Always,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CookiePolicyConfig {
    /// Rewrite outgoing `Set-Cookie` headers (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cookies weaker than this are raised to it (default: none).
    #[serde(default = "default_minimum_same_site")]
    pub minimum_same_site: SameSitePolicy,

    /// `Secure` attribute policy (default: always).
    #[serde(default = "default_cookie_secure")]
    pub secure: CookieSecurePolicy,

    /// `HttpOnly` attribute policy (default: always).
    #[serde(default = "default_http_only")]
    pub http_only: HttpOnlyPolicy,
}

impl Default for CookiePolicyConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            minimum_same_site: default_minimum_same_site(),
            secure: default_cookie_secure(),
            http_only: default_http_only(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HstsConfig {
    /// Send `Strict-Transport-Security` on HTTPS responses (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HSTS max-age in seconds (default: 2592000 = 30 days).
    #[serde(default = "default_thirty_days")]
    pub max_age: u64,

    /// Include subdomains in HSTS (default: true).
    #[serde(default = "default_true")]
    pub include_subdomains: bool,

    /// Request inclusion in browser preload lists (default: true).
    #[serde(default = "default_true")]
    pub preload: bool,

    /// Hosts that never receive the header.
    #[serde(default = "default_hsts_excluded_hosts")]
    pub excluded_hosts: Vec<String>,
}

impl HstsConfig {
    /// Render the `Strict-Transport-Security` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        let mut value = format!("max-age={}", self.max_age);
        if self.include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if self.preload {
            value.push_str("; preload");
        }
        value
    }
}

impl Default for HstsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_age: default_thirty_days(),
            include_subdomains: default_true(),
            preload: default_true(),
            excluded_hosts: default_hsts_excluded_hosts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpsRedirectionConfig {
    /// Redirect plain HTTP requests to HTTPS (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Public HTTPS port. Without it no redirect target can be built and
    /// redirection stays off.
    #[serde(default)]
    pub https_port: Option<u16>,

    /// Redirect status code (default: 307).
    #[serde(default = "default_redirect_status")]
    pub status: u16,
}

impl Default for HttpsRedirectionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            https_port: None,
            status: default_redirect_status(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponseHeadersConfig {
    /// Append the static headers below to every response (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Static headers, name to value.
    #[serde(default = "default_custom_headers")]
    pub custom: BTreeMap<String, String>,

    #[serde(default)]
    pub cache_control: CacheControlConfig,
}

impl Default for ResponseHeadersConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            custom: default_custom_headers(),
            cache_control: CacheControlConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheControlConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Mark responses cacheable by shared caches (default: true).
    #[serde(default = "default_true")]
    pub public: bool,

    /// Freshness lifetime in seconds (default: 2592000 = 30 days).
    #[serde(default = "default_thirty_days")]
    pub max_age: u64,
}

impl CacheControlConfig {
    /// Render the `Cache-Control` directive, or `None` when disabled.
    #[must_use]
    pub fn directive(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        if self.public {
            Some(format!("public, max-age={}", self.max_age))
        } else {
            Some(format!("max-age={}", self.max_age))
        }
    }
}

impl Default for CacheControlConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            public: default_true(),
            max_age: default_thirty_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponseCachingConfig {
    /// Serve cacheable responses from memory (default: false).
    #[serde(default)]
    pub enabled: bool,

    /// Largest body that will be cached, in bytes (default: 64 MiB).
    #[serde(default = "default_maximum_body_size")]
    pub maximum_body_size: usize,

    /// Total bytes held by the cache (default: 100 MiB).
    #[serde(default = "default_cache_size_limit")]
    pub size_limit: usize,
}

impl Default for ResponseCachingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            maximum_body_size: default_maximum_body_size(),
            size_limit: default_cache_size_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SwaggerConfig {
    /// Serve the OpenAPI document and Swagger UI.
    /// Unset means "only in development".
    /// Override via `HD_SWAGGER__ENABLED=true|false`
    #[serde(default)]
    pub enabled: Option<bool>,
}

// These functions cannot be const because serde uses function pointers for defaults
#[allow(clippy::missing_const_for_fn)]
fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["https://localhost:5000".to_string()]
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_thirty_days() -> u64 {
    2_592_000 // 30 days
}

#[allow(clippy::missing_const_for_fn)]
fn default_minimum_same_site() -> SameSitePolicy {
    SameSitePolicy::None
}

#[allow(clippy::missing_const_for_fn)]
fn default_cookie_secure() -> CookieSecurePolicy {
    CookieSecurePolicy::Always
}

#[allow(clippy::missing_const_for_fn)]
fn default_http_only() -> HttpOnlyPolicy {
    HttpOnlyPolicy::Always
}

fn default_hsts_excluded_hosts() -> Vec<String> {
    vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
        "[::1]".to_string(),
    ]
}

#[allow(clippy::missing_const_for_fn)]
fn default_redirect_status() -> u16 {
    307
}

fn default_custom_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Test-2".to_string(), "Value".to_string())])
}

#[allow(clippy::missing_const_for_fn)]
fn default_maximum_body_size() -> usize {
    64 * 1024 * 1024
}

#[allow(clippy::missing_const_for_fn)]
fn default_cache_size_limit() -> usize {
    100 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            server: ServerConfig {
                port: default_port(),
                host: default_host(),
                trust_forwarded_proto: false,
            },
            logging: LoggingConfig {
                level: default_log_level(),
            },
            cors: CorsConfig::default(),
            cookie_policy: CookiePolicyConfig::default(),
            hsts: HstsConfig::default(),
            https_redirection: HttpsRedirectionConfig::default(),
            response_headers: ResponseHeadersConfig::default(),
            response_caching: ResponseCachingConfig::default(),
            swagger: SwaggerConfig::default(),
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Sources are merged in priority order:
    /// 1. Struct defaults (lowest)
    /// 2. config.yaml file (if exists)
    /// 3. Environment variables with HD_ prefix (highest)
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.yaml")
    }

    /// Load configuration with a custom YAML file path.
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load_from(yaml_path: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(yaml_path))
            .merge(Env::prefixed("HD_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Whether the OpenAPI document and Swagger UI are served.
    #[must_use]
    pub fn swagger_enabled(&self) -> bool {
        self.swagger
            .enabled
            .unwrap_or_else(|| self.environment.is_development())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Port must be non-zero
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port cannot be 0".into()));
        }

        // CORS origins must be valid URLs or "*"
        for origin in &self.cors.allowed_origins {
            if origin != "*" && !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "cors.allowed_origins contains invalid origin '{origin}'. Must be '*' or start with http:// or https://"
                )));
            }
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::Validation(
                "cors.allowed_origins cannot contain '*' when cors.allow_credentials is true"
                    .into(),
            ));
        }

        for (name, value) in &self.response_headers.custom {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(ConfigError::Validation(format!(
                    "response_headers.custom contains invalid header name '{name}'"
                )));
            }
            if HeaderValue::from_str(value).is_err() {
                return Err(ConfigError::Validation(format!(
                    "response_headers.custom.{name} has an invalid header value"
                )));
            }
        }

        if self.https_redirection.https_port == Some(0) {
            return Err(ConfigError::Validation(
                "https_redirection.https_port cannot be 0".into(),
            ));
        }

        if !matches!(self.https_redirection.status, 301 | 302 | 307 | 308) {
            return Err(ConfigError::Validation(format!(
                "https_redirection.status must be one of 301, 302, 307, 308, got: {}",
                self.https_redirection.status
            )));
        }

        let caching = &self.response_caching;
        if caching.maximum_body_size == 0 || caching.size_limit == 0 {
            return Err(ConfigError::Validation(
                "response_caching limits cannot be 0".into(),
            ));
        }
        if caching.maximum_body_size > caching.size_limit {
            return Err(ConfigError::Validation(
                "response_caching.maximum_body_size cannot exceed response_caching.size_limit"
                    .into(),
            ));
        }

        Ok(())
    }
}
