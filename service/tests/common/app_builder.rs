//! Test app builder that goes through the same wiring as main.rs.
//!
//! This module provides a [`TestAppBuilder`] that starts from a [`Config`],
//! lets tests adjust individual pipeline stages, and then builds the router
//! with [`headerdemo_api::app::apply_pipeline`] exactly as production does.
//!
//! # Usage
//!
//! ```ignore
//! use crate::common::app_builder::TestAppBuilder;
//!
//! #[tokio::test]
//! async fn test_with_full_app() {
//!     let app = TestAppBuilder::new()
//!         .with_https_port(5001)
//!         .with_cors(&["http://localhost:3000"])
//!         .build();
//!
//!     // Use app.oneshot(...) to send requests
//! }
//! ```
//!
//! # Preset Builders
//!
//! - [`TestAppBuilder::new()`] - Production defaults (no HTTPS port, no cache)
//! - [`TestAppBuilder::development()`] - Development environment (Swagger on)
//! - [`TestAppBuilder::bare()`] - Routes only, every optional stage off

#![allow(dead_code)]

use axum::{routing::MethodRouter, Router};
use headerdemo_api::{
    app::{apply_pipeline, routes},
    config::{Config, Environment},
};

/// Builder for test applications that mirrors main.rs wiring.
pub struct TestAppBuilder {
    /// Configuration handed to the pipeline builder
    config: Config,
    /// Extra routes merged before the pipeline is applied
    extra_routes: Router,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppBuilder {
    /// Create a builder with production defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            extra_routes: Router::new(),
        }
    }

    // =========================================================================
    // Preset Builders
    // =========================================================================

    /// Create an app running in the development environment.
    #[must_use]
    pub fn development() -> Self {
        Self::new().with_environment(Environment::Development)
    }

    /// Create an app with every optional stage disabled.
    ///
    /// CORS and panic recovery are always present.
    #[must_use]
    pub fn bare() -> Self {
        Self::new().with_config(|config| {
            config.cookie_policy.enabled = false;
            config.hsts.enabled = false;
            config.https_redirection.enabled = false;
            config.response_headers.enabled = false;
            config.response_caching.enabled = false;
        })
    }

    // =========================================================================
    // Component Configuration
    // =========================================================================

    /// Set the hosting environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    /// Configure CORS with specific allowed origins.
    ///
    /// Pass an empty slice to block all cross-origin requests.
    #[must_use]
    pub fn with_cors(mut self, origins: &[&str]) -> Self {
        self.config.cors.allowed_origins = origins.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Enable HTTPS redirection to the given port.
    #[must_use]
    pub fn with_https_port(mut self, port: u16) -> Self {
        self.config.https_redirection.https_port = Some(port);
        self
    }

    /// Trust `X-Forwarded-Proto` for scheme detection.
    #[must_use]
    pub fn with_trusted_forwarded_proto(mut self) -> Self {
        self.config.server.trust_forwarded_proto = true;
        self
    }

    /// Enable in-memory response caching with default limits.
    #[must_use]
    pub fn with_response_caching(mut self) -> Self {
        self.config.response_caching.enabled = true;
        self
    }

    /// Force Swagger on or off regardless of environment.
    #[must_use]
    pub fn with_swagger(mut self, enabled: bool) -> Self {
        self.config.swagger.enabled = Some(enabled);
        self
    }

    /// Adjust any configuration value.
    #[must_use]
    pub fn with_config(mut self, f: impl FnOnce(&mut Config)) -> Self {
        f(&mut self.config);
        self
    }

    /// Add a test-only route inside the pipeline.
    #[must_use]
    pub fn with_route(mut self, path: &str, route: MethodRouter) -> Self {
        self.extra_routes = self.extra_routes.route(path, route);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Build the Axum router.
    ///
    /// # Panics
    /// Panics if the configuration does not validate.
    #[must_use]
    pub fn build(self) -> Router {
        self.config
            .validate()
            .expect("test configuration should be valid");

        let app = routes(&self.config).merge(self.extra_routes);
        apply_pipeline(app, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_default_builder_serves_health() {
        let app = TestAppBuilder::new().build();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bare_builder_adds_no_static_headers() {
        let app = TestAppBuilder::bare().build();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("test-2").is_none());
    }
}
