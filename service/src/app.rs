//! Router and response pipeline assembly.
//!
//! Layers wrap from the inside out, so stages are added innermost first.
//! The resulting request flow, outermost to innermost, is:
//!
//! 1. request tracing
//! 2. panic recovery
//! 3. CORS
//! 4. response cache (when enabled)
//! 5. static response headers (`Test-2`, `Cache-Control`)
//! 6. cookie policy
//! 7. HSTS
//! 8. HTTPS redirection
//! 9. routes

use axum::{http::StatusCode, middleware, response::IntoResponse, routing::get, Extension, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config,
    http::{
        build_cors_layer, build_response_headers, catch_panic_layer, cookie_policy_middleware,
        hsts_middleware, https_redirect_middleware, response_cache_middleware,
        response_headers_middleware, CookiePolicy, HstsPolicy, HttpsRedirect, ResponseCache,
    },
    pipeline_info::PipelineInfo,
    rest::{self, ApiDoc},
};

/// Path of the generated `OpenAPI` document.
pub const OPENAPI_PATH: &str = "/swagger/v1/swagger.json";

/// Path of the Swagger UI.
pub const SWAGGER_UI_PATH: &str = "/swagger-ui";

// Health check handler
async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn not_found() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

/// Application routes without any pipeline stages.
#[must_use]
pub fn routes(config: &Config) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", rest::router())
        .fallback(not_found);

    if config.swagger_enabled() {
        app = app.merge(SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_PATH, ApiDoc::openapi()));
    }

    app.layer(Extension(PipelineInfo::from_config(config)))
}

/// Wrap routes in the configured response pipeline.
#[must_use]
pub fn apply_pipeline(routes: Router, config: &Config) -> Router {
    let trust_forwarded_proto = config.server.trust_forwarded_proto;
    let mut app = routes;

    if let Some(redirect) =
        HttpsRedirect::from_config(&config.https_redirection, trust_forwarded_proto)
    {
        app = app.layer(middleware::from_fn_with_state(
            redirect,
            https_redirect_middleware,
        ));
    }

    if let Some(hsts) = HstsPolicy::from_config(&config.hsts, trust_forwarded_proto) {
        app = app.layer(middleware::from_fn_with_state(hsts, hsts_middleware));
    }

    if let Some(cookies) = CookiePolicy::from_config(&config.cookie_policy, trust_forwarded_proto)
    {
        app = app.layer(middleware::from_fn_with_state(
            cookies,
            cookie_policy_middleware,
        ));
    }

    if config.response_headers.enabled {
        let headers = build_response_headers(&config.response_headers);
        app = app
            .layer(middleware::from_fn(response_headers_middleware))
            .layer(Extension(headers));
    }

    if let Some(cache) =
        ResponseCache::from_config(&config.response_caching, trust_forwarded_proto)
    {
        app = app.layer(middleware::from_fn_with_state(
            cache,
            response_cache_middleware,
        ));
    }

    app.layer(build_cors_layer(&config.cors))
        .layer(catch_panic_layer(config.environment))
        .layer(TraceLayer::new_for_http())
}

/// Build the full application: routes plus pipeline.
#[must_use]
pub fn build_app(config: &Config) -> Router {
    apply_pipeline(routes(config), config)
}

/// Log which pipeline stages are active and with what parameters.
pub fn log_pipeline(config: &Config) {
    let info = PipelineInfo::from_config(config);
    tracing::info!(
        environment = ?info.environment,
        version = %info.version,
        "hosting environment"
    );

    for stage in &info.stages {
        let detail = stage.detail.as_deref().unwrap_or("");
        if stage.enabled {
            tracing::info!(stage = %stage.name, %detail, "pipeline stage enabled");
        } else if stage.detail.is_some() {
            tracing::warn!(stage = %stage.name, %detail, "pipeline stage inactive");
        } else {
            tracing::info!(stage = %stage.name, "pipeline stage disabled");
        }
    }
}
