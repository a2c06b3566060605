//! REST API handlers and `OpenAPI` documentation.
//!
//! The handlers are deliberately small: the interesting behaviour of this
//! service is the response pipeline wrapped around them.

// The OpenApi derive macro generates code that triggers this lint
#![allow(clippy::needless_for_each)]

use crate::pipeline_info::{PipelineInfo, StageInfo};
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{Days, NaiveDate, Utc};
use rand::Rng;
use serde::{Serialize, Serializer};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

/// Serialize a `StatusCode` as its `u16` representation.
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires `&T` signature
fn serialize_status_code<S: Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

/// RFC 7807 Problem Details error response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// URI reference identifying the problem type
    #[serde(rename = "type")]
    pub problem_type: String,
    /// Short human-readable summary
    pub title: String,
    /// HTTP status code
    #[serde(serialize_with = "serialize_status_code")]
    #[schema(value_type = u16)]
    pub status: StatusCode,
    /// Human-readable explanation specific to this occurrence
    pub detail: String,
    /// URI reference identifying the specific occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ProblemDetails {
    /// Create an internal server error response.
    #[must_use]
    pub fn internal_error(detail: &str) -> Self {
        Self {
            problem_type: "https://tools.ietf.org/html/rfc7231#section-6.6.1".to_string(),
            title: "Internal Server Error".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.to_string(),
            instance: None,
        }
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

const SUMMARIES: &[&str] = &[
    "Freezing",
    "Bracing",
    "Chilly",
    "Cool",
    "Mild",
    "Warm",
    "Balmy",
    "Hot",
    "Sweltering",
    "Scorching",
];

/// One day of sample forecast data.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    pub date: NaiveDate,
    pub temperature_c: i32,
    pub temperature_f: i32,
    pub summary: String,
}

impl WeatherForecast {
    /// Build a forecast entry, deriving Fahrenheit from Celsius.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // range is -20..55
    pub fn new(date: NaiveDate, temperature_c: i32, summary: &str) -> Self {
        Self {
            date,
            temperature_c,
            temperature_f: 32 + (f64::from(temperature_c) / 0.5556) as i32,
            summary: summary.to_string(),
        }
    }
}

/// `OpenAPI` documentation for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "HeaderDemo API",
        version = "v1",
        description = "Sample endpoints behind the HeaderDemo response pipeline",
        license(name = "MIT")
    ),
    servers(
        (url = "/api/v1", description = "REST API v1")
    ),
    paths(get_pipeline_info, get_weather_forecast, issue_demo_cookie),
    components(schemas(PipelineInfo, ProblemDetails, StageInfo, WeatherForecast))
)]
pub struct ApiDoc;

/// Routes mounted under `/api/v1`.
pub fn router() -> Router {
    Router::new()
        .route("/pipeline", get(get_pipeline_info))
        .route("/weatherforecast", get(get_weather_forecast))
        .route("/cookie", get(issue_demo_cookie))
}

/// Describe the response pipeline
///
/// Returns the service version, hosting environment and every pipeline
/// stage with its resolved settings, outermost first.
#[utoipa::path(
    get,
    path = "/pipeline",
    tag = "System",
    responses(
        (status = 200, description = "Resolved pipeline configuration", body = PipelineInfo)
    )
)]
#[allow(clippy::unused_async)] // Required for Axum handler signature
pub async fn get_pipeline_info(Extension(info): Extension<PipelineInfo>) -> Json<PipelineInfo> {
    Json(info)
}

/// Get a five day forecast
///
/// Returns randomly generated sample data for the next five days.
#[utoipa::path(
    get,
    path = "/weatherforecast",
    tag = "WeatherForecast",
    responses(
        (status = 200, description = "Forecast for the next five days", body = [WeatherForecast])
    )
)]
#[allow(clippy::unused_async)]
pub async fn get_weather_forecast() -> Json<Vec<WeatherForecast>> {
    let today = Utc::now().date_naive();
    let mut rng = rand::thread_rng();
    let forecasts = (1..=5)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .map(|date| {
            let summary = SUMMARIES[rng.gen_range(0..SUMMARIES.len())];
            WeatherForecast::new(date, rng.gen_range(-20..55), summary)
        })
        .collect();
    Json(forecasts)
}

/// Issue a demo cookie
///
/// Sets a cookie without any security attributes so the cookie policy
/// applied by the response pipeline can be observed.
#[utoipa::path(
    get,
    path = "/cookie",
    tag = "Demo",
    responses(
        (status = 204, description = "Cookie issued",
         headers(("Set-Cookie" = String, description = "demo session cookie")))
    )
)]
#[allow(clippy::unused_async)]
pub async fn issue_demo_cookie() -> impl IntoResponse {
    let cookie = format!("demo={}; Path=/", Uuid::new_v4());
    match HeaderValue::from_str(&cookie) {
        Ok(value) => (StatusCode::NO_CONTENT, [(SET_COOKIE, value)]).into_response(),
        Err(_) => ProblemDetails::internal_error("Failed to encode cookie").into_response(),
    }
}
