//! Snapshot of the resolved response pipeline.
//!
//! Built once from [`Config`] at startup. The same snapshot is logged and
//! served from `/api/v1/pipeline`, so operators can check what a running
//! instance actually applies to its responses.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    app::OPENAPI_PATH,
    config::{Config, Environment},
};

/// One pipeline stage, listed outermost first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageInfo {
    pub name: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageInfo {
    fn new(name: &str, enabled: bool, detail: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            enabled,
            detail,
        }
    }
}

/// Resolved pipeline exposed via REST and logs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInfo {
    pub version: String,
    pub environment: Environment,
    pub stages: Vec<StageInfo>,
}

impl PipelineInfo {
    /// Describe the stages `apply_pipeline` installs for this configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let cors = StageInfo::new(
            "cors",
            true,
            Some(format!(
                "origins={}, credentials={}",
                config.cors.allowed_origins.join(" "),
                config.cors.allow_credentials
            )),
        );

        let cache = &config.response_caching;
        let response_cache = StageInfo::new(
            "response_cache",
            cache.enabled,
            cache.enabled.then(|| {
                format!(
                    "maximum_body_size={}, size_limit={}",
                    cache.maximum_body_size, cache.size_limit
                )
            }),
        );

        let headers = &config.response_headers;
        let names: Vec<&str> = headers.custom.keys().map(String::as_str).collect();
        let mut header_detail = names.join(" ");
        if let Some(directive) = headers.cache_control.directive() {
            header_detail.push_str(&format!(" cache-control=\"{directive}\""));
        }
        let response_headers = StageInfo::new(
            "response_headers",
            headers.enabled,
            headers.enabled.then(|| header_detail.trim().to_string()),
        );

        let cookies = &config.cookie_policy;
        let cookie_policy = StageInfo::new(
            "cookie_policy",
            cookies.enabled,
            cookies.enabled.then(|| {
                format!(
                    "minimum_same_site={:?}, secure={:?}, http_only={:?}",
                    cookies.minimum_same_site, cookies.secure, cookies.http_only
                )
            }),
        );

        let hsts = StageInfo::new(
            "hsts",
            config.hsts.enabled,
            config.hsts.enabled.then(|| config.hsts.header_value()),
        );

        let redirect = &config.https_redirection;
        let https_redirection = match (redirect.enabled, redirect.https_port) {
            (true, Some(port)) => StageInfo::new(
                "https_redirection",
                true,
                Some(format!("status={}, https_port={port}", redirect.status)),
            ),
            (true, None) => StageInfo::new(
                "https_redirection",
                false,
                Some("no https_port configured".to_string()),
            ),
            (false, _) => StageInfo::new("https_redirection", false, None),
        };

        let swagger_enabled = config.swagger_enabled();
        let swagger = StageInfo::new(
            "swagger",
            swagger_enabled,
            swagger_enabled.then(|| OPENAPI_PATH.to_string()),
        );

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: config.environment,
            stages: vec![
                cors,
                response_cache,
                response_headers,
                cookie_policy,
                hsts,
                https_redirection,
                swagger,
            ],
        }
    }

    /// Look up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageInfo> {
        self.stages.iter().find(|stage| stage.name == name)
    }
}
