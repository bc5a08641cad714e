use std::net::SocketAddr;

use serde::Deserialize;

use crate::{
    cors::CorsConfig, parameter_pollution::ParameterPollutionConfig, rate_limit::RateLimitConfig,
    sanitize::SanitizeConfig, security_headers::SecurityHeadersConfig, static_files::StaticFilesConfig,
};

/// Largest accepted JSON request body, in bytes
pub const DEFAULT_BODY_LIMIT: usize = 20 * 1024;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    /// Maximum request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
    /// Compress responses (gzip, brotli)
    #[serde(default = "default_true")]
    pub compression: bool,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
    #[serde(default)]
    pub security_headers: SecurityHeadersConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub sanitize: SanitizeConfig,
    #[serde(default)]
    pub parameter_pollution: ParameterPollutionConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            body_limit: DEFAULT_BODY_LIMIT,
            compression: true,
            cors: None,
            security_headers: SecurityHeadersConfig::default(),
            rate_limit: RateLimitConfig::default(),
            sanitize: SanitizeConfig::default(),
            parameter_pollution: ParameterPollutionConfig::default(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

const fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

const fn default_true() -> bool {
    true
}
