#![allow(clippy::must_use_candidate)]

pub mod cors;
mod env;
mod loader;
pub mod parameter_pollution;
pub mod rate_limit;
pub mod sanitize;
pub mod security_headers;
pub mod server;
pub mod static_files;
pub mod telemetry;

use serde::Deserialize;

pub use bulwark_core::Environment;
pub use cors::*;
pub use parameter_pollution::*;
pub use rate_limit::*;
pub use sanitize::*;
pub use security_headers::*;
pub use server::*;
pub use static_files::*;
pub use telemetry::TelemetryConfig;

/// Top-level Bulwark configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Deployment environment; controls how much failure detail reaches callers
    #[serde(default)]
    pub environment: Environment,
    /// Server and middleware configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
