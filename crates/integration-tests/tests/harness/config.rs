//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::path::Path;

use bulwark_config::{
    Config, CorsConfig, Environment, ParameterPollutionConfig, RateLimitConfig, ServerConfig, StaticFilesConfig,
};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with production defaults and no static files
    pub fn new() -> Self {
        Self {
            config: Config {
                environment: Environment::Production,
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    static_files: StaticFilesConfig {
                        enabled: false,
                        ..StaticFilesConfig::default()
                    },
                    ..ServerConfig::default()
                },
                telemetry: None,
            },
        }
    }

    /// Set the deployment environment
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Set rate limit configuration
    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.config.server.rate_limit = config;
        self
    }

    /// Set parameter pollution configuration
    pub fn with_parameter_pollution(mut self, config: ParameterPollutionConfig) -> Self {
        self.config.server.parameter_pollution = config;
        self
    }

    /// Serve static files from `dir`
    pub fn with_static_dir(mut self, dir: &Path) -> Self {
        self.config.server.static_files = StaticFilesConfig {
            enabled: true,
            dir: dir.to_path_buf(),
        };
        self
    }

    /// Set the request body limit
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.config.server.body_limit = limit;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
