use std::path::Path;

use bulwark_core::Environment;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if environment variable expansion, parsing or
    /// validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if limits are zero, durations do not parse or
    /// paths are malformed
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_server()?;
        self.validate_rate_limit()?;
        self.validate_telemetry()?;

        if self.environment == Environment::Unrecognized {
            tracing::warn!("unrecognized environment, failures will be disclosed as in production");
        }

        Ok(())
    }

    fn validate_server(&self) -> anyhow::Result<()> {
        if self.server.body_limit == 0 {
            anyhow::bail!("server.body_limit must be greater than 0");
        }

        let static_files = &self.server.static_files;
        if static_files.enabled && !static_files.dir.is_dir() {
            tracing::warn!(
                dir = %static_files.dir.display(),
                "static file directory does not exist, every static lookup will miss"
            );
        }

        Ok(())
    }

    fn validate_rate_limit(&self) -> anyhow::Result<()> {
        let rate_limit = &self.server.rate_limit;
        if !rate_limit.enabled {
            return Ok(());
        }

        if rate_limit.requests == 0 {
            anyhow::bail!("server.rate_limit.requests must be greater than 0");
        }

        let window = duration_str::parse(&rate_limit.window)
            .map_err(|e| anyhow::anyhow!("invalid server.rate_limit.window '{}': {e}", rate_limit.window))?;
        if window.is_zero() {
            anyhow::bail!("server.rate_limit.window must be greater than 0");
        }

        if !rate_limit.path_prefix.starts_with('/') {
            anyhow::bail!("server.rate_limit.path_prefix must start with '/'");
        }

        Ok(())
    }

    fn validate_telemetry(&self) -> anyhow::Result<()> {
        let Some(ref telemetry) = self.telemetry else {
            return Ok(());
        };

        if !(0.0..=1.0).contains(&telemetry.sampling_rate) {
            anyhow::bail!("telemetry.sampling_rate must be between 0.0 and 1.0");
        }

        Ok(())
    }
}
