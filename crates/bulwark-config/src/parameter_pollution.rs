use serde::Deserialize;

/// HTTP parameter pollution protection
///
/// Repeated query parameters collapse to their last value unless the name
/// is whitelisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterPollutionConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Parameter names allowed to repeat
    #[serde(default)]
    pub whitelist: Vec<String>,
}

impl Default for ParameterPollutionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            whitelist: Vec::new(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}
