use serde::Deserialize;

/// Query-injection sanitization of JSON bodies and query strings
///
/// Strips object keys that begin with `$` or contain `.`, which document
/// stores would otherwise interpret as operators or nested paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SanitizeConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

const fn default_enabled() -> bool {
    true
}
