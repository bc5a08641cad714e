use serde::Deserialize;

/// Per-client request rate limiting
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Maximum requests per client per window
    #[serde(default = "default_requests")]
    pub requests: u32,
    /// Window duration (e.g. "1m", "15m", "1h")
    #[serde(default = "default_window")]
    pub window: String,
    /// Only paths under this prefix are limited
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    /// Message of the 429 failure
    #[serde(default = "default_message")]
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: default_requests(),
            window: default_window(),
            path_prefix: default_path_prefix(),
            message: default_message(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_requests() -> u32 {
    2000
}

fn default_window() -> String {
    "15m".to_owned()
}

fn default_path_prefix() -> String {
    "/api".to_owned()
}

fn default_message() -> String {
    "Too many requests from this IP, please try again in 15 minutes.".to_owned()
}
