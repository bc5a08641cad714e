use serde::Deserialize;

/// Security response headers applied to every response
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityHeadersConfig {
    /// Value of `Cross-Origin-Resource-Policy`; `None` disables the header
    #[serde(default = "default_cross_origin_resource_policy")]
    pub cross_origin_resource_policy: Option<String>,
    /// Send `X-Content-Type-Options: nosniff`
    #[serde(default = "default_nosniff")]
    pub nosniff: bool,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            cross_origin_resource_policy: default_cross_origin_resource_policy(),
            nosniff: true,
        }
    }
}

#[allow(clippy::unnecessary_wraps)]
fn default_cross_origin_resource_policy() -> Option<String> {
    Some("cross-origin".to_owned())
}

const fn default_nosniff() -> bool {
    true
}
