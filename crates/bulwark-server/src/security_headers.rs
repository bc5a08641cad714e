use axum::Router;
use bulwark_config::SecurityHeadersConfig;
use http::header::{HeaderName, X_CONTENT_TYPE_OPTIONS};
use http::HeaderValue;
use tower_http::set_header::SetResponseHeaderLayer;

const CROSS_ORIGIN_RESOURCE_POLICY: &str = "cross-origin-resource-policy";

/// Apply the configured security headers to every response
///
/// Headers a handler already set are left alone.
pub fn apply(router: Router, config: &SecurityHeadersConfig) -> anyhow::Result<Router> {
    let mut router = router;

    if let Some(ref policy) = config.cross_origin_resource_policy {
        let value = HeaderValue::from_str(policy)
            .map_err(|e| anyhow::anyhow!("invalid cross_origin_resource_policy '{policy}': {e}"))?;
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(CROSS_ORIGIN_RESOURCE_POLICY),
            value,
        ));
    }

    if config.nosniff {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));
    }

    Ok(router)
}
