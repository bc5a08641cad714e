use std::str::FromStr;

use bulwark_config::{AnyOrArray, CorsConfig};
use http::header::HeaderName;
use http::{HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build a Tower CORS layer from configuration
///
/// Browsers reject wildcards on credentialed requests, so with
/// `credentials` enabled every wildcard is answered by mirroring the request.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mirror = config.credentials;

    let origins = match &config.origins {
        AnyOrArray::Any if mirror => AllowOrigin::mirror_request(),
        AnyOrArray::Any => AllowOrigin::any(),
        AnyOrArray::List(origins) => AllowOrigin::list(parse_entries::<HeaderValue>(origins)),
    };

    let methods = match &config.methods {
        AnyOrArray::Any if mirror => AllowMethods::mirror_request(),
        AnyOrArray::Any => AllowMethods::any(),
        AnyOrArray::List(methods) => AllowMethods::list(parse_entries::<Method>(methods)),
    };

    let headers = match &config.headers {
        AnyOrArray::Any if mirror => AllowHeaders::mirror_request(),
        AnyOrArray::Any => AllowHeaders::any(),
        AnyOrArray::List(headers) => AllowHeaders::list(parse_entries::<HeaderName>(headers)),
    };

    let layer = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(parse_entries::<HeaderName>(&config.expose_headers))
        .allow_credentials(config.credentials);

    match config.max_age_duration() {
        Some(max_age) => layer.max_age(max_age),
        None => layer,
    }
}

/// Entries that fail to parse are skipped with a warning
fn parse_entries<T: FromStr>(entries: &[String]) -> Vec<T> {
    entries
        .iter()
        .filter_map(|entry| {
            let parsed = entry.parse().ok();
            if parsed.is_none() {
                tracing::warn!(%entry, "ignoring invalid CORS entry");
            }
            parsed
        })
        .collect()
}
