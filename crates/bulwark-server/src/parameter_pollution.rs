use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use indexmap::IndexMap;

use crate::query;

/// Values dropped from repeated query parameters, by parameter name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollutedParameters(pub IndexMap<String, Vec<String>>);

/// Collapse repeated query parameters to their last value
///
/// Whitelisted names may repeat. Dropped values are attached to the request
/// as [`PollutedParameters`] when there are any.
pub async fn parameter_pollution_middleware(whitelist: Arc<[String]>, mut request: Request, next: Next) -> Response {
    if let Some(raw) = request.uri().query() {
        let (collapsed, polluted) = collapse(raw, &whitelist);

        if !polluted.0.is_empty() {
            tracing::debug!(parameters = ?polluted.0.keys().collect::<Vec<_>>(), "collapsed repeated query parameters");

            if let Some(uri) = query::with_query(request.uri(), &collapsed) {
                *request.uri_mut() = uri;
            }
            request.extensions_mut().insert(polluted);
        }
    }

    next.run(request).await
}

/// Collapse `raw`, returning the new query and the values that were dropped
pub fn collapse(raw: &str, whitelist: &[String]) -> (String, PollutedParameters) {
    let mut kept: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut polluted = PollutedParameters::default();

    for (name, value) in query::parse(raw) {
        let allowed = whitelist.iter().any(|entry| *entry == name);
        let values = kept.entry(name.clone()).or_default();

        if !allowed && let Some(previous) = values.pop() {
            polluted.0.entry(name).or_default().push(previous);
        }
        values.push(value);
    }

    let collapsed = query::serialize(
        kept.iter()
            .flat_map(|(name, values)| values.iter().map(move |value| (name.as_str(), value.as_str()))),
    );

    (collapsed, polluted)
}
