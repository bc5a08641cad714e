use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use bulwark_core::AppError;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use http_body_util::LengthLimitError;
use serde_json::Value;

use crate::failure::ApiError;
use crate::query;

/// Strip operator-like keys from the query string and JSON bodies
///
/// Keys beginning with `$` or containing `.` never reach handlers, so they
/// cannot be smuggled into document-store queries. Bodies over
/// `body_limit` fail with 413 before anything else reads them.
pub async fn sanitize_middleware(body_limit: usize, request: Request, next: Next) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    if let Some(raw) = parts.uri.query() {
        let pairs = query::parse(raw);
        let kept = pairs
            .iter()
            .filter(|(name, _)| !is_prohibited_parameter(name))
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect::<Vec<_>>();

        if kept.len() != pairs.len() {
            tracing::debug!(removed = pairs.len() - kept.len(), "removed prohibited query parameters");
            if let Some(uri) = query::with_query(&parts.uri, &query::serialize(kept)) {
                parts.uri = uri;
            }
        }
    }

    if !is_json(&parts.headers) {
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    let bytes = axum::body::to_bytes(body, body_limit).await.map_err(|e| {
        if e.into_inner().is::<LengthLimitError>() {
            AppError::new("request entity too large", 413)
        } else {
            AppError::new("failed to read request body", 400)
        }
    })?;

    let bytes = match serde_json::from_slice::<Value>(&bytes) {
        Ok(mut value) => {
            if strip_prohibited_keys(&mut value) {
                tracing::debug!("removed prohibited keys from request body");
                let sanitized = Bytes::from(serde_json::to_vec(&value).map_err(anyhow::Error::from)?);
                parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(sanitized.len()));
                sanitized
            } else {
                bytes
            }
        }
        // Malformed bodies are left for the JSON extractor to reject
        Err(_) => bytes,
    };

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Object keys document stores would read as operators or nested paths
pub fn is_prohibited_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

/// Query names are checked per bracket segment, so `filter[$gt]` is caught
fn is_prohibited_parameter(name: &str) -> bool {
    name.split(['[', ']'])
        .filter(|segment| !segment.is_empty())
        .any(is_prohibited_key)
}

/// Remove prohibited keys at every depth, reporting whether any were found
pub fn strip_prohibited_keys(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            let before = map.len();
            map.retain(|key, _| !is_prohibited_key(key));
            let mut changed = map.len() != before;
            for nested in map.values_mut() {
                changed |= strip_prohibited_keys(nested);
            }
            changed
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |changed, item| strip_prohibited_keys(item) | changed),
        _ => false,
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().to_ascii_lowercase())
        .is_some_and(|mime| mime == "application/json" || mime.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::routing::post;
    use bulwark_core::{Environment, ErrorPipeline};
    use http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::pipeline::error_pipeline_middleware;

    #[test]
    fn strips_nested_operator_keys() {
        let mut value = json!({
            "email": {"$gt": ""},
            "profile.admin": true,
            "tags": [{"$where": "1"}, {"name": "ok"}],
            "name": "alice"
        });

        assert!(strip_prohibited_keys(&mut value));
        assert_eq!(value, json!({"email": {}, "tags": [{}, {"name": "ok"}], "name": "alice"}));
    }

    #[test]
    fn clean_values_are_untouched() {
        let mut value = json!({"name": "alice", "age": 30, "emails": ["a@b.com"]});
        assert!(!strip_prohibited_keys(&mut value));
    }

    #[test]
    fn bracketed_query_names_are_checked() {
        assert!(is_prohibited_parameter("$where"));
        assert!(is_prohibited_parameter("age[$gt]"));
        assert!(is_prohibited_parameter("profile.admin"));
        assert!(!is_prohibited_parameter("tags[]"));
        assert!(!is_prohibited_parameter("sort"));
    }

    #[test]
    fn json_detection_ignores_parameters() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(is_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/merge-patch+json"));
        assert!(is_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }

    fn echo_app(limit: usize) -> Router {
        Router::new()
            .route(
                "/echo",
                post(|request: Request| async move {
                    let query = request.uri().query().unwrap_or_default().to_owned();
                    let body = request.into_body().collect().await.unwrap().to_bytes();
                    format!("{query}|{}", String::from_utf8_lossy(&body))
                }),
            )
            .layer(axum::middleware::from_fn(move |req, next| sanitize_middleware(limit, req, next)))
            .layer(axum::middleware::from_fn(move |req, next| {
                error_pipeline_middleware(ErrorPipeline::new(Environment::Production), req, next)
            }))
    }

    async fn send(router: Router, uri: &str, body: &'static str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn sanitizes_query_and_body() {
        let (status, text) = send(
            echo_app(1024),
            "/echo?name=alice&age%5B%24gt%5D=1",
            r#"{"user":{"$ne":null},"ok":1}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, r#"name=alice|{"user":{},"ok":1}"#);
    }

    #[tokio::test]
    async fn clean_json_is_forwarded_byte_for_byte() {
        let (status, text) = send(echo_app(1024), "/echo", r#"{ "name": "alice" }"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, r#"|{ "name": "alice" }"#);
    }

    #[tokio::test]
    async fn malformed_json_passes_through() {
        let (status, text) = send(echo_app(1024), "/echo", "{not json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "|{not json");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (status, text) = send(echo_app(8), "/echo", r#"{"name":"far too long"}"#).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let body: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body, json!({"status": "FAIL", "message": "request entity too large"}));
    }
}
