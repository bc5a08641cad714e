use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bulwark_core::{AppError, Failure};
use bulwark_ratelimit::{RateLimitError, RequestLimiter};
use http::HeaderValue;
use http::header::RETRY_AFTER;

use crate::failure::ApiError;

/// Shared limiter plus the message of the failure raised when it trips
pub struct RateLimitState {
    pub limiter: RequestLimiter,
    pub message: String,
}

/// Rate limiting middleware using an Arc-wrapped limiter
pub async fn rate_limit_middleware_arc(state: Arc<RateLimitState>, request: Request, next: Next) -> Response {
    if !state.limiter.applies_to(request.uri().path()) {
        return next.run(request).await;
    }

    let client = extract_client_ip(&request);
    if let Err(e) = state.limiter.check(&client) {
        tracing::debug!(%client, "rate limit exceeded");
        return rate_limit_response(&e, &state.message);
    }

    next.run(request).await
}

/// Client address: `X-Forwarded-For`, then `X-Real-IP`, then the peer address
pub fn extract_client_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
        && !first.trim().is_empty()
    {
        return first.trim().to_string();
    }

    if let Some(real_ip) = request.headers().get("x-real-ip")
        && let Ok(val) = real_ip.to_str()
        && !val.trim().is_empty()
    {
        return val.trim().to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_owned(), |ConnectInfo(addr)| addr.ip().to_string())
}

fn rate_limit_response(error: &RateLimitError, message: &str) -> Response {
    match error {
        RateLimitError::Exceeded { retry_after } => {
            let mut response = ApiError::from(AppError::new(message, 429)).into_response();
            response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(*retry_after));
            response
        }
        RateLimitError::Config(_) => ApiError::from(Failure::from_error(error)).into_response(),
    }
}
