#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod memory;
mod request;

pub use error::RateLimitError;
pub use request::RequestLimiter;

use bulwark_config::RateLimitConfig;

/// Create a request limiter from configuration
pub fn create_request_limiter(config: &RateLimitConfig) -> Result<RequestLimiter, RateLimitError> {
    RequestLimiter::new(config)
}
