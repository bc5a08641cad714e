use std::time::Duration;

use bulwark_config::RateLimitConfig;

use crate::{error::RateLimitError, memory::MemoryLimiter};

/// Per-client request limiter scoped to a path prefix
pub struct RequestLimiter {
    limiter: MemoryLimiter,
    path_prefix: String,
}

impl RequestLimiter {
    /// Create from configuration
    pub fn new(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        let window = parse_duration(&config.window)?;
        let limiter = MemoryLimiter::new(config.requests, window)?;

        tracing::debug!(
            requests = config.requests,
            window = %config.window,
            path_prefix = %config.path_prefix,
            "request rate limiter ready"
        );

        Ok(Self {
            limiter,
            path_prefix: config.path_prefix.clone(),
        })
    }

    /// Whether requests to `path` count against the limit
    ///
    /// Matches whole path segments, so `/api` covers `/api` and `/api/users`
    /// but not `/apiary`.
    pub fn applies_to(&self, path: &str) -> bool {
        let prefix = self.path_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return true;
        }

        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Count a request from `client` against the limit
    pub fn check(&self, client: &str) -> Result<(), RateLimitError> {
        self.limiter.check(client)
    }

    /// Drop state for clients that are back to a full budget
    pub fn prune(&self) {
        self.limiter.prune();
        tracing::trace!(tracked = self.limiter.tracked_keys(), "pruned rate limiter state");
    }
}

fn parse_duration(s: &str) -> Result<Duration, RateLimitError> {
    duration_str::parse(s).map_err(|e| RateLimitError::Config(format!("invalid duration '{s}': {e}")))
}
