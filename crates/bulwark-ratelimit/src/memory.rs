use std::{num::NonZeroU32, sync::Arc, time::Duration};

use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};

use crate::error::RateLimitError;

type KeyedLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// In-memory keyed rate limiter backed by governor
///
/// A client may burst up to `max_requests`; capacity replenishes evenly
/// across the window.
#[derive(Clone)]
pub struct MemoryLimiter {
    limiter: Arc<KeyedLimiter>,
}

impl MemoryLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, RateLimitError> {
        let burst =
            NonZeroU32::new(max_requests).ok_or_else(|| RateLimitError::Config("requests must be > 0".to_owned()))?;

        let replenish_interval = window
            .checked_div(max_requests)
            .filter(|interval| !interval.is_zero())
            .ok_or_else(|| RateLimitError::Config("rate limit window is too short for the request budget".to_owned()))?;

        let quota = Quota::with_period(replenish_interval)
            .ok_or_else(|| RateLimitError::Config("invalid rate limit period".to_owned()))?
            .allow_burst(burst);

        Ok(Self {
            limiter: Arc::new(RateLimiter::dashmap(quota)),
        })
    }

    /// Check if a request is allowed for the given key
    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        self.limiter.check_key(&key.to_owned()).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            RateLimitError::Exceeded {
                retry_after: wait.as_secs().max(1),
            }
        })
    }

    /// Forget keys whose state has fully replenished
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}
