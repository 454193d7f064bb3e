//! Requests-per-minute throttle for completion calls

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;

/// Spaces model calls so a provider's per-minute cap is not exceeded.
pub struct ModelThrottle {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl ModelThrottle {
    pub fn new(requests_per_minute: NonZeroU32) -> Self {
        Self {
            limiter: RateLimiter::direct(Quota::per_minute(requests_per_minute)),
        }
    }

    /// Waits until one more request fits in the quota.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    #[cfg(test)]
    fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
