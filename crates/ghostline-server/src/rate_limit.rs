//! Per-origin sliding-window rate limiter
//!
//! Windows are aligned by flooring the current time to the window size, so
//! every handler instance derives the same window start without
//! coordination. The count lives in the backing store and is advanced by
//! an atomic conditional upsert; two requests racing on the same window
//! resolve to two single increments, never a lost or doubled one.

use crate::store::{RateDecision, SessionStore};
use ghostline_core::{Clock, Result};
use std::sync::Arc;

/// Action name gating session creation
pub const ACTION_CREATE_SESSION: &str = "create_session";

/// Rate limiter tuning
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Window size in milliseconds
    pub window_ms: u64,
    /// Maximum admitted actions per (origin, action, window)
    pub ceiling: u32,
    /// How long spent buckets are retained before the sweep prunes them
    pub retention_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60 * 60 * 1000, // 60 minutes
            ceiling: 10,
            retention_ms: 2 * 60 * 60 * 1000, // 2 hours
        }
    }
}

/// Sliding-window counter over the store's bucket table
pub struct RateLimiter {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a limiter over the given store and clock
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, config: RateLimitConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Admit or reject one action for the origin in the current window.
    ///
    /// The decision's count is for logging only; callers surfacing a
    /// rejection must respond with a generic rate-limit error and never
    /// disclose remaining capacity.
    pub async fn admit(&self, origin: &str, action: &str) -> Result<RateDecision> {
        let now = self.clock.now_ms();
        let window_start = now - (now % self.config.window_ms);
        self.store
            .increment_bucket(origin, action, window_start, self.config.ceiling)
            .await
    }

    /// Prune buckets older than the retention window, returning the number
    /// removed. Run from the scheduled sweep, never on the request path.
    pub async fn prune(&self) -> Result<u64> {
        let cutoff = self.clock.now_ms().saturating_sub(self.config.retention_ms);
        self.store.sweep_buckets(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use ghostline_core::ManualClock;

    fn limiter_with_clock(start_ms: u64) -> (RateLimiter, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_ms));
        let limiter = RateLimiter::new(store, clock.clone(), RateLimitConfig::default());
        (limiter, clock)
    }

    #[tokio::test]
    async fn eleventh_creation_in_a_window_is_rejected() {
        let (limiter, _clock) = limiter_with_clock(10_000);
        for _ in 0..10 {
            let decision = limiter.admit("origin-a", ACTION_CREATE_SESSION).await.unwrap();
            assert!(decision.allowed);
        }
        let decision = limiter.admit("origin-a", ACTION_CREATE_SESSION).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.count, 10);
    }

    #[tokio::test]
    async fn next_window_admits_regardless_of_prior_count() {
        let (limiter, clock) = limiter_with_clock(10_000);
        for _ in 0..11 {
            limiter.admit("origin-a", ACTION_CREATE_SESSION).await.unwrap();
        }
        clock.advance(RateLimitConfig::default().window_ms);
        let decision = limiter.admit("origin-a", ACTION_CREATE_SESSION).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.count, 1);
    }

    #[tokio::test]
    async fn origins_are_counted_independently() {
        let (limiter, _clock) = limiter_with_clock(10_000);
        for _ in 0..10 {
            limiter.admit("origin-a", ACTION_CREATE_SESSION).await.unwrap();
        }
        let decision = limiter.admit("origin-b", ACTION_CREATE_SESSION).await.unwrap();
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn callers_in_one_window_agree_on_its_start() {
        let (limiter, clock) = limiter_with_clock(0);
        limiter.admit("origin-a", ACTION_CREATE_SESSION).await.unwrap();
        // Later in the same window: same bucket, count continues
        clock.advance(RateLimitConfig::default().window_ms - 1);
        let decision = limiter.admit("origin-a", ACTION_CREATE_SESSION).await.unwrap();
        assert_eq!(decision.count, 2);
    }

    #[tokio::test]
    async fn prune_drops_buckets_past_retention() {
        let (limiter, clock) = limiter_with_clock(0);
        limiter.admit("origin-a", ACTION_CREATE_SESSION).await.unwrap();

        clock.advance(RateLimitConfig::default().retention_ms);
        assert_eq!(limiter.prune().await.unwrap(), 0);

        clock.advance(1);
        assert_eq!(limiter.prune().await.unwrap(), 1);
    }
}
