//! Per-identifier failed-login counter and temporary lockout.
//!
//! Keyed by the identifier exactly as submitted, since it may not resolve to
//! any account. Every operation is infallible: whatever the cache cannot
//! answer is read as zero attempts and unlocked.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::EphemeralCache;
use crate::config::AuthThrottleConfig;

const ATTEMPTS_PREFIX: &str = "login_attempts:";
const LOCKED_PREFIX: &str = "login_locked:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    Clear,
    Accumulating(u64),
    Locked { retry_after: Duration },
}

#[derive(Clone)]
pub struct LockoutGovernor {
    cache: Arc<dyn EphemeralCache>,
    max_attempts: u64,
    attempt_window: Duration,
    lockout_duration: Duration,
}

impl LockoutGovernor {
    pub fn new(cache: Arc<dyn EphemeralCache>, config: &AuthThrottleConfig) -> Self {
        Self {
            cache,
            max_attempts: u64::from(config.max_attempts.max(1)),
            attempt_window: Duration::from_secs(config.attempt_window_seconds),
            lockout_duration: Duration::from_secs(config.lockout_seconds),
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u64 {
        self.max_attempts
    }

    #[must_use]
    pub const fn lockout_duration(&self) -> Duration {
        self.lockout_duration
    }

    /// Whether a failure count should trigger [`Self::lock`].
    #[must_use]
    pub const fn threshold_reached(&self, count: u64) -> bool {
        count >= self.max_attempts
    }

    /// Bumps the attempt counter, refreshing its window, and returns the new count.
    pub async fn record_failure(&self, identifier: &str) -> u64 {
        self.cache
            .increment(&attempts_key(identifier), self.attempt_window)
            .await
    }

    pub async fn is_locked(&self, identifier: &str) -> bool {
        self.retry_after(identifier).await.is_some()
    }

    /// Time left on the lockout, if one is in force.
    pub async fn retry_after(&self, identifier: &str) -> Option<Duration> {
        self.cache.flag_ttl(&locked_key(identifier)).await
    }

    pub async fn lock(&self, identifier: &str) {
        self.cache
            .set_flag(&locked_key(identifier), self.lockout_duration)
            .await;
    }

    /// Drops both the counter and the lockout. Called after a successful login.
    pub async fn clear(&self, identifier: &str) {
        self.cache.remove(&attempts_key(identifier)).await;
        self.cache.remove(&locked_key(identifier)).await;
    }

    pub async fn state(&self, identifier: &str) -> LockoutState {
        if let Some(retry_after) = self.retry_after(identifier).await {
            return LockoutState::Locked { retry_after };
        }

        match self.cache.counter(&attempts_key(identifier)).await {
            0 => LockoutState::Clear,
            n => LockoutState::Accumulating(n),
        }
    }
}

fn attempts_key(identifier: &str) -> String {
    format!("{ATTEMPTS_PREFIX}{identifier}")
}

fn locked_key(identifier: &str) -> String {
    format!("{LOCKED_PREFIX}{identifier}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn governor(max_attempts: u32, lockout_seconds: u64) -> LockoutGovernor {
        let config = AuthThrottleConfig {
            max_attempts,
            attempt_window_seconds: 3600,
            lockout_seconds,
        };
        LockoutGovernor::new(Arc::new(MemoryCache::new()), &config)
    }

    #[tokio::test]
    async fn counts_up_to_threshold() {
        let governor = governor(10, 60);
        assert_eq!(governor.state("1000").await, LockoutState::Clear);

        let mut last = 0;
        for _ in 0..10 {
            last = governor.record_failure("1000").await;
        }

        assert_eq!(last, 10);
        assert!(governor.threshold_reached(last));
        assert!(!governor.threshold_reached(9));
        assert_eq!(governor.state("1000").await, LockoutState::Accumulating(10));
        assert!(!governor.is_locked("1000").await);
    }

    #[tokio::test]
    async fn lock_and_clear() {
        let governor = governor(3, 60);
        for _ in 0..3 {
            governor.record_failure("1000").await;
        }
        governor.lock("1000").await;

        assert!(governor.is_locked("1000").await);
        assert!(matches!(
            governor.state("1000").await,
            LockoutState::Locked { .. }
        ));

        governor.clear("1000").await;
        assert!(!governor.is_locked("1000").await);
        assert_eq!(governor.state("1000").await, LockoutState::Clear);
    }

    #[tokio::test]
    async fn identifiers_are_independent() {
        let governor = governor(3, 60);
        governor.record_failure("1000").await;
        governor.lock("1000").await;

        assert!(!governor.is_locked("1001").await);
        assert_eq!(governor.state("1001").await, LockoutState::Clear);
    }

    #[tokio::test(start_paused = true)]
    async fn lockout_expires() {
        let governor = governor(1, 60);
        governor.lock("1000").await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(governor.is_locked("1000").await);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!governor.is_locked("1000").await);
    }
}
