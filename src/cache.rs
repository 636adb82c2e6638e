//! Ephemeral key-value store backing the login throttle.
//!
//! Nothing stored here is durable. Losing an entry only resets a counter or
//! lifts a lockout early.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Operations the lockout governor needs from a cache backend. Backends absorb
/// their own failures: a miss is reported as absence, never as an error.
#[async_trait]
pub trait EphemeralCache: Send + Sync {
    /// Increments the counter at `key` (starting from 0 when absent or
    /// expired), resets its TTL and returns the new value.
    async fn increment(&self, key: &str, ttl: Duration) -> u64;

    async fn counter(&self, key: &str) -> u64;

    async fn set_flag(&self, key: &str, ttl: Duration);

    /// Remaining lifetime of the flag, `None` when unset or expired.
    async fn flag_ttl(&self, key: &str) -> Option<Duration>;

    async fn remove(&self, key: &str);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: u64,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: u64, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process cache with per-entry TTL. The increment is a read-modify-write
/// under one write lock, so it is atomic within this process.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    storage: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops expired entries.
    pub async fn cleanup_expired(&self) -> usize {
        let mut storage = self.storage.write().await;
        let before = storage.len();
        let now = Instant::now();
        storage.retain(|_, entry| !entry.is_expired(now));
        before - storage.len()
    }

    pub async fn size(&self) -> usize {
        self.storage.read().await.len()
    }
}

#[async_trait]
impl EphemeralCache for MemoryCache {
    async fn increment(&self, key: &str, ttl: Duration) -> u64 {
        let mut storage = self.storage.write().await;
        let now = Instant::now();

        let current = storage
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map_or(0, |entry| entry.value);
        let next = current.saturating_add(1);

        storage.insert(key.to_string(), CacheEntry::new(next, ttl));
        next
    }

    async fn counter(&self, key: &str) -> u64 {
        let storage = self.storage.read().await;
        storage
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map_or(0, |entry| entry.value)
    }

    async fn set_flag(&self, key: &str, ttl: Duration) {
        let mut storage = self.storage.write().await;
        storage.insert(key.to_string(), CacheEntry::new(1, ttl));
    }

    async fn flag_ttl(&self, key: &str) -> Option<Duration> {
        let mut storage = self.storage.write().await;
        let now = Instant::now();

        match storage.get(key) {
            Some(entry) if entry.is_expired(now) => {
                storage.remove(key);
                None
            }
            Some(entry) => Some(entry.expires_at - now),
            None => None,
        }
    }

    async fn remove(&self, key: &str) {
        self.storage.write().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn increment_starts_at_one() {
        let cache = MemoryCache::new();
        assert_eq!(cache.counter("k").await, 0);
        assert_eq!(cache.increment("k", Duration::from_secs(60)).await, 1);
        assert_eq!(cache.increment("k", Duration::from_secs(60)).await, 2);
        assert_eq!(cache.counter("k").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_counter_restarts() {
        let cache = MemoryCache::new();
        cache.increment("k", Duration::from_secs(5)).await;
        cache.increment("k", Duration::from_secs(5)).await;

        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.counter("k").await, 0);
        assert_eq!(cache.increment("k", Duration::from_secs(5)).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flag_reports_remaining_ttl() {
        let cache = MemoryCache::new();
        assert!(cache.flag_ttl("lock").await.is_none());

        cache.set_flag("lock", Duration::from_secs(60)).await;
        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(cache.flag_ttl("lock").await, Some(Duration::from_secs(40)));

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(cache.flag_ttl("lock").await.is_none());
        assert_eq!(cache.size().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_drops_only_expired() {
        let cache = MemoryCache::new();
        cache.set_flag("short", Duration::from_secs(1)).await;
        cache.set_flag("long", Duration::from_secs(100)).await;

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.cleanup_expired().await, 1);
        assert!(cache.flag_ttl("long").await.is_some());
    }
}
