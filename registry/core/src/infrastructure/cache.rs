// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Discovery Cache
//!
//! Bounded read-through cache in front of discovery queries. Capacity
//! is enforced by LRU order; validity by a per-entry TTL independent of
//! that order. One mutex owned by this wrapper guards the container;
//! `lru::LruCache` has no internal synchronization, so there is exactly
//! one lock on this path.
//!
//! The cache holds copies, never the authoritative record: health and
//! eviction decisions are always made against the catalog. Registration
//! changes are visible here only after the entry's TTL lapses (bounded
//! staleness, the documented behavior).

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::time::interval;
use tracing::{debug, info};

use crate::domain::service::ServiceInstance;
use crate::infrastructure::metrics;

struct CacheEntry {
    data: Vec<ServiceInstance>,
    expires_at: Instant,
}

pub struct DiscoveryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    shutdown_token: tokio_util::sync::CancellationToken,
}

impl DiscoveryCache {
    /// Capacity must be non-zero; config validation enforces that
    /// before construction.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            shutdown_token: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// Look up a discovery result. An entry past its TTL counts as a
    /// miss and is removed on the spot (lazy expiry).
    pub fn get(&self, key: &str) -> Option<Vec<ServiceInstance>> {
        let mut entries = self.entries.lock().unwrap();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                metrics::record_cache_hit();
                return Some(entry.data.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
        }
        metrics::record_cache_miss();
        None
    }

    /// Insert a result with `expires_at = now + ttl`. At capacity the
    /// least-recently-used entry is dropped first; its next lookup is a
    /// legitimate miss, not an error.
    pub fn insert(&self, key: &str, data: Vec<ServiceInstance>) {
        let entry = CacheEntry {
            data,
            expires_at: Instant::now() + self.ttl,
        };
        let mut entries = self.entries.lock().unwrap();
        entries.put(key.to_string(), entry);
    }

    /// Explicit invalidation hook for one query key.
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.pop(key);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Drop every expired entry, bounding memory held by rows nobody
    /// has read since expiry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> tokio_util::sync::CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the periodic sweep task.
    pub fn start_sweeper(self: Arc<Self>, sweep_interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_seconds = sweep_interval.as_secs(),
                "Starting cache sweeper background task"
            );

            let mut tick = interval(sweep_interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let swept = self.sweep();
                        if swept > 0 {
                            debug!(swept, "Removed expired cache entries");
                        }
                    }
                    _ = self.shutdown_token.cancelled() => {
                        info!("Shutdown signal received, stopping cache sweeper");
                        break;
                    }
                }
            }

            info!("Cache sweeper background task stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::{HealthStatus, Registration, ServiceInstance};
    use chrono::Utc;
    use std::collections::HashMap;

    fn instance(id: &str, name: &str) -> ServiceInstance {
        ServiceInstance::from_registration(
            Registration {
                id: id.to_string(),
                name: name.to_string(),
                address: "127.0.0.1".to_string(),
                port: 9001,
                tags: vec![],
                meta: HashMap::new(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_set_then_get_within_ttl() {
        let cache = DiscoveryCache::new(8, Duration::from_secs(60));
        cache.insert("svc-a", vec![instance("a-1", "svc-a")]);

        let hit = cache.get("svc-a").unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].id, "a-1");
        assert_eq!(hit[0].health, HealthStatus::Unknown);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let cache = DiscoveryCache::new(8, Duration::from_millis(10));
        cache.insert("svc-a", vec![instance("a-1", "svc-a")]);
        std::thread::sleep(Duration::from_millis(20));

        assert!(cache.get("svc-a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = DiscoveryCache::new(2, Duration::from_secs(60));
        cache.insert("svc-a", vec![instance("a-1", "svc-a")]);
        cache.insert("svc-b", vec![instance("b-1", "svc-b")]);

        // Touch svc-a so svc-b becomes the LRU slot.
        assert!(cache.get("svc-a").is_some());
        cache.insert("svc-c", vec![instance("c-1", "svc-c")]);

        assert!(cache.get("svc-b").is_none());
        assert!(cache.get("svc-a").is_some());
        assert!(cache.get("svc-c").is_some());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = DiscoveryCache::new(8, Duration::from_secs(60));
        cache.insert("svc-a", vec![instance("a-1", "svc-a")]);
        cache.insert("svc-b", vec![instance("b-1", "svc-b")]);

        cache.invalidate("svc-a");
        assert!(cache.get("svc-a").is_none());
        assert!(cache.get("svc-b").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let cache = DiscoveryCache::new(8, Duration::from_millis(10));
        cache.insert("old", vec![instance("o-1", "old")]);
        std::thread::sleep(Duration::from_millis(20));

        // Re-insert a fresh entry after the old one expired.
        cache.insert("fresh", vec![instance("f-1", "fresh")]);

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("fresh").is_some());
    }

    #[tokio::test]
    async fn test_sweeper_shutdown() {
        let cache = Arc::new(DiscoveryCache::new(8, Duration::from_secs(60)));
        let token = cache.shutdown_token();

        let handle = cache.clone().start_sweeper(Duration::from_millis(50));
        token.cancel();
        handle.await.unwrap();
    }
}
