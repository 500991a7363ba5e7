// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Expiry reaper - passive TTL eviction loop
//!
//! Removes entries nobody has touched (no re-registration, no passing
//! probe) within the configured service TTL. Eviction is lazy-periodic:
//! an expired entry stays physically present until the next tick, which
//! bounds staleness without putting eviction on the read path.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::application::catalog::Catalog;
use crate::domain::store::ServiceStore;
use crate::infrastructure::metrics;

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Silence window before an entry is purged.
    pub service_ttl: Duration,

    /// How often to run an eviction pass.
    pub interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            service_ttl: Duration::from_secs(300),
            interval: Duration::from_secs(60),
        }
    }
}

pub struct ExpiryReaper {
    catalog: Arc<Catalog>,
    store: Arc<dyn ServiceStore>,
    config: ReaperConfig,
    shutdown_token: tokio_util::sync::CancellationToken,
}

impl ExpiryReaper {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn ServiceStore>, config: ReaperConfig) -> Self {
        Self {
            catalog,
            store,
            config,
            shutdown_token: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> tokio_util::sync::CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(
            service_ttl_seconds = self.config.service_ttl.as_secs(),
            interval_seconds = self.config.interval.as_secs(),
            "Starting expiry reaper background task"
        );

        let mut tick = interval(self.config.interval);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let evicted = self.evict_cycle().await;
                    debug!(evicted, "Eviction pass completed");
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping expiry reaper");
                    break;
                }
            }
        }

        info!("Expiry reaper background task stopped");
    }

    /// One eviction pass. Returns how many entries were removed.
    pub async fn evict_cycle(&self) -> usize {
        let evicted = self.catalog.evict_expired(self.config.service_ttl);

        for instance in &evicted {
            info!(
                id = %instance.id,
                name = %instance.name,
                last_seen = %instance.last_seen,
                "Evicted expired service instance"
            );
            if let Err(e) = self.store.delete(&instance.id).await {
                metrics::record_store_failure("delete");
                warn!(id = %instance.id, "Failed to delete evicted registration: {}", e);
            }
        }

        if !evicted.is_empty() {
            metrics::record_evictions(evicted.len());
        }
        metrics::set_catalog_gauges(&self.catalog.counts_by_health());

        evicted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::{Registration, ServiceInstance};
    use crate::domain::store::StoreError;
    use crate::infrastructure::stores::NullServiceStore;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Store whose delete path is permanently down.
    struct OfflineDeleteStore;

    #[async_trait]
    impl ServiceStore for OfflineDeleteStore {
        async fn save(&self, _instance: &ServiceInstance) -> Result<(), StoreError> {
            Ok(())
        }

        async fn find_by_id(&self, _id: &str) -> Result<Option<ServiceInstance>, StoreError> {
            Ok(None)
        }

        async fn list_all(&self) -> Result<Vec<ServiceInstance>, StoreError> {
            Ok(Vec::new())
        }

        async fn delete(&self, _id: &str) -> Result<(), StoreError> {
            Err(StoreError::Connection("store offline".to_string()))
        }
    }

    async fn register(catalog: &Catalog, id: &str) {
        catalog
            .register(Registration {
                id: id.to_string(),
                name: "worker".to_string(),
                address: "127.0.0.1".to_string(),
                port: 9001,
                tags: vec![],
                meta: HashMap::new(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_evict_cycle_purges_only_silent_entries() {
        let store: Arc<dyn ServiceStore> = Arc::new(NullServiceStore);
        let catalog = Arc::new(Catalog::new(store.clone()));
        register(&catalog, "stale").await;
        register(&catalog, "fresh").await;

        // Mark one entry critical without touching its last_seen.
        catalog.set_health("stale", crate::domain::service::HealthStatus::Critical, false);
        let reaper = ExpiryReaper::new(
            catalog.clone(),
            store,
            ReaperConfig {
                service_ttl: Duration::from_secs(60),
                interval: Duration::from_secs(1),
            },
        );

        // Nothing is old enough yet; eviction is TTL-driven, not
        // health-driven.
        assert_eq!(reaper.evict_cycle().await, 0);
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_evict_cycle_completes_when_store_delete_fails() {
        let store: Arc<dyn ServiceStore> = Arc::new(OfflineDeleteStore);
        let catalog = Arc::new(Catalog::new(store.clone()));
        register(&catalog, "stale").await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        let reaper = ExpiryReaper::new(
            catalog.clone(),
            store,
            ReaperConfig {
                service_ttl: Duration::from_millis(10),
                interval: Duration::from_secs(60),
            },
        );

        // In-memory eviction proceeds even when the persisted record
        // cannot be cleaned up.
        assert_eq!(reaper.evict_cycle().await, 1);
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_loop() {
        let store: Arc<dyn ServiceStore> = Arc::new(NullServiceStore);
        let catalog = Arc::new(Catalog::new(store.clone()));
        let reaper = Arc::new(ExpiryReaper::new(catalog, store, ReaperConfig::default()));
        let token = reaper.shutdown_token();

        let handle = reaper.start();
        token.cancel();
        handle.await.unwrap();
    }
}
