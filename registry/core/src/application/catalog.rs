// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Service Catalog
//!
//! The single source of truth for registered instances while the
//! process is alive. A `RwLock<HashMap>` guards the map; critical
//! sections are short and never perform I/O; durable-store calls
//! happen after the lock is released and are best-effort.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::error::RegistryError;
use crate::domain::service::{HealthStatus, Registration, ServiceInstance};
use crate::domain::store::ServiceStore;
use crate::infrastructure::metrics;

pub struct Catalog {
    services: RwLock<HashMap<String, ServiceInstance>>,
    store: Arc<dyn ServiceStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn ServiceStore>) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Load persisted instances into the map at startup. A store outage
    /// degrades to an empty catalog; it never prevents the registry
    /// from starting.
    pub async fn hydrate(&self) {
        match self.store.list_all().await {
            Ok(instances) => {
                let count = instances.len();
                let mut services = self.services.write().unwrap();
                for instance in instances {
                    services.insert(instance.id.clone(), instance);
                }
                drop(services);
                if count > 0 {
                    info!(count, "Hydrated catalog from durable store");
                }
            }
            Err(e) => {
                metrics::record_store_failure("hydrate");
                warn!("Failed to hydrate catalog from durable store: {}", e);
            }
        }
    }

    /// Register or heartbeat an instance.
    ///
    /// A new `id` enters with `health = Unknown` and a fresh
    /// `registered_at`; a known `id` keeps both and only refreshes
    /// `last_seen` plus the mutable registration fields.
    pub async fn register(&self, registration: Registration) -> Result<(), RegistryError> {
        registration.validate()?;

        let now = Utc::now();
        let persisted = {
            let mut services = self.services.write().unwrap();
            let entry = match services.remove(&registration.id) {
                Some(existing) => ServiceInstance {
                    address: registration.address,
                    port: registration.port,
                    tags: registration.tags,
                    meta: registration.meta,
                    name: registration.name,
                    last_seen: now,
                    ..existing
                },
                None => ServiceInstance::from_registration(registration, now),
            };
            let persisted = entry.clone();
            services.insert(persisted.id.clone(), entry);
            persisted
        };

        metrics::record_registration();
        debug!(id = %persisted.id, name = %persisted.name, "Registered service instance");

        if let Err(e) = self.store.save(&persisted).await {
            metrics::record_store_failure("save");
            warn!(id = %persisted.id, "Failed to persist registration: {}", e);
        }

        Ok(())
    }

    /// Remove an instance. NotFound is not an operational failure; the
    /// caller simply referenced an id the catalog never held.
    pub async fn deregister(&self, id: &str) -> Result<(), RegistryError> {
        let removed = {
            let mut services = self.services.write().unwrap();
            services.remove(id)
        };

        match removed {
            Some(instance) => {
                metrics::record_deregistration();
                info!(id = %instance.id, name = %instance.name, "Deregistered service instance");

                if let Err(e) = self.store.delete(id).await {
                    metrics::record_store_failure("delete");
                    warn!(id, "Failed to delete persisted registration: {}", e);
                }
                Ok(())
            }
            None => Err(RegistryError::NotFound(id.to_string())),
        }
    }

    pub fn get(&self, id: &str) -> Result<ServiceInstance, RegistryError> {
        let services = self.services.read().unwrap();
        services
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Every instance sharing a logical name. All matches are returned,
    /// including non-passing ones, so callers can see entries whose
    /// first probe has not completed yet; health filtering is theirs.
    pub fn get_by_name(&self, name: &str) -> Vec<ServiceInstance> {
        let services = self.services.read().unwrap();
        services
            .values()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    /// Full snapshot, used by listing, probing and metrics.
    pub fn get_all(&self) -> Vec<ServiceInstance> {
        let services = self.services.read().unwrap();
        services.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().unwrap().is_empty()
    }

    /// Remove every entry silent for longer than `ttl`. Returns the
    /// evicted instances so the reaper can log them and clean up the
    /// durable store outside the lock.
    pub fn evict_expired(&self, ttl: Duration) -> Vec<ServiceInstance> {
        let now = Utc::now();
        let mut services = self.services.write().unwrap();
        let expired: Vec<String> = services
            .values()
            .filter(|s| s.is_expired(ttl, now))
            .map(|s| s.id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|id| services.remove(id))
            .collect()
    }

    /// Health-checker-only mutation path. A passing probe doubles as a
    /// heartbeat and refreshes `last_seen`.
    pub fn set_health(&self, id: &str, status: HealthStatus, refresh_last_seen: bool) {
        let mut services = self.services.write().unwrap();
        if let Some(instance) = services.get_mut(id) {
            instance.health = status;
            if refresh_last_seen {
                instance.last_seen = Utc::now();
            }
        }
    }

    /// Instance counts keyed by health status, for the catalog gauges.
    pub fn counts_by_health(&self) -> HashMap<HealthStatus, usize> {
        let services = self.services.read().unwrap();
        let mut counts = HashMap::new();
        for instance in services.values() {
            *counts.entry(instance.health).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::StoreError;
    use crate::infrastructure::stores::NullServiceStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory store with a failure toggle, for exercising the
    /// best-effort persistence paths.
    struct FlakyStore {
        records: Mutex<HashMap<String, ServiceInstance>>,
        offline: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
                offline: AtomicBool::new(false),
            }
        }

        fn seeded(instances: Vec<ServiceInstance>) -> Self {
            let store = Self::new();
            {
                let mut records = store.records.lock().unwrap();
                for instance in instances {
                    records.insert(instance.id.clone(), instance);
                }
            }
            store
        }

        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        fn contains(&self, id: &str) -> bool {
            self.records.lock().unwrap().contains_key(id)
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.offline.load(Ordering::SeqCst) {
                Err(StoreError::Connection("store offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ServiceStore for FlakyStore {
        async fn save(&self, instance: &ServiceInstance) -> Result<(), StoreError> {
            self.check()?;
            self.records
                .lock()
                .unwrap()
                .insert(instance.id.clone(), instance.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<ServiceInstance>, StoreError> {
            self.check()?;
            Ok(self.records.lock().unwrap().get(id).cloned())
        }

        async fn list_all(&self) -> Result<Vec<ServiceInstance>, StoreError> {
            self.check()?;
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }

        async fn delete(&self, id: &str) -> Result<(), StoreError> {
            self.check()?;
            self.records.lock().unwrap().remove(id);
            Ok(())
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(NullServiceStore))
    }

    fn registration(id: &str, name: &str, port: u16) -> Registration {
        Registration {
            id: id.to_string(),
            name: name.to_string(),
            address: "127.0.0.1".to_string(),
            port,
            tags: vec![],
            meta: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_empty_id_and_leaves_catalog_unchanged() {
        let catalog = catalog();
        let result = catalog.register(registration("", "worker", 9001)).await;
        assert!(matches!(result, Err(RegistryError::InvalidInput(_))));
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_register_then_get_sets_unknown_health() {
        let catalog = catalog();
        let before = Utc::now();
        catalog
            .register(registration("worker-1", "worker", 9001))
            .await
            .unwrap();

        let instance = catalog.get("worker-1").unwrap();
        assert_eq!(instance.health, HealthStatus::Unknown);
        assert!(instance.last_seen >= before);
        assert!(instance.registered_at >= before);
    }

    #[tokio::test]
    async fn test_reregistration_preserves_health_and_registered_at() {
        let catalog = catalog();
        catalog
            .register(registration("worker-1", "worker", 9001))
            .await
            .unwrap();
        catalog.set_health("worker-1", HealthStatus::Passing, false);

        let first = catalog.get("worker-1").unwrap();
        catalog
            .register(registration("worker-1", "worker", 9002))
            .await
            .unwrap();

        let second = catalog.get("worker-1").unwrap();
        assert_eq!(second.health, HealthStatus::Passing);
        assert_eq!(second.registered_at, first.registered_at);
        assert_eq!(second.port, 9002);
        assert!(second.last_seen >= first.last_seen);
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_deregister_unknown_id_is_not_found() {
        let catalog = catalog();
        catalog
            .register(registration("worker-1", "worker", 9001))
            .await
            .unwrap();

        let result = catalog.deregister("ghost").await;
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_get_by_name_returns_all_instances() {
        let catalog = catalog();
        for (id, port) in [("worker-1", 9001), ("worker-2", 9002), ("worker-3", 9003)] {
            catalog.register(registration(id, "worker", port)).await.unwrap();
        }
        catalog
            .register(registration("gateway-1", "gateway", 7000))
            .await
            .unwrap();

        let workers = catalog.get_by_name("worker");
        assert_eq!(workers.len(), 3);
        assert!(workers.iter().all(|s| s.name == "worker"));
        assert!(catalog.get_by_name("nothing").is_empty());
    }

    #[tokio::test]
    async fn test_evict_expired_removes_exactly_the_silent_entries() {
        let catalog = catalog();
        catalog
            .register(registration("stale", "worker", 9001))
            .await
            .unwrap();
        catalog
            .register(registration("fresh", "worker", 9002))
            .await
            .unwrap();

        {
            let mut services = catalog.services.write().unwrap();
            let stale = services.get_mut("stale").unwrap();
            stale.last_seen = Utc::now() - chrono::Duration::seconds(120);
        }

        let evicted = catalog.evict_expired(Duration::from_secs(60));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, "stale");
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("fresh").is_ok());
    }

    #[tokio::test]
    async fn test_set_health_can_refresh_last_seen() {
        let catalog = catalog();
        catalog
            .register(registration("worker-1", "worker", 9001))
            .await
            .unwrap();
        let before = catalog.get("worker-1").unwrap().last_seen;

        catalog.set_health("worker-1", HealthStatus::Critical, false);
        let critical = catalog.get("worker-1").unwrap();
        assert_eq!(critical.health, HealthStatus::Critical);
        assert_eq!(critical.last_seen, before);

        catalog.set_health("worker-1", HealthStatus::Passing, true);
        let passing = catalog.get("worker-1").unwrap();
        assert_eq!(passing.health, HealthStatus::Passing);
        assert!(passing.last_seen >= before);
    }

    #[tokio::test]
    async fn test_counts_by_health() {
        let catalog = catalog();
        catalog
            .register(registration("worker-1", "worker", 9001))
            .await
            .unwrap();
        catalog
            .register(registration("worker-2", "worker", 9002))
            .await
            .unwrap();
        catalog.set_health("worker-1", HealthStatus::Passing, false);

        let counts = catalog.counts_by_health();
        assert_eq!(counts.get(&HealthStatus::Passing), Some(&1));
        assert_eq!(counts.get(&HealthStatus::Unknown), Some(&1));
    }

    #[tokio::test]
    async fn test_hydrate_loads_persisted_instances() {
        let now = Utc::now();
        let mut passing =
            ServiceInstance::from_registration(registration("worker-1", "worker", 9001), now);
        passing.health = HealthStatus::Passing;
        let other =
            ServiceInstance::from_registration(registration("worker-2", "worker", 9002), now);

        let store = Arc::new(FlakyStore::seeded(vec![passing, other]));
        let catalog = Catalog::new(store);
        catalog.hydrate().await;

        assert_eq!(catalog.len(), 2);
        // Persisted health survives the restart as-is.
        assert_eq!(catalog.get("worker-1").unwrap().health, HealthStatus::Passing);
        assert_eq!(catalog.get("worker-2").unwrap().health, HealthStatus::Unknown);
    }

    #[tokio::test]
    async fn test_hydrate_with_unreachable_store_starts_empty() {
        let store = Arc::new(FlakyStore::new());
        store.set_offline(true);
        let catalog = Catalog::new(store);
        catalog.hydrate().await;

        assert!(catalog.is_empty());
        // The registry came up memory-only and keeps accepting writes.
        catalog
            .register(registration("worker-1", "worker", 9001))
            .await
            .unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_register_persists_and_tolerates_store_outage() {
        let store = Arc::new(FlakyStore::new());
        let catalog = Catalog::new(store.clone());

        catalog
            .register(registration("worker-1", "worker", 9001))
            .await
            .unwrap();
        assert!(store.contains("worker-1"));

        store.set_offline(true);
        catalog
            .register(registration("worker-2", "worker", 9002))
            .await
            .unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(!store.contains("worker-2"));
    }

    #[tokio::test]
    async fn test_deregister_succeeds_while_store_errors() {
        let store = Arc::new(FlakyStore::new());
        let catalog = Catalog::new(store.clone());
        catalog
            .register(registration("worker-1", "worker", 9001))
            .await
            .unwrap();

        store.set_offline(true);
        catalog.deregister("worker-1").await.unwrap();

        assert!(catalog.is_empty());
        // The persisted record stays orphaned until the store recovers.
        assert!(store.contains("worker-1"));
    }
}
