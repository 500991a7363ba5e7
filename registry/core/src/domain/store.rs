// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Durable Store Contract
//!
//! Persistence seam for the catalog, following the repository pattern:
//! the interface lives in the domain layer, implementations in
//! `crate::infrastructure::stores`.
//!
//! | Trait | Implementations |
//! |-------|----------------|
//! | `ServiceStore` | `NullServiceStore`, `PostgresServiceStore` |
//!
//! Every method is best-effort relative to the in-memory catalog: a
//! store outage degrades the registry to memory-only durability and is
//! reported through logs and metrics, never through the caller's
//! request.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::service::ServiceInstance;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Store query failed: {0}")]
    Query(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Backend selected at startup from configuration.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// Registrations live only in process memory; lost on restart.
    MemoryOnly,
    /// Registrations mirrored to PostgreSQL, keyed by `<prefix><id>`.
    Postgres {
        connection_string: String,
        key_prefix: String,
    },
}

/// Persistence contract for registered instances.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    /// Upsert one instance, keyed by its namespaced id. No expiry at
    /// this layer; staleness detection belongs to the catalog.
    async fn save(&self, instance: &ServiceInstance) -> Result<(), StoreError>;

    /// Fetch one instance by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<ServiceInstance>, StoreError>;

    /// Fetch every persisted instance in a single round trip.
    async fn list_all(&self) -> Result<Vec<ServiceInstance>, StoreError>;

    /// Remove the persisted record. Explicit deregistration is the only
    /// deletion path at this layer.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
