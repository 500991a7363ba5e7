// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Durable Store Implementations
//!
//! Infrastructure implementations of the `ServiceStore` contract from
//! the domain layer.
//!
//! # Available Implementations
//!
//! - **NullServiceStore** - memory-only deployments; every call is a
//!   successful no-op, so the registry accepts data loss on restart.
//! - **PostgresServiceStore** - one key/value row per instance, keyed
//!   by `<prefix><id>`, value = the full instance as JSONB.
//!
//! The backend is selected at startup from configuration; the catalog
//! depends only on the trait.

pub mod postgres;

use async_trait::async_trait;

use crate::domain::service::ServiceInstance;
use crate::domain::store::{ServiceStore, StoreError};

pub use postgres::PostgresServiceStore;

/// No-op store for memory-only deployments.
pub struct NullServiceStore;

#[async_trait]
impl ServiceStore for NullServiceStore {
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
        Ok(())
    }
}
