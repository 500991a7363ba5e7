// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Service Store
//!
//! Production `ServiceStore` backed by the `registry_services` table.
//! Each instance is one key/value row: key = `<prefix><id>`, value =
//! the full `ServiceInstance` serialized as JSONB, no expiry. Staleness
//! is the catalog's concern, re-derived from `last_seen` after
//! hydration.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::warn;

use crate::domain::service::ServiceInstance;
use crate::domain::store::{ServiceStore, StoreError};
use crate::infrastructure::db::Database;

pub struct PostgresServiceStore {
    pool: PgPool,
    key_prefix: String,
}

impl PostgresServiceStore {
    pub fn new(database: &Database, key_prefix: impl Into<String>) -> Self {
        Self {
            pool: database.get_pool().clone(),
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    fn decode(row_value: serde_json::Value) -> Result<ServiceInstance, StoreError> {
        serde_json::from_value(row_value).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl ServiceStore for PostgresServiceStore {
    async fn save(&self, instance: &ServiceInstance) -> Result<(), StoreError> {
        let value = serde_json::to_value(instance)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO registry_services (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(self.key_for(&instance.id))
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ServiceInstance>, StoreError> {
        let row = sqlx::query("SELECT value FROM registry_services WHERE key = $1")
            .bind(self.key_for(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let value: serde_json::Value = row.get("value");
                Ok(Some(Self::decode(value)?))
            }
            None => Ok(None),
        }
    }

    /// One prefix scan covers the whole fleet; no per-key round trips.
    async fn list_all(&self) -> Result<Vec<ServiceInstance>, StoreError> {
        let pattern = format!("{}%", like_escape(&self.key_prefix));
        let rows = sqlx::query("SELECT key, value FROM registry_services WHERE key LIKE $1")
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut instances = Vec::with_capacity(rows.len());
        for row in rows {
            let value: serde_json::Value = row.get("value");
            match Self::decode(value) {
                Ok(instance) => instances.push(instance),
                Err(e) => {
                    // One corrupt row must not block hydration of the rest.
                    let key: String = row.get("key");
                    warn!(%key, "Skipping undecodable persisted registration: {}", e);
                }
            }
        }
        Ok(instances)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM registry_services WHERE key = $1")
            .bind(self.key_for(id))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }
}

/// Escape LIKE metacharacters in the key prefix so a literal `%` or `_`
/// in a configured namespace cannot widen the scan.
fn like_escape(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
