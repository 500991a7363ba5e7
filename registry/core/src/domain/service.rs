// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::error::RegistryError;

/// Health classification of a registered instance.
///
/// `Unknown` is only ever observed between first registration and the
/// first completed probe; after that the health checker owns all
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Unknown,
    Passing,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Passing => "passing",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }
}

/// One registered process of a logical service.
///
/// The `id` is caller-supplied and globally unique; `name` is the
/// discovery unit shared by all instances of the same logical service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,

    /// Free-form capability flags; relevant for filtering, not uniqueness.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Opaque key/value annotations (e.g. version).
    #[serde(default)]
    pub meta: HashMap<String, String>,

    pub health: HealthStatus,
    pub registered_at: DateTime<Utc>,

    /// Refreshed on every registration and every passing probe.
    pub last_seen: DateTime<Utc>,
}

/// Registration payload accepted on the wire. Health and timestamps are
/// never caller-controlled; the catalog assigns them. Every field
/// defaults so that a missing `id`/`name` surfaces as a validation
/// error (HTTP 400), not a deserialization one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub meta: HashMap<String, String>,
}

impl Registration {
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.id.trim().is_empty() {
            return Err(RegistryError::InvalidInput(
                "service id must not be empty".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidInput(
                "service name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl ServiceInstance {
    /// Build a brand-new catalog entry from a wire registration.
    pub fn from_registration(reg: Registration, now: DateTime<Utc>) -> Self {
        Self {
            id: reg.id,
            name: reg.name,
            address: reg.address,
            port: reg.port,
            tags: reg.tags,
            meta: reg.meta,
            health: HealthStatus::Unknown,
            registered_at: now,
            last_seen: now,
        }
    }

    /// URL probed by the health checker.
    pub fn health_endpoint(&self) -> String {
        format!("http://{}:{}/health", self.address, self.port)
    }

    /// Whether the entry has gone silent for longer than `ttl`.
    pub fn is_expired(&self, ttl: std::time::Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.last_seen > ttl,
            Err(_) => false,
        }
    }
}
