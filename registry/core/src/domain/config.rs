// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Registry Configuration Types
//
// Defines the YAML configuration schema for a Beacon registry node:
// - HTTP bind address for the registry API
// - Health-check cadence and per-probe timeout
// - Passive eviction TTL and reaper interval
// - Discovery cache sizing and entry TTL
// - Optional PostgreSQL durability settings
// - Optional Prometheus exporter listener

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::store::StoreBackend;

/// Top-level registry configuration, loaded from YAML with env-style
/// durations (`30s`, `5m`) via humantime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub eviction: EvictionConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Prometheus exporter listener; omit to disable the exporter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,

    /// Durable store settings; omit to run memory-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// How often the health checker probes every registered instance.
    #[serde(default = "default_health_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Per-probe timeout; N instances probed concurrently take roughly
    /// this long, not N times it.
    #[serde(default = "default_health_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvictionConfig {
    /// Silence window after which an instance is purged. Both
    /// re-registration and a passing probe reset the clock.
    #[serde(default = "default_service_ttl", with = "humantime_serde")]
    pub service_ttl: Duration,

    /// Reaper tick; eviction is lazy-periodic, never on read.
    #[serde(default = "default_eviction_interval", with = "humantime_serde")]
    pub interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// LRU slot count for discovery results.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// How long a cached discovery result stays valid.
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub ttl: Duration,

    /// Background sweep cadence for expired entries.
    #[serde(default = "default_cache_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// PostgreSQL connection string, e.g. `postgres://beacon@db/beacon`.
    pub connection_string: String,

    /// Namespace prepended to every persisted key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8500
}

fn default_metrics_port() -> u16 {
    9100
}

fn default_health_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_health_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_service_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_eviction_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_cache_capacity() -> usize {
    256
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(30)
}

fn default_cache_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: default_health_interval(),
            timeout: default_health_timeout(),
        }
    }
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            service_ttl: default_service_ttl(),
            interval: default_eviction_interval(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl: default_cache_ttl(),
            sweep_interval: default_cache_sweep_interval(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            health: HealthConfig::default(),
            eviction: EvictionConfig::default(),
            cache: CacheConfig::default(),
            metrics: None,
            store: None,
        }
    }
}

impl RegistryConfig {
    /// Load and parse a YAML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Reject configurations that would make a background loop spin or
    /// the cache unusable. Called before anything starts; failures here
    /// are fatal by design.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.health.interval.is_zero() {
            anyhow::bail!("health.interval must be greater than zero");
        }
        if self.health.timeout.is_zero() {
            anyhow::bail!("health.timeout must be greater than zero");
        }
        if self.eviction.service_ttl.is_zero() {
            anyhow::bail!("eviction.service_ttl must be greater than zero");
        }
        if self.eviction.interval.is_zero() {
            anyhow::bail!("eviction.interval must be greater than zero");
        }
        if self.cache.capacity == 0 {
            anyhow::bail!("cache.capacity must be greater than zero");
        }
        if self.cache.ttl.is_zero() {
            anyhow::bail!("cache.ttl must be greater than zero");
        }
        if let Some(store) = &self.store {
            if store.connection_string.trim().is_empty() {
                anyhow::bail!("store.connection_string must not be empty");
            }
            if store.key_prefix.trim().is_empty() {
                anyhow::bail!("store.key_prefix must not be empty");
            }
        }
        Ok(())
    }

    /// Backend selection for the durable store seam.
    pub fn store_backend(&self) -> StoreBackend {
        match &self.store {
            Some(store) => StoreBackend::Postgres {
                connection_string: store.connection_string.clone(),
                key_prefix: store.key_prefix.clone(),
            },
            None => StoreBackend::MemoryOnly,
        }
    }
}

fn default_key_prefix() -> String {
    "beacon/services/".to_string()
}
