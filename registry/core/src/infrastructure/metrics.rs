// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Metric names and recording helpers for the registry.
//!
//! Counters describe churn (registrations, evictions, probe outcomes,
//! store failures) and discovery traffic (requests, cache hits/misses);
//! gauges describe catalog size by health status. The exporter itself
//! is installed by the binary; everything here goes through the
//! `metrics` facade and is a no-op when no recorder is installed.

use std::collections::HashMap;

use metrics::{counter, describe_counter, describe_gauge, gauge};

use crate::domain::service::HealthStatus;

pub const REGISTRATIONS_TOTAL: &str = "beacon_registrations_total";
pub const DEREGISTRATIONS_TOTAL: &str = "beacon_deregistrations_total";
pub const EVICTIONS_TOTAL: &str = "beacon_evictions_total";
pub const DISCOVERY_REQUESTS_TOTAL: &str = "beacon_discovery_requests_total";
pub const CACHE_HITS_TOTAL: &str = "beacon_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "beacon_cache_misses_total";
pub const PROBES_TOTAL: &str = "beacon_health_probes_total";
pub const STORE_FAILURES_TOTAL: &str = "beacon_store_failures_total";
pub const CATALOG_SIZE: &str = "beacon_catalog_services";

/// Register help text for every metric. Called once at startup, after
/// the exporter is installed.
pub fn describe() {
    describe_counter!(REGISTRATIONS_TOTAL, "Service registrations, including heartbeats");
    describe_counter!(DEREGISTRATIONS_TOTAL, "Explicit service deregistrations");
    describe_counter!(EVICTIONS_TOTAL, "Instances removed by TTL eviction");
    describe_counter!(DISCOVERY_REQUESTS_TOTAL, "Discovery lookups served");
    describe_counter!(CACHE_HITS_TOTAL, "Discovery results served from cache");
    describe_counter!(CACHE_MISSES_TOTAL, "Discovery lookups that fell through to the catalog");
    describe_counter!(PROBES_TOTAL, "Health probes issued, labeled by resulting status");
    describe_counter!(STORE_FAILURES_TOTAL, "Durable store operations that failed, labeled by operation");
    describe_gauge!(CATALOG_SIZE, "Registered instances, labeled by health status");
}

pub fn record_registration() {
    counter!(REGISTRATIONS_TOTAL).increment(1);
}

pub fn record_deregistration() {
    counter!(DEREGISTRATIONS_TOTAL).increment(1);
}

pub fn record_evictions(count: usize) {
    counter!(EVICTIONS_TOTAL).increment(count as u64);
}

pub fn record_discovery() {
    counter!(DISCOVERY_REQUESTS_TOTAL).increment(1);
}

pub fn record_cache_hit() {
    counter!(CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_miss() {
    counter!(CACHE_MISSES_TOTAL).increment(1);
}

pub fn record_probe(status: HealthStatus) {
    counter!(PROBES_TOTAL, "status" => status.as_str()).increment(1);
}

pub fn record_store_failure(operation: &'static str) {
    counter!(STORE_FAILURES_TOTAL, "operation" => operation).increment(1);
}

/// Refresh the per-status catalog gauges. Statuses with no instances
/// are reset to zero so evictions show up.
pub fn set_catalog_gauges(counts: &HashMap<HealthStatus, usize>) {
    for status in [
        HealthStatus::Unknown,
        HealthStatus::Passing,
        HealthStatus::Warning,
        HealthStatus::Critical,
    ] {
        let count = counts.get(&status).copied().unwrap_or(0);
        gauge!(CATALOG_SIZE, "status" => status.as_str()).set(count as f64);
    }
}
