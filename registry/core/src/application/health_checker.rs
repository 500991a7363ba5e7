// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Active health checker - background probe loop
//!
//! Periodically probes every registered instance's `/health` endpoint
//! and writes the resulting classification back into the catalog.
//! Probes run concurrently, so a full cycle is bounded by one probe
//! timeout rather than the fleet size.
//!
//! A failed probe never removes an entry: a flapping-but-reachable
//! service stays discoverable (marked Warning/Critical) while the
//! expiry reaper purges genuinely silent ones.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::application::catalog::Catalog;
use crate::domain::service::{HealthStatus, ServiceInstance};
use crate::infrastructure::metrics;

/// Configuration for the health checker loop.
#[derive(Debug, Clone)]
pub struct HealthCheckerConfig {
    /// How often to run a probe cycle.
    pub interval: Duration,

    /// Per-probe timeout; transport errors and timeouts classify as
    /// Critical.
    pub timeout: Duration,
}

impl Default for HealthCheckerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct HealthChecker {
    catalog: Arc<Catalog>,
    client: Client,
    config: HealthCheckerConfig,
    shutdown_token: tokio_util::sync::CancellationToken,
}

impl HealthChecker {
    pub fn new(catalog: Arc<Catalog>, config: HealthCheckerConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        // The per-request timeout on the client bounds every probe,
        // including connect time.
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create health probe client")?;

        Ok(Self {
            catalog,
            client,
            config,
            shutdown_token: tokio_util::sync::CancellationToken::new(),
        })
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> tokio_util::sync::CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the probe loop. Returns a handle joined on shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(
            interval_seconds = self.config.interval.as_secs(),
            timeout_seconds = self.config.timeout.as_secs(),
            "Starting health checker background task"
        );

        let mut tick = interval(self.config.interval);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let probed = self.probe_cycle().await;
                    debug!(probed, "Health check cycle completed");
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping health checker");
                    break;
                }
            }
        }

        info!("Health checker background task stopped");
    }

    /// Probe every instance in the current snapshot concurrently and
    /// write the classifications back. Returns how many instances were
    /// probed.
    pub async fn probe_cycle(&self) -> usize {
        let snapshot = self.catalog.get_all();
        if snapshot.is_empty() {
            return 0;
        }

        let mut handles = Vec::with_capacity(snapshot.len());
        for instance in snapshot {
            let client = self.client.clone();
            handles.push(tokio::spawn(async move {
                let status = probe_instance(&client, &instance).await;
                (instance.id, status)
            }));
        }

        let probed = handles.len();
        for result in futures::future::join_all(handles).await {
            match result {
                Ok((id, status)) => {
                    metrics::record_probe(status);
                    if status != HealthStatus::Passing {
                        warn!(id = %id, status = status.as_str(), "Health probe did not pass");
                    }
                    // A passing probe is equivalent to a heartbeat.
                    self.catalog
                        .set_health(&id, status, status == HealthStatus::Passing);
                }
                Err(e) => {
                    warn!("Health probe task panicked: {}", e);
                }
            }
        }

        probed
    }
}

/// Classify one instance: transport error or timeout is Critical, a
/// non-200 response is Warning, a 200 is Passing.
async fn probe_instance(client: &Client, instance: &ServiceInstance) -> HealthStatus {
    match client.get(instance.health_endpoint()).send().await {
        Ok(response) if response.status() == reqwest::StatusCode::OK => HealthStatus::Passing,
        Ok(response) => {
            debug!(
                id = %instance.id,
                status = response.status().as_u16(),
                "Health endpoint returned non-200"
            );
            HealthStatus::Warning
        }
        Err(e) => {
            debug!(id = %instance.id, "Health probe failed: {}", e);
            HealthStatus::Critical
        }
    }
}
