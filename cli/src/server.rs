// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Registry wiring and lifecycle: store selection, catalog hydration,
//! background loops, the Prometheus exporter and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use beacon_registry_core::application::{
    Catalog, ExpiryReaper, HealthChecker, HealthCheckerConfig, ReaperConfig,
};
use beacon_registry_core::domain::store::{ServiceStore, StoreBackend};
use beacon_registry_core::domain::RegistryConfig;
use beacon_registry_core::infrastructure::stores::{NullServiceStore, PostgresServiceStore};
use beacon_registry_core::infrastructure::{metrics, Database, DiscoveryCache};
use beacon_registry_core::presentation::app;

pub async fn run(config: RegistryConfig) -> Result<()> {
    // Durable store selection. A reachable database is required when
    // one is configured; connecting is a startup concern, outages
    // afterwards only degrade durability.
    let store: Arc<dyn ServiceStore> = match config.store_backend() {
        StoreBackend::MemoryOnly => {
            info!("Durable store disabled, running memory-only");
            Arc::new(NullServiceStore)
        }
        StoreBackend::Postgres {
            connection_string,
            key_prefix,
        } => {
            let database = Database::connect(&connection_string)
                .await
                .context("Failed to connect to durable store")?;
            database
                .ensure_schema()
                .await
                .context("Failed to prepare durable store schema")?;
            info!(%key_prefix, "Durable store enabled");
            Arc::new(PostgresServiceStore::new(&database, key_prefix))
        }
    };

    if let Some(metrics_config) = &config.metrics {
        let addr: SocketAddr = format!("{}:{}", metrics_config.host, metrics_config.port)
            .parse()
            .context("Invalid metrics listener address")?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        metrics::describe();
        info!(%addr, "Prometheus exporter listening");
    }

    let catalog = Arc::new(Catalog::new(store.clone()));
    catalog.hydrate().await;

    let cache = Arc::new(DiscoveryCache::new(
        config.cache.capacity,
        config.cache.ttl,
    ));

    // Background loops, each with its own cancellation handle.
    let health_checker = Arc::new(HealthChecker::new(
        catalog.clone(),
        HealthCheckerConfig {
            interval: config.health.interval,
            timeout: config.health.timeout,
        },
    )?);
    let reaper = Arc::new(ExpiryReaper::new(
        catalog.clone(),
        store.clone(),
        ReaperConfig {
            service_ttl: config.eviction.service_ttl,
            interval: config.eviction.interval,
        },
    ));

    let tokens = vec![
        health_checker.shutdown_token(),
        reaper.shutdown_token(),
        cache.shutdown_token(),
    ];
    let handles = vec![
        health_checker.start(),
        reaper.start(),
        cache.clone().start_sweeper(config.cache.sweep_interval),
    ];

    let router = app(catalog.clone(), cache).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        "Registry listening on {} ({} services hydrated)",
        addr,
        catalog.len()
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Registry shutting down");
    for token in tokens {
        token.cancel();
    }
    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Background task did not stop cleanly: {}", e);
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
