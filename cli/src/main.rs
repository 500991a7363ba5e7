// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Beacon Registry Daemon
//!
//! The `beacon` binary runs the service registry: instances of the
//! surrounding pipeline services register themselves over HTTP, are
//! actively health-probed, discoverable by logical name, and evicted
//! after sustained silence.
//!
//! Configuration comes from an optional YAML file plus flag/env
//! overrides for the bind address; a malformed config or an occupied
//! bind port is fatal; the process never partially starts.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use beacon_registry_core::domain::RegistryConfig;

mod server;

/// Beacon service registry - registration, discovery and health for a
/// fleet of pipeline services
#[derive(Parser)]
#[command(name = "beacon")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(
        short,
        long,
        env = "BEACON_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API host (overrides config)
    #[arg(long, env = "BEACON_HOST")]
    host: Option<String>,

    /// HTTP API port (overrides config)
    #[arg(long, env = "BEACON_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "BEACON_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let mut config = match &cli.config {
        Some(path) => RegistryConfig::load(path)?,
        None => RegistryConfig::default(),
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    config
        .validate()
        .context("Configuration validation failed")?;

    server::run(config).await
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
