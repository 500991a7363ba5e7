// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Beacon Registry Core
//!
//! Catalog, health checking, passive eviction, discovery caching and
//! the HTTP presentation layer for the Beacon service registry.
//!
//! # Architecture
//!
//! - **domain**: instance/health types, config schema, store contract
//! - **application**: the catalog and both background loops
//! - **infrastructure**: cache, connection pool, store backends, metrics
//! - **presentation**: axum router and handlers

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
