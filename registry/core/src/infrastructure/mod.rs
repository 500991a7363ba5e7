// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod cache;
pub mod db;
pub mod metrics;
pub mod stores;

pub use cache::DiscoveryCache;
pub use db::Database;
pub use stores::{NullServiceStore, PostgresServiceStore};
