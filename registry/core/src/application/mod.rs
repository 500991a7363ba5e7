// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod catalog;
pub mod health_checker;
pub mod reaper;

pub use catalog::Catalog;
pub use health_checker::{HealthChecker, HealthCheckerConfig};
pub use reaper::{ExpiryReaper, ReaperConfig};
