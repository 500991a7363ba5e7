// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod config;
pub mod error;
pub mod service;
pub mod store;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use service::{HealthStatus, Registration, ServiceInstance};
pub use store::{ServiceStore, StoreBackend, StoreError};
