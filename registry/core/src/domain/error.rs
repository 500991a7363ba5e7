// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use thiserror::Error;

/// User-facing errors raised by catalog operations.
///
/// Background failures (probe errors, store outages) are never surfaced
/// through this type; they are absorbed into health transitions and
/// metrics because no caller is waiting on a background loop.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service not found: {0}")]
    NotFound(String),
}
