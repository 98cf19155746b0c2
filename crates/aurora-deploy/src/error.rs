// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for aurora-deploy.
//!
//! Planning errors reach the deployer unmodified; there is no end-user
//! boundary at provisioning time.

use thiserror::Error;

use crate::graph::{AttrRef, LogicalId};
use crate::provider::ProviderError;

/// Errors raised while validating or realizing a stack definition.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanError {
    /// Two resources share a logical id.
    #[error("Duplicate resource: {0}")]
    DuplicateResource(LogicalId),

    /// A resource depends on one not declared before it.
    #[error("Resource {resource} depends on {missing}, which is not declared before it")]
    OutOfOrder {
        resource: LogicalId,
        missing: LogicalId,
    },

    /// The provider did not expose an attribute a later resource needs.
    #[error("Resource {resource} needs {reference}, which was not resolved")]
    UnresolvedAttribute {
        resource: LogicalId,
        reference: AttrRef,
    },

    /// The definition is structurally invalid.
    #[error("Invalid stack definition: {0}")]
    InvalidDefinition(String),

    /// The provider failed to realize a resource. Later resources were not
    /// attempted.
    #[error("Failed to realize {resource}: {source}")]
    Realization {
        resource: LogicalId,
        #[source]
        source: ProviderError,
    },
}

/// Top-level errors of the deploy binary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type using the deploy Error.
pub type Result<T> = std::result::Result<T, Error>;
