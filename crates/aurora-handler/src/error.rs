// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for aurora-handler.
//!
//! Every variant is logged in full at the invocation boundary and then
//! collapsed into the generic 500 response. None of these messages leave the
//! process.

use aurora_secrets::{PayloadError, SecretStoreError};
use thiserror::Error;

use crate::db::DbError;

/// Errors raised during one invocation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// The invocation environment lacks the secret identifier.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The secret store could not return the secret.
    #[error("Failed to retrieve secret {secret_id}: {source}")]
    Retrieval {
        secret_id: String,
        #[source]
        source: SecretStoreError,
    },

    /// The secret content is not a JSON object.
    #[error("Malformed secret: {0}")]
    MalformedSecret(String),

    /// A required credential field is absent.
    #[error("Secret is missing required field '{field}'")]
    MissingField { field: &'static str },

    /// A credential field is present but unusable.
    #[error("Secret field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// No database session could be established.
    #[error("Connection failed: {0}")]
    Connection(#[source] DbError),

    /// The statement failed or timed out.
    #[error("Query failed: {0}")]
    Query(#[source] DbError),
}

impl From<PayloadError> for HandlerError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::MissingField(field) => Self::MissingField { field },
            PayloadError::InvalidField { field, reason } => Self::InvalidField { field, reason },
            other => Self::MalformedSecret(other.to_string()),
        }
    }
}

/// Result type for handler operations.
pub type Result<T> = std::result::Result<T, HandlerError>;
