// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Secret store trait definitions.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from secret retrieval.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SecretStoreError {
    /// No secret exists under the identifier.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// The caller is not allowed to read the secret.
    #[error("access denied to secret: {0}")]
    AccessDenied(String),

    /// The secret exists but carries no content.
    #[error("secret has no content: {0}")]
    Empty(String),

    /// The store could not be reached or failed transiently.
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, SecretStoreError>;

/// Read access to serialized secrets.
///
/// Implementations must be safe to share across concurrent invocations and
/// must not hold per-invocation state.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Store type identifier (e.g., "memory", "file", "aws").
    fn store_type(&self) -> &'static str;

    /// Retrieve the serialized payload stored under `secret_id`.
    ///
    /// A secret with empty content is reported as [`SecretStoreError::Empty`],
    /// never as an empty string.
    async fn retrieve(&self, secret_id: &str) -> Result<String>;
}

/// Reject blank secret content.
pub(crate) fn non_empty(secret_id: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        Err(SecretStoreError::Empty(secret_id.to_string()))
    } else {
        Ok(value)
    }
}
