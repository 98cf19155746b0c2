// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! File-backed secret store for local runs.
//!
//! The file is a JSON object mapping secret identifiers to payloads. A payload
//! may be a JSON object (serialized on read) or an already-serialized string.
//! The file is re-read on every retrieval so edits take effect immediately.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::traits::*;

/// Secret store reading a JSON file of `id -> payload`.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Create a store reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SecretStoreError::Unavailable(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(SecretStoreError::Unavailable(format!(
                "{} must contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(SecretStoreError::Unavailable(format!(
                "failed to parse {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    fn store_type(&self) -> &'static str {
        "file"
    }

    async fn retrieve(&self, secret_id: &str) -> Result<String> {
        let mut secrets = self.load().await?;

        let value = match secrets.remove(secret_id) {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => {
                return Err(SecretStoreError::NotFound(secret_id.to_string()));
            }
            Some(other) => other.to_string(),
        };

        non_empty(secret_id, value)
    }
}
