// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Export of planned secrets for local handler runs.
//!
//! Writes the in-memory store as the `id -> payload` JSON object that
//! `FileSecretStore` reads.

use aurora_secrets::InMemorySecretStore;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// Write every secret in `store` to `path`. Returns the number written.
pub async fn write_secrets(store: &InMemorySecretStore, path: &Path) -> Result<usize> {
    let mut secrets = Map::new();
    for id in store.secret_ids().await {
        if let Some(raw) = store.get(&id).await {
            // Keep JSON payloads readable in the file
            let value = serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw));
            secrets.insert(id, value);
        }
    }

    let count = secrets.len();
    let contents = serde_json::to_string_pretty(&Value::Object(secrets))?;
    tokio::fs::write(path, contents).await?;

    info!(path = %path.display(), secrets = count, "Secrets exported");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_secrets::{FileSecretStore, SecretPayload, SecretStore};

    #[tokio::test]
    async fn test_exported_secrets_readable_by_file_store() {
        let store = InMemorySecretStore::new();
        store
            .put(
                "arn:runtime",
                r#"{"host":"h","port":5432,"username":"u","password":"p","dbname":"d"}"#,
            )
            .await;
        store.put("arn:opaque", "not json").await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");

        assert_eq!(write_secrets(&store, &path).await.unwrap(), 2);

        let file = FileSecretStore::new(&path);
        let payload = SecretPayload::parse(&file.retrieve("arn:runtime").await.unwrap()).unwrap();
        assert_eq!(payload.port, 5432);
        assert_eq!(file.retrieve("arn:opaque").await.unwrap(), "not json");
    }
}
