// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory secret store.
//!
//! Backs the offline provider and the handler tests. Clones share the same
//! underlying map, so a secret written during planning is visible to a
//! handler holding another clone.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::traits::*;

#[derive(Default)]
struct Inner {
    secrets: RwLock<HashMap<String, String>>,
    denied: RwLock<HashSet<String>>,
    retrievals: AtomicUsize,
}

/// Process-local secret store.
#[derive(Clone, Default)]
pub struct InMemorySecretStore {
    inner: Arc<Inner>,
}

impl InMemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write (or overwrite) a secret.
    pub async fn put(&self, secret_id: impl Into<String>, value: impl Into<String>) {
        let mut secrets = self.inner.secrets.write().await;
        secrets.insert(secret_id.into(), value.into());
    }

    /// Read a secret without counting it as a retrieval.
    ///
    /// Used by provisioning to copy fields between secrets.
    pub async fn get(&self, secret_id: &str) -> Option<String> {
        let secrets = self.inner.secrets.read().await;
        secrets.get(secret_id).cloned()
    }

    /// Make subsequent retrievals of `secret_id` fail with access denied.
    pub async fn deny(&self, secret_id: impl Into<String>) {
        let mut denied = self.inner.denied.write().await;
        denied.insert(secret_id.into());
    }

    /// Identifiers of all stored secrets, sorted.
    pub async fn secret_ids(&self) -> Vec<String> {
        let secrets = self.inner.secrets.read().await;
        let mut ids: Vec<String> = secrets.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of `retrieve` calls made so far, successful or not.
    pub fn retrieve_count(&self) -> usize {
        self.inner.retrievals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    fn store_type(&self) -> &'static str {
        "memory"
    }

    async fn retrieve(&self, secret_id: &str) -> Result<String> {
        self.inner.retrievals.fetch_add(1, Ordering::SeqCst);

        if self.inner.denied.read().await.contains(secret_id) {
            return Err(SecretStoreError::AccessDenied(secret_id.to_string()));
        }

        let value = self
            .get(secret_id)
            .await
            .ok_or_else(|| SecretStoreError::NotFound(secret_id.to_string()))?;
        non_empty(secret_id, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_retrieve() {
        let store = InMemorySecretStore::new();
        store.put("arn:secret:1", r#"{"host":"h"}"#).await;

        let value = store.retrieve("arn:secret:1").await.unwrap();

        assert_eq!(value, r#"{"host":"h"}"#);
        assert_eq!(store.retrieve_count(), 1);
    }

    #[tokio::test]
    async fn test_not_found() {
        let store = InMemorySecretStore::new();

        let result = store.retrieve("missing").await;

        assert!(matches!(result, Err(SecretStoreError::NotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let store = InMemorySecretStore::new();
        store.put("blank", "  ").await;

        assert!(matches!(
            store.retrieve("blank").await,
            Err(SecretStoreError::Empty(_))
        ));
    }

    #[tokio::test]
    async fn test_denied() {
        let store = InMemorySecretStore::new();
        store.put("locked", "{}").await;
        store.deny("locked").await;

        assert!(matches!(
            store.retrieve("locked").await,
            Err(SecretStoreError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemorySecretStore::new();
        let other = store.clone();
        store.put("shared", "value").await;

        assert_eq!(other.retrieve("shared").await.unwrap(), "value");
        assert_eq!(store.retrieve_count(), 1);
        assert_eq!(store.get("shared").await.as_deref(), Some("value"));
        assert_eq!(store.retrieve_count(), 1, "get is not a retrieval");
    }
}
