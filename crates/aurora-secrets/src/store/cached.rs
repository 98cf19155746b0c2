// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Time-bounded cache in front of another secret store.
//!
//! Only successful retrievals are cached. Entries expire after `ttl`, which
//! must not exceed the credential rotation interval.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::traits::*;

/// Caching wrapper around a [`SecretStore`].
pub struct CachedSecretStore {
    inner: Arc<dyn SecretStore>,
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl CachedSecretStore {
    /// Wrap `inner`, caching successful retrievals for `ttl`.
    pub fn new(inner: Arc<dyn SecretStore>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every cached entry.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[async_trait]
impl SecretStore for CachedSecretStore {
    fn store_type(&self) -> &'static str {
        "cached"
    }

    async fn retrieve(&self, secret_id: &str) -> Result<String> {
        {
            let entries = self.entries.lock().await;
            if let Some((fetched_at, value)) = entries.get(secret_id)
                && fetched_at.elapsed() < self.ttl
            {
                debug!(secret_id, "secret served from cache");
                return Ok(value.clone());
            }
        }

        let value = self.inner.retrieve(secret_id).await?;

        let mut entries = self.entries.lock().await;
        entries.insert(secret_id.to_string(), (Instant::now(), value.clone()));
        Ok(value)
    }
}
