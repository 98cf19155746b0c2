// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Aurora Secrets - credential payloads and secret store backends.
//!
//! This crate is the only contract shared between provisioning
//! (`aurora-deploy`, which composes and stores the runtime secret) and the
//! runtime (`aurora-handler`, which retrieves and validates it).
//!
//! # Payload
//!
//! The composed runtime secret is a JSON object with five required keys:
//!
//! | Key | Type | Notes |
//! |-----|------|-------|
//! | `host` | string | cluster endpoint, after host override |
//! | `port` | number or numeric string | coerced to `u16` |
//! | `username` | string | |
//! | `password` | string | copied from the generated credentials secret |
//! | `dbname` | string | optional only when a fallback is configured |
//!
//! # Stores
//!
//! | Store | Description |
//! |-------|-------------|
//! | [`InMemorySecretStore`] | Process-local map, shared with the in-memory provider |
//! | [`FileSecretStore`] | JSON file of `id -> payload` for local runs |
//! | [`CachedSecretStore`] | Time-bounded cache in front of another store |
//! | `AwsSecretStore` | AWS Secrets Manager (feature `aws`) |

#![deny(missing_docs)]

/// Secret payload model and validation.
pub mod payload;

/// Secret store trait and backends.
pub mod store;

pub use payload::{FIELD_DBNAME, FIELD_HOST, FIELD_PASSWORD, FIELD_PORT, FIELD_USERNAME};
pub use payload::{PayloadError, REQUIRED_FIELDS, SecretPayload};
#[cfg(feature = "aws")]
pub use store::AwsSecretStore;
pub use store::{CachedSecretStore, FileSecretStore, InMemorySecretStore};
pub use store::{SecretStore, SecretStoreError};
