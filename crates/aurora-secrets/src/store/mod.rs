// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Secret store backends.
//!
//! The runtime only ever needs `retrieve(secret_id) -> payload`; writing
//! secrets is a provisioning concern handled by the resource provider.

#[cfg(feature = "aws")]
mod aws;
mod cached;
mod file;
mod memory;
mod traits;

#[cfg(feature = "aws")]
pub use aws::AwsSecretStore;
pub use cached::CachedSecretStore;
pub use file::FileSecretStore;
pub use memory::InMemorySecretStore;
pub use traits::*;
