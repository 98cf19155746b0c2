// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provider trait definitions.
//!
//! Defines the abstract interface the planner drives to create resources.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::graph::{LogicalId, ResolvedSpec, ResourceKind};

/// Errors from provider operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// The resolved declaration is missing or has malformed properties.
    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    /// The provider refused to create the resource.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Other error.
    #[error("Other: {0}")]
    Other(String),
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// A realized resource and the attributes it resolved.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceHandle {
    /// Logical id from the declaration
    pub logical_id: LogicalId,
    /// Resource kind
    pub kind: ResourceKind,
    /// Provider-assigned identifier
    pub physical_id: String,
    /// Attributes later declarations may bind to
    pub attributes: BTreeMap<String, String>,
    /// When the provider finished creating the resource
    pub created_at: DateTime<Utc>,
}

impl ResourceHandle {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Trait for resource providers.
///
/// Providers are PURE realization engines - they do not order resources or
/// bind references. The planner hands them fully resolved declarations one at
/// a time, in dependency order, and awaits each before the next.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Provider type identifier (e.g., "memory")
    fn provider_type(&self) -> &'static str;

    /// Create the resource and return its resolved attributes.
    ///
    /// `SecretField` values in `spec` must be copied from the referenced
    /// secret at this point; the copy is not kept in sync afterwards.
    async fn create(&self, spec: &ResolvedSpec) -> Result<ResourceHandle>;
}
