// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Aurora Deploy - provisioning graph for a serverless Postgres stack.
//!
//! Resources are declared before they exist. Attributes that are only known
//! once another resource is realized (the cluster endpoint, a secret ARN) are
//! written as promises and bound by the [`Planner`] during a single ordered
//! pass over the [`StackDefinition`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`graph`] | Declarations, attribute promises and host override |
//! | [`resources`] | Typed property shapes per resource kind |
//! | [`provider`] | Provider trait and the in-memory provider |
//! | [`planner`] | Ordered realization and output resolution |
//! | [`stack`] | The fixed serverless Postgres stack |
//! | [`config`] | Environment configuration |
//! | [`export`] | Planned secrets as a file for local handler runs |
//!
//! # Realization order
//!
//! | # | Logical id | Kind |
//! |---|------------|------|
//! | 1 | `VPC` | network |
//! | 2 | `DbSecurityGroup` | access rule |
//! | 3 | `DBCredentialsSecret` | generated secret |
//! | 4 | `serverless-db` | database cluster |
//! | 5 | `DBRuntimeSecret` | composed secret |
//! | 6 | `Lambda` | compute function |
//! | 7 | `Api` | API endpoint |

pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod planner;
pub mod provider;
pub mod resources;
pub mod stack;

pub use config::{ConfigError, DeployConfig};
pub use error::{Error, PlanError, Result};
pub use graph::{
    AttrRef, AttrValue, HostOverride, LogicalId, OutputSpec, ResolvedSpec, ResolvedValue,
    ResourceKind, ResourceSpec, StackDefinition, apply_host_override,
};
pub use planner::{Deployment, Planner};
pub use provider::{InMemoryProvider, ProviderError, ResourceHandle, ResourceProvider};
