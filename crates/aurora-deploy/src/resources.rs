// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed property shapes shared by the stack definition and providers.
//!
//! Properties travel through the graph as JSON; these types give both ends of
//! that trip (definition and provider) one schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute names providers resolve on realized resources.
pub mod attrs {
    /// Identifier of any realized resource (secret ARN, function ARN, ...).
    pub const ARN: &str = "arn";
    pub const VPC_ID: &str = "vpc_id";
    pub const PUBLIC_SUBNET_IDS: &str = "public_subnet_ids";
    pub const ISOLATED_SUBNET_IDS: &str = "isolated_subnet_ids";
    pub const GROUP_ID: &str = "group_id";
    pub const SECRET_NAME: &str = "secret_name";
    pub const ENDPOINT_HOST: &str = "endpoint_host";
    pub const ENDPOINT_PORT: &str = "endpoint_port";
    pub const CLUSTER_IDENTIFIER: &str = "cluster_identifier";
    pub const FUNCTION_NAME: &str = "function_name";
    pub const URL: &str = "url";
}

/// Property keys used in resource declarations.
pub mod props {
    pub const CIDR: &str = "cidr";
    pub const MAX_AZS: &str = "max_azs";
    pub const NAT_GATEWAYS: &str = "nat_gateways";
    pub const SUBNETS: &str = "subnets";
    pub const VPC: &str = "vpc";
    pub const ALLOW_ALL_OUTBOUND: &str = "allow_all_outbound";
    pub const INGRESS: &str = "ingress";
    pub const NAME: &str = "name";
    pub const GENERATE: &str = "generate";
    pub const VALUE: &str = "value";
    pub const ENGINE: &str = "engine";
    pub const ENGINE_VERSION: &str = "engine_version";
    pub const DEFAULT_DATABASE_NAME: &str = "default_database_name";
    pub const SUBNET_IDS: &str = "subnet_ids";
    pub const SECURITY_GROUP_IDS: &str = "security_group_ids";
    pub const CREDENTIALS_SECRET: &str = "credentials_secret";
    pub const PORT: &str = "port";
    pub const SCALING: &str = "scaling";
    pub const RUNTIME: &str = "runtime";
    pub const ARCHITECTURE: &str = "architecture";
    pub const HANDLER: &str = "handler";
    pub const MEMORY_MB: &str = "memory_mb";
    pub const TIMEOUT_SECS: &str = "timeout_secs";
    pub const ENVIRONMENT: &str = "environment";
    pub const READ_SECRETS: &str = "read_secrets";
    pub const TARGET: &str = "target";
    pub const STAGE: &str = "stage";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetType {
    Public,
    PrivateIsolated,
}

/// One subnet group, created once per availability zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetConfig {
    pub name: String,
    pub subnet_type: SubnetType,
    pub cidr_mask: u8,
}

/// Inbound rule on an access rule (security group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub peer: String,
    pub protocol: String,
    pub port: u16,
    pub description: String,
}

/// How a provider generates a secret value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateSecretString {
    /// Fixed fields the generated secret starts from.
    pub secret_string_template: Map<String, Value>,
    /// Key the generated string is stored under.
    pub generate_string_key: String,
    pub exclude_punctuation: bool,
    pub include_space: bool,
    pub password_length: usize,
}

/// Auto-pause policy of a serverless cluster.
///
/// Zero minutes of inactivity is not a valid pause delay; it is spelled
/// [`AutoPause::Disabled`] so the choice is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AutoPause {
    Disabled,
    AfterMinutes { minutes: u32 },
}

impl AutoPause {
    pub fn from_minutes(minutes: u32) -> Self {
        if minutes == 0 {
            Self::Disabled
        } else {
            Self::AfterMinutes { minutes }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::AfterMinutes { .. })
    }
}

/// Capacity bounds, in capacity units.
pub const MIN_CAPACITY_UNITS: f64 = 0.5;
pub const MAX_CAPACITY_UNITS: f64 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingConfig {
    pub min_capacity: f64,
    pub max_capacity: f64,
    pub auto_pause: AutoPause,
}

impl ScalingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_CAPACITY_UNITS..=MAX_CAPACITY_UNITS).contains(&self.min_capacity) {
            return Err(format!(
                "min capacity {} outside {}..={}",
                self.min_capacity, MIN_CAPACITY_UNITS, MAX_CAPACITY_UNITS
            ));
        }
        if !(MIN_CAPACITY_UNITS..=MAX_CAPACITY_UNITS).contains(&self.max_capacity) {
            return Err(format!(
                "max capacity {} outside {}..={}",
                self.max_capacity, MIN_CAPACITY_UNITS, MAX_CAPACITY_UNITS
            ));
        }
        if self.min_capacity > self.max_capacity {
            return Err(format!(
                "min capacity {} exceeds max capacity {}",
                self.min_capacity, self.max_capacity
            ));
        }
        Ok(())
    }
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            min_capacity: 2.0,
            max_capacity: 16.0,
            auto_pause: AutoPause::Disabled,
        }
    }
}
