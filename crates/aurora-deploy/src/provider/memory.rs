// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory provider for offline planning and tests.
//!
//! Realizes every resource kind without touching a cloud account. Secrets are
//! written to a shared [`InMemorySecretStore`], so a handler holding a clone
//! of the store can read what planning composed. The cluster reports a
//! configurable endpoint host, by default the placeholder that local
//! emulators return.

use async_trait::async_trait;
use aurora_secrets::InMemorySecretStore;
use chrono::Utc;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::traits::*;
use crate::graph::{LogicalId, ResolvedSpec, ResolvedValue, ResourceKind};
use crate::resources::{
    GenerateSecretString, IngressRule, ScalingConfig, SubnetConfig, SubnetType, attrs, props,
};

const DEFAULT_ACCOUNT_ID: &str = "000000000000";
const DEFAULT_ENDPOINT_HOST: &str = "localhost.localstack.cloud";
const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";
const ALPHANUMERIC: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const MAX_PASSWORD_LENGTH: usize = 4096;

/// A function as the provider realized it.
#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub arn: String,
    pub environment: BTreeMap<String, String>,
    /// Secrets the function was granted read access to
    pub read_secrets: BTreeSet<String>,
}

#[derive(Default)]
struct State {
    attempts: usize,
    created: Vec<ResourceHandle>,
    specs: Vec<ResolvedSpec>,
    functions: BTreeMap<String, FunctionRecord>,
}

/// In-memory provider.
pub struct InMemoryProvider {
    secrets: InMemorySecretStore,
    region: String,
    account_id: String,
    endpoint_host: String,
    fail_on: Option<LogicalId>,
    state: Mutex<State>,
}

impl InMemoryProvider {
    /// Create a provider writing secrets into `secrets`.
    pub fn new(secrets: InMemorySecretStore) -> Self {
        Self {
            secrets,
            region: "us-east-1".to_string(),
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            endpoint_host: DEFAULT_ENDPOINT_HOST.to_string(),
            fail_on: None,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Host the database cluster reports as its endpoint.
    pub fn with_endpoint_host(mut self, host: impl Into<String>) -> Self {
        self.endpoint_host = host.into();
        self
    }

    /// Make creation of `logical_id` fail with [`ProviderError::Unavailable`].
    pub fn failing_on(mut self, logical_id: &str) -> Self {
        self.fail_on = Some(LogicalId::new(logical_id));
        self
    }

    pub fn secrets(&self) -> &InMemorySecretStore {
        &self.secrets
    }

    /// Number of `create` calls, including failed ones.
    pub async fn attempts(&self) -> usize {
        self.state.lock().await.attempts
    }

    /// Realized resources in creation order.
    pub async fn created(&self) -> Vec<ResourceHandle> {
        self.state.lock().await.created.clone()
    }

    /// Declarations as received, in call order.
    pub async fn received_specs(&self) -> Vec<ResolvedSpec> {
        self.state.lock().await.specs.clone()
    }

    pub async fn function(&self, arn: &str) -> Option<FunctionRecord> {
        self.state.lock().await.functions.get(arn).cloned()
    }

    async fn create_network(&self, spec: &ResolvedSpec) -> Result<Attributes> {
        let cidr = require_str(spec, props::CIDR)?;
        let subnets: Vec<SubnetConfig> = require_typed(spec, props::SUBNETS)?;
        let max_azs = match spec.get(props::MAX_AZS).and_then(ResolvedValue::to_json) {
            None => 2,
            Some(value) => value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    ProviderError::InvalidSpec(format!(
                        "max_azs must be a whole number that fits in 32 bits, got {}",
                        value
                    ))
                })?,
        };
        if max_azs == 0 {
            return Err(ProviderError::InvalidSpec(
                "max_azs must be at least 1".to_string(),
            ));
        }

        let (base, prefix) = parse_cidr(cidr)?;
        let mut next_offset: u64 = 0;
        let mut public = Vec::new();
        let mut isolated = Vec::new();

        for subnet in &subnets {
            if subnet.cidr_mask < prefix || subnet.cidr_mask > 28 {
                return Err(ProviderError::InvalidSpec(format!(
                    "subnet '{}' mask /{} does not fit network /{}",
                    subnet.name, subnet.cidr_mask, prefix
                )));
            }
            let size = 1u64 << (32 - subnet.cidr_mask);
            for _ in 0..max_azs {
                // Align to the subnet size
                let start = next_offset.div_ceil(size) * size;
                if start + size > 1u64 << (32 - prefix) {
                    return Err(ProviderError::Rejected(format!(
                        "network {} has no room for subnet '{}'",
                        cidr, subnet.name
                    )));
                }
                next_offset = start + size;
                let subnet_cidr = format!(
                    "{}/{}",
                    Ipv4Addr::from(base + start as u32),
                    subnet.cidr_mask
                );
                let id = format!("subnet-{}", short_hex(17));
                debug!(subnet = %subnet.name, id = %id, cidr = %subnet_cidr, "Subnet carved");
                match subnet.subnet_type {
                    SubnetType::Public => public.push(id),
                    SubnetType::PrivateIsolated => isolated.push(id),
                }
            }
        }

        let vpc_id = format!("vpc-{}", short_hex(17));
        Ok(Attributes::new(&vpc_id)
            .with(attrs::VPC_ID, &vpc_id)
            .with(attrs::PUBLIC_SUBNET_IDS, public.join(","))
            .with(attrs::ISOLATED_SUBNET_IDS, isolated.join(",")))
    }

    async fn create_access_rule(&self, spec: &ResolvedSpec) -> Result<Attributes> {
        require_str(spec, props::VPC)?;
        let ingress: Vec<IngressRule> = require_typed(spec, props::INGRESS)?;
        for rule in &ingress {
            if rule.port == 0 {
                return Err(ProviderError::InvalidSpec(format!(
                    "ingress rule '{}' has port 0",
                    rule.description
                )));
            }
        }

        let group_id = format!("sg-{}", short_hex(17));
        Ok(Attributes::new(&group_id).with(attrs::GROUP_ID, &group_id))
    }

    async fn create_secret(&self, spec: &ResolvedSpec) -> Result<Attributes> {
        let name = require_str(spec, props::NAME)?;

        let payload = match (spec.get(props::GENERATE), spec.get(props::VALUE)) {
            (Some(_), None) => {
                let generate: GenerateSecretString = require_typed(spec, props::GENERATE)?;
                let mut object = generate.secret_string_template.clone();
                object.insert(
                    generate.generate_string_key.clone(),
                    Value::String(generate_password(&generate)?),
                );
                object
            }
            (None, Some(value)) => self.materialize(value).await?,
            _ => {
                return Err(ProviderError::InvalidSpec(format!(
                    "secret '{}' needs exactly one of 'generate' or 'value'",
                    name
                )));
            }
        };

        let arn = format!(
            "arn:aws:secretsmanager:{}:{}:secret:{}-{}",
            self.region,
            self.account_id,
            name,
            random_alphanumeric(6)
        );
        self.secrets
            .put(&arn, Value::Object(payload).to_string())
            .await;

        Ok(Attributes::new(&arn)
            .with(attrs::ARN, &arn)
            .with(attrs::SECRET_NAME, name))
    }

    /// Build a secret payload, copying referenced fields out of their secrets.
    async fn materialize(&self, value: &ResolvedValue) -> Result<Map<String, Value>> {
        let entries = value.as_object().ok_or_else(|| {
            ProviderError::InvalidSpec("secret value must be an object".to_string())
        })?;

        let mut object = Map::new();
        for (key, entry) in entries {
            let resolved = match entry {
                ResolvedValue::SecretField { secret_id, field } => {
                    Value::String(self.read_secret_field(secret_id, field).await?)
                }
                other => other.to_json().ok_or_else(|| {
                    ProviderError::InvalidSpec(format!(
                        "secret value '{}' nests a secret reference",
                        key
                    ))
                })?,
            };
            object.insert(key.clone(), resolved);
        }
        Ok(object)
    }

    async fn read_secret_field(&self, secret_id: &str, field: &str) -> Result<String> {
        let raw = self.secrets.get(secret_id).await.ok_or_else(|| {
            ProviderError::InvalidSpec(format!("referenced secret {} does not exist", secret_id))
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            ProviderError::Other(format!("secret {} is not JSON: {}", secret_id, e))
        })?;
        value
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::InvalidSpec(format!(
                    "secret {} has no string field '{}'",
                    secret_id, field
                ))
            })
    }

    async fn create_cluster(&self, spec: &ResolvedSpec) -> Result<Attributes> {
        require_str(spec, props::ENGINE)?;
        require_str(spec, props::DEFAULT_DATABASE_NAME)?;
        if require_str(spec, props::SUBNET_IDS)?.is_empty() {
            return Err(ProviderError::InvalidSpec(
                "cluster needs at least one subnet".to_string(),
            ));
        }
        let groups: Vec<String> = require_typed(spec, props::SECURITY_GROUP_IDS)?;
        if groups.is_empty() {
            return Err(ProviderError::InvalidSpec(
                "cluster needs at least one security group".to_string(),
            ));
        }

        let scaling: ScalingConfig = require_typed(spec, props::SCALING)?;
        scaling.validate().map_err(ProviderError::InvalidSpec)?;

        let credentials = require_str(spec, props::CREDENTIALS_SECRET)?;
        self.read_secret_field(credentials, "username").await?;
        self.read_secret_field(credentials, "password").await?;

        let port = require_port(spec, props::PORT)?;
        let identifier = format!(
            "{}-{}",
            spec.id.as_str().to_lowercase(),
            random_alphanumeric(12).to_lowercase()
        );
        let arn = format!(
            "arn:aws:rds:{}:{}:cluster:{}",
            self.region, self.account_id, identifier
        );

        Ok(Attributes::new(&identifier)
            .with(attrs::ARN, &arn)
            .with(attrs::CLUSTER_IDENTIFIER, &identifier)
            .with(attrs::ENDPOINT_HOST, &self.endpoint_host)
            .with(attrs::ENDPOINT_PORT, port.to_string()))
    }

    async fn create_function(&self, spec: &ResolvedSpec) -> Result<Attributes> {
        require_str(spec, props::RUNTIME)?;
        require_str(spec, props::HANDLER)?;

        let environment: BTreeMap<String, String> = match spec.get(props::ENVIRONMENT) {
            Some(value) => {
                let json = value.to_json().ok_or_else(|| {
                    ProviderError::InvalidSpec(
                        "function environment must not embed secret values".to_string(),
                    )
                })?;
                serde_json::from_value(json).map_err(|e| {
                    ProviderError::InvalidSpec(format!("function environment: {}", e))
                })?
            }
            None => BTreeMap::new(),
        };

        let read_secrets: BTreeSet<String> = require_typed(spec, props::READ_SECRETS)?;
        for secret in &read_secrets {
            if self.secrets.get(secret).await.is_none() {
                return Err(ProviderError::InvalidSpec(format!(
                    "read grant references unknown secret {}",
                    secret
                )));
            }
        }

        let name = format!("{}-{}", spec.id, random_alphanumeric(12));
        let arn = format!(
            "arn:aws:lambda:{}:{}:function:{}",
            self.region, self.account_id, name
        );

        let mut state = self.state.lock().await;
        state.functions.insert(
            arn.clone(),
            FunctionRecord {
                arn: arn.clone(),
                environment,
                read_secrets,
            },
        );

        Ok(Attributes::new(&arn)
            .with(attrs::ARN, &arn)
            .with(attrs::FUNCTION_NAME, &name))
    }

    async fn create_api(&self, spec: &ResolvedSpec) -> Result<Attributes> {
        let target = require_str(spec, props::TARGET)?;
        if !self.state.lock().await.functions.contains_key(target) {
            return Err(ProviderError::InvalidSpec(format!(
                "api target {} is not a known function",
                target
            )));
        }
        let stage = spec.get_str(props::STAGE).unwrap_or("prod");

        let api_id = random_alphanumeric(10).to_lowercase();
        let url = format!(
            "https://{}.execute-api.{}.amazonaws.com/{}/",
            api_id, self.region, stage
        );

        let arn = format!("arn:aws:apigateway:{}::/restapis/{}", self.region, api_id);

        Ok(Attributes::new(&api_id)
            .with(attrs::ARN, arn)
            .with(attrs::URL, url))
    }
}

#[async_trait]
impl ResourceProvider for InMemoryProvider {
    fn provider_type(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, spec: &ResolvedSpec) -> Result<ResourceHandle> {
        {
            let mut state = self.state.lock().await;
            state.attempts += 1;
            state.specs.push(spec.clone());
        }

        if self.fail_on.as_ref() == Some(&spec.id) {
            warn!(resource = %spec.id, "Injected provider failure");
            return Err(ProviderError::Unavailable(format!(
                "injected failure for {}",
                spec.id
            )));
        }

        let realized = match spec.kind {
            ResourceKind::Network => self.create_network(spec).await?,
            ResourceKind::AccessRule => self.create_access_rule(spec).await?,
            ResourceKind::Secret => self.create_secret(spec).await?,
            ResourceKind::DatabaseCluster => self.create_cluster(spec).await?,
            ResourceKind::ComputeFunction => self.create_function(spec).await?,
            ResourceKind::ApiEndpoint => self.create_api(spec).await?,
        };

        let handle = ResourceHandle {
            logical_id: spec.id.clone(),
            kind: spec.kind,
            physical_id: realized.physical_id,
            attributes: realized.attributes,
            created_at: Utc::now(),
        };

        self.state.lock().await.created.push(handle.clone());
        Ok(handle)
    }
}

/// Physical id plus resolved attributes of a realized resource.
struct Attributes {
    physical_id: String,
    attributes: BTreeMap<String, String>,
}

impl Attributes {
    fn new(physical_id: &str) -> Self {
        Self {
            physical_id: physical_id.to_string(),
            attributes: BTreeMap::new(),
        }
    }

    fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

fn require_str<'a>(spec: &'a ResolvedSpec, key: &str) -> Result<&'a str> {
    spec.get_str(key).ok_or_else(|| {
        ProviderError::InvalidSpec(format!(
            "{} '{}' needs string property '{}'",
            spec.kind, spec.id, key
        ))
    })
}

fn require_typed<T: DeserializeOwned>(spec: &ResolvedSpec, key: &str) -> Result<T> {
    let json = spec
        .get(key)
        .and_then(ResolvedValue::to_json)
        .ok_or_else(|| {
            ProviderError::InvalidSpec(format!(
                "{} '{}' needs property '{}'",
                spec.kind, spec.id, key
            ))
        })?;
    serde_json::from_value(json).map_err(|e| {
        ProviderError::InvalidSpec(format!("{} '{}': {}: {}", spec.kind, spec.id, key, e))
    })
}

fn require_port(spec: &ResolvedSpec, key: &str) -> Result<u16> {
    let port = match spec.get(key).and_then(ResolvedValue::to_json) {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    };
    port.filter(|p| *p != 0).ok_or_else(|| {
        ProviderError::InvalidSpec(format!(
            "{} '{}' needs a valid '{}'",
            spec.kind, spec.id, key
        ))
    })
}

fn parse_cidr(cidr: &str) -> Result<(u32, u8)> {
    let invalid = || ProviderError::InvalidSpec(format!("invalid CIDR '{}'", cidr));
    let (addr, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
    let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
    if !(8..=28).contains(&prefix) {
        return Err(invalid());
    }
    let base = u32::from(addr);
    let mask = u32::MAX << (32 - prefix);
    if base & !mask != 0 {
        return Err(invalid());
    }
    Ok((base, prefix))
}

/// Generate a password honoring the character constraints.
fn generate_password(generate: &GenerateSecretString) -> Result<String> {
    if generate.password_length == 0 || generate.password_length > MAX_PASSWORD_LENGTH {
        return Err(ProviderError::InvalidSpec(format!(
            "password length {} outside 1..={}",
            generate.password_length, MAX_PASSWORD_LENGTH
        )));
    }

    let mut charset: Vec<char> = ALPHANUMERIC.chars().collect();
    if !generate.exclude_punctuation {
        charset.extend(PUNCTUATION.chars());
    }
    if generate.include_space {
        charset.push(' ');
    }

    let mut rng = rand::rng();
    Ok((0..generate.password_length)
        .map(|_| charset[rng.random_range(0..charset.len())])
        .collect())
}

fn random_alphanumeric(len: usize) -> String {
    let charset: Vec<char> = ALPHANUMERIC.chars().collect();
    let mut rng = rand::rng();
    (0..len)
        .map(|_| charset[rng.random_range(0..charset.len())])
        .collect()
}

fn short_hex(len: usize) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..len.min(hex.len())].to_string()
}
