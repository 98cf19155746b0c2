// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The serverless Postgres stack.
//!
//! Declares, in realization order: an isolated network, the database access
//! rule, a generated credentials secret, the serverless cluster, the runtime
//! secret composed from the cluster endpoint and the generated credentials,
//! the query function and the API endpoint fronting it.

use serde_json::json;

use crate::config::DeployConfig;
use crate::error::PlanError;
use crate::graph::{
    AttrValue, HostOverride, LogicalId, OutputSpec, ResourceKind, ResourceSpec, StackDefinition,
};
use crate::resources::{
    GenerateSecretString, IngressRule, SubnetConfig, SubnetType, attrs, props,
};

/// Logical ids of the stack's resources.
pub mod ids {
    pub const NETWORK: &str = "VPC";
    pub const ACCESS_RULE: &str = "DbSecurityGroup";
    pub const CREDENTIALS_SECRET: &str = "DBCredentialsSecret";
    pub const CLUSTER: &str = "serverless-db";
    pub const RUNTIME_SECRET: &str = "DBRuntimeSecret";
    pub const FUNCTION: &str = "Lambda";
    pub const API: &str = "Api";
}

/// Stack output carrying the API base URL.
pub const OUTPUT_API_URL: &str = "ApiUrl";

/// Environment variable the function reads the runtime secret id from.
pub const SECRET_ARN_ENV: &str = "DATABASE_SECRET_ARN";

const ENGINE: &str = "aurora-postgresql";
const ENGINE_VERSION: &str = "14.4";
const PASSWORD_LENGTH: usize = 32;

/// Build the stack definition for `config`.
pub fn definition(config: &DeployConfig) -> Result<StackDefinition, PlanError> {
    config
        .scaling
        .validate()
        .map_err(PlanError::InvalidDefinition)?;

    let network = ResourceSpec::new(ids::NETWORK, ResourceKind::Network)
        .property(props::CIDR, config.vpc_cidr.as_str())
        .property(props::MAX_AZS, json!(2))
        .property(props::NAT_GATEWAYS, json!(0))
        .property(
            props::SUBNETS,
            AttrValue::from_serialize(&[
                SubnetConfig {
                    name: "public".to_string(),
                    subnet_type: SubnetType::Public,
                    cidr_mask: 24,
                },
                SubnetConfig {
                    name: "isolated".to_string(),
                    subnet_type: SubnetType::PrivateIsolated,
                    cidr_mask: 24,
                },
            ])?,
        );

    let access_rule = ResourceSpec::new(ids::ACCESS_RULE, ResourceKind::AccessRule)
        .property(props::VPC, network.id.attr(attrs::VPC_ID))
        .property(props::ALLOW_ALL_OUTBOUND, json!(true))
        .property(
            props::INGRESS,
            AttrValue::from_serialize(&[IngressRule {
                peer: "0.0.0.0/0".to_string(),
                protocol: "tcp".to_string(),
                port: config.db_port,
                description: "Postgres access".to_string(),
            }])?,
        );

    let credentials = ResourceSpec::new(ids::CREDENTIALS_SECRET, ResourceKind::Secret)
        .property(props::NAME, format!("{}-rds-credentials", config.stack_name))
        .property(
            props::GENERATE,
            AttrValue::from_serialize(&GenerateSecretString {
                secret_string_template: json_object(json!({ "username": config.db_username })),
                generate_string_key: "password".to_string(),
                exclude_punctuation: true,
                include_space: false,
                password_length: PASSWORD_LENGTH,
            })?,
        );

    let cluster = ResourceSpec::new(ids::CLUSTER, ResourceKind::DatabaseCluster)
        .property(props::ENGINE, ENGINE)
        .property(props::ENGINE_VERSION, ENGINE_VERSION)
        .property(props::DEFAULT_DATABASE_NAME, config.db_name.as_str())
        .property(props::SUBNET_IDS, network.id.attr(attrs::ISOLATED_SUBNET_IDS))
        .property(
            props::SECURITY_GROUP_IDS,
            AttrValue::List(vec![access_rule.id.attr(attrs::GROUP_ID).into()]),
        )
        .property(props::CREDENTIALS_SECRET, credentials.id.attr(attrs::ARN))
        .property(props::PORT, json!(config.db_port))
        .property(props::SCALING, AttrValue::from_serialize(&config.scaling)?);

    let runtime_secret = ResourceSpec::new(ids::RUNTIME_SECRET, ResourceKind::Secret)
        .property(props::NAME, format!("{}-runtime-credentials", config.stack_name))
        .property(
            props::VALUE,
            AttrValue::object([
                (
                    "host",
                    HostOverride::new(
                        cluster.id.attr(attrs::ENDPOINT_HOST),
                        config.placeholder_host.as_str(),
                        config.override_host.as_str(),
                    )?
                    .into(),
                ),
                ("port", cluster.id.attr(attrs::ENDPOINT_PORT).into()),
                ("username", config.db_username.as_str().into()),
                ("password", AttrValue::secret_field(&credentials.id, "password")),
                ("dbname", config.db_name.as_str().into()),
            ]),
        );

    let function = ResourceSpec::new(ids::FUNCTION, ResourceKind::ComputeFunction)
        .property(props::RUNTIME, "provided.al2023")
        .property(props::ARCHITECTURE, "arm64")
        .property(props::HANDLER, "bootstrap")
        .property(props::MEMORY_MB, json!(128))
        .property(props::TIMEOUT_SECS, json!(30))
        .property(
            props::ENVIRONMENT,
            AttrValue::object([(SECRET_ARN_ENV, runtime_secret.id.attr(attrs::ARN).into())]),
        )
        .property(
            props::READ_SECRETS,
            AttrValue::List(vec![runtime_secret.id.attr(attrs::ARN).into()]),
        );

    let api = ResourceSpec::new(ids::API, ResourceKind::ApiEndpoint)
        .property(props::TARGET, function.id.attr(attrs::ARN))
        .property(props::STAGE, "prod");

    let outputs = vec![OutputSpec {
        name: OUTPUT_API_URL.to_string(),
        value: LogicalId::new(ids::API).attr(attrs::URL),
        description: Some("Base URL of the query endpoint".to_string()),
    }];

    Ok(StackDefinition {
        name: config.stack_name.clone(),
        resources: vec![
            network,
            access_rule,
            credentials,
            cluster,
            runtime_secret,
            function,
            api,
        ],
        outputs,
    })
}

fn json_object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}
