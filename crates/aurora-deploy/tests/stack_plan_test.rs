// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for planning the full stack against the in-memory provider.

use std::sync::Arc;

use aurora_deploy::config::DeployConfig;
use aurora_deploy::graph::{AttrValue, ResourceKind, ResourceSpec};
use aurora_deploy::planner::Planner;
use aurora_deploy::provider::InMemoryProvider;
use aurora_deploy::resources::attrs;
use aurora_deploy::stack::{self, OUTPUT_API_URL, SECRET_ARN_ENV, ids};
use aurora_deploy::{PlanError, ProviderError};
use aurora_secrets::{InMemorySecretStore, SecretPayload};

/// Provider whose cluster reports `endpoint_host`.
fn provider(endpoint_host: &str) -> Arc<InMemoryProvider> {
    Arc::new(InMemoryProvider::new(InMemorySecretStore::new()).with_endpoint_host(endpoint_host))
}

async fn secret_payload(provider: &InMemoryProvider, arn: &str) -> serde_json::Value {
    let raw = provider.secrets().get(arn).await.unwrap();
    serde_json::from_str(&raw).unwrap()
}

// ============================================================================
// Realization order and bindings
// ============================================================================

#[tokio::test]
async fn test_resources_realized_in_dependency_order() {
    let config = DeployConfig::default();
    let provider = provider(&config.placeholder_host);

    let deployment = Planner::new(provider.clone())
        .plan(&stack::definition(&config).unwrap())
        .await
        .unwrap();

    let order: Vec<String> = provider
        .created()
        .await
        .iter()
        .map(|h| h.logical_id.to_string())
        .collect();
    assert_eq!(
        order,
        vec![
            ids::NETWORK,
            ids::ACCESS_RULE,
            ids::CREDENTIALS_SECRET,
            ids::CLUSTER,
            ids::RUNTIME_SECRET,
            ids::FUNCTION,
            ids::API,
        ]
    );
    assert_eq!(deployment.resources.len(), 7);
    assert_eq!(deployment.stack_name, "AuroraServerlessV2Stack");
}

#[tokio::test]
async fn test_cluster_receives_bound_network_attributes() {
    let config = DeployConfig::default();
    let provider = provider(&config.placeholder_host);

    let deployment = Planner::new(provider.clone())
        .plan(&stack::definition(&config).unwrap())
        .await
        .unwrap();

    let network = deployment.resource(ids::NETWORK).unwrap();
    let group = deployment.resource(ids::ACCESS_RULE).unwrap();
    let specs = provider.received_specs().await;
    let cluster = specs
        .iter()
        .find(|s| s.id.as_str() == ids::CLUSTER)
        .unwrap();

    assert_eq!(
        cluster.get_str("subnet_ids"),
        network.attribute(attrs::ISOLATED_SUBNET_IDS)
    );
    let groups = cluster.get("security_group_ids").unwrap().as_list().unwrap();
    assert_eq!(groups[0].as_str(), group.attribute(attrs::GROUP_ID));
}

// ============================================================================
// Runtime secret composition
// ============================================================================

#[tokio::test]
async fn test_runtime_secret_carries_generated_password() {
    let config = DeployConfig::default();
    let provider = provider(&config.placeholder_host);

    let deployment = Planner::new(provider.clone())
        .plan(&stack::definition(&config).unwrap())
        .await
        .unwrap();

    let generated = deployment
        .resource(ids::CREDENTIALS_SECRET)
        .and_then(|h| h.attribute(attrs::ARN))
        .unwrap();
    let runtime = deployment
        .resource(ids::RUNTIME_SECRET)
        .and_then(|h| h.attribute(attrs::ARN))
        .unwrap();

    let generated = secret_payload(&provider, generated).await;
    let composed = secret_payload(&provider, runtime).await;

    let password = generated["password"].as_str().unwrap();
    assert_eq!(password.len(), 32);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(composed["password"], generated["password"]);
    assert_eq!(composed["username"], "serverless");
    assert_eq!(composed["dbname"], "serverless");
}

#[tokio::test]
async fn test_placeholder_host_overridden_in_runtime_secret() {
    let config = DeployConfig::default();
    let provider = provider(&config.placeholder_host);

    let deployment = Planner::new(provider.clone())
        .plan(&stack::definition(&config).unwrap())
        .await
        .unwrap();

    // The cluster itself still reports the placeholder
    assert_eq!(
        deployment
            .resource(ids::CLUSTER)
            .and_then(|h| h.attribute(attrs::ENDPOINT_HOST)),
        Some("localhost.localstack.cloud")
    );

    let runtime = deployment
        .resource(ids::RUNTIME_SECRET)
        .and_then(|h| h.attribute(attrs::ARN))
        .unwrap();
    let raw = provider.secrets().get(runtime).await.unwrap();
    let payload = SecretPayload::parse(&raw).unwrap();

    assert_eq!(payload.host, "host.docker.internal");
    assert_eq!(payload.port, 5432);
}

#[tokio::test]
async fn test_real_endpoint_host_passes_through() {
    let config = DeployConfig::default();
    let provider = provider("serverless-db.cluster-abc.us-east-1.rds.amazonaws.com");

    let deployment = Planner::new(provider.clone())
        .plan(&stack::definition(&config).unwrap())
        .await
        .unwrap();

    let runtime = deployment
        .resource(ids::RUNTIME_SECRET)
        .and_then(|h| h.attribute(attrs::ARN))
        .unwrap();
    let composed = secret_payload(&provider, runtime).await;

    assert_eq!(
        composed["host"],
        "serverless-db.cluster-abc.us-east-1.rds.amazonaws.com"
    );
}

#[tokio::test]
async fn test_planner_never_sees_password() {
    let config = DeployConfig::default();
    let provider = provider(&config.placeholder_host);

    Planner::new(provider.clone())
        .plan(&stack::definition(&config).unwrap())
        .await
        .unwrap();

    let specs = provider.received_specs().await;
    let runtime_spec = specs
        .iter()
        .find(|s| s.id.as_str() == ids::RUNTIME_SECRET)
        .unwrap();
    let value = runtime_spec.get("value").unwrap();

    // Still a reference when handed to the provider
    assert!(value.to_json().is_none());
}

// ============================================================================
// Function wiring and outputs
// ============================================================================

#[tokio::test]
async fn test_function_wired_to_runtime_secret_only() {
    let config = DeployConfig::default();
    let provider = provider(&config.placeholder_host);

    let deployment = Planner::new(provider.clone())
        .plan(&stack::definition(&config).unwrap())
        .await
        .unwrap();

    let runtime = deployment
        .resource(ids::RUNTIME_SECRET)
        .and_then(|h| h.attribute(attrs::ARN))
        .unwrap();
    let generated = deployment
        .resource(ids::CREDENTIALS_SECRET)
        .and_then(|h| h.attribute(attrs::ARN))
        .unwrap();
    let function_arn = deployment
        .resource(ids::FUNCTION)
        .and_then(|h| h.attribute(attrs::ARN))
        .unwrap();
    let function = provider.function(function_arn).await.unwrap();

    assert_eq!(
        function.environment.get(SECRET_ARN_ENV).map(String::as_str),
        Some(runtime)
    );
    assert!(function.read_secrets.contains(runtime));
    assert!(!function.read_secrets.contains(generated));
    assert_eq!(function.read_secrets.len(), 1);
}

#[tokio::test]
async fn test_api_url_output_published() {
    let config = DeployConfig::default();
    let provider = provider(&config.placeholder_host);

    let deployment = Planner::new(provider)
        .plan(&stack::definition(&config).unwrap())
        .await
        .unwrap();

    let url = deployment.output(OUTPUT_API_URL).unwrap();
    assert!(url.starts_with("https://"));
    assert!(url.contains(".execute-api.us-east-1.amazonaws.com/prod/"));
    assert_eq!(
        Some(url),
        deployment
            .resource(ids::API)
            .and_then(|h| h.attribute(attrs::URL))
    );
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failure_aborts_remaining_resources() {
    let config = DeployConfig::default();
    let provider = Arc::new(
        InMemoryProvider::new(InMemorySecretStore::new()).failing_on(ids::CLUSTER),
    );

    let err = Planner::new(provider.clone())
        .plan(&stack::definition(&config).unwrap())
        .await
        .unwrap_err();

    match err {
        PlanError::Realization { resource, source } => {
            assert_eq!(resource.as_str(), ids::CLUSTER);
            assert!(matches!(source, ProviderError::Unavailable(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    // VPC, access rule, credentials, then the failed cluster
    assert_eq!(provider.attempts().await, 4);
    assert_eq!(provider.created().await.len(), 3);
}

#[tokio::test]
async fn test_out_of_order_definition_rejected_before_any_create() {
    let mut definition = stack::definition(&DeployConfig::default()).unwrap();
    definition.resources.swap(3, 4);
    let provider = provider("localhost.localstack.cloud");

    let err = Planner::new(provider.clone())
        .plan(&definition)
        .await
        .unwrap_err();

    assert!(matches!(err, PlanError::OutOfOrder { .. }));
    assert_eq!(provider.attempts().await, 0);
}

#[tokio::test]
async fn test_duplicate_resource_rejected() {
    let mut definition = stack::definition(&DeployConfig::default()).unwrap();
    definition.resources.push(
        ResourceSpec::new(ids::NETWORK, ResourceKind::Network)
            .property("cidr", AttrValue::from("10.1.0.0/16")),
    );
    let provider = provider("localhost.localstack.cloud");

    let err = Planner::new(provider.clone())
        .plan(&definition)
        .await
        .unwrap_err();

    assert!(matches!(err, PlanError::DuplicateResource(_)));
    assert_eq!(provider.attempts().await, 0);
}
