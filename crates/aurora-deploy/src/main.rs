// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Aurora Deploy - plans the serverless Postgres stack against the in-memory
//! provider and prints the stack outputs as JSON.

use std::sync::Arc;
use tracing::{info, warn};

use aurora_deploy::config::DeployConfig;
use aurora_deploy::export::write_secrets;
use aurora_deploy::planner::Planner;
use aurora_deploy::provider::{InMemoryProvider, ResourceProvider};
use aurora_deploy::stack;
use aurora_secrets::InMemorySecretStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aurora_deploy=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = DeployConfig::from_env()?;

    info!(
        stack = %config.stack_name,
        region = %config.region,
        min_capacity = config.scaling.min_capacity,
        max_capacity = config.scaling.max_capacity,
        auto_pause = config.scaling.auto_pause.is_enabled(),
        "Starting Aurora Deploy"
    );

    let definition = stack::definition(&config)?;

    // The emulated cluster reports the placeholder host, as local emulators do
    let secrets = InMemorySecretStore::new();
    let provider = Arc::new(
        InMemoryProvider::new(secrets.clone())
            .with_region(&config.region)
            .with_endpoint_host(&config.placeholder_host),
    );
    info!(provider = provider.provider_type(), "Provider initialized");

    let deployment = Planner::new(provider).plan(&definition).await?;

    if let Some(path) = &config.secrets_export {
        write_secrets(&secrets, path).await?;
    }

    println!("{}", serde_json::to_string_pretty(&deployment.outputs)?);
    info!(resources = deployment.resources.len(), "Stack planned");

    Ok(())
}
