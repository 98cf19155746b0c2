// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Aurora Handler - serves the query handler over HTTP.

use std::sync::Arc;
use tracing::{info, warn};

use aurora_handler::config::HandlerConfig;
use aurora_handler::db::{Connector, PgConnector};
use aurora_handler::handler::QueryHandler;
use aurora_handler::server;
use aurora_secrets::{CachedSecretStore, FileSecretStore, SecretStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aurora_handler=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = HandlerConfig::from_env()?;

    info!(
        secret_env_var = %config.secret_env_var,
        connect_timeout_ms = config.connect_timeout.as_millis() as u64,
        query_timeout_ms = config.query_timeout.as_millis() as u64,
        http_port = config.http_port,
        "Starting Aurora Handler"
    );

    let mut secrets = secret_store(&config).await?;
    if let Some(ttl) = config.secret_cache_ttl {
        info!(ttl_secs = ttl.as_secs(), "Secret cache enabled");
        secrets = Arc::new(CachedSecretStore::new(secrets, ttl));
    }
    info!(store = secrets.store_type(), "Secret store initialized");

    let connector = Arc::new(PgConnector::new());
    info!(connector = connector.connector_type(), "Connector initialized");

    let port = config.http_port;
    let handler = Arc::new(QueryHandler::new(secrets, connector, config));

    server::serve(server::router(handler), port).await?;

    info!("Aurora Handler shut down");
    Ok(())
}

#[cfg(feature = "aws")]
async fn secret_store(config: &HandlerConfig) -> anyhow::Result<Arc<dyn SecretStore>> {
    match &config.secrets_file {
        Some(path) => Ok(Arc::new(FileSecretStore::new(path))),
        None => Ok(Arc::new(aurora_secrets::AwsSecretStore::from_env().await)),
    }
}

#[cfg(not(feature = "aws"))]
async fn secret_store(config: &HandlerConfig) -> anyhow::Result<Arc<dyn SecretStore>> {
    match &config.secrets_file {
        Some(path) => Ok(Arc::new(FileSecretStore::new(path))),
        None => anyhow::bail!("AURORA_SECRETS_FILE must be set when built without the aws feature"),
    }
}
