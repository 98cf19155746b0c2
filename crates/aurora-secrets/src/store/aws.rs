// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! AWS Secrets Manager store.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;

use super::traits::*;

/// Secret store backed by AWS Secrets Manager `GetSecretValue`.
///
/// The SDK client is a thread-safe request factory; sharing one across
/// concurrent invocations holds no per-invocation state.
#[derive(Clone)]
pub struct AwsSecretStore {
    client: Client,
}

impl AwsSecretStore {
    /// Build a store from the default AWS configuration chain.
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(Client::new(&config))
    }

    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    fn store_type(&self) -> &'static str {
        "aws"
    }

    async fn retrieve(&self, secret_id: &str) -> Result<String> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|err| classify(secret_id, err))?;

        match output.secret_string() {
            Some(value) => non_empty(secret_id, value.to_string()),
            None => Err(SecretStoreError::Empty(secret_id.to_string())),
        }
    }
}

fn classify(secret_id: &str, err: SdkError<GetSecretValueError>) -> SecretStoreError {
    match err.code() {
        Some("ResourceNotFoundException") => SecretStoreError::NotFound(secret_id.to_string()),
        Some("AccessDeniedException") => SecretStoreError::AccessDenied(secret_id.to_string()),
        _ => SecretStoreError::Unavailable(format!(
            "GetSecretValue failed: {}",
            DisplayErrorContext(&err)
        )),
    }
}
