// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Query handler state machine.
//!
//! One invocation walks:
//!
//! ```text
//! Start → EnvironmentResolved → SecretRetrieved → PayloadValidated
//!       → Connected → QueryExecuted → Disconnected → Responded
//! ```
//!
//! Any failure moves to `ErrorResponded`: the error is logged in full and the
//! caller only ever sees the generic 500. Every step runs within the
//! invocation timeout. Once `Connected` is reached the session is released
//! exactly once, whatever happens to the query, including when the
//! invocation future itself is dropped.

use aurora_secrets::{SecretPayload, SecretStore, SecretStoreError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::HandlerConfig;
use crate::db::{ConnectParams, Connector, DbError, Session};
use crate::env::{EnvSource, ProcessEnv};
use crate::error::{HandlerError, Result};
use crate::response::ApiResponse;

/// States of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Start,
    EnvironmentResolved,
    SecretRetrieved,
    PayloadValidated,
    Connected,
    QueryExecuted,
    Disconnected,
    Responded,
    ErrorResponded,
}

impl HandlerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::EnvironmentResolved => "environment_resolved",
            Self::SecretRetrieved => "secret_retrieved",
            Self::PayloadValidated => "payload_validated",
            Self::Connected => "connected",
            Self::QueryExecuted => "query_executed",
            Self::Disconnected => "disconnected",
            Self::Responded => "responded",
            Self::ErrorResponded => "error_responded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Responded | Self::ErrorResponded)
    }
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one invocation, with the states it passed through.
#[derive(Debug)]
pub struct Invocation {
    pub response: ApiResponse,
    pub states: Vec<HandlerState>,
    /// The error behind an `ErrorResponded` outcome. Never sent to the caller.
    pub failure: Option<HandlerError>,
}

impl Invocation {
    pub fn final_state(&self) -> HandlerState {
        self.states
            .last()
            .copied()
            .unwrap_or(HandlerState::Start)
    }

    /// Last state reached before the invocation failed.
    pub fn failed_in(&self) -> Option<HandlerState> {
        if self.failure.is_none() {
            return None;
        }
        self.states
            .iter()
            .rev()
            .find(|s| !s.is_terminal())
            .copied()
    }
}

/// Runtime query handler.
///
/// Holds only shared, stateless clients; concurrent invocations on one
/// handler share nothing mutable.
pub struct QueryHandler {
    env: Arc<dyn EnvSource>,
    secrets: Arc<dyn SecretStore>,
    connector: Arc<dyn Connector>,
    config: HandlerConfig,
}

impl QueryHandler {
    /// Create a handler reading the process environment.
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        connector: Arc<dyn Connector>,
        config: HandlerConfig,
    ) -> Self {
        Self {
            env: Arc::new(ProcessEnv),
            secrets,
            connector,
            config,
        }
    }

    /// Read invocation variables from `env` instead of the process.
    pub fn with_env(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Handle one invocation.
    pub async fn handle(&self) -> ApiResponse {
        self.invoke().await.response
    }

    /// Handle one invocation and report the visited states.
    pub async fn invoke(&self) -> Invocation {
        let mut states = vec![HandlerState::Start];

        match self.run(&mut states).await {
            Ok(timestamp) => {
                states.push(HandlerState::Responded);
                info!(timestamp = %timestamp, "Invocation succeeded");
                Invocation {
                    response: ApiResponse::ok(&timestamp),
                    states,
                    failure: None,
                }
            }
            Err(err) => {
                let failed_in = states.last().copied().unwrap_or(HandlerState::Start);
                error!(
                    error = %err,
                    cause = %cause_chain(&err),
                    state = %failed_in,
                    "Invocation failed"
                );
                states.push(HandlerState::ErrorResponded);
                Invocation {
                    response: ApiResponse::internal_error(),
                    states,
                    failure: Some(err),
                }
            }
        }
    }

    async fn run(&self, states: &mut Vec<HandlerState>) -> Result<String> {
        let deadline = Instant::now() + self.config.invocation_timeout;

        let var = &self.config.secret_env_var;
        let secret_id = self
            .env
            .var(var)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| HandlerError::Configuration(format!("{} is not set", var)))?;
        states.push(HandlerState::EnvironmentResolved);

        let retrieval = self.secrets.retrieve(&secret_id);
        let raw = match tokio::time::timeout(remaining(deadline), retrieval).await {
            Ok(result) => result,
            Err(_) => Err(SecretStoreError::Unavailable(format!(
                "no response within {:?}",
                self.config.invocation_timeout
            ))),
        }
        .map_err(|source| HandlerError::Retrieval {
            secret_id: secret_id.clone(),
            source,
        })?;
        states.push(HandlerState::SecretRetrieved);
        debug!(secret_id = %secret_id, store = self.secrets.store_type(), "Secret retrieved");

        let payload =
            SecretPayload::parse_with_fallback(&raw, self.config.default_dbname.as_deref())?;
        states.push(HandlerState::PayloadValidated);

        let params = ConnectParams::from(&payload);
        let connect_limit = self.config.connect_timeout.min(remaining(deadline));
        let session = bounded(connect_limit, self.connector.connect(&params))
            .await
            .map_err(HandlerError::Connection)?;
        let mut session = SessionGuard::new(session, self.config.connect_timeout);
        states.push(HandlerState::Connected);
        debug!(host = %params.host, port = params.port, dbname = %params.dbname, "Session opened");

        let query_limit = self.config.query_timeout.min(remaining(deadline));
        let result = bounded(query_limit, session.current_time()).await;
        if result.is_ok() {
            states.push(HandlerState::QueryExecuted);
        }

        session.release().await;

        let timestamp = result.map_err(HandlerError::Query)?;
        states.push(HandlerState::Disconnected);
        Ok(timestamp)
    }
}

/// Open session that is closed on every path.
///
/// `release` closes it in place. Dropping an unreleased guard, as happens
/// when the invocation future is cancelled, closes it on a spawned task.
struct SessionGuard {
    session: Option<Box<dyn Session>>,
    close_timeout: Duration,
}

impl SessionGuard {
    fn new(session: Box<dyn Session>, close_timeout: Duration) -> Self {
        Self {
            session: Some(session),
            close_timeout,
        }
    }

    async fn current_time(&mut self) -> std::result::Result<String, DbError> {
        match self.session.as_mut() {
            Some(session) => session.current_time().await,
            None => Err(DbError::Query("session already released".to_string())),
        }
    }

    async fn release(mut self) {
        if let Some(session) = self.session.take() {
            close(session, self.close_timeout).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!("Invocation cancelled with an open session, releasing in background");
                runtime.spawn(close(session, self.close_timeout));
            }
            Err(_) => warn!("No runtime available to release database session"),
        }
    }
}

/// Close `session`. Failures are logged and never replace the query outcome.
async fn close(session: Box<dyn Session>, limit: Duration) {
    match bounded(limit, session.close()).await {
        Ok(()) => debug!("Session released"),
        Err(e) => warn!(error = %e, "Failed to release database session"),
    }
}

/// Time left until `deadline`, zero once it has passed.
fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Bound `fut` by `limit`, mapping expiry to [`DbError::Timeout`].
async fn bounded<T, F>(limit: Duration, fut: F) -> std::result::Result<T, DbError>
where
    F: std::future::Future<Output = std::result::Result<T, DbError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DbError::Timeout(limit)),
    }
}

/// Source chain of `err`, outermost first.
fn cause_chain(err: &dyn std::error::Error) -> String {
    let mut causes = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    if causes.is_empty() {
        "none".to_string()
    } else {
        causes.join(": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockConnector;

    #[test]
    fn test_cause_chain_follows_sources() {
        let err = HandlerError::Retrieval {
            secret_id: "arn:x".to_string(),
            source: SecretStoreError::NotFound("arn:x".to_string()),
        };

        assert_eq!(cause_chain(&err), "secret not found: arn:x");
        assert_eq!(
            cause_chain(&HandlerError::Configuration("x".to_string())),
            "none"
        );
    }

    #[test]
    fn test_failed_in_skips_terminal_state() {
        let invocation = Invocation {
            response: ApiResponse::internal_error(),
            states: vec![
                HandlerState::Start,
                HandlerState::EnvironmentResolved,
                HandlerState::ErrorResponded,
            ],
            failure: Some(HandlerError::MissingField { field: "host" }),
        };

        assert_eq!(invocation.final_state(), HandlerState::ErrorResponded);
        assert_eq!(invocation.failed_in(), Some(HandlerState::EnvironmentResolved));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_maps_expiry_to_timeout() {
        let limit = Duration::from_millis(50);
        let result: std::result::Result<(), DbError> = bounded(limit, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(DbError::Timeout(d)) if d == limit));
    }

    #[tokio::test]
    async fn test_dropped_guard_releases_session() {
        let connector = MockConnector::new("2024-01-01T00:00:00Z");
        let params = ConnectParams {
            host: "db.example".to_string(),
            port: 5432,
            username: "u".to_string(),
            password: "p".to_string(),
            dbname: "serverless".to_string(),
        };

        let session = connector.connect(&params).await.unwrap();
        drop(SessionGuard::new(session, Duration::from_secs(1)));

        for _ in 0..10 {
            if connector.close_count() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(connector.close_count(), 1);
        assert_eq!(connector.leaked_count(), 0);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_released_guard_closes_once() {
        let connector = MockConnector::new("2024-01-01T00:00:00Z");
        let params = ConnectParams {
            host: "db.example".to_string(),
            port: 5432,
            username: "u".to_string(),
            password: "p".to_string(),
            dbname: "serverless".to_string(),
        };

        let session = connector.connect(&params).await.unwrap();
        let guard = SessionGuard::new(session, Duration::from_secs(1));
        guard.release().await;
        tokio::task::yield_now().await;

        assert_eq!(connector.close_count(), 1);
        assert_eq!(connector.leaked_count(), 0);
    }
}
