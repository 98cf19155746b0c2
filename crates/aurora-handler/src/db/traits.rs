// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connector trait definitions.

use async_trait::async_trait;
use aurora_secrets::SecretPayload;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DbError {
    /// The session could not be established.
    #[error("Connect failed: {0}")]
    Connect(String),

    /// The statement failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// The operation did not finish within its bound.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The session could not be released cleanly.
    #[error("Close failed: {0}")]
    Close(String),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;

/// Parameters for one database session.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub dbname: String,
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .finish()
    }
}

impl From<&SecretPayload> for ConnectParams {
    fn from(payload: &SecretPayload) -> Self {
        Self {
            host: payload.host.clone(),
            port: payload.port,
            username: payload.username.clone(),
            password: payload.password.clone(),
            dbname: payload.dbname.clone(),
        }
    }
}

/// Trait for database connectors.
///
/// Connectors are stateless factories shared across concurrent invocations.
/// Every call to [`Connector::connect`] opens a fresh session; nothing is
/// pooled.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connector type identifier (e.g., "postgres", "mock")
    fn connector_type(&self) -> &'static str;

    /// Open a session.
    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Session>>;
}

/// One open database session.
#[async_trait]
pub trait Session: Send {
    /// Run the fixed `SELECT NOW()` statement and return the server time.
    async fn current_time(&mut self) -> Result<String>;

    /// Release the session. Consumes it, so a session is released at most
    /// once.
    async fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_debug_redacts_password() {
        let params = ConnectParams {
            host: "db.example".to_string(),
            port: 5432,
            username: "u".to_string(),
            password: "hunter2".to_string(),
            dbname: "serverless".to_string(),
        };

        let debug = format!("{:?}", params);
        assert!(debug.contains("db.example"));
        assert!(!debug.contains("hunter2"));
    }
}
