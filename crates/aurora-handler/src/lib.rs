// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Aurora Handler - runtime query handler for the serverless Postgres stack.
//!
//! Each invocation reads the runtime secret identifier from its environment,
//! retrieves and validates the secret, opens one database session, runs
//! `SELECT NOW()`, releases the session and answers with an API Gateway
//! proxy-style response.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`handler`] | Invocation state machine |
//! | [`db`] | Connector trait, Postgres and mock connectors |
//! | [`response`] | Proxy integration response |
//! | [`server`] | axum HTTP surface |
//! | [`env`] | Invocation environment source |
//! | [`config`] | Environment configuration |
//!
//! # Failure handling
//!
//! Every failure is logged with its cause chain and the state it happened in.
//! The caller always receives the same body:
//!
//! ```json
//! {"message": "Internal Server Error"}
//! ```

pub mod config;
pub mod db;
pub mod env;
pub mod error;
pub mod handler;
pub mod response;
pub mod server;

pub use config::{ConfigError, HandlerConfig};
pub use db::{ConnectParams, Connector, DbError, MockConnector, PgConnector, Session};
pub use env::{EnvSource, ProcessEnv};
pub use error::{HandlerError, Result};
pub use handler::{HandlerState, Invocation, QueryHandler};
pub use response::ApiResponse;
