// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Postgres connector backed by a single `sqlx` connection.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::debug;

use super::traits::*;

const CURRENT_TIME_SQL: &str = "SELECT NOW()";

/// Opens one unpooled Postgres connection per invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

impl PgConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for PgConnector {
    fn connector_type(&self) -> &'static str {
        "postgres"
    }

    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Session>> {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .username(&params.username)
            .password(&params.password)
            .database(&params.dbname);

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| DbError::Connect(e.to_string()))?;

        debug!(
            host = %params.host,
            port = params.port,
            dbname = %params.dbname,
            "Postgres session opened"
        );
        Ok(Box::new(PgSession { conn }))
    }
}

struct PgSession {
    conn: PgConnection,
}

#[async_trait]
impl Session for PgSession {
    async fn current_time(&mut self) -> Result<String> {
        let now: DateTime<Utc> = sqlx::query_scalar(CURRENT_TIME_SQL)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(now.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| DbError::Close(e.to_string()))
    }
}
