// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock connector for testing.
//!
//! Simulates sessions without a database and counts how sessions are opened
//! and released, so tests can assert that every session is closed exactly
//! once.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::traits::*;

#[derive(Default)]
struct Counters {
    connects: AtomicUsize,
    queries: AtomicUsize,
    closes: AtomicUsize,
    /// Sessions dropped without `close`
    leaks: AtomicUsize,
    open: AtomicUsize,
}

/// Mock connector for testing.
pub struct MockConnector {
    timestamp: String,
    /// If set, `connect` fails with this message
    pub connect_error: Option<String>,
    /// If set, `current_time` fails with this message
    pub query_error: Option<String>,
    /// If set, `close` fails with this message (the session is still released)
    pub close_error: Option<String>,
    /// Delay before `connect` completes
    pub connect_delay: Option<Duration>,
    /// Delay before `current_time` completes
    pub query_delay: Option<Duration>,
    counters: Arc<Counters>,
    last_params: Mutex<Option<ConnectParams>>,
}

impl MockConnector {
    /// Create a connector whose sessions report `timestamp`.
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            connect_error: None,
            query_error: None,
            close_error: None,
            connect_delay: None,
            query_delay: None,
            counters: Arc::new(Counters::default()),
            last_params: Mutex::new(None),
        }
    }

    /// Create a connector that refuses every connection.
    pub fn refusing(message: impl Into<String>) -> Self {
        Self {
            connect_error: Some(message.into()),
            ..Self::new("")
        }
    }

    pub fn with_query_error(mut self, message: impl Into<String>) -> Self {
        self.query_error = Some(message.into());
        self
    }

    pub fn with_close_error(mut self, message: impl Into<String>) -> Self {
        self.close_error = Some(message.into());
        self
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    /// Number of `connect` calls, including failed ones.
    pub fn connect_count(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.counters.queries.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// Sessions dropped without being closed.
    pub fn leaked_count(&self) -> usize {
        self.counters.leaks.load(Ordering::SeqCst)
    }

    /// Sessions opened and not yet released.
    pub fn open_sessions(&self) -> usize {
        self.counters.open.load(Ordering::SeqCst)
    }

    /// Parameters of the most recent `connect` call.
    pub async fn last_params(&self) -> Option<ConnectParams> {
        self.last_params.lock().await.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn connector_type(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Session>> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().await = Some(params.clone());

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.connect_error {
            return Err(DbError::Connect(message.clone()));
        }

        self.counters.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            timestamp: self.timestamp.clone(),
            query_error: self.query_error.clone(),
            close_error: self.close_error.clone(),
            query_delay: self.query_delay,
            counters: self.counters.clone(),
            released: false,
        }))
    }
}

struct MockSession {
    timestamp: String,
    query_error: Option<String>,
    close_error: Option<String>,
    query_delay: Option<Duration>,
    counters: Arc<Counters>,
    released: bool,
}

#[async_trait]
impl Session for MockSession {
    async fn current_time(&mut self) -> Result<String> {
        self.counters.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.query_error {
            Some(message) => Err(DbError::Query(message.clone())),
            None => Ok(self.timestamp.clone()),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut session = self;
        session.counters.closes.fetch_add(1, Ordering::SeqCst);
        session.released = true;
        session.counters.open.fetch_sub(1, Ordering::SeqCst);
        match &session.close_error {
            Some(message) => Err(DbError::Close(message.clone())),
            None => Ok(()),
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if !self.released {
            self.counters.leaks.fetch_add(1, Ordering::SeqCst);
            self.counters.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
