// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Database connector module - opens one session per invocation.

pub mod mock;
pub mod postgres;
mod traits;

pub use mock::MockConnector;
pub use postgres::PgConnector;
pub use traits::*;
