// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource provider module - backends that realize resource declarations.

pub mod memory;
mod traits;

pub use memory::InMemoryProvider;
pub use traits::*;
