// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Strata memory engine.
//!
//! All rows live in three tables: `atomic_facts`, `conversation_windows`,
//! and `compression_stats`. Writes are serialized through tokio-rusqlite's
//! single background thread; batch writes run inside one transaction and
//! either commit fully or roll back fully. Readers never observe a
//! partially committed batch.
//!
//! - **Database**: connection lifecycle, PRAGMA setup, error mapping
//! - **schema**: embedded DDL applied on open
//! - **queries**: typed query modules per table
//! - **MemoryStore**: the facade every other component talks to

pub mod database;
pub mod queries;
pub mod schema;
pub mod store;

pub use database::Database;
pub use store::MemoryStore;
