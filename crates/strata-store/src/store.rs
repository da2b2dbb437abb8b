// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `MemoryStore` facade.
//!
//! Exclusively owns all persistent rows. Other components operate on copies
//! and re-write through this API; there is no shared mutable state outside
//! the single connection.

use std::collections::BTreeMap;

use strata_core::{AtomicFact, CompressionStat, ConversationWindow, StrataError};
use tracing::info;

use crate::database::{map_tr_err, Database};
use crate::queries::{facts, stats, windows};

/// Transactional store for windows, facts, and compression stats.
pub struct MemoryStore {
    db: Database,
}

impl MemoryStore {
    /// Wrap an already-opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open (or create) the store at `path`.
    pub async fn open(path: &str) -> Result<Self, StrataError> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open a fresh in-memory store.
    pub async fn open_in_memory() -> Result<Self, StrataError> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    // --- Facts ---

    /// Idempotent fact upsert.
    pub async fn put_fact(&self, fact: &AtomicFact) -> Result<(), StrataError> {
        facts::put_fact(&self.db, fact).await
    }

    /// Upsert N facts in one transaction; commits all or rolls back all.
    pub async fn put_facts(&self, batch: &[AtomicFact]) -> Result<(), StrataError> {
        facts::put_facts(&self.db, batch).await
    }

    /// Fact by id.
    pub async fn get_fact(&self, id: &str) -> Result<Option<AtomicFact>, StrataError> {
        facts::get_fact(&self.db, id).await
    }

    /// Up to `limit` facts, newest `extracted_at` first.
    pub async fn get_recent_facts(&self, limit: usize) -> Result<Vec<AtomicFact>, StrataError> {
        facts::get_recent_facts(&self.db, limit).await
    }

    /// All facts at exactly the given level.
    pub async fn get_facts_by_level(&self, level: u32) -> Result<Vec<AtomicFact>, StrataError> {
        facts::get_facts_by_level(&self.db, level).await
    }

    /// Every stored fact.
    pub async fn get_all_facts(&self) -> Result<Vec<AtomicFact>, StrataError> {
        facts::get_all_facts(&self.db).await
    }

    /// Fact counts grouped by level.
    pub async fn count_by_level(&self) -> Result<BTreeMap<u32, i64>, StrataError> {
        facts::count_by_level(&self.db).await
    }

    // --- Windows ---

    /// Idempotent window upsert.
    pub async fn put_window(&self, window: &ConversationWindow) -> Result<(), StrataError> {
        windows::put_window(&self.db, window).await
    }

    /// Upsert N windows in one transaction.
    pub async fn put_windows(&self, batch: &[ConversationWindow]) -> Result<(), StrataError> {
        windows::put_windows(&self.db, batch).await
    }

    /// Window by id.
    pub async fn get_window(&self, id: &str) -> Result<Option<ConversationWindow>, StrataError> {
        windows::get_window(&self.db, id).await
    }

    /// All windows from one session file, in transcript order.
    pub async fn get_windows_for_session(
        &self,
        session_file: &str,
    ) -> Result<Vec<ConversationWindow>, StrataError> {
        windows::get_windows_for_session(&self.db, session_file).await
    }

    /// Total stored windows.
    pub async fn count_windows(&self) -> Result<i64, StrataError> {
        windows::count_windows(&self.db).await
    }

    // --- Stats ---

    /// Append a compression stat row.
    pub async fn put_stat(&self, stat: &CompressionStat) -> Result<(), StrataError> {
        stats::put_stat(&self.db, stat).await
    }

    /// Mean compression ratio over all stat rows; 0 with no rows.
    pub async fn avg_compression_ratio(&self) -> Result<f64, StrataError> {
        stats::avg_compression_ratio(&self.db).await
    }

    /// Number of stat rows.
    pub async fn count_stats(&self) -> Result<i64, StrataError> {
        stats::count_stats(&self.db).await
    }

    /// Most recent stat rows, newest first.
    pub async fn recent_stats(&self, limit: usize) -> Result<Vec<CompressionStat>, StrataError> {
        stats::recent_stats(&self.db, limit).await
    }

    // --- Administrative ---

    /// Remove all memory rows in one transaction.
    pub async fn clear(&self) -> Result<(), StrataError> {
        self.db
            .connection()
            .call(|conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM atomic_facts", [])?;
                tx.execute("DELETE FROM conversation_windows", [])?;
                tx.execute("DELETE FROM compression_stats", [])?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        info!("memory store cleared");
        Ok(())
    }

    /// Checkpoint and release the connection.
    pub async fn close(&self) -> Result<(), StrataError> {
        self.db.close().await
    }
}
