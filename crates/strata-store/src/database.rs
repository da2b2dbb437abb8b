// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes; the
//! [`Database`] struct IS the single writer.

use strata_core::{StoreErrorKind, StrataError};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::schema;

/// Owns the single SQLite connection for one agent's memory database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run the
    /// schema bootstrap.
    pub async fn open(path: &str) -> Result<Self, StrataError> {
        let conn = Connection::open(path).await.map_err(map_tr_err)?;
        Self::initialize(conn, path).await
    }

    /// Open a fresh in-memory database. Used by tests and ephemeral agents.
    pub async fn open_in_memory() -> Result<Self, StrataError> {
        let conn = Connection::open_in_memory().await.map_err(map_tr_err)?;
        Self::initialize(conn, ":memory:").await
    }

    async fn initialize(conn: Connection, path: &str) -> Result<Self, StrataError> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;",
            )?;
            schema::apply(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        debug!(path, "memory database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection. Query modules call through
    /// this; every closure runs on the single writer thread.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and release the connection.
    pub async fn close(&self) -> Result<(), StrataError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into [`StrataError::Store`], classifying the
/// failure kind so callers can distinguish conflicts and corruption from
/// plain I/O trouble.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> StrataError {
    let kind = match &e {
        tokio_rusqlite::Error::Rusqlite(re) => classify(re),
        _ => StoreErrorKind::Io,
    };
    StrataError::Store {
        kind,
        source: Box::new(e),
    }
}

fn classify(e: &rusqlite::Error) -> StoreErrorKind {
    match e {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            rusqlite::ErrorCode::ConstraintViolation
            | rusqlite::ErrorCode::DatabaseBusy
            | rusqlite::ErrorCode::DatabaseLocked => StoreErrorKind::Conflict,
            rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase => {
                StoreErrorKind::Corruption
            }
            _ => StoreErrorKind::Io,
        },
        // A stored JSON column that no longer parses is corruption, not I/O.
        rusqlite::Error::FromSqlConversionFailure(..) => StoreErrorKind::Corruption,
        _ => StoreErrorKind::Io,
    }
}
