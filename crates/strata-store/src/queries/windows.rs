// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation window rows.

use rusqlite::params;
use strata_core::{ConversationWindow, StrataError};

use crate::database::{map_tr_err, Database};
use crate::queries::millis_to_instant;

const WINDOW_COLUMNS: &str =
    "id, turns, start_index, end_index, entropy, should_process, processed_at, source_session_file";

const UPSERT_WINDOW: &str = "INSERT INTO conversation_windows \
     (id, turns, start_index, end_index, entropy, should_process, processed_at, source_session_file) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
     ON CONFLICT(id) DO UPDATE SET turns = excluded.turns, \
     start_index = excluded.start_index, end_index = excluded.end_index, \
     entropy = excluded.entropy, should_process = excluded.should_process, \
     processed_at = excluded.processed_at, source_session_file = excluded.source_session_file";

fn bind_window(
    stmt: &mut rusqlite::Statement<'_>,
    window: &ConversationWindow,
) -> Result<(), rusqlite::Error> {
    let turns = serde_json::to_string(&window.turns)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    stmt.execute(params![
        window.id,
        turns,
        window.start_index as i64,
        window.end_index as i64,
        window.entropy,
        window.should_process as i64,
        window.processed_at.map(|t| t.timestamp_millis()),
        window.source_session_file,
    ])?;
    Ok(())
}

fn row_to_window(row: &rusqlite::Row<'_>) -> Result<ConversationWindow, rusqlite::Error> {
    let turns_raw: String = row.get(1)?;
    let turns = serde_json::from_str(&turns_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let should_process: i64 = row.get(5)?;
    let processed_at: Option<i64> = row.get(6)?;

    Ok(ConversationWindow {
        id: row.get(0)?,
        turns,
        start_index: row.get::<_, i64>(2)? as usize,
        end_index: row.get::<_, i64>(3)? as usize,
        entropy: row.get(4)?,
        should_process: should_process != 0,
        processed_at: processed_at.map(|ms| millis_to_instant(6, ms)).transpose()?,
        source_session_file: row.get(7)?,
    })
}

/// Idempotent single-window upsert keyed by id.
pub async fn put_window(db: &Database, window: &ConversationWindow) -> Result<(), StrataError> {
    let window = window.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(UPSERT_WINDOW)?;
            bind_window(&mut stmt, &window)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Upsert a batch of windows in one transaction.
pub async fn put_windows(db: &Database, windows: &[ConversationWindow]) -> Result<(), StrataError> {
    if windows.is_empty() {
        return Ok(());
    }
    let windows = windows.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(UPSERT_WINDOW)?;
                for window in &windows {
                    bind_window(&mut stmt, window)?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a window by id.
pub async fn get_window(db: &Database, id: &str) -> Result<Option<ConversationWindow>, StrataError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {WINDOW_COLUMNS} FROM conversation_windows WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_window) {
                Ok(window) => Ok(Some(window)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All windows for one session file, in transcript order.
pub async fn get_windows_for_session(
    db: &Database,
    session_file: &str,
) -> Result<Vec<ConversationWindow>, StrataError> {
    let session_file = session_file.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {WINDOW_COLUMNS} FROM conversation_windows \
                 WHERE source_session_file = ?1 ORDER BY start_index"
            ))?;
            let windows = stmt
                .query_map(params![session_file], row_to_window)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(windows)
        })
        .await
        .map_err(map_tr_err)
}

/// Total number of stored windows.
pub async fn count_windows(db: &Database) -> Result<i64, StrataError> {
    db.connection()
        .call(|conn| {
            let n = conn.query_row("SELECT count(*) FROM conversation_windows", [], |row| {
                row.get(0)
            })?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}
