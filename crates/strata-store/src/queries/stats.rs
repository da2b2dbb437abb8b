// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compression stat rows (append-only).

use rusqlite::params;
use strata_core::{CompressionStat, StrataError};

use crate::database::{map_tr_err, Database};
use crate::queries::millis_to_instant;

/// Append one stat row (idempotent on id for crash-replay safety).
pub async fn put_stat(db: &Database, stat: &CompressionStat) -> Result<(), StrataError> {
    let stat = stat.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO compression_stats \
                 (id, input_tokens, output_facts, compression_ratio, entropy_score, \
                  processing_time_ms, created_at, source_session_file) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
                 ON CONFLICT(id) DO NOTHING",
                params![
                    stat.id,
                    stat.input_tokens,
                    stat.output_facts,
                    stat.compression_ratio,
                    stat.entropy_score,
                    stat.processing_time_ms,
                    stat.created_at.timestamp_millis(),
                    stat.source_session_file,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mean compression ratio over all stat rows; 0 when there are none.
pub async fn avg_compression_ratio(db: &Database) -> Result<f64, StrataError> {
    db.connection()
        .call(|conn| {
            let avg: Option<f64> = conn.query_row(
                "SELECT avg(compression_ratio) FROM compression_stats",
                [],
                |row| row.get(0),
            )?;
            Ok(avg.unwrap_or(0.0))
        })
        .await
        .map_err(map_tr_err)
}

/// Number of stat rows.
pub async fn count_stats(db: &Database) -> Result<i64, StrataError> {
    db.connection()
        .call(|conn| {
            let n = conn.query_row("SELECT count(*) FROM compression_stats", [], |row| row.get(0))?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent stat rows, newest first.
pub async fn recent_stats(db: &Database, limit: usize) -> Result<Vec<CompressionStat>, StrataError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, input_tokens, output_facts, compression_ratio, entropy_score, \
                 processing_time_ms, created_at, source_session_file \
                 FROM compression_stats ORDER BY created_at DESC LIMIT ?1",
            )?;
            let stats = stmt
                .query_map(params![limit as i64], |row| {
                    let created_at: i64 = row.get(6)?;
                    Ok(CompressionStat {
                        id: row.get(0)?,
                        input_tokens: row.get(1)?,
                        output_facts: row.get(2)?,
                        compression_ratio: row.get(3)?,
                        entropy_score: row.get(4)?,
                        processing_time_ms: row.get(5)?,
                        created_at: millis_to_instant(6, created_at)?,
                        source_session_file: row.get(7)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(stats)
        })
        .await
        .map_err(map_tr_err)
}
