// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table, plus shared column codecs.
//!
//! Every function takes `&Database` and runs its closure on the single
//! writer thread. Multi-row writes open an explicit transaction.

pub mod facts;
pub mod stats;
pub mod windows;

use chrono::{DateTime, TimeZone, Utc};

/// Serialize a string set for a JSON column.
pub(crate) fn set_to_json(set: &[String]) -> String {
    serde_json::to_string(set).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a JSON column back into a string set.
pub(crate) fn json_to_set(idx: usize, raw: &str) -> Result<Vec<String>, rusqlite::Error> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse an epoch-milliseconds column into an instant.
pub(crate) fn millis_to_instant(idx: usize, ms: i64) -> Result<DateTime<Utc>, rusqlite::Error> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Integer,
            format!("epoch millis out of range: {ms}").into(),
        )
    })
}

/// Parse an RFC 3339 column into an instant.
pub(crate) fn rfc3339_to_instant(
    idx: usize,
    raw: &str,
) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}
