// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema bootstrap.
//!
//! The schema is a single version applied idempotently on every open; all
//! statements use IF NOT EXISTS. Set-valued columns (`keywords`, `persons`,
//! `entities`, `turns`, `source_fact_ids`) are JSON text. Instants are
//! epoch milliseconds; fact timestamps are RFC 3339 text so range scans
//! stay lexicographic.

/// Apply the full schema to a connection.
pub fn apply(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS atomic_facts (
    id TEXT PRIMARY KEY NOT NULL,
    statement TEXT NOT NULL,
    keywords TEXT NOT NULL DEFAULT '[]',
    persons TEXT NOT NULL DEFAULT '[]',
    entities TEXT NOT NULL DEFAULT '[]',
    topic TEXT,
    timestamp TEXT,
    location TEXT,
    source_window_id TEXT,
    source_chunk_id TEXT,
    source_session_file TEXT,
    confidence REAL NOT NULL,
    entropy REAL,
    extracted_at INTEGER NOT NULL,
    level INTEGER NOT NULL DEFAULT 0,
    parent_id TEXT,
    source_fact_ids TEXT
);

CREATE INDEX IF NOT EXISTS idx_facts_level ON atomic_facts(level);
CREATE INDEX IF NOT EXISTS idx_facts_topic ON atomic_facts(topic);
CREATE INDEX IF NOT EXISTS idx_facts_timestamp ON atomic_facts(timestamp);
CREATE INDEX IF NOT EXISTS idx_facts_parent ON atomic_facts(parent_id);
CREATE INDEX IF NOT EXISTS idx_facts_extracted ON atomic_facts(extracted_at);

CREATE TABLE IF NOT EXISTS conversation_windows (
    id TEXT PRIMARY KEY NOT NULL,
    turns TEXT NOT NULL,
    start_index INTEGER NOT NULL,
    end_index INTEGER NOT NULL,
    entropy REAL,
    should_process INTEGER NOT NULL,
    processed_at INTEGER,
    source_session_file TEXT
);

CREATE INDEX IF NOT EXISTS idx_windows_processed ON conversation_windows(processed_at);

CREATE TABLE IF NOT EXISTS compression_stats (
    id TEXT PRIMARY KEY NOT NULL,
    input_tokens INTEGER NOT NULL,
    output_facts INTEGER NOT NULL,
    compression_ratio REAL NOT NULL,
    entropy_score REAL NOT NULL,
    processing_time_ms INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    source_session_file TEXT
);

CREATE INDEX IF NOT EXISTS idx_stats_created ON compression_stats(created_at);
";
