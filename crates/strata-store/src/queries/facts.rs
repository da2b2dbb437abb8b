// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic fact CRUD and selectors.

use std::collections::BTreeMap;

use rusqlite::params;
use strata_core::{AtomicFact, StrataError};

use crate::database::{map_tr_err, Database};
use crate::queries::{json_to_set, millis_to_instant, rfc3339_to_instant, set_to_json};

const FACT_COLUMNS: &str = "id, statement, keywords, persons, entities, topic, timestamp, \
     location, source_window_id, source_chunk_id, source_session_file, confidence, entropy, \
     extracted_at, level, parent_id, source_fact_ids";

const UPSERT_FACT: &str = "INSERT INTO atomic_facts (id, statement, keywords, persons, entities, \
     topic, timestamp, location, source_window_id, source_chunk_id, source_session_file, \
     confidence, entropy, extracted_at, level, parent_id, source_fact_ids) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17) \
     ON CONFLICT(id) DO UPDATE SET statement = excluded.statement, \
     keywords = excluded.keywords, persons = excluded.persons, entities = excluded.entities, \
     topic = excluded.topic, timestamp = excluded.timestamp, location = excluded.location, \
     source_window_id = excluded.source_window_id, source_chunk_id = excluded.source_chunk_id, \
     source_session_file = excluded.source_session_file, confidence = excluded.confidence, \
     entropy = excluded.entropy, extracted_at = excluded.extracted_at, level = excluded.level, \
     parent_id = excluded.parent_id, source_fact_ids = excluded.source_fact_ids";

fn bind_fact(stmt: &mut rusqlite::Statement<'_>, fact: &AtomicFact) -> Result<(), rusqlite::Error> {
    stmt.execute(params![
        fact.id,
        fact.statement,
        set_to_json(&fact.keywords),
        set_to_json(&fact.persons),
        set_to_json(&fact.entities),
        fact.topic,
        fact.timestamp.map(|t| t.to_rfc3339()),
        fact.location,
        fact.source_window_id,
        fact.source_chunk_id,
        fact.source_session_file,
        fact.confidence,
        fact.entropy,
        fact.extracted_at.timestamp_millis(),
        fact.level,
        fact.parent_cluster_id,
        if fact.source_fact_ids.is_empty() {
            None
        } else {
            Some(set_to_json(&fact.source_fact_ids))
        },
    ])?;
    Ok(())
}

fn row_to_fact(row: &rusqlite::Row<'_>) -> Result<AtomicFact, rusqlite::Error> {
    let keywords: String = row.get(2)?;
    let persons: String = row.get(3)?;
    let entities: String = row.get(4)?;
    let timestamp: Option<String> = row.get(6)?;
    let extracted_at: i64 = row.get(13)?;
    let source_fact_ids: Option<String> = row.get(16)?;

    Ok(AtomicFact {
        id: row.get(0)?,
        statement: row.get(1)?,
        keywords: json_to_set(2, &keywords)?,
        persons: json_to_set(3, &persons)?,
        entities: json_to_set(4, &entities)?,
        topic: row.get(5)?,
        timestamp: timestamp.map(|t| rfc3339_to_instant(6, &t)).transpose()?,
        location: row.get(7)?,
        source_window_id: row.get(8)?,
        source_chunk_id: row.get(9)?,
        source_session_file: row.get(10)?,
        confidence: row.get(11)?,
        entropy: row.get(12)?,
        extracted_at: millis_to_instant(13, extracted_at)?,
        level: row.get(14)?,
        parent_cluster_id: row.get(15)?,
        source_fact_ids: source_fact_ids
            .map(|s| json_to_set(16, &s))
            .transpose()?
            .unwrap_or_default(),
    })
}

/// Idempotent single-fact upsert keyed by id.
pub async fn put_fact(db: &Database, fact: &AtomicFact) -> Result<(), StrataError> {
    let fact = fact.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(UPSERT_FACT)?;
            bind_fact(&mut stmt, &fact)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Upsert a batch of facts in one transaction: all commit or none do.
pub async fn put_facts(db: &Database, facts: &[AtomicFact]) -> Result<(), StrataError> {
    if facts.is_empty() {
        return Ok(());
    }
    let facts = facts.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(UPSERT_FACT)?;
                for fact in &facts {
                    bind_fact(&mut stmt, fact)?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a fact by id.
pub async fn get_fact(db: &Database, id: &str) -> Result<Option<AtomicFact>, StrataError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare_cached(&format!("SELECT {FACT_COLUMNS} FROM atomic_facts WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_fact) {
                Ok(fact) => Ok(Some(fact)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Up to `limit` facts ordered by `extracted_at` descending.
pub async fn get_recent_facts(db: &Database, limit: usize) -> Result<Vec<AtomicFact>, StrataError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {FACT_COLUMNS} FROM atomic_facts ORDER BY extracted_at DESC LIMIT ?1"
            ))?;
            let facts = stmt
                .query_map(params![limit as i64], row_to_fact)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(facts)
        })
        .await
        .map_err(map_tr_err)
}

/// All facts at exactly level `level`.
pub async fn get_facts_by_level(db: &Database, level: u32) -> Result<Vec<AtomicFact>, StrataError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {FACT_COLUMNS} FROM atomic_facts WHERE level = ?1 ORDER BY extracted_at"
            ))?;
            let facts = stmt
                .query_map(params![level], row_to_fact)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(facts)
        })
        .await
        .map_err(map_tr_err)
}

/// Every stored fact, all levels.
pub async fn get_all_facts(db: &Database) -> Result<Vec<AtomicFact>, StrataError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {FACT_COLUMNS} FROM atomic_facts ORDER BY extracted_at"
            ))?;
            let facts = stmt
                .query_map([], row_to_fact)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(facts)
        })
        .await
        .map_err(map_tr_err)
}

/// Fact counts grouped by consolidation level.
pub async fn count_by_level(db: &Database) -> Result<BTreeMap<u32, i64>, StrataError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn
                .prepare_cached("SELECT level, count(*) FROM atomic_facts GROUP BY level ORDER BY level")?;
            let mut counts = BTreeMap::new();
            let rows = stmt.query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?)))?;
            for row in rows {
                let (level, count) = row?;
                counts.insert(level, count);
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}
