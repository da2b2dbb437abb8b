// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types for the Strata memory engine.
//!
//! Comparison of keyword/person/entity sets is case-insensitive throughout;
//! the original casing of the first occurrence is preserved on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single turn in a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who spoke (a display name or role string).
    pub speaker: String,
    /// The turn's text content.
    pub content: String,
    /// Optional absolute instant of the turn.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A self-contained statement distilled from conversation.
///
/// `level` 0 facts are LLM-extracted from transcript windows; `level` k > 0
/// facts are consolidated from a cluster of lower-level facts and carry the
/// cluster id in `parent_cluster_id` plus their member ids in
/// `source_fact_ids`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomicFact {
    /// Unique identifier for this fact.
    pub id: String,
    /// Complete sentence with coreferences resolved and temporal
    /// expressions normalised; meaningful without the source conversation.
    pub statement: String,
    /// Keyword set (case-insensitive for comparison).
    pub keywords: Vec<String>,
    /// Person names mentioned.
    pub persons: Vec<String>,
    /// Non-person entities mentioned.
    pub entities: Vec<String>,
    /// Optional short topic label.
    pub topic: Option<String>,
    /// Optional absolute instant the fact refers to.
    pub timestamp: Option<DateTime<Utc>>,
    /// Optional free-text location.
    pub location: Option<String>,
    /// Extraction confidence in [0, 1]. A consolidated fact's confidence is
    /// the arithmetic mean of its sources'.
    pub confidence: f64,
    /// Entropy of the source window at extraction time.
    pub entropy: Option<f64>,
    /// Wall-clock instant of creation.
    pub extracted_at: DateTime<Utc>,
    /// Consolidation level: 0 = atomic, k > 0 = consolidated from level < k.
    pub level: u32,
    /// Id of the cluster this fact summarises. Present iff `level > 0`.
    pub parent_cluster_id: Option<String>,
    /// Ids of the source facts this fact was consolidated from.
    /// Present iff `level > 0`.
    pub source_fact_ids: Vec<String>,
    /// Provenance: window the fact was extracted from.
    pub source_window_id: Option<String>,
    /// Provenance: raw memory chunk, when known.
    pub source_chunk_id: Option<String>,
    /// Provenance: session file the transcript came from.
    pub source_session_file: Option<String>,
}

impl AtomicFact {
    /// True when this fact was consolidated from lower-level facts.
    pub fn is_consolidated(&self) -> bool {
        self.level > 0
    }
}

/// A contiguous slice of conversation turns, scored by the entropy filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationWindow {
    /// Deterministic id derived from the session file and turn indexes.
    pub id: String,
    /// The turns in this window, in transcript order.
    pub turns: Vec<ConversationTurn>,
    /// Position of the first turn in the source transcript (inclusive).
    pub start_index: usize,
    /// Position of the last turn in the source transcript (inclusive).
    pub end_index: usize,
    /// Last computed entropy score; `None` until filtering runs.
    pub entropy: Option<f64>,
    /// Final decision from the entropy filter.
    pub should_process: bool,
    /// When the window was persisted.
    pub processed_at: Option<DateTime<Utc>>,
    /// Session file the transcript came from.
    pub source_session_file: Option<String>,
}

impl ConversationWindow {
    /// Total characters of turn content, the novelty denominator basis.
    pub fn content_len(&self) -> usize {
        self.turns.iter().map(|t| t.content.chars().count()).sum()
    }
}

/// One row per `process_transcript` call: how much went in, how little
/// came out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionStat {
    /// Unique identifier for this stat row.
    pub id: String,
    /// Rough token estimate of the input transcript.
    pub input_tokens: i64,
    /// Number of facts the call produced.
    pub output_facts: i64,
    /// Source characters divided by output statement characters
    /// (0 when no facts were produced).
    pub compression_ratio: f64,
    /// Mean entropy over the call's windows.
    pub entropy_score: f64,
    /// Wall-clock duration of the call.
    pub processing_time_ms: i64,
    /// When the row was written.
    pub created_at: DateTime<Utc>,
    /// Session file the transcript came from.
    pub source_session_file: Option<String>,
}

/// Case-folded union of string sets, preserving the first-seen casing.
pub fn union_casefold<'a, I>(sets: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for set in sets {
        for item in set {
            if seen.insert(item.to_lowercase()) {
                out.push(item.clone());
            }
        }
    }
    out
}

/// Case-folded intersection across string sets, preserving the casing from
/// the first set. Empty input yields an empty intersection.
pub fn intersect_casefold(sets: &[&[String]]) -> Vec<String> {
    let Some((first, rest)) = sets.split_first() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for item in first.iter() {
        let folded = item.to_lowercase();
        if !seen.insert(folded.clone()) {
            continue;
        }
        let everywhere = rest
            .iter()
            .all(|set| set.iter().any(|other| other.to_lowercase() == folded));
        if everywhere {
            out.push(item.clone());
        }
    }
    out
}

/// Lowercases and collapses runs of whitespace to single spaces.
/// This is the statement identity used by deduplication.
pub fn normalize_statement(statement: &str) -> String {
    statement
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
