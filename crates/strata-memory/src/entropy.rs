// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entropy filtering: decide which windows are worth an extraction call.
//!
//! Entropy blends two signals: entity novelty (capitalised runs not yet
//! known to memory, normalised by sqrt of window length) and semantic
//! divergence (1 - cosine against the previous-context embedding, or a
//! constant 0.5 fallback when no embeddings are supplied). Pure functions
//! only; no LLM calls, no suspension points.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use strata_config::CompressionConfig;
use strata_core::{AtomicFact, ConversationWindow};

/// Divergence used when either embedding is missing.
const DEFAULT_DIVERGENCE: f64 = 0.5;

static ENTITY_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z][a-z]+(?: [A-Z][a-z]+)*").expect("entity regex is valid")
});

/// Unique capitalised token runs in `text`, first-seen order.
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut entities = Vec::new();
    for m in ENTITY_RUN.find_iter(text) {
        let run = m.as_str();
        if seen.insert(run.to_lowercase()) {
            entities.push(run.to_string());
        }
    }
    entities
}

/// Cosine similarity between two vectors; 0 when either has zero norm or
/// the dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// One window's filter verdict.
#[derive(Debug, Clone)]
pub struct WindowScore {
    /// Entities in the window that prior memory does not know about.
    pub new_entities: Vec<String>,
    /// `|new_entities| / sqrt(content chars)`; 0 for empty windows.
    pub entity_novelty: f64,
    /// `1 - cosine(window, previous)` or the constant fallback.
    pub semantic_divergence: f64,
    /// Weighted blend of novelty and divergence.
    pub entropy: f64,
    /// `entropy >= entropy_threshold`; ties keep the window.
    pub should_keep: bool,
}

/// Score one window against prior memory.
///
/// `window_embedding` / `previous_embedding` are optional; divergence falls
/// back to a constant when either is absent.
pub fn score_window(
    window: &ConversationWindow,
    previous_facts: &[AtomicFact],
    window_embedding: Option<&[f32]>,
    previous_embedding: Option<&[f32]>,
    config: &CompressionConfig,
) -> WindowScore {
    let known: HashSet<String> = previous_facts
        .iter()
        .flat_map(|f| f.entities.iter().chain(f.persons.iter()))
        .map(|e| e.to_lowercase())
        .collect();

    let mut window_entities = Vec::new();
    let mut seen = HashSet::new();
    for turn in &window.turns {
        for entity in extract_entities(&turn.content) {
            if seen.insert(entity.to_lowercase()) {
                window_entities.push(entity);
            }
        }
        if seen.insert(turn.speaker.to_lowercase()) {
            window_entities.push(turn.speaker.clone());
        }
    }

    let new_entities: Vec<String> = window_entities
        .into_iter()
        .filter(|e| !known.contains(&e.to_lowercase()))
        .collect();

    let content_len = window.content_len();
    let entity_novelty = if content_len == 0 {
        0.0
    } else {
        new_entities.len() as f64 / (content_len as f64).sqrt()
    };

    let semantic_divergence = match (window_embedding, previous_embedding) {
        (Some(w), Some(p)) => 1.0 - cosine_similarity(w, p),
        _ => DEFAULT_DIVERGENCE,
    };

    let entropy =
        config.entity_weight * entity_novelty + config.divergence_weight * semantic_divergence;

    WindowScore {
        new_entities,
        entity_novelty,
        semantic_divergence,
        entropy,
        should_keep: entropy >= config.entropy_threshold,
    }
}
