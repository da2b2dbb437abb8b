// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query-adaptive retrieval: score every candidate fact and select a
//! token-bounded subset.
//!
//! Pure and synchronous; the pipeline fetches candidates from the store
//! and hands them in by value.

use chrono::{DateTime, Utc};
use strata_config::RetrievalConfig;
use strata_core::{AtomicFact, StrataError};
use tracing::debug;

use crate::query::{
    analyze_query, classify_complexity, strategy_for, QueryAnalysis, RetrievalStrategy,
    ScoringWeights,
};

/// Queries longer than this are rejected as invalid.
const MAX_QUERY_CHARS: usize = 1000;

/// Relevance assigned to parents pulled in for context.
const PARENT_RELEVANCE: f64 = 0.5;

const RECENCY_HORIZON_DAYS: i64 = 90;

/// A selected fact with its relevance and human-readable match reasons.
#[derive(Debug, Clone)]
pub struct ScoredFact {
    pub fact: AtomicFact,
    pub relevance: f64,
    pub reasons: Vec<String>,
}

/// The retrieval answer: selected facts plus how they were chosen.
#[derive(Debug)]
pub struct RetrievalResult {
    pub facts: Vec<ScoredFact>,
    pub strategy: RetrievalStrategy,
    pub analysis: QueryAnalysis,
    /// Estimated tokens across the selected statements.
    pub total_tokens: usize,
    /// Candidates considered after the consolidated-facts filter.
    pub candidate_count: usize,
    /// Candidate tokens / selected tokens; 0 when nothing was selected.
    pub compression_ratio: f64,
}

/// Scores and selects facts for a query.
pub struct Retriever {
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    /// Run the full retrieval flow over the given candidates.
    ///
    /// `now` is injected so relevance is deterministic under test clocks.
    pub fn search(
        &self,
        query: &str,
        all_facts: &[AtomicFact],
        now: DateTime<Utc>,
    ) -> Result<RetrievalResult, StrataError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(StrataError::QueryInvalid("query is empty".to_string()));
        }
        if trimmed.chars().count() > MAX_QUERY_CHARS {
            return Err(StrataError::QueryInvalid(format!(
                "query exceeds {MAX_QUERY_CHARS} characters"
            )));
        }

        let analysis = analyze_query(trimmed);
        let complexity = classify_complexity(&analysis);
        let strategy = strategy_for(complexity, &self.config);

        // Prefer consolidated abstractions when the strategy asks for them
        // and any exist; otherwise fall back to the full set.
        let has_consolidated = all_facts.iter().any(AtomicFact::is_consolidated);
        let candidates: Vec<&AtomicFact> = if strategy.prefer_consolidated && has_consolidated {
            all_facts.iter().filter(|f| f.is_consolidated()).collect()
        } else {
            all_facts.iter().collect()
        };
        let candidate_count = candidates.len();

        let mut scored: Vec<ScoredFact> = candidates
            .iter()
            .map(|fact| {
                let (relevance, reasons) =
                    score_fact(fact, &analysis, &strategy.weights, now);
                ScoredFact {
                    fact: (*fact).clone(),
                    relevance,
                    reasons,
                }
            })
            .collect();
        scored.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Greedy selection under both the fact cap and the token budget.
        let mut selected: Vec<ScoredFact> = Vec::new();
        let mut total_tokens = 0usize;
        for candidate in scored {
            if selected.len() >= strategy.max_facts {
                break;
            }
            let tokens = self.fact_tokens(&candidate.fact);
            if total_tokens + tokens > strategy.max_tokens {
                continue;
            }
            total_tokens += tokens;
            selected.push(candidate);
        }

        if self.config.include_parents {
            self.append_parents(&mut selected, &mut total_tokens, all_facts, &strategy);
        }

        let candidate_tokens: usize = candidates
            .iter()
            .map(|fact| self.fact_tokens(fact))
            .sum();
        let compression_ratio = if total_tokens == 0 {
            0.0
        } else {
            candidate_tokens as f64 / total_tokens as f64
        };

        debug!(
            complexity = strategy.complexity.as_str(),
            selected = selected.len(),
            total_tokens,
            candidate_count,
            "query served"
        );

        Ok(RetrievalResult {
            facts: selected,
            strategy,
            analysis,
            total_tokens,
            candidate_count,
            compression_ratio,
        })
    }

    /// Append each selected fact's parent when it still fits the budget.
    ///
    /// The parent of `f` is the level `f.level + 1` fact whose source list
    /// contains `f`.
    fn append_parents(
        &self,
        selected: &mut Vec<ScoredFact>,
        total_tokens: &mut usize,
        all_facts: &[AtomicFact],
        strategy: &RetrievalStrategy,
    ) {
        let mut index = 0;
        while index < selected.len() {
            if selected.len() >= strategy.max_facts {
                break;
            }
            let child = selected[index].fact.clone();
            index += 1;

            let parent = all_facts.iter().find(|p| {
                p.level == child.level + 1 && p.source_fact_ids.iter().any(|id| id == &child.id)
            });
            let Some(parent) = parent else { continue };
            if selected.iter().any(|s| s.fact.id == parent.id) {
                continue;
            }
            let tokens = self.fact_tokens(parent);
            if *total_tokens + tokens > strategy.max_tokens {
                continue;
            }
            *total_tokens += tokens;
            selected.push(ScoredFact {
                fact: parent.clone(),
                relevance: PARENT_RELEVANCE,
                reasons: vec!["parent fact for context".to_string()],
            });
        }
    }

    fn fact_tokens(&self, fact: &AtomicFact) -> usize {
        let chars = fact.statement.chars().count();
        chars.div_ceil(self.config.chars_per_token.max(1))
    }
}

/// Score one candidate against the analysis; returns relevance and reasons.
fn score_fact(
    fact: &AtomicFact,
    analysis: &QueryAnalysis,
    weights: &ScoringWeights,
    now: DateTime<Utc>,
) -> (f64, Vec<String>) {
    let mut relevance = 0.0;
    let mut reasons = Vec::new();

    // Keywords: fraction of query keywords found on the fact.
    if !analysis.keywords.is_empty() {
        let statement = fact.statement.to_lowercase();
        let fact_keywords: Vec<String> =
            fact.keywords.iter().map(|k| k.to_lowercase()).collect();
        let matching: Vec<&String> = analysis
            .keywords
            .iter()
            .filter(|kw| fact_keywords.contains(kw) || statement.contains(kw.as_str()))
            .collect();
        if !matching.is_empty() {
            relevance +=
                matching.len() as f64 / analysis.keywords.len() as f64 * weights.keyword;
            reasons.push(format!(
                "matched keywords: {}",
                matching
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
    }

    // Entities: fraction of query entities found among the fact's
    // entities or persons.
    let fact_names: Vec<String> = fact
        .entities
        .iter()
        .chain(fact.persons.iter())
        .map(|e| e.to_lowercase())
        .collect();
    let matching_entities: Vec<&String> = analysis
        .entities
        .iter()
        .filter(|e| fact_names.contains(&e.to_lowercase()))
        .collect();
    if !matching_entities.is_empty() {
        relevance += matching_entities.len() as f64 / analysis.entities.len().max(1) as f64
            * weights.entity;
        reasons.push(format!(
            "matched entities: {}",
            matching_entities
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    // Topic containment.
    if let Some(topic) = &fact.topic {
        let topic = topic.to_lowercase();
        if analysis.topics.iter().any(|t| topic.contains(t.as_str())) {
            relevance += weights.topic;
            reasons.push(format!("topic match: {topic}"));
        }
    }

    // Temporal: only for temporal queries against dated facts.
    if analysis.temporal
        && let Some(ts) = fact.timestamp
    {
        let age_days = (now - ts).num_days();
        if (0..=7).contains(&age_days) {
            relevance += weights.temporal;
            reasons.push("recent event (within 7 days)".to_string());
        } else if (0..=30).contains(&age_days) {
            relevance += weights.temporal * 0.5;
            reasons.push("recent event (within 30 days)".to_string());
        }
    }

    // Recency of extraction, linear decay over the horizon.
    let age_days = (now - fact.extracted_at).num_days() as f64;
    let recency = (1.0 - age_days / RECENCY_HORIZON_DAYS as f64).max(0.0);
    if recency > 0.0 {
        relevance += recency * weights.recency;
    }

    (relevance, reasons)
}
