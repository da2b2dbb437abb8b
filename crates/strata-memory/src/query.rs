// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic query analysis and strategy selection. No LLM calls.

use strata_config::RetrievalConfig;

use crate::entropy::extract_entities;

/// Words ignored when collecting query keywords.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "with", "that", "this", "these", "those", "from",
    "have", "has", "had", "does", "did", "doing", "will", "would", "could", "should", "about",
    "into", "over", "under", "than", "then", "them", "they", "their", "there", "here", "what",
    "who", "whom", "which", "where", "when", "you", "your", "our", "out", "not", "but", "all",
    "any", "can", "get", "got", "his", "her", "him", "she", "its",
];

/// Presence of any of these marks a temporal query.
const TEMPORAL_WORDS: &[&str] = &[
    "recent", "lately", "yesterday", "today", "last", "this", "next", "ago", "before", "after",
    "when",
];

/// Presence of any of these marks a query that requires reasoning.
const REASONING_WORDS: &[&str] = &[
    "why", "how", "explain", "compare", "difference", "relationship", "cause", "effect",
    "reason", "analysis",
];

/// Markers after which up to three words are read as explicit topics.
const TOPIC_MARKERS: &[&str] = &["about", "regarding", "concerning"];

/// Structural features of a query, extracted without any LLM.
#[derive(Debug, Clone)]
pub struct QueryAnalysis {
    /// Lowercased content words longer than two characters.
    pub keywords: Vec<String>,
    /// Capitalised runs from the original query.
    pub entities: Vec<String>,
    /// The query refers to time.
    pub temporal: bool,
    /// Words following an explicit topic marker.
    pub topics: Vec<String>,
    /// The query asks for reasoning rather than lookup.
    pub requires_reasoning: bool,
    /// Whitespace word count.
    pub word_count: usize,
}

/// Complexity bucket driving the retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryComplexity {
    Simple,
    Moderate,
    Complex,
}

impl QueryComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryComplexity::Simple => "simple",
            QueryComplexity::Moderate => "moderate",
            QueryComplexity::Complex => "complex",
        }
    }
}

/// Per-signal scoring weights for one strategy.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub keyword: f64,
    pub entity: f64,
    pub topic: f64,
    pub temporal: f64,
    pub recency: f64,
}

/// Retrieval parameters chosen from query complexity.
#[derive(Debug, Clone)]
pub struct RetrievalStrategy {
    pub complexity: QueryComplexity,
    pub max_facts: usize,
    pub max_tokens: usize,
    pub prefer_consolidated: bool,
    pub weights: ScoringWeights,
}

/// Analyse a query: keywords, entities, temporality, topics, reasoning.
pub fn analyze_query(query: &str) -> QueryAnalysis {
    let lowered = query.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let cleaned: Vec<String> = words
        .iter()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .collect();

    let keywords = cleaned
        .iter()
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .cloned()
        .collect();

    let temporal = cleaned.iter().any(|w| TEMPORAL_WORDS.contains(&w.as_str()));
    let requires_reasoning = cleaned.iter().any(|w| REASONING_WORDS.contains(&w.as_str()));

    let mut topics = Vec::new();
    for (i, word) in cleaned.iter().enumerate() {
        let matched = TOPIC_MARKERS.contains(&word.as_str())
            || (word == "related" && cleaned.get(i + 1).is_some_and(|next| next == "to"));
        if matched {
            let skip = if word == "related" { i + 2 } else { i + 1 };
            topics.extend(
                cleaned
                    .iter()
                    .skip(skip)
                    .take(3)
                    .filter(|w| !w.is_empty())
                    .cloned(),
            );
        }
    }
    topics.dedup();

    QueryAnalysis {
        keywords,
        entities: extract_entities(query),
        temporal,
        topics,
        requires_reasoning,
        word_count: words.len(),
    }
}

/// Bucket a query by its analysis.
pub fn classify_complexity(analysis: &QueryAnalysis) -> QueryComplexity {
    if analysis.requires_reasoning || analysis.word_count > 15 || !analysis.topics.is_empty() {
        QueryComplexity::Complex
    } else if analysis.word_count > 8 || analysis.entities.len() > 2 || analysis.temporal {
        QueryComplexity::Moderate
    } else {
        QueryComplexity::Simple
    }
}

/// The strategy table, driven by the retrieval config.
pub fn strategy_for(complexity: QueryComplexity, config: &RetrievalConfig) -> RetrievalStrategy {
    match complexity {
        QueryComplexity::Simple => RetrievalStrategy {
            complexity,
            max_facts: 5,
            max_tokens: config.simple_query_tokens,
            prefer_consolidated: config.prefer_consolidated,
            weights: ScoringWeights {
                keyword: 0.40,
                entity: 0.30,
                topic: 0.10,
                temporal: 0.10,
                recency: 0.10,
            },
        },
        QueryComplexity::Moderate => RetrievalStrategy {
            complexity,
            max_facts: 10,
            max_tokens: config.moderate_query_tokens,
            prefer_consolidated: config.prefer_consolidated,
            weights: ScoringWeights {
                keyword: 0.30,
                entity: 0.30,
                topic: 0.20,
                temporal: 0.10,
                recency: 0.10,
            },
        },
        QueryComplexity::Complex => RetrievalStrategy {
            complexity,
            max_facts: 20,
            max_tokens: config.complex_query_tokens,
            prefer_consolidated: false,
            weights: ScoringWeights {
                keyword: 0.25,
                entity: 0.25,
                topic: 0.25,
                temporal: 0.15,
                recency: 0.10,
            },
        },
    }
}
