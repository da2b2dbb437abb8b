// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Strata memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Every section is optional and defaults to
//! sensible values; the defaults here are the engine's documented defaults.

use serde::{Deserialize, Serialize};

/// Top-level pipeline configuration composing the three component sections
/// plus the background consolidation schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Windowing, entropy filtering, and fact extraction settings.
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Clustering and consolidation settings.
    #[serde(default)]
    pub consolidation: ConsolidationConfig,

    /// Query-adaptive retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Run consolidation on a background timer.
    #[serde(default)]
    pub background_consolidation: bool,

    /// Interval between background consolidation runs.
    #[serde(default = "default_consolidation_interval_ms")]
    pub consolidation_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            compression: CompressionConfig::default(),
            consolidation: ConsolidationConfig::default(),
            retrieval: RetrievalConfig::default(),
            background_consolidation: false,
            consolidation_interval_ms: default_consolidation_interval_ms(),
        }
    }
}

fn default_consolidation_interval_ms() -> u64 {
    30 * 60 * 1000
}

/// Semantic compression: windowing, entropy filtering, extraction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompressionConfig {
    /// Master switch for transcript ingestion.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Turns per window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Distance between window start positions. Overlap is
    /// `window_size - stride` turns.
    #[serde(default = "default_stride")]
    pub stride: usize,

    /// Windows scoring below this entropy are not sent to the extractor.
    /// Ties keep the window.
    #[serde(default = "default_entropy_threshold")]
    pub entropy_threshold: f64,

    /// Weight of entity novelty in the entropy score.
    #[serde(default = "default_half")]
    pub entity_weight: f64,

    /// Weight of semantic divergence in the entropy score.
    /// Must sum to 1 with `entity_weight`.
    #[serde(default = "default_half")]
    pub divergence_weight: f64,

    /// Maximum concurrent extraction LLM calls.
    #[serde(default = "default_max_parallel_workers")]
    pub max_parallel_workers: usize,

    /// Facts accepted per window before the rest are ignored.
    #[serde(default = "default_max_facts_per_window")]
    pub max_facts_per_window: usize,

    /// Facts below this confidence are dropped.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_size: default_window_size(),
            stride: default_stride(),
            entropy_threshold: default_entropy_threshold(),
            entity_weight: default_half(),
            divergence_weight: default_half(),
            max_parallel_workers: default_max_parallel_workers(),
            max_facts_per_window: default_max_facts_per_window(),
            min_confidence: default_min_confidence(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_half() -> f64 {
    0.5
}

fn default_window_size() -> usize {
    10
}

fn default_stride() -> usize {
    5
}

fn default_entropy_threshold() -> f64 {
    0.3
}

fn default_max_parallel_workers() -> usize {
    4
}

fn default_max_facts_per_window() -> usize {
    20
}

fn default_min_confidence() -> f64 {
    0.7
}

/// Consolidation: similarity clustering and higher-level fact creation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsolidationConfig {
    /// Master switch for consolidation runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Clusters smaller than this are discarded.
    #[serde(default = "default_min_facts_for_cluster")]
    pub min_facts_for_cluster: usize,

    /// Clusters stop growing at this size.
    #[serde(default = "default_max_facts_for_cluster")]
    pub max_facts_per_cluster: usize,

    /// Mean similarity a candidate needs against current members to join.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Highest consolidation level the recursive loop may create.
    #[serde(default = "default_max_consolidation_level")]
    pub max_consolidation_level: u32,

    /// Facts further apart than this score 0 on the temporal dimension.
    #[serde(default = "default_temporal_window_ms")]
    pub temporal_window_ms: u64,

    /// Enable the topic similarity dimension.
    #[serde(default = "default_true")]
    pub topic_clustering: bool,

    /// Enable the entity and person similarity dimensions.
    #[serde(default = "default_true")]
    pub entity_clustering: bool,

    /// Enable the temporal similarity dimension.
    #[serde(default = "default_true")]
    pub temporal_clustering: bool,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_facts_for_cluster: default_min_facts_for_cluster(),
            max_facts_per_cluster: default_max_facts_for_cluster(),
            similarity_threshold: default_similarity_threshold(),
            max_consolidation_level: default_max_consolidation_level(),
            temporal_window_ms: default_temporal_window_ms(),
            topic_clustering: true,
            entity_clustering: true,
            temporal_clustering: true,
        }
    }
}

fn default_min_facts_for_cluster() -> usize {
    3
}

fn default_max_facts_for_cluster() -> usize {
    10
}

fn default_similarity_threshold() -> f64 {
    0.6
}

fn default_max_consolidation_level() -> u32 {
    3
}

fn default_temporal_window_ms() -> u64 {
    7 * 24 * 60 * 60 * 1000
}

/// Query-adaptive retrieval: token budgets and strategy switches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Master switch for retrieval.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Token budget for simple queries.
    #[serde(default = "default_simple_query_tokens")]
    pub simple_query_tokens: usize,

    /// Token budget for moderate queries.
    #[serde(default = "default_moderate_query_tokens")]
    pub moderate_query_tokens: usize,

    /// Token budget for complex queries.
    #[serde(default = "default_complex_query_tokens")]
    pub complex_query_tokens: usize,

    /// Restrict simple/moderate queries to consolidated facts when any exist.
    #[serde(default = "default_true")]
    pub prefer_consolidated: bool,

    /// Append each selected fact's parent when it fits the budget.
    #[serde(default = "default_true")]
    pub include_parents: bool,

    /// Token estimation divisor: `tokens = ceil(chars / chars_per_token)`.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            simple_query_tokens: default_simple_query_tokens(),
            moderate_query_tokens: default_moderate_query_tokens(),
            complex_query_tokens: default_complex_query_tokens(),
            prefer_consolidated: true,
            include_parents: true,
            chars_per_token: default_chars_per_token(),
        }
    }
}

fn default_simple_query_tokens() -> usize {
    500
}

fn default_moderate_query_tokens() -> usize {
    1500
}

fn default_complex_query_tokens() -> usize {
    3000
}

fn default_chars_per_token() -> usize {
    4
}
