// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: ranges, cross-field sums, and ordering between fields.

use crate::diagnostic::ConfigError;
use crate::model::PipelineConfig;

const WEIGHT_SUM_EPSILON: f64 = 1e-9;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let c = &config.compression;
    if c.window_size < 1 {
        errors.push(validation("compression.window_size must be at least 1"));
    }
    if c.stride < 1 {
        errors.push(validation("compression.stride must be at least 1"));
    }
    if !(0.0..=1.0).contains(&c.entropy_threshold) {
        errors.push(validation(&format!(
            "compression.entropy_threshold must be in [0, 1], got {}",
            c.entropy_threshold
        )));
    }
    if !(0.0..=1.0).contains(&c.entity_weight) {
        errors.push(validation(&format!(
            "compression.entity_weight must be in [0, 1], got {}",
            c.entity_weight
        )));
    }
    if !(0.0..=1.0).contains(&c.divergence_weight) {
        errors.push(validation(&format!(
            "compression.divergence_weight must be in [0, 1], got {}",
            c.divergence_weight
        )));
    }
    if (c.entity_weight + c.divergence_weight - 1.0).abs() > WEIGHT_SUM_EPSILON {
        errors.push(validation(&format!(
            "compression.entity_weight + compression.divergence_weight must sum to 1, got {}",
            c.entity_weight + c.divergence_weight
        )));
    }
    if c.max_parallel_workers < 1 {
        errors.push(validation("compression.max_parallel_workers must be at least 1"));
    }
    if c.max_facts_per_window < 1 {
        errors.push(validation("compression.max_facts_per_window must be at least 1"));
    }
    if !(0.0..=1.0).contains(&c.min_confidence) {
        errors.push(validation(&format!(
            "compression.min_confidence must be in [0, 1], got {}",
            c.min_confidence
        )));
    }

    let k = &config.consolidation;
    if k.min_facts_for_cluster < 2 {
        errors.push(validation("consolidation.min_facts_for_cluster must be at least 2"));
    }
    if k.max_facts_per_cluster < k.min_facts_for_cluster {
        errors.push(validation(&format!(
            "consolidation.max_facts_per_cluster ({}) must be >= min_facts_for_cluster ({})",
            k.max_facts_per_cluster, k.min_facts_for_cluster
        )));
    }
    if !(0.0..=1.0).contains(&k.similarity_threshold) {
        errors.push(validation(&format!(
            "consolidation.similarity_threshold must be in [0, 1], got {}",
            k.similarity_threshold
        )));
    }
    if k.max_consolidation_level < 1 {
        errors.push(validation("consolidation.max_consolidation_level must be at least 1"));
    }
    if k.temporal_window_ms < 1 {
        errors.push(validation("consolidation.temporal_window_ms must be at least 1"));
    }

    let r = &config.retrieval;
    if r.simple_query_tokens < 1 {
        errors.push(validation("retrieval.simple_query_tokens must be at least 1"));
    }
    if r.moderate_query_tokens < 1 {
        errors.push(validation("retrieval.moderate_query_tokens must be at least 1"));
    }
    if r.complex_query_tokens < 1 {
        errors.push(validation("retrieval.complex_query_tokens must be at least 1"));
    }
    if r.chars_per_token < 1 {
        errors.push(validation("retrieval.chars_per_token must be at least 1"));
    }

    if config.background_consolidation && config.consolidation_interval_ms < 1 {
        errors.push(validation(
            "consolidation_interval_ms must be at least 1 when background_consolidation is enabled",
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validation(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_string(),
    }
}
