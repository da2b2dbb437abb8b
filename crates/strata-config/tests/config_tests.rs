// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TOML round-trip and validation integration tests.

use strata_config::{validate_config, ConfigError, PipelineConfig};

#[test]
fn empty_toml_yields_defaults() {
    let config: PipelineConfig = toml::from_str("").unwrap();
    assert_eq!(config.compression.window_size, 10);
    assert_eq!(config.consolidation.similarity_threshold, 0.6);
    assert_eq!(config.retrieval.simple_query_tokens, 500);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn partial_sections_merge_with_defaults() {
    let toml_str = r#"
[compression]
window_size = 6
stride = 3

[retrieval]
complex_query_tokens = 4000
"#;
    let config: PipelineConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.compression.window_size, 6);
    assert_eq!(config.compression.stride, 3);
    // Untouched fields keep their defaults.
    assert_eq!(config.compression.entropy_threshold, 0.3);
    assert_eq!(config.retrieval.complex_query_tokens, 4000);
    assert_eq!(config.retrieval.moderate_query_tokens, 1500);
}

#[test]
fn unknown_keys_are_rejected() {
    let toml_str = r#"
[compression]
window_size = 6
windw_stride = 3
"#;
    let result = toml::from_str::<PipelineConfig>(toml_str);
    assert!(result.is_err(), "typo'd key must be rejected");
}

#[test]
fn background_schedule_round_trips() {
    let toml_str = r#"
background_consolidation = true
consolidation_interval_ms = 60000

[consolidation]
max_consolidation_level = 2
"#;
    let config: PipelineConfig = toml::from_str(toml_str).unwrap();
    assert!(config.background_consolidation);
    assert_eq!(config.consolidation_interval_ms, 60_000);
    assert_eq!(config.consolidation.max_consolidation_level, 2);
    assert!(validate_config(&config).is_ok());

    let serialized = toml::to_string(&config).unwrap();
    let reparsed: PipelineConfig = toml::from_str(&serialized).unwrap();
    assert_eq!(reparsed.consolidation_interval_ms, 60_000);
}

#[test]
fn invalid_values_produce_actionable_messages() {
    let toml_str = r#"
[compression]
entity_weight = 0.9
divergence_weight = 0.9
"#;
    let config: PipelineConfig = toml::from_str(toml_str).unwrap();
    let errors = validate_config(&config).unwrap_err();
    let rendered = strata_config::diagnostic::render_errors(&errors);
    assert!(rendered.contains("entity_weight"));
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}
