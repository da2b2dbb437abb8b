// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Strata memory engine.
//!
//! The model deserializes from TOML with `deny_unknown_fields` so typos are
//! rejected at startup with actionable messages. Semantic constraints that
//! serde cannot express (ranges, cross-field sums) are checked by
//! [`validate_config`], which collects every violation instead of failing
//! fast.

pub mod diagnostic;
pub mod model;
pub mod validation;

pub use diagnostic::ConfigError;
pub use model::{
    CompressionConfig, ConsolidationConfig, PipelineConfig, RetrievalConfig,
};
pub use validation::validate_config;
