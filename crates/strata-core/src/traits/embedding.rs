// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider trait for semantic divergence scoring.

use async_trait::async_trait;

use crate::error::StrataError;

/// Maps text to a fixed-dimension vector.
///
/// Optional: when no provider is configured, the entropy filter falls back
/// to a constant semantic-divergence score.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generates an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StrataError>;
}
