// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language model trait for the extraction and consolidation LLMs.

use async_trait::async_trait;

use crate::error::StrataError;

/// An opaque prompt-to-text language model.
///
/// The pipeline holds two instances: the fact-extraction model (expected to
/// answer with the JSON facts contract) and the consolidation model
/// (expected to answer with a single plain-text statement). Neither contract
/// is enforced here; callers parse defensively.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends a prompt and returns the model's full text response.
    async fn complete(&self, prompt: &str) -> Result<String, StrataError>;
}
