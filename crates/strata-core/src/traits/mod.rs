// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits through which external collaborators enter the engine.
//!
//! Concrete providers (Anthropic, OpenAI, local models, mocks) live outside
//! this workspace; the engine only sees these small trait objects.

pub mod clock;
pub mod embedding;
pub mod provider;

pub use clock::{Clock, SystemClock};
pub use embedding::EmbeddingProvider;
pub use provider::LanguageModel;
