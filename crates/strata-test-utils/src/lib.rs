// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters for deterministic testing.
//!
//! `MockLanguageModel`, `MockEmbedder`, and `MockClock` implement the core
//! adapter traits with pre-configured behaviour, enabling fast,
//! CI-runnable tests without external API calls.

pub mod mock_clock;
pub mod mock_embedder;
pub mod mock_llm;

pub use mock_clock::MockClock;
pub use mock_embedder::MockEmbedder;
pub use mock_llm::{MockLanguageModel, MockReply};
