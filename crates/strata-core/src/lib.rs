// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types and traits for the Strata semantic memory engine.
//!
//! Strata distils conversation transcripts into atomic facts, folds related
//! facts into a hierarchy of consolidated abstractions, and serves them back
//! through query-adaptive, token-budgeted retrieval. This crate holds the
//! pieces every other crate depends on:
//!
//! - **StrataError**: the single error type used across all crates
//! - **Domain types**: [`AtomicFact`], [`ConversationWindow`],
//!   [`CompressionStat`], [`ConversationTurn`]
//! - **Adapter traits**: [`LanguageModel`], [`EmbeddingProvider`], [`Clock`]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{StoreErrorKind, StrataError};
pub use traits::{Clock, EmbeddingProvider, LanguageModel, SystemClock};
pub use types::{
    intersect_casefold, normalize_statement, union_casefold, AtomicFact, CompressionStat,
    ConversationTurn, ConversationWindow,
};
