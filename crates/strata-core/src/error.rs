// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Strata memory engine.

use strum::{Display, EnumString};
use thiserror::Error;

/// Classifies a persistent-store failure.
///
/// `Conflict` covers constraint violations and busy/locked conditions,
/// `Corruption` covers an unreadable or structurally damaged database,
/// everything else is `Io`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StoreErrorKind {
    Io,
    Conflict,
    Corruption,
}

/// The primary error type used across all Strata crates.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Configuration failed validation at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistent store errors. Fatal to the enclosing batch; the store is
    /// left in its pre-call state.
    #[error("store {kind} error: {source}")]
    Store {
        kind: StoreErrorKind,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An LLM response was structurally invalid (not JSON, wrong shape,
    /// empty statement). Recoverable per window / per cluster.
    #[error("bad LLM response: {0}")]
    BadResponse(String),

    /// LLM transport failure (API error, connection loss).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An LLM call exceeded its per-call timeout. Recoverable: the window
    /// or cluster is skipped and retried on a later run.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The operation was aborted via the pipeline's cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// A search query was empty or oversized.
    #[error("invalid query: {0}")]
    QueryInvalid(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StrataError {
    /// True for errors that are recoverable at the unit of one window or
    /// one cluster: the unit contributes nothing, siblings proceed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StrataError::BadResponse(_)
                | StrataError::Provider { .. }
                | StrataError::Timeout { .. }
                | StrataError::Cancelled
        )
    }
}
