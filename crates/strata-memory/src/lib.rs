// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Strata semantic memory engine.
//!
//! Ingests conversation transcripts, distils them into atomic facts,
//! consolidates related facts into a level hierarchy, and serves them back
//! under a token budget:
//!
//! ```text
//! transcript -> window(w,s) -> entropy filter -> extract (LLM, parallel)
//!            -> store facts (level=0)
//!            -> [background] cluster -> consolidate (LLM) -> store (level=n+1)
//! query -> analyse -> strategy -> score -> select under budget -> result
//! ```
//!
//! - **window / entropy**: pure transcript windowing and novelty scoring
//! - **extractor**: drives the extraction LLM with bounded parallelism
//! - **cluster / consolidator**: similarity clustering and LLM consolidation
//! - **query / retriever**: query-adaptive, token-budgeted retrieval
//! - **pipeline**: the public entry points and background schedule

pub mod cluster;
pub mod consolidator;
pub mod entropy;
pub mod extractor;
pub mod pipeline;
pub mod query;
pub mod retriever;
pub mod window;

pub use cluster::FactCluster;
pub use consolidator::Consolidator;
pub use extractor::FactExtractor;
pub use pipeline::{ConsolidationSummary, Pipeline, PipelineStats, TranscriptSummary};
pub use query::{QueryAnalysis, QueryComplexity, RetrievalStrategy};
pub use retriever::{RetrievalResult, Retriever, ScoredFact};
