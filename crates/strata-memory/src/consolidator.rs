// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM consolidation of fact clusters into higher-level facts.
//!
//! One LLM call per cluster, sequential within a level. The consolidated
//! statement must be self-contained and more abstract than any source; the
//! metadata (sets, confidence, level, provenance) is derived here, not by
//! the model.

use std::sync::Arc;
use std::time::Duration;

use strata_config::ConsolidationConfig;
use strata_core::{union_casefold, AtomicFact, Clock, LanguageModel, StrataError};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::cluster::FactCluster;

/// Per-call timeout; a timed-out cluster is a recoverable failure.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

const CONSOLIDATION_PROMPT: &str = r#"Below are several related facts from an agent's memory.

Write ONE statement that captures the essence of all of them. The statement
must be self-contained, more abstract than any single source fact, and must
preserve the entities, relationships, and outcomes involved.

Facts:
{facts}

Answer with the single consolidated statement only, no JSON, no commentary:"#;

/// Result of consolidating one cluster.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// The new higher-level fact.
    pub fact: AtomicFact,
    /// Source statement characters / consolidated statement characters.
    pub compression_ratio: f64,
}

/// Drives the consolidation LLM over clusters.
pub struct Consolidator {
    llm: Arc<dyn LanguageModel>,
    clock: Arc<dyn Clock>,
    config: ConsolidationConfig,
    call_timeout: Duration,
}

impl Consolidator {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        clock: Arc<dyn Clock>,
        config: ConsolidationConfig,
    ) -> Self {
        Self {
            llm,
            clock,
            config,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    /// Consolidate one cluster into a single higher-level fact.
    pub async fn consolidate_cluster(
        &self,
        cluster: &FactCluster,
        cancel: &CancellationToken,
    ) -> Result<ClusterOutcome, StrataError> {
        let prompt = build_consolidation_prompt(cluster);

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(StrataError::Cancelled),
            result = tokio::time::timeout(self.call_timeout, self.llm.complete(&prompt)) => {
                match result {
                    Ok(response) => response?,
                    Err(_) => {
                        return Err(StrataError::Timeout {
                            duration: self.call_timeout,
                        });
                    }
                }
            }
        };

        let statement = response.trim();
        if statement.is_empty() {
            return Err(StrataError::BadResponse(
                "consolidation response is empty".to_string(),
            ));
        }

        let fact = self.build_consolidated_fact(cluster, statement);
        let source_chars: usize = cluster
            .facts
            .iter()
            .map(|f| f.statement.chars().count())
            .sum();
        let compression_ratio = source_chars as f64 / statement.chars().count() as f64;

        debug!(
            cluster_id = cluster.id.as_str(),
            sources = cluster.facts.len(),
            level = fact.level,
            compression_ratio,
            "cluster consolidated"
        );

        Ok(ClusterOutcome {
            fact,
            compression_ratio,
        })
    }

    /// Derive the consolidated fact's metadata from its sources.
    fn build_consolidated_fact(&self, cluster: &FactCluster, statement: &str) -> AtomicFact {
        let sources = &cluster.facts;
        let keywords = union_casefold(sources.iter().map(|f| f.keywords.as_slice()));
        let persons = union_casefold(sources.iter().map(|f| f.persons.as_slice()));
        let entities = union_casefold(sources.iter().map(|f| f.entities.as_slice()));
        let confidence =
            sources.iter().map(|f| f.confidence).sum::<f64>() / sources.len() as f64;
        let level = sources.iter().map(|f| f.level).max().unwrap_or(0) + 1;

        AtomicFact {
            id: Uuid::new_v4().to_string(),
            statement: statement.to_string(),
            keywords,
            persons,
            entities,
            topic: cluster.topic.clone(),
            timestamp: cluster.time_range.map(|(start, _)| start),
            location: sources.iter().find_map(|f| f.location.clone()),
            confidence,
            entropy: None,
            extracted_at: self.clock.now(),
            level,
            parent_cluster_id: Some(cluster.id.clone()),
            source_fact_ids: sources.iter().map(|f| f.id.clone()).collect(),
            source_window_id: None,
            source_chunk_id: None,
            source_session_file: None,
        }
    }
}

fn build_consolidation_prompt(cluster: &FactCluster) -> String {
    let facts = cluster
        .facts
        .iter()
        .map(|f| format!("- {}", f.statement))
        .collect::<Vec<_>>()
        .join("\n");
    CONSOLIDATION_PROMPT.replace("{facts}", &facts)
}
