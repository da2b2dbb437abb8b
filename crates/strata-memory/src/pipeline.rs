// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The pipeline orchestrator: public entry points and the background
//! consolidation schedule.
//!
//! Wires the entropy filter, extractor, consolidator, and retriever around
//! the store. All writes go through the store's single writer; facts from
//! one `process_transcript` call become visible atomically via one batch
//! commit. Every entry point observes the pipeline's cancellation token.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use strata_config::{diagnostic::render_errors, validate_config, PipelineConfig};
use strata_core::{
    AtomicFact, Clock, CompressionStat, ConversationTurn, EmbeddingProvider, LanguageModel,
    StrataError, SystemClock,
};
use strata_store::MemoryStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cluster;
use crate::consolidator::Consolidator;
use crate::entropy;
use crate::extractor::{build_memory_summary, dedup_facts, FactExtractor};
use crate::retriever::{RetrievalResult, Retriever};
use crate::window::create_windows;

/// Recent facts used as "previous memory" context during filtering.
const PREVIOUS_CONTEXT_FACTS: usize = 100;

/// Outcome of one `process_transcript` call.
#[derive(Debug)]
pub struct TranscriptSummary {
    pub windows_created: usize,
    pub windows_processed: usize,
    pub facts_extracted: usize,
    /// Per-window recoverable failures, as `window_id: error` strings.
    pub errors: Vec<String>,
    /// The stat row written for this call; `None` when compression is
    /// disabled and the transcript was ignored.
    pub stat: Option<CompressionStat>,
}

/// Outcome of one `run_consolidation` call.
#[derive(Debug)]
pub struct ConsolidationSummary {
    /// Source facts folded into clusters this run.
    pub facts_consolidated: usize,
    /// Higher-level facts created.
    pub new_facts: usize,
    /// Mean per-cluster compression ratio; 0 when no cluster consolidated.
    pub compression_ratio: f64,
}

/// Aggregate counters for `stats()`.
#[derive(Debug)]
pub struct PipelineStats {
    pub total_facts: i64,
    pub facts_by_level: BTreeMap<u32, i64>,
    pub total_windows: i64,
    pub avg_compression_ratio: f64,
    pub stats_rows: i64,
}

/// The semantic memory pipeline.
pub struct Pipeline {
    store: Arc<MemoryStore>,
    config: PipelineConfig,
    extract_llm: Arc<dyn LanguageModel>,
    consolidate_llm: Arc<dyn LanguageModel>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    clock: Arc<dyn Clock>,
    extractor: FactExtractor,
    consolidator: Consolidator,
    retriever: Retriever,
    cancel: CancellationToken,
    background: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline over a store and two language models.
    ///
    /// Fails with `StrataError::Config` when the configuration does not
    /// validate.
    pub fn new(
        store: Arc<MemoryStore>,
        config: PipelineConfig,
        extract_llm: Arc<dyn LanguageModel>,
        consolidate_llm: Arc<dyn LanguageModel>,
    ) -> Result<Self, StrataError> {
        validate_config(&config)
            .map_err(|errors| StrataError::Config(render_errors(&errors)))?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let extractor = FactExtractor::new(
            extract_llm.clone(),
            clock.clone(),
            config.compression.clone(),
        );
        let consolidator = Consolidator::new(
            consolidate_llm.clone(),
            clock.clone(),
            config.consolidation.clone(),
        );
        let retriever = Retriever::new(config.retrieval.clone());

        Ok(Self {
            store,
            config,
            extract_llm,
            consolidate_llm,
            embedder: None,
            clock,
            extractor,
            consolidator,
            retriever,
            cancel: CancellationToken::new(),
            background: Mutex::new(None),
        })
    }

    /// Attach an embedding provider for semantic divergence scoring.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Replace the clock (tests pin "now" with this).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock.clone();
        self.extractor = FactExtractor::new(
            self.extract_llm.clone(),
            clock.clone(),
            self.config.compression.clone(),
        );
        self.consolidator = Consolidator::new(
            self.consolidate_llm.clone(),
            clock,
            self.config.consolidation.clone(),
        );
        self
    }

    /// Override the per-LLM-call timeout on both the extractor and the
    /// consolidator.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.extractor = FactExtractor::new(
            self.extract_llm.clone(),
            self.clock.clone(),
            self.config.compression.clone(),
        )
        .with_call_timeout(timeout);
        self.consolidator = Consolidator::new(
            self.consolidate_llm.clone(),
            self.clock.clone(),
            self.config.consolidation.clone(),
        )
        .with_call_timeout(timeout);
        self
    }

    /// Ingest a transcript: window, filter, extract, dedup, persist.
    ///
    /// All windows are persisted with their scores and decisions; facts are
    /// committed in one batch so they become visible atomically. Per-window
    /// LLM failures contribute zero facts and an error entry; store errors
    /// are fatal.
    pub async fn process_transcript(
        &self,
        turns: &[ConversationTurn],
        session_file: &str,
    ) -> Result<TranscriptSummary, StrataError> {
        if self.cancel.is_cancelled() {
            return Err(StrataError::Cancelled);
        }
        if !self.config.compression.enabled {
            debug!("compression disabled; transcript ignored");
            return Ok(TranscriptSummary {
                windows_created: 0,
                windows_processed: 0,
                facts_extracted: 0,
                errors: Vec::new(),
                stat: None,
            });
        }

        let started = Instant::now();
        let compression = &self.config.compression;
        let mut windows = create_windows(
            turns,
            compression.window_size,
            compression.stride,
            session_file,
        );

        let previous = self.store.get_recent_facts(PREVIOUS_CONTEXT_FACTS).await?;
        let previous_embedding = self.embed_previous_context(&previous, &windows).await;

        let now = self.clock.now();
        for window in &mut windows {
            let window_embedding = match (&self.embedder, &previous_embedding) {
                (Some(embedder), Some(_)) => {
                    self.embed_window_text(embedder.as_ref(), window).await
                }
                _ => None,
            };
            let score = entropy::score_window(
                window,
                &previous,
                window_embedding.as_deref(),
                previous_embedding.as_deref(),
                compression,
            );
            window.entropy = Some(score.entropy);
            window.should_process = score.should_keep;
            window.processed_at = Some(now);
        }

        self.store.put_windows(&windows).await?;

        let kept: Vec<_> = windows
            .iter()
            .filter(|w| w.should_process)
            .cloned()
            .collect();
        let summary = build_memory_summary(&previous);
        let outcomes = self
            .extractor
            .extract_windows(&kept, summary.as_deref(), &self.cancel)
            .await;

        let mut errors = Vec::new();
        let mut facts = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(mut window_facts) => facts.append(&mut window_facts),
                Err(StrataError::Cancelled) => return Err(StrataError::Cancelled),
                Err(e) => {
                    warn!(
                        window_id = outcome.window_id.as_str(),
                        error = %e,
                        "window extraction failed"
                    );
                    errors.push(format!("{}: {e}", outcome.window_id));
                }
            }
        }

        let facts = dedup_facts(facts);
        self.store.put_facts(&facts).await?;

        let transcript_chars: usize = turns.iter().map(|t| t.content.chars().count()).sum();
        let fact_chars: usize = facts.iter().map(|f| f.statement.chars().count()).sum();
        let chars_per_token = self.config.retrieval.chars_per_token.max(1);
        let window_entropies: Vec<f64> = windows.iter().filter_map(|w| w.entropy).collect();

        let stat = CompressionStat {
            id: Uuid::new_v4().to_string(),
            input_tokens: transcript_chars.div_ceil(chars_per_token) as i64,
            output_facts: facts.len() as i64,
            compression_ratio: if fact_chars == 0 {
                0.0
            } else {
                transcript_chars as f64 / fact_chars as f64
            },
            entropy_score: if window_entropies.is_empty() {
                0.0
            } else {
                window_entropies.iter().sum::<f64>() / window_entropies.len() as f64
            },
            processing_time_ms: started.elapsed().as_millis() as i64,
            created_at: self.clock.now(),
            source_session_file: Some(session_file.to_string()),
        };
        self.store.put_stat(&stat).await?;

        info!(
            session_file,
            windows = windows.len(),
            kept = kept.len(),
            facts = facts.len(),
            failed_windows = errors.len(),
            "transcript processed"
        );

        Ok(TranscriptSummary {
            windows_created: windows.len(),
            windows_processed: kept.len(),
            facts_extracted: facts.len(),
            errors,
            stat: Some(stat),
        })
    }

    /// Cluster and consolidate facts level by level.
    ///
    /// Operates on the snapshot of facts committed before the call. Facts
    /// already referenced as sources of an existing consolidated fact are
    /// not re-consolidated. Per-cluster LLM failures skip the cluster;
    /// siblings continue.
    pub async fn run_consolidation(&self) -> Result<ConsolidationSummary, StrataError> {
        if self.cancel.is_cancelled() {
            return Err(StrataError::Cancelled);
        }
        let config = &self.config.consolidation;
        if !config.enabled {
            debug!("consolidation disabled");
            return Ok(ConsolidationSummary {
                facts_consolidated: 0,
                new_facts: 0,
                compression_ratio: 0.0,
            });
        }

        let all = self.store.get_all_facts().await?;
        let already_consolidated: HashSet<&str> = all
            .iter()
            .filter(|f| f.is_consolidated())
            .flat_map(|f| f.source_fact_ids.iter().map(String::as_str))
            .collect();
        let mut current: Vec<AtomicFact> = all
            .iter()
            .filter(|f| f.level == 0 && !already_consolidated.contains(f.id.as_str()))
            .cloned()
            .collect();

        if current.len() < config.min_facts_for_cluster {
            debug!(
                unconsolidated = current.len(),
                "not enough facts to consolidate"
            );
            return Ok(ConsolidationSummary {
                facts_consolidated: 0,
                new_facts: 0,
                compression_ratio: 0.0,
            });
        }

        let mut facts_consolidated = 0;
        let mut new_facts = 0;
        let mut ratios = Vec::new();

        for _ in 0..config.max_consolidation_level {
            if current.len() < config.min_facts_for_cluster {
                break;
            }
            let clusters = cluster::cluster_facts(&current, config);
            if clusters.is_empty() {
                break;
            }

            let mut created = Vec::new();
            for cluster in &clusters {
                match self
                    .consolidator
                    .consolidate_cluster(cluster, &self.cancel)
                    .await
                {
                    Ok(outcome) => {
                        facts_consolidated += cluster.facts.len();
                        ratios.push(outcome.compression_ratio);
                        created.push(outcome.fact);
                    }
                    Err(StrataError::Cancelled) => return Err(StrataError::Cancelled),
                    Err(e) if e.is_recoverable() => {
                        warn!(
                            cluster_id = cluster.id.as_str(),
                            error = %e,
                            "cluster consolidation failed; skipping"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }

            if created.is_empty() {
                break;
            }
            self.store.put_facts(&created).await?;
            new_facts += created.len();
            // The next level clusters over the facts just created.
            current = created;
        }

        let compression_ratio = if ratios.is_empty() {
            0.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        };

        info!(facts_consolidated, new_facts, compression_ratio, "consolidation run complete");

        Ok(ConsolidationSummary {
            facts_consolidated,
            new_facts,
            compression_ratio,
        })
    }

    /// Serve a query over the current fact snapshot.
    pub async fn search(&self, query_text: &str) -> Result<RetrievalResult, StrataError> {
        if self.cancel.is_cancelled() {
            return Err(StrataError::Cancelled);
        }
        if !self.config.retrieval.enabled {
            debug!("retrieval disabled; serving empty result");
            return self
                .retriever
                .search(query_text, &[], self.clock.now());
        }
        let all_facts = self.store.get_all_facts().await?;
        self.retriever.search(query_text, &all_facts, self.clock.now())
    }

    /// Aggregate counters over the store.
    pub async fn stats(&self) -> Result<PipelineStats, StrataError> {
        let facts_by_level = self.store.count_by_level().await?;
        Ok(PipelineStats {
            total_facts: facts_by_level.values().sum(),
            facts_by_level,
            total_windows: self.store.count_windows().await?,
            avg_compression_ratio: self.store.avg_compression_ratio().await?,
            stats_rows: self.store.count_stats().await?,
        })
    }

    /// Spawn the background consolidation task, when configured.
    ///
    /// The first run happens one interval after `start`; each tick operates
    /// on the then-current snapshot and reschedules regardless of outcome.
    pub fn start(self: &Arc<Self>) {
        if !self.config.background_consolidation {
            return;
        }
        let mut guard = match self.background.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_some() {
            return;
        }

        let pipeline = Arc::clone(self);
        let cancel = self.cancel.clone();
        let interval = Duration::from_millis(self.config.consolidation_interval_ms);
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("background consolidation stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        match pipeline.run_consolidation().await {
                            Ok(summary) => debug!(
                                new_facts = summary.new_facts,
                                "background consolidation tick"
                            ),
                            Err(e) => warn!(
                                error = %e,
                                "background consolidation failed; rescheduling"
                            ),
                        }
                    }
                }
            }
        }));
        info!(interval_ms = self.config.consolidation_interval_ms, "background consolidation started");
    }

    /// Cancel the background timer and any in-flight operation.
    pub fn stop(&self) {
        self.cancel.cancel();
        let handle = match self.background.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Administrative wipe of all memory rows.
    pub async fn clear(&self) -> Result<(), StrataError> {
        self.store.clear().await
    }

    /// Embed the previous-context text, tolerating embedder failure.
    async fn embed_previous_context(
        &self,
        previous: &[AtomicFact],
        windows: &[strata_core::ConversationWindow],
    ) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        if windows.is_empty() || previous.is_empty() {
            return None;
        }
        let context = build_memory_summary(previous)?;
        match embedder.embed(&context).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "previous-context embedding failed; using constant divergence");
                None
            }
        }
    }

    /// Embed one window's text, tolerating embedder failure.
    async fn embed_window_text(
        &self,
        embedder: &dyn EmbeddingProvider,
        window: &strata_core::ConversationWindow,
    ) -> Option<Vec<f32>> {
        let text = window
            .turns
            .iter()
            .map(|t| t.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        match embedder.embed(&text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(
                    window_id = window.id.as_str(),
                    error = %e,
                    "window embedding failed; using constant divergence"
                );
                None
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_test_utils::MockLanguageModel;

    fn mock_llm() -> Arc<MockLanguageModel> {
        Arc::new(MockLanguageModel::new())
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let store = Arc::new(MemoryStore::open_in_memory().await.unwrap());
        let mut config = PipelineConfig::default();
        config.compression.stride = 0;
        config.retrieval.chars_per_token = 0;

        let err = Pipeline::new(store, config, mock_llm(), mock_llm()).unwrap_err();
        match err {
            StrataError::Config(message) => {
                assert!(message.contains("stride"));
                assert!(message.contains("chars_per_token"));
            }
            other => panic!("expected Config error, got {other}"),
        }
    }

    #[tokio::test]
    async fn operations_after_stop_are_cancelled() {
        let store = Arc::new(MemoryStore::open_in_memory().await.unwrap());
        let pipeline = Arc::new(
            Pipeline::new(store, PipelineConfig::default(), mock_llm(), mock_llm()).unwrap(),
        );
        pipeline.stop();

        let err = pipeline.process_transcript(&[], "s").await.unwrap_err();
        assert!(matches!(err, StrataError::Cancelled));
        let err = pipeline.run_consolidation().await.unwrap_err();
        assert!(matches!(err, StrataError::Cancelled));
        let err = pipeline.search("anything").await.unwrap_err();
        assert!(matches!(err, StrataError::Cancelled));
    }

    #[tokio::test]
    async fn start_without_background_config_is_a_no_op() {
        let store = Arc::new(MemoryStore::open_in_memory().await.unwrap());
        let pipeline = Arc::new(
            Pipeline::new(store, PipelineConfig::default(), mock_llm(), mock_llm()).unwrap(),
        );
        pipeline.start();
        assert!(pipeline.background.lock().unwrap().is_none());
        pipeline.stop();
    }
}
