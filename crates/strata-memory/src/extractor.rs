// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based atomic fact extraction from kept windows.
//!
//! Builds the extraction prompt, parses the JSON facts contract
//! defensively (raw or fenced), gates on confidence, and deduplicates.
//! Windows are processed with bounded parallelism: chunks of
//! `max_parallel_workers`, each chunk awaited fully before the next
//! starts. One window's failure never cancels its siblings.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use strata_config::CompressionConfig;
use strata_core::{
    normalize_statement, AtomicFact, Clock, ConversationWindow, LanguageModel, StrataError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Confidence assigned when the LLM omits the field.
const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Per-call timeout; a timed-out window is a recoverable failure.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Statements from the previous-memory summary injected into the prompt.
const MEMORY_SUMMARY_CAP: usize = 20;

const EXTRACTION_PROMPT: &str = r#"Extract atomic facts from this conversation window.

Each fact must be a complete, self-contained sentence: resolve all pronouns
to the people or things they refer to, and replace relative time expressions
("yesterday", "next week") with absolute dates when they can be determined.
A fact must be meaningful without the source conversation.

Output JSON of exactly this shape:
{"facts": [{"statement": "...", "keywords": ["..."], "persons": ["..."], "entities": ["..."], "topic": "...", "timestamp": "ISO-8601", "location": "...", "confidence": 0.0}]}

- "keywords", "persons", "entities" are short strings; omit what is unknown
- "topic", "timestamp", "location" are optional
- "confidence" is your certainty in [0, 1]
- Return {"facts": []} when the window contains nothing worth remembering
{context}
Conversation:
{conversation}

Output JSON only, no explanation:"#;

/// A fact as parsed from the LLM response, before stamping.
#[derive(Debug, Clone)]
pub struct ParsedFact {
    pub statement: String,
    pub keywords: Vec<String>,
    pub persons: Vec<String>,
    pub entities: Vec<String>,
    pub topic: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub confidence: f64,
}

/// The outcome of extracting one window.
#[derive(Debug)]
pub struct WindowExtraction {
    pub window_id: String,
    pub result: Result<Vec<AtomicFact>, StrataError>,
}

/// Drives the extraction LLM over kept windows.
pub struct FactExtractor {
    llm: Arc<dyn LanguageModel>,
    clock: Arc<dyn Clock>,
    config: CompressionConfig,
    call_timeout: Duration,
}

impl FactExtractor {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        clock: Arc<dyn Clock>,
        config: CompressionConfig,
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

    /// Extract facts from every window with bounded parallelism.
    ///
    /// Results come back per window, failures tagged; a window error never
    /// cancels its chunk.
    pub async fn extract_windows(
        &self,
        windows: &[ConversationWindow],
        previous_summary: Option<&str>,
        cancel: &CancellationToken,
    ) -> Vec<WindowExtraction> {
        let mut outcomes = Vec::with_capacity(windows.len());
        for chunk in windows.chunks(self.config.max_parallel_workers.max(1)) {
            let batch = chunk.iter().map(|window| async {
                WindowExtraction {
                    window_id: window.id.clone(),
                    result: self.extract_window(window, previous_summary, cancel).await,
                }
            });
            outcomes.extend(futures::future::join_all(batch).await);
        }
        outcomes
    }

    /// Extract facts from a single window.
    pub async fn extract_window(
        &self,
        window: &ConversationWindow,
        previous_summary: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<AtomicFact>, StrataError> {
        let prompt = build_extraction_prompt(window, previous_summary);

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

        let parsed = parse_extraction_response(&response)?;
        let now = self.clock.now();

        let facts: Vec<AtomicFact> = parsed
            .into_iter()
            .filter(|fact| {
                let keep = fact.confidence >= self.config.min_confidence;
                if !keep {
                    debug!(
                        confidence = fact.confidence,
                        "dropping low-confidence fact: {}", fact.statement
                    );
                }
                keep
            })
            .take(self.config.max_facts_per_window)
            .map(|fact| AtomicFact {
                id: Uuid::new_v4().to_string(),
                statement: fact.statement,
                keywords: fact.keywords,
                persons: fact.persons,
                entities: fact.entities,
                topic: fact.topic,
                timestamp: fact.timestamp,
                location: fact.location,
                confidence: fact.confidence,
                entropy: window.entropy,
                extracted_at: now,
                level: 0,
                parent_cluster_id: None,
                source_fact_ids: vec![],
                source_window_id: Some(window.id.clone()),
                source_chunk_id: None,
                source_session_file: window.source_session_file.clone(),
            })
            .collect();

        debug!(window_id = window.id.as_str(), facts = facts.len(), "window extracted");
        Ok(facts)
    }
}

/// Build the extraction prompt for one window.
fn build_extraction_prompt(window: &ConversationWindow, previous_summary: Option<&str>) -> String {
    let mut conversation = String::new();
    for turn in &window.turns {
        match turn.timestamp {
            Some(ts) => {
                conversation.push_str(&format!(
                    "[{}] {}: {}\n",
                    ts.to_rfc3339(),
                    turn.speaker,
                    turn.content
                ));
            }
            None => {
                conversation.push_str(&format!("{}: {}\n", turn.speaker, turn.content));
            }
        }
    }

    let context = match previous_summary {
        Some(summary) if !summary.is_empty() => {
            format!("\nAlready known (do not repeat):\n{summary}\n")
        }
        _ => String::new(),
    };

    EXTRACTION_PROMPT
        .replace("{context}", &context)
        .replace("{conversation}", &conversation)
}

/// Summarise prior memory for the extraction prompt: the most recent fact
/// statements as a bullet list, newest first, capped.
pub fn build_memory_summary(previous_facts: &[AtomicFact]) -> Option<String> {
    if previous_facts.is_empty() {
        return None;
    }
    let lines: Vec<String> = previous_facts
        .iter()
        .take(MEMORY_SUMMARY_CAP)
        .map(|fact| format!("- {}", fact.statement))
        .collect();
    Some(lines.join("\n"))
}

/// Parse the extraction response into structured facts.
///
/// Accepts raw JSON or a ```json fenced block. Anything that is not an
/// object with a `facts` array is a `BadResponse`. Entries without a
/// usable statement are skipped; missing sets coerce to empty, missing
/// confidence to the default.
pub fn parse_extraction_response(response: &str) -> Result<Vec<ParsedFact>, StrataError> {
    let body = strip_code_fence(response.trim());
    let value: Value = serde_json::from_str(body)
        .map_err(|e| StrataError::BadResponse(format!("extraction response is not JSON: {e}")))?;

    let facts = value
        .get("facts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            StrataError::BadResponse("top-level `facts` is missing or not an array".to_string())
        })?;

    Ok(facts.iter().filter_map(coerce_fact).collect())
}

/// Strip a surrounding markdown code fence, tolerating a `json` language
/// tag and trailing commentary after the closing fence.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let body = match rest.rsplit_once("```") {
        Some((body, _)) => body,
        None => rest,
    };
    body.trim()
}

fn coerce_fact(value: &Value) -> Option<ParsedFact> {
    let statement = value.get("statement")?.as_str()?.trim();
    if statement.is_empty() {
        warn!("skipping fact with empty statement");
        return None;
    }

    Some(ParsedFact {
        statement: statement.to_string(),
        keywords: string_set(value.get("keywords")),
        persons: string_set(value.get("persons")),
        entities: string_set(value.get("entities")),
        topic: optional_string(value.get("topic")),
        timestamp: optional_string(value.get("timestamp"))
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|ts| ts.with_timezone(&Utc)),
        location: optional_string(value.get("location")),
        confidence: value
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_CONFIDENCE)
            .clamp(0.0, 1.0),
    })
}

fn string_set(value: Option<&Value>) -> Vec<String> {
    let Some(array) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    array
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(str::to_string)
        .collect()
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Drop facts whose identity tuple was already seen; first occurrence wins.
///
/// Identity is the normalised statement plus the sorted, case-folded
/// entity and person sets. Idempotent: running twice yields the same set.
pub fn dedup_facts(facts: Vec<AtomicFact>) -> Vec<AtomicFact> {
    let mut seen = HashSet::new();
    facts
        .into_iter()
        .filter(|fact| seen.insert(dedup_key(fact)))
        .collect()
}

fn dedup_key(fact: &AtomicFact) -> (String, Vec<String>, Vec<String>) {
    let mut entities: Vec<String> = fact.entities.iter().map(|e| e.to_lowercase()).collect();
    entities.sort();
    let mut persons: Vec<String> = fact.persons.iter().map(|p| p.to_lowercase()).collect();
    persons.sort();
    (normalize_statement(&fact.statement), entities, persons)
}
