// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline scenarios over an in-memory store and mock LLMs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use strata_config::PipelineConfig;
use strata_core::{AtomicFact, ConversationTurn, StrataError};
use strata_memory::{Pipeline, QueryComplexity};
use strata_store::MemoryStore;
use strata_test_utils::{MockClock, MockLanguageModel};

fn turn(speaker: &str, content: &str) -> ConversationTurn {
    ConversationTurn {
        speaker: speaker.to_string(),
        content: content.to_string(),
        timestamp: None,
    }
}

/// Small windows, keep-everything threshold, sequential extraction so
/// queued mock replies line up with windows deterministically.
fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.compression.window_size = 2;
    config.compression.stride = 2;
    config.compression.entropy_threshold = 0.0;
    config.compression.max_parallel_workers = 1;
    config
}

fn facts_response(entries: &[(&str, f64)]) -> String {
    let facts: Vec<String> = entries
        .iter()
        .map(|(statement, confidence)| {
            format!(
                r#"{{"statement": "{statement}", "keywords": ["work"],
                    "persons": ["Alice"], "entities": ["Acme Corporation"],
                    "topic": "career", "confidence": {confidence}}}"#
            )
        })
        .collect();
    format!(r#"{{"facts": [{}]}}"#, facts.join(","))
}

fn seed_fact(id: &str, statement: &str, day: u32, confidence: f64) -> AtomicFact {
    AtomicFact {
        id: id.to_string(),
        statement: statement.to_string(),
        keywords: vec!["work".to_string()],
        persons: vec!["Alice".to_string()],
        entities: vec!["Acme Corporation".to_string()],
        topic: Some("career".to_string()),
        timestamp: Some(Utc.with_ymd_and_hms(2026, 2, day, 9, 0, 0).unwrap()),
        location: None,
        confidence,
        entropy: None,
        extracted_at: Utc.with_ymd_and_hms(2026, 2, day, 10, 0, 0).unwrap(),
        level: 0,
        parent_cluster_id: None,
        source_fact_ids: vec![],
        source_window_id: Some("w".to_string()),
        source_chunk_id: None,
        source_session_file: Some("seed.jsonl".to_string()),
    }
}

async fn pipeline_with(
    config: PipelineConfig,
    extract_replies: Vec<String>,
    consolidate_replies: Vec<String>,
) -> (Arc<Pipeline>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::open_in_memory().await.unwrap());
    let extract_llm = Arc::new(MockLanguageModel::with_responses(extract_replies));
    let consolidate_llm = Arc::new(MockLanguageModel::with_responses(consolidate_replies));
    let pipeline = Pipeline::new(store.clone(), config, extract_llm, consolidate_llm)
        .unwrap()
        .with_clock(Arc::new(MockClock::default_instant()));
    (Arc::new(pipeline), store)
}

#[tokio::test]
async fn transcript_flows_into_durable_facts_and_stats() {
    let (pipeline, store) = pipeline_with(
        test_config(),
        vec![
            facts_response(&[("Alice works at Acme Corporation.", 0.9)]),
            // Second window wrapped in a code fence; both forms must parse.
            format!(
                "```json\n{}\n```",
                facts_response(&[("Alice leads the platform team.", 0.85)])
            ),
        ],
        vec![],
    )
    .await;

    let turns = vec![
        turn("user", "I work at Acme Corporation now."),
        turn("assistant", "Congratulations on the new role!"),
        turn("user", "I am leading the platform team there."),
        turn("assistant", "That sounds like a big step."),
    ];

    let summary = pipeline
        .process_transcript(&turns, "session-1.jsonl")
        .await
        .unwrap();

    assert_eq!(summary.windows_created, 2);
    assert_eq!(summary.windows_processed, 2);
    assert_eq!(summary.facts_extracted, 2);
    assert!(summary.errors.is_empty());
    let stat = summary.stat.expect("stat row is written");
    assert_eq!(stat.output_facts, 2);
    assert!(stat.compression_ratio > 0.0);

    // Facts are durable, level 0, with window provenance.
    let facts = store.get_all_facts().await.unwrap();
    assert_eq!(facts.len(), 2);
    assert!(facts.iter().all(|f| f.level == 0));
    assert!(facts.iter().all(|f| f.source_window_id.is_some()));
    assert!(facts
        .iter()
        .all(|f| f.source_session_file.as_deref() == Some("session-1.jsonl")));

    // Windows were persisted with their scores and decisions.
    let windows = store
        .get_windows_for_session("session-1.jsonl")
        .await
        .unwrap();
    assert_eq!(windows.len(), 2);
    assert!(windows.iter().all(|w| w.entropy.is_some() && w.should_process));

    // No kept window without a covering stat row.
    assert!(store.count_stats().await.unwrap() >= 1);

    let stats = pipeline.stats().await.unwrap();
    assert_eq!(stats.total_facts, 2);
    assert_eq!(stats.total_windows, 2);
    assert_eq!(stats.facts_by_level.get(&0), Some(&2));
    assert!(stats.avg_compression_ratio > 0.0);
}

#[tokio::test]
async fn window_failure_spares_siblings_and_is_reported() {
    let (pipeline, store) = pipeline_with(
        test_config(),
        vec![
            "this is not JSON".to_string(),
            facts_response(&[("Alice works at Acme Corporation.", 0.9)]),
        ],
        vec![],
    )
    .await;

    let turns = vec![
        turn("user", "Window one content."),
        turn("assistant", "Reply one."),
        turn("user", "Window two content."),
        turn("assistant", "Reply two."),
    ];

    let summary = pipeline
        .process_transcript(&turns, "session-2.jsonl")
        .await
        .unwrap();

    assert_eq!(summary.windows_processed, 2);
    assert_eq!(summary.facts_extracted, 1, "healthy window still lands");
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("bad LLM response"));

    assert_eq!(store.get_all_facts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_facts_across_windows_collapse() {
    let (pipeline, store) = pipeline_with(
        test_config(),
        vec![
            facts_response(&[("Alice works at Acme Corporation.", 0.9)]),
            // Same statement, different case: same identity tuple.
            facts_response(&[("alice works at ACME corporation.", 0.9)]),
        ],
        vec![],
    )
    .await;

    // Identity compares case-folded entity/person sets, so align them too.
    let turns = vec![
        turn("user", "I work at Acme Corporation."),
        turn("assistant", "Nice."),
        turn("user", "As I said, I work at Acme Corporation."),
        turn("assistant", "Noted."),
    ];

    let summary = pipeline
        .process_transcript(&turns, "session-3.jsonl")
        .await
        .unwrap();
    assert_eq!(summary.facts_extracted, 1, "case variants deduplicate");
    assert_eq!(store.get_all_facts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn confidence_gate_holds_through_the_pipeline() {
    let (pipeline, store) = pipeline_with(
        test_config(),
        vec![facts_response(&[("Alice might work somewhere.", 0.3)])],
        vec![],
    )
    .await;

    let turns = vec![turn("user", "Maybe something happened."), turn("assistant", "Maybe.")];
    let summary = pipeline
        .process_transcript(&turns, "session-4.jsonl")
        .await
        .unwrap();
    assert_eq!(summary.facts_extracted, 0);
    assert!(store.get_all_facts().await.unwrap().is_empty());
    // The call still leaves a stat row.
    assert_eq!(store.count_stats().await.unwrap(), 1);
}

#[tokio::test]
async fn consolidation_builds_a_level_hierarchy() {
    let (pipeline, store) = pipeline_with(
        PipelineConfig::default(),
        vec![],
        vec!["Alice spent early February working at Acme Corporation.".to_string()],
    )
    .await;

    store
        .put_facts(&[
            seed_fact("f1", "Alice presented the roadmap at Acme Corporation.", 1, 0.9),
            seed_fact("f2", "Alice shipped the billing migration at Acme Corporation.", 2, 0.95),
            seed_fact("f3", "Alice onboarded two engineers at Acme Corporation.", 3, 0.85),
        ])
        .await
        .unwrap();

    let summary = pipeline.run_consolidation().await.unwrap();
    assert_eq!(summary.facts_consolidated, 3);
    assert_eq!(summary.new_facts, 1);
    assert!(summary.compression_ratio > 0.0);

    let level1 = store.get_facts_by_level(1).await.unwrap();
    assert_eq!(level1.len(), 1);
    let consolidated = &level1[0];
    assert_eq!(
        consolidated.statement,
        "Alice spent early February working at Acme Corporation."
    );
    assert!(consolidated.persons.contains(&"Alice".to_string()));
    assert!(consolidated.entities.contains(&"Acme Corporation".to_string()));
    assert!((consolidated.confidence - 0.9).abs() < 1e-9, "mean of 0.9/0.95/0.85");
    assert!(consolidated.parent_cluster_id.is_some());
    assert_eq!(consolidated.source_fact_ids.len(), 3);
    assert_eq!(
        consolidated.timestamp,
        Some(Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap())
    );

    let stats = pipeline.stats().await.unwrap();
    assert_eq!(stats.total_facts, 4);
    assert_eq!(stats.facts_by_level.get(&1), Some(&1));
}

#[tokio::test]
async fn consolidation_does_not_rebuild_existing_summaries() {
    let (pipeline, store) = pipeline_with(
        PipelineConfig::default(),
        vec![],
        vec!["Alice worked at Acme Corporation.".to_string()],
    )
    .await;

    store
        .put_facts(&[
            seed_fact("f1", "Alice did task one at Acme Corporation.", 1, 0.9),
            seed_fact("f2", "Alice did task two at Acme Corporation.", 2, 0.9),
            seed_fact("f3", "Alice did task three at Acme Corporation.", 3, 0.9),
        ])
        .await
        .unwrap();

    let first = pipeline.run_consolidation().await.unwrap();
    assert_eq!(first.new_facts, 1);

    let second = pipeline.run_consolidation().await.unwrap();
    assert_eq!(second.new_facts, 0, "already-consolidated facts are not redone");
    assert_eq!(second.facts_consolidated, 0);
    assert_eq!(store.get_all_facts().await.unwrap().len(), 4);
}

#[tokio::test]
async fn consolidation_short_circuits_below_minimum() {
    let (pipeline, store) = pipeline_with(PipelineConfig::default(), vec![], vec![]).await;
    store
        .put_facts(&[
            seed_fact("f1", "Alice did one thing.", 1, 0.9),
            seed_fact("f2", "Alice did another thing.", 2, 0.9),
        ])
        .await
        .unwrap();

    let summary = pipeline.run_consolidation().await.unwrap();
    assert_eq!(summary.new_facts, 0);
    assert_eq!(summary.compression_ratio, 0.0);
}

#[tokio::test]
async fn failed_cluster_is_skipped_siblings_continue() {
    // Two disjoint clusters: Alice facts (earlier, consolidated first) and
    // Bob facts. The first cluster's LLM reply is an empty statement
    // (BadResponse); the second succeeds.
    let (pipeline, store) = pipeline_with(
        PipelineConfig::default(),
        vec![],
        vec![
            "   ".to_string(),
            "Bob ran Globex finance through mid February.".to_string(),
        ],
    )
    .await;

    let mut bob1 = seed_fact("b1", "Bob audited the ledgers at Globex.", 10, 0.8);
    let mut bob2 = seed_fact("b2", "Bob closed the quarter at Globex.", 11, 0.8);
    let mut bob3 = seed_fact("b3", "Bob hired an analyst at Globex.", 12, 0.8);
    for bob in [&mut bob1, &mut bob2, &mut bob3] {
        bob.persons = vec!["Bob".to_string()];
        bob.entities = vec!["Globex".to_string()];
        bob.topic = Some("finance".to_string());
    }

    store
        .put_facts(&[
            seed_fact("a1", "Alice planned the launch at Acme Corporation.", 1, 0.9),
            seed_fact("a2", "Alice ran the launch at Acme Corporation.", 2, 0.9),
            seed_fact("a3", "Alice reviewed the launch at Acme Corporation.", 3, 0.9),
            bob1,
            bob2,
            bob3,
        ])
        .await
        .unwrap();

    let summary = pipeline.run_consolidation().await.unwrap();
    assert_eq!(summary.new_facts, 1, "failing cluster skipped, sibling continues");

    let level1 = store.get_facts_by_level(1).await.unwrap();
    assert_eq!(level1.len(), 1);
    assert_eq!(level1[0].statement, "Bob ran Globex finance through mid February.");
}

#[tokio::test]
async fn search_adapts_strategy_to_query_complexity() {
    let (pipeline, store) = pipeline_with(PipelineConfig::default(), vec![], vec![]).await;
    store
        .put_facts(&[
            seed_fact("f1", "Alice works at Acme Corporation.", 1, 0.9),
            seed_fact("f2", "Alice collaborates with Bob on the API project.", 2, 0.9),
        ])
        .await
        .unwrap();

    let simple = pipeline.search("Where does Alice work?").await.unwrap();
    assert_eq!(simple.strategy.complexity, QueryComplexity::Simple);
    assert_eq!(simple.strategy.max_facts, 5);
    assert_eq!(simple.strategy.max_tokens, 500);
    assert!(!simple.facts.is_empty());

    let complex = pipeline
        .search("Why did Alice and Bob decide to collaborate on the API project?")
        .await
        .unwrap();
    assert_eq!(complex.strategy.complexity, QueryComplexity::Complex);
    assert_eq!(complex.strategy.max_tokens, 3000);
    assert!(!complex.strategy.prefer_consolidated);
    assert!(complex.analysis.requires_reasoning);
}

#[tokio::test]
async fn search_enforces_the_token_budget() {
    let mut config = PipelineConfig::default();
    config.retrieval.complex_query_tokens = 100;
    config.retrieval.include_parents = false;
    let (pipeline, store) = pipeline_with(config, vec![], vec![]).await;

    // Four facts of roughly 200 tokens each (4 chars per token).
    let statement = format!("Alice {}", "collaboration detail ".repeat(38));
    let facts: Vec<AtomicFact> = (0..4)
        .map(|i| seed_fact(&format!("f{i}"), &statement, 1 + i, 0.9))
        .collect();
    store.put_facts(&facts).await.unwrap();

    let result = pipeline
        .search("Why did Alice and Bob decide to collaborate on the API project?")
        .await
        .unwrap();
    assert!(result.facts.len() <= 1);
    assert!(result.total_tokens <= 100);
}

#[tokio::test]
async fn search_rejects_invalid_queries() {
    let (pipeline, _store) = pipeline_with(PipelineConfig::default(), vec![], vec![]).await;
    assert!(matches!(
        pipeline.search("").await.unwrap_err(),
        StrataError::QueryInvalid(_)
    ));
    assert!(matches!(
        pipeline.search(&"x".repeat(2000)).await.unwrap_err(),
        StrataError::QueryInvalid(_)
    ));
}

#[tokio::test]
async fn background_consolidation_runs_and_stops() {
    let mut config = PipelineConfig::default();
    config.background_consolidation = true;
    config.consolidation_interval_ms = 50;

    let (pipeline, store) = pipeline_with(
        config,
        vec![],
        vec!["Alice had a productive week at Acme Corporation.".to_string()],
    )
    .await;

    store
        .put_facts(&[
            seed_fact("f1", "Alice did task one at Acme Corporation.", 1, 0.9),
            seed_fact("f2", "Alice did task two at Acme Corporation.", 2, 0.9),
            seed_fact("f3", "Alice did task three at Acme Corporation.", 3, 0.9),
        ])
        .await
        .unwrap();

    pipeline.start();

    // Give the timer a few ticks to fire.
    let mut consolidated = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(25)).await;
        if !store.get_facts_by_level(1).await.unwrap().is_empty() {
            consolidated = true;
            break;
        }
    }
    assert!(consolidated, "background task should consolidate within the window");

    pipeline.stop();
    let err = pipeline.run_consolidation().await.unwrap_err();
    assert!(matches!(err, StrataError::Cancelled));
}

#[tokio::test]
async fn clear_resets_all_memory() {
    let (pipeline, store) = pipeline_with(
        test_config(),
        vec![facts_response(&[("Alice works at Acme Corporation.", 0.9)])],
        vec![],
    )
    .await;

    let turns = vec![turn("user", "I work at Acme Corporation."), turn("assistant", "Nice.")];
    pipeline.process_transcript(&turns, "s.jsonl").await.unwrap();
    assert!(pipeline.stats().await.unwrap().total_facts > 0);

    pipeline.clear().await.unwrap();
    let stats = pipeline.stats().await.unwrap();
    assert_eq!(stats.total_facts, 0);
    assert_eq!(stats.total_windows, 0);
    assert_eq!(stats.avg_compression_ratio, 0.0);
}
