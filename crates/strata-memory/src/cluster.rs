// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity scoring and greedy seed-based clustering.
//!
//! Similarity blends up to four dimensions, each contributing only when its
//! config switch is on; the final score is normalised by the sum of the
//! enabled weights so it stays in [0, 1] regardless of which dimensions run.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use strata_config::ConsolidationConfig;
use strata_core::{intersect_casefold, AtomicFact};
use uuid::Uuid;

const ENTITY_WEIGHT: f64 = 0.3;
const PERSON_WEIGHT: f64 = 0.3;
const TOPIC_WEIGHT: f64 = 0.2;
const TEMPORAL_WEIGHT: f64 = 0.2;

/// A transient group of related facts awaiting consolidation.
///
/// Never persisted as a row; only its id survives, in the consolidated
/// fact's `parent_cluster_id`.
#[derive(Debug, Clone)]
pub struct FactCluster {
    /// Cluster id, referenced by the consolidated fact.
    pub id: String,
    /// Member facts, all of equal level.
    pub facts: Vec<AtomicFact>,
    /// Entities present in every member.
    pub common_entities: Vec<String>,
    /// Persons present in every member.
    pub common_persons: Vec<String>,
    /// Most frequent topic among members, if any member has one.
    pub topic: Option<String>,
    /// Min and max timestamp over dated members.
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Mean pairwise similarity among members.
    pub coherence_score: f64,
}

/// Similarity between two facts in [0, 1].
///
/// Only enabled dimensions contribute to both the numerator and the weight
/// normaliser; with no dimensions enabled the score is 0.
pub fn similarity(a: &AtomicFact, b: &AtomicFact, config: &ConsolidationConfig) -> f64 {
    let mut score = 0.0;
    let mut weight = 0.0;

    if config.entity_clustering {
        weight += ENTITY_WEIGHT + PERSON_WEIGHT;
        score += ENTITY_WEIGHT * jaccard(&a.entities, &b.entities);
        score += PERSON_WEIGHT * jaccard(&a.persons, &b.persons);
    }

    if config.topic_clustering {
        weight += TOPIC_WEIGHT;
        if let (Some(ta), Some(tb)) = (&a.topic, &b.topic)
            && ta.eq_ignore_ascii_case(tb)
        {
            score += TOPIC_WEIGHT;
        }
    }

    if config.temporal_clustering {
        weight += TEMPORAL_WEIGHT;
        score += TEMPORAL_WEIGHT * temporal_proximity(a, b, config.temporal_window_ms);
    }

    if weight == 0.0 { 0.0 } else { score / weight }
}

/// Case-folded Jaccard index; 0 when the union is empty.
fn jaccard(a: &[String], b: &[String]) -> f64 {
    let set_a: std::collections::HashSet<String> =
        a.iter().map(|s| s.to_lowercase()).collect();
    let set_b: std::collections::HashSet<String> =
        b.iter().map(|s| s.to_lowercase()).collect();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / union as f64
}

/// `1 - dt/window` inside the temporal window, 0 outside it or when either
/// fact is undated.
fn temporal_proximity(a: &AtomicFact, b: &AtomicFact, window_ms: u64) -> f64 {
    let (Some(ta), Some(tb)) = (a.timestamp, b.timestamp) else {
        return 0.0;
    };
    let dt = (ta - tb).num_milliseconds().unsigned_abs();
    if dt > window_ms {
        0.0
    } else {
        1.0 - dt as f64 / window_ms as f64
    }
}

/// Greedy seed-based clustering.
///
/// Facts are visited ascending by timestamp (undated last). Each unassigned
/// fact seeds a cluster; every remaining unassigned fact joins when its
/// mean similarity to the current members reaches the threshold, until the
/// cluster is full. Clusters below the minimum size are discarded (their
/// members are retried on the next run).
pub fn cluster_facts(facts: &[AtomicFact], config: &ConsolidationConfig) -> Vec<FactCluster> {
    let mut order: Vec<usize> = (0..facts.len()).collect();
    order.sort_by_key(|&i| match facts[i].timestamp {
        Some(ts) => (0, ts.timestamp_millis()),
        None => (1, 0),
    });

    let mut assigned = vec![false; facts.len()];
    let mut clusters = Vec::new();

    for &seed in &order {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut members = vec![seed];

        for &candidate in &order {
            if assigned[candidate] {
                continue;
            }
            if members.len() >= config.max_facts_per_cluster {
                break;
            }
            let mean: f64 = members
                .iter()
                .map(|&m| similarity(&facts[candidate], &facts[m], config))
                .sum::<f64>()
                / members.len() as f64;
            if mean >= config.similarity_threshold {
                assigned[candidate] = true;
                members.push(candidate);
            }
        }

        if members.len() >= config.min_facts_for_cluster {
            let member_facts: Vec<AtomicFact> =
                members.iter().map(|&i| facts[i].clone()).collect();
            clusters.push(build_cluster(member_facts, config));
        }
    }

    clusters
}

fn build_cluster(facts: Vec<AtomicFact>, config: &ConsolidationConfig) -> FactCluster {
    let entity_sets: Vec<&[String]> = facts.iter().map(|f| f.entities.as_slice()).collect();
    let person_sets: Vec<&[String]> = facts.iter().map(|f| f.persons.as_slice()).collect();

    FactCluster {
        id: Uuid::new_v4().to_string(),
        common_entities: intersect_casefold(&entity_sets),
        common_persons: intersect_casefold(&person_sets),
        topic: modal_topic(&facts),
        time_range: time_range(&facts),
        coherence_score: coherence(&facts, config),
        facts,
    }
}

/// Most frequent topic among members (case-insensitive counting, first
/// spelling preserved); `None` when no member has one.
fn modal_topic(facts: &[AtomicFact]) -> Option<String> {
    let mut counts: HashMap<String, (usize, String)> = HashMap::new();
    for fact in facts {
        if let Some(topic) = &fact.topic {
            let entry = counts
                .entry(topic.to_lowercase())
                .or_insert((0, topic.clone()));
            entry.0 += 1;
        }
    }
    counts
        .into_values()
        .max_by_key(|(count, _)| *count)
        .map(|(_, topic)| topic)
}

fn time_range(facts: &[AtomicFact]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let dated: Vec<DateTime<Utc>> = facts.iter().filter_map(|f| f.timestamp).collect();
    let min = dated.iter().min()?;
    let max = dated.iter().max()?;
    Some((*min, *max))
}

/// Mean pairwise similarity; 1 for a single-member cluster.
fn coherence(facts: &[AtomicFact], config: &ConsolidationConfig) -> f64 {
    if facts.len() < 2 {
        return 1.0;
    }
    let mut total = 0.0;
    let mut pairs = 0;
    for i in 0..facts.len() {
        for j in (i + 1)..facts.len() {
            total += similarity(&facts[i], &facts[j], config);
            pairs += 1;
        }
    }
    total / pairs as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fact(
        id: &str,
        entities: &[&str],
        persons: &[&str],
        topic: Option<&str>,
        day: Option<u32>,
    ) -> AtomicFact {
        AtomicFact {
            id: id.to_string(),
            statement: format!("Statement {id}."),
            keywords: vec![],
            persons: persons.iter().map(|s| s.to_string()).collect(),
            entities: entities.iter().map(|s| s.to_string()).collect(),
            topic: topic.map(str::to_string),
            timestamp: day.map(|d| Utc.with_ymd_and_hms(2026, 2, d, 9, 0, 0).unwrap()),
            location: None,
            confidence: 0.9,
            entropy: None,
            extracted_at: Utc::now(),
            level: 0,
            parent_cluster_id: None,
            source_fact_ids: vec![],
            source_window_id: Some("w".to_string()),
            source_chunk_id: None,
            source_session_file: None,
        }
    }

    #[test]
    fn similarity_is_reflexive_symmetric_bounded() {
        let config = ConsolidationConfig::default();
        let a = fact("a", &["Acme"], &["Alice"], Some("career"), Some(1));
        let b = fact("b", &["Globex"], &["Bob"], Some("travel"), Some(20));

        assert!((similarity(&a, &a, &config) - 1.0).abs() < 1e-9);
        assert_eq!(similarity(&a, &b, &config), similarity(&b, &a, &config));
        let s = similarity(&a, &b, &config);
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn no_enabled_dimensions_scores_zero() {
        let mut config = ConsolidationConfig::default();
        config.entity_clustering = false;
        config.topic_clustering = false;
        config.temporal_clustering = false;
        let a = fact("a", &["Acme"], &["Alice"], Some("career"), Some(1));
        assert_eq!(similarity(&a, &a, &config), 0.0);
    }

    #[test]
    fn disabled_dimension_drops_out_of_normaliser() {
        let mut config = ConsolidationConfig::default();
        config.temporal_clustering = false;
        // Identical on entities/persons/topic, wildly different in time:
        // with the temporal dimension off, still a perfect score.
        let a = fact("a", &["Acme"], &["Alice"], Some("career"), Some(1));
        let b = fact("b", &["Acme"], &["Alice"], Some("career"), Some(28));
        assert!((similarity(&a, &b, &config) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn temporal_proximity_decays_linearly() {
        let config = ConsolidationConfig::default();
        let a = fact("a", &["Acme"], &["Alice"], Some("career"), Some(1));
        let b = fact("b", &["Acme"], &["Alice"], Some("career"), Some(2));
        // One day apart in a seven-day window: 1 - 1/7 on the temporal axis,
        // everything else exact.
        let expected = (0.3 + 0.3 + 0.2 + 0.2 * (1.0 - 1.0 / 7.0)) / 1.0;
        assert!((similarity(&a, &b, &config) - expected).abs() < 1e-9);
    }

    #[test]
    fn undated_facts_score_zero_on_temporal() {
        let config = ConsolidationConfig::default();
        let a = fact("a", &["Acme"], &["Alice"], Some("career"), None);
        let b = fact("b", &["Acme"], &["Alice"], Some("career"), Some(2));
        let expected = 0.3 + 0.3 + 0.2;
        assert!((similarity(&a, &b, &config) - expected).abs() < 1e-9);
    }

    #[test]
    fn related_facts_cluster_together() {
        let config = ConsolidationConfig::default();
        let facts = vec![
            fact("a", &["Acme Corporation"], &["Alice"], Some("career"), Some(1)),
            fact("b", &["Acme Corporation"], &["Alice"], Some("career"), Some(2)),
            fact("c", &["Acme Corporation"], &["Alice"], Some("career"), Some(3)),
            fact("x", &["Mars"], &["Zorg"], Some("space"), Some(20)),
        ];
        let clusters = cluster_facts(&facts, &config);
        assert_eq!(clusters.len(), 1, "only the Alice facts form a big-enough cluster");

        let cluster = &clusters[0];
        assert_eq!(cluster.facts.len(), 3);
        assert_eq!(cluster.common_persons, vec!["Alice"]);
        assert_eq!(cluster.common_entities, vec!["Acme Corporation"]);
        assert_eq!(cluster.topic.as_deref(), Some("career"));
        assert!(cluster.coherence_score > 0.5);
        let (start, end) = cluster.time_range.unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap());
    }

    #[test]
    fn small_groups_are_discarded() {
        let config = ConsolidationConfig::default();
        let facts = vec![
            fact("a", &["Acme"], &["Alice"], Some("career"), Some(1)),
            fact("b", &["Acme"], &["Alice"], Some("career"), Some(2)),
        ];
        assert!(cluster_facts(&facts, &config).is_empty());
    }

    #[test]
    fn cluster_respects_max_size() {
        let mut config = ConsolidationConfig::default();
        config.max_facts_per_cluster = 4;
        let facts: Vec<AtomicFact> = (1..=8)
            .map(|i| fact(&format!("f{i}"), &["Acme"], &["Alice"], Some("career"), Some(i)))
            .collect();
        let clusters = cluster_facts(&facts, &config);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.facts.len() == 4));
    }

    #[test]
    fn dated_facts_sort_before_undated() {
        let config = ConsolidationConfig::default();
        let facts = vec![
            fact("undated", &["Acme"], &["Alice"], Some("career"), None),
            fact("day2", &["Acme"], &["Alice"], Some("career"), Some(2)),
            fact("day1", &["Acme"], &["Alice"], Some("career"), Some(1)),
        ];
        let clusters = cluster_facts(&facts, &config);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].facts[0].id, "day1", "earliest dated fact seeds first");
    }

    #[test]
    fn modal_topic_counts_case_insensitively() {
        let facts = vec![
            fact("a", &[], &[], Some("Career"), None),
            fact("b", &[], &[], Some("career"), None),
            fact("c", &[], &[], Some("travel"), None),
        ];
        assert_eq!(modal_topic(&facts).as_deref(), Some("Career"));
        assert_eq!(modal_topic(&[fact("d", &[], &[], None, None)]), None);
    }
}
