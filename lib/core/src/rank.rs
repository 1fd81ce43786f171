//! Deterministic ordering of scored candidates and run records.
//!
//! Sort by final score descending, tie-break by semantic score
//! descending, then candidate id ascending: ties are never left to map
//! iteration order, so identical inputs always produce the identical
//! ordered result list. Candidates with zero signal on all three
//! components are excluded entirely rather than shown with an empty
//! explanation.

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::entity::{ConfidenceFlag, EntityKey};
use crate::explain::Explanation;
use crate::score::ComponentScores;

/// The ranking jobs: `JobA` ranks ideas for a client, `JobB` ranks
/// clients for an idea, `JobBPm` ranks portfolio managers for an idea.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunType {
    JobA,
    JobB,
    JobBPm,
}

/// Immutable record of one ranking invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchRun {
    pub run_id: i64,
    pub run_type: RunType,
    pub input_ref: String,
    pub executed_at: DateTime<Utc>,
}

/// One ranked candidate within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub target: EntityKey,
    pub target_name: String,
    pub confidence_flag: ConfidenceFlag,
    pub scores: ComponentScores,
    pub explanation: Explanation,
}

/// Feedback labels attached to a result after the fact. Append-only,
/// consumed for reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackLabel {
    Useful,
    NotUseful,
    Contacted,
    Traded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub run_id: i64,
    pub target: EntityKey,
    pub label: FeedbackLabel,
    pub comment: Option<String>,
}

/// Order results, drop zero-signal candidates, cap at `top_n`.
pub fn rank(results: Vec<MatchResult>, top_n: usize) -> Vec<MatchResult> {
    let mut surviving: Vec<MatchResult> =
        results.into_iter().filter(|r| !r.scores.is_zero()).collect();
    surviving.sort_by_key(|r| {
        (
            Reverse(OrderedFloat(r.scores.final_score)),
            Reverse(OrderedFloat(r.scores.semantic)),
            r.target.entity_id,
        )
    });
    surviving.truncate(top_n);
    surviving
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: i64, semantic: f32, lexical: f32, taxonomy: f32) -> MatchResult {
        let scores = ComponentScores::blend(semantic, lexical, taxonomy);
        MatchResult {
            target: EntityKey::client(id),
            target_name: format!("client-{id}"),
            confidence_flag: ConfidenceFlag::Normal,
            scores,
            explanation: Explanation {
                matched_tags: Vec::new(),
                top_terms: Vec::new(),
                semantic_score: scores.semantic,
                lexical_score: scores.lexical,
                taxonomy_score: scores.taxonomy,
                final_score: scores.final_score,
                explanation_text: Explanation::summary_line(
                    scores.semantic,
                    scores.lexical,
                    scores.taxonomy,
                    scores.final_score,
                ),
                feature_evidence: None,
            },
        }
    }

    #[test]
    fn orders_by_final_descending() {
        let ranked = rank(vec![result(1, 0.2, 0.2, 0.2), result(2, 0.9, 0.9, 0.9)], 10);
        assert_eq!(ranked[0].target.entity_id, 2);
        assert_eq!(ranked[1].target.entity_id, 1);
    }

    #[test]
    fn ties_break_on_semantic_then_id() {
        // Same final score; b has higher semantic.
        let mut a = result(1, 0.40, 0.60, 0.50);
        let mut b = result(2, 0.60, 0.34, 0.50);
        a.scores.final_score = 0.49;
        b.scores.final_score = 0.49;
        let ranked = rank(vec![a, b], 10);
        assert_eq!(ranked[0].target.entity_id, 2);

        // Fully identical scores fall back to id ascending.
        let ranked = rank(vec![result(7, 0.5, 0.5, 0.5), result(3, 0.5, 0.5, 0.5)], 10);
        assert_eq!(ranked[0].target.entity_id, 3);
        assert_eq!(ranked[1].target.entity_id, 7);
    }

    #[test]
    fn zero_signal_candidates_are_excluded() {
        let ranked = rank(vec![result(1, 0.0, 0.0, 0.0), result(2, 0.1, 0.0, 0.0)], 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].target.entity_id, 2);
    }

    #[test]
    fn ranking_is_reproducible_across_invocations() {
        let inputs = || {
            vec![
                result(5, 0.3, 0.8, 0.1),
                result(2, 0.9, 0.1, 0.4),
                result(9, 0.3, 0.8, 0.1),
                result(1, 0.9, 0.1, 0.4),
            ]
        };
        let first: Vec<i64> = rank(inputs(), 10).iter().map(|r| r.target.entity_id).collect();
        for _ in 0..5 {
            let again: Vec<i64> = rank(inputs(), 10).iter().map(|r| r.target.entity_id).collect();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn truncates_to_top_n() {
        let ranked = rank(
            vec![result(1, 0.5, 0.5, 0.5), result(2, 0.6, 0.5, 0.5), result(3, 0.7, 0.5, 0.5)],
            2,
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].target.entity_id, 3);
    }
}
