//! Explanation payloads.
//!
//! Fixed-shape value objects, not dynamically-typed maps, so the output
//! contract (every field present, scores in `[0, 1]`) stays enforceable.

use serde::{Deserialize, Serialize};

/// A tag present on both query and candidate, with the candidate-side
/// confidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedTag {
    pub tag_code: String,
    pub confidence: f32,
}

/// Structured-activity evidence backing a candidate, when the candidate
/// pool was pre-filtered on feature aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeatureEvidence {
    pub region: String,
    pub stage: String,
    pub trade_count_sum: f64,
    pub score_30d_sum: f64,
    pub score_90d_sum: f64,
    pub score_365d_sum: f64,
}

/// Why a candidate scored what it scored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Explanation {
    pub matched_tags: Vec<MatchedTag>,
    pub top_terms: Vec<String>,
    pub semantic_score: f32,
    pub lexical_score: f32,
    pub taxonomy_score: f32,
    pub final_score: f32,
    pub explanation_text: String,
    pub feature_evidence: Option<FeatureEvidence>,
}

impl Explanation {
    pub fn summary_line(semantic: f32, lexical: f32, taxonomy: f32, final_score: f32) -> String {
        format!(
            "Semantic={semantic:.3}, Lexical={lexical:.3}, Taxonomy={taxonomy:.3}, Final={final_score:.3}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_is_fixed_format() {
        let line = Explanation::summary_line(0.5, 0.25, 0.125, 0.35);
        assert_eq!(line, "Semantic=0.500, Lexical=0.250, Taxonomy=0.125, Final=0.350");
    }

    #[test]
    fn serializes_with_all_contract_fields() {
        let explanation = Explanation {
            matched_tags: vec![MatchedTag { tag_code: "KNOCK_OUT".into(), confidence: 0.75 }],
            top_terms: vec!["eurusd".into()],
            semantic_score: 0.8,
            lexical_score: 0.4,
            taxonomy_score: 0.3,
            final_score: 0.56,
            explanation_text: "x".into(),
            feature_evidence: None,
        };
        let json = serde_json::to_value(&explanation).unwrap();
        for field in
            ["matched_tags", "top_terms", "semantic_score", "lexical_score", "taxonomy_score", "final_score", "explanation_text"]
        {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }
}
