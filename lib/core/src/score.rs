//! Hybrid score blending.
//!
//! Three independent components, each already in `[0, 1]`:
//! semantic (embedding cosine, rescaled), lexical (per-run BM25, min-max
//! scaled) and taxonomy (weighted tag-family overlap). Family weights are
//! adjusted per client type and renormalized to sum to 1.0 before the
//! overlap is computed; skipping that renormalization would silently
//! change the effective proportions of the 0.45/0.35/0.20 blend.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::taxonomy::{EntityTag, TagFamily, TaxonomySnapshot};

pub const WEIGHT_SEMANTIC: f32 = 0.45;
pub const WEIGHT_LEXICAL: f32 = 0.35;
pub const WEIGHT_TAXONOMY: f32 = 0.20;

/// Families participating in overlap scoring, in canonical order, with
/// their base weights (sum 1.0).
pub const BASE_FAMILY_WEIGHTS: &[(TagFamily, f32)] = &[
    (TagFamily::Product, 0.30),
    (TagFamily::Intent, 0.25),
    (TagFamily::Theme, 0.20),
    (TagFamily::Risk, 0.10),
    (TagFamily::Tenor, 0.10),
    (TagFamily::MarketFocus, 0.05),
];

/// Floor applied to every family weight before renormalization, so a
/// reduction can never zero a family out entirely.
const WEIGHT_FLOOR: f32 = 0.01;

/// The three component scores plus their blend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComponentScores {
    pub semantic: f32,
    pub lexical: f32,
    pub taxonomy: f32,
    pub final_score: f32,
}

impl ComponentScores {
    /// Blend `0.45*semantic + 0.35*lexical + 0.20*taxonomy`.
    pub fn blend(semantic: f32, lexical: f32, taxonomy: f32) -> Self {
        let final_score =
            WEIGHT_SEMANTIC * semantic + WEIGHT_LEXICAL * lexical + WEIGHT_TAXONOMY * taxonomy;
        Self { semantic, lexical, taxonomy, final_score }
    }

    /// True when the candidate carried no signal on any component.
    pub fn is_zero(&self) -> bool {
        self.semantic <= 0.0 && self.lexical <= 0.0 && self.taxonomy <= 0.0
    }
}

/// Family weights adjusted for the client type prefix and renormalized
/// to sum to 1.0.
///
/// `HF_*` leans into Intent and Theme; `ASSET_MANAGER_*` into Product,
/// Risk and Tenor; `BANK` into Product and MarketFocus. Unknown types
/// keep the base weights.
pub fn adjusted_family_weights(client_type: &str) -> Vec<(TagFamily, f32)> {
    let mut weights: Vec<(TagFamily, f32)> = BASE_FAMILY_WEIGHTS.to_vec();

    let mut bump = |family: TagFamily, delta: f32, weights: &mut Vec<(TagFamily, f32)>| {
        if let Some(entry) = weights.iter_mut().find(|(f, _)| *f == family) {
            entry.1 += delta;
        }
    };

    if client_type.starts_with("HF_") {
        bump(TagFamily::Intent, 0.05, &mut weights);
        bump(TagFamily::Theme, 0.05, &mut weights);
        bump(TagFamily::Product, -0.05, &mut weights);
        bump(TagFamily::MarketFocus, -0.05, &mut weights);
    } else if client_type.starts_with("ASSET_MANAGER_") {
        bump(TagFamily::Product, 0.05, &mut weights);
        bump(TagFamily::Risk, 0.03, &mut weights);
        bump(TagFamily::Tenor, 0.02, &mut weights);
        bump(TagFamily::Intent, -0.05, &mut weights);
        bump(TagFamily::Theme, -0.05, &mut weights);
    } else if client_type == "BANK" {
        bump(TagFamily::Product, 0.05, &mut weights);
        bump(TagFamily::MarketFocus, 0.05, &mut weights);
        bump(TagFamily::Intent, -0.05, &mut weights);
        bump(TagFamily::Theme, -0.05, &mut weights);
    }

    for (_, w) in weights.iter_mut() {
        *w = w.max(WEIGHT_FLOOR);
    }
    let total: f32 = weights.iter().map(|(_, w)| *w).sum();
    for (_, w) in weights.iter_mut() {
        *w /= total;
    }
    weights
}

/// Group tag codes by family, dropping codes outside the snapshot's
/// vocabulary and the ClientType family (which never participates in
/// overlap scoring).
pub fn family_tag_map(
    tags: &[EntityTag],
    snapshot: &TaxonomySnapshot,
) -> AHashMap<TagFamily, AHashSet<String>> {
    let mut map: AHashMap<TagFamily, AHashSet<String>> = AHashMap::new();
    for tag in tags {
        if let Some(family) = snapshot.family_of(&tag.tag_code) {
            if family == TagFamily::ClientType {
                continue;
            }
            map.entry(family).or_default().insert(tag.tag_code.clone());
        }
    }
    map
}

/// Weighted tag-family overlap:
/// `sum_f w_f * |query_f ∩ candidate_f| / max(1, |query_f|)`, clamped to
/// `[0, 1]`.
pub fn taxonomy_overlap(
    query: &AHashMap<TagFamily, AHashSet<String>>,
    candidate: &AHashMap<TagFamily, AHashSet<String>>,
    family_weights: &[(TagFamily, f32)],
) -> f32 {
    let mut score = 0.0f32;
    for (family, weight) in family_weights {
        let q = match query.get(family) {
            Some(q) if !q.is_empty() => q,
            _ => continue,
        };
        let shared = match candidate.get(family) {
            Some(c) => q.intersection(c).count(),
            None => 0,
        };
        score += weight * (shared as f32 / q.len().max(1) as f32);
    }
    score.clamp(0.0, 1.0)
}

/// Tags present on both sides, carrying the candidate's confidence,
/// sorted by code for stable output.
pub fn matched_tags(
    query: &AHashMap<TagFamily, AHashSet<String>>,
    candidate_tags: &[EntityTag],
    snapshot: &TaxonomySnapshot,
) -> Vec<crate::explain::MatchedTag> {
    let query_codes: AHashSet<&String> = query.values().flatten().collect();
    let mut matched: Vec<crate::explain::MatchedTag> = candidate_tags
        .iter()
        .filter(|t| {
            snapshot.family_of(&t.tag_code).is_some_and(|f| f != TagFamily::ClientType)
                && query_codes.contains(&t.tag_code)
        })
        .map(|t| crate::explain::MatchedTag { tag_code: t.tag_code.clone(), confidence: t.confidence })
        .collect();
    matched.sort_by(|a, b| a.tag_code.cmp(&b.tag_code));
    matched.dedup_by(|a, b| a.tag_code == b.tag_code);
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::default_snapshot;

    fn weights_sum(weights: &[(TagFamily, f32)]) -> f32 {
        weights.iter().map(|(_, w)| *w).sum()
    }

    #[test]
    fn base_weights_sum_to_one() {
        assert!((weights_sum(BASE_FAMILY_WEIGHTS) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn every_override_branch_renormalizes_to_one() {
        for client_type in
            ["HF_MACRO", "HF_SYSTEMATIC", "ASSET_MANAGER_LONG_ONLY", "BANK", "CORPORATE_TREASURY"]
        {
            let weights = adjusted_family_weights(client_type);
            assert!(
                (weights_sum(&weights) - 1.0).abs() < 1e-6,
                "weights for {client_type} do not renormalize"
            );
            assert!(weights.iter().all(|(_, w)| *w > 0.0));
        }
    }

    #[test]
    fn hedge_fund_boosts_intent_and_theme() {
        let base: AHashMap<_, _> = BASE_FAMILY_WEIGHTS.iter().copied().collect();
        let hf: AHashMap<_, _> = adjusted_family_weights("HF_MACRO").into_iter().collect();
        assert!(hf[&TagFamily::Intent] > base[&TagFamily::Intent]);
        assert!(hf[&TagFamily::Theme] > base[&TagFamily::Theme]);
        assert!(hf[&TagFamily::Product] < base[&TagFamily::Product]);
    }

    #[test]
    fn client_type_changes_taxonomy_score_for_identical_tags() {
        let snapshot = default_snapshot();
        let tags = vec![
            EntityTag::rule("KNOCK_OUT", 0.8),
            EntityTag::rule("HEDGING", 0.7),
            EntityTag::rule("CENTRAL_BANK", 0.6),
        ];
        let query = family_tag_map(&tags, &snapshot);
        // Candidate shares Intent and Theme but not Product.
        let candidate_tags = vec![EntityTag::rule("HEDGING", 0.7), EntityTag::rule("CENTRAL_BANK", 0.6)];
        let candidate = family_tag_map(&candidate_tags, &snapshot);

        let hf = taxonomy_overlap(&query, &candidate, &adjusted_family_weights("HF_MACRO"));
        let am = taxonomy_overlap(
            &query,
            &candidate,
            &adjusted_family_weights("ASSET_MANAGER_LONG_ONLY"),
        );
        assert!(hf > am, "HF weighting must favor Intent/Theme overlap ({hf} vs {am})");
    }

    #[test]
    fn blend_uses_contract_weights_and_stays_in_unit_interval() {
        let scores = ComponentScores::blend(1.0, 0.0, 0.0);
        assert!((scores.final_score - 0.45).abs() < 1e-9);
        let scores = ComponentScores::blend(1.0, 1.0, 1.0);
        assert!((scores.final_score - 1.0).abs() < 1e-6);
        let scores = ComponentScores::blend(0.0, 0.0, 0.0);
        assert!(scores.is_zero());
    }

    #[test]
    fn overlap_uses_query_side_denominator() {
        let snapshot = default_snapshot();
        let query = family_tag_map(
            &[EntityTag::rule("KNOCK_OUT", 0.8), EntityTag::rule("KNOCK_IN", 0.8)],
            &snapshot,
        );
        // Candidate has one of two query Product tags plus noise that must
        // not dilute the score (denominator is query-side).
        let candidate = family_tag_map(
            &[
                EntityTag::rule("KNOCK_OUT", 0.8),
                EntityTag::rule("NDF", 0.5),
                EntityTag::rule("TARF", 0.5),
            ],
            &snapshot,
        );
        let weights = vec![(TagFamily::Product, 1.0)];
        let score = taxonomy_overlap(&query, &candidate, &weights);
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn manual_tag_survives_into_matched_tags() {
        let snapshot = default_snapshot();
        let query = family_tag_map(&[EntityTag::rule("CARRY", 0.9)], &snapshot);
        let candidate_tags = vec![EntityTag::manual("CARRY")];
        let matched = matched_tags(&query, &candidate_tags, &snapshot);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].tag_code, "CARRY");
        assert_eq!(matched[0].confidence, 1.0);
    }
}
