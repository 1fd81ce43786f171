//! Profile composition.
//!
//! Merges an entity's observations into the derived profile: aggregated
//! text (highest-weight observation first), merged tag set (MANUAL
//! shadows RULE/MODEL) and a profile embedding with a deterministic hash
//! fallback for sparse text. The snapshot is built fully off to the side
//! and published as one atomic replacement, never mutated in place.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decay::{half_life_weight, PROFILE_HALF_LIFE_DAYS};
use crate::embedding::{hash_embedding, EmbeddingProvider};
use crate::entity::{ConfidenceFlag, EntityKey, Observation};
use crate::tagging::TagExtractor;
use crate::taxonomy::{merge_with_manual_precedence, EntityTag};

/// The authoritative derived profile for one entity. Rebuildable at any
/// time from the observation log; overwritten, never appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSnapshot {
    pub entity: EntityKey,
    pub text: String,
    pub tags: Vec<EntityTag>,
    pub vector: Vec<f32>,
    pub confidence_flag: ConfidenceFlag,
}

/// Weight of one observation: signal-type base weight, times 90-day
/// half-life recency decay, times clamped source confidence.
pub fn observation_weight(observation: &Observation, now: NaiveDate) -> f64 {
    let age_days = (now - observation.obs_date).num_days();
    f64::from(observation.obs_type.signal_weight())
        * half_life_weight(age_days, PROFILE_HALF_LIFE_DAYS)
        * f64::from(observation.source_confidence.clamp(0.0, 1.0))
}

/// Composes profiles from observations, rule tags and embeddings.
pub struct ProfileComposer<'a> {
    extractor: &'a TagExtractor,
    provider: &'a dyn EmbeddingProvider,
}

impl<'a> ProfileComposer<'a> {
    pub fn new(extractor: &'a TagExtractor, provider: &'a dyn EmbeddingProvider) -> Self {
        Self { extractor, provider }
    }

    /// Build a fresh snapshot. Deterministic and independent of the
    /// caller's observation ordering: observations are canonically
    /// ordered by weight before the text is assembled, so the extracted
    /// tag set and vector are stable across recomputations.
    pub fn compose(
        &self,
        entity: EntityKey,
        observations: &[Observation],
        manual_tags: &[EntityTag],
        now: NaiveDate,
    ) -> ProfileSnapshot {
        let mut weighted: Vec<(f64, &Observation)> =
            observations.iter().map(|obs| (observation_weight(obs, now), obs)).collect();
        weighted.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| b.1.obs_date.cmp(&a.1.obs_date))
                .then_with(|| a.1.obs_id.cmp(&b.1.obs_id))
        });

        let normalizer = self.extractor.normalizer();
        let chunks: Vec<String> = weighted
            .iter()
            .map(|(_, obs)| normalizer.normalize(&obs.obs_text))
            .filter(|text| !text.is_empty())
            .collect();
        let text = chunks.join(" ");

        let mut tags: Vec<EntityTag> = self
            .extractor
            .extract(&text)
            .into_iter()
            .map(|t| EntityTag::rule(t.tag_code, t.confidence))
            .collect();
        tags.extend_from_slice(manual_tags);
        let tags = merge_with_manual_precedence(&tags);

        let mut confidence_flag =
            if observations.is_empty() || text.is_empty() { ConfidenceFlag::Low } else { ConfidenceFlag::Normal };

        let vector = match self.provider.embed(&text) {
            Some(v) if v.iter().any(|x| *x != 0.0) => v,
            _ => {
                confidence_flag = ConfidenceFlag::Low;
                hash_embedding(&text, self.provider.dimension())
            }
        };

        ProfileSnapshot { entity, text, tags, vector, confidence_flag }
    }
}
