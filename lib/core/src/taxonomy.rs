//! Versioned taxonomy and synonym vocabulary.
//!
//! A [`TaxonomySnapshot`] is the read-only vocabulary for one run: tags
//! grouped into families, plus the synonym table used by the normalizer
//! and tag projector. Snapshots are keyed by version and never silently
//! redefined within a version; scoring against an unknown version is a
//! fatal configuration error.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Tag family used to structure overlap scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagFamily {
    Product,
    Intent,
    Theme,
    Risk,
    Tenor,
    MarketFocus,
    /// Client classification tags; never extracted from free text.
    ClientType,
}

impl fmt::Display for TagFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagFamily::Product => "PRODUCT",
            TagFamily::Intent => "INTENT",
            TagFamily::Theme => "THEME",
            TagFamily::Risk => "RISK",
            TagFamily::Tenor => "TENOR",
            TagFamily::MarketFocus => "MARKET_FOCUS",
            TagFamily::ClientType => "CLIENT_TYPE",
        };
        write!(f, "{}", name)
    }
}

/// One controlled-vocabulary tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxonomyTag {
    pub code: String,
    pub family: TagFamily,
    pub label: String,
}

/// Maps a surface form seen in raw text to its canonical form, optionally
/// carrying the tag the surface form is evidence for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Synonym {
    pub surface_form: String,
    pub canonical_form: String,
    pub tag_code: Option<String>,
}

/// Provenance of a tag assignment. `Manual` always wins over rule- or
/// model-derived assignments of the same code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagOrigin {
    Rule,
    Model,
    Manual,
}

/// A tag assigned to an entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityTag {
    pub tag_code: String,
    pub confidence: f32,
    pub origin: TagOrigin,
}

impl EntityTag {
    pub fn rule(tag_code: impl Into<String>, confidence: f32) -> Self {
        Self { tag_code: tag_code.into(), confidence, origin: TagOrigin::Rule }
    }

    pub fn manual(tag_code: impl Into<String>) -> Self {
        Self { tag_code: tag_code.into(), confidence: 1.0, origin: TagOrigin::Manual }
    }
}

/// Collapse multiple assignments of the same tag code into one, with
/// MANUAL rows suppressing RULE/MODEL rows of the same code. Output is
/// ordered by confidence descending, then code ascending.
pub fn merge_with_manual_precedence(tags: &[EntityTag]) -> Vec<EntityTag> {
    let mut by_code: AHashMap<&str, &EntityTag> = AHashMap::new();
    for tag in tags {
        match by_code.get(tag.tag_code.as_str()) {
            None => {
                by_code.insert(&tag.tag_code, tag);
            }
            Some(existing) => {
                let manual_new = tag.origin == TagOrigin::Manual;
                let manual_old = existing.origin == TagOrigin::Manual;
                let wins = match (manual_new, manual_old) {
                    (true, false) => true,
                    (false, true) => false,
                    _ => tag.confidence > existing.confidence,
                };
                if wins {
                    by_code.insert(&tag.tag_code, tag);
                }
            }
        }
    }
    let mut merged: Vec<EntityTag> = by_code.into_values().cloned().collect();
    merged.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.tag_code.cmp(&b.tag_code))
    });
    merged
}

/// Read-only taxonomy + synonym vocabulary for one version.
#[derive(Debug, Clone)]
pub struct TaxonomySnapshot {
    version: String,
    tags: Vec<TaxonomyTag>,
    synonyms: Vec<Synonym>,
    family_by_code: AHashMap<String, TagFamily>,
}

impl TaxonomySnapshot {
    pub fn new(version: impl Into<String>, tags: Vec<TaxonomyTag>, synonyms: Vec<Synonym>) -> Self {
        let family_by_code =
            tags.iter().map(|t| (t.code.clone(), t.family)).collect::<AHashMap<_, _>>();
        Self { version: version.into(), tags, synonyms, family_by_code }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn tags(&self) -> &[TaxonomyTag] {
        &self.tags
    }

    pub fn synonyms(&self) -> &[Synonym] {
        &self.synonyms
    }

    pub fn family_of(&self, tag_code: &str) -> Option<TagFamily> {
        self.family_by_code.get(tag_code).copied()
    }

    /// Resolve the family of a tag code, failing on codes outside this
    /// vocabulary version.
    pub fn require_family(&self, tag_code: &str) -> Result<TagFamily> {
        self.family_of(tag_code)
            .ok_or_else(|| Error::UnknownTaxonomyVersion(format!("{} / {}", self.version, tag_code)))
    }

    /// Surface -> canonical pairs for the normalizer.
    pub fn synonym_pairs(&self) -> Vec<(String, String)> {
        self.synonyms
            .iter()
            .map(|s| (s.surface_form.clone(), s.canonical_form.clone()))
            .collect()
    }
}

const DEFAULT_TAGS: &[(TagFamily, &str, &str)] = &[
    (TagFamily::Product, "FX_VANILLA_OPTION", "Vanilla Option"),
    (TagFamily::Product, "KNOCK_IN", "Knock-In"),
    (TagFamily::Product, "KNOCK_OUT", "Knock-Out"),
    (TagFamily::Product, "RISK_REVERSAL", "Risk Reversal"),
    (TagFamily::Product, "DIGITAL_OPTION", "Digital Option"),
    (TagFamily::Product, "DUAL_DIGITAL", "Dual Digital"),
    (TagFamily::Product, "NDF", "NDF"),
    (TagFamily::Product, "FX_FORWARD", "FX Forward"),
    (TagFamily::Product, "TARF", "Target Redemption Forward"),
    (TagFamily::Intent, "HEDGING", "Hedging"),
    (TagFamily::Intent, "DIRECTIONAL", "Directional"),
    (TagFamily::Intent, "CARRY", "Carry"),
    (TagFamily::Intent, "YIELD_ENHANCEMENT", "Yield Enhancement"),
    (TagFamily::Intent, "RELATIVE_VALUE", "Relative Value"),
    (TagFamily::Theme, "CENTRAL_BANK", "Central Bank"),
    (TagFamily::Theme, "ELECTION_RISK", "Election Risk"),
    (TagFamily::Theme, "INFLATION", "Inflation"),
    (TagFamily::Theme, "VOLATILITY_EVENT", "Volatility Event"),
    (TagFamily::Risk, "FX_VOL_STRUCTURE", "Vol Structure"),
    (TagFamily::Risk, "BARRIER_RISK", "Barrier Risk"),
    (TagFamily::Risk, "DOWNSIDE_PROTECTION", "Downside Protection"),
    (TagFamily::Risk, "LEVERAGED_PAYOFF", "Leveraged Payoff"),
    (TagFamily::Tenor, "SHORT_DATED", "Short Dated"),
    (TagFamily::Tenor, "MEDIUM_DATED", "Medium Dated"),
    (TagFamily::Tenor, "LONG_DATED", "Long Dated"),
    (TagFamily::MarketFocus, "G10_FX", "G10 FX"),
    (TagFamily::MarketFocus, "EM_FX", "EM FX"),
    (TagFamily::MarketFocus, "LATAM_FX", "LATAM FX"),
    (TagFamily::MarketFocus, "ASIA_FX", "Asia FX"),
    (TagFamily::ClientType, "HF_MACRO", "Macro Hedge Fund"),
    (TagFamily::ClientType, "HF_SYSTEMATIC", "Systematic Hedge Fund"),
    (TagFamily::ClientType, "ASSET_MANAGER_LONG_ONLY", "Long-Only Asset Manager"),
    (TagFamily::ClientType, "ASSET_MANAGER_MULTI_ASSET", "Multi-Asset Manager"),
    (TagFamily::ClientType, "BANK", "Bank"),
    (TagFamily::ClientType, "CORPORATE_TREASURY", "Corporate Treasury"),
];

const DEFAULT_SYNONYMS: &[(&str, &str, Option<&str>)] = &[
    ("ki", "knock-in", Some("KNOCK_IN")),
    ("knock in", "knock-in", Some("KNOCK_IN")),
    ("kis", "knock-in", Some("KNOCK_IN")),
    ("ko", "knock-out", Some("KNOCK_OUT")),
    ("knock out", "knock-out", Some("KNOCK_OUT")),
    ("knockout", "knock-out", Some("KNOCK_OUT")),
    ("kos", "knock-out", Some("KNOCK_OUT")),
    ("rr", "risk-reversal", Some("RISK_REVERSAL")),
    ("risk reversal", "risk-reversal", Some("RISK_REVERSAL")),
    ("cb", "central-bank", Some("CENTRAL_BANK")),
    ("central bank", "central-bank", Some("CENTRAL_BANK")),
    ("boj", "central-bank", Some("CENTRAL_BANK")),
    ("ecb", "central-bank", Some("CENTRAL_BANK")),
    ("fomc", "central-bank", Some("CENTRAL_BANK")),
    ("dig", "digital", Some("DIGITAL_OPTION")),
    ("digital", "digital", Some("DIGITAL_OPTION")),
    ("dual digital", "dual-digital", Some("DUAL_DIGITAL")),
    ("ndf", "ndf", Some("NDF")),
    ("tarf", "tarf", Some("TARF")),
    ("outright", "forward", Some("FX_FORWARD")),
    ("fwd", "forward", Some("FX_FORWARD")),
    ("vanilla", "vanilla", Some("FX_VANILLA_OPTION")),
    ("hedge", "hedging", Some("HEDGING")),
    ("hedges", "hedging", Some("HEDGING")),
    ("protection", "downside-protection", Some("DOWNSIDE_PROTECTION")),
    ("carry", "carry", Some("CARRY")),
    ("directional", "directional", Some("DIRECTIONAL")),
    ("vol", "volatility", Some("FX_VOL_STRUCTURE")),
    ("volatility", "volatility", Some("FX_VOL_STRUCTURE")),
    ("barrier", "barrier", Some("BARRIER_RISK")),
    ("g10", "g10", Some("G10_FX")),
    ("em", "em", Some("EM_FX")),
    ("latam", "latam", Some("LATAM_FX")),
    ("asia", "asia", Some("ASIA_FX")),
    ("short dated", "short-dated", Some("SHORT_DATED")),
    ("long dated", "long-dated", Some("LONG_DATED")),
    ("structures", "structure", None),
    ("structure", "structure", None),
];

/// The built-in `v1` FX vocabulary, used for seeding and tests.
pub fn default_snapshot() -> TaxonomySnapshot {
    let tags = DEFAULT_TAGS
        .iter()
        .map(|(family, code, label)| TaxonomyTag {
            code: (*code).to_string(),
            family: *family,
            label: (*label).to_string(),
        })
        .collect();
    let synonyms = DEFAULT_SYNONYMS
        .iter()
        .map(|(surface, canonical, tag_code)| Synonym {
            surface_form: (*surface).to_string(),
            canonical_form: (*canonical).to_string(),
            tag_code: tag_code.map(str::to_string),
        })
        .collect();
    TaxonomySnapshot::new("v1", tags, synonyms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_tag_shadows_rule_tag_of_same_code() {
        let tags = vec![
            EntityTag::rule("KNOCK_IN", 0.4),
            EntityTag::manual("KNOCK_IN"),
            EntityTag::rule("CARRY", 0.6),
        ];
        let merged = merge_with_manual_precedence(&tags);
        assert_eq!(merged.len(), 2);
        let ki = merged.iter().find(|t| t.tag_code == "KNOCK_IN").unwrap();
        assert_eq!(ki.origin, TagOrigin::Manual);
        assert_eq!(ki.confidence, 1.0);
    }

    #[test]
    fn low_confidence_manual_still_wins() {
        let tags = vec![
            EntityTag::rule("CARRY", 0.9),
            EntityTag { tag_code: "CARRY".into(), confidence: 0.2, origin: TagOrigin::Manual },
        ];
        let merged = merge_with_manual_precedence(&tags);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].origin, TagOrigin::Manual);
        assert_eq!(merged[0].confidence, 0.2);
    }

    #[test]
    fn default_snapshot_resolves_families() {
        let snapshot = default_snapshot();
        assert_eq!(snapshot.version(), "v1");
        assert_eq!(snapshot.family_of("KNOCK_IN"), Some(TagFamily::Product));
        assert_eq!(snapshot.family_of("G10_FX"), Some(TagFamily::MarketFocus));
        assert_eq!(snapshot.family_of("NOPE"), None);
        assert!(snapshot.require_family("NOPE").is_err());
    }
}
