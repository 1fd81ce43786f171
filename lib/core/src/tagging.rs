//! Rule-based tag projection.
//!
//! Scans normalized text for taxonomy term matches (labels, tag codes and
//! synonym-mapped canonical forms) and emits `(tag_code, confidence)`
//! pairs. Confidence grows with distinct matching terms and with match
//! specificity (multi-word phrase beats single token) and saturates at
//! 1.0. Sparse input is expected and returns an empty set, never an error.

use crate::normalize::Normalizer;
use crate::taxonomy::{TagFamily, TaxonomySnapshot};
use serde::{Deserialize, Serialize};

/// One extracted tag with its rule confidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedTag {
    pub tag_code: String,
    pub confidence: f32,
}

struct TagTerms {
    tag_code: String,
    /// Distinct normalized term token sequences that count as evidence.
    terms: Vec<Vec<String>>,
}

/// Compiled term dictionary for one taxonomy snapshot.
pub struct TagExtractor {
    normalizer: Normalizer,
    tags: Vec<TagTerms>,
}

impl TagExtractor {
    pub fn new(snapshot: &TaxonomySnapshot) -> Self {
        let normalizer = Normalizer::from_taxonomy(snapshot);
        let mut tags = Vec::new();
        for tag in snapshot.tags() {
            // Client-classification tags are assigned, never mined from text.
            if tag.family == TagFamily::ClientType {
                continue;
            }
            let mut raw_terms = vec![
                tag.label.to_lowercase(),
                tag.code.to_lowercase(),
                tag.code.to_lowercase().replace('_', " "),
            ];
            for synonym in snapshot.synonyms() {
                if synonym.tag_code.as_deref() == Some(tag.code.as_str()) {
                    raw_terms.push(synonym.surface_form.to_lowercase());
                    raw_terms.push(synonym.canonical_form.to_lowercase());
                }
            }
            let mut terms: Vec<Vec<String>> = raw_terms
                .iter()
                .map(|t| normalizer.normalize_tokens(t))
                .filter(|t| !t.is_empty())
                .collect();
            terms.sort();
            terms.dedup();
            tags.push(TagTerms { tag_code: tag.code.clone(), terms });
        }
        Self { normalizer, tags }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Extract tags from raw text. Output is ordered by confidence
    /// descending; equal-confidence tags keep first-seen order in text.
    pub fn extract(&self, text: &str) -> Vec<ExtractedTag> {
        let tokens = self.normalizer.normalize_tokens(text);
        if tokens.is_empty() {
            return Vec::new();
        }

        struct Hit {
            tag_code: String,
            confidence: f32,
            first_pos: usize,
        }

        let mut hits: Vec<Hit> = Vec::new();
        for tag in &self.tags {
            let mut match_count = 0u32;
            let mut max_term_tokens = 1usize;
            let mut first_pos = usize::MAX;
            for term in &tag.terms {
                if let Some(pos) = find_subsequence(&tokens, term) {
                    match_count += 1;
                    max_term_tokens = max_term_tokens.max(term.len());
                    first_pos = first_pos.min(pos);
                }
            }
            if match_count == 0 {
                continue;
            }
            let confidence = (0.35
                + 0.20 * match_count as f32
                + 0.05 * (max_term_tokens as f32 - 1.0))
                .min(1.0);
            hits.push(Hit {
                tag_code: tag.tag_code.clone(),
                confidence: round4(confidence),
                first_pos,
            });
        }

        hits.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.first_pos.cmp(&b.first_pos))
                .then_with(|| a.tag_code.cmp(&b.tag_code))
        });
        hits.into_iter()
            .map(|h| ExtractedTag { tag_code: h.tag_code, confidence: h.confidence })
            .collect()
    }
}

fn find_subsequence(haystack: &[String], needle: &[String]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == needle[..])
}

fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::default_snapshot;

    fn extractor() -> TagExtractor {
        TagExtractor::new(&default_snapshot())
    }

    #[test]
    fn extracts_fx_option_language() {
        let tags = extractor().extract("3m KO and KI idea with RR in G10 after central bank event");
        let codes: Vec<&str> = tags.iter().map(|t| t.tag_code.as_str()).collect();
        assert!(codes.contains(&"KNOCK_IN"));
        assert!(codes.contains(&"KNOCK_OUT"));
        assert!(codes.contains(&"RISK_REVERSAL"));
        assert!(codes.contains(&"G10_FX"));
        assert!(codes.contains(&"CENTRAL_BANK"));
        assert!(tags.iter().all(|t| t.confidence > 0.0 && t.confidence <= 1.0));
    }

    #[test]
    fn acronym_expansion_yields_barrier_tags() {
        let tags = extractor().extract("client likes KI KO RR structures");
        let codes: Vec<&str> = tags.iter().map(|t| t.tag_code.as_str()).collect();
        assert!(codes.contains(&"KNOCK_IN"));
        assert!(codes.contains(&"KNOCK_OUT"));
        assert!(codes.contains(&"RISK_REVERSAL"));
    }

    #[test]
    fn empty_input_returns_empty_set() {
        assert!(extractor().extract("").is_empty());
        assert!(extractor().extract("   \n\t").is_empty());
    }

    #[test]
    fn client_type_tags_never_extracted() {
        let tags = extractor().extract("macro hedge fund bank corporate treasury");
        assert!(tags.iter().all(|t| !t.tag_code.starts_with("HF_")));
        assert!(tags.iter().all(|t| t.tag_code != "BANK"));
    }

    #[test]
    fn confidence_saturates_at_one() {
        // Pile every knock-out surface form into one text.
        let tags = extractor()
            .extract("ko knock out knockout knock-out kos ko knock_out knock out knockout");
        let ko = tags.iter().find(|t| t.tag_code == "KNOCK_OUT").unwrap();
        assert!(ko.confidence <= 1.0);
    }

    #[test]
    fn equal_confidence_preserves_text_order() {
        let tags = extractor().extract("ndf then tarf");
        let ndf_pos = tags.iter().position(|t| t.tag_code == "NDF").unwrap();
        let tarf_pos = tags.iter().position(|t| t.tag_code == "TARF").unwrap();
        let ndf = &tags[ndf_pos];
        let tarf = &tags[tarf_pos];
        if (ndf.confidence - tarf.confidence).abs() < f32::EPSILON {
            assert!(ndf_pos < tarf_pos);
        }
    }
}
