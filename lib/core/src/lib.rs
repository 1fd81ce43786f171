//! # deskmatch Core
//!
//! Core library for the deskmatch relevance engine.
//!
//! This crate provides the scoring and profile-building machinery:
//!
//! - [`Normalizer`] - Text normalization with taxonomy-driven synonym folding
//! - [`TagExtractor`] - Rule-based taxonomy tag projection over normalized text
//! - [`ProfileComposer`] - Observation merging into entity profile snapshots
//! - [`Bm25Corpus`] - Per-run lexical scoring with min-max scaling
//! - [`aggregate_trades`] - Time-decayed feature aggregation over trade blotters
//! - [`rank`] - Deterministic hybrid ranking with explainable output
//!
//! ## Example
//!
//! ```rust
//! use deskmatch_core::{default_snapshot, Normalizer, TagExtractor};
//!
//! let snapshot = default_snapshot();
//! let normalizer = Normalizer::from_taxonomy(&snapshot);
//! assert_eq!(normalizer.normalize("Client wants KI and KO"), "wants knock-in knock-out");
//!
//! let extractor = TagExtractor::new(&snapshot);
//! let tags = extractor.extract("3m EURUSD knockout for hedging");
//! assert!(tags.iter().any(|t| t.tag_code == "KNOCK_OUT"));
//! ```

pub mod bm25;
pub mod decay;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod explain;
pub mod features;
pub mod normalize;
pub mod profile;
pub mod rank;
pub mod score;
pub mod signals;
pub mod tagging;
pub mod taxonomy;
pub mod vector;

pub use bm25::Bm25Corpus;
pub use embedding::{hash_embedding, EmbeddingProvider, HashEmbedder, DEFAULT_EMBEDDING_DIM};
pub use entity::{
    Client, ConfidenceFlag, EntityKey, EntityType, Idea, Observation, ObservationType,
    PortfolioManager,
};
pub use error::{Error, Result};
pub use explain::{Explanation, FeatureEvidence, MatchedTag};
pub use features::{
    aggregate_trades, AggregationOutcome, FeatureAggregate, FeatureKey, FeatureKind,
    RawTradeRecord,
};
pub use normalize::Normalizer;
pub use profile::{ProfileComposer, ProfileSnapshot};
pub use rank::{rank, Feedback, FeedbackLabel, MatchResult, MatchRun, RunType};
pub use score::{
    adjusted_family_weights, family_tag_map, matched_tags, taxonomy_overlap, ComponentScores,
};
pub use signals::{extract_structured_signals, region_fallbacks, StructuredSignals};
pub use tagging::{ExtractedTag, TagExtractor};
pub use taxonomy::{
    default_snapshot, merge_with_manual_precedence, EntityTag, Synonym, TagFamily, TagOrigin,
    TaxonomySnapshot, TaxonomyTag,
};
pub use vector::{cosine, semantic_similarity};
