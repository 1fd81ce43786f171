//! The match service: wires the store, taxonomy, profile composition and
//! scoring into the desk-facing operations.
//!
//! Both ranking jobs share one scoring pipeline; they differ only in
//! which side is the query and which is the candidate pool. Every run is
//! persisted with its full explanation payload so a result can be
//! audited after the fact.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use tracing::{debug, info};

use deskmatch_core::{
    adjusted_family_weights, bm25::top_overlap_terms, extract_structured_signals, family_tag_map,
    matched_tags, rank, region_fallbacks, semantic_similarity, Bm25Corpus, Client, ComponentScores,
    ConfidenceFlag, EmbeddingProvider, EntityKey, EntityTag, Explanation, ExtractedTag,
    FeatureAggregate, FeatureEvidence, FeatureKind, Feedback, HashEmbedder, Idea, MatchResult,
    MatchRun, Observation, PortfolioManager, ProfileComposer, ProfileSnapshot, RawTradeRecord,
    RunType, StructuredSignals, TagExtractor, TagFamily, TaxonomySnapshot,
};
use deskmatch_storage::{FilePersistence, MemoryStore};

use crate::error::Result;

/// Penalty applied to recorded activity evidence for each region
/// fallback step away from the idea's own region.
const REGION_FALLBACK_PENALTY: f64 = 0.85;

/// Cap on the structured-signal candidate pool for Job B.
const MAX_CANDIDATE_POOL: usize = 50;

/// A query or candidate document in the shared scoring pipeline.
struct ScoringDoc {
    entity: EntityKey,
    name: String,
    text: String,
    tags: Vec<EntityTag>,
    vector: Vec<f32>,
    confidence_flag: ConfidenceFlag,
}

pub struct MatchService {
    store: Arc<MemoryStore>,
    persistence: Option<FilePersistence>,
    taxonomy: TaxonomySnapshot,
    extractor: TagExtractor,
    embedder: HashEmbedder,
}

impl MatchService {
    pub fn new(store: Arc<MemoryStore>, taxonomy: TaxonomySnapshot) -> Self {
        let extractor = TagExtractor::new(&taxonomy);
        Self { store, persistence: None, taxonomy, extractor, embedder: HashEmbedder::default() }
    }

    /// Attach snapshot persistence, loading existing state if present.
    pub fn with_persistence(mut self, persistence: FilePersistence) -> Result<Self> {
        if let Some(state) = persistence.load()? {
            self.store.import_state(state);
        }
        self.persistence = Some(persistence);
        Ok(self)
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn taxonomy(&self) -> &TaxonomySnapshot {
        &self.taxonomy
    }

    /// Swap in a new taxonomy version. Synonyms referencing tag codes
    /// outside the new vocabulary are a fatal configuration error and
    /// leave the current snapshot in place. The extractor and its
    /// compiled term lists are rebuilt; profiles keep their existing
    /// tags until recomputed.
    pub fn refresh_taxonomy(&mut self, taxonomy: TaxonomySnapshot) -> Result<()> {
        for synonym in taxonomy.synonyms() {
            if let Some(code) = &synonym.tag_code {
                taxonomy.require_family(code)?;
            }
        }
        info!(version = taxonomy.version(), "refreshing taxonomy");
        self.extractor = TagExtractor::new(&taxonomy);
        self.taxonomy = taxonomy;
        Ok(())
    }

    /// Replace the manually curated tag set for one entity. Codes
    /// outside the current taxonomy version are rejected.
    pub fn set_manual_tags(&self, entity: EntityKey, codes: &[String]) -> Result<()> {
        let mut tags = Vec::with_capacity(codes.len());
        for code in codes {
            self.taxonomy.require_family(code)?;
            tags.push(EntityTag::manual(code.clone()));
        }
        self.store.set_manual_tags(entity, tags);
        Ok(())
    }

    /// Save the full store state through the persistence layer, if one
    /// is attached.
    pub fn save(&self) -> Result<()> {
        if let Some(persistence) = &self.persistence {
            persistence.save(&self.store.export_state())?;
        }
        Ok(())
    }

    pub fn extract_tags(&self, text: &str) -> Vec<ExtractedTag> {
        self.extractor.extract(text)
    }

    pub fn add_observation(&self, observation: Observation) -> i64 {
        self.store.add_observation(observation)
    }

    /// Recompose one entity's profile from its observation log and
    /// manual tags, publishing the result atomically.
    pub fn recompute_profile(&self, entity: EntityKey, now: NaiveDate) -> ProfileSnapshot {
        let observations = self.store.observations_for(entity);
        let manual = self.store.manual_tags(entity);
        let composer = ProfileComposer::new(&self.extractor, &self.embedder);
        let profile = composer.compose(entity, &observations, &manual, now);
        self.store.put_profile(profile.clone());
        profile
    }

    /// Recompose every observed entity's profile in parallel.
    pub fn recompute_all_profiles(&self, now: NaiveDate) -> usize {
        let entities = self.store.observed_entities();
        let composer = ProfileComposer::new(&self.extractor, &self.embedder);
        let profiles: Vec<ProfileSnapshot> = entities
            .par_iter()
            .map(|&entity| {
                let observations = self.store.observations_for(entity);
                let manual = self.store.manual_tags(entity);
                composer.compose(entity, &observations, &manual, now)
            })
            .collect();
        let count = profiles.len();
        for profile in profiles {
            self.store.put_profile(profile);
        }
        info!(profiles = count, "recomputed profiles");
        count
    }

    /// Append blotter records and rebuild all feature buckets from the
    /// full deduplicated log. Returns warnings for excluded records.
    pub fn ingest_trades(&self, records: Vec<RawTradeRecord>, now: NaiveDate) -> Vec<String> {
        self.store.append_trade_records(records);
        let all = self.store.trade_records();
        let outcome = deskmatch_core::aggregate_trades(&all, now);
        info!(
            buckets = outcome.aggregates.len(),
            duplicates = outcome.duplicates_skipped,
            "rebuilt feature aggregates"
        );
        self.store.put_feature_aggregates(outcome.aggregates);
        outcome.warnings
    }

    /// Rank ideas for one client.
    pub fn match_ideas_for_client(
        &self,
        client_id: i64,
        top_n: usize,
        now: NaiveDate,
    ) -> Result<(MatchRun, Vec<MatchResult>)> {
        let client = self.store.client(client_id)?;
        let query = self.client_doc(&client, now);
        let candidates: Vec<ScoringDoc> =
            self.store.ideas().iter().map(|idea| self.idea_doc(idea)).collect();

        let weights = adjusted_family_weights(&client.client_type);
        let scored = candidates
            .into_iter()
            .map(|doc| (doc, weights.clone(), None))
            .collect();
        let results = self.score(&query, scored);
        let ranked = rank(results, top_n);
        let run = self.persist_run(RunType::JobA, query.entity.to_string(), ranked.clone());
        Ok((run, ranked))
    }

    /// Rank clients for one idea. When the idea text carries structured
    /// signals (pairs, products), the candidate pool is pre-filtered to
    /// clients with matching recorded activity, walking the region
    /// fallback chain and capped for determinism. With no signals, or no
    /// matching activity anywhere, every active client is scored.
    pub fn match_clients_for_idea(
        &self,
        idea_id: i64,
        top_n: usize,
        now: NaiveDate,
    ) -> Result<(MatchRun, Vec<MatchResult>)> {
        let idea = self.store.idea(idea_id)?;
        let query = self.idea_doc(&idea);
        let signals = extract_structured_signals(&format!("{} {}", idea.idea_title, idea.idea_text));

        let clients = self.store.active_clients();
        let mut pool: Vec<(Client, Option<FeatureEvidence>)> = Vec::new();
        if !(signals.ccy_pairs.is_empty() && signals.product_types.is_empty()) {
            for client in &clients {
                let entity = EntityKey::client(client.client_id);
                if let Some(evidence) = self.feature_evidence(entity, &signals) {
                    pool.push((client.clone(), Some(evidence)));
                }
            }
            pool.sort_by(|(a, ea), (b, eb)| {
                let ka = ea.as_ref().map(|e| e.score_90d_sum).unwrap_or(0.0);
                let kb = eb.as_ref().map(|e| e.score_90d_sum).unwrap_or(0.0);
                kb.total_cmp(&ka).then(a.client_id.cmp(&b.client_id))
            });
            pool.truncate(MAX_CANDIDATE_POOL);
            debug!(pool = pool.len(), "structured-signal candidate pool");
        }
        if pool.is_empty() {
            pool = clients.into_iter().map(|c| (c, None)).collect();
        }

        let candidates: Vec<(ScoringDoc, Vec<(TagFamily, f32)>, Option<FeatureEvidence>)> = pool
            .into_iter()
            .map(|(client, evidence)| {
                let doc = self.client_doc(&client, now);
                let weights = adjusted_family_weights(&client.client_type);
                (doc, weights, evidence)
            })
            .collect();

        let results = self.score(&query, candidates);
        let ranked = rank(results, top_n);
        let run = self.persist_run(RunType::JobB, query.entity.to_string(), ranked.clone());
        Ok((run, ranked))
    }

    /// Rank a desk's portfolio managers for one idea. PM profiles come
    /// from the same observation log as client profiles and flow through
    /// the shared pipeline, with family weights taken from the PM's
    /// parent client type.
    pub fn match_pms_for_idea(
        &self,
        idea_id: i64,
        top_n: usize,
        now: NaiveDate,
    ) -> Result<(MatchRun, Vec<MatchResult>)> {
        let idea = self.store.idea(idea_id)?;
        let query = self.idea_doc(&idea);
        let signals = extract_structured_signals(&format!("{} {}", idea.idea_title, idea.idea_text));

        let candidates: Vec<(ScoringDoc, Vec<(TagFamily, f32)>, Option<FeatureEvidence>)> = self
            .store
            .active_pms()
            .iter()
            .map(|pm| {
                let doc = self.pm_doc(pm, now);
                let client_type =
                    self.store.client(pm.client_id).map(|c| c.client_type).unwrap_or_default();
                let weights = adjusted_family_weights(&client_type);
                let evidence = self.feature_evidence(doc.entity, &signals);
                (doc, weights, evidence)
            })
            .collect();

        let results = self.score(&query, candidates);
        let ranked = rank(results, top_n);
        let run = self.persist_run(RunType::JobBPm, query.entity.to_string(), ranked.clone());
        Ok((run, ranked))
    }

    pub fn add_feedback(&self, feedback: Feedback) -> Result<()> {
        self.store.add_feedback(feedback)?;
        Ok(())
    }

    // ---- internals ----

    fn persist_run(&self, run_type: RunType, input_ref: String, results: Vec<MatchResult>) -> MatchRun {
        let run = MatchRun {
            run_id: self.store.next_run_id(),
            run_type,
            input_ref,
            executed_at: Utc::now(),
        };
        self.store.persist_run(run.clone(), results);
        run
    }

    /// The client side of a match is always its stored profile; a client
    /// with no profile yet scores as an empty, low-confidence document.
    fn client_doc(&self, client: &Client, now: NaiveDate) -> ScoringDoc {
        let entity = EntityKey::client(client.client_id);
        let profile = match self.store.profile(entity) {
            Some(p) => p,
            None => {
                debug!(client = client.client_id, "no profile yet, composing on demand");
                self.recompute_profile(entity, now)
            }
        };
        ScoringDoc {
            entity,
            name: client.client_name.clone(),
            text: profile.text,
            tags: profile.tags,
            vector: profile.vector,
            confidence_flag: profile.confidence_flag,
        }
    }

    /// PMs are client-like: their document is the stored profile over
    /// their own observation log.
    fn pm_doc(&self, pm: &PortfolioManager, now: NaiveDate) -> ScoringDoc {
        let entity = EntityKey::pm(pm.pm_id);
        let profile = match self.store.profile(entity) {
            Some(p) => p,
            None => {
                debug!(pm = pm.pm_id, "no profile yet, composing on demand");
                self.recompute_profile(entity, now)
            }
        };
        ScoringDoc {
            entity,
            name: pm.pm_name.clone(),
            text: profile.text,
            tags: profile.tags,
            vector: profile.vector,
            confidence_flag: profile.confidence_flag,
        }
    }

    /// The idea side is derived directly from its authored title and
    /// body; ideas have no observation log.
    fn idea_doc(&self, idea: &Idea) -> ScoringDoc {
        let raw = format!("{} {}", idea.idea_title, idea.idea_text);
        let text = self.extractor.normalizer().normalize(&raw);
        let tags: Vec<EntityTag> = self
            .extractor
            .extract(&text)
            .into_iter()
            .map(|t| EntityTag::rule(t.tag_code, t.confidence))
            .collect();
        let vector = match self.embedder.embed(&text) {
            Some(v) if v.iter().any(|x| *x != 0.0) => v,
            _ => deskmatch_core::hash_embedding(&text, self.embedder.dimension()),
        };
        let confidence_flag =
            if text.is_empty() { ConfidenceFlag::Low } else { ConfidenceFlag::Normal };
        ScoringDoc {
            entity: EntityKey::idea(idea.idea_id),
            name: idea.idea_title.clone(),
            text,
            tags,
            vector,
            confidence_flag,
        }
    }

    /// Shared scoring pipeline: semantic cosine, BM25 min-max scaled
    /// over the whole candidate pool of this run, weighted tag-family
    /// overlap with per-candidate family weights, blended 0.45/0.35/0.20.
    fn score(
        &self,
        query: &ScoringDoc,
        candidates: Vec<(ScoringDoc, Vec<(TagFamily, f32)>, Option<FeatureEvidence>)>,
    ) -> Vec<MatchResult> {
        let corpus = Bm25Corpus::from_documents(
            &candidates.iter().map(|(c, _, _)| c.text.as_str()).collect::<Vec<_>>(),
        );
        let lexical = corpus.scaled_scores(&query.text);
        let query_map = family_tag_map(&query.tags, &self.taxonomy);

        candidates
            .into_iter()
            .zip(lexical)
            .map(|((candidate, family_weights, evidence), lexical_score)| {
                let semantic = semantic_similarity(&query.vector, &candidate.vector);
                let candidate_map = family_tag_map(&candidate.tags, &self.taxonomy);
                let taxonomy = deskmatch_core::taxonomy_overlap(
                    &query_map,
                    &candidate_map,
                    &family_weights,
                );
                let scores = ComponentScores::blend(semantic, lexical_score, taxonomy);
                let matched = matched_tags(&query_map, &candidate.tags, &self.taxonomy);
                let top_terms = top_overlap_terms(&query.text, &candidate.text, 5);
                let explanation = Explanation {
                    matched_tags: matched,
                    top_terms,
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
                    feature_evidence: evidence,
                };
                MatchResult {
                    target: candidate.entity,
                    target_name: candidate.name,
                    confidence_flag: candidate.confidence_flag,
                    scores,
                    explanation,
                }
            })
            .collect()
    }

    /// Activity evidence for one client against the idea's structured
    /// signals. Walks the region fallback chain most-specific bucket
    /// first; evidence found N fallback steps out is discounted by
    /// `0.85^N` so a reader can see it came from a neighboring region.
    fn feature_evidence(
        &self,
        entity: EntityKey,
        signals: &StructuredSignals,
    ) -> Option<FeatureEvidence> {
        if signals.ccy_pairs.is_empty() && signals.product_types.is_empty() {
            return None;
        }
        let aggregates = self.store.feature_aggregates_for(entity);
        if aggregates.is_empty() {
            return None;
        }

        for (step, region) in region_fallbacks(&signals.region).iter().enumerate() {
            for kind in [FeatureKind::PairProduct, FeatureKind::Pair, FeatureKind::Product] {
                let hits: Vec<&FeatureAggregate> = aggregates
                    .iter()
                    .filter(|a| {
                        a.key.region == *region
                            && a.key.kind == kind
                            && bucket_matches(&a.key.ccy_pair, &a.key.product_type, kind, signals)
                    })
                    .collect();
                if hits.is_empty() {
                    continue;
                }
                let penalty = REGION_FALLBACK_PENALTY.powi(step as i32);
                let stage = if step == 0 {
                    "primary".to_string()
                } else {
                    format!("fallback:{region}")
                };
                return Some(FeatureEvidence {
                    region: region.clone(),
                    stage,
                    trade_count_sum: hits.iter().map(|a| a.trade_count as f64).sum::<f64>(),
                    score_30d_sum: penalty * hits.iter().map(|a| a.score_30d).sum::<f64>(),
                    score_90d_sum: penalty * hits.iter().map(|a| a.score_90d).sum::<f64>(),
                    score_365d_sum: penalty * hits.iter().map(|a| a.score_365d).sum::<f64>(),
                });
            }
        }
        None
    }
}

fn bucket_matches(
    pair: &str,
    product: &str,
    kind: FeatureKind,
    signals: &StructuredSignals,
) -> bool {
    match kind {
        FeatureKind::PairProduct => {
            signals.ccy_pairs.iter().any(|p| p == pair)
                && signals.product_types.iter().any(|p| p == product)
        }
        FeatureKind::Pair => signals.ccy_pairs.iter().any(|p| p == pair),
        FeatureKind::Product => signals.product_types.iter().any(|p| p == product),
        _ => false,
    }
}
