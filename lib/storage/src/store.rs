//! In-memory store for entities, observations, derived state and run
//! history.
//!
//! All maps are keyed on ordered keys (`BTreeMap`) so listing operations
//! iterate in a deterministic order. Derived state (profile snapshots,
//! feature aggregates) is replaced wholesale, never patched in place: a
//! reader sees either the previous complete state or the new complete
//! state. Run persistence is all-or-nothing for the same reason.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use deskmatch_core::{
    Client, EntityKey, EntityTag, FeatureAggregate, Feedback, Idea, MatchResult, MatchRun,
    Observation, PortfolioManager, ProfileSnapshot, RawTradeRecord, TagOrigin,
};

use crate::error::{Error, Result};

/// Full serializable store state, written and read as one unit by the
/// persistence layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    pub clients: BTreeMap<i64, Client>,
    pub ideas: BTreeMap<i64, Idea>,
    pub pms: BTreeMap<i64, PortfolioManager>,
    pub observations: BTreeMap<i64, Observation>,
    pub manual_tags: BTreeMap<EntityKey, Vec<EntityTag>>,
    pub profiles: BTreeMap<EntityKey, ProfileSnapshot>,
    pub trade_records: Vec<RawTradeRecord>,
    pub feature_aggregates: Vec<FeatureAggregate>,
    pub runs: BTreeMap<i64, MatchRun>,
    pub results: BTreeMap<i64, Vec<MatchResult>>,
    pub feedback: Vec<Feedback>,
    pub next_run_id: i64,
    pub next_obs_id: i64,
}

/// Shared in-memory store. Cheap to clone handles are not needed; the
/// service owns one instance behind whatever sharing it wants.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StoreState) -> Self {
        Self { state: RwLock::new(state) }
    }

    /// Clone the full state for snapshotting.
    pub fn export_state(&self) -> StoreState {
        self.state.read().clone()
    }

    /// Replace the full state, e.g. after loading a snapshot.
    pub fn import_state(&self, state: StoreState) {
        *self.state.write() = state;
    }

    // ---- entities ----

    pub fn upsert_client(&self, client: Client) {
        self.state.write().clients.insert(client.client_id, client);
    }

    pub fn upsert_idea(&self, idea: Idea) {
        self.state.write().ideas.insert(idea.idea_id, idea);
    }

    pub fn upsert_pm(&self, pm: PortfolioManager) {
        self.state.write().pms.insert(pm.pm_id, pm);
    }

    pub fn client(&self, client_id: i64) -> Result<Client> {
        self.state
            .read()
            .clients
            .get(&client_id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound(format!("CLIENT:{client_id}")))
    }

    pub fn idea(&self, idea_id: i64) -> Result<Idea> {
        self.state
            .read()
            .ideas
            .get(&idea_id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound(format!("IDEA:{idea_id}")))
    }

    pub fn pm(&self, pm_id: i64) -> Result<PortfolioManager> {
        self.state
            .read()
            .pms
            .get(&pm_id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound(format!("PM:{pm_id}")))
    }

    pub fn active_clients(&self) -> Vec<Client> {
        self.state.read().clients.values().filter(|c| c.active).cloned().collect()
    }

    pub fn ideas(&self) -> Vec<Idea> {
        self.state.read().ideas.values().cloned().collect()
    }

    pub fn active_pms(&self) -> Vec<PortfolioManager> {
        self.state.read().pms.values().filter(|p| p.active).cloned().collect()
    }

    // ---- observations ----

    /// Append an observation, assigning the next id when `obs_id` is 0.
    pub fn add_observation(&self, mut observation: Observation) -> i64 {
        let mut state = self.state.write();
        if observation.obs_id == 0 {
            state.next_obs_id += 1;
            observation.obs_id = state.next_obs_id;
        } else {
            state.next_obs_id = state.next_obs_id.max(observation.obs_id);
        }
        let id = observation.obs_id;
        state.observations.insert(id, observation);
        id
    }

    pub fn observations_for(&self, entity: EntityKey) -> Vec<Observation> {
        self.state
            .read()
            .observations
            .values()
            .filter(|o| o.entity == entity)
            .cloned()
            .collect()
    }

    /// All entities that have at least one observation, in key order.
    pub fn observed_entities(&self) -> Vec<EntityKey> {
        let state = self.state.read();
        let mut keys: Vec<EntityKey> = state.observations.values().map(|o| o.entity).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    // ---- tags and profiles ----

    /// Replace the manually curated tag set for one entity. Manual tags
    /// shadow extracted tags at profile composition time.
    pub fn set_manual_tags(&self, entity: EntityKey, mut tags: Vec<EntityTag>) {
        for tag in tags.iter_mut() {
            tag.origin = TagOrigin::Manual;
            tag.confidence = 1.0;
        }
        self.state.write().manual_tags.insert(entity, tags);
    }

    pub fn manual_tags(&self, entity: EntityKey) -> Vec<EntityTag> {
        self.state.read().manual_tags.get(&entity).cloned().unwrap_or_default()
    }

    /// Atomically publish a freshly composed profile.
    pub fn put_profile(&self, profile: ProfileSnapshot) {
        self.state.write().profiles.insert(profile.entity, profile);
    }

    pub fn profile(&self, entity: EntityKey) -> Option<ProfileSnapshot> {
        self.state.read().profiles.get(&entity).cloned()
    }

    pub fn profiles(&self) -> Vec<ProfileSnapshot> {
        self.state.read().profiles.values().cloned().collect()
    }

    // ---- trades and features ----

    pub fn append_trade_records(&self, records: Vec<RawTradeRecord>) {
        self.state.write().trade_records.extend(records);
    }

    pub fn trade_records(&self) -> Vec<RawTradeRecord> {
        self.state.read().trade_records.clone()
    }

    /// Replace the materialized feature buckets wholesale.
    pub fn put_feature_aggregates(&self, aggregates: Vec<FeatureAggregate>) {
        self.state.write().feature_aggregates = aggregates;
    }

    pub fn feature_aggregates_for(&self, entity: EntityKey) -> Vec<FeatureAggregate> {
        self.state
            .read()
            .feature_aggregates
            .iter()
            .filter(|a| a.key.entity == entity)
            .cloned()
            .collect()
    }

    // ---- runs and feedback ----

    pub fn next_run_id(&self) -> i64 {
        let mut state = self.state.write();
        state.next_run_id += 1;
        state.next_run_id
    }

    /// Persist a run header and its ranked results as one unit.
    pub fn persist_run(&self, run: MatchRun, results: Vec<MatchResult>) {
        let mut state = self.state.write();
        info!(run_id = run.run_id, results = results.len(), "persisting match run");
        state.results.insert(run.run_id, results);
        state.runs.insert(run.run_id, run);
    }

    pub fn run(&self, run_id: i64) -> Result<(MatchRun, Vec<MatchResult>)> {
        let state = self.state.read();
        let run = state.runs.get(&run_id).cloned().ok_or(Error::RunNotFound(run_id))?;
        let results = state.results.get(&run_id).cloned().unwrap_or_default();
        Ok((run, results))
    }

    pub fn add_feedback(&self, feedback: Feedback) -> Result<()> {
        let mut state = self.state.write();
        if !state.runs.contains_key(&feedback.run_id) {
            return Err(Error::RunNotFound(feedback.run_id));
        }
        state.feedback.push(feedback);
        Ok(())
    }

    pub fn feedback_for_run(&self, run_id: i64) -> Vec<Feedback> {
        self.state.read().feedback.iter().filter(|f| f.run_id == run_id).cloned().collect()
    }
}
