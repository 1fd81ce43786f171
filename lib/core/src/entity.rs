//! Entity and observation data model.
//!
//! Entities are identified by `(entity_type, entity_id)`. Identity is
//! immutable; everything derived from observations (profile text, tags,
//! vectors) is recomputed on demand and owned by the profile composer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two primary entity kinds, plus the client-like PM variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Client,
    Idea,
    Pm,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Client => write!(f, "CLIENT"),
            EntityType::Idea => write!(f, "IDEA"),
            EntityType::Pm => write!(f, "PM"),
        }
    }
}

/// Composite entity identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub entity_id: i64,
}

impl EntityKey {
    pub fn new(entity_type: EntityType, entity_id: i64) -> Self {
        Self { entity_type, entity_id }
    }

    pub fn client(id: i64) -> Self {
        Self::new(EntityType::Client, id)
    }

    pub fn idea(id: i64) -> Self {
        Self::new(EntityType::Idea, id)
    }

    pub fn pm(id: i64) -> Self {
        Self::new(EntityType::Pm, id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

/// Observation kinds, each with a base signal weight used when blending
/// observation texts into a profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationType {
    TradeNote,
    CallNote,
    PreferenceNote,
}

impl ObservationType {
    /// Base weight of this signal type before recency decay.
    pub fn signal_weight(&self) -> f32 {
        match self {
            ObservationType::TradeNote => 1.0,
            ObservationType::CallNote => 0.8,
            ObservationType::PreferenceNote => 0.7,
        }
    }
}

/// A dated, typed textual record attached to an entity. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub obs_id: i64,
    pub entity: EntityKey,
    pub obs_type: ObservationType,
    pub obs_text: String,
    pub obs_date: NaiveDate,
    /// Confidence in the source of this observation, clamped to [0, 1]
    /// when weighting.
    pub source_confidence: f32,
}

/// Whether a derived result was built from enough signal to be trusted.
///
/// `Low` marks sparse entities (no observations, empty text, or a
/// hash-fallback embedding); it is surfaced to callers as a flag, never
/// as an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceFlag {
    #[default]
    Normal,
    Low,
}

/// A client record. `client_type` is an open vocabulary; scoring keys on
/// its prefix (`HF_*`, `ASSET_MANAGER_*`, `BANK`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub client_id: i64,
    pub client_name: String,
    pub client_type: String,
    pub active: bool,
}

/// A trade idea authored by the desk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Idea {
    pub idea_id: i64,
    pub idea_title: String,
    pub idea_text: String,
    pub created_by: Option<String>,
}

/// A portfolio manager attached to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioManager {
    pub pm_id: i64,
    pub client_id: i64,
    pub pm_name: String,
    pub active: bool,
}
