//! # deskmatch Storage
//!
//! Storage layer for the deskmatch relevance engine: a deterministic
//! in-memory store for entities, observations, derived profiles, feature
//! aggregates and run history, plus bincode snapshot persistence with
//! atomic file replacement.

pub mod error;
pub mod persistence;
pub mod store;

pub use error::{Error, Result};
pub use persistence::FilePersistence;
pub use store::{MemoryStore, StoreState};
