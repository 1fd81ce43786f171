//! # deskmatch
//!
//! Hybrid relevance engine for sales desks. Ranks trade ideas against
//! client interest profiles (and vice versa) with an explainable blend
//! of semantic, lexical and taxonomy scoring.
//!
//! The heavy lifting lives in [`deskmatch_core`]; persistence in
//! [`deskmatch_storage`]. This crate wires them into the two desk-facing
//! ranking jobs behind [`MatchService`].

pub mod error;
pub mod seed;
pub mod service;

pub use error::{Error, Result};
pub use service::MatchService;

pub use deskmatch_core as core;
pub use deskmatch_storage as storage;
