//! Sandtable - Archetype-based entity/component runtime
//!
//! This crate re-exports all layers of the Sandtable system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: sandtable_engine     — Stage scheduling, guards, state dispatch
//! Layer 1: sandtable_storage    — Archetype storage, queries, channels
//! Layer 0: sandtable_foundation — Core types (Entity, tokens, Error)
//! ```

pub use sandtable_engine as engine;
pub use sandtable_foundation as foundation;
pub use sandtable_storage as storage;
