//! Archetype-based entity-component storage and world state for Sandtable.
//!
//! This crate provides:
//! - [`Archetype`] - Columnar storage for one component signature
//! - [`TokenRegistry`] - Token minting and per-token metadata
//! - [`World`] - The unified interface to all storage systems
//! - [`QueryShape`] - Tuple-shaped cached queries over archetypes
//! - [`ChannelQueue`] - Tick-stamped event/message queues with retention
//! - [`StateStore`] - Named finite-state entries with transition tracking

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

pub mod archetype;
pub mod bundle;
pub mod change;
pub mod channel;
pub mod query;
pub mod registry;
pub mod state;
pub mod world;

pub use archetype::{Archetype, Column, Signature, TypedColumn};
pub use bundle::{Bundle, TokenSet};
pub use change::ChangeLog;
pub use channel::{ChannelQueue, ChannelStore, Reader, Writer, RETENTION_TICKS};
pub use query::{EntityRef, QueryShape, QueryTerm, Term, Without};
pub use registry::TokenRegistry;
pub use state::{StateStore, StateTransition};
pub use world::{EntityInspection, World};
