//! Tick scheduling and state dispatch for Sandtable.
//!
//! This crate provides:
//! - [`Schedule`] - Stage-ordered system lists with guard predicates
//! - [`App`] - A world plus a schedule, driven one tick at a time
//! - [`in_state`] - Guard builder gating systems on a state value

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod schedule;

pub use app::App;
pub use schedule::{Guard, Schedule, System, in_state};
