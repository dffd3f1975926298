//! Core identifiers and error types for Sandtable.
//!
//! This crate provides:
//! - [`Entity`] - Bare entity identifiers
//! - [`TokenId`] - Raw opaque kind identifiers
//! - [`Component`], [`Resource`], [`Channel`], [`StateToken`] - Typed token handles
//! - [`StageId`] - Schedule stage identifiers
//! - [`Error`] - Error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod entity;
mod error;
mod token;

pub use entity::Entity;
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use token::{Channel, Component, Resource, StageId, StateToken, TokenId};
