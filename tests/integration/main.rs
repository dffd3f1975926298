//! Cross-layer integration tests for Sandtable
//!
//! Tests that drive the full tick loop across storage and engine.

mod scenario;
mod tick_cycle;
