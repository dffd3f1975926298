//! Integration tests for Layer 2: Engine
//!
//! Tests for stage scheduling, guard predicates, and state dispatch.
