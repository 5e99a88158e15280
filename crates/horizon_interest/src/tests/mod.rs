//! Scenario tests for the interest engine
//!
//! This module contains end-to-end tests that drive the engine through its
//! public hooks with synthetic worlds:
//! - Observer sets agree with each strategy's predicate
//! - Rebuild idempotence and failure isolation
//! - Scene changes, match scoping and spawn/destroy churn
//! - Strategy swaps


mod cleanup_test;
mod engine_test;
