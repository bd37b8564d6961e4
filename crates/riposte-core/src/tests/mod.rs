//! Test module for determinism and integration tests.
//!
//! - **Determinism tests**: lockstep resolvers fed identical inputs agree
//! - **Integration tests**: combo chains, counters and formulas end-to-end
//! - **Helpers**: fixtures, clocks and tracing setup
//!
//! # Test Structure
//!
//! - `determinism.rs`: property tests over random tables and input scripts
//! - `integration.rs`: end-to-end combat flows
//! - `helpers.rs`: test setup utilities and factory functions

mod determinism;
mod helpers;

// Re-export for convenience
pub use helpers::*;
