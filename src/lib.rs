//! Passgate workspace-level test utilities.
//!
//! This crate exists solely to support workspace-level integration tests,
//! particularly the BDD/cucumber tests in `tests/cucumber.rs`.
//!
//! The actual passgate functionality is in the workspace member crates:
//! - `passgate-types`: Shared receipt and config types
//! - `passgate-domain`: Identifier filter and pass-rate computation
//! - `passgate-ingest`: JUnit XML report reading
//! - `passgate-config`: Config file loading and flag precedence
//! - `passgate-app`: Compare use case and renderers
//! - `passgate` (passgate-cli): CLI interface
