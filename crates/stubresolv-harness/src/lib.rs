//! Conformance harness and lookup driver for stubresolv.
//!
//! This crate provides:
//! - Fixture verify: run the core against recorded JSON fixture sets
//! - Report generation: human-readable + machine-readable conformance reports
//! - Lookup driver: blocking UDP queries against configured nameservers
//! - Structured logging: JSONL records for every lookup attempt

#![forbid(unsafe_code)]

pub mod diff;
pub mod fixtures;
pub mod lookup;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use fixtures::{FixtureCase, FixtureError, FixtureSet};
pub use lookup::{LookupAnswer, LookupError, LookupOptions, lookup};
pub use report::ConformanceReport;
pub use runner::TestRunner;
pub use verify::{VerificationResult, VerificationSummary};
