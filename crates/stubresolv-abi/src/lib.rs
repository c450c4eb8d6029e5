// All extern "C" exports accept raw pointers from C callers and check them
// for null/length before use, so per-function safety docs would be redundant.
#![allow(clippy::missing_safety_doc)]
//! # stubresolv-abi
//!
//! `extern "C"` boundary for stubresolv.
//!
//! Produces a `cdylib` exposing the resolver as three sentinel-returning C
//! functions. Each entry point validates its raw arguments, then delegates to
//! the safe implementations in `stubresolv-core`.
//!
//! # Architecture
//!
//! ```text
//! C caller -> ABI entry (this crate) -> argument validation -> core impl -> 0 / count / -1
//! ```
//!
//! Every failure collapses to a single sentinel: `-1` for the query builder
//! and response parser, zero entries for the nameserver reader. Nothing is
//! written to caller memory on failure.

pub mod resolv_abi;
mod util;
