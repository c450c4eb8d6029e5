//! # stubresolv-core
//!
//! Safe Rust implementation of a minimal DNS stub resolver.
//!
//! This crate provides pure, stateless building blocks: encoding an A/IN query,
//! extracting the first IPv4 address from a response, and reading nameservers
//! from `resolv.conf`. Network I/O is left to the caller. No `unsafe` code is
//! permitted at the crate level.

#![deny(unsafe_code)]

pub mod resolv;

pub use resolv::{
    QueryError, Resolution, ResolverConfig, ResponseError, build_query, nameservers_from_bytes,
    nameservers_from_path, nameservers_from_str, parse_response, parse_response_detailed,
};
