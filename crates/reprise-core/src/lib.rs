//! Core engine for reprise: library indexing and fuzzy duplicate detection.
//!
//! This crate owns the parts with real algorithmic content: the text
//! normalizer that reduces tag metadata to canonical comparison form, the
//! LCS-based similarity scorer, the SQLite-backed library index with
//! incremental filesystem reconciliation, the match engine that annotates
//! remote candidates with local duplicates, and the post-download verifier
//! that decides whether an external resolution is acceptable.
//!
//! Remote lookups, download execution, and the interactive UI live in the
//! companion crates and consume this one.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod filename;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod scan;
pub mod schema;
pub mod similarity;
pub mod verify;

pub use error::{Error, Result};
