//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::PathBuf;
use tempfile::TempDir;
use thoughtbase::{
    paths::{Context, RankedPath, RankedThought},
    properties::{Membership, Thought, Timestamp},
};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A record with one membership.
#[allow(dead_code)]
pub fn record<C: Into<Context>>(value: &str, context: C, rank: f64, last_updated: u64) -> Thought {
    Thought::new(
        value,
        vec![Membership::new(context, rank)],
        Timestamp(last_updated),
    )
}

#[allow(dead_code)]
pub fn path(elems: &[(&str, f64)]) -> RankedPath {
    elems
        .iter()
        .map(|(key, rank)| RankedThought::new(*key, *rank))
        .collect()
}

/// Records of a small outline: `a > b > c` plus a top-level `d`, all written at `last_updated`.
#[allow(dead_code)]
pub fn outline_records(last_updated: u64) -> Vec<Thought> {
    vec![
        record("a", Context::root(), 0.0, last_updated),
        record("b", ["a"], 0.0, last_updated),
        record("c", ["a", "b"], 0.0, last_updated),
        record("d", Context::root(), 1.0, last_updated),
    ]
}

/// Path of a fresh record file inside `temp_dir`.
#[allow(dead_code)]
pub fn record_file(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("thoughts.json")
}
