//! Shared test utilities for ThoughtBase and Session testing

use crate::{
    paths::{Context, RankedPath, RankedThought},
    properties::{ManualClock, Rank},
    thoughtbase::ThoughtBase,
};
use std::sync::Arc;

/// Initialize logging for tests
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// An empty ThoughtBase driven by a clock that starts at `start` and ticks once per write.
pub fn clocked_base(start: u64) -> (ThoughtBase, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_at(start));
    (ThoughtBase::with_clock(clock.clone()), clock)
}

/// Populate `base` with `(context, value, rank)` entries in order.
pub fn populate(base: &mut ThoughtBase, entries: &[(&[&str], &str, Rank)]) {
    for (context, value, rank) in entries {
        base.create(value, Context::from(*context), *rank)
            .unwrap_or_else(|e| panic!("could not create {value} in {context:?}: {e}"));
    }
}

/// A small outline:
///
/// ```text
/// - a
///   - b
///     - c
/// - d
/// ```
pub fn chain_base() -> ThoughtBase {
    let (mut base, _) = clocked_base(1);
    populate(
        &mut base,
        &[
            (&["root"], "a", 0.0),
            (&["a"], "b", 0.0),
            (&["a", "b"], "c", 0.0),
            (&["root"], "d", 1.0),
        ],
    );
    base
}

pub fn keys(children: &[RankedThought]) -> Vec<String> {
    children.iter().map(|child| child.key.clone()).collect()
}

pub fn path(elems: &[(&str, Rank)]) -> RankedPath {
    elems
        .iter()
        .map(|(key, rank)| RankedThought::new(*key, *rank))
        .collect()
}
