//! Fractional sibling rank allocation.
//!
//! All functions take the siblings of one context sorted ascending by rank (as returned by
//! [crate::thoughtbase::ThoughtBase::children_of]). Ranks are never renormalized here; when two
//! neighbors are so close that no float lies strictly between them the allocator returns `None`
//! and the caller may renormalize the context
//! ([crate::thoughtbase::ThoughtBase::renormalize]).

use crate::{paths::RankedThought, properties::Rank};

/// `min(ranks) - 1`, or `0` for an empty context.
pub fn rank_at_start(siblings: &[RankedThought]) -> Rank {
    siblings
        .iter()
        .map(|sibling| sibling.rank)
        .reduce(f64::min)
        .map(|min| min - 1.0)
        .unwrap_or(0.0)
}

/// `max(ranks) + 1`, or `0` for an empty context.
pub fn rank_at_end(siblings: &[RankedThought]) -> Rank {
    siblings
        .iter()
        .map(|sibling| sibling.rank)
        .reduce(f64::max)
        .map(|max| max + 1.0)
        .unwrap_or(0.0)
}

/// A rank strictly between `low` and `high`, if one is representable.
pub fn midpoint(low: Rank, high: Rank) -> Option<Rank> {
    let mid = low + (high - low) / 2.0;
    (low < mid && mid < high).then_some(mid)
}

/// Rank for a new sibling directly before `siblings[index]`.
pub fn rank_before(siblings: &[RankedThought], index: usize) -> Option<Rank> {
    let sibling = siblings.get(index)?;
    match index.checked_sub(1).and_then(|prev| siblings.get(prev)) {
        Some(prev) => midpoint(prev.rank, sibling.rank),
        None => Some(sibling.rank - 1.0),
    }
}

/// Rank for a new sibling directly after `siblings[index]`.
pub fn rank_after(siblings: &[RankedThought], index: usize) -> Option<Rank> {
    let sibling = siblings.get(index)?;
    match siblings.get(index + 1) {
        Some(next) => midpoint(sibling.rank, next.rank),
        None => Some(sibling.rank + 1.0),
    }
}

/// Index of `sibling` in `siblings`: exact `(key, rank)` match first, then the first entry with the
/// same key.
pub fn position(siblings: &[RankedThought], sibling: &RankedThought) -> Option<usize> {
    siblings
        .iter()
        .position(|candidate| candidate == sibling)
        .or_else(|| {
            siblings
                .iter()
                .position(|candidate| candidate.key == sibling.key)
        })
}

/// Integer ranks `0, 1, 2, …` in the existing order.
pub fn renormalized(siblings: &[RankedThought]) -> Vec<RankedThought> {
    siblings
        .iter()
        .enumerate()
        .map(|(idx, sibling)| RankedThought::new(sibling.key.clone(), idx as Rank))
        .collect()
}
