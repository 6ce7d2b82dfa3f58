//! Derived views over the thought store: ranked child listings, the context view of a value, and
//! sortToFront.

use serde::{Deserialize, Serialize};
use std::iter;

use crate::{
    paths::{to_context, Context, RankedPath, RankedThought},
    properties::normalize_value,
    ThoughtError,
};

use super::{base::normalize_context, ThoughtBase};

/// How [sort_to_front] decides that a candidate path matches the target context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Value sequences must be equal.
    #[default]
    Exact,
    /// The candidate context starts or ends with the target. Kept for data produced under the old
    /// matching rule.
    Legacy,
}

impl MatchMode {
    fn matches(&self, candidate: &Context, target: &Context) -> bool {
        match self {
            MatchMode::Exact => candidate == target,
            MatchMode::Legacy => {
                candidate.values().starts_with(target.values())
                    || candidate.values().ends_with(target.values())
            }
        }
    }
}

impl ThoughtBase {
    pub fn children_with_rank<C: Into<Context>>(&self, context: C) -> Vec<RankedThought> {
        self.children_of(context)
    }

    /// Children of `context` as full ranked paths.
    pub fn child_paths<C: Into<Context>>(&self, context: C) -> Vec<RankedPath> {
        let context = normalize_context(&context.into());
        let Some(parent) = self.rank_path(&context) else {
            return Vec::new();
        };
        self.children_of(&context)
            .into_iter()
            .map(|child| parent.child(child))
            .collect()
    }

    /// One entry per non-root context `value` occurs in: the context's values at rank 0 followed by
    /// `value` at its membership rank.
    pub fn derived_children_for_context_view(&self, value: &str) -> Vec<RankedPath> {
        let value = normalize_value(value);
        self.contexts_of(&value)
            .into_iter()
            .filter(|membership| !membership.context.is_root())
            .map(|membership| {
                membership
                    .context
                    .values()
                    .iter()
                    .map(|ancestor| RankedThought::new(ancestor.clone(), 0.0))
                    .chain(iter::once(RankedThought::new(value.clone(), membership.rank)))
                    .collect()
            })
            .collect()
    }

    /// Collapse a chain of context-view hops into one real ranked path. Every hop after the first
    /// starts at the thought that contains the previous hop's signifier (a context picked from
    /// [ThoughtBase::derived_children_for_context_view]) and may continue below the signifier.
    /// `None` when the container does not hold the signifier.
    pub fn path_from_context_chain(&self, chain: &[RankedPath]) -> Option<RankedPath> {
        let (last, rest) = chain.split_last()?;
        let last = last.unroot();
        let Some(penult) = rest.last() else {
            return Some(last);
        };
        let value = normalize_value(&penult.signifier()?.key);
        let container = last.first()?;
        let located = self
            .contexts_of(&value)
            .into_iter()
            .filter(|membership| membership.context.signifier() == Some(container.key.as_str()))
            .filter_map(|membership| {
                self.rank_path(&membership.context)
                    .map(|parent| (parent, membership.rank))
            })
            .collect::<Vec<_>>();
        let Some((parent, rank)) = located
            .iter()
            .find(|(parent, _)| parent.signifier().map(|s| s.rank) == Some(container.rank))
            .or_else(|| located.first())
            .cloned()
        else {
            tracing::debug!(
                "[ThoughtBase::path_from_context_chain] '{}' does not contain '{value}'",
                container.key
            );
            return None;
        };
        Some(
            last.iter()
                .skip(1)
                .cloned()
                .fold(parent.child(RankedThought::new(value, rank)), |path, thought| {
                    path.child(thought)
                }),
        )
    }

    /// Levels of descendants below `context`: `0` for a leaf, `1` when only children exist.
    pub fn depth<C: Into<Context>>(&self, context: C) -> usize {
        let context = normalize_context(&context.into());
        self.children_of(&context)
            .into_iter()
            .map(|child| 1 + self.depth(context.child(child.key)))
            .max()
            .unwrap_or(0)
    }
}

/// Move the entry whose unranked path matches `target` to the front of `list`, leaving the rest in
/// order. An empty list stays empty. Fails with [ThoughtError::AmbiguousMatch] when nothing
/// matches.
pub fn sort_to_front(
    target: &Context,
    mut list: Vec<RankedPath>,
    mode: MatchMode,
) -> Result<Vec<RankedPath>, ThoughtError> {
    if list.is_empty() {
        return Ok(list);
    }
    let target = normalize_context(target);
    let unranked = |path: &RankedPath| to_context(&path.unroot()).normalize();
    let Some(idx) = list
        .iter()
        .position(|path| mode.matches(&unranked(path), &target))
    else {
        return Err(ThoughtError::AmbiguousMatch {
            sought: target.to_string(),
            candidates: list.iter().map(|path| unranked(path).to_string()).collect(),
        });
    };
    let found = list.remove(idx);
    list.insert(0, found);
    Ok(list)
}
