//! ThoughtBase: the value-keyed thought store and context index.
//!
//! Thoughts are keyed by their text. A thought may occur under many contexts; each occurrence lives
//! in the [ThoughtGraph] arena and the [Thought] record handed to persistence adapters is a
//! projection of all occurrences of one value. Every mutation returns the [ThoughtEvent]s an outer
//! driver needs to write the affected records.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use petgraph::stable_graph::NodeIndex;

use crate::{
    event::{coalesce, EventOrigin, ThoughtEvent},
    paths::{Context, RankedPath, RankedThought},
    properties::{
        normalize_value, Clock, Membership, Rank, SystemClock, Thought, ThoughtId, Timestamp,
        ROOT_TOKEN,
    },
    rank, ThoughtError,
};

use super::graph::ThoughtGraph;

#[derive(Debug, Clone)]
pub struct ThoughtBase {
    graph: ThoughtGraph,
    clock: Arc<dyn Clock>,
}

impl Default for ThoughtBase {
    fn default() -> Self {
        ThoughtBase::new()
    }
}

impl fmt::Display for ThoughtBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ThoughtBase({} thoughts, {} occurrences)",
            self.len(),
            self.graph.occurrence_count()
        )
    }
}

/// NFC-normalize every value of a context and put it in canonical root form.
pub(crate) fn normalize_context(context: &Context) -> Context {
    let context = context.normalize();
    if context.is_root() {
        return context;
    }
    Context::new(context.iter().map(|value| normalize_value(value)))
}

fn check_value(value: &str) -> Result<(), ThoughtError> {
    if value == ROOT_TOKEN {
        return Err(ThoughtError::InvariantViolation(format!(
            "'{ROOT_TOKEN}' is reserved for the root context"
        )));
    }
    Ok(())
}

/// A context may not contain the same value twice, nor the reserved root value past its head.
fn check_context(context: &Context) -> Result<(), ThoughtError> {
    let mut seen = BTreeSet::new();
    for value in context.values() {
        check_value(value)?;
        if !seen.insert(value) {
            return Err(ThoughtError::InvariantViolation(format!(
                "'{value}' occurs twice in context {context}"
            )));
        }
    }
    Ok(())
}

/// Whether `value` may be placed in the normalized `context`: neither reserved nor already on the
/// context's path.
fn check_placement(value: &str, context: &Context) -> Result<(), ThoughtError> {
    check_value(value)?;
    check_context(context)?;
    if context.values().iter().any(|ancestor| ancestor == value) {
        return Err(ThoughtError::InvariantViolation(format!(
            "'{value}' cannot be created inside its own context {context}"
        )));
    }
    Ok(())
}

/// Validate every membership of a record before it is placed in the arena.
fn check_record(value: &str, thought: &Thought) -> Result<(), ThoughtError> {
    check_value(value)?;
    for membership in thought.member_of.iter() {
        let context = normalize_context(&membership.context);
        check_context(&context)?;
        if context.values().iter().any(|ancestor| ancestor == value) {
            return Err(ThoughtError::InvariantViolation(format!(
                "Record '{value}' lists itself as an ancestor in {context}"
            )));
        }
    }
    Ok(())
}

impl ThoughtBase {
    pub fn new() -> Self {
        ThoughtBase::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        ThoughtBase {
            graph: ThoughtGraph::new(),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn graph(&self) -> &ThoughtGraph {
        &self.graph
    }

    fn stamp(&self) -> Timestamp {
        self.clock.now()
    }

    // ---------------------------------------------------------------------------------------------
    // Thought store
    // ---------------------------------------------------------------------------------------------

    /// The record for `value`, projected from its occurrences. `None` when the value has none.
    pub fn get(&self, value: &str) -> Option<Thought> {
        let value = normalize_value(value);
        let lexeme = self.graph.lexeme(&value)?;
        let member_of = lexeme
            .occurrences
            .iter()
            .filter_map(|idx| self.membership(*idx))
            .collect();
        Some(Thought {
            value,
            member_of,
            last_updated: lexeme.last_updated,
        })
    }

    fn membership(&self, idx: NodeIndex) -> Option<Membership> {
        let rank = self.graph.rank(idx)?;
        Some(Membership::new(self.graph.context_of(idx), rank))
    }

    pub fn contains(&self, value: &str) -> bool {
        self.graph.lexeme(&normalize_value(value)).is_some()
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.graph.lexemes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<String> {
        self.graph.lexemes().map(|(value, _)| value.clone()).collect()
    }

    pub fn records(&self) -> BTreeMap<String, Thought> {
        self.graph
            .lexemes()
            .filter_map(|(value, _)| self.get(value).map(|thought| (value.clone(), thought)))
            .collect()
    }

    /// Records without timestamps, for comparing two stores structurally.
    pub fn memberships(&self) -> BTreeMap<String, Vec<Membership>> {
        self.records()
            .into_iter()
            .map(|(value, thought)| (value, thought.member_of))
            .collect()
    }

    pub fn path_for_thought(&self, id: &ThoughtId) -> Option<RankedPath> {
        let idx = self.graph.index_of(id)?;
        Some(self.graph.ranked_path(idx))
    }

    pub fn context_for_thought(&self, id: &ThoughtId) -> Option<Context> {
        let idx = self.graph.index_of(id)?;
        Some(self.graph.full_context(idx))
    }

    /// The stable occurrence id at an exact ranked path.
    pub fn id_at(&self, path: &RankedPath) -> Option<ThoughtId> {
        let idx = self.graph.resolve_path(path)?;
        self.graph.node(idx).map(|node| node.id)
    }

    // ---------------------------------------------------------------------------------------------
    // Context index
    // ---------------------------------------------------------------------------------------------

    /// Child occurrences of every node `context` resolves to, sorted by rank then creation order.
    fn child_nodes(&self, context: &Context) -> Vec<(NodeIndex, Rank)> {
        let parents = self.graph.resolve_all(context);
        let mut children = parents
            .iter()
            .flat_map(|parent| self.graph.children(*parent))
            .collect::<Vec<_>>();
        if parents.len() > 1 {
            children.sort_by(|a, b| {
                a.1.total_cmp(&b.1).then_with(|| {
                    let seq_a = self.graph.node(a.0).map(|n| n.seq()).unwrap_or_default();
                    let seq_b = self.graph.node(b.0).map(|n| n.seq()).unwrap_or_default();
                    seq_a.cmp(&seq_b)
                })
            });
        }
        children
    }

    /// Ranked children of `context`, ascending by rank. Empty when the context does not exist.
    pub fn children_of<C: Into<Context>>(&self, context: C) -> Vec<RankedThought> {
        let context = normalize_context(&context.into());
        self.child_nodes(&context)
            .into_iter()
            .filter_map(|(child, rank)| {
                self.graph
                    .value(child)
                    .map(|value| RankedThought::new(value, rank))
            })
            .collect()
    }

    /// Distinct contexts `value` occurs in, with the rank of its first occurrence in each.
    pub fn contexts_of(&self, value: &str) -> Vec<Membership> {
        let Some(thought) = self.get(value) else {
            tracing::debug!("[ThoughtBase::contexts_of] '{value}' has no memberships");
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        thought
            .member_of
            .into_iter()
            .filter(|membership| seen.insert(membership.context.clone()))
            .collect()
    }

    /// Every value below `context`, pre-order.
    pub fn descendants_of<C: Into<Context>>(&self, context: C) -> Vec<String> {
        let context = normalize_context(&context.into());
        let mut out = Vec::new();
        for child in self.children_of(&context) {
            let child_context = context.child(child.key.clone());
            out.push(child.key);
            out.extend(self.descendants_of(child_context));
        }
        out
    }

    pub fn has_child<C: Into<Context>>(&self, context: C, value: &str) -> bool {
        let value = normalize_value(value);
        self.children_of(context)
            .iter()
            .any(|child| child.key == value)
    }

    /// Attach real ranks to a context, following the first matching occurrence at each level.
    pub fn rank_path<C: Into<Context>>(&self, context: C) -> Option<RankedPath> {
        let context = normalize_context(&context.into());
        self.graph
            .resolve(&context)
            .map(|idx| self.graph.ranked_path(idx))
    }

    /// Ranked path of the child `value` of `context`, preferring an exact rank match.
    pub fn locate<C: Into<Context>>(
        &self,
        context: C,
        value: &str,
        rank: Option<Rank>,
    ) -> Option<RankedPath> {
        let context = normalize_context(&context.into());
        self.locate_node(&context, &normalize_value(value), rank)
            .map(|idx| self.graph.ranked_path(idx))
    }

    pub(crate) fn locate_node(
        &self,
        context: &Context,
        value: &str,
        rank: Option<Rank>,
    ) -> Option<NodeIndex> {
        let candidates = self
            .child_nodes(context)
            .into_iter()
            .filter(|(child, _)| self.graph.value(*child) == Some(value))
            .collect::<Vec<_>>();
        if let Some(rank) = rank {
            if let Some((child, _)) = candidates.iter().find(|(_, r)| *r == rank) {
                return Some(*child);
            }
            if !candidates.is_empty() {
                tracing::debug!(
                    "[ThoughtBase::locate] no '{value}' at rank {rank} in {context}, using first match"
                );
            }
        }
        candidates.first().map(|(child, _)| *child)
    }

    pub fn rank_at_start<C: Into<Context>>(&self, context: C) -> Rank {
        rank::rank_at_start(&self.children_of(context))
    }

    pub fn rank_at_end<C: Into<Context>>(&self, context: C) -> Rank {
        rank::rank_at_end(&self.children_of(context))
    }

    /// A free rank directly before `sibling` in `context`. `None` when the sibling is missing or
    /// no float fits between it and its predecessor.
    pub fn rank_before<C: Into<Context>>(&self, context: C, sibling: &RankedThought) -> Option<Rank> {
        let siblings = self.children_of(context);
        let index = rank::position(&siblings, sibling)?;
        rank::rank_before(&siblings, index)
    }

    pub fn rank_after<C: Into<Context>>(&self, context: C, sibling: &RankedThought) -> Option<Rank> {
        let siblings = self.children_of(context);
        let index = rank::position(&siblings, sibling)?;
        rank::rank_after(&siblings, index)
    }

    // ---------------------------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------------------------

    /// Walk `context` from the root, inserting any missing ancestor at the end of its parent.
    fn materialize(
        &mut self,
        context: &Context,
        stamp: Timestamp,
        events: &mut Vec<ThoughtEvent>,
    ) -> NodeIndex {
        if let Some(idx) = self.graph.resolve(context) {
            return idx;
        }
        let mut current = self.graph.root();
        for value in context.values() {
            current = match self.graph.child_matching(current, value) {
                Some(child) => child,
                None => {
                    let siblings = self
                        .graph
                        .children(current)
                        .into_iter()
                        .map(|(_, rank)| RankedThought::new(String::new(), rank))
                        .collect::<Vec<_>>();
                    let rank = rank::rank_at_end(&siblings);
                    tracing::debug!(
                        "[ThoughtBase::materialize] creating missing ancestor '{value}' of {context}"
                    );
                    events.push(ThoughtEvent::updated(value.clone()));
                    self.graph.insert(current, value.clone(), rank, stamp)
                }
            };
        }
        current
    }

    /// Run the checks of [ThoughtBase::create] without changing anything.
    pub fn check_create<C: Into<Context>>(&self, value: &str, context: C) -> Result<(), ThoughtError> {
        check_placement(&normalize_value(value), &normalize_context(&context.into()))
    }

    /// Add `value` as a child of `context` at `rank`. Missing ancestors of `context` are created.
    pub fn create<C: Into<Context>>(
        &mut self,
        value: &str,
        context: C,
        rank: Rank,
    ) -> Result<Vec<ThoughtEvent>, ThoughtError> {
        let value = normalize_value(value);
        let context = normalize_context(&context.into());
        check_placement(&value, &context)?;

        let stamp = self.stamp();
        let mut events = Vec::new();
        let parent = self.materialize(&context, stamp, &mut events);
        self.graph.insert(parent, value.clone(), rank, stamp);
        events.push(ThoughtEvent::updated(value));
        Ok(coalesce(events))
    }

    /// Change the text of the occurrence of `old_value` in `context` at `rank`. Every other
    /// occurrence of `old_value` keeps its text. Descendants keep their identity; their records
    /// are reported as updated since their contexts changed.
    pub fn rename<C: Into<Context>>(
        &mut self,
        context: C,
        old_value: &str,
        new_value: &str,
        rank: Rank,
    ) -> Result<Vec<ThoughtEvent>, ThoughtError> {
        let context = normalize_context(&context.into());
        let old_value = normalize_value(old_value);
        let new_value = normalize_value(new_value);

        let Some(idx) = self.locate_node(&context, &old_value, Some(rank)) else {
            let reason = if self.graph.lexeme(&old_value).is_none() {
                "it has no memberships".to_string()
            } else {
                format!("it does not occur in {context}")
            };
            return Err(ThoughtError::InvariantViolation(format!(
                "Cannot rename '{old_value}': {reason}"
            )));
        };
        if old_value == new_value {
            return Ok(Vec::new());
        }
        check_value(&new_value)?;
        if context.values().contains(&new_value) {
            return Err(ThoughtError::InvariantViolation(format!(
                "Renaming '{old_value}' to '{new_value}' would repeat an ancestor of {context}"
            )));
        }
        let descendant_values = self
            .graph
            .subtree(idx)
            .into_iter()
            .skip(1)
            .filter_map(|node| self.graph.value(node).map(str::to_string))
            .collect::<Vec<_>>();
        if descendant_values.contains(&new_value) {
            return Err(ThoughtError::InvariantViolation(format!(
                "Renaming '{old_value}' to '{new_value}' would repeat one of its descendants"
            )));
        }

        let stamp = self.stamp();
        self.graph.set_value(idx, new_value.clone(), stamp);
        let mut events = Vec::with_capacity(descendant_values.len() + 2);
        events.push(match self.graph.lexeme(&old_value) {
            Some(_) => ThoughtEvent::updated(old_value.clone()),
            None => ThoughtEvent::removed(old_value.clone()),
        });
        events.push(ThoughtEvent::updated(new_value.clone()));
        for value in descendant_values {
            self.graph.touch(&value, stamp);
            events.push(ThoughtEvent::updated(value));
        }
        tracing::debug!("[ThoughtBase::rename] {context}: '{old_value}' -> '{new_value}'");
        Ok(coalesce(events))
    }

    /// Remove the thought a full context points at (its value is the last element) together with
    /// its subtree. Absent targets and the root are logged no-ops.
    pub fn delete<C: Into<Context>>(&mut self, context: C) -> Vec<ThoughtEvent> {
        let context = normalize_context(&context.into());
        if context.is_root() {
            tracing::warn!("[ThoughtBase::delete] refusing to delete the root context");
            return Vec::new();
        }
        match self.graph.resolve(&context) {
            Some(idx) => self.delete_node(idx),
            None => {
                tracing::debug!("[ThoughtBase::delete] {context} is already absent");
                Vec::new()
            }
        }
    }

    /// Like [ThoughtBase::delete], but targets one occurrence exactly by its ranked path.
    pub fn delete_at(&mut self, path: &RankedPath) -> Vec<ThoughtEvent> {
        if path.unroot().is_empty() {
            tracing::warn!("[ThoughtBase::delete_at] refusing to delete the root context");
            return Vec::new();
        }
        match self.graph.resolve_path(path) {
            Some(idx) => self.delete_node(idx),
            None => {
                tracing::debug!("[ThoughtBase::delete_at] {path} is already absent");
                Vec::new()
            }
        }
    }

    fn delete_node(&mut self, idx: NodeIndex) -> Vec<ThoughtEvent> {
        let stamp = self.stamp();
        let values = self.graph.remove_subtree(idx);
        let mut events = Vec::with_capacity(values.len());
        for value in values {
            if self.graph.lexeme(&value).is_some() {
                self.graph.touch(&value, stamp);
                events.push(ThoughtEvent::updated(value));
            } else {
                events.push(ThoughtEvent::removed(value));
            }
        }
        events
    }

    /// Relocate the occurrence at `from` (and its subtree) to `to`. The last element of `to` must
    /// carry the same value; its rank becomes the new rank. Missing endpoints are logged no-ops.
    pub fn move_thought(
        &mut self,
        from: &RankedPath,
        to: &RankedPath,
    ) -> Result<Vec<ThoughtEvent>, ThoughtError> {
        let Some(idx) = self.graph.resolve_path(from).filter(|idx| *idx != self.graph.root()) else {
            tracing::debug!("[ThoughtBase::move_thought] source {from} not found");
            return Ok(Vec::new());
        };
        let to = to.unroot();
        let Some(target) = to.signifier().cloned() else {
            return Err(ThoughtError::Command(
                "Move destination must name the moved thought".to_string(),
            ));
        };
        let value = self.graph.value(idx).map(str::to_string).unwrap_or_default();
        if normalize_value(&target.key) != value {
            return Err(ThoughtError::InvariantViolation(format!(
                "Move cannot turn '{value}' into '{}'; rename it instead",
                target.key
            )));
        }
        let Some(parent) = self.graph.resolve_path(&to.intersections()) else {
            tracing::debug!("[ThoughtBase::move_thought] destination parent of {to} not found");
            return Ok(Vec::new());
        };
        if self.graph.is_within(idx, parent) {
            return Err(ThoughtError::InvariantViolation(format!(
                "Cannot move '{value}' into its own subtree"
            )));
        }
        let subtree_values = self
            .graph
            .subtree(idx)
            .into_iter()
            .filter_map(|node| self.graph.value(node).map(str::to_string))
            .collect::<Vec<_>>();
        let destination = self.graph.full_context(parent);
        if let Some(repeated) = subtree_values
            .iter()
            .find(|value| destination.values().contains(*value))
        {
            return Err(ThoughtError::InvariantViolation(format!(
                "Moving '{value}' under {destination} would repeat '{repeated}' on its path"
            )));
        }

        let stamp = self.stamp();
        self.graph.reparent(idx, parent, target.rank);
        let mut events = Vec::with_capacity(subtree_values.len());
        for value in subtree_values {
            self.graph.touch(&value, stamp);
            events.push(ThoughtEvent::updated(value));
        }
        Ok(coalesce(events))
    }

    /// Reassign the children of `context` integer ranks `0..n` in their current order.
    pub fn renormalize<C: Into<Context>>(&mut self, context: C) -> Vec<ThoughtEvent> {
        let context = normalize_context(&context.into());
        let children = self.child_nodes(&context);
        let stamp = self.stamp();
        let mut events = Vec::with_capacity(children.len());
        for (rank, (child, _)) in children.into_iter().enumerate() {
            self.graph.set_rank(child, rank as Rank);
            if let Some(value) = self.graph.value(child).map(str::to_string) {
                self.graph.touch(&value, stamp);
                events.push(ThoughtEvent::updated(value));
            }
        }
        coalesce(events)
    }

    // ---------------------------------------------------------------------------------------------
    // Records in and out
    // ---------------------------------------------------------------------------------------------

    pub fn from_records<I: IntoIterator<Item = Thought>>(records: I) -> Result<Self, ThoughtError> {
        Self::from_records_with_clock(records, Arc::new(SystemClock))
    }

    pub fn from_records_with_clock<I: IntoIterator<Item = Thought>>(
        records: I,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ThoughtError> {
        let records = records
            .into_iter()
            .map(|thought| (normalize_value(&thought.value), thought))
            .collect::<BTreeMap<_, _>>();
        Self::rebuild(&records, clock)
    }

    /// Build the occurrence arena from value-keyed records. Shorter contexts are placed first so
    /// parents exist before their children. Ancestors no record accounts for are materialized.
    fn rebuild(
        records: &BTreeMap<String, Thought>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ThoughtError> {
        let mut entries: Vec<(Context, &str, Rank)> = Vec::new();
        for (value, thought) in records.iter() {
            check_record(value, thought)?;
            if thought.member_of.is_empty() {
                tracing::warn!("[ThoughtBase::rebuild] skipping record '{value}' without memberships");
                continue;
            }
            for membership in thought.member_of.iter() {
                let context = normalize_context(&membership.context);
                entries.push((context, value.as_str(), membership.rank));
            }
        }
        entries.sort_by(|a, b| {
            a.0.values()
                .len()
                .cmp(&b.0.values().len())
                .then(a.2.total_cmp(&b.2))
        });

        let mut base = ThoughtBase::with_clock(clock);
        let mut materialized = Vec::new();
        for (context, value, rank) in entries {
            let parent = base.materialize(&context, Timestamp::default(), &mut materialized);
            let duplicate = base
                .graph
                .children(parent)
                .iter()
                .any(|(child, r)| base.graph.value(*child) == Some(value) && *r == rank);
            if duplicate {
                tracing::debug!("[ThoughtBase::rebuild] dropping repeated membership of '{value}' in {context}");
                continue;
            }
            base.graph
                .insert(parent, value.to_string(), rank, Timestamp::default());
        }
        for (value, thought) in records.iter() {
            base.graph.set_last_updated(value, thought.last_updated);
        }
        if !materialized.is_empty() {
            let stamp = base.stamp();
            for value in materialized.iter().filter_map(ThoughtEvent::value) {
                base.graph.touch(value, stamp);
            }
            tracing::warn!(
                "[ThoughtBase::rebuild] materialized {} ancestors missing from the records",
                materialized.len()
            );
        }
        Ok(base)
    }

    /// Reconcile with a full remote snapshot using per-record last-write-wins. Incoming records
    /// that are strictly newer replace local ones; local records absent from the snapshot are
    /// removed, together with every surviving membership that lists one of them as an ancestor.
    /// Local records that win, and records pruned that way, are reported as local updates so they
    /// get written back.
    pub fn merge(&mut self, snapshot: Vec<Thought>) -> Result<Vec<ThoughtEvent>, ThoughtError> {
        let local = self.records();
        let remote = snapshot
            .into_iter()
            .map(|thought| (normalize_value(&thought.value), thought))
            .collect::<BTreeMap<_, _>>();
        for (value, incoming) in remote.iter() {
            check_record(value, incoming)?;
        }
        let removed = local
            .keys()
            .filter(|value| !remote.contains_key(*value))
            .cloned()
            .collect::<BTreeSet<_>>();

        let mut merged = BTreeMap::new();
        let mut events = Vec::new();
        for (value, incoming) in remote.iter() {
            let (mut kept, origin) = match local.get(value) {
                Some(existing) if !incoming.newer_than(existing) => (
                    existing.clone(),
                    existing.newer_than(incoming).then_some(EventOrigin::Local),
                ),
                existing => (
                    incoming.clone(),
                    (existing != Some(incoming)).then_some(EventOrigin::Remote),
                ),
            };
            let before = kept.member_of.len();
            kept.member_of.retain(|membership| {
                !normalize_context(&membership.context)
                    .values()
                    .iter()
                    .any(|ancestor| removed.contains(ancestor))
            });
            if kept.member_of.len() != before {
                tracing::debug!(
                    "[ThoughtBase::merge] dropped {} memberships of '{value}' under removed thoughts",
                    before - kept.member_of.len()
                );
                if kept.member_of.is_empty() {
                    events.push(ThoughtEvent::removed(value.clone()));
                    continue;
                }
                kept.last_updated = self.stamp();
                events.push(ThoughtEvent::updated(value.clone()));
            } else if let Some(origin) = origin {
                events.push(ThoughtEvent::updated(value.clone()).with_origin(origin));
            }
            merged.insert(value.clone(), kept);
        }
        for value in removed {
            events.push(ThoughtEvent::removed(value).with_origin(EventOrigin::Remote));
        }

        let rebuilt = Self::rebuild(&merged, self.clock.clone())?;
        for (value, _) in rebuilt.graph.lexemes() {
            if !merged.contains_key(value) {
                events.push(ThoughtEvent::updated(value.clone()));
            }
        }
        self.graph = rebuilt.graph;
        tracing::debug!(
            "[ThoughtBase::merge] merged {} remote records, {} events",
            remote.len(),
            events.len()
        );
        Ok(coalesce(events))
    }

    /// Check every invariant of the store. Returns a description of each violation found.
    pub fn built_in_test(&self) -> Vec<String> {
        let mut errors = self.graph.built_in_test();
        for (value, _) in self.graph.lexemes() {
            let Some(thought) = self.get(value) else {
                continue;
            };
            for membership in thought.member_of.iter() {
                if membership.context.values().contains(value) {
                    errors.push(format!("'{value}' is its own ancestor in {}", membership.context));
                }
                if let Err(e) = check_context(&membership.context) {
                    errors.push(e.to_string());
                }
                let listed = self
                    .children_of(&membership.context)
                    .iter()
                    .any(|child| &child.key == value && child.rank == membership.rank);
                if !listed {
                    errors.push(format!(
                        "'{value}' is missing from the children of {}",
                        membership.context
                    ));
                }
            }
        }
        errors
    }
}
