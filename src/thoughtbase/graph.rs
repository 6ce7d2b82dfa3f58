//! Occurrence arena for the thought graph.
//!
//! - [`ThoughtGraph`]: a `StableGraph` of thought occurrences (edges parent -> child, weighted by the
//!   child's rank) plus the lexeme index mapping each text value to its occurrences.
//! - [`ThoughtNode`]: one occurrence. Its text may change (rename) without touching any other node;
//!   contexts are derived from parent links on demand.

use petgraph::{
    algo::has_path_connecting,
    stable_graph::{NodeIndex, StableGraph},
    visit::{Dfs, EdgeRef},
    Direction,
};
use std::collections::BTreeMap;

use crate::{
    paths::{Context, RankedPath, RankedThought},
    properties::{Rank, ThoughtId, Timestamp, ROOT_TOKEN},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ThoughtNode {
    pub id: ThoughtId,
    pub value: String,
    /// Creation order. Breaks ties between siblings of equal rank.
    seq: u64,
}

impl ThoughtNode {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Everything known about one text value: where it occurs and when its record last changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Lexeme {
    /// Occurrences ordered by creation.
    pub occurrences: Vec<NodeIndex>,
    pub last_updated: Timestamp,
}

impl Lexeme {
    fn touch(&mut self, stamp: Timestamp) {
        self.last_updated = self.last_updated.max(stamp);
    }
}

#[derive(Debug, Clone)]
pub struct ThoughtGraph {
    graph: StableGraph<ThoughtNode, Rank>,
    root: NodeIndex,
    ids: BTreeMap<ThoughtId, NodeIndex>,
    lexemes: BTreeMap<String, Lexeme>,
    next_seq: u64,
}

impl Default for ThoughtGraph {
    fn default() -> Self {
        ThoughtGraph::new()
    }
}

impl ThoughtGraph {
    pub fn new() -> Self {
        let mut graph = StableGraph::new();
        let root = graph.add_node(ThoughtNode {
            id: ThoughtId::root(),
            value: ROOT_TOKEN.to_string(),
            seq: 0,
        });
        let mut ids = BTreeMap::new();
        ids.insert(ThoughtId::root(), root);
        ThoughtGraph {
            graph,
            root,
            ids,
            lexemes: BTreeMap::new(),
            next_seq: 1,
        }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&ThoughtNode> {
        self.graph.node_weight(idx)
    }

    pub fn value(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node_weight(idx).map(|node| node.value.as_str())
    }

    pub fn index_of(&self, id: &ThoughtId) -> Option<NodeIndex> {
        self.ids.get(id).copied()
    }

    /// Number of occurrences, root excluded.
    pub fn occurrence_count(&self) -> usize {
        self.graph.node_count() - 1
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<(NodeIndex, Rank)> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .next()
            .map(|edge| (edge.source(), *edge.weight()))
    }

    pub fn rank(&self, idx: NodeIndex) -> Option<Rank> {
        self.parent(idx).map(|(_, rank)| rank)
    }

    /// Children sorted ascending by rank, ties broken by creation order.
    pub fn children(&self, idx: NodeIndex) -> Vec<(NodeIndex, Rank)> {
        let mut children = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (edge.target(), *edge.weight(), self.graph[edge.target()].seq))
            .collect::<Vec<_>>();
        children.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)));
        children
            .into_iter()
            .map(|(child, rank, _)| (child, rank))
            .collect()
    }

    /// First child (in rank order) holding `value`.
    pub fn child_matching(&self, parent: NodeIndex, value: &str) -> Option<NodeIndex> {
        self.children(parent)
            .into_iter()
            .find(|(child, _)| self.graph[*child].value == value)
            .map(|(child, _)| child)
    }

    /// Nodes from the top-level ancestor down to `idx`, inclusive. Empty for the root.
    pub fn lineage(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut chain = Vec::new();
        let mut current = idx;
        while current != self.root {
            chain.push(current);
            match self.parent(current) {
                Some((parent, _)) => current = parent,
                None => break,
            }
        }
        chain.reverse();
        chain
    }

    /// Ancestor values of `idx`, excluding its own value: the context of its membership.
    pub fn context_of(&self, idx: NodeIndex) -> Context {
        let lineage = self.lineage(idx);
        match lineage.split_last() {
            Some((_, ancestors)) if !ancestors.is_empty() => {
                Context::new(ancestors.iter().map(|node| self.graph[*node].value.clone()))
            }
            _ => Context::root(),
        }
    }

    /// Values from the top down to and including `idx`. The root context for the root.
    pub fn full_context(&self, idx: NodeIndex) -> Context {
        let lineage = self.lineage(idx);
        if lineage.is_empty() {
            return Context::root();
        }
        Context::new(lineage.iter().map(|node| self.graph[*node].value.clone()))
    }

    pub fn ranked_path(&self, idx: NodeIndex) -> RankedPath {
        if idx == self.root {
            return RankedPath::root();
        }
        self.lineage(idx)
            .into_iter()
            .map(|node| {
                RankedThought::new(
                    self.graph[node].value.clone(),
                    self.rank(node).unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Every occurrence reached by walking `context`'s values down from the root. A value-context
    /// can name several occurrences when siblings share text.
    pub fn resolve_all(&self, context: &Context) -> Vec<NodeIndex> {
        let context = context.normalize();
        let mut frontier = vec![self.root];
        if context.is_root() {
            return frontier;
        }
        for value in context.values() {
            frontier = frontier
                .iter()
                .flat_map(|parent| self.children(*parent))
                .filter(|(child, _)| &self.graph[*child].value == value)
                .map(|(child, _)| child)
                .collect();
            if frontier.is_empty() {
                break;
            }
        }
        frontier
    }

    pub fn resolve(&self, context: &Context) -> Option<NodeIndex> {
        self.resolve_all(context).into_iter().next()
    }

    /// Exact `(key, rank)` walk.
    pub fn resolve_path(&self, path: &RankedPath) -> Option<NodeIndex> {
        let mut current = self.root;
        for thought in path.unroot().iter() {
            current = self
                .children(current)
                .into_iter()
                .find(|(child, rank)| self.graph[*child].value == thought.key && *rank == thought.rank)?
                .0;
        }
        Some(current)
    }

    /// The occurrence itself followed by its descendants, pre-order, siblings in rank order.
    pub fn subtree(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(node) = stack.pop() {
            out.push(node);
            for (child, _) in self.children(node).into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// True when `descendant` is `ancestor` or lies below it.
    pub fn is_within(&self, ancestor: NodeIndex, descendant: NodeIndex) -> bool {
        has_path_connecting(&self.graph, ancestor, descendant, None)
    }

    pub fn insert(
        &mut self,
        parent: NodeIndex,
        value: String,
        rank: Rank,
        stamp: Timestamp,
    ) -> NodeIndex {
        let id = ThoughtId::new();
        let seq = self.next_seq;
        self.next_seq += 1;
        let idx = self.graph.add_node(ThoughtNode {
            id,
            value: value.clone(),
            seq,
        });
        self.graph.add_edge(parent, idx, rank);
        self.ids.insert(id, idx);
        self.remember_occurrence(&value, idx, stamp);
        idx
    }

    /// Remove an occurrence and everything below it. Returns the values that lost an occurrence, in
    /// removal order, without duplicates.
    pub fn remove_subtree(&mut self, idx: NodeIndex) -> Vec<String> {
        if idx == self.root {
            return Vec::new();
        }
        let mut nodes = Vec::new();
        let mut dfs = Dfs::new(&self.graph, idx);
        while let Some(node) = dfs.next(&self.graph) {
            nodes.push(node);
        }

        let mut values: Vec<String> = Vec::new();
        for node in nodes {
            if let Some(removed) = self.graph.remove_node(node) {
                self.ids.remove(&removed.id);
                self.forget_occurrence(&removed.value, node);
                if !values.contains(&removed.value) {
                    values.push(removed.value);
                }
            }
        }
        values
    }

    /// Change the text of one occurrence. Returns the previous value.
    pub fn set_value(&mut self, idx: NodeIndex, value: String, stamp: Timestamp) -> Option<String> {
        let old = self.graph.node_weight(idx)?.value.clone();
        self.forget_occurrence(&old, idx);
        if let Some(lexeme) = self.lexemes.get_mut(&old) {
            lexeme.touch(stamp);
        }
        self.graph[idx].value = value.clone();
        self.remember_occurrence(&value, idx, stamp);
        Some(old)
    }

    pub fn reparent(&mut self, idx: NodeIndex, parent: NodeIndex, rank: Rank) {
        let incoming = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| edge.id())
            .collect::<Vec<_>>();
        for edge in incoming {
            self.graph.remove_edge(edge);
        }
        self.graph.add_edge(parent, idx, rank);
    }

    pub fn set_rank(&mut self, idx: NodeIndex, rank: Rank) {
        let incoming = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .next()
            .map(|edge| edge.id());
        if let Some(edge) = incoming {
            self.graph[edge] = rank;
        }
    }

    pub(crate) fn lexeme(&self, value: &str) -> Option<&Lexeme> {
        self.lexemes.get(value)
    }

    pub(crate) fn lexemes(&self) -> impl Iterator<Item = (&String, &Lexeme)> {
        self.lexemes.iter()
    }

    pub(crate) fn touch(&mut self, value: &str, stamp: Timestamp) {
        if let Some(lexeme) = self.lexemes.get_mut(value) {
            lexeme.touch(stamp);
        }
    }

    /// Overwrite the timestamp, used when loading records verbatim.
    pub(crate) fn set_last_updated(&mut self, value: &str, stamp: Timestamp) {
        if let Some(lexeme) = self.lexemes.get_mut(value) {
            lexeme.last_updated = stamp;
        }
    }

    fn remember_occurrence(&mut self, value: &str, idx: NodeIndex, stamp: Timestamp) {
        let graph = &self.graph;
        let seq = graph[idx].seq;
        let lexeme = self.lexemes.entry(value.to_string()).or_default();
        let pos = lexeme
            .occurrences
            .partition_point(|occurrence| graph[*occurrence].seq < seq);
        lexeme.occurrences.insert(pos, idx);
        lexeme.touch(stamp);
    }

    fn forget_occurrence(&mut self, value: &str, idx: NodeIndex) {
        let emptied = match self.lexemes.get_mut(value) {
            Some(lexeme) => {
                lexeme.occurrences.retain(|occurrence| *occurrence != idx);
                lexeme.occurrences.is_empty()
            }
            None => false,
        };
        if emptied {
            self.lexemes.remove(value);
        }
    }

    /// Structural consistency between the arena and the lexeme index. Empty when healthy.
    pub fn built_in_test(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            if idx == self.root {
                if self.parent(idx).is_some() {
                    errors.push("Root node has a parent".to_string());
                }
                continue;
            }
            let parents = self.graph.edges_directed(idx, Direction::Incoming).count();
            if parents != 1 {
                errors.push(format!("'{}' ({}) has {parents} parents", node.value, node.id));
            }
            if self.ids.get(&node.id) != Some(&idx) {
                errors.push(format!("'{}' ({}) missing from the id index", node.value, node.id));
            }
            let indexed = self
                .lexemes
                .get(&node.value)
                .map(|lexeme| lexeme.occurrences.contains(&idx))
                .unwrap_or(false);
            if !indexed {
                errors.push(format!("'{}' ({}) missing from its lexeme", node.value, node.id));
            }
            if node.value == ROOT_TOKEN {
                errors.push(format!("Occurrence {} uses the reserved root value", node.id));
            }
        }
        for (value, lexeme) in self.lexemes.iter() {
            if lexeme.occurrences.is_empty() {
                errors.push(format!("Lexeme '{value}' has no occurrences"));
            }
            for occurrence in lexeme.occurrences.iter() {
                match self.graph.node_weight(*occurrence) {
                    Some(node) if &node.value == value => {}
                    Some(node) => errors.push(format!(
                        "Lexeme '{value}' points at an occurrence holding '{}'",
                        node.value
                    )),
                    None => errors.push(format!("Lexeme '{value}' points at a removed occurrence")),
                }
            }
        }
        errors
    }
}
