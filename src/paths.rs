//! Contexts and ranked paths.
//!
//! A [Context] is a sequence of thought values, root-first, identifying a location by text. A
//! [RankedPath] is a sequence of `(key, rank)` pairs from root (exclusive) to a focused thought
//! (inclusive); two ranked paths are equal when every `(key, rank)` pair is equal, which is what
//! tells apart duplicate siblings sharing the same text.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt::{self, Display, Formatter},
    ops::Deref,
};

use crate::properties::{Rank, ROOT_TOKEN};

/// Number of hex characters kept from the SHA-256 digest in [RankedPath::node_key].
const NODE_KEY_LEN: usize = 16;

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Vec<String>);

impl Context {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Context(values.into_iter().map(Into::into).collect())
    }

    /// The sentinel context `["root"]`.
    pub fn root() -> Self {
        Context(vec![ROOT_TOKEN.to_string()])
    }

    /// True iff this is exactly the root sentinel.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1 && self.0[0] == ROOT_TOKEN
    }

    /// Drop a leading root sentinel if present.
    pub fn unroot(&self) -> Context {
        match self.0.first() {
            Some(first) if first == ROOT_TOKEN => Context(self.0[1..].to_vec()),
            _ => self.clone(),
        }
    }

    /// Canonical form used for every lookup: an empty context or a bare root is the root context,
    /// anything else loses its leading root sentinel.
    pub fn normalize(&self) -> Context {
        let unrooted = self.unroot();
        if unrooted.is_empty() {
            Context::root()
        } else {
            unrooted
        }
    }

    /// The last element: the focused value. `None` for an empty context.
    pub fn signifier(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// All but the last element. May be empty.
    pub fn intersections(&self) -> Context {
        match self.0.split_last() {
            Some((_, rest)) => Context(rest.to_vec()),
            None => Context::default(),
        }
    }

    /// The context of a child `value` living in this context.
    pub fn child<S: Into<String>>(&self, value: S) -> Context {
        let mut values = self.normalize().unroot().0;
        values.push(value.into());
        Context(values)
    }

    /// Values with the root sentinel removed.
    pub fn values(&self) -> &[String] {
        match self.0.first() {
            Some(first) if first == ROOT_TOKEN => &self.0[1..],
            _ => &self.0,
        }
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for Context {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl From<Vec<String>> for Context {
    fn from(values: Vec<String>) -> Self {
        Context(values)
    }
}

impl From<&[&str]> for Context {
    fn from(values: &[&str]) -> Self {
        Context::new(values.iter().copied())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Context {
    fn from(values: [S; N]) -> Self {
        Context::new(values)
    }
}

impl From<&Context> for Context {
    fn from(context: &Context) -> Self {
        context.clone()
    }
}

/// One element of a [RankedPath].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedThought {
    pub key: String,
    pub rank: Rank,
}

impl RankedThought {
    pub fn new<S: Into<String>>(key: S, rank: Rank) -> Self {
        RankedThought {
            key: key.into(),
            rank,
        }
    }

    pub fn root() -> Self {
        RankedThought::new(ROOT_TOKEN, 0.0)
    }
}

impl Display for RankedThought {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.key, self.rank)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedPath(Vec<RankedThought>);

impl RankedPath {
    pub fn new(thoughts: Vec<RankedThought>) -> Self {
        RankedPath(thoughts)
    }

    /// The root path: a single root sentinel element.
    pub fn root() -> Self {
        RankedPath(vec![RankedThought::root()])
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1 && self.0[0].key == ROOT_TOKEN
    }

    pub fn unroot(&self) -> RankedPath {
        match self.0.first() {
            Some(first) if first.key == ROOT_TOKEN => RankedPath(self.0[1..].to_vec()),
            _ => self.clone(),
        }
    }

    pub fn signifier(&self) -> Option<&RankedThought> {
        self.0.last()
    }

    pub fn intersections(&self) -> RankedPath {
        match self.0.split_last() {
            Some((_, rest)) => RankedPath(rest.to_vec()),
            None => RankedPath::default(),
        }
    }

    /// A new path extended by one child element.
    pub fn child(&self, thought: RankedThought) -> RankedPath {
        let mut thoughts = self.unroot().0;
        thoughts.push(thought);
        RankedPath(thoughts)
    }

    /// Inclusive prefix ending at the first occurrence of `element`. Empty when `element` is not
    /// part of the path.
    pub fn ancestors_up_to(&self, element: &RankedThought) -> RankedPath {
        match self.0.iter().position(|thought| thought == element) {
            Some(idx) => RankedPath(self.0[..=idx].to_vec()),
            None => RankedPath::default(),
        }
    }

    /// Elementwise `(key, rank)` prefix test.
    pub fn starts_with(&self, prefix: &RankedPath) -> bool {
        self.0.len() >= prefix.0.len() && self.0.iter().zip(prefix.0.iter()).all(|(a, b)| a == b)
    }

    /// Replace the `old` prefix of this path with `new`. `None` when `old` is not a prefix.
    pub fn rebase(&self, old: &RankedPath, new: &RankedPath) -> Option<RankedPath> {
        if !self.starts_with(old) {
            return None;
        }
        let mut thoughts = new.0.clone();
        thoughts.extend_from_slice(&self.0[old.0.len()..]);
        Some(RankedPath(thoughts))
    }

    pub fn to_context(&self) -> Context {
        to_context(self)
    }

    /// Stable render key for the thought this path focuses. A UI collaborator uses it to find the
    /// rendered node again after a re-render (e.g. to restore the caret).
    pub fn node_key(&self) -> String {
        let mut hasher = Sha256::new();
        for thought in self.unroot().0.iter() {
            hasher.update(thought.key.as_bytes());
            hasher.update([0x1f]);
            hasher.update(thought.rank.to_be_bytes());
            hasher.update([0x1e]);
        }
        let digest = hex::encode(hasher.finalize());
        digest[..NODE_KEY_LEN].to_string()
    }

    pub fn into_inner(self) -> Vec<RankedThought> {
        self.0
    }
}

impl Deref for RankedPath {
    type Target = [RankedThought];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for RankedPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]",
            self.0
                .iter()
                .map(|thought| thought.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

impl From<Vec<RankedThought>> for RankedPath {
    fn from(thoughts: Vec<RankedThought>) -> Self {
        RankedPath(thoughts)
    }
}

impl FromIterator<RankedThought> for RankedPath {
    fn from_iter<T: IntoIterator<Item = RankedThought>>(iter: T) -> Self {
        RankedPath(iter.into_iter().collect())
    }
}

/// Project away ranks.
pub fn to_context(path: &RankedPath) -> Context {
    if path.is_empty() {
        return Context::root();
    }
    Context::new(path.iter().map(|thought| thought.key.clone()))
}

/// Reattach rank `0` to every value of a context ("fill rank"). Use
/// [crate::thoughtbase::ThoughtBase::rank_path] to attach the real ranks.
pub fn to_path(context: &Context) -> RankedPath {
    if context.is_root() {
        return RankedPath::root();
    }
    context
        .values()
        .iter()
        .map(|value| RankedThought::new(value.clone(), 0.0))
        .collect()
}

/// Cursor equality: both absent, or both present and equal elementwise on `(key, rank)`.
pub fn equal_path(a: Option<&RankedPath>, b: Option<&RankedPath>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
