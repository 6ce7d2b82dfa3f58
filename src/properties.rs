//! [crate::properties] contains the basic building blocks of the thought graph: identifiers,
//! ranks, timestamps and the value-keyed [Thought] record exchanged with persistence adapters.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};
use unicode_normalization::UnicodeNormalization;

pub use uuid::Uuid;

use crate::paths::Context;

/// The sentinel value of the root context. It is never a thought of its own.
pub const ROOT_TOKEN: &str = "root";

/// Prefix marking a meta-thought (attribute) such as `=readonly`.
pub const META_PREFIX: char = '=';

pub const ATTR_READONLY: &str = "=readonly";
pub const ATTR_UNEXTENDABLE: &str = "=unextendable";

/// Float ordering key among siblings sharing a context. Ranks are not contiguous and are never
/// renormalized implicitly.
pub type Rank = f64;

/// Thought ID
///
/// Opaque identifier of one *occurrence* of a thought inside the graph. Two occurrences of the same
/// text value under different contexts have different ids, and an occurrence keeps its id across
/// renames and moves.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ThoughtId(Uuid);

impl ThoughtId {
    pub fn new() -> Self {
        ThoughtId(Uuid::new_v4())
    }

    /// The id of the root sentinel node.
    pub fn root() -> Self {
        ThoughtId(Uuid::nil())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for ThoughtId {
    fn default() -> Self {
        ThoughtId::new()
    }
}

impl AsRef<Uuid> for ThoughtId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ThoughtId {
    fn from(id: Uuid) -> Self {
        ThoughtId(id)
    }
}

impl Display for ThoughtId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}

/// Milliseconds since the unix epoch. Used only for last-write-wins comparison.
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        )
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of [Timestamp]s for a [crate::thoughtbase::ThoughtBase].
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to. Every call to [Clock::now] returns the current value and
/// then advances it by one tick, so successive writes are strictly ordered.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn starting_at(ms: u64) -> Self {
        ManualClock(AtomicU64::new(ms))
    }

    pub fn set(&self, ms: u64) {
        self.0.store(ms, Ordering::SeqCst);
    }

    pub fn peek(&self) -> Timestamp {
        Timestamp(self.0.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.0.fetch_add(1, Ordering::SeqCst))
    }
}

/// One occurrence of a thought within one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    /// Ancestor values, root-first, excluding the thought's own value. Top-level thoughts carry
    /// the root context `["root"]`.
    pub context: Context,
    pub rank: Rank,
}

impl Membership {
    pub fn new<C: Into<Context>>(context: C, rank: Rank) -> Self {
        Membership {
            context: context.into(),
            rank,
        }
    }
}

/// The value-keyed record of a thought: its text plus every context it currently occurs in.
///
/// This is the unit persistence adapters store and remote snapshots deliver. Inside the crate the
/// record is a projection of the occurrence graph, see [crate::thoughtbase::ThoughtBase::get].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thought {
    pub value: String,
    pub member_of: Vec<Membership>,
    pub last_updated: Timestamp,
}

impl Thought {
    pub fn new<S: Into<String>>(value: S, member_of: Vec<Membership>, last_updated: Timestamp) -> Self {
        Thought {
            value: value.into(),
            member_of,
            last_updated,
        }
    }

    /// True when `self` should replace `other` under last-write-wins.
    pub fn newer_than(&self, other: &Thought) -> bool {
        self.last_updated > other.last_updated
    }
}

/// Unicode NFC normalization applied to every value entering the graph.
pub fn normalize_value(value: &str) -> String {
    value.nfc().collect()
}

pub fn is_meta(value: &str) -> bool {
    value.starts_with(META_PREFIX)
}
