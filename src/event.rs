use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::paths::RankedPath;

/// Indicates the origin of a ThoughtEvent so the driver knows whether it still has to be written
/// to the persistence adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventOrigin {
    /// Produced by a local mutation. The record must be written to the persistence adapter.
    #[default]
    Local,

    /// Produced by applying a remote snapshot. Already persisted at the source; observers only.
    Remote,
}

/// Effects returned by every mutation alongside the new state. Mutations never perform I/O; an outer
/// driver ([crate::persist::SyncQueue], [crate::service::ThoughtService]) executes these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ThoughtEvent {
    /// The record for this value changed (created, new membership, renamed ancestor, ...).
    ThoughtUpdated(String, EventOrigin),
    /// The last membership of this value is gone and its record no longer exists.
    ThoughtRemoved(String, EventOrigin),
    /// The cursor moved. `None` means nothing is focused.
    CursorMoved(Option<RankedPath>),
}

impl ThoughtEvent {
    pub fn updated<S: Into<String>>(value: S) -> Self {
        ThoughtEvent::ThoughtUpdated(value.into(), EventOrigin::Local)
    }

    pub fn removed<S: Into<String>>(value: S) -> Self {
        ThoughtEvent::ThoughtRemoved(value.into(), EventOrigin::Local)
    }

    /// Returns the EventOrigin of this event, or None for cursor events
    pub fn origin(&self) -> Option<EventOrigin> {
        match self {
            ThoughtEvent::ThoughtUpdated(_, origin) => Some(*origin),
            ThoughtEvent::ThoughtRemoved(_, origin) => Some(*origin),
            ThoughtEvent::CursorMoved(_) => None,
        }
    }

    /// Returns a new event with the specified origin
    pub fn with_origin(self, new_origin: EventOrigin) -> Self {
        match self {
            ThoughtEvent::ThoughtUpdated(v, _) => ThoughtEvent::ThoughtUpdated(v, new_origin),
            ThoughtEvent::ThoughtRemoved(v, _) => ThoughtEvent::ThoughtRemoved(v, new_origin),
            ThoughtEvent::CursorMoved(p) => ThoughtEvent::CursorMoved(p),
        }
    }

    /// The thought value a record event refers to.
    pub fn value(&self) -> Option<&str> {
        match self {
            ThoughtEvent::ThoughtUpdated(v, _) | ThoughtEvent::ThoughtRemoved(v, _) => Some(v),
            ThoughtEvent::CursorMoved(_) => None,
        }
    }

    /// Whether this event still has to reach the persistence adapter.
    pub fn needs_persist(&self) -> bool {
        self.origin() == Some(EventOrigin::Local)
    }
}

impl Display for ThoughtEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ThoughtEvent::ThoughtUpdated(v, _) => write!(f, "ThoughtUpdated({v})"),
            ThoughtEvent::ThoughtRemoved(v, _) => write!(f, "ThoughtRemoved({v})"),
            ThoughtEvent::CursorMoved(Some(path)) => write!(f, "CursorMoved({path})"),
            ThoughtEvent::CursorMoved(None) => write!(f, "CursorMoved(None)"),
        }
    }
}

/// Collapse repeated record events for the same value, keeping the position of the first and the
/// kind of the last.
pub(crate) fn coalesce(events: Vec<ThoughtEvent>) -> Vec<ThoughtEvent> {
    let mut out: Vec<ThoughtEvent> = Vec::with_capacity(events.len());
    for event in events {
        let existing = event.value().and_then(|value| {
            out.iter().position(|prev| {
                prev.value() == Some(value) && prev.origin() == event.origin()
            })
        });
        match existing {
            Some(idx) => out[idx] = event,
            None => out.push(event),
        }
    }
    out
}
