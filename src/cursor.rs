//! Selection tracking.
//!
//! The cursor is the ranked path of the focused thought, or nothing. It is stored unrooted so that
//! `["root", a]` and `[a]` describe the same focus.

use crate::{
    event::ThoughtEvent,
    paths::{equal_path, RankedPath},
    thoughtbase::ThoughtBase,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cursor {
    path: Option<RankedPath>,
}

impl Cursor {
    pub fn get(&self) -> Option<&RankedPath> {
        self.path.as_ref()
    }

    /// Replace the cursor. Returns a [ThoughtEvent::CursorMoved] only when it actually changed.
    pub fn set(&mut self, path: Option<RankedPath>) -> Option<ThoughtEvent> {
        let path = path
            .map(|path| path.unroot())
            .filter(|path| !path.is_empty());
        if equal_path(self.path.as_ref(), path.as_ref()) {
            return None;
        }
        self.path = path;
        Some(ThoughtEvent::CursorMoved(self.path.clone()))
    }

    pub fn is_at(&self, path: &RankedPath) -> bool {
        equal_path(self.path.as_ref(), Some(&path.unroot()))
    }

    /// True when the cursor is on `ancestor` or anywhere below it.
    pub fn is_within(&self, ancestor: &RankedPath) -> bool {
        self.path
            .as_ref()
            .map(|path| path.starts_with(&ancestor.unroot()))
            .unwrap_or(false)
    }

    /// Follow a thought that moved from `old` to `new`.
    pub fn rebase(&mut self, old: &RankedPath, new: &RankedPath) -> Option<ThoughtEvent> {
        let rebased = self
            .path
            .as_ref()
            .and_then(|path| path.rebase(&old.unroot(), &new.unroot()))?;
        self.set(Some(rebased))
    }

    /// Cut the cursor back to its longest prefix that still resolves in `thoughts`.
    pub fn retain_resolvable(&mut self, thoughts: &ThoughtBase) -> Option<ThoughtEvent> {
        let path = self.path.as_ref()?;
        let resolving = (1..=path.len())
            .rev()
            .map(|len| RankedPath::new(path[..len].to_vec()))
            .find(|prefix| thoughts.id_at(prefix).is_some());
        if resolving.is_none() {
            tracing::debug!("[Cursor::retain_resolvable] {path} no longer resolves, clearing");
        }
        self.set(resolving)
    }
}
