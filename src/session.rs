//! Session: the single owner of editing state.
//!
//! A [Session] bundles the thought store with the cursor, the set of contexts shown in context
//! view and the runtime [Config]. All changes go through [Session::apply], which returns the
//! [ThoughtEvent]s an outer driver needs to persist records and update the view.

use std::collections::BTreeSet;

use crate::{
    commands::{NewThought, Op},
    config::Config,
    cursor::Cursor,
    event::ThoughtEvent,
    outline,
    paths::{to_context, Context, RankedPath, RankedThought},
    properties::{normalize_value, Rank, ATTR_READONLY, ATTR_UNEXTENDABLE, META_PREFIX, ROOT_TOKEN},
    rank,
    thoughtbase::{sort_to_front, ThoughtBase},
    ThoughtError,
};

#[derive(Debug, Clone, Default)]
pub struct Session {
    thoughts: ThoughtBase,
    cursor: Cursor,
    context_views: BTreeSet<Context>,
    config: Config,
}

impl Session {
    pub fn new(thoughts: ThoughtBase, config: Config) -> Self {
        Session {
            thoughts,
            config,
            ..Default::default()
        }
    }

    pub fn thoughts(&self) -> &ThoughtBase {
        &self.thoughts
    }

    pub fn cursor(&self) -> Option<&RankedPath> {
        self.cursor.get()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_context_view_active<C: Into<Context>>(&self, context: C) -> bool {
        self.context_views.contains(&context.into().normalize())
    }

    /// What the outline shows below `context`: its children, or the contexts of its signifier when
    /// the context view is toggled on.
    pub fn visible_children<C: Into<Context>>(&self, context: C) -> Vec<RankedPath> {
        let context = context.into().normalize();
        match context.signifier() {
            Some(value) if !context.is_root() && self.is_context_view_active(&context) => {
                self.thoughts.derived_children_for_context_view(value)
            }
            _ => self.thoughts.child_paths(&context),
        }
    }

    /// [sort_to_front] with the configured match mode.
    pub fn sort_to_front(
        &self,
        target: &Context,
        list: Vec<RankedPath>,
    ) -> Result<Vec<RankedPath>, ThoughtError> {
        sort_to_front(target, list, self.config.match_mode)
    }

    /// Run one operation to completion. On `Err` the session is unchanged.
    pub fn apply(&mut self, op: Op) -> Result<Vec<ThoughtEvent>, ThoughtError> {
        tracing::debug!("[Session::apply] {op}");
        let events = match op {
            Op::Create {
                value,
                context,
                rank,
            } => self.thoughts.create(&value, &context, rank)?,
            Op::Rename {
                context,
                old_value,
                new_value,
                rank,
            } => {
                let old_path = self.thoughts.locate(&context, &old_value, Some(rank));
                let mut events = self
                    .thoughts
                    .rename(&context, &old_value, &new_value, rank)?;
                if let Some(old_path) = old_path {
                    if let Some(renamed) = old_path.signifier() {
                        let new_path = old_path
                            .intersections()
                            .child(RankedThought::new(normalize_value(&new_value), renamed.rank));
                        events.extend(self.cursor.rebase(&old_path, &new_path));
                    }
                }
                events
            }
            Op::Delete(context) => {
                let target = self.thoughts.rank_path(&context);
                self.delete_following_cursor(target, |thoughts| thoughts.delete(&context))
            }
            Op::DeleteAt(path) => {
                let target = Some(path.clone());
                self.delete_following_cursor(target, |thoughts| thoughts.delete_at(&path))
            }
            Op::Move { from, to } => {
                let mut events = self.thoughts.move_thought(&from, &to)?;
                if !events.is_empty() {
                    events.extend(self.cursor.rebase(&from, &to));
                }
                events
            }
            Op::NewThought(payload) => self.new_thought(payload)?,
            Op::SetCursor(path) => self.cursor.set(path).into_iter().collect(),
            Op::ToggleContextView(context) => {
                let context = context.normalize();
                if !self.context_views.remove(&context) {
                    self.context_views.insert(context);
                }
                Vec::new()
            }
            Op::SetAttribute {
                context,
                key,
                value,
            } => self
                .thoughts
                .set_attribute(&context, &key, value.as_deref())?,
            Op::ToggleAttribute {
                context,
                key,
                value,
            } => self.thoughts.toggle_attribute(&context, &key, &value)?,
            Op::ImportText { context, text } => {
                outline::import_text(&mut self.thoughts, &context, &text)?
            }
            Op::Renormalize(context) => self.renormalize(&context),
            Op::Merge(snapshot) => {
                let mut events = self.thoughts.merge(snapshot)?;
                events.extend(self.cursor.retain_resolvable(&self.thoughts));
                events
            }
        };
        Ok(events)
    }

    /// Run a delete and, when it took the cursor's thought with it, move the cursor to the previous
    /// sibling, else the next sibling, else the parent.
    fn delete_following_cursor<F>(&mut self, target: Option<RankedPath>, delete: F) -> Vec<ThoughtEvent>
    where
        F: FnOnce(&mut ThoughtBase) -> Vec<ThoughtEvent>,
    {
        let target = target
            .map(|target| target.unroot())
            .filter(|target| !target.is_empty());
        let fallback = target
            .as_ref()
            .filter(|target| self.cursor.is_within(target))
            .map(|target| self.fallback_focus(target));
        let mut events = delete(&mut self.thoughts);
        if let Some(fallback) = fallback {
            if !events.is_empty() {
                events.extend(self.cursor.set(fallback));
            }
        }
        events
    }

    fn fallback_focus(&self, target: &RankedPath) -> Option<RankedPath> {
        let thought = target.signifier()?;
        let parent = target.intersections();
        let siblings = self.thoughts.children_of(to_context(&parent));
        let neighbor = siblings
            .iter()
            .position(|sibling| sibling == thought)
            .and_then(|idx| {
                idx.checked_sub(1)
                    .and_then(|prev| siblings.get(prev))
                    .or_else(|| siblings.get(idx + 1))
            });
        match neighbor {
            Some(neighbor) => Some(parent.child(neighbor.clone())),
            None => (!parent.is_empty()).then_some(parent),
        }
    }

    fn renormalize(&mut self, context: &Context) -> Vec<ThoughtEvent> {
        let parent = self.thoughts.rank_path(context);
        let before = self.thoughts.children_of(context);
        let mut events = self.thoughts.renormalize(context);
        if let Some(parent) = parent {
            for (old, new) in before.iter().zip(rank::renormalized(&before)) {
                if let Some(moved) = self
                    .cursor
                    .rebase(&parent.child(old.clone()), &parent.child(new))
                {
                    events.push(moved);
                    break;
                }
            }
        }
        events
    }

    fn allocate_rank(
        &self,
        context: &Context,
        reference: &RankedPath,
        subthought: bool,
        before: bool,
    ) -> Option<Rank> {
        if subthought {
            return Some(if before {
                self.thoughts.rank_at_start(context)
            } else {
                self.thoughts.rank_at_end(context)
            });
        }
        let sibling = reference.signifier()?;
        if before {
            self.thoughts.rank_before(context, sibling)
        } else {
            self.thoughts.rank_after(context, sibling)
        }
    }

    /// Insert a thought next to (or below) the reference thought and focus it.
    fn new_thought(&mut self, payload: NewThought) -> Result<Vec<ThoughtEvent>, ThoughtError> {
        let reference = payload
            .at
            .clone()
            .or_else(|| self.cursor.get().cloned())
            .map(|path| path.unroot())
            .unwrap_or_default();
        let subthought = payload.insert_new_subthought || reference.is_empty();
        let parent_path = if subthought {
            reference.clone()
        } else {
            reference.intersections()
        };
        let context = to_context(&parent_path).normalize();

        for attribute in [ATTR_READONLY, ATTR_UNEXTENDABLE] {
            if self.thoughts.has_child(&context, attribute) {
                return Err(ThoughtError::ReadOnly(format!(
                    "\"{}\" is {}. No subthoughts may be added.",
                    context.signifier().unwrap_or(ROOT_TOKEN),
                    attribute.trim_start_matches(META_PREFIX)
                )));
            }
        }

        self.thoughts.check_create(&payload.value, &context)?;
        if !subthought {
            let placed = reference.signifier().is_some_and(|sibling| {
                rank::position(&self.thoughts.children_of(&context), sibling).is_some()
            });
            if !placed {
                return Err(ThoughtError::NotFound(format!(
                    "{reference} is not a thought in {context}"
                )));
            }
        }

        let mut events = Vec::new();
        let rank = match self.allocate_rank(&context, &reference, subthought, payload.insert_before)
        {
            Some(rank) => rank,
            None => {
                tracing::debug!("[Session::new_thought] no free rank in {context}, renormalizing");
                events.extend(self.renormalize(&context));
                self.allocate_rank(&context, &reference, subthought, payload.insert_before)
                    .ok_or_else(|| {
                        ThoughtError::NotFound(format!("{reference} is not a thought in {context}"))
                    })?
            }
        };

        events.extend(self.thoughts.create(&payload.value, &context, rank)?);
        if !payload.prevent_set_cursor {
            let focus = parent_path.child(RankedThought::new(normalize_value(&payload.value), rank));
            events.extend(self.cursor.set(Some(focus)));
        }
        Ok(events)
    }
}
