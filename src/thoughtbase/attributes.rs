//! Meta-thought attributes.
//!
//! An attribute is a child of a context whose value starts with `=` (for example `=readonly`). Its
//! own children hold the attribute's value, if it has one.

use crate::{
    event::ThoughtEvent,
    paths::Context,
    properties::{is_meta, normalize_value, META_PREFIX},
    ThoughtError,
};

use super::{base::normalize_context, ThoughtBase};

impl ThoughtBase {
    pub fn is_attribute_set<C: Into<Context>>(&self, context: C, key: &str) -> bool {
        self.has_child(context, key)
    }

    /// The first child of the attribute, if the attribute is present and has one.
    pub fn attribute<C: Into<Context>>(&self, context: C, key: &str) -> Option<String> {
        let context = normalize_context(&context.into());
        self.children_of(context.child(normalize_value(key)))
            .into_iter()
            .next()
            .map(|child| child.key)
    }

    pub fn attribute_equals<C: Into<Context>>(&self, context: C, key: &str, value: &str) -> bool {
        self.attribute(context, key).as_deref() == Some(normalize_value(value).as_str())
    }

    /// Add attribute `key` to `context` at its start, replacing any existing value with `value`.
    pub fn set_attribute<C: Into<Context>>(
        &mut self,
        context: C,
        key: &str,
        value: Option<&str>,
    ) -> Result<Vec<ThoughtEvent>, ThoughtError> {
        if !is_meta(key) {
            return Err(ThoughtError::Command(format!(
                "Attribute keys start with '{META_PREFIX}', got '{key}'"
            )));
        }
        let context = normalize_context(&context.into());
        let key = normalize_value(key);
        let value = value.map(normalize_value);
        let attribute_context = context.child(key.clone());
        self.check_create(&key, &context)?;
        if let Some(value) = value.as_deref() {
            self.check_create(value, &attribute_context)?;
        }

        let mut events = Vec::new();
        if !self.has_child(&context, &key) {
            let rank = self.rank_at_start(&context);
            events.extend(self.create(&key, &context, rank)?);
        }
        let Some(value) = value else {
            return Ok(events);
        };
        let current = self.children_of(&attribute_context);
        if current.len() == 1 && current[0].key == value {
            return Ok(events);
        }
        for stale in current {
            if let Some(path) = self.locate(&attribute_context, &stale.key, Some(stale.rank)) {
                events.extend(self.delete_at(&path));
            }
        }
        events.extend(self.create(&value, &attribute_context, 0.0)?);
        tracing::debug!("[ThoughtBase::set_attribute] {context} {key} = {value}");
        Ok(events)
    }

    /// Remove the attribute if it currently equals `value`, otherwise set it to `value`.
    pub fn toggle_attribute<C: Into<Context>>(
        &mut self,
        context: C,
        key: &str,
        value: &str,
    ) -> Result<Vec<ThoughtEvent>, ThoughtError> {
        let context = normalize_context(&context.into());
        if self.attribute_equals(&context, key, value) {
            Ok(self.delete(context.child(normalize_value(key))))
        } else {
            self.set_attribute(&context, key, Some(value))
        }
    }
}
