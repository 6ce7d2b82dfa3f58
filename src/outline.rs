//! Plain-text outline import and export.
//!
//! The text form is one bullet per thought, indented two spaces per level:
//!
//! ```text
//! - a
//!   - b
//!   - c
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    event::{coalesce, ThoughtEvent},
    paths::Context,
    properties::{normalize_value, ROOT_TOKEN},
    thoughtbase::ThoughtBase,
    ThoughtError,
};

const INDENT: &str = "  ";
const TAB_WIDTH: usize = 2;

/// Leading indentation, an optional bullet, then the value.
static OUTLINE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)(?:[-*+•](?:[ \t]+|$))?(?P<value>.*)$")
        .expect("outline line pattern is valid")
});

/// Render `context` and everything below it. The first line is the context's own value
/// (`root` for the root context).
pub fn export_text<C: Into<Context>>(thoughts: &ThoughtBase, context: C) -> String {
    let context = context.into().normalize();
    let mut lines = vec![format!("- {}", context.signifier().unwrap_or(ROOT_TOKEN))];
    export_children(thoughts, &context, 1, &mut lines);
    lines.join("\n")
}

fn export_children(thoughts: &ThoughtBase, context: &Context, depth: usize, lines: &mut Vec<String>) {
    for child in thoughts.children_of(context) {
        lines.push(format!("{}- {}", INDENT.repeat(depth), child.key));
        export_children(thoughts, &context.child(child.key), depth + 1, lines);
    }
}

/// Split an outline into `(indent width, value)` pairs, skipping blank lines.
pub fn parse_outline(text: &str) -> Vec<(usize, String)> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let captures = OUTLINE_LINE.captures(line)?;
            let indent = captures
                .name("indent")
                .map(|m| {
                    m.as_str()
                        .chars()
                        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
                        .sum()
                })
                .unwrap_or(0);
            let value = captures
                .name("value")
                .map(|m| m.as_str().trim_end().to_string())
                .unwrap_or_default();
            Some((indent, normalize_value(&value)))
        })
        .collect()
}

/// Append an outline below `context`. A line whose value already exists among its parent's
/// children is reused instead of duplicated. A `root` line stands for `context` itself, so an
/// export of the root context imports back onto the root.
pub fn import_text<C: Into<Context>>(
    thoughts: &mut ThoughtBase,
    context: C,
    text: &str,
) -> Result<Vec<ThoughtEvent>, ThoughtError> {
    let base = context.into().normalize();
    // Lines are applied to a copy so a bad line leaves `thoughts` untouched
    let mut staged = thoughts.clone();
    let mut stack: Vec<(usize, Context)> = Vec::new();
    let mut events = Vec::new();
    for (indent, value) in parse_outline(text) {
        while stack.last().is_some_and(|(level, _)| *level >= indent) {
            stack.pop();
        }
        let parent = stack
            .last()
            .map(|(_, context)| context.clone())
            .unwrap_or_else(|| base.clone());
        if value == ROOT_TOKEN {
            stack.push((indent, parent));
            continue;
        }
        if !staged.has_child(&parent, &value) {
            let rank = staged.rank_at_end(&parent);
            events.extend(staged.create(&value, &parent, rank)?);
        }
        stack.push((indent, parent.child(value)));
    }
    *thoughts = staged;
    tracing::debug!(
        "[outline::import_text] imported into {base}, {} records changed",
        events.len()
    );
    Ok(coalesce(events))
}
