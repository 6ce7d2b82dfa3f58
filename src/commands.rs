use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    paths::{Context, RankedPath},
    properties::{Rank, Thought},
};

/// Request to insert a new thought relative to the cursor (or an explicit path).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewThought {
    pub value: String,
    /// Reference thought. Falls back to the cursor, then to the root context.
    pub at: Option<RankedPath>,
    /// Insert as a child of the reference thought instead of as a sibling.
    pub insert_new_subthought: bool,
    /// Insert before the reference sibling (or as the first child).
    pub insert_before: bool,
    /// Leave the cursor where it is.
    pub prevent_set_cursor: bool,
}

impl NewThought {
    pub fn new<S: Into<String>>(value: S) -> Self {
        NewThought {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, path: RankedPath) -> Self {
        self.at = Some(path);
        self
    }

    pub fn subthought(mut self) -> Self {
        self.insert_new_subthought = true;
        self
    }

    pub fn before(mut self) -> Self {
        self.insert_before = true;
        self
    }
}

/// Command interface of a [crate::session::Session]. Every state change goes through one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Add `value` to `context` at `rank`.
    Create {
        value: String,
        context: Context,
        rank: Rank,
    },
    /// Change the text of one occurrence, identified by its context and rank.
    Rename {
        context: Context,
        old_value: String,
        new_value: String,
        rank: Rank,
    },
    /// Remove the thought a full context ends in, with its subtree.
    Delete(Context),
    /// Remove exactly the occurrence at a ranked path, with its subtree.
    DeleteAt(RankedPath),
    Move {
        from: RankedPath,
        to: RankedPath,
    },
    NewThought(NewThought),
    SetCursor(Option<RankedPath>),
    /// Show or hide the contexts of a context's signifier in place of its children.
    ToggleContextView(Context),
    SetAttribute {
        context: Context,
        key: String,
        value: Option<String>,
    },
    ToggleAttribute {
        context: Context,
        key: String,
        value: String,
    },
    /// Append an indented outline below a context.
    ImportText {
        context: Context,
        text: String,
    },
    Renormalize(Context),
    /// Reconcile with a full remote snapshot.
    Merge(Vec<Thought>),
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Op::Create {
                value,
                context,
                rank,
            } => write!(f, "Create({value} in {context} at {rank})"),
            Op::Rename {
                context,
                old_value,
                new_value,
                ..
            } => write!(f, "Rename({context}: {old_value} -> {new_value})"),
            Op::Delete(context) => write!(f, "Delete({context})"),
            Op::DeleteAt(path) => write!(f, "DeleteAt({path})"),
            Op::Move { from, to } => write!(f, "Move({from} -> {to})"),
            Op::NewThought(payload) => write!(
                f,
                "NewThought({}{}{})",
                payload.value,
                if payload.insert_new_subthought {
                    ", subthought"
                } else {
                    ""
                },
                if payload.insert_before { ", before" } else { "" }
            ),
            Op::SetCursor(Some(path)) => write!(f, "SetCursor({path})"),
            Op::SetCursor(None) => write!(f, "SetCursor(None)"),
            Op::ToggleContextView(context) => write!(f, "ToggleContextView({context})"),
            Op::SetAttribute {
                context,
                key,
                value,
            } => write!(
                f,
                "SetAttribute({context} {key}{})",
                value
                    .as_ref()
                    .map(|v| format!(" = {v}"))
                    .unwrap_or_default()
            ),
            Op::ToggleAttribute {
                context,
                key,
                value,
            } => write!(f, "ToggleAttribute({context} {key} = {value})"),
            Op::ImportText { context, text } => {
                write!(f, "ImportText({context}, {} lines)", text.lines().count())
            }
            Op::Renormalize(context) => write!(f, "Renormalize({context})"),
            Op::Merge(records) => write!(f, "Merge({} records)", records.len()),
        }
    }
}
