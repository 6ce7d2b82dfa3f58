use std::{fmt, io, string::FromUtf8Error};

use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use tokio::sync::{mpsc::error::SendError as TokioSendError, oneshot::error::RecvError};

use crate::event::ThoughtEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ThoughtError {
    /// A sortToFront-style lookup found no candidate matching the sought context.
    #[error("No match for context {sought} among candidates [{}]", .candidates.join(", "))]
    AmbiguousMatch {
        sought: String,
        candidates: Vec<String>,
    },
    #[error("Invalid Command: {0}")]
    Command(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("{0}")]
    ReadOnly(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Thought service error: {0}")]
    Service(String),
}

impl ThoughtError {
    /// Fatal errors signal the store would become inconsistent if the caller carried on. Everything
    /// else is recoverable by retrying with different input.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ThoughtError::InvariantViolation(_) | ThoughtError::AmbiguousMatch { .. }
        )
    }
}

impl From<toml::de::Error> for ThoughtError {
    fn from(src: toml::de::Error) -> ThoughtError {
        ThoughtError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for ThoughtError {
    fn from(src: toml::ser::Error) -> ThoughtError {
        ThoughtError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for ThoughtError {
    fn from(src: JsonError) -> ThoughtError {
        ThoughtError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<FromUtf8Error> for ThoughtError {
    fn from(src: FromUtf8Error) -> ThoughtError {
        ThoughtError::Serialization(format!("Invalid UTF-8: {src}"))
    }
}

impl From<io::Error> for ThoughtError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => ThoughtError::NotFound(format!("{x}")),
            _ => ThoughtError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for ThoughtError {
    fn from(x: fmt::Error) -> Self {
        ThoughtError::Serialization(format!("{x}"))
    }
}

impl From<RegexError> for ThoughtError {
    fn from(x: RegexError) -> Self {
        ThoughtError::Serialization(format!("Regex parse failed: {x}"))
    }
}

impl From<TokioSendError<ThoughtEvent>> for ThoughtError {
    fn from(x: TokioSendError<ThoughtEvent>) -> Self {
        ThoughtError::Io(format!(
            "Channel update send Error, could not transmit thought event {:?}",
            x.0
        ))
    }
}

impl From<RecvError> for ThoughtError {
    fn from(x: RecvError) -> Self {
        ThoughtError::Service(format!("Reply channel closed before a response arrived: {x}"))
    }
}
