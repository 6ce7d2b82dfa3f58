//! # thoughtbase
//!
//! The data core of an outliner in which every thought is identified by its text and may appear in
//! many contexts at once.
//!
//! ## Overview
//!
//! A thought such as "Rust" can live under `Languages` and under `Projects / 2024` at the same
//! time; both places show the same thought, and the record for "Rust" lists every context it
//! occurs in. Contexts are sequences of ancestor values (`["Projects", "2024"]`), siblings are
//! ordered by float ranks, and a focused occurrence is addressed by a ranked path
//! (`[Projects@0, 2024@3.5, Rust@1]`) so duplicate siblings stay distinguishable.
//!
//! ### Key Features
//!
//! - **Occurrence graph**: thoughts are stored as an arena of occurrences with stable ids, so a
//!   rename touches one node, while the value-keyed records exchanged with storage stay intact
//! - **Mutations as effects**: Create, Rename, Delete and Move return [`event::ThoughtEvent`]s
//!   describing which records an outer driver has to write; they never perform I/O
//! - **Context view**: list every context a value occurs in as if those were its children
//! - **Last-write-wins sync**: merge full remote snapshots record by record
//!
//! ## Architecture
//!
//! - **[`thoughtbase`]**: `ThoughtBase` store, context index, mutations, derived views
//! - **[`paths`]**: `Context` and `RankedPath` utilities
//! - **[`rank`]**: fractional rank allocation
//! - **[`session`]**: `Session` reducer owning the store, cursor, and view toggles
//! - **[`persist`]**: persistence adapters and the debounced `SyncQueue`
//! - **[`service`]**: tokio task serializing every operation on one session
//! - **[`nav`]**, **[`outline`]**: location encoding and plain-text outlines
//!
//! ## Quick Start
//!
//! ```rust
//! use thoughtbase::{commands::Op, paths::Context, session::Session};
//!
//! let mut session = Session::default();
//! session.apply(Op::Create { value: "a".into(), context: Context::root(), rank: 0.0 })?;
//! session.apply(Op::Create { value: "b".into(), context: Context::from(["a"]), rank: 0.0 })?;
//! session.apply(Op::Rename {
//!     context: Context::root(),
//!     old_value: "a".into(),
//!     new_value: "a2".into(),
//!     rank: 0.0,
//! })?;
//! assert_eq!(session.thoughts().children_of(["a2"])[0].key, "b");
//! # Ok::<(), thoughtbase::ThoughtError>(())
//! ```
//!
//! ## Features
//!
//! - **default**: the library
//! - **bin**: the `thoughts` command line tool over a JSON record file

pub mod commands;
pub mod config;
pub mod cursor;
pub mod error;
pub mod event;
pub mod nav;
pub mod outline;
pub mod paths;
pub mod persist;
pub mod properties;
pub mod rank;
pub mod service;
pub mod session;
#[cfg(test)]
mod tests;
pub mod thoughtbase;

pub use error::*;
