//! ThoughtBase module: the thought store, its context index and the views derived from them.
//!
//! # Module Organization
//!
//! - [`graph`]: Occurrence arena (ThoughtGraph, ThoughtNode) backing every context lookup
//! - [`base`]: ThoughtBase with queries and the Create/Rename/Delete/Move mutations
//! - [`views`]: Render-time derivations (context view, sortToFront)
//! - `attributes`: `=`-prefixed meta-thoughts such as `=readonly`
//!
//! ```rust
//! use thoughtbase::thoughtbase::ThoughtBase;
//!
//! let mut thoughts = ThoughtBase::default();
//! thoughts.create("a", ["root"], 0.0).unwrap();
//! thoughts.create("b", ["root"], 1.0).unwrap();
//! let keys: Vec<String> = thoughts.children_of(["root"]).into_iter().map(|c| c.key).collect();
//! assert_eq!(keys, vec!["a", "b"]);
//! ```

mod attributes;
mod base;
mod graph;
mod views;

#[cfg(test)]
mod tests;

pub use base::ThoughtBase;
pub use graph::{ThoughtGraph, ThoughtNode};
pub use views::{sort_to_front, MatchMode};
