#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Host binding layer over the tree-sitter incremental parsing engine.
//!
//! The engine owns grammars, parsing, and structural query matching; this
//! crate owns everything between the engine and the caller:
//!
//! - **Node marshaling**: engine nodes cross the boundary as six-word records
//!   through a per-tree scratch channel and materialize as [`SyntaxNode`]
//!   wrappers, cached by identity so the same node always resolves to the
//!   same wrapper for the tree's lifetime.
//! - **Kind dispatch**: each [`Language`] carries a kind table built once
//!   from its node-types description; wrappers resolve field access through
//!   it (see [`graft_core`]).
//! - **Query predicates**: `(#eq? ...)`-style predicates embedded in pattern
//!   text are compiled into typed validators at [`Query`] construction and
//!   applied to every raw match before it reaches the caller.
//!
//! ```no_run
//! use graft::{Language, Parser, Query, QueryOptions};
//!
//! let language = Language::new(
//!     tree_sitter_javascript::LANGUAGE,
//!     tree_sitter_javascript::NODE_TYPES,
//! )?;
//! let mut parser = Parser::new();
//! parser.set_language(&language)?;
//!
//! let tree = parser.parse("function one() { two(); }", None).unwrap();
//! let query = Query::new(
//!     &language,
//!     r#"((call_expression function: (identifier) @callee) (#eq? @callee "two"))"#,
//! )?;
//! for m in query.matches(&tree.root_node(), &QueryOptions::new()) {
//!     println!("{}", m.captures[0].node.text());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cache;
mod channel;
mod error;
mod handle;
mod language;
mod native;
mod node;
mod parser;
mod point;
pub mod query;
mod tree;

#[cfg(test)]
mod channel_tests;
#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod parser_tests;

pub use error::{LanguageError, PredicateError, QueryError};
pub use language::Language;
pub use node::{FieldChildren, SyntaxNode};
pub use parser::Parser;
pub use point::{InputEdit, Point, Range};
pub use query::{Properties, Query, QueryCapture, QueryMatch, QueryOptions};
pub use tree::{TextBuffer, Tree};
