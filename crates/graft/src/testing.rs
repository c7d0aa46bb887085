//! Shared fixtures for the test suite.

use std::sync::OnceLock;

use crate::{Language, Parser, Tree};

/// The JavaScript grammar, loaded once. Tests must share this instance:
/// handles and queries are only meaningful within one loaded language.
pub(crate) fn javascript() -> Language {
    static LANGUAGE: OnceLock<Language> = OnceLock::new();
    LANGUAGE
        .get_or_init(|| {
            Language::new(
                tree_sitter_javascript::LANGUAGE,
                tree_sitter_javascript::NODE_TYPES,
            )
            .expect("javascript grammar loads")
        })
        .clone()
}

pub(crate) fn parse(source: &str) -> Tree {
    let mut parser = Parser::new();
    parser.set_language(&javascript()).expect("compatible language");
    parser.parse(source, None).expect("parse completes")
}
