//! Error types for language loading and query construction.
//!
//! Resource limits (match-limit overruns, timeouts) are deliberately not
//! errors: they surface as a queryable flag or an absent result. Identity
//! violations (a wrapper outliving its tree, a node handed to a foreign tree)
//! are programmer errors and panic at the call that detects them.

use thiserror::Error;

/// Failure to assemble a [`Language`](crate::Language) from an engine grammar
/// and its node-types description.
#[derive(Debug, Error)]
pub enum LanguageError {
    /// The engine rejected the grammar (ABI version mismatch).
    #[error("failed to load language: {0}")]
    Engine(#[from] tree_sitter::LanguageError),
    /// The node-types description did not deserialize.
    #[error("invalid node-types data: {0}")]
    NodeTypes(#[from] serde_json::Error),
}

/// Failure to construct a [`Query`](crate::Query).
#[derive(Debug, Error)]
pub enum QueryError {
    /// Structural pattern error reported by the engine.
    #[error("query error at row {row}: {message}")]
    Pattern { row: usize, message: String },
    /// Malformed predicate, rejected at construction time.
    #[error(transparent)]
    Predicate(#[from] PredicateError),
}

impl From<tree_sitter::QueryError> for QueryError {
    fn from(err: tree_sitter::QueryError) -> Self {
        QueryError::Pattern {
            row: err.row,
            message: err.message,
        }
    }
}

/// A predicate that failed validation during query compilation.
///
/// Messages name the operator and the expected vs actual argument shape, so a
/// broken query points straight at the offending form.
#[derive(Debug, Error)]
pub enum PredicateError {
    #[error("predicates must begin with a literal operator name")]
    MissingOperator,

    #[error("unknown query predicate `#{operator}`")]
    UnknownOperator { operator: String },

    #[error("wrong number of arguments to `#{operator}`: expected {expected}, got {got}")]
    Arity {
        operator: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("{position} argument of `#{operator}` must be {expected}, got {got}")]
    ArgumentKind {
        operator: &'static str,
        position: &'static str,
        expected: &'static str,
        got: String,
    },

    #[error("arguments to `#{operator}` must be literal strings")]
    LiteralArguments { operator: &'static str },

    #[error("invalid regex in `#{operator}` predicate: {message}")]
    Regex {
        operator: &'static str,
        message: String,
    },

    /// Scanner-level failure inside a `(#...)` form.
    #[error("malformed predicate: {message}")]
    Malformed { message: String },
}
