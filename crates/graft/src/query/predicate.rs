//! Predicate compilation.
//!
//! Raw step streams become a closed set of typed predicate specs, one variant
//! per operator family, with the quantifier and polarity read off a literal
//! operator table. All validation happens here, at query construction;
//! evaluation never revisits it. Property-recording operators (`set!`, `is?`,
//! `is-not?`) compile into the per-pattern property maps instead of specs —
//! they annotate matches and never reject one.

use std::sync::Arc;

use indexmap::IndexMap;
use regex_automata::meta::Regex;

use crate::error::PredicateError;

use super::scan::PredicateStep;

/// String properties declared on a pattern, in declaration order.
pub type Properties = IndexMap<String, Option<String>>;

/// Whether a predicate must hold for every relevant capture pair or one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quantifier {
    All,
    Any,
}

/// Positive or negated test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Polarity {
    Positive,
    Negative,
}

/// Right-hand side of a text-equality predicate.
#[derive(Debug, Clone)]
pub(crate) enum EqOperand {
    Capture(String),
    Literal(String),
}

/// One compiled filtering predicate.
#[derive(Debug, Clone)]
pub(crate) enum PredicateSpec {
    TextEq {
        capture: String,
        operand: EqOperand,
        quantifier: Quantifier,
        polarity: Polarity,
    },
    TextMatch {
        capture: String,
        regex: Arc<Regex>,
        quantifier: Quantifier,
        polarity: Polarity,
    },
    AnyOf {
        capture: String,
        values: Vec<String>,
        polarity: Polarity,
    },
}

/// Everything compiled for one pattern index.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledPattern {
    pub(crate) predicates: Vec<PredicateSpec>,
    pub(crate) set_properties: Option<Arc<Properties>>,
    pub(crate) asserted_properties: Option<Arc<Properties>>,
    pub(crate) refuted_properties: Option<Arc<Properties>>,
}

#[derive(Debug, Clone, Copy)]
enum Family {
    Eq,
    Match,
    AnyOf,
    Set,
    Is,
    IsNot,
}

/// The full operator vocabulary. Quantifier and polarity are spelled by the
/// `any-` and `not-` prefixes; everything else is rejected.
const OPERATORS: &[(&str, Family, Quantifier, Polarity)] = &[
    ("eq?", Family::Eq, Quantifier::All, Polarity::Positive),
    ("not-eq?", Family::Eq, Quantifier::All, Polarity::Negative),
    ("any-eq?", Family::Eq, Quantifier::Any, Polarity::Positive),
    ("any-not-eq?", Family::Eq, Quantifier::Any, Polarity::Negative),
    ("match?", Family::Match, Quantifier::All, Polarity::Positive),
    ("not-match?", Family::Match, Quantifier::All, Polarity::Negative),
    ("any-match?", Family::Match, Quantifier::Any, Polarity::Positive),
    (
        "any-not-match?",
        Family::Match,
        Quantifier::Any,
        Polarity::Negative,
    ),
    ("any-of?", Family::AnyOf, Quantifier::All, Polarity::Positive),
    (
        "not-any-of?",
        Family::AnyOf,
        Quantifier::All,
        Polarity::Negative,
    ),
    ("set!", Family::Set, Quantifier::All, Polarity::Positive),
    ("is?", Family::Is, Quantifier::All, Polarity::Positive),
    ("is-not?", Family::IsNot, Quantifier::All, Polarity::Positive),
];

/// Compile every stream of one pattern form.
pub(crate) fn compile(streams: &[Vec<PredicateStep>]) -> Result<CompiledPattern, PredicateError> {
    let mut compiled = CompiledPattern::default();

    for steps in streams {
        match compile_stream(steps)? {
            Step::Filter(spec) => compiled.predicates.push(spec),
            Step::SetProperty(key, value) => {
                record(&mut compiled.set_properties, key, value);
            }
            Step::AssertProperty(key, value) => {
                record(&mut compiled.asserted_properties, key, value);
            }
            Step::RefuteProperty(key, value) => {
                record(&mut compiled.refuted_properties, key, value);
            }
        }
    }

    Ok(compiled)
}

fn record(slot: &mut Option<Arc<Properties>>, key: String, value: Option<String>) {
    Arc::make_mut(slot.get_or_insert_with(Default::default)).insert(key, value);
}

enum Step {
    Filter(PredicateSpec),
    SetProperty(String, Option<String>),
    AssertProperty(String, Option<String>),
    RefuteProperty(String, Option<String>),
}

fn compile_stream(steps: &[PredicateStep]) -> Result<Step, PredicateError> {
    let Some(PredicateStep::Literal(name)) = steps.first() else {
        return Err(PredicateError::MissingOperator);
    };

    let Some(&(operator, family, quantifier, polarity)) =
        OPERATORS.iter().find(|(op, ..)| *op == name.as_str())
    else {
        return Err(PredicateError::UnknownOperator {
            operator: name.clone(),
        });
    };

    let args = &steps[1..];
    match family {
        Family::Eq => {
            if args.len() != 2 {
                return Err(arity(operator, "2", args.len()));
            }
            let capture = expect_capture(operator, "first", &args[0])?;
            let operand = match &args[1] {
                PredicateStep::Capture(name) => EqOperand::Capture(name.clone()),
                PredicateStep::Literal(value) => EqOperand::Literal(value.clone()),
            };
            Ok(Step::Filter(PredicateSpec::TextEq {
                capture,
                operand,
                quantifier,
                polarity,
            }))
        }

        Family::Match => {
            if args.len() != 2 {
                return Err(arity(operator, "2", args.len()));
            }
            let capture = expect_capture(operator, "first", &args[0])?;
            let pattern = expect_literal(operator, "second", &args[1])?;
            let regex = Regex::new(&pattern).map_err(|err| PredicateError::Regex {
                operator,
                message: err.to_string(),
            })?;
            Ok(Step::Filter(PredicateSpec::TextMatch {
                capture,
                regex: Arc::new(regex),
                quantifier,
                polarity,
            }))
        }

        Family::AnyOf => {
            if args.is_empty() {
                return Err(arity(operator, "at least 1", 0));
            }
            let capture = expect_capture(operator, "first", &args[0])?;
            let values = args[1..]
                .iter()
                .map(|step| match step {
                    PredicateStep::Literal(value) => Ok(value.clone()),
                    PredicateStep::Capture(_) => {
                        Err(PredicateError::LiteralArguments { operator })
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Step::Filter(PredicateSpec::AnyOf {
                capture,
                values,
                polarity,
            }))
        }

        Family::Set | Family::Is | Family::IsNot => {
            if args.is_empty() || args.len() > 2 {
                return Err(arity(operator, "1 or 2", args.len()));
            }
            let mut literals = args.iter().map(|step| match step {
                PredicateStep::Literal(value) => Ok(value.clone()),
                PredicateStep::Capture(_) => Err(PredicateError::LiteralArguments { operator }),
            });
            let key = literals.next().unwrap()?;
            let value = literals.next().transpose()?;

            Ok(match family {
                Family::Set => Step::SetProperty(key, value),
                Family::Is => Step::AssertProperty(key, value),
                _ => Step::RefuteProperty(key, value),
            })
        }
    }
}

fn arity(operator: &'static str, expected: &'static str, got: usize) -> PredicateError {
    PredicateError::Arity {
        operator,
        expected,
        got,
    }
}

fn expect_capture(
    operator: &'static str,
    position: &'static str,
    step: &PredicateStep,
) -> Result<String, PredicateError> {
    match step {
        PredicateStep::Capture(name) => Ok(name.clone()),
        PredicateStep::Literal(value) => Err(PredicateError::ArgumentKind {
            operator,
            position,
            expected: "a capture",
            got: format!("\"{value}\""),
        }),
    }
}

fn expect_literal(
    operator: &'static str,
    position: &'static str,
    step: &PredicateStep,
) -> Result<String, PredicateError> {
    match step {
        PredicateStep::Literal(value) => Ok(value.clone()),
        PredicateStep::Capture(name) => Err(PredicateError::ArgumentKind {
            operator,
            position,
            expected: "a literal string",
            got: format!("@{name}"),
        }),
    }
}
