//! Predicate evaluation.
//!
//! Pure functions over one match's resolved captures. The zero-capture rules
//! are part of the contract: an `all` equality over no captures is vacuously
//! true while an `any` is false, but the match and any-of families short out
//! to the negated polarity when nothing was captured. Quantified patterns
//! depend on these exact rules.

use super::predicate::{EqOperand, Polarity, PredicateSpec, Quantifier};

/// One capture of a match with its text already resolved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedCapture<'a> {
    pub(crate) name: &'a str,
    pub(crate) text: &'a str,
}

/// A match survives iff every predicate of its pattern passes.
pub(crate) fn passes(specs: &[PredicateSpec], captures: &[ResolvedCapture<'_>]) -> bool {
    specs.iter().all(|spec| evaluate(spec, captures))
}

pub(crate) fn evaluate(spec: &PredicateSpec, captures: &[ResolvedCapture<'_>]) -> bool {
    match spec {
        PredicateSpec::TextEq {
            capture,
            operand: EqOperand::Capture(other),
            quantifier,
            polarity,
        } => {
            let left = texts(captures, capture);
            let right = texts(captures, other);
            let positive = *polarity == Polarity::Positive;
            let pair_holds = |l: &&str| right.iter().any(|r| (l == r) == positive);
            match quantifier {
                Quantifier::All => left.iter().all(pair_holds),
                Quantifier::Any => left.iter().any(pair_holds),
            }
        }

        PredicateSpec::TextEq {
            capture,
            operand: EqOperand::Literal(value),
            quantifier,
            polarity,
        } => {
            let positive = *polarity == Polarity::Positive;
            let holds = |t: &&str| (*t == value.as_str()) == positive;
            let texts = texts(captures, capture);
            match quantifier {
                Quantifier::All => texts.iter().all(holds),
                Quantifier::Any => texts.iter().any(holds),
            }
        }

        PredicateSpec::TextMatch {
            capture,
            regex,
            quantifier,
            polarity,
        } => {
            let positive = *polarity == Polarity::Positive;
            let texts = texts(captures, capture);
            if texts.is_empty() {
                return !positive;
            }
            let holds = |t: &&str| regex.is_match(*t) == positive;
            match quantifier {
                Quantifier::All => texts.iter().all(holds),
                Quantifier::Any => texts.iter().any(holds),
            }
        }

        PredicateSpec::AnyOf {
            capture,
            values,
            polarity,
        } => {
            let positive = *polarity == Polarity::Positive;
            let texts = texts(captures, capture);
            if texts.is_empty() {
                return !positive;
            }
            texts
                .iter()
                .all(|t| values.iter().any(|v| v == t))
                == positive
        }
    }
}

/// Texts of the captures bound to `name`, in capture order.
fn texts<'a>(captures: &[ResolvedCapture<'a>], name: &str) -> Vec<&'a str> {
    captures
        .iter()
        .filter(|c| c.name == name)
        .map(|c| c.text)
        .collect()
}
