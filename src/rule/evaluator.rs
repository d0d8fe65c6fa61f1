//! Rule evaluator

use crate::error::EvalError;
use crate::rule::ast::{Comparator, Condition, Node};
use crate::rule::value::{coerce, Value};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Attribute lookup used during evaluation
pub trait DataRecord {
    fn lookup(&self, attribute: &str) -> Option<&Value>;
}

impl<S: BuildHasher> DataRecord for HashMap<String, Value, S> {
    fn lookup(&self, attribute: &str) -> Option<&Value> {
        self.get(attribute)
    }
}

impl DataRecord for BTreeMap<String, Value> {
    fn lookup(&self, attribute: &str) -> Option<&Value> {
        self.get(attribute)
    }
}

/// Counters collected while evaluating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStats {
    pub nodes_visited: usize,
}

/// Evaluate a tree against a data record
pub fn evaluate<D: DataRecord + ?Sized>(root: &Node, data: &D) -> Result<bool, EvalError> {
    Evaluation::new(data).eval(root)
}

/// Evaluate a tree and report how many nodes were visited
pub fn evaluate_with_stats<D: DataRecord + ?Sized>(
    root: &Node,
    data: &D,
) -> Result<(bool, EvalStats), EvalError> {
    let mut evaluation = Evaluation::new(data);
    let verdict = evaluation.eval(root)?;
    Ok((verdict, evaluation.stats))
}

/// Compare a data value against a literal
///
/// `None` when the pair has no defined ordering for `comparator`.
pub fn compare(actual: &Value, comparator: Comparator, literal: &Value) -> Option<bool> {
    let coerced = coerce(actual, literal);
    match comparator {
        Comparator::Equal => Some(coerced.equal()),
        Comparator::NotEqual => Some(!coerced.equal()),
        _ => match coerced.ordering() {
            Some(ordering) => Some(comparator.holds(ordering)),
            // NaN against a number: ordered type, unordered value
            None if matches!(actual, Value::Number(_)) && matches!(literal, Value::Number(_)) => {
                Some(false)
            }
            None => None,
        },
    }
}

struct Evaluation<'a, D: ?Sized> {
    data: &'a D,
    stats: EvalStats,
}

impl<'a, D: DataRecord + ?Sized> Evaluation<'a, D> {
    fn new(data: &'a D) -> Self {
        Self {
            data,
            stats: EvalStats::default(),
        }
    }

    fn eval(&mut self, node: &Node) -> Result<bool, EvalError> {
        self.stats.nodes_visited += 1;
        match node {
            Node::Operand(condition) => self.check(condition),
            // `&&` and `||` skip the right subtree once the left decides
            Node::And(left, right) => Ok(self.eval(left)? && self.eval(right)?),
            Node::Or(left, right) => Ok(self.eval(left)? || self.eval(right)?),
            Node::Not(inner) => Ok(!self.eval(inner)?),
            Node::Foreign { operator, .. } => Err(EvalError::UnknownOperator {
                operator: operator.clone(),
            }),
        }
    }

    fn check(&self, condition: &Condition) -> Result<bool, EvalError> {
        let actual =
            self.data
                .lookup(&condition.attribute)
                .ok_or_else(|| EvalError::MissingAttribute {
                    attribute: condition.attribute.clone(),
                })?;

        compare(actual, condition.comparator, &condition.literal).ok_or_else(|| {
            EvalError::TypeMismatch {
                attribute: condition.attribute.clone(),
                comparator: condition.comparator.symbol(),
                actual: actual.type_name(),
                literal: condition.literal.type_name(),
            }
        })
    }
}
