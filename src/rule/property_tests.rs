//! Property tests for rule module
//!
//! Parsing determinism, evaluation against a reference interpreter,
//! wire round trips and combine equivalence across flatten policies.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::rule::cache::get_or_parse;
use crate::rule::combiner::{Combiner, FlattenPolicy};
use crate::rule::evaluator::evaluate;
use crate::rule::parser::parse_rule;
use crate::rule::wire::WireNode;
use crate::rule::{LogicalOp, Node, Value};

// ═══════════════════════════════════════════════════════════════════════════
// Reference expressions
// ═══════════════════════════════════════════════════════════════════════════

const ATTRIBUTES: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Clone)]
enum Expr {
    Cmp(&'static str, &'static str, i32),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Fully parenthesized rule string
    fn render(&self) -> String {
        match self {
            Expr::Cmp(attr, op, value) => format!("{} {} {}", attr, op, value),
            Expr::And(l, r) => format!("({} AND {})", l.render(), r.render()),
            Expr::Or(l, r) => format!("({} OR {})", l.render(), r.render()),
            Expr::Not(inner) => format!("NOT ({})", inner.render()),
        }
    }

    fn reference(&self, data: &HashMap<&'static str, i32>) -> bool {
        match self {
            Expr::Cmp(attr, op, value) => {
                let actual = data[attr];
                match *op {
                    ">" => actual > *value,
                    "<" => actual < *value,
                    ">=" => actual >= *value,
                    "<=" => actual <= *value,
                    "==" | "=" => actual == *value,
                    "!=" => actual != *value,
                    other => panic!("unknown comparator {}", other),
                }
            }
            Expr::And(l, r) => l.reference(data) && r.reference(data),
            Expr::Or(l, r) => l.reference(data) || r.reference(data),
            Expr::Not(inner) => !inner.reference(data),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Strategy generators for property tests
// ═══════════════════════════════════════════════════════════════════════════

fn attribute_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(ATTRIBUTES.to_vec())
}

fn comparator_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(">"),
        Just("<"),
        Just(">="),
        Just("<="),
        Just("=="),
        Just("="),
        Just("!="),
    ]
}

fn leaf_strategy() -> impl Strategy<Value = Expr> {
    (attribute_strategy(), comparator_strategy(), -5..=5i32)
        .prop_map(|(attr, op, value)| Expr::Cmp(attr, op, value))
}

fn expr_strategy() -> impl Strategy<Value = Expr> {
    leaf_strategy().prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::And(Box::new(l), Box::new(r))),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Expr::Or(Box::new(l), Box::new(r))),
            inner.prop_map(|e| Expr::Not(Box::new(e))),
        ]
    })
}

fn data_strategy() -> impl Strategy<Value = HashMap<&'static str, i32>> {
    prop::collection::vec(-6..=6i32, ATTRIBUTES.len())
        .prop_map(|values| ATTRIBUTES.iter().copied().zip(values).collect())
}

fn op_strategy() -> impl Strategy<Value = LogicalOp> {
    prop_oneof![Just(LogicalOp::And), Just(LogicalOp::Or)]
}

fn to_record(data: &HashMap<&'static str, i32>) -> HashMap<String, Value> {
    data.iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Property Tests
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    /// Parsing the same rule twice yields the same tree
    #[test]
    fn prop_parse_is_deterministic(expr in expr_strategy()) {
        let rule = expr.render();
        let first = parse_rule(&rule).unwrap();
        let second = parse_rule(&rule).unwrap();
        prop_assert_eq!(&first, &second);

        let json_first = serde_json::to_string(&first).unwrap();
        let json_second = serde_json::to_string(&second).unwrap();
        prop_assert_eq!(json_first, json_second);
    }

    /// Re-parsing the rendered tree gives the tree back
    #[test]
    fn prop_display_reparses(expr in expr_strategy()) {
        let ast = parse_rule(&expr.render()).unwrap();
        let reparsed = parse_rule(&ast.to_string()).unwrap();
        prop_assert_eq!(ast, reparsed);
    }

    /// The evaluator agrees with a direct interpretation of the expression
    #[test]
    fn prop_evaluation_matches_reference(
        expr in expr_strategy(),
        data in data_strategy()
    ) {
        let ast = parse_rule(&expr.render()).unwrap();
        let result = evaluate(&ast, &to_record(&data)).unwrap();
        prop_assert_eq!(result, expr.reference(&data), "Rule: {}", expr.render());
    }

    /// Wire encoding decodes back to the same tree
    #[test]
    fn prop_wire_round_trip(expr in expr_strategy()) {
        let ast = parse_rule(&expr.render()).unwrap();
        let json = serde_json::to_string(&ast).unwrap();
        let decoded = Node::try_from(WireNode::from_json(&json).unwrap()).unwrap();
        prop_assert_eq!(ast, decoded);
    }

    /// Every flatten policy evaluates like the plain left fold
    #[test]
    fn prop_combine_policies_agree(
        exprs in prop::collection::vec(expr_strategy(), 1..=6),
        op in op_strategy(),
        data in data_strategy()
    ) {
        let trees: Vec<Node> = exprs.iter().map(|e| parse_rule(&e.render()).unwrap()).collect();
        let record = to_record(&data);

        let expected = exprs.iter().fold(None, |acc: Option<bool>, e| {
            let value = e.reference(&data);
            Some(match (acc, op) {
                (None, _) => value,
                (Some(acc), LogicalOp::And) => acc && value,
                (Some(acc), LogicalOp::Or) => acc || value,
            })
        });

        for policy in [FlattenPolicy::Disabled, FlattenPolicy::Homogeneous, FlattenPolicy::Balanced] {
            let combined = Combiner::new(policy).combine(&trees, op).unwrap();
            prop_assert_eq!(
                Some(evaluate(&combined, &record).unwrap()),
                expected,
                "policy {:?}", policy
            );
        }
    }

    /// Combining comparisons equals parsing them joined with the operator
    #[test]
    fn prop_combine_matches_joined_parse(
        leaves in prop::collection::vec(leaf_strategy(), 1..=8),
        op in op_strategy()
    ) {
        let trees: Vec<Node> = leaves.iter().map(|e| parse_rule(&e.render()).unwrap()).collect();
        let joined = leaves
            .iter()
            .map(Expr::render)
            .collect::<Vec<_>>()
            .join(&format!(" {} ", op));

        let combined = Combiner::new(FlattenPolicy::Homogeneous).combine(&trees, op).unwrap();
        prop_assert_eq!(combined, parse_rule(&joined).unwrap());
    }

    /// Balanced combining has logarithmic depth
    #[test]
    fn prop_balanced_depth(count in 1..=64usize, op in op_strategy()) {
        let trees: Vec<Node> = (0..count)
            .map(|i| parse_rule(&format!("a > {}", i)).unwrap())
            .collect();
        let combined = Combiner::new(FlattenPolicy::Balanced).combine(&trees, op).unwrap();

        let expected_depth = (count as f64).log2().ceil() as usize + 1;
        prop_assert_eq!(combined.depth(), expected_depth);
        prop_assert_eq!(combined.node_count(), 2 * count - 1);
    }

    /// Cache should return same results as direct parsing
    #[test]
    fn prop_cache_consistency(expr in expr_strategy()) {
        let rule = expr.render();
        let direct = parse_rule(&rule).unwrap();
        let cached_first = get_or_parse(&rule).unwrap();
        let cached_second = get_or_parse(&rule).unwrap();

        prop_assert_eq!(&direct, &cached_first);
        prop_assert_eq!(cached_first, cached_second);
    }
}
