//! Combining rule trees under a single boolean operator
//!
//! Combining is a plain left fold of deep copies. The flattening rewrite
//! runs as a separate pass over the folded tree and is chosen by
//! [`FlattenPolicy`], so tree shape can be tested apart from evaluation.

use crate::error::CombineError;
use crate::rule::ast::{LogicalOp, Node, MAX_TREE_DEPTH};
use serde::Deserialize;
use smallvec::SmallVec;
use std::borrow::Borrow;
use std::str::FromStr;

/// Rewrite applied after folding the inputs together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlattenPolicy {
    /// Keep the left fold as is
    Disabled,
    /// Splice same-operator chains into one left-deep chain
    #[default]
    Homogeneous,
    /// Splice same-operator chains into a balanced tree
    Balanced,
}

impl FromStr for FlattenPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "none" => Ok(FlattenPolicy::Disabled),
            "homogeneous" => Ok(FlattenPolicy::Homogeneous),
            "balanced" => Ok(FlattenPolicy::Balanced),
            other => Err(format!("unknown flatten policy '{}'", other)),
        }
    }
}

/// Combines trees with a configurable flattening policy
#[derive(Debug, Clone, Copy, Default)]
pub struct Combiner {
    policy: FlattenPolicy,
}

impl Combiner {
    pub fn new(policy: FlattenPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FlattenPolicy {
        self.policy
    }

    /// Merge `trees` into one tree under `op`
    ///
    /// The inputs are only read; the result owns fresh copies of them.
    /// Fails without building anything when the result would be deeper than
    /// [`MAX_TREE_DEPTH`].
    pub fn combine<T: Borrow<Node>>(&self, trees: &[T], op: LogicalOp) -> Result<Node, CombineError> {
        let (first, rest) = trees.split_first().ok_or(CombineError::EmptyInput)?;

        let flatten = !rest.is_empty() && is_homogeneous(trees, op);
        let depth = self.combined_depth(trees, op, flatten);
        if depth > MAX_TREE_DEPTH {
            return Err(CombineError::TooDeep {
                depth,
                limit: MAX_TREE_DEPTH,
            });
        }

        let folded = rest
            .iter()
            .fold(first.borrow().clone(), |acc, tree| op.join(acc, tree.borrow().clone()));

        if !flatten {
            return Ok(folded);
        }

        Ok(match self.policy {
            FlattenPolicy::Disabled => folded,
            FlattenPolicy::Homogeneous => rechain(folded, op),
            FlattenPolicy::Balanced => rebalance(folded, op),
        })
    }

    /// Depth of the tree `combine` would build
    fn combined_depth<T: Borrow<Node>>(&self, trees: &[T], op: LogicalOp, flatten: bool) -> usize {
        let depths: Vec<usize> = match (flatten, self.policy) {
            (true, FlattenPolicy::Homogeneous | FlattenPolicy::Balanced) => {
                let mut depths = Vec::new();
                for tree in trees {
                    operand_depths(tree.borrow(), op, &mut depths);
                }
                depths
            }
            _ => trees.iter().map(|tree| tree.borrow().depth()).collect(),
        };

        match (flatten, self.policy) {
            (true, FlattenPolicy::Balanced) => balanced_depth(&depths),
            _ => chain_depth(&depths),
        }
    }
}

/// Combine with the default policy
pub fn combine<T: Borrow<Node>>(trees: &[T], op: LogicalOp) -> Result<Node, CombineError> {
    Combiner::default().combine(trees, op)
}

/// Every root is either a comparison or an `op` node
fn is_homogeneous<T: Borrow<Node>>(trees: &[T], op: LogicalOp) -> bool {
    trees.iter().all(|tree| {
        let tree = tree.borrow();
        tree.is_operand() || op.matches(tree)
    })
}

/// Depths of the operands of the `op` chain rooted at `root`, leftmost first
fn operand_depths(root: &Node, op: LogicalOp, out: &mut Vec<usize>) {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        match (op.matches(node), node.left(), node.right()) {
            (true, Some(left), Some(right)) => {
                pending.push(right);
                pending.push(left);
            }
            _ => out.push(node.depth()),
        }
    }
}

/// Depth of a left-deep chain over operands of the given depths
fn chain_depth(depths: &[usize]) -> usize {
    depths
        .iter()
        .copied()
        .reduce(|acc, depth| acc.max(depth) + 1)
        .unwrap_or(0)
}

/// Depth of the tree `build_balanced` makes over operands of the given depths
fn balanced_depth(depths: &[usize]) -> usize {
    match depths {
        [] => 0,
        [depth] => *depth,
        _ => {
            let (left, right) = depths.split_at(depths.len() / 2);
            balanced_depth(left).max(balanced_depth(right)) + 1
        }
    }
}

/// Operands of the `op` chain rooted at `root`, leftmost first
fn collect_operands(root: Node, op: LogicalOp) -> (Node, SmallVec<[Node; 8]>) {
    let mut pending: Vec<Node> = Vec::new();
    let mut current = root;

    let head = loop {
        match op.split(current) {
            Ok((left, right)) => {
                pending.push(*right);
                current = *left;
            }
            Err(leftmost) => break leftmost,
        }
    };

    let mut rest = SmallVec::new();
    while let Some(node) = pending.pop() {
        match op.split(node) {
            Ok((left, right)) => {
                pending.push(*right);
                pending.push(*left);
            }
            Err(operand) => rest.push(operand),
        }
    }

    (head, rest)
}

/// Rewrite the `op` chain at the root into a single left-deep chain,
/// the shape the parser gives `a op b op c ...`
pub fn rechain(node: Node, op: LogicalOp) -> Node {
    let (head, rest) = collect_operands(node, op);
    rest.into_iter().fold(head, |acc, operand| op.join(acc, operand))
}

/// Rewrite the `op` chain at the root into a balanced tree of minimal depth
pub fn rebalance(node: Node, op: LogicalOp) -> Node {
    let (head, rest) = collect_operands(node, op);
    build_balanced(head, rest.into_vec(), op)
}

/// Balanced tree over `[head, rest..]` in order
fn build_balanced(head: Node, mut rest: Vec<Node>, op: LogicalOp) -> Node {
    if rest.is_empty() {
        return head;
    }

    let total = rest.len() + 1;
    let mut right_half = rest.split_off(total / 2 - 1);
    let right_head = right_half.remove(0);

    let left = build_balanced(head, rest, op);
    let right = build_balanced(right_head, right_half, op);
    op.join(left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parser::parse_rule;

    fn rules(sources: &[&str]) -> Vec<Node> {
        sources.iter().map(|s| parse_rule(s).unwrap()).collect()
    }

    #[test]
    fn test_empty_input_fails() {
        let empty: Vec<Node> = Vec::new();
        assert_eq!(
            combine(&empty, LogicalOp::And),
            Err(CombineError::EmptyInput)
        );
    }

    #[test]
    fn test_single_input_is_copied() {
        let trees = rules(&["a > 1 OR b > 2"]);
        let combined = combine(&trees, LogicalOp::And).unwrap();
        assert_eq!(combined, trees[0]);
    }

    #[test]
    fn test_left_fold_matches_parse() {
        let trees = rules(&["a > 1", "b < 2", "c == 3"]);
        let combined = combine(&trees, LogicalOp::And).unwrap();
        assert_eq!(combined, parse_rule("a > 1 AND b < 2 AND c == 3").unwrap());
    }

    #[test]
    fn test_homogeneous_chains_are_spliced() {
        let trees = rules(&["a > 1 AND b > 2", "c > 3 AND d > 4"]);

        let flattened = Combiner::new(FlattenPolicy::Homogeneous)
            .combine(&trees, LogicalOp::And)
            .unwrap();
        assert_eq!(
            flattened,
            parse_rule("a > 1 AND b > 2 AND c > 3 AND d > 4").unwrap()
        );

        let plain = Combiner::new(FlattenPolicy::Disabled)
            .combine(&trees, LogicalOp::And)
            .unwrap();
        assert_eq!(
            plain,
            parse_rule("(a > 1 AND b > 2) AND (c > 3 AND d > 4)").unwrap()
        );
        assert_ne!(plain, flattened);
    }

    #[test]
    fn test_mixed_roots_are_not_flattened() {
        let trees = rules(&["a > 1 OR b > 2", "c > 3 AND d > 4"]);
        for policy in [
            FlattenPolicy::Disabled,
            FlattenPolicy::Homogeneous,
            FlattenPolicy::Balanced,
        ] {
            let combined = Combiner::new(policy)
                .combine(&trees, LogicalOp::And)
                .unwrap();
            assert_eq!(
                combined,
                parse_rule("(a > 1 OR b > 2) AND (c > 3 AND d > 4)").unwrap(),
                "policy {:?}",
                policy
            );
        }
    }

    #[test]
    fn test_opposite_operator_subtrees_stay_intact() {
        let trees = rules(&["a > 1 AND (b > 2 OR c > 3)", "d > 4"]);
        let combined = combine(&trees, LogicalOp::And).unwrap();
        assert_eq!(
            combined,
            parse_rule("a > 1 AND (b > 2 OR c > 3) AND d > 4").unwrap()
        );
    }

    #[test]
    fn test_balanced_policy_minimizes_depth() {
        let trees = rules(&["a > 1", "b > 1", "c > 1", "d > 1", "e > 1", "f > 1", "g > 1", "h > 1"]);

        let balanced = Combiner::new(FlattenPolicy::Balanced)
            .combine(&trees, LogicalOp::Or)
            .unwrap();
        assert_eq!(balanced.depth(), 4);
        assert_eq!(
            balanced,
            parse_rule("((a > 1 OR b > 1) OR (c > 1 OR d > 1)) OR ((e > 1 OR f > 1) OR (g > 1 OR h > 1))")
                .unwrap()
        );

        let chained = combine(&trees, LogicalOp::Or).unwrap();
        assert_eq!(chained.depth(), 8);
    }

    #[test]
    fn test_balanced_odd_count_keeps_order() {
        let trees = rules(&["a > 1", "b > 1", "c > 1"]);
        let balanced = Combiner::new(FlattenPolicy::Balanced)
            .combine(&trees, LogicalOp::And)
            .unwrap();
        assert_eq!(balanced, parse_rule("a > 1 AND (b > 1 AND c > 1)").unwrap());
    }

    #[test]
    fn test_sources_remain_untouched() {
        let trees = rules(&["a > 1 AND b > 2", "c > 3"]);
        let snapshot = trees.clone();
        let _ = combine(&trees, LogicalOp::And).unwrap();
        assert_eq!(trees, snapshot);
    }

    #[test]
    fn test_combine_borrowed_trees() {
        let a = parse_rule("a > 1").unwrap();
        let b = parse_rule("b > 1").unwrap();
        let combined = combine(&[&a, &b], LogicalOp::Or).unwrap();
        assert_eq!(combined, parse_rule("a > 1 OR b > 1").unwrap());
    }

    #[test]
    fn test_rechain_right_nested() {
        let tree = parse_rule("a > 1 AND (b > 1 AND (c > 1 AND d > 1))").unwrap();
        assert_eq!(
            rechain(tree, LogicalOp::And),
            parse_rule("a > 1 AND b > 1 AND c > 1 AND d > 1").unwrap()
        );
    }

    fn leaves(count: usize) -> Vec<Node> {
        (0..count)
            .map(|i| parse_rule(&format!("a > {}", i)).unwrap())
            .collect()
    }

    #[test]
    fn test_depth_limit_per_policy() {
        let trees = leaves(MAX_TREE_DEPTH);
        for policy in [FlattenPolicy::Disabled, FlattenPolicy::Homogeneous] {
            let combined = Combiner::new(policy).combine(&trees, LogicalOp::And).unwrap();
            assert_eq!(combined.depth(), MAX_TREE_DEPTH);
        }

        let trees = leaves(MAX_TREE_DEPTH + 1);
        for policy in [FlattenPolicy::Disabled, FlattenPolicy::Homogeneous] {
            assert_eq!(
                Combiner::new(policy).combine(&trees, LogicalOp::And),
                Err(CombineError::TooDeep {
                    depth: MAX_TREE_DEPTH + 1,
                    limit: MAX_TREE_DEPTH
                }),
                "policy {:?}",
                policy
            );
        }

        // balanced trees of thousands of rules stay shallow
        let trees = leaves(5000);
        let balanced = Combiner::new(FlattenPolicy::Balanced)
            .combine(&trees, LogicalOp::Or)
            .unwrap();
        assert_eq!(balanced.depth(), 14);
        assert!(combine(&trees, LogicalOp::Or).is_err());
    }

    #[test]
    fn test_spliced_chains_count_against_the_limit() {
        // two chains of 60 stay at 61 levels when folded but reach 120 spliced
        let half = MAX_TREE_DEPTH * 3 / 5;
        let chain = |attr: &str| {
            let rule = (0..half)
                .map(|i| format!("{} > {}", attr, i))
                .collect::<Vec<_>>()
                .join(" AND ");
            parse_rule(&rule).unwrap()
        };
        let trees = vec![chain("a"), chain("b")];

        let plain = Combiner::new(FlattenPolicy::Disabled)
            .combine(&trees, LogicalOp::And)
            .unwrap();
        assert_eq!(plain.depth(), half + 1);

        assert!(matches!(
            Combiner::new(FlattenPolicy::Homogeneous).combine(&trees, LogicalOp::And),
            Err(CombineError::TooDeep { depth, .. }) if depth == 2 * half
        ));

        let balanced = Combiner::new(FlattenPolicy::Balanced)
            .combine(&trees, LogicalOp::And)
            .unwrap();
        assert_eq!(balanced.depth(), 8);
    }

    #[test]
    fn test_predicted_depth_matches_built_tree() {
        let trees = rules(&[
            "a > 1 AND (b > 2 OR c > 3)",
            "d > 4",
            "e > 5 AND f > 6 AND g > 7",
            "h > 8",
        ]);
        for policy in [
            FlattenPolicy::Disabled,
            FlattenPolicy::Homogeneous,
            FlattenPolicy::Balanced,
        ] {
            let combiner = Combiner::new(policy);
            for op in [LogicalOp::And, LogicalOp::Or] {
                let flatten = is_homogeneous(&trees, op);
                let combined = combiner.combine(&trees, op).unwrap();
                assert_eq!(
                    combiner.combined_depth(&trees, op, flatten),
                    combined.depth(),
                    "policy {:?} op {:?}",
                    policy,
                    op
                );
            }
        }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Balanced".parse(), Ok(FlattenPolicy::Balanced));
        assert_eq!("none".parse(), Ok(FlattenPolicy::Disabled));
        assert!("zigzag".parse::<FlattenPolicy>().is_err());
    }
}
