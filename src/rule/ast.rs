//! Abstract Syntax Tree for rule expressions

use crate::rule::value::Value;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::CombineError;

/// Deepest tree the engine builds or accepts, counting a lone comparison as 1
///
/// Kept under serde_json's nesting limit so every tree can travel as JSON
/// inside a request body.
pub const MAX_TREE_DEPTH: usize = 100;

/// AST node for rule expressions
///
/// Every node owns its children, so a tree can never share a subtree with
/// another tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Single comparison like "age > 30"
    Operand(Condition),
    /// AND operation
    And(Box<Node>, Box<Node>),
    /// OR operation
    Or(Box<Node>, Box<Node>),
    /// NOT operation, child sits in the left slot
    Not(Box<Node>),
    /// Operator node decoded from outside input whose value is not a known
    /// boolean operator. Never produced by the parser or the combiner.
    Foreign {
        operator: String,
        left: Option<Box<Node>>,
        right: Option<Box<Node>>,
    },
}

/// Node type as seen by renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Operator,
    #[serde(alias = "condition")]
    Operand,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Operator => "operator",
            NodeType::Operand => "operand",
        }
    }
}

/// Single comparison `attribute comparator literal`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: String,
    pub comparator: Comparator,
    pub literal: Value,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.attribute,
            self.comparator,
            self.literal.to_literal()
        )
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// Greater than (>)
    Greater,
    /// Less than (<)
    Less,
    /// Greater than or equal (>=)
    GreaterEqual,
    /// Less than or equal (<=)
    LessEqual,
    /// Equal (== or =)
    Equal,
    /// Not equal (!=)
    NotEqual,
}

impl Comparator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Greater => ">",
            Comparator::Less => "<",
            Comparator::GreaterEqual => ">=",
            Comparator::LessEqual => "<=",
            Comparator::Equal => "==",
            Comparator::NotEqual => "!=",
        }
    }

    /// Whether the comparator needs an ordering rather than plain equality
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Comparator::Equal | Comparator::NotEqual)
    }

    /// Apply the comparator to the ordering of `actual` relative to the literal
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparator::Greater => ordering == Ordering::Greater,
            Comparator::Less => ordering == Ordering::Less,
            Comparator::GreaterEqual => ordering != Ordering::Less,
            Comparator::LessEqual => ordering != Ordering::Greater,
            Comparator::Equal => ordering == Ordering::Equal,
            Comparator::NotEqual => ordering != Ordering::Equal,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Boolean operator used to combine rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }

    /// Build a fresh operator node over two subtrees
    pub fn join(self, left: Node, right: Node) -> Node {
        match self {
            LogicalOp::And => Node::And(Box::new(left), Box::new(right)),
            LogicalOp::Or => Node::Or(Box::new(left), Box::new(right)),
        }
    }

    /// Whether `node` is an operator node of this kind
    pub fn matches(self, node: &Node) -> bool {
        matches!(
            (self, node),
            (LogicalOp::And, Node::And(..)) | (LogicalOp::Or, Node::Or(..))
        )
    }

    /// Take apart an operator node of this kind, handing back anything else
    pub fn split(self, node: Node) -> std::result::Result<(Box<Node>, Box<Node>), Node> {
        match (self, node) {
            (LogicalOp::And, Node::And(left, right)) | (LogicalOp::Or, Node::Or(left, right)) => {
                Ok((left, right))
            }
            (_, other) => Err(other),
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalOp {
    type Err = CombineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("AND") {
            Ok(LogicalOp::And)
        } else if s.eq_ignore_ascii_case("OR") {
            Ok(LogicalOp::Or)
        } else {
            Err(CombineError::UnsupportedOperator(s.to_string()))
        }
    }
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Operand(_) => NodeType::Operand,
            _ => NodeType::Operator,
        }
    }

    pub fn is_operand(&self) -> bool {
        matches!(self, Node::Operand(_))
    }

    /// The `value` string renderers display for this node
    pub fn value(&self) -> String {
        match self {
            Node::Operand(condition) => condition.to_string(),
            Node::And(..) => "AND".to_string(),
            Node::Or(..) => "OR".to_string(),
            Node::Not(_) => "NOT".to_string(),
            Node::Foreign { operator, .. } => operator.clone(),
        }
    }

    pub fn left(&self) -> Option<&Node> {
        match self {
            Node::Operand(_) => None,
            Node::And(left, _) | Node::Or(left, _) | Node::Not(left) => Some(left),
            Node::Foreign { left, .. } => left.as_deref(),
        }
    }

    pub fn right(&self) -> Option<&Node> {
        match self {
            Node::Operand(_) | Node::Not(_) => None,
            Node::And(_, right) | Node::Or(_, right) => Some(right),
            Node::Foreign { right, .. } => right.as_deref(),
        }
    }

    /// Depth-first, pre-order traversal yielding `(depth, node)` pairs with
    /// the root at depth 0 and children visited left before right
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }

    /// Number of levels in the tree; a single comparison has depth 1
    pub fn depth(&self) -> usize {
        self.walk().map(|(depth, _)| depth + 1).max().unwrap_or(1)
    }

    pub fn node_count(&self) -> usize {
        self.walk().count()
    }
}

impl fmt::Display for Node {
    /// Fully parenthesized rule string for the tree
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Operand(condition) => write!(f, "{}", condition),
            Node::And(left, right) => write!(f, "({} AND {})", left, right),
            Node::Or(left, right) => write!(f, "({} OR {})", left, right),
            Node::Not(inner) => write!(f, "NOT {}", inner),
            Node::Foreign {
                operator,
                left,
                right,
            } => {
                write!(f, "({}", operator)?;
                for child in [left, right].into_iter().flatten() {
                    write!(f, " {}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Serializes as `{type, value, left?, right?}`, omitting absent children
impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let left = self.left();
        let right = self.right();
        let len = 2 + usize::from(left.is_some()) + usize::from(right.is_some());

        let mut state = serializer.serialize_struct("Node", len)?;
        state.serialize_field("type", &self.node_type())?;
        state.serialize_field("value", &self.value())?;
        if let Some(left) = left {
            state.serialize_field("left", left)?;
        }
        if let Some(right) = right {
            state.serialize_field("right", right)?;
        }
        state.end()
    }
}

/// Iterator returned by [`Node::walk`]
pub struct Walk<'a> {
    stack: Vec<(usize, &'a Node)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        if let Some(right) = node.right() {
            self.stack.push((depth + 1, right));
        }
        if let Some(left) = node.left() {
            self.stack.push((depth + 1, left));
        }
        Some((depth, node))
    }
}
