//! Serialized tree shape exchanged with renderers and clients
//!
//! `{type: "operator"|"operand", value: string, left?: Node, right?: Node}`

use crate::error::{RuleEngineError, Result};
use crate::rule::ast::{Node, NodeType, MAX_TREE_DEPTH};
use crate::rule::parser::parse_condition;
use serde::{Deserialize, Serialize};

/// A node as it appears on the wire, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<WireNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<WireNode>>,
}

impl WireNode {
    pub fn operand(value: impl Into<String>) -> Self {
        Self {
            node_type: NodeType::Operand,
            value: value.into(),
            left: None,
            right: None,
        }
    }

    pub fn operator(
        value: impl Into<String>,
        left: Option<WireNode>,
        right: Option<WireNode>,
    ) -> Self {
        Self {
            node_type: NodeType::Operator,
            value: value.into(),
            left: left.map(Box::new),
            right: right.map(Box::new),
        }
    }

    /// Parse a JSON document into a wire node
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RuleEngineError::MalformedTree(e.to_string()))
    }
}

impl From<&Node> for WireNode {
    fn from(node: &Node) -> Self {
        WireNode {
            node_type: node.node_type(),
            value: node.value(),
            left: node.left().map(|n| Box::new(WireNode::from(n))),
            right: node.right().map(|n| Box::new(WireNode::from(n))),
        }
    }
}

impl TryFrom<WireNode> for Node {
    type Error = RuleEngineError;

    fn try_from(wire: WireNode) -> Result<Self> {
        decode(wire, 1)
    }
}

fn malformed(message: impl Into<String>) -> RuleEngineError {
    RuleEngineError::MalformedTree(message.into())
}

fn decode_child(child: Option<Box<WireNode>>, depth: usize) -> Result<Option<Box<Node>>> {
    child
        .map(|c| decode(*c, depth + 1).map(Box::new))
        .transpose()
}

fn decode(wire: WireNode, depth: usize) -> Result<Node> {
    if depth > MAX_TREE_DEPTH {
        return Err(malformed(format!("tree deeper than {} levels", MAX_TREE_DEPTH)));
    }

    match wire.node_type {
        NodeType::Operand => {
            if wire.left.is_some() || wire.right.is_some() {
                return Err(malformed(format!(
                    "operand '{}' cannot have children",
                    wire.value
                )));
            }
            Ok(Node::Operand(parse_condition(&wire.value)?))
        }
        NodeType::Operator => {
            let operator = wire.value.trim().to_ascii_uppercase();
            let left = decode_child(wire.left, depth)?;
            let right = decode_child(wire.right, depth)?;

            match (operator.as_str(), left, right) {
                ("AND", Some(left), Some(right)) => Ok(Node::And(left, right)),
                ("OR", Some(left), Some(right)) => Ok(Node::Or(left, right)),
                ("AND" | "OR", _, _) => Err(malformed(format!(
                    "{} requires both left and right children",
                    operator
                ))),
                ("NOT", Some(inner), None) => Ok(Node::Not(inner)),
                ("NOT", _, _) => Err(malformed("NOT requires exactly one child under left")),
                (_, left, right) => Ok(Node::Foreign {
                    operator: wire.value,
                    left,
                    right,
                }),
            }
        }
    }
}
