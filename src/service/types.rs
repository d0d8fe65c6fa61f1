//! Request and response shapes of the rule API
//!
//! Field names follow the JSON contract: `ruleName`, `ruleString`, `rules`,
//! `op`, `ast`, `data`, `result`, `tree`, `error`.

use crate::error::RuleEngineError;
use crate::rule::{Node, Value, WireNode};
use crate::store::RuleRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    pub rule_name: Option<String>,
    pub rule_string: Option<String>,
}

impl CreateRuleRequest {
    pub fn new(rule_name: impl Into<String>, rule_string: impl Into<String>) -> Self {
        Self {
            rule_name: Some(rule_name.into()),
            rule_string: Some(rule_string.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CombineRequest {
    /// Stored rule names or ids, or rule strings, in combine order
    #[serde(default)]
    pub rules: Vec<String>,
    pub op: Option<String>,
}

impl CombineRequest {
    pub fn new<I, T>(rules: I, op: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(Into::into).collect(),
            op: Some(op.into()),
        }
    }
}

/// Tree to evaluate: a serialized tree or a stored rule's name or id
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AstInput {
    Tree(WireNode),
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvaluateRequest {
    pub ast: AstInput,
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResponse {
    pub id: u64,
    pub rule_name: String,
    pub tree: Node,
}

impl From<&RuleRecord> for RuleResponse {
    fn from(record: &RuleRecord) -> Self {
        Self {
            id: record.id,
            rule_name: record.name.clone(),
            tree: record.tree.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluateResponse {
    pub result: bool,
    pub tree: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeResponse {
    pub tree: Node,
}

/// Error body; `status` is the HTTP status a server should answer with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip)]
    pub status: u16,
}

impl From<&RuleEngineError> for ErrorResponse {
    fn from(err: &RuleEngineError) -> Self {
        Self {
            error: err.to_string(),
            status: err.status_code(),
        }
    }
}
