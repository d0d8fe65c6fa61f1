//! Rule storage
//!
//! The engine only needs a place that assigns identities to trees and hands
//! them back by id or name. [`MemoryRuleStore`] keeps everything in process.

mod memory;

pub use memory::*;

use crate::error::Result;
use crate::rule::Node;
use serde::Serialize;
use std::sync::Arc;

/// A stored rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub id: u64,
    #[serde(rename = "ruleName")]
    pub name: String,
    /// Source rule string; `None` for combined rules
    pub rule_string: Option<String>,
    pub tree: Node,
}

/// Storage seam used by the service layer
pub trait RuleStore: Send + Sync {
    /// Store a new rule under a unique name and assign it an id
    fn insert(&self, name: &str, rule_string: Option<&str>, tree: Node) -> Result<Arc<RuleRecord>>;

    fn get_by_id(&self, id: u64) -> Option<Arc<RuleRecord>>;

    fn get_by_name(&self, name: &str) -> Option<Arc<RuleRecord>>;

    /// Remove a rule, returning it if it existed
    fn remove(&self, id: u64) -> Option<Arc<RuleRecord>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve an identifier: all digits means an id, anything else a name
    fn find(&self, identifier: &str) -> Option<Arc<RuleRecord>> {
        let identifier = identifier.trim();
        if !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit()) {
            identifier.parse().ok().and_then(|id| self.get_by_id(id))
        } else {
            self.get_by_name(identifier)
        }
    }
}
