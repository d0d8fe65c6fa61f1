//! In-memory rule store

use super::{RuleRecord, RuleStore};
use crate::error::{Result, RuleEngineError};
use crate::rule::Node;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::sync::Arc;

/// Longest accepted rule name
pub const MAX_NAME_LENGTH: usize = 100;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.\- ]{1,100}$").expect("rule name pattern is valid")
});

/// Check a rule name before storing it
///
/// All-digit names are refused since such identifiers resolve as ids.
pub fn validate_rule_name(name: &str) -> Result<()> {
    if !NAME_PATTERN.is_match(name) {
        return Err(RuleEngineError::InvalidRequest(format!(
            "rule name must be 1-{} characters of letters, digits, '_', '-', '.' or space: {:?}",
            MAX_NAME_LENGTH, name
        )));
    }
    if name.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RuleEngineError::InvalidRequest(format!(
            "rule name must not be all digits: {:?}",
            name
        )));
    }
    Ok(())
}

#[derive(Default)]
struct Inner {
    by_id: AHashMap<u64, Arc<RuleRecord>>,
    by_name: AHashMap<String, u64>,
    next_id: u64,
}

/// Rule store kept in process memory
///
/// Ids start at 1 and are never reused.
#[derive(Default)]
pub struct MemoryRuleStore {
    inner: RwLock<Inner>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all stored rules, ordered by id
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut records: Vec<_> = inner.by_id.values().collect();
        records.sort_by_key(|record| record.id);
        records.into_iter().map(|record| record.name.clone()).collect()
    }
}

impl RuleStore for MemoryRuleStore {
    fn insert(&self, name: &str, rule_string: Option<&str>, tree: Node) -> Result<Arc<RuleRecord>> {
        validate_rule_name(name)?;

        let mut inner = self.inner.write();
        if inner.by_name.contains_key(name) {
            tracing::debug!(name, "rejected duplicate rule name");
            return Err(RuleEngineError::DuplicateName(name.to_string()));
        }

        inner.next_id += 1;
        let record = Arc::new(RuleRecord {
            id: inner.next_id,
            name: name.to_string(),
            rule_string: rule_string.map(str::to_string),
            tree,
        });
        inner.by_name.insert(record.name.clone(), record.id);
        inner.by_id.insert(record.id, Arc::clone(&record));

        tracing::debug!(id = record.id, name, "stored rule");
        Ok(record)
    }

    fn get_by_id(&self, id: u64) -> Option<Arc<RuleRecord>> {
        self.inner.read().by_id.get(&id).cloned()
    }

    fn get_by_name(&self, name: &str) -> Option<Arc<RuleRecord>> {
        let inner = self.inner.read();
        inner
            .by_name
            .get(name)
            .and_then(|id| inner.by_id.get(id))
            .cloned()
    }

    fn remove(&self, id: u64) -> Option<Arc<RuleRecord>> {
        let mut inner = self.inner.write();
        let record = inner.by_id.remove(&id)?;
        inner.by_name.remove(&record.name);
        tracing::debug!(id, name = %record.name, "removed rule");
        Some(record)
    }

    fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parse_rule;

    fn tree(rule: &str) -> Node {
        parse_rule(rule).unwrap()
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let store = MemoryRuleStore::new();
        let first = store.insert("first", Some("a > 1"), tree("a > 1")).unwrap();
        let second = store.insert("second", None, tree("b < 2")).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.rule_string.as_deref(), Some("a > 1"));
        assert!(second.rule_string.is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let store = MemoryRuleStore::new();
        store.insert("rule", None, tree("a > 1")).unwrap();

        let err = store.insert("rule", None, tree("a > 2")).unwrap_err();
        assert_eq!(err, RuleEngineError::DuplicateName("rule".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_rule_name("Senior sales.v2-final_1").is_ok());
        assert!(validate_rule_name("").is_err());
        assert!(validate_rule_name("bad/name").is_err());
        assert!(validate_rule_name("123").is_err());
        assert!(validate_rule_name(&"x".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_rule_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_find_by_id_or_name() {
        let store = MemoryRuleStore::new();
        let record = store.insert("seniors", None, tree("age > 60")).unwrap();

        assert_eq!(store.find("1"), Some(Arc::clone(&record)));
        assert_eq!(store.find("seniors"), Some(record));
        assert!(store.find("2").is_none());
        assert!(store.find("99999999999999999999999").is_none());
        assert!(store.find("juniors").is_none());
    }

    #[test]
    fn test_remove_frees_name_and_keeps_ids_monotonic() {
        let store = MemoryRuleStore::new();
        let record = store.insert("temp", None, tree("a > 1")).unwrap();

        assert_eq!(store.remove(record.id).map(|r| r.id), Some(1));
        assert!(store.is_empty());
        assert!(store.remove(record.id).is_none());
        assert!(store.get_by_name("temp").is_none());

        let again = store.insert("temp", None, tree("a > 1")).unwrap();
        assert_eq!(again.id, 2);
    }

    #[test]
    fn test_names_ordered_by_id() {
        let store = MemoryRuleStore::new();
        for name in ["c", "a", "b"] {
            store.insert(name, None, tree("x == 1")).unwrap();
        }
        assert_eq!(store.names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let store = MemoryRuleStore::new();
        let record = store.insert("r", Some("a > 1"), tree("a > 1")).unwrap();
        let json = serde_json::to_value(&*record).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["ruleName"], "r");
        assert_eq!(json["ruleString"], "a > 1");
        assert_eq!(json["tree"]["type"], "operand");
    }
}
