//! Rule parsing cache - keyed by the exact rule string

use crate::error::Result;
use crate::rule::ast::Node;
use crate::rule::parser;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Entries kept before the cache is emptied and refilled
pub const CACHE_CAPACITY: usize = 4096;

/// Global rule cache with fast hashing (ahash)
static RULE_CACHE: Lazy<RwLock<AHashMap<String, Node>>> =
    Lazy::new(|| RwLock::new(AHashMap::with_capacity(256)));

/// Get or parse a rule string, using cache for repeated rules
#[inline]
pub fn get_or_parse(rule: &str) -> Result<Node> {
    // Fast path: check read lock first
    {
        let cache = RULE_CACHE.read();
        if let Some(ast) = cache.get(rule) {
            return Ok(ast.clone());
        }
    }

    // Slow path: parse and cache; failures are not cached
    let ast = parser::parse_rule(rule)?;

    {
        let mut cache = RULE_CACHE.write();
        if cache.len() >= CACHE_CAPACITY {
            tracing::debug!(entries = cache.len(), "rule cache full, clearing");
            cache.clear();
        }
        cache.insert(rule.to_string(), ast.clone());
    }

    Ok(ast)
}

/// Clear the rule cache
pub fn clear_cache() {
    let mut cache = RULE_CACHE.write();
    cache.clear();
}

/// Number of cached rules
pub fn cache_size() -> usize {
    let cache = RULE_CACHE.read();
    cache.len()
}
