//! Engine configuration
//!
//! Loaded from a Python dict (or any object with matching attributes) or
//! from JSON. Every field has a default, so an empty config is valid.

use crate::error::{Result, RuleEngineError};
use crate::rule::FlattenPolicy;
use crate::store::{validate_rule_name, MAX_NAME_LENGTH};
use pyo3::types::{PyAnyMethods, PyDict, PyDictMethods};
use pyo3::Bound;
use serde::Deserialize;

pub const DEFAULT_COMBINED_PREFIX: &str = "combined";
pub const DEFAULT_COMBINED_SUFFIX_LENGTH: usize = 4;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rewrite applied after combining
    pub flatten_policy: FlattenPolicy,
    /// Memoize parsed rule strings
    pub parse_cache: bool,
    /// Name prefix for combined rules
    pub combined_name_prefix: String,
    /// Number of random letters appended to the prefix
    pub combined_name_length: usize,
    /// Tracing filter installed by `init_engine`; `None` leaves logging alone
    pub log_filter: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flatten_policy: FlattenPolicy::default(),
            parse_cache: true,
            combined_name_prefix: DEFAULT_COMBINED_PREFIX.to_string(),
            combined_name_length: DEFAULT_COMBINED_SUFFIX_LENGTH,
            log_filter: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| RuleEngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Combined rule names must themselves be valid rule names
    pub fn validate(&self) -> Result<()> {
        if self.combined_name_length == 0 {
            return Err(RuleEngineError::Config(
                "combined_name_length must be at least 1".to_string(),
            ));
        }
        let longest = self.combined_name_prefix.len() + self.combined_name_length;
        if longest > MAX_NAME_LENGTH {
            return Err(RuleEngineError::Config(format!(
                "combined rule names would be {} characters, limit is {}",
                longest, MAX_NAME_LENGTH
            )));
        }
        // sample with letters so an empty or all-digit prefix still checks
        let sample = format!(
            "{}{}",
            self.combined_name_prefix,
            "x".repeat(self.combined_name_length)
        );
        validate_rule_name(&sample).map_err(|e| {
            RuleEngineError::Config(format!("invalid combined_name_prefix: {}", e))
        })
    }
}

/// Helper to get optional attribute from either dict or object
fn get_attr_opt<'py>(obj: &Bound<'py, pyo3::PyAny>, name: &str) -> Option<Bound<'py, pyo3::PyAny>> {
    let value = if let Ok(dict) = obj.downcast::<PyDict>() {
        dict.get_item(name).ok().flatten()
    } else {
        obj.getattr(name).ok()
    };
    value.filter(|v| !v.is_none())
}

/// Deserialize engine config from a Python dict or object
/// Expected keys: flatten_policy, parse_cache, combined_name_prefix,
/// combined_name_length, log_filter (all optional)
pub fn deserialize_engine_config(obj: &Bound<'_, pyo3::PyAny>) -> pyo3::PyResult<EngineConfig> {
    let defaults = EngineConfig::default();

    let flatten_policy = match get_attr_opt(obj, "flatten_policy") {
        Some(value) => {
            let name: String = value.extract()?;
            name.parse::<FlattenPolicy>()
                .map_err(pyo3::exceptions::PyValueError::new_err)?
        }
        None => defaults.flatten_policy,
    };

    let config = EngineConfig {
        flatten_policy,
        parse_cache: get_attr_opt(obj, "parse_cache")
            .map(|v| v.extract())
            .transpose()?
            .unwrap_or(defaults.parse_cache),
        combined_name_prefix: get_attr_opt(obj, "combined_name_prefix")
            .map(|v| v.extract())
            .transpose()?
            .unwrap_or(defaults.combined_name_prefix),
        combined_name_length: get_attr_opt(obj, "combined_name_length")
            .map(|v| v.extract())
            .transpose()?
            .unwrap_or(defaults.combined_name_length),
        log_filter: get_attr_opt(obj, "log_filter")
            .map(|v| v.extract())
            .transpose()?,
    };

    config.validate()?;
    Ok(config)
}
