//! Rule AST Core - rule expression engine
//!
//! Parses rule strings like `age > 30 AND department = 'Sales'` into ASTs,
//! combines them under AND/OR and evaluates them against data records.
//! Python bindings via PyO3.

use pyo3::prelude::*;

pub mod config;
pub mod error;
pub mod logging;
pub mod python;
pub mod rule;
pub mod service;
pub mod store;

use crate::config::EngineConfig;
use crate::python::{AstArg, RuleTree, Verdict};
use crate::rule::Value;
use crate::service::{CombineRequest, CreateRuleRequest, RuleService};
use crate::store::MemoryRuleStore;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Engine State
// ============================================================================

/// Global rule service
static ENGINE: OnceCell<Arc<RwLock<RuleService>>> = OnceCell::new();

// ============================================================================
// Helper Functions
// ============================================================================

fn engine() -> PyResult<Arc<RwLock<RuleService>>> {
    ENGINE
        .get()
        .cloned()
        .ok_or_else(|| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(
                "Engine not initialized. Call init_engine() first.",
            )
        })
}

/// Evaluate a tree argument against a record
fn run_evaluate(
    service: &RuleService,
    ast: AstArg,
    data: &HashMap<String, Value>,
) -> error::Result<Verdict> {
    match ast {
        AstArg::Tree(root) => {
            let result = rule::evaluate(&root, data)?;
            Ok(Verdict::new(result, root))
        }
        AstArg::Input(input) => {
            let response = service.evaluate_with(input, data)?;
            Ok(Verdict::new(response.result, Arc::new(response.tree)))
        }
    }
}

// ============================================================================
// Python Functions
// ============================================================================

/// Initialize the rule engine (call once at startup)
///
/// Calling it again replaces the settings and keeps stored rules.
///
/// # Arguments
/// * `config` - Optional dict or object with `flatten_policy`
///   ("disabled" | "homogeneous" | "balanced"), `parse_cache`,
///   `combined_name_prefix`, `combined_name_length`, `log_filter`
#[pyfunction]
#[pyo3(signature = (config=None))]
fn init_engine(config: Option<&Bound<'_, PyAny>>) -> PyResult<()> {
    let config = match config {
        Some(obj) if !obj.is_none() => config::deserialize_engine_config(obj)?,
        _ => EngineConfig::default(),
    };

    if let Some(filter) = config.log_filter.as_deref() {
        logging::init_logging(Some(filter));
    }

    // If already initialized, update the config
    if let Some(existing) = ENGINE.get() {
        existing.write().reconfigure(config);
    } else {
        let service = RuleService::new(MemoryRuleStore::new(), config);
        let _ = ENGINE.set(Arc::new(RwLock::new(service)));
    }

    tracing::info!("rule engine initialized");
    Ok(())
}

/// Check if the engine is initialized
#[pyfunction]
fn is_engine_initialized() -> bool {
    ENGINE.get().is_some()
}

/// Install the tracing subscriber
///
/// # Returns
/// False if logging was already set up
#[pyfunction]
#[pyo3(signature = (filter=None))]
fn init_logging(filter: Option<&str>) -> bool {
    logging::init_logging(filter)
}

/// Parse and store a named rule
///
/// # Returns
/// `{"id": int, "ruleName": str, "tree": dict}`
///
/// # Raises
/// ValueError on a malformed rule string or a taken name
#[pyfunction]
fn create_rule(py: Python<'_>, rule_name: String, rule_string: String) -> PyResult<Py<PyAny>> {
    let engine = engine()?;
    let response = py.detach(|| {
        engine
            .read()
            .create(CreateRuleRequest::new(rule_name, rule_string))
    })?;
    Ok(python::response_to_dict(py, &response)?.into())
}

/// Combine rules under AND or OR and store the result
///
/// # Arguments
/// * `rules` - Stored rule names or ids, or rule strings
/// * `op` - "AND" or "OR"
///
/// # Returns
/// `{"id": int, "ruleName": str, "tree": dict}`
#[pyfunction]
fn combine_rules(py: Python<'_>, rules: Vec<String>, op: String) -> PyResult<Py<PyAny>> {
    let engine = engine()?;
    let response = py.detach(|| engine.read().combine(CombineRequest::new(rules, op)))?;
    Ok(python::response_to_dict(py, &response)?.into())
}

/// Evaluate a rule against a data dict
///
/// # Arguments
/// * `ast` - A RuleTree, a tree dict, or a stored rule's name or id
/// * `data` - Attribute values (bool, int, float or str)
///
/// # Raises
/// KeyError for a missing attribute or unknown rule,
/// TypeError for an incomparable value or unknown operator
#[pyfunction]
fn evaluate_rule(
    py: Python<'_>,
    ast: &Bound<'_, PyAny>,
    data: &Bound<'_, PyAny>,
) -> PyResult<Verdict> {
    let engine = engine()?;
    let ast = python::extract_ast(ast)?;
    let record = python::extract_record(data)?;

    let verdict = py.detach(|| run_evaluate(&engine.read(), ast, &record))?;
    Ok(verdict)
}

/// Evaluate a rule asynchronously
///
/// Arguments are converted on the calling thread; evaluation runs on a
/// Tokio blocking thread so the asyncio event loop stays responsive.
///
/// # Example (Python)
/// ```python
/// verdict = await evaluate_rule_async("sales", {"department": "Sales", "age": 40})
/// print(verdict.result)
/// ```
#[pyfunction]
fn evaluate_rule_async<'py>(
    py: Python<'py>,
    ast: &Bound<'py, PyAny>,
    data: &Bound<'py, PyAny>,
) -> PyResult<Bound<'py, PyAny>> {
    let engine = engine()?;
    let ast = python::extract_ast(ast)?;
    let record = python::extract_record(data)?;

    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let verdict = tokio::task::spawn_blocking(move || {
            run_evaluate(&engine.read(), ast, &record).map_err(PyErr::from)
        })
        .await
        .map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                "Evaluation task panicked: {}",
                e
            ))
        })??;

        Ok(verdict)
    })
}

/// Tree of a stored rule, by id or name
#[pyfunction]
fn get_rule_tree(identifier: &str) -> PyResult<RuleTree> {
    let engine = engine()?;
    let response = engine.read().get_tree(identifier)?;
    Ok(RuleTree::new(response.tree))
}

/// Delete a stored rule, by id or name
///
/// # Returns
/// The deleted rule as `{"id", "ruleName", "tree"}`
#[pyfunction]
fn delete_rule(py: Python<'_>, identifier: &str) -> PyResult<Py<PyAny>> {
    let engine = engine()?;
    let response = engine.read().delete(identifier)?;
    Ok(python::response_to_dict(py, &response)?.into())
}

/// Parse a rule string without storing it
///
/// Works before `init_engine`; uses the engine's cache setting once it runs.
#[pyfunction]
fn parse_rule(rule: &str) -> PyResult<RuleTree> {
    let tree = match ENGINE.get() {
        Some(engine) => engine.read().parse(rule)?,
        None => rule::get_or_parse(rule)?,
    };
    Ok(RuleTree::new(tree))
}

/// Drop all cached parse results
#[pyfunction]
fn clear_parse_cache() {
    rule::clear_cache();
}

// ============================================================================
// Python Module Definition
// ============================================================================

/// Python module definition
#[pymodule]
fn rule_ast_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(init_engine, m)?)?;
    m.add_function(wrap_pyfunction!(is_engine_initialized, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    m.add_function(wrap_pyfunction!(create_rule, m)?)?;
    m.add_function(wrap_pyfunction!(combine_rules, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_rule, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_rule_async, m)?)?;
    m.add_function(wrap_pyfunction!(get_rule_tree, m)?)?;
    m.add_function(wrap_pyfunction!(delete_rule, m)?)?;
    m.add_function(wrap_pyfunction!(parse_rule, m)?)?;
    m.add_function(wrap_pyfunction!(clear_parse_cache, m)?)?;
    m.add_class::<RuleTree>()?;
    m.add_class::<Verdict>()?;
    Ok(())
}
