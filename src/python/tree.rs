//! RuleTree and Verdict - handles to trees held in Rust memory
//!
//! Python keeps a handle to the tree and pulls out dicts, JSON or a text
//! rendering only when asked.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyList;
use std::sync::Arc;

use super::{extract_record, node_to_dict};
use crate::error::RuleEngineError;
use crate::rule::{evaluate, render_tree, Node};

// ============================================================================
// RuleTree PyClass
// ============================================================================

/// Immutable rule tree
#[pyclass(frozen, module = "rule_ast_core")]
pub struct RuleTree {
    root: Arc<Node>,
}

impl RuleTree {
    pub fn new(root: Node) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn from_shared(root: Arc<Node>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn shared(&self) -> Arc<Node> {
        Arc::clone(&self.root)
    }
}

#[pymethods]
impl RuleTree {
    // ------------------------------------------------------------------------
    // Getter Properties
    // ------------------------------------------------------------------------

    /// "operator" or "operand"
    #[getter]
    fn node_type(&self) -> &'static str {
        self.root.node_type().as_str()
    }

    /// Operator name, or the comparison for an operand
    #[getter]
    fn value(&self) -> String {
        self.root.value()
    }

    #[getter]
    fn depth(&self) -> usize {
        self.root.depth()
    }

    #[getter]
    fn node_count(&self) -> usize {
        self.root.node_count()
    }

    #[getter]
    fn left(&self) -> Option<RuleTree> {
        self.root.left().map(|n| RuleTree::new(n.clone()))
    }

    #[getter]
    fn right(&self) -> Option<RuleTree> {
        self.root.right().map(|n| RuleTree::new(n.clone()))
    }

    // ------------------------------------------------------------------------
    // Conversions
    // ------------------------------------------------------------------------

    /// Nested dicts `{type, value, left?, right?}`
    fn to_dict(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        Ok(node_to_dict(py, &self.root)?.into())
    }

    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&*self.root).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Box-drawing rendering, one node per line
    fn render(&self) -> String {
        render_tree(&self.root)
    }

    /// Pre-order list of `(depth, type, value)` tuples, root at depth 0
    fn walk(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let list = PyList::empty(py);
        for (depth, node) in self.root.walk() {
            list.append((depth, node.node_type().as_str(), node.value()))?;
        }
        Ok(list.into())
    }

    /// Evaluate against a dict of attribute values
    ///
    /// # Raises
    /// KeyError for a missing attribute, TypeError for an incomparable value
    fn evaluate(&self, data: &Bound<'_, PyAny>) -> PyResult<bool> {
        let record = extract_record(data)?;
        evaluate(&self.root, &record)
            .map_err(RuleEngineError::from)
            .map_err(PyErr::from)
    }

    fn __str__(&self) -> String {
        self.root.to_string()
    }

    fn __repr__(&self) -> String {
        format!("RuleTree({})", self.root)
    }

    fn __eq__(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

// ============================================================================
// Verdict PyClass
// ============================================================================

/// Evaluation result with the evaluated tree echoed back
#[pyclass(frozen, module = "rule_ast_core")]
pub struct Verdict {
    result: bool,
    tree: Arc<Node>,
}

impl Verdict {
    pub fn new(result: bool, tree: Arc<Node>) -> Self {
        Self { result, tree }
    }
}

#[pymethods]
impl Verdict {
    #[getter]
    fn result(&self) -> bool {
        self.result
    }

    #[getter]
    fn tree(&self) -> RuleTree {
        RuleTree::from_shared(Arc::clone(&self.tree))
    }

    /// `{result, tree}`
    fn to_dict(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let dict = pyo3::types::PyDict::new(py);
        dict.set_item("result", self.result)?;
        dict.set_item("tree", node_to_dict(py, &self.tree)?)?;
        Ok(dict.into())
    }

    fn __bool__(&self) -> bool {
        self.result
    }

    fn __repr__(&self) -> String {
        format!("Verdict(result={}, tree={})", self.result, self.tree)
    }
}
