//! Python boundary - conversions between Python objects and engine types

mod tree;

pub use tree::*;

use crate::error::RuleEngineError;
use crate::rule::{Node, NodeType, Value, WireNode, MAX_TREE_DEPTH};
use crate::service::{AstInput, RuleResponse};
use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyString};
use std::collections::HashMap;
use std::sync::Arc;

/// Tree argument of `evaluate_rule`
pub enum AstArg {
    /// An already decoded `RuleTree`
    Tree(Arc<Node>),
    /// A tree dict or a stored rule's name or id
    Input(AstInput),
}

/// Convert a tree into nested dicts `{type, value, left?, right?}`
pub fn node_to_dict<'py>(py: Python<'py>, node: &Node) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("type", node.node_type().as_str())?;
    dict.set_item("value", node.value())?;
    if let Some(left) = node.left() {
        dict.set_item("left", node_to_dict(py, left)?)?;
    }
    if let Some(right) = node.right() {
        dict.set_item("right", node_to_dict(py, right)?)?;
    }
    Ok(dict)
}

/// `{id, ruleName, tree}`
pub fn response_to_dict<'py>(py: Python<'py>, response: &RuleResponse) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("id", response.id)?;
    dict.set_item("ruleName", &response.rule_name)?;
    dict.set_item("tree", node_to_dict(py, &response.tree)?)?;
    Ok(dict)
}

/// Data value from a Python bool, int, float or str
pub fn extract_value(obj: &Bound<'_, PyAny>) -> PyResult<Value> {
    // bool is a subclass of int, check it first
    if obj.is_instance_of::<PyBool>() {
        return Ok(Value::Boolean(obj.extract()?));
    }
    if obj.is_instance_of::<PyInt>() {
        // ints past i64 become plain floats
        return match obj.extract::<i64>() {
            Ok(n) => Ok(Value::from(n)),
            Err(_) => Ok(Value::Number(obj.extract()?)),
        };
    }
    if obj.is_instance_of::<PyFloat>() {
        return Ok(Value::Number(obj.extract()?));
    }
    if obj.is_instance_of::<PyString>() {
        return Ok(Value::String(obj.extract()?));
    }
    Err(PyTypeError::new_err(format!(
        "data values must be bool, int, float or str, got {}",
        obj.get_type().name()?
    )))
}

/// Data record from a Python dict
pub fn extract_record(obj: &Bound<'_, PyAny>) -> PyResult<HashMap<String, Value>> {
    let dict = obj.downcast::<PyDict>()?;
    let mut record = HashMap::with_capacity(dict.len());
    for (key, value) in dict.iter() {
        let key: String = key.extract()?;
        let value = extract_value(&value)?;
        record.insert(key, value);
    }
    Ok(record)
}

/// Wire node from nested dicts shaped like `node_to_dict` output
pub fn extract_wire_node(obj: &Bound<'_, PyAny>) -> PyResult<WireNode> {
    extract_wire_node_at(obj, 1)
}

fn extract_wire_node_at(obj: &Bound<'_, PyAny>, depth: usize) -> PyResult<WireNode> {
    if depth > MAX_TREE_DEPTH {
        return Err(malformed("tree is nested too deeply").into());
    }

    let dict = obj
        .downcast::<PyDict>()
        .map_err(|_| malformed("tree nodes must be dicts"))?;

    let node_type: String = dict
        .get_item("type")?
        .ok_or_else(|| malformed("node is missing 'type'"))?
        .extract()?;
    let node_type = match node_type.as_str() {
        "operator" => NodeType::Operator,
        "operand" | "condition" => NodeType::Operand,
        other => return Err(malformed(format!("unknown node type '{}'", other)).into()),
    };

    let value: String = dict
        .get_item("value")?
        .ok_or_else(|| malformed("node is missing 'value'"))?
        .extract()?;

    let child = |key: &str| -> PyResult<Option<Box<WireNode>>> {
        match dict.get_item(key)? {
            Some(child) if !child.is_none() => {
                Ok(Some(Box::new(extract_wire_node_at(&child, depth + 1)?)))
            }
            _ => Ok(None),
        }
    };

    Ok(WireNode {
        node_type,
        value,
        left: child("left")?,
        right: child("right")?,
    })
}

/// `RuleTree`, rule name or id string, or tree dict
pub fn extract_ast(obj: &Bound<'_, PyAny>) -> PyResult<AstArg> {
    if let Ok(tree) = obj.downcast::<RuleTree>() {
        return Ok(AstArg::Tree(tree.get().shared()));
    }
    if obj.is_instance_of::<PyString>() {
        return Ok(AstArg::Input(AstInput::Reference(obj.extract()?)));
    }
    Ok(AstArg::Input(AstInput::Tree(extract_wire_node(obj)?)))
}

fn malformed(message: impl Into<String>) -> RuleEngineError {
    RuleEngineError::MalformedTree(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_value_numbers() {
        Python::initialize();
        Python::attach(|py| {
            let big = (1u128 << 70).into_pyobject(py).unwrap();
            assert_eq!(
                extract_value(big.as_any()).unwrap(),
                Value::Number(2f64.powi(70))
            );

            let negative = (-(1i128 << 80)).into_pyobject(py).unwrap();
            assert_eq!(
                extract_value(negative.as_any()).unwrap(),
                Value::Number(-(2f64.powi(80)))
            );

            let max = i64::MAX.into_pyobject(py).unwrap();
            assert_eq!(extract_value(max.as_any()).unwrap(), Value::from(i64::MAX));

            let flag = true.into_pyobject(py).unwrap();
            assert_eq!(extract_value(flag.as_any()).unwrap(), Value::Boolean(true));
        });
    }
}
