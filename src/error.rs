//! Error types for the rule engine

use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::PyErr;
use thiserror::Error;

/// Failure while turning a rule string into tokens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character '{character}' at offset {offset}")]
    UnexpectedCharacter { character: char, offset: usize },

    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },
}

impl LexError {
    /// Byte offset of the offending input
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { offset, .. } => *offset,
            LexError::UnterminatedString { offset } => *offset,
        }
    }
}

/// Grammar violation found by the parser
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected} at offset {offset}{}", found_suffix(.found))]
pub struct ParseError {
    pub offset: usize,
    pub expected: String,
    pub found: Option<String>,
}

fn found_suffix(found: &Option<String>) -> String {
    match found {
        Some(text) => format!(", found '{}'", text),
        None => ", found end of input".to_string(),
    }
}

impl ParseError {
    pub fn new(offset: usize, expected: impl Into<String>, found: Option<String>) -> Self {
        Self {
            offset,
            expected: expected.into(),
            found,
        }
    }
}

/// Failure while combining rule trees
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombineError {
    #[error("cannot combine an empty set of rules")]
    EmptyInput,

    #[error("unsupported combine operator '{0}', expected AND or OR")]
    UnsupportedOperator(String),

    #[error("combined tree would be {depth} levels deep, the limit is {limit}")]
    TooDeep { depth: usize, limit: usize },
}

/// Kind of an evaluation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    MissingAttribute,
    TypeMismatch,
    UnknownOperator,
}

/// Failure while evaluating a tree against a data record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("attribute '{attribute}' is missing from the data record")]
    MissingAttribute { attribute: String },

    #[error("cannot compare {actual} value of '{attribute}' with {literal} literal using '{comparator}'")]
    TypeMismatch {
        attribute: String,
        comparator: &'static str,
        actual: &'static str,
        literal: &'static str,
    },

    #[error("unknown operator '{operator}'")]
    UnknownOperator { operator: String },
}

impl EvalError {
    pub fn kind(&self) -> EvalErrorKind {
        match self {
            EvalError::MissingAttribute { .. } => EvalErrorKind::MissingAttribute,
            EvalError::TypeMismatch { .. } => EvalErrorKind::TypeMismatch,
            EvalError::UnknownOperator { .. } => EvalErrorKind::UnknownOperator,
        }
    }
}

/// Main error type for the rule engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleEngineError {
    #[error("Error parsing rule string: {0}")]
    Lex(#[from] LexError),

    #[error("Error parsing rule string: {0}")]
    Parse(#[from] ParseError),

    #[error("Error combining rules: {0}")]
    Combine(#[from] CombineError),

    #[error("Error evaluating rule: {0}")]
    Eval(#[from] EvalError),

    #[error("Malformed tree: {0}")]
    MalformedTree(String),

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("A rule with the name \"{0}\" already exists")]
    DuplicateName(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RuleEngineError {
    /// HTTP status a boundary layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            RuleEngineError::RuleNotFound(_) => 404,
            RuleEngineError::DuplicateName(_) => 409,
            RuleEngineError::Config(_) => 500,
            _ => 400,
        }
    }
}

impl From<RuleEngineError> for PyErr {
    fn from(err: RuleEngineError) -> PyErr {
        let message = err.to_string();
        match err {
            RuleEngineError::Eval(EvalError::MissingAttribute { .. })
            | RuleEngineError::RuleNotFound(_) => PyKeyError::new_err(message),
            RuleEngineError::Eval(_) => PyTypeError::new_err(message),
            RuleEngineError::Config(_) => PyRuntimeError::new_err(message),
            _ => PyValueError::new_err(message),
        }
    }
}

/// Result type alias for the rule engine
pub type Result<T> = std::result::Result<T, RuleEngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_mentions_found_token() {
        let err = ParseError::new(7, "literal value", Some(")".to_string()));
        assert_eq!(err.to_string(), "expected literal value at offset 7, found ')'");

        let err = ParseError::new(3, "expression", None);
        assert_eq!(err.to_string(), "expected expression at offset 3, found end of input");
    }

    #[test]
    fn test_engine_error_wraps_with_prefix() {
        let err: RuleEngineError = LexError::UnterminatedString { offset: 4 }.into();
        assert_eq!(
            err.to_string(),
            "Error parsing rule string: unterminated string literal starting at offset 4"
        );
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RuleEngineError::RuleNotFound("x".into()).status_code(), 404);
        assert_eq!(RuleEngineError::DuplicateName("x".into()).status_code(), 409);
        assert_eq!(
            RuleEngineError::from(CombineError::EmptyInput).status_code(),
            400
        );
    }

    #[test]
    fn test_eval_error_kind() {
        let err = EvalError::UnknownOperator {
            operator: "XOR".to_string(),
        };
        assert_eq!(err.kind(), EvalErrorKind::UnknownOperator);
    }
}
