//! Rule parsing, combining and evaluation module
//!
//! This module handles rule strings like "age > 30 AND department = 'Sales'":
//! lexing, parsing into an AST, combining several ASTs and evaluating them
//! against data records.

mod ast;
pub mod cache;
pub mod combiner;
mod evaluator;
pub mod lexer;
pub mod parser;
mod render;
mod token;
mod value;
mod wire;

#[cfg(test)]
mod property_tests;

pub use ast::*;
pub use cache::*;
pub use combiner::*;
pub use evaluator::*;
pub use lexer::*;
pub use parser::*;
pub use render::*;
pub use token::*;
pub use value::Value;
pub use wire::*;
