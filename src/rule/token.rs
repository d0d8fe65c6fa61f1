//! Tokens produced by the lexer

use crate::rule::ast::Comparator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    And,
    Or,
    Not,
    Comparator(Comparator),
    LeftParen,
    RightParen,
    Identifier,
    StringLiteral,
    NumberLiteral,
}

impl TokenKind {
    /// Short description used in parse error hints
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Comparator(_) => "comparison operator",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::Identifier => "attribute name",
            TokenKind::StringLiteral => "string literal",
            TokenKind::NumberLiteral => "number literal",
        }
    }
}

/// A token with its raw source text and byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
        }
    }

    /// Byte offset just past the token
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Contents of a string literal without its quotes
    pub fn unquoted(&self) -> &str {
        match self.kind {
            TokenKind::StringLiteral if self.text.len() >= 2 => &self.text[1..self.text.len() - 1],
            _ => &self.text,
        }
    }
}
