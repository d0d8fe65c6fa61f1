//! Recursive descent parser for rule expressions
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or_expr    := and_expr ( OR and_expr )*
//! and_expr   := not_expr ( AND not_expr )*
//! not_expr   := NOT not_expr | primary
//! primary    := '(' or_expr ')' | comparison
//! comparison := identifier comparator literal
//! literal    := number | string | true | false
//! ```

use crate::error::{ParseError, Result};
use crate::rule::ast::{Condition, LogicalOp, Node, MAX_TREE_DEPTH};
use crate::rule::lexer::tokenize;
use crate::rule::token::{Token, TokenKind};
use crate::rule::value::Value;

/// Deepest allowed nesting of parentheses and NOT prefixes
pub const MAX_NESTING_DEPTH: usize = 128;

/// A subtree with its depth, tracked while building
type Subtree = (Node, usize);

/// Parse a rule string into an AST
pub fn parse_rule(rule: &str) -> Result<Node> {
    let tokens = tokenize(rule)?;
    Ok(parse(&tokens)?)
}

/// Parse a token sequence into an AST
pub fn parse(tokens: &[Token]) -> std::result::Result<Node, ParseError> {
    Parser::new(tokens).parse_expression()
}

/// Parse exactly one comparison, e.g. the value of a serialized operand node
pub fn parse_condition(text: &str) -> Result<Condition> {
    let tokens = tokenize(text)?;
    let mut parser = Parser::new(&tokens);
    let condition = parser.comparison()?;
    parser.expect_end("end of comparison")?;
    Ok(condition)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse_expression(mut self) -> std::result::Result<Node, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::new(0, "expression", None));
        }
        let (node, _) = self.or_expr()?;
        self.expect_end("AND, OR or end of input")?;
        Ok(node)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().is_some_and(|t| t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Error pointing at the current token, or at the end of input
    fn error(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::new(token.offset, expected, Some(token.text.clone())),
            None => {
                let end = self.tokens.last().map(Token::end).unwrap_or(0);
                ParseError::new(end, expected, None)
            }
        }
    }

    fn expect_end(&self, expected: &str) -> std::result::Result<(), ParseError> {
        match self.peek() {
            Some(_) => Err(self.error(expected)),
            None => Ok(()),
        }
    }

    fn enter(&mut self) -> std::result::Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error(&format!(
                "at most {} levels of nesting",
                MAX_NESTING_DEPTH
            )));
        }
        Ok(())
    }

    /// Depth of a node over children of depth `child`, refused past the limit
    fn grow(&self, operator: &Token, child: usize) -> std::result::Result<usize, ParseError> {
        let depth = child + 1;
        if depth > MAX_TREE_DEPTH {
            return Err(ParseError::new(
                operator.offset,
                format!("a rule tree at most {} levels deep", MAX_TREE_DEPTH),
                Some(operator.text.clone()),
            ));
        }
        Ok(depth)
    }

    fn or_expr(&mut self) -> std::result::Result<Subtree, ParseError> {
        self.chain(TokenKind::Or, LogicalOp::Or, Self::and_expr)
    }

    fn and_expr(&mut self) -> std::result::Result<Subtree, ParseError> {
        self.chain(TokenKind::And, LogicalOp::And, Self::not_expr)
    }

    /// Left-deep chain `operand (kind operand)*`
    fn chain(
        &mut self,
        kind: TokenKind,
        op: LogicalOp,
        operand: fn(&mut Self) -> std::result::Result<Subtree, ParseError>,
    ) -> std::result::Result<Subtree, ParseError> {
        let (mut left, mut depth) = operand(self)?;
        while let Some(token) = self.peek().filter(|t| t.kind == kind) {
            self.pos += 1;
            let (right, right_depth) = operand(self)?;
            depth = self.grow(token, depth.max(right_depth))?;
            left = op.join(left, right);
        }
        Ok((left, depth))
    }

    fn not_expr(&mut self) -> std::result::Result<Subtree, ParseError> {
        if let Some(token) = self.peek().filter(|t| t.kind == TokenKind::Not) {
            self.pos += 1;
            self.enter()?;
            let (inner, inner_depth) = self.not_expr()?;
            self.depth -= 1;
            let depth = self.grow(token, inner_depth)?;
            return Ok((Node::Not(Box::new(inner)), depth));
        }
        self.primary()
    }

    fn primary(&mut self) -> std::result::Result<Subtree, ParseError> {
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::LeftParen) => {
                self.pos += 1;
                self.enter()?;
                let subtree = self.or_expr()?;
                if !self.eat(TokenKind::RightParen) {
                    return Err(self.error("')'"));
                }
                self.depth -= 1;
                Ok(subtree)
            }
            Some(TokenKind::Identifier) => Ok((Node::Operand(self.comparison()?), 1)),
            _ => Err(self.error("attribute name, NOT or '('")),
        }
    }

    fn comparison(&mut self) -> std::result::Result<Condition, ParseError> {
        let attribute = match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => token.text.clone(),
            _ => return Err(self.error("attribute name")),
        };
        self.pos += 1;

        let comparator = match self.peek().map(|t| t.kind) {
            Some(TokenKind::Comparator(comparator)) => comparator,
            _ => return Err(self.error("comparison operator")),
        };
        self.pos += 1;

        let literal = self.literal()?;

        Ok(Condition {
            attribute,
            comparator,
            literal,
        })
    }

    fn literal(&mut self) -> std::result::Result<Value, ParseError> {
        let expected = "literal value";
        let token = match self.peek() {
            Some(token) => token,
            None => return Err(self.error(expected)),
        };

        let value = match token.kind {
            TokenKind::NumberLiteral => match token.text.parse::<f64>() {
                Ok(n) if n.is_finite() => Value::Number(n),
                Ok(_) => return Err(self.error("finite number literal")),
                Err(_) => return Err(self.error("number literal")),
            },
            TokenKind::StringLiteral => Value::String(token.unquoted().to_string()),
            TokenKind::Identifier if token.text.eq_ignore_ascii_case("true") => {
                Value::Boolean(true)
            }
            TokenKind::Identifier if token.text.eq_ignore_ascii_case("false") => {
                Value::Boolean(false)
            }
            _ => return Err(self.error(expected)),
        };

        self.advance();
        Ok(value)
    }
}
