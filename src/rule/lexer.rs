//! Rule string lexer

use crate::error::LexError;
use crate::rule::ast::Comparator;
use crate::rule::token::{Token, TokenKind};

/// Split a rule string into tokens
pub fn tokenize(rule: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = rule.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::new(TokenKind::LeftParen, "(", offset));
            }
            ')' => {
                chars.next();
                tokens.push(Token::new(TokenKind::RightParen, ")", offset));
            }
            '>' | '<' | '=' | '!' => {
                chars.next();
                let has_eq = matches!(chars.peek(), Some(&(_, '=')));
                let comparator = match (c, has_eq) {
                    ('>', true) => Comparator::GreaterEqual,
                    ('>', false) => Comparator::Greater,
                    ('<', true) => Comparator::LessEqual,
                    ('<', false) => Comparator::Less,
                    ('!', true) => Comparator::NotEqual,
                    ('!', false) => {
                        return Err(LexError::UnexpectedCharacter {
                            character: c,
                            offset,
                        })
                    }
                    // "=" and "==" both mean equality
                    _ => Comparator::Equal,
                };
                if has_eq {
                    chars.next();
                }
                let end = offset + 1 + usize::from(has_eq);
                tokens.push(Token::new(
                    TokenKind::Comparator(comparator),
                    &rule[offset..end],
                    offset,
                ));
            }
            '\'' | '"' => {
                chars.next();
                let close = chars
                    .by_ref()
                    .find(|&(_, ch)| ch == c)
                    .map(|(i, _)| i)
                    .ok_or(LexError::UnterminatedString { offset })?;
                tokens.push(Token::new(
                    TokenKind::StringLiteral,
                    &rule[offset..=close],
                    offset,
                ));
            }
            '-' | '0'..='9' => {
                let end = scan_number(rule, offset).ok_or(LexError::UnexpectedCharacter {
                    character: c,
                    offset,
                })?;
                while matches!(chars.peek(), Some(&(i, _)) if i < end) {
                    chars.next();
                }
                tokens.push(Token::new(
                    TokenKind::NumberLiteral,
                    &rule[offset..end],
                    offset,
                ));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = offset;
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        end = i + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &rule[offset..end];
                tokens.push(Token::new(keyword_kind(text), text, offset));
            }
            _ => {
                return Err(LexError::UnexpectedCharacter {
                    character: c,
                    offset,
                })
            }
        }
    }

    Ok(tokens)
}

fn keyword_kind(word: &str) -> TokenKind {
    if word.eq_ignore_ascii_case("AND") {
        TokenKind::And
    } else if word.eq_ignore_ascii_case("OR") {
        TokenKind::Or
    } else if word.eq_ignore_ascii_case("NOT") {
        TokenKind::Not
    } else {
        TokenKind::Identifier
    }
}

/// End offset of the number starting at `start`: optional '-', digits,
/// optional fraction. `None` if no digit follows the sign.
fn scan_number(rule: &str, start: usize) -> Option<usize> {
    let bytes = rule.as_bytes();
    let mut i = start;
    if bytes.get(i) == Some(&b'-') {
        i += 1;
    }

    let digits_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    if i == digits_start {
        return None;
    }

    if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i += 1;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
    }

    Some(i)
}
