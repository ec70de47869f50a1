//! Operator precedence for Pratt parsing.

use crate::lexer::TokenKind;

/// Operator precedence levels (higher = tighter binding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest = 0,
    AndOr = 1,            // && ||
    Equals = 2,           // == !=
    LessGreaterEqual = 3, // <= >=
    LessGreater = 4,      // < >
    Sum = 5,              // + -
    Product = 6,          // * / %
    Prefix = 7,           // ! -
    Call = 8,             // () []
}

pub fn get_precedence(kind: &TokenKind) -> Precedence {
    match kind {
        TokenKind::And | TokenKind::Or => Precedence::AndOr,
        TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equals,
        TokenKind::LessEqual | TokenKind::GreaterEqual => Precedence::LessGreaterEqual,
        TokenKind::Less | TokenKind::Greater => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
        TokenKind::LeftParen | TokenKind::LeftBracket => Precedence::Call,
        _ => Precedence::Lowest,
    }
}
