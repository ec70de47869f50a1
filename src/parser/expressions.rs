//! Expression parsing using Pratt precedence climbing.
//!
//! Two dispatch tables keyed by token kind: `parse_prefix` handles literals,
//! identifiers, grouping, unary operators, `if`, `func`, and the collection
//! literals; `parse_infix` handles every binary operator plus `(` for calls
//! and `[` for indexing. The climbing rule: parse a prefix, then while the
//! peek token binds tighter than the caller, fold it in as an infix.

use crate::ast::{Expr, ExprKind, InfixOperator, PrefixOperator};
use crate::error::ParserError;
use crate::lexer::TokenKind;

use super::core::{kind_name, ParseResult, Parser};
use super::precedence::Precedence;

impl<'a> Parser<'a> {
    pub(crate) fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.peek_is(&TokenKind::Semicolon) && precedence < self.peek_precedence() {
            self.next_token();
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let span = self.current_span();

        match &self.current.kind {
            TokenKind::Identifier(name) => {
                Ok(Expr::new(ExprKind::Identifier(name.clone()), span))
            }
            TokenKind::Int(n) => Ok(Expr::new(ExprKind::IntegerLit(*n), span)),
            TokenKind::Float(n) => Ok(Expr::new(ExprKind::FloatLit(*n), span)),
            TokenKind::Str(s) => Ok(Expr::new(ExprKind::StringLit(s.clone()), span)),
            TokenKind::True => Ok(Expr::new(ExprKind::BooleanLit(true), span)),
            TokenKind::False => Ok(Expr::new(ExprKind::BooleanLit(false), span)),
            TokenKind::Null => Ok(Expr::new(ExprKind::NullLit, span)),

            TokenKind::Bang => self.parse_prefix_operator(PrefixOperator::Bang),
            TokenKind::Minus => self.parse_prefix_operator(PrefixOperator::Minus),

            TokenKind::LeftParen => self.parse_grouped(),
            TokenKind::LeftBracket => self.parse_array(),
            TokenKind::LeftBrace => self.parse_hash(),
            TokenKind::If => self.parse_if(),
            TokenKind::Func => self.parse_function(),

            TokenKind::Illegal(literal) => Err(ParserError::IllegalToken {
                literal: literal.clone(),
                line: self.current.line(),
            }),

            kind => Err(ParserError::NoPrefixParseFn {
                kind: kind_name(kind).to_string(),
            }),
        }
    }

    fn parse_infix(&mut self, left: Expr) -> ParseResult<Expr> {
        match &self.current.kind {
            TokenKind::LeftParen => self.parse_call(left),
            TokenKind::LeftBracket => self.parse_index(left),
            kind => {
                let operator = match kind {
                    TokenKind::Plus => InfixOperator::Plus,
                    TokenKind::Minus => InfixOperator::Minus,
                    TokenKind::Star => InfixOperator::Star,
                    TokenKind::Slash => InfixOperator::Slash,
                    TokenKind::Percent => InfixOperator::Percent,
                    TokenKind::EqualEqual => InfixOperator::Equal,
                    TokenKind::BangEqual => InfixOperator::NotEqual,
                    TokenKind::Less => InfixOperator::Less,
                    TokenKind::LessEqual => InfixOperator::LessEqual,
                    TokenKind::Greater => InfixOperator::Greater,
                    TokenKind::GreaterEqual => InfixOperator::GreaterEqual,
                    TokenKind::And => InfixOperator::And,
                    TokenKind::Or => InfixOperator::Or,
                    kind => {
                        return Err(ParserError::NoPrefixParseFn {
                            kind: kind_name(kind).to_string(),
                        })
                    }
                };

                let precedence = self.current_precedence();
                self.next_token();
                let right = self.parse_expression(precedence)?;

                let span = left.span.merge(&right.span);
                Ok(Expr::new(
                    ExprKind::Infix {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    span,
                ))
            }
        }
    }

    fn parse_prefix_operator(&mut self, operator: PrefixOperator) -> ParseResult<Expr> {
        let start_span = self.current_span();
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        let span = start_span.merge(&right.span);
        Ok(Expr::new(
            ExprKind::Prefix {
                operator,
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_grouped(&mut self) -> ParseResult<Expr> {
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(&TokenKind::RightParen)?;
        Ok(expr)
    }

    /// `if (C) { ... } [else { ... }]` — `else if` is written by nesting an
    /// `if` inside the else block.
    fn parse_if(&mut self) -> ParseResult<Expr> {
        let start_span = self.current_span();

        self.expect_peek(&TokenKind::LeftParen)?;
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(&TokenKind::RightParen)?;

        self.expect_peek(&TokenKind::LeftBrace)?;
        let consequence = self.parse_block()?;

        let alternative = if self.peek_is(&TokenKind::Else) {
            self.next_token();
            self.expect_peek(&TokenKind::LeftBrace)?;
            Some(self.parse_block()?)
        } else {
            None
        };

        let span = start_span.merge(&self.current_span());
        Ok(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                consequence,
                alternative,
            },
            span,
        ))
    }

    /// `func(p1, p2, ...) { body }` — the binding name, if any, is filled in
    /// by the enclosing variable declaration.
    fn parse_function(&mut self) -> ParseResult<Expr> {
        let start_span = self.current_span();

        self.expect_peek(&TokenKind::LeftParen)?;
        let parameters = self.parse_parameters()?;

        self.expect_peek(&TokenKind::LeftBrace)?;
        let body = self.parse_block()?;

        let span = start_span.merge(&self.current_span());
        Ok(Expr::new(
            ExprKind::Function {
                parameters,
                body,
                name: None,
            },
            span,
        ))
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<String>> {
        let mut parameters = Vec::new();

        if self.peek_is(&TokenKind::RightParen) {
            self.next_token();
            return Ok(parameters);
        }

        self.next_token();
        parameters.push(self.current_identifier()?);

        while self.peek_is(&TokenKind::Comma) {
            self.next_token();
            self.next_token();
            parameters.push(self.current_identifier()?);
        }

        self.expect_peek(&TokenKind::RightParen)?;
        Ok(parameters)
    }

    fn current_identifier(&self) -> ParseResult<String> {
        match &self.current.kind {
            TokenKind::Identifier(name) => Ok(name.clone()),
            kind => Err(ParserError::UnexpectedToken {
                expected: "Identifier".to_string(),
                found: kind_name(kind).to_string(),
                line: self.current.line(),
            }),
        }
    }

    fn parse_call(&mut self, function: Expr) -> ParseResult<Expr> {
        let arguments = self.parse_expression_list(&TokenKind::RightParen)?;
        let span = function.span.merge(&self.current_span());
        Ok(Expr::new(
            ExprKind::Call {
                function: Box::new(function),
                arguments,
            },
            span,
        ))
    }

    fn parse_index(&mut self, left: Expr) -> ParseResult<Expr> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(&TokenKind::RightBracket)?;

        let span = left.span.merge(&self.current_span());
        Ok(Expr::new(
            ExprKind::Index {
                left: Box::new(left),
                index: Box::new(index),
            },
            span,
        ))
    }

    fn parse_array(&mut self) -> ParseResult<Expr> {
        let start_span = self.current_span();
        let elements = self.parse_expression_list(&TokenKind::RightBracket)?;
        let span = start_span.merge(&self.current_span());
        Ok(Expr::new(ExprKind::ArrayLit(elements), span))
    }

    fn parse_hash(&mut self) -> ParseResult<Expr> {
        let start_span = self.current_span();
        let mut pairs = Vec::new();

        while !self.peek_is(&TokenKind::RightBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect_peek(&TokenKind::Colon)?;
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.peek_is(&TokenKind::RightBrace) {
                self.expect_peek(&TokenKind::Comma)?;
            }
        }
        self.expect_peek(&TokenKind::RightBrace)?;

        let span = start_span.merge(&self.current_span());
        Ok(Expr::new(ExprKind::HashLit(pairs), span))
    }

    /// Comma-separated expressions terminated by `end`.
    fn parse_expression_list(&mut self, end: &TokenKind) -> ParseResult<Vec<Expr>> {
        let mut list = Vec::new();

        if self.peek_is(end) {
            self.next_token();
            return Ok(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(&TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Ok(list)
    }
}
