//! Statement parsing: declarations, assignments, returns, loops, blocks.

use crate::ast::{BlockStmt, Expr, ExprKind, Stmt, StmtKind};
use crate::lexer::TokenKind;

use super::core::{ParseResult, Parser};
use super::precedence::Precedence;

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match &self.current.kind {
            TokenKind::Mut | TokenKind::Const => self.parse_var_declaration(),
            TokenKind::Return => self.parse_return(),
            TokenKind::For => self.parse_for(),
            TokenKind::Identifier(_) if self.peek_is(&TokenKind::Assign) => {
                self.parse_var_assignment()
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// `mut x = e;` / `const x = e;` — the initializer may be omitted. A
    /// function literal bound here records its binding name, which lets the
    /// body call itself without capturing a free variable.
    fn parse_var_declaration(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        let constant = self.current_is(&TokenKind::Const);

        self.expect_peek(&TokenKind::Identifier(String::new()))?;
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            _ => unreachable!("expect_peek verified an identifier"),
        };

        let value = if self.peek_is(&TokenKind::Assign) {
            self.next_token();
            self.next_token();
            let mut value = self.parse_expression(Precedence::Lowest)?;
            if let ExprKind::Function {
                name: fn_name, ..
            } = &mut value.kind
            {
                *fn_name = Some(name.clone());
            }
            Some(value)
        } else {
            None
        };

        if self.peek_is(&TokenKind::Semicolon) {
            self.next_token();
        }

        let span = start_span.merge(&self.current_span());
        Ok(Stmt::new(
            StmtKind::VarDeclaration {
                name,
                value,
                constant,
            },
            span,
        ))
    }

    /// `x = e;` — only plain names are assignable.
    fn parse_var_assignment(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            _ => unreachable!("dispatched on an identifier"),
        };

        self.next_token(); // the `=`
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek_is(&TokenKind::Semicolon) {
            self.next_token();
        }

        let span = start_span.merge(&self.current_span());
        Ok(Stmt::new(StmtKind::VarAssignment { name, value }, span))
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        self.next_token();

        // `return;` returns null
        let value = if self.current_is(&TokenKind::Semicolon) {
            Expr::new(ExprKind::NullLit, self.current_span())
        } else {
            let value = self.parse_expression(Precedence::Lowest)?;
            if self.peek_is(&TokenKind::Semicolon) {
                self.next_token();
            }
            value
        };

        let span = start_span.merge(&self.current_span());
        Ok(Stmt::new(StmtKind::Return { value }, span))
    }

    /// `for (C) { body }` — C is re-evaluated each iteration.
    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();

        self.expect_peek(&TokenKind::LeftParen)?;
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(&TokenKind::RightParen)?;

        self.expect_peek(&TokenKind::LeftBrace)?;
        let body = self.parse_block()?;

        if self.peek_is(&TokenKind::Semicolon) {
            self.next_token();
        }

        let span = start_span.merge(&self.current_span());
        Ok(Stmt::new(StmtKind::For { condition, body }, span))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Stmt> {
        let start_span = self.current_span();
        let expr = self.parse_expression(Precedence::Lowest)?;

        if self.peek_is(&TokenKind::Semicolon) {
            self.next_token();
        }

        let span = start_span.merge(&self.current_span());
        Ok(Stmt::new(StmtKind::Expression { expr }, span))
    }

    /// `{ ... }` containing statements until the closing brace. The current
    /// token must be the opening brace.
    pub(crate) fn parse_block(&mut self) -> ParseResult<BlockStmt> {
        let start_span = self.current_span();
        self.next_token();

        let mut statements = Vec::new();
        while !self.current_is(&TokenKind::RightBrace) && !self.current_is(&TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement_or_recover() {
                statements.push(stmt);
            }
            self.next_token();
        }

        let span = start_span.merge(&self.current_span());
        Ok(BlockStmt::new(statements, span))
    }
}
