//! The typed AST produced by the parser and consumed by both back-ends.

mod expr;
mod stmt;

pub use expr::{Expr, ExprKind, InfixOperator, PrefixOperator};
pub use stmt::{BlockStmt, Program, Stmt, StmtKind};
