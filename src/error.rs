//! Error types for all pipeline phases.

use thiserror::Error;

/// Parser errors. These accumulate in a list on the parser; the caller
/// checks `Parser::errors` after `parse_program`.
#[derive(Debug, Clone, Error)]
pub enum ParserError {
    #[error("expected next token to be {expected}, got {found} instead on line {line}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("no prefix parse function for {kind} found")]
    NoPrefixParseFn { kind: String },

    #[error("illegal token {literal:?} on line {line}")]
    IllegalToken { literal: String, line: usize },
}

/// Bytecode compilation errors. The first failure aborts compilation.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("undefined variable {name} on line {line}")]
    UndefinedVariable { name: String, line: usize },

    #[error("cannot assign to constant {name} on line {line}")]
    AssignToConstant { name: String, line: usize },

    #[error("variable {name} already declared on line {line}")]
    Redeclaration { name: String, line: usize },

    #[error("cannot assign to captured variable {name} on line {line}")]
    CapturedAssignment { name: String, line: usize },
}

/// Runtime errors surfaced by the VM through its return channel. The
/// tree-walking evaluator reports the same conditions as `Value::Error`
/// values instead.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("stack overflow")]
    StackOverflow,

    #[error("unsupported types for binary operation: {left} {right}")]
    UnsupportedTypes { left: String, right: String },

    #[error("unsupported type for negation: {operand}")]
    UnsupportedNegation { operand: String },

    #[error("unknown operator: {operator}")]
    UnknownOperator { operator: String },

    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongArgumentCount { want: usize, got: usize },

    #[error("calling non-function: {callee}")]
    NotCallable { callee: String },

    #[error("unusable as hash key: {key}")]
    UnhashableKey { key: String },

    #[error("index operator not supported: {left}")]
    IndexNotSupported { left: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("{0}")]
    Builtin(String),
}

/// A unified error type for callers driving the whole pipeline.
#[derive(Debug, Error)]
pub enum QuonkError {
    #[error("parse error: {}", format_parse_errors(.0))]
    Parse(Vec<ParserError>),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_parse_errors(errors: &[ParserError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
