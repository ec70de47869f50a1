//! Interactive REPL.
//!
//! Both back-ends keep their state alive across lines: the interpreter holds
//! one root scope, the bytecode session threads its symbol table, constants,
//! and globals through successive compile/run cycles so a later line can
//! load globals set by an earlier one.

use std::mem;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::interpreter::value::Value;
use crate::interpreter::Interpreter;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::vm::{Compiler, SymbolTable, Vm};
use crate::ExecutionMode;

const PROMPT: &str = ">> ";
const HISTORY_FILE: &str = ".quonk_history";

/// Run the REPL on standard input/output until EOF or interrupt.
pub fn start(mode: ExecutionMode) -> rustyline::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let history_path = dirs::home_dir().map(|home| home.join(HISTORY_FILE));
    if let Some(path) = &history_path {
        let _ = editor.load_history(path);
    }

    let engine = match mode {
        ExecutionMode::TreeWalk => "tree-walk",
        ExecutionMode::Bytecode => "bytecode",
    };
    println!("QuonkScript REPL ({} engine)", engine);

    let mut session = Session::new(mode);
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                session.eval_line(&line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Honk! {}", err).red());
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        let _ = editor.save_history(path);
    }
    Ok(())
}

enum Session {
    TreeWalk {
        interpreter: Interpreter,
    },
    Bytecode {
        symbols: SymbolTable,
        constants: Vec<Value>,
        vm: Vm,
    },
}

impl Session {
    fn new(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::TreeWalk => Session::TreeWalk {
                interpreter: Interpreter::new(),
            },
            ExecutionMode::Bytecode => {
                // Start from a fresh compiler so built-ins are registered.
                let (symbols, constants) = Compiler::new().into_state();
                Session::Bytecode {
                    symbols,
                    constants,
                    vm: Vm::new(),
                }
            }
        }
    }

    fn eval_line(&mut self, line: &str) {
        let mut parser = Parser::new(Lexer::new(line));
        let program = parser.parse_program();
        if !parser.errors().is_empty() {
            eprintln!("{}", "Honk! Parser errors:".red());
            for error in parser.errors() {
                eprintln!("\t{}", error);
            }
            return;
        }

        match self {
            Session::TreeWalk { interpreter } => {
                let result = interpreter.interpret(&program);
                if result.is_error() {
                    eprintln!("{}", result.to_string().red());
                } else {
                    println!("{}", result);
                }
            }
            Session::Bytecode {
                symbols,
                constants,
                vm,
            } => {
                let mut compiler =
                    Compiler::new_with_state(mem::take(symbols), mem::take(constants));
                let compiled = compiler.compile(&program);
                let bytecode = compiler.bytecode();
                let (restored_symbols, restored_constants) = compiler.into_state();
                *symbols = restored_symbols;
                *constants = restored_constants;

                if let Err(err) = compiled {
                    eprintln!("{}", format!("Honk! Compilation failed: {}", err).red());
                    return;
                }
                match vm.run(&bytecode) {
                    Ok(()) => println!("{}", vm.last_popped()),
                    Err(err) => {
                        eprintln!("{}", format!("Honk! Runtime error: {}", err).red())
                    }
                }
            }
        }
    }
}
