//! QuonkScript CLI: run files through either back-end, or start the REPL.

use std::fs;
use std::process;

use quonk::interpreter::Interpreter;
use quonk::lexer::Lexer;
use quonk::parser::Parser;
use quonk::vm::{disassemble, Compiler, Vm};
use quonk::{repl, ExecutionMode};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("Quonk {} - QuonkScript interpreter", VERSION);
    eprintln!();
    eprintln!("Usage: quonk [command] [script]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  interpret <script>   run through the tree-walking evaluator");
    eprintln!("  run <script>         compile to bytecode and run on the VM");
    eprintln!("  compile <script>     compile and print the bytecode listing");
    eprintln!("  exec <file>          run pre-compiled bytecode (unimplemented)");
    eprintln!("  help                 show this message");
    eprintln!();
    eprintln!("With a bare script path, `run` is assumed.");
    eprintln!("With no arguments, the REPL starts.");
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        None => {
            if let Err(err) = repl::start(ExecutionMode::default()) {
                eprintln!("Honk! {}", err);
                process::exit(1);
            }
        }
        Some("help") | Some("--help") | Some("-h") => print_usage(),
        Some("interpret") => interpret_file(expect_path(&args)),
        Some("run") => run_file(expect_path(&args)),
        Some("compile") => compile_file(expect_path(&args)),
        Some("exec") => {
            eprintln!("Honk! exec: loading pre-compiled bytecode is not implemented yet");
            process::exit(1);
        }
        // A bare path runs on the VM.
        Some(path) if !path.starts_with('-') && args.len() == 1 => run_file(path),
        Some(_) => {
            print_usage();
            process::exit(2);
        }
    }
}

fn expect_path(args: &[String]) -> &str {
    match args.get(1) {
        Some(path) => path,
        None => {
            print_usage();
            process::exit(2);
        }
    }
}

fn read_source(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(source) => source,
        Err(_) => {
            eprintln!("Honk! Cannot read file {}", path);
            process::exit(1);
        }
    }
}

/// Parse, reporting accumulated errors each on its own tab-indented line.
fn parse_or_exit(source: &str) -> quonk::ast::Program {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    if !parser.errors().is_empty() {
        eprintln!("Honk! Parser errors:");
        for error in parser.errors() {
            eprintln!("\t{}", error);
        }
        process::exit(1);
    }
    program
}

fn interpret_file(path: &str) {
    let source = read_source(path);
    let program = parse_or_exit(&source);

    let result = Interpreter::new().interpret(&program);
    let failed = result.is_error();
    println!("{}", result);
    if failed {
        process::exit(1);
    }
}

fn run_file(path: &str) {
    let source = read_source(path);
    let program = parse_or_exit(&source);

    let mut compiler = Compiler::new();
    if let Err(err) = compiler.compile(&program) {
        eprintln!("Honk! Compilation failed: {}", err);
        process::exit(1);
    }

    let mut vm = Vm::new();
    if let Err(err) = vm.run(&compiler.bytecode()) {
        eprintln!("Honk! Runtime error: {}", err);
        process::exit(1);
    }
    println!("{}", vm.last_popped());
}

fn compile_file(path: &str) {
    let source = read_source(path);
    let program = parse_or_exit(&source);

    let mut compiler = Compiler::new();
    if let Err(err) = compiler.compile(&program) {
        eprintln!("Honk! Compilation failed: {}", err);
        process::exit(1);
    }

    print!("{}", disassemble(&compiler.bytecode()));
}
