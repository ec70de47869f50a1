//! Benchmarks comparing the tree-walking evaluator against the bytecode VM.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quonk::interpreter::Interpreter;
use quonk::lexer::Lexer;
use quonk::parser::Parser;
use quonk::vm::{Compiler, Vm};

const FIB_RECURSIVE: &str = "
const fib = func(x) {
    if (x == 0) {
        return 0;
    } else {
        if (x == 1) {
            return 1;
        } else {
            fib(x - 1) + fib(x - 2);
        }
    }
};
fib(18);
";

const LOOP_SUM: &str = "
mut i = 0;
mut sum = 0;
for (i < 1000) {
    sum = sum + i;
    i = i + 1;
};
sum;
";

fn parse(source: &str) -> quonk::ast::Program {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    assert!(parser.errors().is_empty(), "parser errors");
    program
}

fn run_treewalk(source: &str) {
    let program = parse(source);
    Interpreter::new().interpret(&program);
}

fn run_vm(source: &str) {
    let program = parse(source);
    let mut compiler = Compiler::new();
    compiler.compile(&program).expect("compile error");
    let mut vm = Vm::new();
    vm.run(&compiler.bytecode()).expect("vm error");
}

fn fib_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("fib_recursive");
    group.bench_function("treewalk", |b| {
        b.iter(|| run_treewalk(black_box(FIB_RECURSIVE)))
    });
    group.bench_function("vm", |b| b.iter(|| run_vm(black_box(FIB_RECURSIVE))));
    group.finish();
}

fn loop_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("loop_sum");
    group.bench_function("treewalk", |b| b.iter(|| run_treewalk(black_box(LOOP_SUM))));
    group.bench_function("vm", |b| b.iter(|| run_vm(black_box(LOOP_SUM))));
    group.finish();
}

criterion_group!(benches, fib_comparison, loop_comparison);
criterion_main!(benches);
