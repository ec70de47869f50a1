use crate::ast::{ExprKind, Program, StmtKind};
use crate::lexer::Lexer;
use crate::parser::Parser;

fn parse(source: &str) -> Program {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    assert!(
        parser.errors().is_empty(),
        "parser errors: {:?}",
        parser.errors()
    );
    program
}

fn parse_with_errors(source: &str) -> (Program, Vec<String>) {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    let errors = parser.errors().iter().map(|e| e.to_string()).collect();
    (program, errors)
}

#[test]
fn test_var_declarations() {
    let program = parse("mut x = 5; const y = 10; mut z;");
    assert_eq!(program.statements.len(), 3);

    match &program.statements[0].kind {
        StmtKind::VarDeclaration {
            name,
            value,
            constant,
        } => {
            assert_eq!(name, "x");
            assert!(!constant);
            assert!(value.is_some());
        }
        other => panic!("expected declaration, got {:?}", other),
    }

    match &program.statements[1].kind {
        StmtKind::VarDeclaration { name, constant, .. } => {
            assert_eq!(name, "y");
            assert!(constant);
        }
        other => panic!("expected declaration, got {:?}", other),
    }

    match &program.statements[2].kind {
        StmtKind::VarDeclaration { value, .. } => assert!(value.is_none()),
        other => panic!("expected declaration, got {:?}", other),
    }
}

#[test]
fn test_var_assignment() {
    let program = parse("x = x + 1;");
    match &program.statements[0].kind {
        StmtKind::VarAssignment { name, value } => {
            assert_eq!(name, "x");
            assert_eq!(value.to_string(), "(x + 1)");
        }
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn test_return_statements() {
    let program = parse("return 5; return a + b; return;");
    assert_eq!(program.statements.len(), 3);
    for stmt in &program.statements {
        assert!(matches!(stmt.kind, StmtKind::Return { .. }));
    }
    match &program.statements[2].kind {
        StmtKind::Return { value } => assert_eq!(value.kind, ExprKind::NullLit),
        _ => unreachable!(),
    }
}

#[test]
fn test_operator_precedence() {
    let cases = [
        ("-a * b", "((-a) * b)"),
        ("!-a", "(!(-a))"),
        ("a + b + c", "((a + b) + c)"),
        ("a * b + c", "((a * b) + c)"),
        ("a + b * c", "(a + (b * c))"),
        ("a % b + c", "((a % b) + c)"),
        ("5 < 4 != 3 > 4", "((5 < 4) != (3 > 4))"),
        ("3 + 4 * 5 == 3 * 1 + 4 * 5", "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)))"),
        ("a < b && c > d", "((a < b) && (c > d))"),
        ("a && b || c", "((a && b) || c)"),
        ("1 + 2 <= 3", "((1 + 2) <= 3)"),
        ("(a + b) * c", "((a + b) * c)"),
        ("-(a + b)", "(-(a + b))"),
        ("a + add(b * c) + d", "((a + add((b * c))) + d)"),
        ("a * [1, 2][0] * b", "((a * ([1, 2][0])) * b)"),
        ("add(a + b[0])", "add((a + (b[0])))"),
    ];

    for (source, expected) in cases {
        let program = parse(source);
        assert_eq!(program.to_string(), expected, "source: {}", source);
    }
}

#[test]
fn test_literals() {
    let program = parse("5; 2.5; \"quonk\"; true; false; null;");
    let kinds: Vec<_> = program
        .statements
        .iter()
        .map(|s| match &s.kind {
            StmtKind::Expression { expr } => expr.kind.clone(),
            other => panic!("expected expression, got {:?}", other),
        })
        .collect();

    assert_eq!(kinds[0], ExprKind::IntegerLit(5));
    assert_eq!(kinds[1], ExprKind::FloatLit(2.5));
    assert_eq!(kinds[2], ExprKind::StringLit("quonk".to_string()));
    assert_eq!(kinds[3], ExprKind::BooleanLit(true));
    assert_eq!(kinds[4], ExprKind::BooleanLit(false));
    assert_eq!(kinds[5], ExprKind::NullLit);
}

#[test]
fn test_if_expression() {
    let program = parse("if (x < y) { x } else { y }");
    match &program.statements[0].kind {
        StmtKind::Expression { expr } => match &expr.kind {
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                assert_eq!(condition.to_string(), "(x < y)");
                assert_eq!(consequence.statements.len(), 1);
                assert!(alternative.is_some());
            }
            other => panic!("expected if, got {:?}", other),
        },
        other => panic!("expected expression, got {:?}", other),
    }

    // Without an alternative
    let program = parse("if (x) { 1 }");
    match &program.statements[0].kind {
        StmtKind::Expression { expr } => match &expr.kind {
            ExprKind::If { alternative, .. } => assert!(alternative.is_none()),
            other => panic!("expected if, got {:?}", other),
        },
        _ => unreachable!(),
    }
}

#[test]
fn test_function_literal_records_binding_name() {
    let program = parse("const double = func(x) { x * 2 };");
    match &program.statements[0].kind {
        StmtKind::VarDeclaration { value, .. } => {
            match &value.as_ref().unwrap().kind {
                ExprKind::Function {
                    parameters, name, ..
                } => {
                    assert_eq!(parameters, &["x".to_string()]);
                    assert_eq!(name.as_deref(), Some("double"));
                }
                other => panic!("expected function, got {:?}", other),
            }
        }
        other => panic!("expected declaration, got {:?}", other),
    }

    // A bare function literal carries no name.
    let program = parse("func() { 1 };");
    match &program.statements[0].kind {
        StmtKind::Expression { expr } => match &expr.kind {
            ExprKind::Function { name, .. } => assert!(name.is_none()),
            other => panic!("expected function, got {:?}", other),
        },
        _ => unreachable!(),
    }
}

#[test]
fn test_call_expression() {
    let program = parse("add(1, 2 * 3, 4 + 5);");
    match &program.statements[0].kind {
        StmtKind::Expression { expr } => match &expr.kind {
            ExprKind::Call {
                function,
                arguments,
            } => {
                assert_eq!(function.to_string(), "add");
                assert_eq!(arguments.len(), 3);
                assert_eq!(arguments[1].to_string(), "(2 * 3)");
            }
            other => panic!("expected call, got {:?}", other),
        },
        _ => unreachable!(),
    }
}

#[test]
fn test_array_and_index() {
    let program = parse("[1, 2 * 2, 3 + 3]; a[1 + 1];");
    match &program.statements[0].kind {
        StmtKind::Expression { expr } => match &expr.kind {
            ExprKind::ArrayLit(elements) => assert_eq!(elements.len(), 3),
            other => panic!("expected array, got {:?}", other),
        },
        _ => unreachable!(),
    }
    match &program.statements[1].kind {
        StmtKind::Expression { expr } => {
            assert_eq!(expr.to_string(), "(a[(1 + 1)])");
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_hash_literals() {
    let program = parse("{\"one\": 1, \"two\": 2}; {}; {1 + 1: 2 * 2};");
    match &program.statements[0].kind {
        StmtKind::Expression { expr } => match &expr.kind {
            ExprKind::HashLit(pairs) => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0].0.to_string(), "one");
                assert_eq!(pairs[1].1.to_string(), "2");
            }
            other => panic!("expected hash, got {:?}", other),
        },
        _ => unreachable!(),
    }
    match &program.statements[1].kind {
        StmtKind::Expression { expr } => match &expr.kind {
            ExprKind::HashLit(pairs) => assert!(pairs.is_empty()),
            other => panic!("expected hash, got {:?}", other),
        },
        _ => unreachable!(),
    }
    match &program.statements[2].kind {
        StmtKind::Expression { expr } => {
            assert_eq!(expr.to_string(), "{(1 + 1): (2 * 2)}");
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_for_statement() {
    let program = parse("for (i < 3) { i = i + 1; }");
    match &program.statements[0].kind {
        StmtKind::For { condition, body } => {
            assert_eq!(condition.to_string(), "(i < 3)");
            assert_eq!(body.statements.len(), 1);
        }
        other => panic!("expected for, got {:?}", other),
    }
}

#[test]
fn test_expected_token_error_message() {
    let (_, errors) = parse_with_errors("mut = 5;");
    assert_eq!(
        errors[0],
        "expected next token to be Identifier, got Assign instead on line 1"
    );
}

#[test]
fn test_no_prefix_parse_fn_error() {
    let (_, errors) = parse_with_errors("+ 5;");
    assert_eq!(errors[0], "no prefix parse function for Plus found");
}

#[test]
fn test_parser_recovers_at_statement_boundary() {
    let (program, errors) = parse_with_errors("mut = 1; mut ok = 2;");
    assert_eq!(errors.len(), 1);
    assert_eq!(program.statements.len(), 1);
    match &program.statements[0].kind {
        StmtKind::VarDeclaration { name, .. } => assert_eq!(name, "ok"),
        other => panic!("expected declaration, got {:?}", other),
    }
}

#[test]
fn test_illegal_token_rejected_at_point_of_use() {
    let (_, errors) = parse_with_errors("1 & 2;");
    assert!(!errors.is_empty());
    assert!(errors[0].contains("illegal token"), "got: {}", errors[0]);
}
