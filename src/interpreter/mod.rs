//! The tree-walking evaluator.
//!
//! Walks the AST directly, with runtime failures represented as first-class
//! `Value::Error` values that bubble through block execution. The bytecode
//! back-end must produce the same observable results for well-typed
//! programs; see the equivalence tests in `lib.rs`.

pub mod builtins;
pub mod scope;
pub mod value;

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{
    BlockStmt, Expr, ExprKind, InfixOperator, PrefixOperator, Program, Stmt, StmtKind,
};
use builtins::builtin_by_name;
use scope::Scope;
use value::{Function, HashPair, Value, FALSE, NULL, TRUE};

/// The evaluator. Holds the root scope so that REPL lines accumulate state.
pub struct Interpreter {
    scope: Rc<RefCell<Scope>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            scope: Rc::new(RefCell::new(Scope::new())),
        }
    }

    /// Evaluate a program, returning the value of its last statement. A
    /// top-level `return` unwraps; an error value aborts the walk.
    pub fn interpret(&mut self, program: &Program) -> Value {
        let scope = self.scope.clone();
        let mut result = NULL;

        for stmt in &program.statements {
            result = self.eval_stmt(stmt, &scope);
            match result {
                Value::Return(inner) => return *inner,
                Value::Error { .. } => return result,
                _ => {}
            }
        }

        result
    }

    // --- Statements ---

    fn eval_stmt(&mut self, stmt: &Stmt, scope: &Rc<RefCell<Scope>>) -> Value {
        match &stmt.kind {
            StmtKind::VarDeclaration {
                name,
                value,
                constant,
            } => {
                let value = match value {
                    Some(expr) => {
                        let value = self.eval_expr(expr, scope);
                        if value.is_error() {
                            return value;
                        }
                        value
                    }
                    None => NULL,
                };
                match scope
                    .borrow_mut()
                    .declare(name, value, *constant, stmt.line())
                {
                    Ok(()) => NULL,
                    Err(message) => error(message, stmt.line()),
                }
            }
            StmtKind::VarAssignment { name, value } => {
                let value = self.eval_expr(value, scope);
                if value.is_error() {
                    return value;
                }
                match scope.borrow_mut().assign(name, value) {
                    Ok(()) => NULL,
                    Err(message) => error(message, stmt.line()),
                }
            }
            StmtKind::Return { value } => {
                let value = self.eval_expr(value, scope);
                if value.is_error() {
                    return value;
                }
                Value::Return(Box::new(value))
            }
            StmtKind::Expression { expr } => self.eval_expr(expr, scope),
            StmtKind::For { condition, body } => self.eval_for(condition, body, scope),
        }
    }

    /// Each block runs in a fresh enclosed scope, so a loop body may
    /// redeclare its locals on every iteration.
    fn eval_block(&mut self, block: &BlockStmt, scope: &Rc<RefCell<Scope>>) -> Value {
        let inner = Rc::new(RefCell::new(Scope::enclosed(scope.clone())));
        let mut result = NULL;

        for stmt in &block.statements {
            result = self.eval_stmt(stmt, &inner);
            // Return values are not unwrapped here so they bubble up.
            if matches!(result, Value::Return(_) | Value::Error { .. }) {
                return result;
            }
        }

        result
    }

    fn eval_for(
        &mut self,
        condition: &Expr,
        body: &BlockStmt,
        scope: &Rc<RefCell<Scope>>,
    ) -> Value {
        loop {
            let cond = self.eval_expr(condition, scope);
            if cond.is_error() {
                return cond;
            }
            if !cond.is_truthy() {
                return NULL;
            }
            let result = self.eval_block(body, scope);
            if matches!(result, Value::Return(_) | Value::Error { .. }) {
                return result;
            }
        }
    }

    // --- Expressions ---

    fn eval_expr(&mut self, expr: &Expr, scope: &Rc<RefCell<Scope>>) -> Value {
        match &expr.kind {
            ExprKind::IntegerLit(n) => Value::Int(*n),
            ExprKind::FloatLit(n) => Value::Float(*n),
            ExprKind::BooleanLit(b) => bool_value(*b),
            ExprKind::StringLit(s) => Value::string(s.as_str()),
            ExprKind::NullLit => NULL,
            ExprKind::Identifier(name) => self.eval_identifier(name, expr.line(), scope),
            ExprKind::ArrayLit(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    let value = self.eval_expr(element, scope);
                    if value.is_error() {
                        return value;
                    }
                    values.push(value);
                }
                Value::array(values)
            }
            ExprKind::HashLit(pairs) => self.eval_hash_literal(pairs, expr.line(), scope),
            ExprKind::Prefix { operator, right } => {
                let right = self.eval_expr(right, scope);
                if right.is_error() {
                    return right;
                }
                eval_prefix(*operator, right, expr.line())
            }
            ExprKind::Infix {
                operator,
                left,
                right,
            } => {
                let left = self.eval_expr(left, scope);
                if left.is_error() {
                    return left;
                }
                let right = self.eval_expr(right, scope);
                if right.is_error() {
                    return right;
                }
                eval_infix(*operator, left, right, expr.line())
            }
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                let cond = self.eval_expr(condition, scope);
                if cond.is_error() {
                    return cond;
                }
                if cond.is_truthy() {
                    self.eval_block(consequence, scope)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, scope)
                } else {
                    NULL
                }
            }
            ExprKind::Function {
                parameters, body, ..
            } => Value::Function(Rc::new(Function {
                parameters: parameters.clone(),
                body: body.clone(),
                scope: scope.clone(),
            })),
            ExprKind::Call {
                function,
                arguments,
            } => {
                let callee = self.eval_expr(function, scope);
                if callee.is_error() {
                    return callee;
                }
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    let value = self.eval_expr(argument, scope);
                    if value.is_error() {
                        return value;
                    }
                    args.push(value);
                }
                self.apply_function(callee, args, expr.line())
            }
            ExprKind::Index { left, index } => {
                let left = self.eval_expr(left, scope);
                if left.is_error() {
                    return left;
                }
                let index = self.eval_expr(index, scope);
                if index.is_error() {
                    return index;
                }
                eval_index(left, index, expr.line())
            }
        }
    }

    fn eval_identifier(
        &mut self,
        name: &str,
        line: usize,
        scope: &Rc<RefCell<Scope>>,
    ) -> Value {
        if let Some(value) = scope.borrow().get(name) {
            return value;
        }
        if let Some(builtin) = builtin_by_name(name) {
            return Value::Builtin(builtin);
        }
        error(format!("undefined variable {}", name), line)
    }

    fn eval_hash_literal(
        &mut self,
        pairs: &[(Expr, Expr)],
        line: usize,
        scope: &Rc<RefCell<Scope>>,
    ) -> Value {
        // Pairs evaluate in the same key-rendering order the compiler uses,
        // so both back-ends observe identical evaluation and insertion order.
        let mut ordered: Vec<&(Expr, Expr)> = pairs.iter().collect();
        ordered.sort_by_key(|(key, _)| key.to_string());

        let mut map = IndexMap::new();
        for (key_expr, value_expr) in ordered {
            let key = self.eval_expr(key_expr, scope);
            if key.is_error() {
                return key;
            }
            let Some(hash_key) = key.hash_key() else {
                return error(
                    format!("unusable as hash key: {}", key.type_name()),
                    line,
                );
            };
            let value = self.eval_expr(value_expr, scope);
            if value.is_error() {
                return value;
            }
            map.insert(hash_key, HashPair { key, value });
        }
        Value::hash(map)
    }

    fn apply_function(&mut self, callee: Value, args: Vec<Value>, line: usize) -> Value {
        match callee {
            Value::Function(func) => {
                if args.len() != func.parameters.len() {
                    return error(
                        format!(
                            "wrong number of arguments: want={}, got={}",
                            func.parameters.len(),
                            args.len()
                        ),
                        line,
                    );
                }

                let fn_scope = Rc::new(RefCell::new(Scope::enclosed(func.scope.clone())));
                for (parameter, value) in func.parameters.iter().zip(args) {
                    // Parameters are immutable, like the compiler's locals.
                    fn_scope.borrow_mut().bind(parameter, value, true, line);
                }

                let result = self.eval_block(&func.body, &fn_scope);
                match result {
                    Value::Return(inner) => *inner,
                    other => other,
                }
            }
            Value::Builtin(builtin) => match (builtin.func)(&args) {
                Ok(value) => value,
                Err(message) => error(message, line),
            },
            other => error(format!("not a function: {}", other.type_name()), line),
        }
    }
}

// --- Operators ---

fn bool_value(b: bool) -> Value {
    if b {
        TRUE
    } else {
        FALSE
    }
}

fn error(message: impl Into<String>, line: usize) -> Value {
    Value::Error {
        message: message.into(),
        line,
    }
}

fn eval_prefix(operator: PrefixOperator, right: Value, line: usize) -> Value {
    match operator {
        PrefixOperator::Bang => bool_value(right.is_bang_falsy()),
        PrefixOperator::Minus => match right {
            Value::Int(n) => Value::Int(-n),
            Value::Float(n) => Value::Float(-n),
            other => error(
                format!("unknown operation - for type {}", other.type_name()),
                line,
            ),
        },
    }
}

fn eval_infix(operator: InfixOperator, left: Value, right: Value, line: usize) -> Value {
    match operator {
        // Both operands are always evaluated; there is no short-circuit.
        InfixOperator::And => bool_value(left.is_truthy() && right.is_truthy()),
        InfixOperator::Or => bool_value(left.is_truthy() || right.is_truthy()),
        InfixOperator::Equal => bool_value(left.lang_eq(&right)),
        InfixOperator::NotEqual => bool_value(!left.lang_eq(&right)),
        _ => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => eval_integer_infix(operator, *a, *b, line),
            (Value::Float(a), Value::Float(b)) => eval_float_infix(operator, *a, *b, line),
            (Value::String(a), Value::String(b)) if operator == InfixOperator::Plus => {
                Value::string(format!("{}{}", a, b))
            }
            _ if left.type_name() != right.type_name() => error(
                format!(
                    "type mismatch: {} {} {}",
                    left.type_name(),
                    operator,
                    right.type_name()
                ),
                line,
            ),
            _ => error(
                format!(
                    "unknown operator: {} {} {}",
                    left.type_name(),
                    operator,
                    right.type_name()
                ),
                line,
            ),
        },
    }
}

fn eval_integer_infix(operator: InfixOperator, a: i64, b: i64, line: usize) -> Value {
    match operator {
        InfixOperator::Plus => Value::Int(a.wrapping_add(b)),
        InfixOperator::Minus => Value::Int(a.wrapping_sub(b)),
        InfixOperator::Star => Value::Int(a.wrapping_mul(b)),
        InfixOperator::Slash => {
            if b == 0 {
                error("division by zero", line)
            } else {
                Value::Int(a / b)
            }
        }
        InfixOperator::Percent => {
            if b == 0 {
                error("division by zero", line)
            } else {
                Value::Int(a % b)
            }
        }
        InfixOperator::Less => bool_value(a < b),
        InfixOperator::LessEqual => bool_value(a <= b),
        InfixOperator::Greater => bool_value(a > b),
        InfixOperator::GreaterEqual => bool_value(a >= b),
        _ => error(
            format!("unknown operator: Integer {} Integer", operator),
            line,
        ),
    }
}

fn eval_float_infix(operator: InfixOperator, a: f64, b: f64, line: usize) -> Value {
    match operator {
        InfixOperator::Plus => Value::Float(a + b),
        InfixOperator::Minus => Value::Float(a - b),
        InfixOperator::Star => Value::Float(a * b),
        InfixOperator::Slash => Value::Float(a / b),
        InfixOperator::Percent => Value::Float(a % b),
        InfixOperator::Less => bool_value(a < b),
        InfixOperator::LessEqual => bool_value(a <= b),
        InfixOperator::Greater => bool_value(a > b),
        InfixOperator::GreaterEqual => bool_value(a >= b),
        _ => error(format!("unknown operator: Float {} Float", operator), line),
    }
}

fn eval_index(left: Value, index: Value, line: usize) -> Value {
    match (&left, &index) {
        (Value::Array(elements), Value::Int(i)) => {
            let elements = elements.borrow();
            let length = elements.len() as i64;
            // Negative indices wrap: -1 is the last element.
            let idx = if *i < 0 { length + i } else { *i };
            if idx < 0 || idx >= length {
                NULL
            } else {
                elements[idx as usize].clone()
            }
        }
        (Value::Hash(pairs), key) => match key.hash_key() {
            Some(hash_key) => pairs
                .borrow()
                .get(&hash_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(NULL),
            None => error(
                format!("unusable as hash key: {}", key.type_name()),
                line,
            ),
        },
        _ => error(
            format!("index operator not supported: {}", left.type_name()),
            line,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn eval(source: &str) -> Value {
        let mut parser = Parser::new(Lexer::new(source));
        let program = parser.parse_program();
        assert!(
            parser.errors().is_empty(),
            "parser errors: {:?}",
            parser.errors()
        );
        Interpreter::new().interpret(&program)
    }

    fn assert_error(source: &str, message: &str) {
        match eval(source) {
            Value::Error { message: m, .. } => assert_eq!(m, message, "source: {}", source),
            other => panic!("expected error for {:?}, got {}", source, other),
        }
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(eval("5"), Value::Int(5));
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("(5 + 10 * 2 + 15 / 3) * 2 + -10"), Value::Int(50));
        assert_eq!(eval("10 % 3"), Value::Int(1));
        assert_eq!(eval("-5"), Value::Int(-5));
    }

    #[test]
    fn test_float_arithmetic() {
        assert_eq!(eval("1.5 + 2.5"), Value::Float(4.0));
        assert_eq!(eval("2.0 * 2.0"), Value::Float(4.0));
        assert_eq!(eval("-1.5"), Value::Float(-1.5));
    }

    #[test]
    fn test_mixed_numeric_types_are_rejected() {
        assert_error("1 + 2.0", "type mismatch: Integer + Float");
    }

    #[test]
    fn test_boolean_operators() {
        assert_eq!(eval("1 < 2"), Value::Bool(true));
        assert_eq!(eval("1 <= 1"), Value::Bool(true));
        assert_eq!(eval("2 > 3"), Value::Bool(false));
        assert_eq!(eval("true == true"), Value::Bool(true));
        assert_eq!(eval("true != false"), Value::Bool(true));
        assert_eq!(eval("null == null"), Value::Bool(true));
        assert_eq!(eval("true && false"), Value::Bool(false));
        assert_eq!(eval("true || false"), Value::Bool(true));
        assert_eq!(eval("1 && 2"), Value::Bool(true));
    }

    #[test]
    fn test_bang_operator() {
        assert_eq!(eval("!true"), Value::Bool(false));
        assert_eq!(eval("!null"), Value::Bool(true));
        assert_eq!(eval("!!true"), Value::Bool(true));
        // Numeric zero is falsy for bang even though branches treat it as truthy.
        assert_eq!(eval("!0"), Value::Bool(true));
        assert_eq!(eval("!5"), Value::Bool(false));
        assert_eq!(eval("if (0) { 1 } else { 2 }"), Value::Int(1));
    }

    #[test]
    fn test_if_expressions() {
        assert_eq!(eval("if (true) { 10 }"), Value::Int(10));
        assert_eq!(eval("if (1 > 2) { 10 }"), Value::Null);
        assert_eq!(eval("if (1 > 2) { 10 } else { 20 }"), Value::Int(20));
        assert_eq!(eval("if (1 < 2) { 10 } else { 20 }"), Value::Int(10));
    }

    #[test]
    fn test_declarations_and_assignment() {
        assert_eq!(eval("mut a = 5; a"), Value::Int(5));
        assert_eq!(eval("mut a = 5; a = a + 1; a"), Value::Int(6));
        assert_eq!(eval("const b = 7; b"), Value::Int(7));
    }

    #[test]
    fn test_declaration_errors() {
        assert_error("mut a = 1; mut a = 2;", "variable a already declared");
        assert_error(
            "const c = 1; c = 2;",
            "attempt to assign a value to constant variable c",
        );
        assert_error("x = 1;", "undefined variable x");
        assert_error("ghost", "undefined variable ghost");
        assert_error(
            "const n = null;",
            "cannot declare constant n with null value",
        );
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(
            eval("mut i = 0; for (i < 3) { i = i + 1 }; i"),
            Value::Int(3)
        );
        assert_eq!(eval("for (false) { 1 }"), Value::Null);
        // The body scope is fresh each iteration, so redeclaring is fine.
        assert_eq!(
            eval("mut i = 0; for (i < 3) { mut t = i; i = t + 1 }; i"),
            Value::Int(3)
        );
    }

    #[test]
    fn test_functions_and_calls() {
        assert_eq!(eval("const id = func(x) { x }; id(5)"), Value::Int(5));
        assert_eq!(
            eval("const add = func(a, b) { return a + b; }; add(1, 2)"),
            Value::Int(3)
        );
        assert_eq!(
            eval("const newAdder = func(x) { func(y) { x + y } }; newAdder(2)(3)"),
            Value::Int(5)
        );
        assert_eq!(
            eval("const fib = func(x) { if (x < 2) { return x } fib(x - 1) + fib(x - 2) }; fib(10)"),
            Value::Int(55)
        );
    }

    #[test]
    fn test_call_errors() {
        assert_error(
            "const id = func(x) { x }; id(1, 2)",
            "wrong number of arguments: want=1, got=2",
        );
        assert_error("5(1)", "not a function: Integer");
    }

    #[test]
    fn test_return_bubbles_through_blocks() {
        assert_eq!(
            eval("const f = func() { if (true) { if (true) { return 9 } } return 1 }; f()"),
            Value::Int(9)
        );
        assert_eq!(eval("9; return 2; 1;"), Value::Int(2));
    }

    #[test]
    fn test_strings() {
        assert_eq!(eval("\"a\" + \"b\" + \"c\""), Value::string("abc"));
        assert_eq!(eval("len(\"quonk\")"), Value::Int(5));
        assert_error("\"a\" - \"b\"", "unknown operator: String - String");
    }

    #[test]
    fn test_arrays_and_indexing() {
        assert_eq!(
            eval("[1, 2 * 2, 3 + 3]"),
            Value::array(vec![Value::Int(1), Value::Int(4), Value::Int(6)])
        );
        assert_eq!(eval("[1, 2, 3][0]"), Value::Int(1));
        assert_eq!(eval("[1, 2, 3][-1]"), Value::Int(3));
        assert_eq!(eval("[1, 2, 3][-3]"), Value::Int(1));
        assert_eq!(eval("[1, 2, 3][3]"), Value::Null);
        assert_eq!(eval("[1, 2, 3][-4]"), Value::Null);
        assert_error("5[0]", "index operator not supported: Integer");
    }

    #[test]
    fn test_append_value_semantics() {
        assert_eq!(
            eval("mut a = [1, 2, 3]; append(a, 4); len(a)"),
            Value::Int(3)
        );
        assert_eq!(
            eval("mut a = [1]; mut b = append(a, 2); len(b)"),
            Value::Int(2)
        );
    }

    #[test]
    fn test_hashes() {
        assert_eq!(eval("{1 + 1: 2 * 2, \"k\": \"v\"}[2]"), Value::Int(4));
        assert_eq!(eval("{\"k\": \"v\"}[\"k\"]"), Value::string("v"));
        assert_eq!(eval("{true: 1}[true]"), Value::Int(1));
        assert_eq!(eval("{}[\"missing\"]"), Value::Null);
        assert_error("{[1]: 2}", "unusable as hash key: Array");
        assert_error("{1: 2}[[1]]", "unusable as hash key: Array");
    }

    #[test]
    fn test_division_by_zero() {
        assert_error("1 / 0", "division by zero");
        assert_error("1 % 0", "division by zero");
    }

    #[test]
    fn test_error_inspect_carries_line() {
        match eval("mut a = 1;\nghost") {
            Value::Error { line, .. } => assert_eq!(line, 2),
            other => panic!("expected error, got {}", other),
        }
    }
}
