//! AST-to-bytecode compiler.
//!
//! A single recursive walk of the AST, emitting instructions into a stack of
//! per-function compilation scopes. Each scope remembers its last two
//! emitted instructions for a small peephole pass: the trailing `OpPop` of a
//! function body is rewritten to `OpReturnValue`, which is how the final
//! expression of a block becomes its value.

use std::rc::Rc;

use crate::ast::{
    BlockStmt, Expr, ExprKind, InfixOperator, PrefixOperator, Program, Stmt, StmtKind,
};
use crate::error::CompileError;
use crate::interpreter::builtins::BUILTINS;
use crate::interpreter::value::Value;
use crate::vm::closure::CompiledFunction;
use crate::vm::opcode::{make, read_u8, Instructions, Opcode};
use crate::vm::symbol_table::{Symbol, SymbolScope, SymbolTable};

pub type CompileResult<T> = Result<T, CompileError>;

/// The compiler's output: a flat instruction stream plus the constants it
/// references by index.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

/// The compiler: transforms an AST into bytecode.
pub struct Compiler {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
    scope_index: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(index, builtin.name);
        }

        Self {
            constants: Vec::new(),
            symbol_table,
            scopes: vec![CompilationScope::default()],
            scope_index: 0,
        }
    }

    /// Resume with state from an earlier compile, so that a REPL line can
    /// reference globals and constants established by previous lines.
    pub fn new_with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::default()],
            scope_index: 0,
        }
    }

    /// Hand the symbol table and constants back for the next cycle.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    pub fn compile(&mut self, program: &Program) -> CompileResult<()> {
        for stmt in &program.statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.current_instructions().clone(),
            constants: self.constants.clone(),
        }
    }

    // --- Statements ---

    fn compile_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Expression { expr } => {
                self.compile_expr(expr)?;
                // Leave the stack empty between statements; the VM remembers
                // the popped slot as the program value.
                self.emit(Opcode::Pop, &[]);
                Ok(())
            }
            StmtKind::VarDeclaration {
                name,
                value,
                constant,
            } => self.compile_var_declaration(name, value.as_ref(), *constant, stmt.line()),
            StmtKind::VarAssignment { name, value } => {
                self.compile_var_assignment(name, value, stmt.line())
            }
            StmtKind::Return { value } => {
                self.compile_expr(value)?;
                self.emit(Opcode::ReturnValue, &[]);
                Ok(())
            }
            StmtKind::For { condition, body } => self.compile_for(condition, body),
        }
    }

    fn compile_block(&mut self, block: &BlockStmt) -> CompileResult<()> {
        for stmt in &block.statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_var_declaration(
        &mut self,
        name: &str,
        value: Option<&Expr>,
        constant: bool,
        line: usize,
    ) -> CompileResult<()> {
        // A function-self binding may be shadowed; anything else may not.
        if let Some(existing) = self.symbol_table.defined_locally(name) {
            if existing.scope != SymbolScope::Function {
                return Err(CompileError::Redeclaration {
                    name: name.to_string(),
                    line,
                });
            }
        }

        // Define before compiling the initializer, so a bound function
        // literal can resolve its own name.
        let symbol = if constant {
            self.symbol_table.define_immutable(name)
        } else {
            self.symbol_table.define_mutable(name)
        };

        match value {
            Some(expr) => self.compile_expr(expr)?,
            None => {
                self.emit(Opcode::Null, &[]);
            }
        }

        let op = match (symbol.scope, constant) {
            (SymbolScope::Global, true) => Opcode::SetImmutableGlobal,
            (SymbolScope::Global, false) => Opcode::SetMutableGlobal,
            (_, true) => Opcode::SetImmutableLocal,
            (_, false) => Opcode::SetMutableLocal,
        };
        self.emit(op, &[symbol.index]);
        Ok(())
    }

    fn compile_var_assignment(
        &mut self,
        name: &str,
        value: &Expr,
        line: usize,
    ) -> CompileResult<()> {
        self.compile_expr(value)?;

        let Some(symbol) = self.symbol_table.resolve(name) else {
            return Err(CompileError::UndefinedVariable {
                name: name.to_string(),
                line,
            });
        };
        if symbol.constant {
            return Err(CompileError::AssignToConstant {
                name: name.to_string(),
                line,
            });
        }

        match symbol.scope {
            SymbolScope::Global => {
                self.emit(Opcode::SetMutableGlobal, &[symbol.index]);
            }
            SymbolScope::Local => {
                self.emit(Opcode::SetMutableLocal, &[symbol.index]);
            }
            // Captures are by value at closure creation; a store into the
            // free list would not reach the origin.
            _ => {
                return Err(CompileError::CapturedAssignment {
                    name: name.to_string(),
                    line,
                })
            }
        }
        Ok(())
    }

    fn compile_for(&mut self, condition: &Expr, body: &BlockStmt) -> CompileResult<()> {
        let condition_pos = self.current_instructions().len();

        self.compile_expr(condition)?;
        let jump_not_truthy_pos = self.emit(Opcode::JumpNotTruthy, &[9999]);

        self.compile_block(body)?;
        self.emit(Opcode::Jump, &[condition_pos]);

        let after_body_pos = self.current_instructions().len();
        self.change_operand(jump_not_truthy_pos, after_body_pos);

        self.emit(Opcode::Null, &[]);
        self.emit(Opcode::Pop, &[]);
        Ok(())
    }

    // --- Expressions ---

    fn compile_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::IntegerLit(n) => {
                let index = self.add_constant(Value::Int(*n));
                self.emit(Opcode::Constant, &[index]);
            }
            ExprKind::FloatLit(n) => {
                let index = self.add_constant(Value::Float(*n));
                self.emit(Opcode::Constant, &[index]);
            }
            ExprKind::StringLit(s) => {
                let index = self.add_constant(Value::string(s.as_str()));
                self.emit(Opcode::Constant, &[index]);
            }
            ExprKind::BooleanLit(true) => {
                self.emit(Opcode::True, &[]);
            }
            ExprKind::BooleanLit(false) => {
                self.emit(Opcode::False, &[]);
            }
            ExprKind::NullLit => {
                self.emit(Opcode::Null, &[]);
            }
            ExprKind::Identifier(name) => {
                let Some(symbol) = self.symbol_table.resolve(name) else {
                    return Err(CompileError::UndefinedVariable {
                        name: name.clone(),
                        line: expr.line(),
                    });
                };
                self.load_symbol(&symbol);
            }
            ExprKind::Prefix { operator, right } => {
                self.compile_expr(right)?;
                match operator {
                    PrefixOperator::Bang => self.emit(Opcode::Bang, &[]),
                    PrefixOperator::Minus => self.emit(Opcode::Minus, &[]),
                };
            }
            ExprKind::Infix {
                operator,
                left,
                right,
            } => self.compile_infix(*operator, left, right)?,
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => self.compile_if(condition, consequence, alternative.as_ref())?,
            ExprKind::ArrayLit(elements) => {
                for element in elements {
                    self.compile_expr(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }
            ExprKind::HashLit(pairs) => {
                // Sort keys by their rendering so codegen is deterministic.
                let mut ordered: Vec<&(Expr, Expr)> = pairs.iter().collect();
                ordered.sort_by_key(|(key, _)| key.to_string());

                for (key, value) in ordered {
                    self.compile_expr(key)?;
                    self.compile_expr(value)?;
                }
                self.emit(Opcode::Hash, &[pairs.len() * 2]);
            }
            ExprKind::Index { left, index } => {
                self.compile_expr(left)?;
                self.compile_expr(index)?;
                self.emit(Opcode::Index, &[]);
            }
            ExprKind::Call {
                function,
                arguments,
            } => {
                self.compile_expr(function)?;
                for argument in arguments {
                    self.compile_expr(argument)?;
                }
                self.emit(Opcode::Call, &[arguments.len()]);
            }
            ExprKind::Function {
                parameters,
                body,
                name,
            } => self.compile_function(parameters, body, name.as_deref())?,
        }
        Ok(())
    }

    /// `<` and `<=` compile the right operand first and use the swapped
    /// greater-than opcodes, so the VM only implements one direction.
    fn compile_infix(
        &mut self,
        operator: InfixOperator,
        left: &Expr,
        right: &Expr,
    ) -> CompileResult<()> {
        if operator == InfixOperator::Less || operator == InfixOperator::LessEqual {
            self.compile_expr(right)?;
            self.compile_expr(left)?;
            let op = if operator == InfixOperator::Less {
                Opcode::Gt
            } else {
                Opcode::Gte
            };
            self.emit(op, &[]);
            return Ok(());
        }

        self.compile_expr(left)?;
        self.compile_expr(right)?;

        let op = match operator {
            InfixOperator::Plus => Opcode::Add,
            InfixOperator::Minus => Opcode::Sub,
            InfixOperator::Star => Opcode::Mul,
            InfixOperator::Slash => Opcode::Div,
            InfixOperator::Percent => Opcode::Mod,
            InfixOperator::Equal => Opcode::Equal,
            InfixOperator::NotEqual => Opcode::NotEqual,
            InfixOperator::Greater => Opcode::Gt,
            InfixOperator::GreaterEqual => Opcode::Gte,
            InfixOperator::And => Opcode::And,
            InfixOperator::Or => Opcode::Or,
            InfixOperator::Less | InfixOperator::LessEqual => unreachable!("handled above"),
        };
        self.emit(op, &[]);
        Ok(())
    }

    /// `if` is an expression: both arms leave a value on the stack, with a
    /// synthesized null when the alternative is absent.
    fn compile_if(
        &mut self,
        condition: &Expr,
        consequence: &BlockStmt,
        alternative: Option<&BlockStmt>,
    ) -> CompileResult<()> {
        self.compile_expr(condition)?;

        // Operand patched once the consequence length is known.
        let jump_not_truthy_pos = self.emit(Opcode::JumpNotTruthy, &[9999]);

        self.compile_block(consequence)?;
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last_pop();
        }

        let jump_pos = self.emit(Opcode::Jump, &[9999]);

        let after_consequence_pos = self.current_instructions().len();
        self.change_operand(jump_not_truthy_pos, after_consequence_pos);

        match alternative {
            None => {
                self.emit(Opcode::Null, &[]);
            }
            Some(alternative) => {
                self.compile_block(alternative)?;
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last_pop();
                }
            }
        }

        let after_alternative_pos = self.current_instructions().len();
        self.change_operand(jump_pos, after_alternative_pos);
        Ok(())
    }

    fn compile_function(
        &mut self,
        parameters: &[String],
        body: &BlockStmt,
        name: Option<&str>,
    ) -> CompileResult<()> {
        self.enter_scope();

        if let Some(name) = name {
            self.symbol_table.define_function_name(name);
        }
        for parameter in parameters {
            self.symbol_table.define_immutable(parameter);
        }

        self.compile_block(body)?;

        if self.last_instruction_is(Opcode::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Return, &[]);
        }

        let free_symbols = self.symbol_table.free_symbols.clone();
        let num_locals = self.symbol_table.num_definitions;
        let instructions = self.leave_scope();

        // Load each captured value in declaration order so the closure's
        // free list lines up with the OpGetFree indices inside.
        for symbol in &free_symbols {
            self.load_symbol(symbol);
        }

        let func = CompiledFunction {
            instructions,
            num_locals,
            num_parameters: parameters.len(),
        };
        let index = self.add_constant(Value::CompiledFunction(Rc::new(func)));
        self.emit(Opcode::Closure, &[index, free_symbols.len()]);
        Ok(())
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Opcode::GetFree, &[symbol.index]),
            SymbolScope::Function => self.emit(Opcode::CurrentClosure, &[]),
        };
    }

    // --- Emission helpers ---

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.scopes[self.scope_index]
            .instructions
            .push_instruction(&instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    fn current_instructions(&self) -> &Instructions {
        &self.scopes[self.scope_index].instructions
    }

    fn set_last_instruction(&mut self, opcode: Opcode, position: usize) {
        let scope = &mut self.scopes[self.scope_index];
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode, position });
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        self.scopes[self.scope_index]
            .last_instruction
            .is_some_and(|last| last.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = &mut self.scopes[self.scope_index];
        if let Some(last) = scope.last_instruction {
            scope.instructions.truncate(last.position);
            scope.last_instruction = scope.previous_instruction;
            scope.previous_instruction = None;
        }
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = &mut self.scopes[self.scope_index];
        if let Some(last) = &mut scope.last_instruction {
            let position = last.position;
            last.opcode = Opcode::ReturnValue;
            scope
                .instructions
                .replace_at(position, &make(Opcode::ReturnValue, &[]));
        }
    }

    /// Re-encode the instruction at `position` with a new operand. Only
    /// used for same-width patches (jump targets).
    fn change_operand(&mut self, position: usize, operand: usize) {
        let scope = &mut self.scopes[self.scope_index];
        let op = Opcode::from_byte(read_u8(&scope.instructions.0[position..]))
            .expect("patching an instruction the compiler emitted");
        scope
            .instructions
            .replace_at(position, &make(op, &[operand]));
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.scope_index += 1;

        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::enclosed(Box::new(outer));
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().unwrap_or_default();
        self.scope_index -= 1;

        if let Some(outer) = self.symbol_table.outer.take() {
            self.symbol_table = *outer;
        }

        scope.instructions
    }
}
