//! The bytecode virtual machine — a stack-based execution engine.
//!
//! A fixed-size value stack, a globals array shared across runs (so REPL
//! lines accumulate), and a frame stack. The top-level program executes as
//! a frame over a nullary closure wrapping the compiled instructions. The
//! last popped stack slot stays readable, exposing the program's value.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::interpreter::builtins::BUILTINS;
use crate::interpreter::value::{HashPair, Value, FALSE, NULL, TRUE};
use crate::vm::closure::{Closure, CompiledFunction};
use crate::vm::compiler::Bytecode;
use crate::vm::frame::Frame;
use crate::vm::opcode::{read_u16, read_u8, Opcode};

pub const STACK_SIZE: usize = 2048;
pub const GLOBALS_SIZE: usize = 65536;
pub const MAX_FRAMES: usize = 1024;

/// The virtual machine.
pub struct Vm {
    constants: Vec<Value>,
    stack: Vec<Value>,
    /// Always points at the next free slot; the top of stack is `sp - 1`.
    sp: usize,
    globals: Vec<Value>,
    frames: Vec<Frame>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self {
            constants: Vec::new(),
            stack: vec![NULL; STACK_SIZE],
            sp: 0,
            globals: vec![NULL; GLOBALS_SIZE],
            frames: Vec::with_capacity(MAX_FRAMES),
        }
    }

    /// Execute a compiled program. Globals survive across calls; the stack
    /// and frames reset. Returns when the main frame's instruction pointer
    /// passes the end of its instructions.
    pub fn run(&mut self, bytecode: &Bytecode) -> Result<(), RuntimeError> {
        self.constants = bytecode.constants.clone();

        let main_fn = Rc::new(CompiledFunction {
            instructions: bytecode.instructions.clone(),
            num_locals: 0,
            num_parameters: 0,
        });
        let main_closure = Rc::new(Closure {
            func: main_fn,
            free: Vec::new(),
        });
        self.frames.clear();
        self.frames.push(Frame::new(main_closure, 0));
        self.sp = 0;

        self.dispatch()
    }

    /// The value most recently popped off the stack: the observable result
    /// of the last expression statement.
    pub fn last_popped(&self) -> &Value {
        &self.stack[self.sp]
    }

    // --- Dispatch loop ---

    fn dispatch(&mut self) -> Result<(), RuntimeError> {
        loop {
            let frame_idx = self.frames.len() - 1;
            let ip = self.frames[frame_idx].ip;
            if ip >= self.frames[frame_idx].instructions().len() {
                return Ok(());
            }

            let byte = self.frames[frame_idx].instructions().0[ip];
            let op = Opcode::from_byte(byte).ok_or_else(|| RuntimeError::UnknownOperator {
                operator: format!("opcode {}", byte),
            })?;
            self.frames[frame_idx].ip += 1;

            match op {
                Opcode::Constant => {
                    let index = self.read_u16_operand(frame_idx);
                    let value = self.constants[index].clone();
                    self.push(value)?;
                }
                Opcode::Pop => {
                    self.pop();
                }

                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                    self.execute_binary_operation(op)?;
                }

                Opcode::True => self.push(TRUE)?,
                Opcode::False => self.push(FALSE)?,
                Opcode::Null => self.push(NULL)?,

                Opcode::Equal => {
                    let right = self.pop();
                    let left = self.pop();
                    self.push(bool_value(left.lang_eq(&right)))?;
                }
                Opcode::NotEqual => {
                    let right = self.pop();
                    let left = self.pop();
                    self.push(bool_value(!left.lang_eq(&right)))?;
                }
                Opcode::Gt | Opcode::Gte => {
                    self.execute_comparison(op)?;
                }
                Opcode::And => {
                    let right = self.pop();
                    let left = self.pop();
                    self.push(bool_value(left.is_truthy() && right.is_truthy()))?;
                }
                Opcode::Or => {
                    let right = self.pop();
                    let left = self.pop();
                    self.push(bool_value(left.is_truthy() || right.is_truthy()))?;
                }

                Opcode::Bang => {
                    let operand = self.pop();
                    self.push(bool_value(operand.is_bang_falsy()))?;
                }
                Opcode::Minus => {
                    let operand = self.pop();
                    match operand {
                        Value::Int(n) => self.push(Value::Int(-n))?,
                        Value::Float(n) => self.push(Value::Float(-n))?,
                        other => {
                            return Err(RuntimeError::UnsupportedNegation {
                                operand: other.type_name().to_string(),
                            })
                        }
                    }
                }

                Opcode::Jump => {
                    let target = self.read_u16_operand(frame_idx);
                    self.frames[frame_idx].ip = target;
                }
                Opcode::JumpNotTruthy => {
                    let target = self.read_u16_operand(frame_idx);
                    let condition = self.pop();
                    if !condition.is_truthy() {
                        self.frames[frame_idx].ip = target;
                    }
                }

                // The mutable/immutable split is a compile-time contract;
                // the VM stores both the same way.
                Opcode::SetMutableGlobal | Opcode::SetImmutableGlobal => {
                    let index = self.read_u16_operand(frame_idx);
                    self.globals[index] = self.pop();
                }
                Opcode::GetGlobal => {
                    let index = self.read_u16_operand(frame_idx);
                    let value = self.globals[index].clone();
                    self.push(value)?;
                }
                Opcode::SetMutableLocal | Opcode::SetImmutableLocal => {
                    let index = self.read_u8_operand(frame_idx);
                    let base = self.frames[frame_idx].base_pointer;
                    self.stack[base + index] = self.pop();
                }
                Opcode::GetLocal => {
                    let index = self.read_u8_operand(frame_idx);
                    let base = self.frames[frame_idx].base_pointer;
                    let value = self.stack[base + index].clone();
                    self.push(value)?;
                }
                Opcode::GetBuiltin => {
                    let index = self.read_u8_operand(frame_idx);
                    self.push(Value::Builtin(&BUILTINS[index]))?;
                }
                Opcode::GetFree => {
                    let index = self.read_u8_operand(frame_idx);
                    let value = self.frames[frame_idx].closure.free[index].clone();
                    self.push(value)?;
                }
                Opcode::CurrentClosure => {
                    let closure = self.frames[frame_idx].closure.clone();
                    self.push(Value::Closure(closure))?;
                }

                Opcode::Array => {
                    let count = self.read_u16_operand(frame_idx);
                    let elements = self.stack[self.sp - count..self.sp].to_vec();
                    self.sp -= count;
                    self.push(Value::array(elements))?;
                }
                Opcode::Hash => {
                    let count = self.read_u16_operand(frame_idx);
                    let hash = self.build_hash(count)?;
                    self.sp -= count;
                    self.push(hash)?;
                }
                Opcode::Index => {
                    let index = self.pop();
                    let left = self.pop();
                    self.execute_index(left, index)?;
                }

                Opcode::Call => {
                    let num_args = self.read_u8_operand(frame_idx);
                    self.call_value(num_args)?;
                }
                Opcode::ReturnValue => {
                    let value = self.pop();
                    let frame = self.frames.pop().expect("a frame is executing");
                    self.sp = frame.base_pointer.saturating_sub(1);
                    if self.frames.is_empty() {
                        // A top-level return ends the program; leave the
                        // value where `last_popped` reads it.
                        self.stack[self.sp] = value;
                        return Ok(());
                    }
                    self.push(value)?;
                }
                Opcode::Return => {
                    let frame = self.frames.pop().expect("a frame is executing");
                    self.sp = frame.base_pointer.saturating_sub(1);
                    if self.frames.is_empty() {
                        self.stack[self.sp] = NULL;
                        return Ok(());
                    }
                    self.push(NULL)?;
                }

                Opcode::Closure => {
                    let const_index = self.read_u16_operand(frame_idx);
                    let num_free = self.read_u8_operand(frame_idx);
                    self.push_closure(const_index, num_free)?;
                }
            }
        }
    }

    // --- Stack primitives ---

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Value {
        if self.sp == 0 {
            return NULL;
        }
        self.sp -= 1;
        self.stack[self.sp].clone()
    }

    fn read_u16_operand(&mut self, frame_idx: usize) -> usize {
        let frame = &mut self.frames[frame_idx];
        let value = read_u16(&frame.closure.func.instructions.0[frame.ip..]) as usize;
        frame.ip += 2;
        value
    }

    fn read_u8_operand(&mut self, frame_idx: usize) -> usize {
        let frame = &mut self.frames[frame_idx];
        let value = read_u8(&frame.closure.func.instructions.0[frame.ip..]) as usize;
        frame.ip += 1;
        value
    }

    // --- Operations ---

    fn execute_binary_operation(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop();
        let left = self.pop();

        match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => {
                let result = match op {
                    Opcode::Add => a.wrapping_add(*b),
                    Opcode::Sub => a.wrapping_sub(*b),
                    Opcode::Mul => a.wrapping_mul(*b),
                    Opcode::Div | Opcode::Mod if *b == 0 => {
                        return Err(RuntimeError::DivisionByZero)
                    }
                    Opcode::Div => a / b,
                    _ => a % b,
                };
                self.push(Value::Int(result))
            }
            (Value::Float(a), Value::Float(b)) => {
                let result = match op {
                    Opcode::Add => a + b,
                    Opcode::Sub => a - b,
                    Opcode::Mul => a * b,
                    Opcode::Div => a / b,
                    _ => a % b,
                };
                self.push(Value::Float(result))
            }
            (Value::String(a), Value::String(b)) if op == Opcode::Add => {
                self.push(Value::string(format!("{}{}", a, b)))
            }
            _ => Err(RuntimeError::UnsupportedTypes {
                left: left.type_name().to_string(),
                right: right.type_name().to_string(),
            }),
        }
    }

    fn execute_comparison(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop();
        let left = self.pop();

        let result = match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => {
                if op == Opcode::Gt {
                    a > b
                } else {
                    a >= b
                }
            }
            (Value::Float(a), Value::Float(b)) => {
                if op == Opcode::Gt {
                    a > b
                } else {
                    a >= b
                }
            }
            _ => {
                return Err(RuntimeError::UnsupportedTypes {
                    left: left.type_name().to_string(),
                    right: right.type_name().to_string(),
                })
            }
        };
        self.push(bool_value(result))
    }

    /// Collect `count` stack values (2N) into N hash pairs. Keys must be
    /// hashable; a later duplicate key overwrites the earlier value.
    fn build_hash(&mut self, count: usize) -> Result<Value, RuntimeError> {
        let mut pairs = IndexMap::new();
        let mut slot = self.sp - count;
        while slot < self.sp {
            let key = self.stack[slot].clone();
            let value = self.stack[slot + 1].clone();
            let hash_key = key.hash_key().ok_or_else(|| RuntimeError::UnhashableKey {
                key: key.type_name().to_string(),
            })?;
            pairs.insert(hash_key, HashPair { key, value });
            slot += 2;
        }
        Ok(Value::hash(pairs))
    }

    fn execute_index(&mut self, left: Value, index: Value) -> Result<(), RuntimeError> {
        match (&left, &index) {
            (Value::Array(elements), Value::Int(i)) => {
                let elements = elements.borrow();
                let length = elements.len() as i64;
                // Negative indices wrap from the back: -1 is the last element.
                let idx = if *i < 0 { length + i } else { *i };
                let value = if idx < 0 || idx >= length {
                    NULL
                } else {
                    elements[idx as usize].clone()
                };
                drop(elements);
                self.push(value)
            }
            (Value::Hash(pairs), key) => {
                let hash_key = key.hash_key().ok_or_else(|| RuntimeError::UnhashableKey {
                    key: key.type_name().to_string(),
                })?;
                let value = pairs
                    .borrow()
                    .get(&hash_key)
                    .map(|pair| pair.value.clone())
                    .unwrap_or(NULL);
                self.push(value)
            }
            _ => Err(RuntimeError::IndexNotSupported {
                left: left.type_name().to_string(),
            }),
        }
    }

    /// The callee sits below its arguments at `stack[sp - 1 - num_args]`.
    fn call_value(&mut self, num_args: usize) -> Result<(), RuntimeError> {
        let callee = self.stack[self.sp - 1 - num_args].clone();
        match callee {
            Value::Closure(closure) => self.call_closure(closure, num_args),
            Value::Builtin(builtin) => {
                let args = self.stack[self.sp - num_args..self.sp].to_vec();
                let result = (builtin.func)(&args).map_err(RuntimeError::Builtin)?;
                // The callee and arguments are replaced by the result.
                self.sp = self.sp - num_args - 1;
                self.push(result)
            }
            other => Err(RuntimeError::NotCallable {
                callee: other.type_name().to_string(),
            }),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, num_args: usize) -> Result<(), RuntimeError> {
        if num_args != closure.func.num_parameters {
            return Err(RuntimeError::WrongArgumentCount {
                want: closure.func.num_parameters,
                got: num_args,
            });
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::StackOverflow);
        }

        let base_pointer = self.sp - num_args;
        let num_locals = closure.func.num_locals;
        self.frames.push(Frame::new(closure, base_pointer));
        // Arguments occupy the first local slots; reserve the rest.
        self.sp = base_pointer + num_locals;
        Ok(())
    }

    fn push_closure(&mut self, const_index: usize, num_free: usize) -> Result<(), RuntimeError> {
        let Value::CompiledFunction(func) = self.constants[const_index].clone() else {
            return Err(RuntimeError::NotCallable {
                callee: self.constants[const_index].type_name().to_string(),
            });
        };

        let free = self.stack[self.sp - num_free..self.sp].to_vec();
        self.sp -= num_free;
        self.push(Value::Closure(Rc::new(Closure { func, free })))
    }
}

fn bool_value(b: bool) -> Value {
    if b {
        TRUE
    } else {
        FALSE
    }
}
