//! Compiled functions and the closures that wrap them at runtime.

use crate::interpreter::value::Value;
use crate::vm::opcode::Instructions;

/// A unit of compiled code: the bytecode of one function body plus the
/// stack-slot accounting the VM needs when calling it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    /// Parameters plus locals; the VM reserves this many slots above the
    /// base pointer. Always at least `num_parameters`.
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A compiled function paired with the values captured from enclosing
/// scopes at its creation site, in declaration order.
#[derive(Debug, Clone)]
pub struct Closure {
    pub func: std::rc::Rc<CompiledFunction>,
    pub free: Vec<Value>,
}
