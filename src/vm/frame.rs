//! VM call frames.

use std::rc::Rc;

use crate::vm::closure::Closure;
use crate::vm::opcode::Instructions;

/// An activation record: the executing closure, its instruction pointer,
/// and the base pointer locating this frame's locals on the value stack.
#[derive(Debug, Clone)]
pub struct Frame {
    pub closure: Rc<Closure>,
    pub ip: usize,
    pub base_pointer: usize,
}

impl Frame {
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base_pointer,
        }
    }

    pub fn instructions(&self) -> &Instructions {
        &self.closure.func.instructions
    }
}
