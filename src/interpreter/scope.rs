//! Runtime scope chain for the tree-walking evaluator.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::interpreter::value::Value;

/// A variable binding: the value, its mutability, and the line it was
/// declared on (cited when an assignment trips over a constant).
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub constant: bool,
    pub line: usize,
}

/// A scope: bindings plus a pointer to the enclosing scope. Lookup walks
/// outward; declaration is local to one scope.
#[derive(Debug, Default)]
pub struct Scope {
    store: HashMap<String, Binding>,
    outer: Option<Rc<RefCell<Scope>>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enclosed(outer: Rc<RefCell<Scope>>) -> Self {
        Self {
            store: HashMap::new(),
            outer: Some(outer),
        }
    }

    /// Declare a new binding in this scope. Redeclaring a name that already
    /// lives here is an error, as is a constant with a null initial value.
    pub fn declare(
        &mut self,
        name: &str,
        value: Value,
        constant: bool,
        line: usize,
    ) -> Result<(), String> {
        if self.store.contains_key(name) {
            return Err(format!("variable {} already declared", name));
        }
        if constant && matches!(value, Value::Null) {
            return Err(format!(
                "cannot declare constant {} with null value",
                name
            ));
        }
        self.bind(name, value, constant, line);
        Ok(())
    }

    /// Install a binding without declaration checks. Used for function
    /// parameters, which may legitimately be bound to null.
    pub fn bind(&mut self, name: &str, value: Value, constant: bool, line: usize) {
        self.store.insert(
            name.to_string(),
            Binding {
                value,
                constant,
                line,
            },
        );
    }

    /// Assign to the nearest scope that declares `name`; fails on a constant
    /// or an unknown name.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), String> {
        if let Some(binding) = self.store.get_mut(name) {
            if binding.constant {
                return Err(format!(
                    "attempt to assign a value to constant variable {}",
                    name
                ));
            }
            binding.value = value;
            return Ok(());
        }
        match &self.outer {
            Some(outer) => outer.borrow_mut().assign(name, value),
            None => Err(format!("undefined variable {}", name)),
        }
    }

    /// Look up a value, walking outward through enclosing scopes.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.store.get(name) {
            return Some(binding.value.clone());
        }
        self.outer.as_ref().and_then(|outer| outer.borrow().get(name))
    }
}
