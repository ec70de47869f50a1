//! Lexically-scoped symbol table used during compilation.
//!
//! Resolves names to storage locations: globals, frame locals, built-ins,
//! captured free variables, or the function's own name. Resolving a name
//! from an enclosing function scope records it as a free symbol so that the
//! compiler can emit the capture loads in declaration order.

use std::collections::HashMap;

/// Where a symbol lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    Builtin,
    Free,
    /// The function's own binding name; loads become `OpCurrentClosure`, so
    /// self-reference needs no capture.
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
    pub constant: bool,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    pub outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,
    pub num_definitions: usize,
    /// Symbols captured from enclosing scopes, in resolution order. The
    /// stored entries keep their ORIGINAL scope so the enclosing compiler
    /// scope emits the right load for each capture.
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enclosed(outer: Box<SymbolTable>) -> Self {
        Self {
            outer: Some(outer),
            ..Self::default()
        }
    }

    pub fn define_mutable(&mut self, name: &str) -> Symbol {
        self.define(name, false)
    }

    pub fn define_immutable(&mut self, name: &str) -> Symbol {
        self.define(name, true)
    }

    fn define(&mut self, name: &str, constant: bool) -> Symbol {
        let scope = if self.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
            constant,
        };
        self.store.insert(name.to_string(), symbol.clone());
        self.num_definitions += 1;
        symbol
    }

    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
            constant: true,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Function,
            index: 0,
            constant: true,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: self.free_symbols.len(),
            constant: original.constant,
        };
        self.free_symbols.push(original);
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Resolve a name, walking outward. A hit in an enclosing function
    /// scope (not global, not builtin) is converted into a free symbol of
    /// this table.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }

        let symbol = self.outer.as_mut()?.resolve(name)?;
        if matches!(symbol.scope, SymbolScope::Global | SymbolScope::Builtin) {
            return Some(symbol);
        }
        Some(self.define_free(symbol))
    }

    /// Look only at this table, without triggering any capture.
    pub fn defined_locally(&self, name: &str) -> Option<&Symbol> {
        self.store.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_scopes() {
        let mut global = SymbolTable::new();
        let a = global.define_mutable("a");
        assert_eq!(a.scope, SymbolScope::Global);
        assert_eq!(a.index, 0);
        let b = global.define_immutable("b");
        assert_eq!(b.index, 1);
        assert!(b.constant);

        let mut local = SymbolTable::enclosed(Box::new(global));
        let c = local.define_mutable("c");
        assert_eq!(c.scope, SymbolScope::Local);
        assert_eq!(c.index, 0);
    }

    #[test]
    fn test_resolve_global_through_nesting() {
        let mut global = SymbolTable::new();
        global.define_mutable("a");

        let first = SymbolTable::enclosed(Box::new(global));
        let mut second = SymbolTable::enclosed(Box::new(first));

        let a = second.resolve("a").unwrap();
        assert_eq!(a.scope, SymbolScope::Global);
        assert!(second.free_symbols.is_empty(), "globals are not captured");
    }

    #[test]
    fn test_resolve_free() {
        let mut global = SymbolTable::new();
        global.define_mutable("a");

        let mut first = SymbolTable::enclosed(Box::new(global));
        first.define_mutable("b");

        let mut second = SymbolTable::enclosed(Box::new(first));
        second.define_mutable("c");

        // `b` lives in the enclosing function: captured as free index 0.
        let b = second.resolve("b").unwrap();
        assert_eq!(b.scope, SymbolScope::Free);
        assert_eq!(b.index, 0);

        // The recorded original keeps its Local scope for the load.
        assert_eq!(second.free_symbols[0].scope, SymbolScope::Local);
        assert_eq!(second.free_symbols[0].name, "b");

        // Resolving again reuses the same free slot.
        let again = second.resolve("b").unwrap();
        assert_eq!(again.index, 0);
        assert_eq!(second.free_symbols.len(), 1);

        // Locals and globals resolve without capture.
        assert_eq!(second.resolve("c").unwrap().scope, SymbolScope::Local);
        assert_eq!(second.resolve("a").unwrap().scope, SymbolScope::Global);
    }

    #[test]
    fn test_define_and_resolve_builtins() {
        let mut global = SymbolTable::new();
        global.define_builtin(0, "len");
        global.define_builtin(1, "print");

        let mut nested = SymbolTable::enclosed(Box::new(global));
        let len = nested.resolve("len").unwrap();
        assert_eq!(len.scope, SymbolScope::Builtin);
        assert_eq!(len.index, 0);
        assert!(len.constant);
        assert!(nested.free_symbols.is_empty());
    }

    #[test]
    fn test_function_name_shadowable_by_parameter() {
        let mut table = SymbolTable::new();
        table.define_function_name("f");
        assert_eq!(table.resolve("f").unwrap().scope, SymbolScope::Function);

        // A parameter named like the function wins.
        table.define_immutable("f");
        assert_eq!(table.resolve("f").unwrap().scope, SymbolScope::Global);
    }

    #[test]
    fn test_free_symbol_keeps_constness() {
        let mut outer = SymbolTable::new();
        outer.define_mutable("seed");
        let mut fn_scope = SymbolTable::enclosed(Box::new(outer));
        fn_scope.define_immutable("k");
        let mut inner = SymbolTable::enclosed(Box::new(fn_scope));

        let k = inner.resolve("k").unwrap();
        assert_eq!(k.scope, SymbolScope::Free);
        assert!(k.constant);
    }
}
