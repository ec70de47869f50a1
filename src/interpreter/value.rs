//! Runtime values shared by the tree-walking evaluator and the VM.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::BlockStmt;
use crate::interpreter::builtins::Builtin;
use crate::interpreter::scope::Scope;
use crate::vm::{Closure, CompiledFunction};

/// Canonical singletons. Branching compares against these by value, which
/// coincides with identity since they carry no payload to diverge on.
pub const TRUE: Value = Value::Bool(true);
pub const FALSE: Value = Value::Bool(false);
pub const NULL: Value = Value::Null;

/// A runtime value.
///
/// Mutable composites (arrays, hashes) are shared by reference; strings and
/// compiled functions are shared immutable. `Return` and `Error` only occur
/// in the tree-walk path, where they bubble through block execution — the VM
/// reports errors through its `Result` channel instead.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Hash(Rc<RefCell<IndexMap<HashKey, HashPair>>>),
    Return(Box<Value>),
    Error { message: String, line: usize },
    Function(Rc<Function>),
    CompiledFunction(Rc<CompiledFunction>),
    Closure(Rc<Closure>),
    Builtin(&'static Builtin),
}

/// A user function in the tree-walk path: parameters, body, and the scope
/// captured at its creation site.
#[derive(Clone)]
pub struct Function {
    pub parameters: Vec<String>,
    pub body: BlockStmt,
    pub scope: Rc<RefCell<Scope>>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The captured scope may point back at this function; don't chase it.
        write!(f, "<func({})>", self.parameters.join(", "))
    }
}

/// Which hashable kind produced a `HashKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKind {
    Integer,
    Boolean,
    String,
}

/// A hash key: the value's kind plus a 64-bit digest. Integers digest to
/// their unsigned reinterpretation, booleans to 1/0, strings to the FNV-1a
/// of their UTF-8 bytes. Only integers, booleans, and strings are hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: HashKind,
    pub digest: u64,
}

/// The original key value alongside the stored value, so `keys` can hand
/// back what the program wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut digest = FNV_OFFSET;
    for &b in bytes {
        digest ^= b as u64;
        digest = digest.wrapping_mul(FNV_PRIME);
    }
    digest
}

impl Value {
    /// The value's type tag as it appears in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Boolean",
            Value::Null => "Null",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Hash(_) => "Hash",
            Value::Return(_) => "ReturnValue",
            Value::Error { .. } => "Error",
            Value::Function(_) => "Function",
            Value::CompiledFunction(_) => "CompiledFunction",
            Value::Closure(_) => "Closure",
            Value::Builtin(_) => "BuiltIn",
        }
    }

    /// Branch truthiness: only null and false are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    /// The `!` operator's notion of falsy, which additionally treats numeric
    /// zero as falsy even though branches do not.
    pub fn is_bang_falsy(&self) -> bool {
        match self {
            Value::Null | Value::Bool(false) => true,
            Value::Int(0) => true,
            Value::Float(n) => *n == 0.0,
            _ => false,
        }
    }

    /// Language-level `==`: integers, floats, booleans, and null compare by
    /// value; everything else by identity; mixed kinds are unequal.
    pub fn lang_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::CompiledFunction(a), Value::CompiledFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }

    /// The hash key for this value, or `None` if it is not hashable.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Int(n) => Some(HashKey {
                kind: HashKind::Integer,
                digest: *n as u64,
            }),
            Value::Bool(b) => Some(HashKey {
                kind: HashKind::Boolean,
                digest: u64::from(*b),
            }),
            Value::String(s) => Some(HashKey {
                kind: HashKind::String,
                digest: fnv1a(s.as_bytes()),
            }),
            _ => None,
        }
    }

    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn hash(pairs: IndexMap<HashKey, HashPair>) -> Value {
        Value::Hash(Rc::new(RefCell::new(pairs)))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error { .. })
    }
}

/// Structural equality, used by tests and assertions. The language's own
/// `==` is `lang_eq`, which compares composites by identity instead.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => *a.borrow() == *b.borrow(),
            (Value::Hash(a), Value::Hash(b)) => *a.borrow() == *b.borrow(),
            (Value::Return(a), Value::Return(b)) => a == b,
            (
                Value::Error { message: a, line: al },
                Value::Error { message: b, line: bl },
            ) => a == b && al == bl,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::CompiledFunction(a), Value::CompiledFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

/// The `inspect` form: what the REPL and `print` show.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(elements) => {
                let rendered: Vec<String> =
                    elements.borrow().iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Value::Hash(pairs) => {
                let rendered: Vec<String> = pairs
                    .borrow()
                    .values()
                    .map(|pair| format!("{}: {}", pair.key, pair.value))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Value::Return(inner) => write!(f, "{}", inner),
            Value::Error { message, line } => {
                write!(f, "Honk! Error: {} on line {}", message, line)
            }
            Value::Function(func) => write!(f, "func({})", func.parameters.join(", ")),
            Value::CompiledFunction(func) => {
                write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(func))
            }
            Value::Closure(closure) => write!(f, "Closure[{:p}]", Rc::as_ptr(closure)),
            Value::Builtin(builtin) => write!(f, "builtin function {}", builtin.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_key_digests() {
        assert_eq!(
            Value::Int(42).hash_key(),
            Some(HashKey {
                kind: HashKind::Integer,
                digest: 42,
            })
        );
        assert_eq!(
            Value::Int(-1).hash_key().unwrap().digest,
            u64::MAX,
            "integers digest to their unsigned reinterpretation"
        );
        assert_eq!(Value::Bool(true).hash_key().unwrap().digest, 1);
        assert_eq!(Value::Bool(false).hash_key().unwrap().digest, 0);

        // Equal strings digest equally, distinct strings differ.
        let a1 = Value::string("Hello World");
        let a2 = Value::string("Hello World");
        let b = Value::string("My name is quonk");
        assert_eq!(a1.hash_key(), a2.hash_key());
        assert_ne!(a1.hash_key(), b.hash_key());

        // Same digest, different kind: never collides.
        assert_ne!(Value::Int(1).hash_key(), Value::Bool(true).hash_key());

        assert_eq!(Value::Null.hash_key(), None);
        assert_eq!(Value::array(vec![]).hash_key(), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy(), "zero is truthy for branches");
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn test_bang_falsiness_quirk() {
        assert!(Value::Int(0).is_bang_falsy());
        assert!(Value::Float(0.0).is_bang_falsy());
        assert!(Value::Null.is_bang_falsy());
        assert!(!Value::Int(1).is_bang_falsy());
    }

    #[test]
    fn test_lang_eq_identity_for_composites() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = Value::array(vec![Value::Int(1)]);
        assert!(!a.lang_eq(&b), "distinct arrays are unequal by identity");
        assert!(a.lang_eq(&a.clone()), "a shared array equals itself");

        assert!(Value::Int(1).lang_eq(&Value::Int(1)));
        assert!(
            !Value::Int(1).lang_eq(&Value::Float(1.0)),
            "mixed kinds are unequal"
        );
    }

    #[test]
    fn test_inspect_forms() {
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::Float(3.0).to_string(), "3");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::string("abc").to_string(), "abc");
        assert_eq!(
            Value::array(vec![Value::Int(1), Value::Int(2)]).to_string(),
            "[1, 2]"
        );
        assert_eq!(
            Value::Error {
                message: "unknown operator: Boolean + Boolean".to_string(),
                line: 3,
            }
            .to_string(),
            "Honk! Error: unknown operator: Boolean + Boolean on line 3"
        );
    }
}
