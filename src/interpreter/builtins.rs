//! The fixed catalog of built-in functions.
//!
//! Both back-ends share this table. Declaration order matters: the compiler
//! pre-populates its symbol table from it and encodes built-ins by index, so
//! reordering entries changes emitted bytecode.

use indexmap::IndexMap;

use crate::interpreter::value::{HashPair, Value};

/// A native function. Failures are plain messages; each back-end wraps them
/// in its own error representation.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, String>;

#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

pub static BUILTINS: [Builtin; 9] = [
    Builtin {
        name: "len",
        func: builtin_len,
    },
    Builtin {
        name: "print",
        func: builtin_print,
    },
    Builtin {
        name: "first",
        func: builtin_first,
    },
    Builtin {
        name: "last",
        func: builtin_last,
    },
    Builtin {
        name: "rest",
        func: builtin_rest,
    },
    Builtin {
        name: "append",
        func: builtin_append,
    },
    Builtin {
        name: "slice",
        func: builtin_slice,
    },
    Builtin {
        name: "keys",
        func: builtin_keys,
    },
    Builtin {
        name: "values",
        func: builtin_values,
    },
];

pub fn builtin_by_name(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

fn builtin_len(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("`len` expects one argument".to_string());
    }
    match &args[0] {
        Value::String(s) => Ok(Value::Int(s.len() as i64)),
        Value::Array(elements) => Ok(Value::Int(elements.borrow().len() as i64)),
        other => Err(format!(
            "argument to `len` of wrong type. got={}",
            other.type_name()
        )),
    }
}

/// Writes each argument's inspection joined by spaces, then a newline.
fn builtin_print(args: &[Value]) -> Result<Value, String> {
    let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    println!("{}", rendered.join(" "));
    Ok(Value::Null)
}

fn builtin_first(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("`first` expects a single argument".to_string());
    }
    match &args[0] {
        Value::Array(elements) => Ok(elements.borrow().first().cloned().unwrap_or(Value::Null)),
        _ => Err("argument to `first` must be array type".to_string()),
    }
}

fn builtin_last(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("`last` expects a single argument".to_string());
    }
    match &args[0] {
        Value::Array(elements) => Ok(elements.borrow().last().cloned().unwrap_or(Value::Null)),
        _ => Err("argument to `last` must be array type".to_string()),
    }
}

fn builtin_rest(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("`rest` expects one argument".to_string());
    }
    match &args[0] {
        Value::Array(elements) => {
            let elements = elements.borrow();
            if elements.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(Value::array(elements[1..].to_vec()))
            }
        }
        _ => Err("argument to `rest` must be array type".to_string()),
    }
}

/// Returns a new array; the caller's array is not mutated.
fn builtin_append(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("`append` expects two arguments".to_string());
    }
    match &args[0] {
        Value::Array(elements) => {
            let mut extended = elements.borrow().clone();
            extended.push(args[1].clone());
            Ok(Value::array(extended))
        }
        _ => Err("first argument to `append` must be array type".to_string()),
    }
}

/// `slice(array, start, end)` — end-exclusive, with `start` clamped up to 0
/// and `end` clamped down to len-1.
fn builtin_slice(args: &[Value]) -> Result<Value, String> {
    if args.len() != 3 {
        return Err("`slice` expects three arguments".to_string());
    }
    let elements = match &args[0] {
        Value::Array(elements) => elements.borrow(),
        _ => return Err("first argument to `slice` must be array type".to_string()),
    };
    let start = match &args[1] {
        Value::Int(n) => *n,
        _ => return Err("`start` argument to `slice` must be int".to_string()),
    };
    let end = match &args[2] {
        Value::Int(n) => *n,
        _ => return Err("`end` argument to `slice` must be int".to_string()),
    };

    let max_end = elements.len() as i64 - 1;
    let start = start.max(0);
    let end = end.min(max_end);
    if end <= start {
        return Ok(Value::array(Vec::new()));
    }
    Ok(Value::array(
        elements[start as usize..end as usize].to_vec(),
    ))
}

fn builtin_keys(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("`keys` expects one argument".to_string());
    }
    match &args[0] {
        Value::Hash(pairs) => {
            let keys: Vec<Value> = pairs.borrow().values().map(|p| p.key.clone()).collect();
            Ok(Value::array(keys))
        }
        other => Err(format!(
            "argument to `keys` must be hash type. got={}",
            other.type_name()
        )),
    }
}

fn builtin_values(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("`values` expects one argument".to_string());
    }
    match &args[0] {
        Value::Hash(pairs) => {
            let values: Vec<Value> = pairs.borrow().values().map(|p| p.value.clone()).collect();
            Ok(Value::array(values))
        }
        other => Err(format!(
            "argument to `values` must be hash type. got={}",
            other.type_name()
        )),
    }
}

/// Convenience for tests and callers assembling hashes natively.
pub fn hash_from_pairs(pairs: Vec<(Value, Value)>) -> Result<Value, String> {
    let mut map = IndexMap::new();
    for (key, value) in pairs {
        let hash_key = key
            .hash_key()
            .ok_or_else(|| format!("unusable as hash key: {}", key.type_name()))?;
        map.insert(hash_key, HashPair { key, value });
    }
    Ok(Value::hash(map))
}
