//! Human-readable bytecode listings for the `compile` command and debugging.

use crate::interpreter::value::Value;
use crate::vm::compiler::Bytecode;

/// Disassemble a compiled program: the main instruction stream, the constant
/// pool, and a listing for every compiled function among the constants.
pub fn disassemble(bytecode: &Bytecode) -> String {
    let mut out = String::new();

    out.push_str("== main ==\n");
    out.push_str(&bytecode.instructions.to_string());

    if !bytecode.constants.is_empty() {
        out.push_str("\nconstants:\n");
        for (index, constant) in bytecode.constants.iter().enumerate() {
            out.push_str(&format!(
                "{:4}: {}\n",
                index,
                format_constant(constant)
            ));
        }
    }

    for (index, constant) in bytecode.constants.iter().enumerate() {
        if let Value::CompiledFunction(func) = constant {
            out.push_str(&format!(
                "\n== fn@{} (locals={}, params={}) ==\n",
                index, func.num_locals, func.num_parameters
            ));
            out.push_str(&func.instructions.to_string());
        }
    }

    out
}

fn format_constant(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::CompiledFunction(func) => {
            format!("<fn: {} bytes>", func.instructions.len())
        }
        other => other.to_string(),
    }
}
