// Minimal builtin library: print, type.

use crate::rill_value::{NativeFn, Value};
use crate::rill_vm::{RillResult, RillVM};

const BUILTINS: [(&str, NativeFn); 2] = [("print", rill_print), ("type", rill_type)];

/// Register the builtin functions as globals.
pub fn open_stdlib(vm: &mut RillVM) {
    for (name, func) in BUILTINS {
        vm.set_global(name, Value::Native(func));
    }
}

/// print(v, ...) - write the arguments to stdout, space separated.
fn rill_print(_vm: &mut RillVM, args: &[Value]) -> RillResult<Value> {
    let line = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", line);
    Ok(Value::Undefined)
}

/// type(v) - the type name of the argument as a string.
fn rill_type(_vm: &mut RillVM, args: &[Value]) -> RillResult<Value> {
    let name = args.first().map_or("undefined", Value::type_name);
    Ok(Value::String(name.into()))
}
