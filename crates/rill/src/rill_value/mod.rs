// Tagged value representation shared by the compiler, the interpreter and
// the embedding API. All heap payloads are Rc-shared; the global
// environment is the only long-lived root.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use ahash::RandomState;
use smol_str::SmolStr;

use crate::rill_vm::{Instruction, RillResult, RillVM};

/// Native (host) function callable from script code.
pub type NativeFn = fn(&mut RillVM, &[Value]) -> RillResult<Value>;

/// A tagged script value.
///
/// `Template` is the unbound artifact produced by the bytecode compiler;
/// it only ever lives on the operand stack between the compile step and
/// the closure-binding step and is not observable from script code.
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(SmolStr),
    Template(Rc<Chunk>),
    Closure(Rc<Closure>),
    Native(NativeFn),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Template(_) => "template",
            Value::Closure(_) | Value::Native(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Native(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Template(a), Value::Template(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => {
                // Integral values print without the trailing ".0"
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Template(c) => write!(f, "template: {}", c.name),
            Value::Closure(c) => write!(f, "function: {}", c.chunk.name),
            Value::Native(_) => write!(f, "function: native"),
        }
    }
}

/// Compiled template: the output of the bytecode compiler, not yet bound
/// to any scope.
#[derive(Debug)]
pub struct Chunk {
    pub name: SmolStr,
    pub code: Vec<Instruction>,
    pub consts: Vec<Value>,
    /// Global names referenced by `GetGlobal`/`SetGlobal`/`DeclGlobal`.
    pub names: Vec<SmolStr>,
    pub is_strict: bool,
}

impl Chunk {
    pub fn new(name: SmolStr) -> Self {
        Chunk {
            name,
            code: Vec::new(),
            consts: Vec::new(),
            names: Vec::new(),
            is_strict: false,
        }
    }
}

/// A mutable name -> value scope. This engine has a single global scope;
/// handles to it are Rc-shared so closures can carry both a declaration
/// and an execution scope without owning either.
#[derive(Debug, Default)]
pub struct Environment {
    vars: HashMap<SmolStr, Value, RandomState>,
}

pub type EnvRef = Rc<RefCell<Environment>>;

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Declare (or overwrite) a binding unconditionally.
    pub fn declare(&mut self, name: SmolStr, value: Value) {
        self.vars.insert(name, value);
    }
}

/// A compiled template bound to its scopes, ready to invoke.
#[derive(Debug)]
pub struct Closure {
    pub chunk: Rc<Chunk>,
    pub decl_env: EnvRef,
    pub exec_env: EnvRef,
}

/// Closure-binding service: bind a compiled template to a declaration
/// scope and an execution scope, producing a callable value.
pub fn bind_closure(chunk: Rc<Chunk>, decl_env: EnvRef, exec_env: EnvRef) -> Value {
    Value::Closure(Rc::new(Closure {
        chunk,
        decl_env,
        exec_env,
    }))
}
