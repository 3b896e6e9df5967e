// Rill virtual machine
// Owns the operand stack, the call frames, the global environment and the
// lightweight error storage. The interpreter loop lives in `execute`.

mod execute;
mod opcode;
mod vm_error;
mod vm_options;

use std::cell::RefCell;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::compiler::CompileError;
use crate::rill_value::{EnvRef, Environment, Value};

pub use opcode::Instruction;
pub use vm_error::{RillError, RillResult};
pub use vm_options::VmOptions;

/// Uniform outcome of a protected operation. The value (result or error)
/// is left on the operand stack; the status only says which it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum ExecStatus {
    Success,
    Error,
}

/// One active call. `base` is the operand-stack depth at frame entry
/// (first slot past the arguments); `strict` is the strictness of the
/// running code and feeds `is_strict_call`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallFrame {
    pub base: usize,
    pub strict: bool,
}

pub struct RillVM {
    /// The single global scope; closures bind to it for both declaration
    /// and execution.
    pub(crate) globals: EnvRef,

    /// Shared operand stack. Every API documents its exact depth effect;
    /// no operation may leave the depth undefined, faults included.
    pub(crate) stack: Vec<Value>,

    pub(crate) frames: Vec<CallFrame>,

    pub(crate) options: VmOptions,

    // ===== Lightweight Error Storage =====
    // Error text lives here instead of inside RillError so Result stays
    // one byte on the hot paths.
    pub(crate) error_message: String,
}

impl RillVM {
    pub fn new(options: VmOptions) -> Self {
        RillVM {
            globals: Rc::new(RefCell::new(Environment::new())),
            stack: Vec::with_capacity(64),
            frames: Vec::new(),
            options,
            error_message: String::new(),
        }
    }

    // ===== Operand stack =====

    /// Current operand stack depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Push one value. [ ... ] -> [ ... v ]
    pub fn push(&mut self, value: Value) -> RillResult<()> {
        if self.stack.len() >= self.options.max_stack_size {
            return Err(self.overflow_error("operand stack overflow"));
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop the top value, if any. [ ... v ] -> [ ... ]
    pub fn pop(&mut self) -> Option<Value> {
        self.stack.pop()
    }

    pub fn stack_get(&self, index: usize) -> Option<&Value> {
        self.stack.get(index)
    }

    pub(crate) fn stack_set(&mut self, index: usize, value: Value) {
        self.stack[index] = value;
    }

    pub(crate) fn truncate(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }

    // ===== Globals =====

    pub fn global_env(&self) -> EnvRef {
        self.globals.clone()
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.borrow_mut().declare(SmolStr::new(name), value);
    }

    // ===== Strictness =====

    /// Whether the innermost active frame runs strict code. Native frames
    /// inherit the strictness of their caller.
    pub fn is_strict_call(&self) -> bool {
        self.frames.last().is_some_and(|f| f.strict)
    }

    // ===== Error storage =====

    /// Record a runtime fault message and return the fault to raise.
    pub fn error(&mut self, message: impl Into<String>) -> RillError {
        self.error_message = message.into();
        RillError::Runtime
    }

    pub(crate) fn compile_error(&mut self, err: CompileError) -> RillError {
        self.error_message = err.to_string();
        RillError::Compile
    }

    pub(crate) fn overflow_error(&mut self, message: &str) -> RillError {
        self.error_message = message.to_string();
        RillError::StackOverflow
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Take the stored message for a fault, falling back to the fault's
    /// generic description when no message was recorded.
    pub(crate) fn fault_message(&mut self, err: RillError) -> String {
        let message = std::mem::take(&mut self.error_message);
        if message.is_empty() {
            err.to_string()
        } else {
            message
        }
    }
}

impl Default for RillVM {
    fn default() -> Self {
        RillVM::new(VmOptions::default())
    }
}
