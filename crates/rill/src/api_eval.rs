// Compilation and evaluation entry points.
//
// Stack convention shared by every raw entry point here:
//
//   [ ... source filename ]  ->  [ ... closure ]          (compile)
//   [ ... source filename ]  ->  [ ... result/error ]     (eval)
//
// The source slot holds the stacked source text when no buffer is
// supplied, otherwise a placeholder. With NORESULT the final value is
// popped and the net effect is -2 instead of -1.

use std::rc::Rc;

use bitflags::bitflags;
use smol_str::SmolStr;

use crate::compiler::{CompileMode, compile_source};
use crate::rill_value::{Value, bind_closure};
use crate::rill_vm::{ExecStatus, RillResult, RillVM};

bitflags! {
    /// Public compile/eval options. These are the only externally visible
    /// configuration surface; they are translated into `CompileMode` bits
    /// before the compiler service is invoked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CompileFlags: u32 {
        /// Compile in eval (program) mode.
        const EVAL = 1 << 0;
        /// Compile the source as a function body.
        const FUNCTION = 1 << 1;
        /// Force strict mode.
        const STRICT = 1 << 2;
        /// Protected mode: faults become an error value plus an error
        /// status instead of propagating.
        const SAFE = 1 << 3;
        /// Pop the final value (result or error) before returning.
        const NORESULT = 1 << 4;
    }
}

/// Public flag -> internal compiler-mode translation, kept as pure data.
const COMPILE_FLAG_MAP: [(CompileFlags, CompileMode); 3] = [
    (CompileFlags::EVAL, CompileMode::EVAL),
    (
        CompileFlags::FUNCTION,
        CompileMode::EVAL.union(CompileMode::FUNCEXPR),
    ),
    (CompileFlags::STRICT, CompileMode::STRICT),
];

pub(crate) fn translate_flags(flags: CompileFlags) -> CompileMode {
    let mut mode = CompileMode::empty();
    for (public, internal) in COMPILE_FLAG_MAP {
        if flags.contains(public) {
            mode = mode.union(internal);
        }
    }
    mode
}

/// Everything one compile step needs, packaged so both the direct and
/// the protected discipline can run the same builder.
struct CompileRequest<'a> {
    src: Option<&'a str>,
    flags: CompileFlags,
}

/// Compile-unit builder. Consumes the two input slots and leaves exactly
/// one closure; this exact accounting is what `safe_call` recovery
/// relies on.
///
/// [ ... source filename ] -> [ ... closure ]
fn do_compile(vm: &mut RillVM, req: &CompileRequest<'_>) -> RillResult<()> {
    // [ ... source filename ]
    let chunk_name = match vm.pop() {
        Some(Value::String(name)) => name,
        _ => panic!("do_compile: filename slot must hold a string"),
    };

    // [ ... source ]
    let stacked_src;
    let source: &str = match req.src {
        Some(buffer) => buffer,
        None => match vm.stack_get(vm.depth() - 1) {
            Some(Value::String(s)) => {
                stacked_src = s.clone();
                &stacked_src
            }
            _ => panic!("do_compile: neither a source buffer nor a stacked source string"),
        },
    };

    let mode = translate_flags(req.flags);
    let template = match compile_source(source, &chunk_name, mode) {
        Ok(chunk) => Rc::new(chunk),
        Err(e) => return Err(vm.compile_error(e)),
    };
    vm.push(Value::Template(template.clone()))?;

    // [ ... source template ]
    let global = vm.global_env();
    let callable = bind_closure(template, global.clone(), global);
    let top = vm.depth();
    vm.stack_set(top - 2, callable);

    // [ ... closure template ]
    let _ = vm.pop();

    // [ ... closure ]
    Ok(())
}

impl RillVM {
    /// Evaluator entry point. Composes eval flags (adding `STRICT` when
    /// the calling frame is strict), compiles, then invokes the closure
    /// (under protection iff `SAFE`). Compile failure and execution
    /// failure collapse into the same error status.
    ///
    /// [ ... source filename ] -> [ ... result/error ] (popped with
    /// `NORESULT`)
    pub fn eval_raw(
        &mut self,
        source: Option<&str>,
        flags: CompileFlags,
    ) -> RillResult<ExecStatus> {
        let mut comp_flags = flags | CompileFlags::EVAL;
        // Strictness is contagious from the calling context.
        if self.is_strict_call() {
            comp_flags |= CompileFlags::STRICT;
        }
        // May be protected or not depending on SAFE.
        let mut status = self.compile_raw(source, comp_flags)?;

        // [ ... closure/error ]
        if status == ExecStatus::Success {
            status = if flags.contains(CompileFlags::SAFE) {
                self.pcall(0)
            } else {
                self.call(0)?;
                ExecStatus::Success
            };
        }

        // [ ... result/error ]
        if flags.contains(CompileFlags::NORESULT) {
            let _ = self.pop();
        }
        Ok(status)
    }

    /// Compiler entry point: produce a compiled-and-bound closure on top
    /// of the stack. With `SAFE` the builder runs inside `safe_call` and
    /// faults surface as an error value plus `ExecStatus::Error`; without
    /// it they propagate as `Err`.
    ///
    /// [ ... source filename ] -> [ ... closure/error ]
    pub fn compile_raw(
        &mut self,
        source: Option<&str>,
        flags: CompileFlags,
    ) -> RillResult<ExecStatus> {
        let req = CompileRequest {
            src: source,
            flags,
        };
        if flags.contains(CompileFlags::SAFE) {
            return Ok(self.safe_call(2, |vm| do_compile(vm, &req)));
        }
        do_compile(self, &req)?;
        Ok(ExecStatus::Success)
    }

    /// Evaluate a source value already resident on the operand stack.
    ///
    /// [ ... source filename ] -> [ ... result/error ]
    pub fn eval_stacked(&mut self, flags: CompileFlags) -> RillResult<ExecStatus> {
        self.eval_raw(None, flags)
    }

    // ===== String convenience wrappers =====

    /// Push the [ source-placeholder filename ] input slots the raw
    /// entry points expect.
    fn push_input_slots(&mut self, name: &str) -> RillResult<()> {
        self.push(Value::Undefined)?;
        self.push(Value::String(SmolStr::new(name)))
    }

    /// Evaluate a string unprotected and return the popped result.
    /// Faults propagate; the stack is unchanged on success.
    pub fn eval_string(&mut self, src: &str) -> RillResult<Value> {
        self.push_input_slots("eval")?;
        let _ = self.eval_raw(Some(src), CompileFlags::EVAL)?;
        Ok(self.pop().unwrap_or(Value::Undefined))
    }

    /// Evaluate a string unprotected, discarding the result.
    pub fn eval_string_noresult(&mut self, src: &str) -> RillResult<()> {
        self.push_input_slots("eval")?;
        let _ = self.eval_raw(Some(src), CompileFlags::EVAL | CompileFlags::NORESULT)?;
        Ok(())
    }

    /// Evaluate a string under protection. Returns the result value, or
    /// the error value when compilation or execution failed. The stack is
    /// unchanged in both cases.
    pub fn peval_string(&mut self, src: &str) -> Result<Value, Value> {
        self.peval_string_with_name(src, "eval")
    }

    pub fn peval_string_with_name(&mut self, src: &str, name: &str) -> Result<Value, Value> {
        if let Err(e) = self.push_input_slots(name) {
            let message = self.fault_message(e);
            return Err(Value::String(SmolStr::from(message)));
        }
        match self.eval_raw(Some(src), CompileFlags::EVAL | CompileFlags::SAFE) {
            Ok(ExecStatus::Success) => Ok(self.pop().unwrap_or(Value::Undefined)),
            Ok(ExecStatus::Error) => Err(self.pop().unwrap_or(Value::Undefined)),
            // SAFE never faults, but keep the conversion total.
            Err(e) => {
                let message = self.fault_message(e);
                Err(Value::String(SmolStr::from(message)))
            }
        }
    }

    /// Evaluate a string under protection, discarding the final value.
    pub fn peval_string_noresult(&mut self, src: &str) -> ExecStatus {
        if let Err(e) = self.push_input_slots("eval") {
            let _ = self.fault_message(e);
            return ExecStatus::Error;
        }
        let flags = CompileFlags::EVAL | CompileFlags::SAFE | CompileFlags::NORESULT;
        match self.eval_raw(Some(src), flags) {
            Ok(status) => status,
            Err(e) => {
                let _ = self.fault_message(e);
                ExecStatus::Error
            }
        }
    }

    /// Compile a string unprotected and return the popped closure.
    /// `SAFE` is ignored here; use [`RillVM::pcompile_string`] for the
    /// protected variant.
    pub fn compile_string(&mut self, src: &str, flags: CompileFlags) -> RillResult<Value> {
        self.push_input_slots("input")?;
        let _ = self.compile_raw(Some(src), flags.difference(CompileFlags::SAFE))?;
        Ok(self.pop().unwrap_or(Value::Undefined))
    }

    /// Compile a string under protection. Returns the closure, or the
    /// error value when compilation failed.
    pub fn pcompile_string(&mut self, src: &str, flags: CompileFlags) -> Result<Value, Value> {
        if let Err(e) = self.push_input_slots("input") {
            let message = self.fault_message(e);
            return Err(Value::String(SmolStr::from(message)));
        }
        match self.compile_raw(Some(src), flags | CompileFlags::SAFE) {
            Ok(ExecStatus::Success) => Ok(self.pop().unwrap_or(Value::Undefined)),
            Ok(ExecStatus::Error) => Err(self.pop().unwrap_or(Value::Undefined)),
            Err(e) => {
                let message = self.fault_message(e);
                Err(Value::String(SmolStr::from(message)))
            }
        }
    }
}
