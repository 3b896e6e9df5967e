// Interpreter loop and call disciplines.
//
// Depth accounting is the contract everything else leans on:
//   call/pcall:  [ ... func arg1..argN ] -> [ ... result ]   (net -N)
//   safe_call:   callee consumes its N inputs and leaves exactly one
//                result; on fault the stack is restored to the recorded
//                base plus a single error value.

use std::cmp::Ordering;

use smol_str::SmolStr;

use crate::rill_value::{Closure, Value};

use super::{CallFrame, ExecStatus, Instruction, RillResult, RillVM};

impl RillVM {
    /// Unprotected call. [ ... func arg* ] -> [ ... result ]
    ///
    /// Faults propagate to the caller; the operand stack above the
    /// function slot is left as the faulting code left it.
    pub fn call(&mut self, nargs: usize) -> RillResult<()> {
        assert!(
            self.depth() > nargs,
            "call: function slot missing below the arguments"
        );
        let func_idx = self.depth() - nargs - 1;
        if self.frames.len() >= self.options.max_call_depth {
            return Err(self.overflow_error("call stack overflow"));
        }
        let func = self.stack[func_idx].clone();
        match func {
            Value::Closure(closure) => {
                let frame = CallFrame {
                    base: func_idx + 1,
                    strict: closure.chunk.is_strict,
                };
                self.frames.push(frame);
                let result = self.run(&closure);
                self.frames.pop();
                let ret = result?;
                self.truncate(func_idx);
                self.push(ret)
            }
            Value::Native(f) => {
                // Native code has no directive prologue of its own; it
                // runs at the strictness of its caller.
                let frame = CallFrame {
                    base: func_idx + 1,
                    strict: self.is_strict_call(),
                };
                self.frames.push(frame);
                let args: Vec<Value> = self.stack[frame.base..].to_vec();
                let result = f(self, &args);
                self.frames.pop();
                let ret = result?;
                self.truncate(func_idx);
                self.push(ret)
            }
            other => Err(self.error(format!("attempt to call a {} value", other.type_name()))),
        }
    }

    /// Protected call. [ ... func arg* ] -> [ ... result ] on success,
    /// [ ... err ] on fault, with the depth restored either way.
    pub fn pcall(&mut self, nargs: usize) -> ExecStatus {
        assert!(
            self.depth() > nargs,
            "pcall: function slot missing below the arguments"
        );
        let base = self.depth() - nargs - 1;
        match self.call(nargs) {
            Ok(()) => ExecStatus::Success,
            Err(err) => {
                let message = self.fault_message(err);
                self.truncate(base);
                self.stack.push(Value::String(SmolStr::from(message)));
                ExecStatus::Error
            }
        }
    }

    /// Fault-isolation boundary. `f` must consume exactly `nargs` stack
    /// slots and leave exactly one result slot. On a fault the stack is
    /// truncated to the recorded base and a single error value is pushed,
    /// so the depth is base + 1 on every exit path.
    pub(crate) fn safe_call<F>(&mut self, nargs: usize, f: F) -> ExecStatus
    where
        F: FnOnce(&mut RillVM) -> RillResult<()>,
    {
        assert!(self.depth() >= nargs, "safe_call: arguments missing");
        let base = self.depth() - nargs;
        match f(self) {
            Ok(()) => {
                debug_assert_eq!(
                    self.depth(),
                    base + 1,
                    "safe_call: callee broke the single-result contract"
                );
                ExecStatus::Success
            }
            Err(err) => {
                let message = self.fault_message(err);
                self.truncate(base);
                self.stack.push(Value::String(SmolStr::from(message)));
                ExecStatus::Error
            }
        }
    }

    // ===== Interpreter =====

    /// Execute a closure's chunk. The caller owns frame push/pop and the
    /// final replacement of [ func args ] with the returned value.
    fn run(&mut self, closure: &Closure) -> RillResult<Value> {
        let chunk = &closure.chunk;
        // Slot 0 of the frame workspace holds the completion value for
        // program-mode chunks.
        let result_slot = self.depth();
        self.push(Value::Undefined)?;

        let mut pc = 0usize;
        while pc < chunk.code.len() {
            let ins = chunk.code[pc];
            pc += 1;
            match ins {
                Instruction::Const(i) => {
                    let v = chunk.consts[usize::from(i)].clone();
                    self.push(v)?;
                }
                Instruction::GetGlobal(i) => {
                    let name = &chunk.names[usize::from(i)];
                    let value = closure.exec_env.borrow().get(name);
                    match value {
                        Some(v) => self.push(v)?,
                        None => return Err(self.error(format!("'{}' is not defined", name))),
                    }
                }
                Instruction::SetGlobal(i) => {
                    let v = self.pop_operand()?;
                    let name = &chunk.names[usize::from(i)];
                    if chunk.is_strict && !closure.exec_env.borrow().contains(name) {
                        return Err(
                            self.error(format!("assignment to undeclared variable '{}'", name))
                        );
                    }
                    closure.exec_env.borrow_mut().declare(name.clone(), v);
                }
                Instruction::DeclGlobal(i) => {
                    let v = self.pop_operand()?;
                    let name = chunk.names[usize::from(i)].clone();
                    closure.exec_env.borrow_mut().declare(name, v);
                }
                Instruction::Pop => {
                    self.pop_operand()?;
                }
                Instruction::StoreResult => {
                    let v = self.pop_operand()?;
                    self.stack_set(result_slot, v);
                }
                Instruction::Add
                | Instruction::Sub
                | Instruction::Mul
                | Instruction::Div
                | Instruction::Mod
                | Instruction::Eq
                | Instruction::Ne
                | Instruction::Lt
                | Instruction::Le
                | Instruction::Gt
                | Instruction::Ge => self.binary_op(ins)?,
                Instruction::Neg => {
                    let a = self.pop_operand()?;
                    match a {
                        Value::Number(n) => self.push(Value::Number(-n))?,
                        other => {
                            return Err(
                                self.error(format!("cannot negate a {} value", other.type_name()))
                            );
                        }
                    }
                }
                Instruction::Not => {
                    let truthy = self.pop_operand()?.is_truthy();
                    self.push(Value::Boolean(!truthy))?;
                }
                Instruction::Call(n) => self.call(usize::from(n))?,
                Instruction::Return => return self.pop_operand(),
                Instruction::ReturnUndefined => return Ok(Value::Undefined),
                Instruction::ReturnResult => return Ok(self.stack[result_slot].clone()),
            }
        }
        // The compiler always terminates a chunk with a return.
        Ok(Value::Undefined)
    }

    fn pop_operand(&mut self) -> RillResult<Value> {
        match self.stack.pop() {
            Some(v) => Ok(v),
            None => Err(self.error("operand stack underflow")),
        }
    }

    fn binary_op(&mut self, op: Instruction) -> RillResult<()> {
        let b = self.pop_operand()?;
        let a = self.pop_operand()?;
        let v = match op {
            Instruction::Add => match (&a, &b) {
                (Value::Number(x), Value::Number(y)) => Value::Number(x + y),
                // `+` concatenates as soon as either side is a string
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Value::String(SmolStr::from(format!("{}{}", a, b)))
                }
                _ => return Err(self.type_fault("+", &a, &b)),
            },
            Instruction::Sub => self.numeric(a, b, "-", |x, y| x - y)?,
            Instruction::Mul => self.numeric(a, b, "*", |x, y| x * y)?,
            Instruction::Div => self.numeric(a, b, "/", |x, y| x / y)?,
            Instruction::Mod => self.numeric(a, b, "%", |x, y| x % y)?,
            Instruction::Eq => Value::Boolean(a == b),
            Instruction::Ne => Value::Boolean(a != b),
            Instruction::Lt => self.compare(a, b, "<", |o| o == Ordering::Less)?,
            Instruction::Le => self.compare(a, b, "<=", |o| o != Ordering::Greater)?,
            Instruction::Gt => self.compare(a, b, ">", |o| o == Ordering::Greater)?,
            Instruction::Ge => self.compare(a, b, ">=", |o| o != Ordering::Less)?,
            _ => unreachable!("binary_op: not a binary instruction"),
        };
        self.push(v)
    }

    fn numeric(
        &mut self,
        a: Value,
        b: Value,
        sym: &str,
        f: fn(f64, f64) -> f64,
    ) -> RillResult<Value> {
        match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => Ok(Value::Number(f(*x, *y))),
            _ => Err(self.type_fault(sym, &a, &b)),
        }
    }

    fn compare(
        &mut self,
        a: Value,
        b: Value,
        sym: &str,
        pred: fn(Ordering) -> bool,
    ) -> RillResult<Value> {
        let ord = match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            _ => return Err(self.type_fault(sym, &a, &b)),
        };
        // NaN makes every ordered comparison false
        Ok(Value::Boolean(ord.is_some_and(pred)))
    }

    fn type_fault(&mut self, sym: &str, a: &Value, b: &Value) -> super::RillError {
        self.error(format!(
            "unsupported operands for '{}': {} and {}",
            sym,
            a.type_name(),
            b.type_name()
        ))
    }
}
