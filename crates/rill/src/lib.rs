// Rill scripting engine
// A compact embeddable script engine with a bytecode compiler and
// protected (fault-isolated) compile-and-evaluate entry points.

#[cfg(test)]
mod test;

pub mod api_eval;
pub mod compiler;
pub mod rill_value;
pub mod rill_vm;
pub mod stdlib;

pub use api_eval::CompileFlags;
pub use compiler::{CompileError, CompileMode};
pub use rill_value::{Chunk, Closure, EnvRef, Environment, NativeFn, Value, bind_closure};
pub use rill_vm::{ExecStatus, Instruction, RillError, RillResult, RillVM, VmOptions};
