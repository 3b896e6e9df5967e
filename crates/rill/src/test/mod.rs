pub mod test_interpreter;
pub mod test_protected;
pub mod test_stack_discipline;

use crate::{RillVM, Value, VmOptions};

/// Fresh VM with default limits.
pub(crate) fn new_vm() -> RillVM {
    RillVM::new(VmOptions::default())
}

/// Push the [ source-placeholder filename ] slots the raw API expects.
pub(crate) fn push_inputs(vm: &mut RillVM, name: &str) {
    vm.push(Value::Undefined).unwrap();
    vm.push(Value::String(name.into())).unwrap();
}
