// Tests for the fault-isolation boundaries: pcall, protected compile,
// depth restoration on every path.
use crate::*;

use super::{new_vm, push_inputs};

fn boom(vm: &mut RillVM, _args: &[Value]) -> RillResult<Value> {
    Err(vm.error("boom"))
}

// Pushes intermediate garbage before faulting, to exercise depth
// restoration after partial work.
fn messy(vm: &mut RillVM, _args: &[Value]) -> RillResult<Value> {
    vm.push(Value::Number(1.0))?;
    vm.push(Value::Number(2.0))?;
    Err(vm.error("messy failure"))
}

#[test]
fn pcall_converts_fault_to_error_value() {
    let mut vm = new_vm();
    vm.push(Value::Native(boom)).unwrap();
    let status = vm.pcall(0);
    assert_eq!(status, ExecStatus::Error);
    assert_eq!(vm.depth(), 1);
    match vm.pop() {
        Some(Value::String(msg)) => assert_eq!(msg, "boom"),
        other => panic!("expected error string, got {:?}", other),
    }
}

#[test]
fn pcall_restores_depth_after_partial_pushes() {
    let mut vm = new_vm();
    vm.push(Value::Native(messy)).unwrap();
    vm.push(Value::Number(9.0)).unwrap(); // one argument
    let status = vm.pcall(1);
    assert_eq!(status, ExecStatus::Error);
    // [ func arg ] plus two garbage slots all collapse to one error value
    assert_eq!(vm.depth(), 1);
    match vm.pop() {
        Some(Value::String(msg)) => assert!(msg.contains("messy")),
        other => panic!("expected error string, got {:?}", other),
    }
}

#[test]
fn unprotected_call_propagates_fault() {
    let mut vm = new_vm();
    vm.push(Value::Native(boom)).unwrap();
    let err = vm.call(0).unwrap_err();
    assert_eq!(err, RillError::Runtime);
    assert_eq!(vm.error_message(), "boom");
}

#[test]
fn protected_compile_restores_depth() {
    let mut vm = new_vm();
    push_inputs(&mut vm, "input");
    let status = vm
        .compile_raw(Some("1 +"), CompileFlags::EVAL | CompileFlags::SAFE)
        .unwrap();
    assert_eq!(status, ExecStatus::Error);
    assert_eq!(vm.depth(), 1);
    assert!(matches!(vm.pop(), Some(Value::String(_))));
}

#[test]
fn call_depth_exhaustion_is_caught() {
    let mut vm = new_vm();
    let f = vm.compile_string("recurse();", CompileFlags::EVAL).unwrap();
    vm.set_global("recurse", f.clone());
    vm.push(f).unwrap();
    let status = vm.pcall(0);
    assert_eq!(status, ExecStatus::Error);
    assert_eq!(vm.depth(), 1);
    match vm.pop() {
        Some(Value::String(msg)) => assert!(msg.contains("overflow")),
        other => panic!("expected error string, got {:?}", other),
    }
}

#[test]
fn calling_a_non_function_is_a_catchable_fault() {
    let mut vm = new_vm();
    match vm.peval_string("3()") {
        Err(Value::String(msg)) => assert!(msg.contains("call")),
        other => panic!("expected error string, got {:?}", other),
    }
    assert_eq!(vm.depth(), 0);
}

#[test]
fn protected_eval_never_faults_on_bad_input() {
    let mut vm = new_vm();
    for src in ["{", "1 +", "(", "x(", "no_such()", "1 + null", "\"open"] {
        match vm.peval_string(src) {
            Ok(_) => panic!("expected an error for {:?}", src),
            Err(value) => assert!(matches!(value, Value::String(_))),
        }
        assert_eq!(vm.depth(), 0, "source: {}", src);
    }
}
