// Tests for exact operand-stack depth accounting across the compile and
// eval paths, including the stacked-source calling convention.
use crate::*;

use super::{new_vm, push_inputs};

#[test]
fn compile_replaces_two_inputs_with_one_closure() {
    let mut vm = new_vm();
    push_inputs(&mut vm, "input");
    assert_eq!(vm.depth(), 2);
    let status = vm.compile_raw(Some("1+1"), CompileFlags::EVAL).unwrap();
    assert_eq!(status, ExecStatus::Success);
    assert_eq!(vm.depth(), 1);
    // no leftover template below the closure
    assert!(vm.stack_get(0).unwrap().is_callable());
}

#[test]
fn unrelated_stack_content_is_preserved() {
    let mut vm = new_vm();
    vm.push(Value::Number(99.0)).unwrap();
    push_inputs(&mut vm, "eval");
    let status = vm
        .eval_raw(Some("5*5"), CompileFlags::EVAL | CompileFlags::SAFE)
        .unwrap();
    assert_eq!(status, ExecStatus::Success);
    assert_eq!(vm.depth(), 2);
    assert_eq!(vm.pop(), Some(Value::Number(25.0)));
    assert_eq!(vm.pop(), Some(Value::Number(99.0)));
}

#[test]
fn protected_compile_failure_depth_is_base_plus_one() {
    let mut vm = new_vm();
    vm.push(Value::Boolean(true)).unwrap(); // unrelated slot
    push_inputs(&mut vm, "input");
    let status = vm
        .compile_raw(Some("((("), CompileFlags::EVAL | CompileFlags::SAFE)
        .unwrap();
    assert_eq!(status, ExecStatus::Error);
    assert_eq!(vm.depth(), 2);
    assert!(matches!(vm.pop(), Some(Value::String(_))));
    assert_eq!(vm.pop(), Some(Value::Boolean(true)));
}

#[test]
fn stacked_source_is_evaluated() {
    let mut vm = new_vm();
    vm.push(Value::String("21*2".into())).unwrap();
    vm.push(Value::String("stacked".into())).unwrap();
    let status = vm
        .eval_stacked(CompileFlags::EVAL | CompileFlags::SAFE)
        .unwrap();
    assert_eq!(status, ExecStatus::Success);
    assert_eq!(vm.depth(), 1);
    assert_eq!(vm.pop(), Some(Value::Number(42.0)));
}

#[test]
#[should_panic(expected = "stacked source")]
fn stacked_source_must_be_a_string() {
    let mut vm = new_vm();
    vm.push(Value::Number(1.0)).unwrap();
    vm.push(Value::String("stacked".into())).unwrap();
    // contract violation: protection must NOT catch this
    let _ = vm.eval_stacked(CompileFlags::EVAL | CompileFlags::SAFE);
}

#[test]
#[should_panic(expected = "filename slot")]
fn filename_slot_must_be_a_string() {
    let mut vm = new_vm();
    vm.push(Value::Undefined).unwrap();
    vm.push(Value::Number(3.0)).unwrap();
    let _ = vm.compile_raw(Some("1"), CompileFlags::EVAL | CompileFlags::SAFE);
}

// Native helper used to check reentrant evaluation.
fn nest(vm: &mut RillVM, _args: &[Value]) -> RillResult<Value> {
    vm.push(Value::Undefined)?;
    vm.push(Value::String("nested".into()))?;
    let _ = vm.eval_raw(Some("20+1"), CompileFlags::EVAL | CompileFlags::SAFE)?;
    Ok(vm.pop().unwrap_or(Value::Undefined))
}

#[test]
fn nested_eval_is_reentrant() {
    let mut vm = new_vm();
    vm.set_global("nest", Value::Native(nest));
    assert_eq!(vm.peval_string("1 + nest()"), Ok(Value::Number(22.0)));
    assert_eq!(vm.depth(), 0);
}
