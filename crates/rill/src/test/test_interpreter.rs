// Tests for the language surface: operators, literals, completion values,
// builtins, and compile-error reporting.
use crate::compiler::{CompileMode, compile_source};
use crate::stdlib::open_stdlib;
use crate::*;

use super::new_vm;

fn eval_ok(vm: &mut RillVM, src: &str) -> Value {
    match vm.peval_string(src) {
        Ok(v) => v,
        Err(e) => panic!("eval of {:?} failed: {}", src, e),
    }
}

#[test]
fn arithmetic_precedence() {
    let mut vm = new_vm();
    assert_eq!(eval_ok(&mut vm, "1+2*3"), Value::Number(7.0));
    assert_eq!(eval_ok(&mut vm, "(1+2)*3"), Value::Number(9.0));
    assert_eq!(eval_ok(&mut vm, "10/4"), Value::Number(2.5));
    assert_eq!(eval_ok(&mut vm, "7%3"), Value::Number(1.0));
    assert_eq!(eval_ok(&mut vm, "-(2+3)"), Value::Number(-5.0));
    assert_eq!(eval_ok(&mut vm, "1/0"), Value::Number(f64::INFINITY));
}

#[test]
fn comparisons_and_equality() {
    let mut vm = new_vm();
    assert_eq!(eval_ok(&mut vm, "1 < 2"), Value::Boolean(true));
    assert_eq!(eval_ok(&mut vm, "2 <= 1"), Value::Boolean(false));
    assert_eq!(eval_ok(&mut vm, "'a' < 'b'"), Value::Boolean(true));
    assert_eq!(eval_ok(&mut vm, "3 >= 3"), Value::Boolean(true));
    assert_eq!(eval_ok(&mut vm, "1 == 1"), Value::Boolean(true));
    assert_eq!(eval_ok(&mut vm, "1 != 2"), Value::Boolean(true));
    assert_eq!(eval_ok(&mut vm, "null == null"), Value::Boolean(true));
    // no loose coercion between the two empty values
    assert_eq!(eval_ok(&mut vm, "null == undefined"), Value::Boolean(false));
}

#[test]
fn string_concatenation() {
    let mut vm = new_vm();
    assert_eq!(eval_ok(&mut vm, "'a' + 1"), Value::String("a1".into()));
    assert_eq!(eval_ok(&mut vm, "1 + 'a'"), Value::String("1a".into()));
    assert_eq!(
        eval_ok(&mut vm, "'x' + '\\t' + 'y'"),
        Value::String("x\ty".into())
    );
}

#[test]
fn truthiness() {
    let mut vm = new_vm();
    assert_eq!(eval_ok(&mut vm, "!0"), Value::Boolean(true));
    assert_eq!(eval_ok(&mut vm, "!''"), Value::Boolean(true));
    assert_eq!(eval_ok(&mut vm, "!'x'"), Value::Boolean(false));
    assert_eq!(eval_ok(&mut vm, "!null"), Value::Boolean(true));
    assert_eq!(eval_ok(&mut vm, "!undefined"), Value::Boolean(true));
    assert_eq!(eval_ok(&mut vm, "!!3"), Value::Boolean(true));
}

#[test]
fn completion_value_semantics() {
    let mut vm = new_vm();
    assert_eq!(eval_ok(&mut vm, "1; 2; 3"), Value::Number(3.0));
    assert_eq!(eval_ok(&mut vm, "var x = 4; x * 2"), Value::Number(8.0));
    // declarations are not expression statements
    assert_eq!(eval_ok(&mut vm, "var y = 1;"), Value::Undefined);
}

#[test]
fn comments_are_trivia() {
    let mut vm = new_vm();
    assert_eq!(
        eval_ok(&mut vm, "// line\n1 + /* inline */ 1"),
        Value::Number(2.0)
    );
}

#[test]
fn arithmetic_type_faults() {
    let mut vm = new_vm();
    assert!(vm.peval_string("1 + null").is_err());
    assert!(vm.peval_string("true * 2").is_err());
    assert!(vm.peval_string("-'a'").is_err());
    assert!(vm.peval_string("1 < 'a'").is_err());
}

#[test]
fn builtins() {
    let mut vm = new_vm();
    open_stdlib(&mut vm);
    assert_eq!(eval_ok(&mut vm, "type(1)"), Value::String("number".into()));
    assert_eq!(
        eval_ok(&mut vm, "type('s')"),
        Value::String("string".into())
    );
    assert_eq!(
        eval_ok(&mut vm, "type(print)"),
        Value::String("function".into())
    );
    assert_eq!(eval_ok(&mut vm, "type()"), Value::String("undefined".into()));
}

#[test]
fn undefined_global_read_faults() {
    let mut vm = new_vm();
    match vm.peval_string("missing + 1") {
        Err(Value::String(msg)) => assert!(msg.contains("not defined")),
        other => panic!("expected error string, got {:?}", other),
    }
}

#[test]
fn compile_errors_carry_line_numbers() {
    let err = compile_source("1;\n&", "t", CompileMode::EVAL).unwrap_err();
    assert_eq!(err.line, 2);
    assert!(err.message.contains("unexpected character"));

    let err = compile_source("\"open", "t", CompileMode::EVAL).unwrap_err();
    assert!(err.message.contains("unterminated"));
}

#[test]
fn number_display() {
    assert_eq!(Value::Number(2.0).to_string(), "2");
    assert_eq!(Value::Number(2.5).to_string(), "2.5");
    assert_eq!(Value::Number(-0.0).to_string(), "0");
}
