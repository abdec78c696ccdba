//! String functions.
//!
//! Positions are 1-based. Out-of-range lengths clamp; out-of-range
//! positions and codes are illegal function calls, as in QBasic.

use super::{Builtin, Registry};
use crate::types::{Type, Value};
use crate::vm::{RuntimeError, Vm};
use qbvm_runtime::string;

pub(super) fn register(registry: &mut Registry) {
    let s = || Type::String;
    let n = || Type::Long;

    registry.register_function(Builtin::function("ASC", n(), vec![s()], asc));
    registry.register_function(Builtin::function("CHR$", s(), vec![n()], chr));
    registry.register_function(Builtin::function("HEX$", s(), vec![n()], |vm| {
        radix(vm, string::hex)
    }));
    registry.register_function(Builtin::function("OCT$", s(), vec![n()], |vm| {
        radix(vm, string::oct)
    }));
    registry.register_function(
        Builtin::function("INSTR", n(), vec![Type::Any, Type::Any, s()], instr).optional(2),
    );
    registry.register_function(Builtin::function("LCASE$", s(), vec![s()], |vm| {
        map(vm, |s| s.to_lowercase())
    }));
    registry.register_function(Builtin::function("UCASE$", s(), vec![s()], |vm| {
        map(vm, |s| s.to_uppercase())
    }));
    registry.register_function(Builtin::function("LTRIM$", s(), vec![s()], |vm| {
        map(vm, string::ltrim)
    }));
    registry.register_function(Builtin::function("RTRIM$", s(), vec![s()], |vm| {
        map(vm, string::rtrim)
    }));
    registry.register_function(Builtin::function("LEFT$", s(), vec![s(), n()], |vm| {
        take(vm, string::left)
    }));
    registry.register_function(Builtin::function("RIGHT$", s(), vec![s(), n()], |vm| {
        take(vm, string::right)
    }));
    registry.register_function(Builtin::function("MID$", s(), vec![s(), n(), n()], mid).optional(2));
    registry.register_function(Builtin::function("LEN", n(), vec![Type::Any], len));
    registry.register_function(Builtin::function("SPACE$", s(), vec![n()], space));
    registry.register_function(Builtin::function("STR$", s(), vec![Type::Double], str_number));
    registry.register_function(Builtin::function("STRING$", s(), vec![n(), Type::Any], string_fill));
    registry.register_function(Builtin::function("VAL", Type::Double, vec![s()], val));
}

fn push_string(vm: &mut Vm, s: String) -> Result<(), RuntimeError> {
    vm.push(Value::String(s));
    Ok(())
}

fn map(vm: &mut Vm, f: fn(&str) -> String) -> Result<(), RuntimeError> {
    let s = vm.pop_string()?;
    push_string(vm, f(&s))
}

/// LEFT$ / RIGHT$.
fn take(vm: &mut Vm, f: fn(&str, i64) -> String) -> Result<(), RuntimeError> {
    let n = vm.pop_i64()?;
    let s = vm.pop_string()?;
    if n < 0 {
        return Err(RuntimeError::illegal_call(format!("negative length {}", n)));
    }
    push_string(vm, f(&s, n))
}

fn radix(vm: &mut Vm, f: fn(i64) -> String) -> Result<(), RuntimeError> {
    let n = vm.pop_i64()?;
    push_string(vm, f(n))
}

fn asc(vm: &mut Vm) -> Result<(), RuntimeError> {
    let s = vm.pop_string()?;
    let code = string::asc(&s).ok_or_else(|| RuntimeError::illegal_call("ASC of empty string"))?;
    vm.push(Value::Long(code as i32));
    Ok(())
}

fn chr(vm: &mut Vm) -> Result<(), RuntimeError> {
    let code = vm.pop_i64()?;
    let s = string::chr(code)
        .ok_or_else(|| RuntimeError::illegal_call(format!("CHR$ of {}", code)))?;
    push_string(vm, s)
}

/// `INSTR([start,] haystack, needle)`
fn instr(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_arg_count(3)?;
    let needle = vm.pop_string()?;
    let haystack = vm.pop_string()?;
    let start = if count == 3 { vm.pop_i64()? } else { 1 };
    if start < 1 {
        return Err(RuntimeError::illegal_call(format!("INSTR start {}", start)));
    }
    vm.push(Value::Long(string::instr(start, &haystack, &needle) as i32));
    Ok(())
}

fn mid(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_arg_count(3)?;
    let length = if count == 3 { Some(vm.pop_i64()?) } else { None };
    let start = vm.pop_i64()?;
    let s = vm.pop_string()?;
    if start < 1 || length.is_some_and(|n| n < 0) {
        return Err(RuntimeError::illegal_call("MID$ position out of range"));
    }
    push_string(vm, string::mid(&s, start, length))
}

/// Character count of a string, storage size of anything else.
fn len(vm: &mut Vm) -> Result<(), RuntimeError> {
    let value = vm.pop_value()?;
    vm.push(Value::Long(storage_len(&value) as i32));
    Ok(())
}

fn storage_len(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Integer(_) => 2,
        Value::Long(_) | Value::Single(_) => 4,
        Value::Double(_) => 8,
        Value::Record(record) => record
            .fields
            .iter()
            .map(|field| storage_len(&field.borrow()))
            .sum(),
        Value::Json(_) | Value::Null | Value::Array(_) => 0,
    }
}

fn space(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_i64()?;
    if !(0..=string::MAX_LEN).contains(&n) {
        return Err(RuntimeError::illegal_call(format!("SPACE$ of {}", n)));
    }
    push_string(vm, string::space(n))
}

/// STR$: PRINT's form with a blank where a plus sign would be.
fn str_number(vm: &mut Vm) -> Result<(), RuntimeError> {
    let value = vm.pop_value()?;
    push_string(vm, string::str_number(&value.to_print_string()))
}

/// `STRING$(n, code)` or `STRING$(n, text$)`, which repeats text's first
/// character.
fn string_fill(vm: &mut Vm) -> Result<(), RuntimeError> {
    let fill = vm.pop_value()?;
    let n = vm.pop_i64()?;
    let ch = match &fill {
        Value::String(s) => s.chars().next(),
        other => other
            .as_i64()
            .and_then(string::chr)
            .and_then(|s| s.chars().next()),
    };
    let Some(ch) = ch.filter(|_| (0..=string::MAX_LEN).contains(&n)) else {
        return Err(RuntimeError::illegal_call("bad STRING$ argument"));
    };
    push_string(vm, string::string_fill(n, ch))
}

fn val(vm: &mut Vm) -> Result<(), RuntimeError> {
    let s = vm.pop_string()?;
    vm.push(Value::Double(string::val(&s)));
    Ok(())
}
