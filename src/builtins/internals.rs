//! Statement syscalls: PRINT, PRINT USING, WRITE, INPUT and LINE INPUT.
//!
//! Variadic internals take a pushed value count instead of a fixed
//! signature; the code generator always pushes it.

use super::{Builtin, Registry};
use crate::types::{Type, Value};
use crate::vm::{Completion, DeviceRequest, PRINT_ZONE_WIDTH, RuntimeError, Vm};
use qbvm_runtime::string::{self, UsingArg};

pub(super) fn register(registry: &mut Registry) {
    registry.register_sub(Builtin::sub("_PRINT", vec![Type::Any], print));
    registry.register_sub(Builtin::sub("_PRINT_ZONE", vec![], print_zone));
    registry.register_sub(Builtin::sub("_PRINT_NEWLINE", vec![], print_newline));
    registry.register_sub(Builtin::sub("_PRINT_USING", vec![Type::String], print_using));
    registry.register_sub(Builtin::sub("_SELECT_OUTPUT", vec![Type::Integer], select_output));
    registry.register_sub(Builtin::sub("_WRITE", vec![], write));
    registry.register_sub(Builtin::sub("_INPUT", vec![Type::String], input));
    registry.register_sub(Builtin::sub(
        "_LINE_INPUT",
        vec![Type::String, Type::String],
        line_input,
    ));
}

/// Pops a pushed count and that many values, returned in push order.
pub(super) fn pop_variadic(vm: &mut Vm) -> Result<Vec<Value>, RuntimeError> {
    let count = vm.pop_i64()?;
    let count = usize::try_from(count)
        .map_err(|_| RuntimeError::internal(format!("bad value count {}", count)))?;
    let mut values = (0..count)
        .map(|_| vm.pop_value())
        .collect::<Result<Vec<_>, _>>()?;
    values.reverse();
    Ok(values)
}

fn print(vm: &mut Vm) -> Result<(), RuntimeError> {
    let value = vm.pop_value()?;
    vm.print(&value.to_print_string())
}

/// Pads to the start of the next print zone.
fn print_zone(vm: &mut Vm) -> Result<(), RuntimeError> {
    let pad = PRINT_ZONE_WIDTH - vm.column() % PRINT_ZONE_WIDTH;
    vm.print(&" ".repeat(pad))
}

fn print_newline(vm: &mut Vm) -> Result<(), RuntimeError> {
    vm.print("\n")
}

fn print_using(vm: &mut Vm) -> Result<(), RuntimeError> {
    let values = pop_variadic(vm)?;
    let template = vm.pop_string()?;
    let args: Vec<UsingArg> = values
        .iter()
        .map(|value| match value {
            Value::String(s) => UsingArg::Text(s.clone()),
            other => UsingArg::Number(other.as_f64().unwrap_or(0.0)),
        })
        .collect();
    let text = string::format_using(&template, &args)
        .ok_or_else(|| RuntimeError::illegal_call(format!("bad PRINT USING format {:?}", template)))?;
    vm.print(&text)
}

/// `PRINT #n` / `WRITE #n` redirect: a file number, or 0 for the console.
fn select_output(vm: &mut Vm) -> Result<(), RuntimeError> {
    let file_num = vm.pop_i64()?;
    vm.select_output((file_num != 0).then_some(file_num))
}

/// WRITE: comma-separated, strings quoted, then a newline.
fn write(vm: &mut Vm) -> Result<(), RuntimeError> {
    let values = pop_variadic(vm)?;
    let line: Vec<String> = values
        .iter()
        .map(|value| match value {
            Value::String(s) => format!("\"{}\"", s),
            other => other.to_print_string(),
        })
        .collect();
    vm.print(&format!("{}\n", line.join(",")))
}

/// INPUT: prints the prompt, then waits for one console line.
fn input(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let mut targets = Vec::new();
    for _ in 0..count {
        targets.push(vm.pop_ref()?);
    }
    targets.reverse();
    let prompt = vm.pop_string()?;
    vm.print(&prompt)?;
    vm.suspend(DeviceRequest::ReadLine, Completion::Input(targets))
}

fn line_input(vm: &mut Vm) -> Result<(), RuntimeError> {
    let target = vm.pop_ref()?;
    let prompt = vm.pop_string()?;
    vm.print(&prompt)?;
    vm.suspend(DeviceRequest::ReadLine, Completion::LineInput(target))
}

#[cfg(test)]
mod tests {
    use crate::builtins::testing::{run, run_input};

    #[test]
    fn test_print_separators() {
        assert_eq!(run("PRINT 1; 2"), "12\n");
        assert_eq!(run("PRINT \"a\", \"b\""), "a             b\n");
        assert_eq!(run("PRINT \"x\";\nPRINT \"y\""), "xy\n");
    }

    #[test]
    fn test_print_using() {
        assert_eq!(run("PRINT USING \"##.##\"; 3.14159"), " 3.14\n");
    }

    #[test]
    fn test_write() {
        assert_eq!(run("WRITE 1, \"two\", 3.5"), "1,\"two\",3.5\n");
    }

    #[test]
    fn test_input_prompt_and_fields() {
        let out = run_input("INPUT \"Name, age\"; n$, a%\nPRINT n$; a% + 1", &["Ada, 36"]);
        assert_eq!(out, "Name, age? Ada, 36\nAda37\n");
    }

    #[test]
    fn test_input_without_prompt() {
        assert_eq!(run_input("INPUT x\nPRINT x * 2", &["21"]), "? 21\n42\n");
    }

    #[test]
    fn test_line_input_keeps_commas() {
        let out = run_input("LINE INPUT \"> \"; l$\nPRINT l$", &["a, b, c"]);
        assert_eq!(out, "> a, b, c\na, b, c\n");
    }
}
