//! Screen and keyboard statements.

use super::{Builtin, Registry};
use crate::types::{Type, Value};
use crate::vm::{RuntimeError, Vm};

pub(super) fn register(registry: &mut Registry) {
    registry.register_function(Builtin::function("INKEY$", Type::String, vec![], inkey));
    registry.register_sub(Builtin::sub("CLS", vec![], cls));
    registry.register_sub(Builtin::sub("BEEP", vec![], beep));
    registry.register_sub(
        Builtin::sub("LOCATE", vec![Type::Integer, Type::Integer], locate).optional(0),
    );
    registry.register_sub(
        Builtin::sub("COLOR", vec![Type::Integer, Type::Integer], color).optional(0),
    );
}

/// The next buffered keystroke, or "" without waiting.
fn inkey(vm: &mut Vm) -> Result<(), RuntimeError> {
    let key = vm.devices.console.inkey().unwrap_or_default();
    vm.push(Value::String(key));
    Ok(())
}

fn cls(vm: &mut Vm) -> Result<(), RuntimeError> {
    vm.devices.console.cls();
    Ok(())
}

fn beep(vm: &mut Vm) -> Result<(), RuntimeError> {
    vm.devices.console.beep();
    Ok(())
}

fn locate(vm: &mut Vm) -> Result<(), RuntimeError> {
    let (row, column) = pop_pair(vm)?;
    vm.devices.console.locate(row, column);
    Ok(())
}

fn color(vm: &mut Vm) -> Result<(), RuntimeError> {
    let (foreground, background) = pop_pair(vm)?;
    vm.devices.console.color(foreground, background);
    Ok(())
}

/// Up to two optional INTEGER arguments, in source order.
fn pop_pair(vm: &mut Vm) -> Result<(Option<i32>, Option<i32>), RuntimeError> {
    let count = vm.pop_arg_count(2)?;
    let second = if count == 2 { Some(vm.pop_i64()? as i32) } else { None };
    let first = if count >= 1 { Some(vm.pop_i64()? as i32) } else { None };
    Ok((first, second))
}

#[cfg(test)]
mod tests {
    use crate::builtins::testing::run_on;
    use crate::vm::Devices;
    use qbvm_runtime::RecordingConsole;

    #[test]
    fn test_inkey_drains_keys() {
        let console = RecordingConsole::new();
        console.push_key("a");
        let (_, result) = run_on(
            "k$ = INKEY$\nPRINT \"[\"; k$; \"]\"\nPRINT \"[\"; INKEY$; \"]\"",
            Devices::new(console.clone()),
        );
        result.unwrap();
        assert_eq!(console.output(), "[a]\n[]\n");
    }

    #[test]
    fn test_beep_and_screen_statements() {
        let console = RecordingConsole::new();
        let (_, result) = run_on("CLS\nLOCATE 1, 1\nCOLOR 14\nBEEP\nBEEP", Devices::new(console.clone()));
        result.unwrap();
        assert_eq!(console.beeps(), 2);
    }
}
