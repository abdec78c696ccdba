//! The keyed I/O bus and input devices.

use super::{Builtin, Registry};
use crate::types::{Type, Value};
use crate::vm::{RuntimeError, Vm};
use qbvm_runtime::IoBus;

pub(super) fn register(registry: &mut Registry) {
    registry.register_sub(Builtin::sub("IOWRITE", vec![Type::String, Type::String], io_write));
    registry.register_function(Builtin::function("IOREAD$", Type::String, vec![Type::String], io_read));
    registry.register_function(Builtin::function("EVENTDATA$", Type::String, vec![], event_data));

    registry.register_function(Builtin::function("STICK", Type::Integer, vec![Type::Integer], stick));
    registry.register_function(Builtin::function("STRIG", Type::Integer, vec![Type::Integer], strig));
    registry.register_function(Builtin::function("POINTERX", Type::Integer, vec![], |vm| {
        pointer(vm, |(x, _), _| Value::Integer(x as i16))
    }));
    registry.register_function(Builtin::function("POINTERY", Type::Integer, vec![], |vm| {
        pointer(vm, |(_, y), _| Value::Integer(y as i16))
    }));
    registry.register_function(Builtin::function("POINTERDOWN", Type::Integer, vec![], |vm| {
        pointer(vm, |_, down| Value::from_bool(down))
    }));
}

fn bus(vm: &mut Vm) -> Result<&mut (dyn IoBus + 'static), RuntimeError> {
    match vm.devices.io.as_deref_mut() {
        Some(io) => Ok(io),
        None => Err(RuntimeError::unavailable("I/O bus").recoverable()),
    }
}

fn io_write(vm: &mut Vm) -> Result<(), RuntimeError> {
    let value = vm.pop_string()?;
    let key = vm.pop_string()?;
    bus(vm)?.write(&key, &value)?;
    vm.set_status(0);
    Ok(())
}

/// The value under `key`, or "" when the bus has none.
fn io_read(vm: &mut Vm) -> Result<(), RuntimeError> {
    let key = vm.pop_string()?;
    let value = bus(vm)?.read(&key)?.unwrap_or_default();
    vm.set_status(0);
    vm.push(Value::String(value));
    Ok(())
}

/// Data of the event whose ON EVENT handler is running.
fn event_data(vm: &mut Vm) -> Result<(), RuntimeError> {
    let data = vm.event_data().to_string();
    vm.push(Value::String(data));
    Ok(())
}

fn stick(vm: &mut Vm) -> Result<(), RuntimeError> {
    let axis = vm.pop_i64()? as i32;
    let Some(gamepad) = vm.devices.gamepad.as_deref() else {
        return Err(RuntimeError::unavailable("gamepad").recoverable());
    };
    let reading = gamepad.stick(axis);
    vm.push(Value::Integer(reading as i16));
    Ok(())
}

fn strig(vm: &mut Vm) -> Result<(), RuntimeError> {
    let button = vm.pop_i64()? as i32;
    let Some(gamepad) = vm.devices.gamepad.as_deref() else {
        return Err(RuntimeError::unavailable("gamepad").recoverable());
    };
    let pressed = gamepad.trigger(button);
    vm.push(Value::from_bool(pressed));
    Ok(())
}

fn pointer(vm: &mut Vm, read: fn((i32, i32), bool) -> Value) -> Result<(), RuntimeError> {
    let Some(pointer) = vm.devices.pointer.as_deref() else {
        return Err(RuntimeError::unavailable("pointer").recoverable());
    };
    let value = read(pointer.position(), pointer.is_down());
    vm.push(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::builtins::testing::{run, run_on};
    use crate::vm::Devices;
    use qbvm_runtime::{DeviceError, Gamepad, IoBus, Pointer, RecordingConsole};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Bus {
        values: Rc<RefCell<HashMap<String, String>>>,
    }

    impl IoBus for Bus {
        fn write(&mut self, key: &str, value: &str) -> Result<(), DeviceError> {
            self.values.borrow_mut().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn read(&mut self, key: &str) -> Result<Option<String>, DeviceError> {
            Ok(self.values.borrow().get(key).cloned())
        }
    }

    struct Pad;

    impl Gamepad for Pad {
        fn stick(&self, axis: i32) -> i32 {
            axis * 10
        }

        fn trigger(&self, button: i32) -> bool {
            button == 1
        }
    }

    struct Touch;

    impl Pointer for Touch {
        fn position(&self) -> (i32, i32) {
            (120, 45)
        }

        fn is_down(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_bus_read_write() {
        let bus = Bus::default();
        let console = RecordingConsole::new();
        let devices = Devices::new(console.clone()).with_io(bus.clone());
        let (_, result) = run_on(
            "IOWRITE \"led\", \"on\"\nPRINT IOREAD$(\"led\"); \"|\"; IOREAD$(\"fan\"); \"|\"",
            devices,
        );
        result.unwrap();
        assert_eq!(console.output(), "on||\n");
        assert_eq!(bus.values.borrow().get("led").map(String::as_str), Some("on"));
    }

    #[test]
    fn test_input_devices() {
        let console = RecordingConsole::new();
        let devices = Devices::new(console.clone())
            .with_gamepad(Pad)
            .with_pointer(Touch);
        let (_, result) = run_on(
            "PRINT STICK(2); STRIG(1); STRIG(2); POINTERX; POINTERY; POINTERDOWN",
            devices,
        );
        result.unwrap();
        assert_eq!(console.output(), "20-1012045-1\n");
    }

    #[test]
    fn test_missing_devices_read_as_zero() {
        assert_eq!(run("PRINT STICK(0); POINTERX; ERR"), "0073\n");
    }
}
