//! SLEEP, RANDOMIZE, SWAP, array bounds, ERR and HASH$.

use super::{Builtin, Registry, any_array};
use crate::types::{Type, Value};
use crate::vm::{Completion, DeviceRequest, RuntimeError, StackItem, Vm, error, store};
use qbvm_runtime::math;
use std::rc::Rc;
use std::time::Duration;

pub(super) fn register(registry: &mut Registry) {
    registry.register_sub(Builtin::sub("SLEEP", vec![Type::Single], sleep).optional(0));
    registry.register_sub(Builtin::sub("RANDOMIZE", vec![Type::Double], randomize).optional(0));
    registry.register_sub(Builtin::sub("SWAP", vec![Type::Any, Type::Any], swap).by_ref());

    registry.register_function(
        Builtin::function("LBOUND", Type::Long, vec![any_array(), Type::Integer], |vm| {
            bound(vm, |array, dim| array.lbound(dim))
        })
        .optional(1),
    );
    registry.register_function(
        Builtin::function("UBOUND", Type::Long, vec![any_array(), Type::Integer], |vm| {
            bound(vm, |array, dim| array.ubound(dim))
        })
        .optional(1),
    );

    registry.register_function(Builtin::function("ERR", Type::Integer, vec![], err));
    registry.register_function(Builtin::function(
        "HASH$",
        Type::String,
        vec![Type::String, Type::String],
        hash,
    ));
}

/// `SLEEP [seconds]`; zero, negative or no argument returns at once.
fn sleep(vm: &mut Vm) -> Result<(), RuntimeError> {
    let seconds = if vm.pop_arg_count(1)? == 1 {
        vm.pop_f64()?
    } else {
        0.0
    };
    if !seconds.is_finite() || seconds <= 0.0 {
        return Ok(());
    }
    vm.suspend(
        DeviceRequest::Sleep(Duration::from_secs_f64(seconds)),
        Completion::Ignore,
    )
}

/// `RANDOMIZE [seed]`, seeding from TIMER without one.
fn randomize(vm: &mut Vm) -> Result<(), RuntimeError> {
    let seed = if vm.pop_arg_count(1)? == 1 {
        vm.pop_f64()?
    } else {
        math::timer()
    };
    vm.rnd().randomize(seed);
    Ok(())
}

fn swap(vm: &mut Vm) -> Result<(), RuntimeError> {
    let b = vm.pop_ref()?;
    let a = vm.pop_ref()?;
    if Rc::ptr_eq(&a, &b) {
        return Ok(());
    }
    let a_value = a.borrow().clone();
    let b_value = b.borrow().clone();
    store(&a, b_value)?;
    store(&b, a_value)
}

/// LBOUND/UBOUND of a 1-based dimension, the first by default.
fn bound(
    vm: &mut Vm,
    read: fn(&crate::types::ArrayValue, usize) -> Option<i64>,
) -> Result<(), RuntimeError> {
    let dim = if vm.pop_arg_count(2)? == 2 {
        vm.pop_i64()?
    } else {
        1
    };
    let found = match vm.pop()? {
        StackItem::Ref(storage) => match &*storage.borrow() {
            Value::Array(array) => usize::try_from(dim).ok().and_then(|d| read(array, d)),
            other => return Err(not_an_array(other)),
        },
        StackItem::Value(Value::Array(array)) => usize::try_from(dim).ok().and_then(|d| read(&array, d)),
        StackItem::Value(other) => return Err(not_an_array(&other)),
    };
    let bound = found.ok_or_else(|| {
        RuntimeError::new(error::SUBSCRIPT_OUT_OF_RANGE, format!("no dimension {}", dim))
    })?;
    vm.push(Value::Long(bound as i32));
    Ok(())
}

fn not_an_array(value: &Value) -> RuntimeError {
    RuntimeError::type_mismatch(format!("{} is not an array", value.type_name()))
}

/// Code of the last recoverable error, 0 when the last device call
/// succeeded.
fn err(vm: &mut Vm) -> Result<(), RuntimeError> {
    let code = vm.status();
    vm.push(Value::Integer(code as i16));
    Ok(())
}

/// `HASH$(algorithm$, data$)`: hex digest from the crypto device.
fn hash(vm: &mut Vm) -> Result<(), RuntimeError> {
    let data = vm.pop_string()?;
    let algorithm = vm.pop_string()?;
    vm.suspend(
        DeviceRequest::Digest { algorithm, data },
        Completion::PushString,
    )
}

#[cfg(test)]
mod tests {
    use crate::builtins::testing::{run, run_err, run_on};
    use crate::vm::Devices;
    use qbvm_runtime::{Crypto, DeviceError, RecordingConsole};

    #[test]
    fn test_swap() {
        assert_eq!(run("a$ = \"x\"\nb$ = \"y\"\nSWAP a$, b$\nPRINT a$; b$"), "yx\n");
        assert_eq!(
            run("DIM n(2) AS INTEGER\nn(1) = 5\nn(2) = 9\nSWAP n(1), n(2)\nPRINT n(1); n(2)"),
            "95\n"
        );
        // Mixed numeric types coerce on the way in.
        assert_eq!(run("i% = 3\nd# = 2.5\nSWAP i%, d#\nPRINT i%; d#"), "23\n");
    }

    #[test]
    fn test_bounds() {
        let source = "DIM grid(1 TO 4, -2 TO 2) AS INTEGER\nPRINT LBOUND(grid); UBOUND(grid); LBOUND(grid, 2); UBOUND(grid, 2)";
        assert_eq!(run(source), "14-22\n");
        assert_eq!(run_err("DIM a(3)\nPRINT UBOUND(a, 2)").code, 9);
        assert_eq!(run_err("DIM a(3)\nPRINT LBOUND(a, 0)").code, 9);
    }

    #[test]
    fn test_bounds_with_explicit_dimension() {
        assert_eq!(
            run("DIM a(1 TO 3, 1 TO 2)\nPRINT UBOUND(a, 2); LBOUND(a, 1); UBOUND(a)"),
            "213\n"
        );
    }

    #[test]
    fn test_bounds_after_redim() {
        assert_eq!(run("REDIM list(5)\nREDIM list(1 TO 20)\nPRINT LBOUND(list); UBOUND(list)"), "120\n");
    }

    #[test]
    fn test_sleep_zero_does_not_suspend() {
        assert_eq!(run("SLEEP 0\nSLEEP\nPRINT \"done\""), "done\n");
    }

    struct Reverse;

    impl Crypto for Reverse {
        fn digest(&mut self, algorithm: &str, data: &str) -> Result<String, DeviceError> {
            match algorithm {
                "REV" => Ok(data.chars().rev().collect()),
                other => Err(DeviceError::Unsupported(other.to_string())),
            }
        }
    }

    #[test]
    fn test_hash_suspends_through_crypto() {
        let console = RecordingConsole::new();
        let devices = Devices::new(console.clone()).with_crypto(Reverse);
        let (_, result) = run_on(
            "PRINT HASH$(\"REV\", \"abc\")\nh$ = HASH$(\"MD4\", \"abc\")\nPRINT ERR; LEN(h$)",
            devices,
        );
        result.unwrap();
        assert_eq!(console.output(), "cba\n730\n");
    }
}
