//! Numeric functions.

use super::{Action, Builtin, Registry};
use crate::types::{Type, Value};
use crate::vm::error::OVERFLOW;
use crate::vm::{RuntimeError, Vm};
use qbvm_runtime::math;

pub(super) fn register(registry: &mut Registry) {
    let unary = |name: &str, ret: Type, action: Action| {
        Builtin::function(name, ret, vec![Type::Double], action)
    };

    registry.register_function(unary("ABS", Type::Double, abs));
    registry.register_function(unary("ATN", Type::Double, |vm| float(vm, f64::atan)));
    registry.register_function(unary("COS", Type::Double, |vm| float(vm, f64::cos)));
    registry.register_function(unary("SIN", Type::Double, |vm| float(vm, f64::sin)));
    registry.register_function(unary("TAN", Type::Double, |vm| float(vm, f64::tan)));
    registry.register_function(unary("EXP", Type::Double, exp));
    registry.register_function(unary("LOG", Type::Double, log));
    registry.register_function(unary("SQR", Type::Double, sqr));
    registry.register_function(unary("INT", Type::Double, |vm| float(vm, math::int)));
    registry.register_function(unary("FIX", Type::Double, |vm| float(vm, math::fix)));
    registry.register_function(unary("SGN", Type::Integer, sgn));
    registry.register_function(unary("CINT", Type::Integer, cint));
    registry.register_function(unary("CLNG", Type::Long, clng));
    registry.register_function(unary("CSNG", Type::Single, csng));
    registry.register_function(unary("CDBL", Type::Double, |vm| float(vm, |n| n)));
    registry.register_function(
        Builtin::function("RND", Type::Single, vec![Type::Double], rnd).optional(0),
    );
    registry.register_function(Builtin::function("TIMER", Type::Single, vec![], timer));
}

/// Applies `f` to one DOUBLE argument.
fn float(vm: &mut Vm, f: fn(f64) -> f64) -> Result<(), RuntimeError> {
    let n = vm.pop_f64()?;
    vm.push(Value::Double(f(n)));
    Ok(())
}

/// ABS keeps its argument's type.
fn abs(vm: &mut Vm) -> Result<(), RuntimeError> {
    let result = match vm.pop_value()? {
        Value::Integer(n) => n
            .checked_abs()
            .map(Value::Integer)
            .ok_or_else(|| overflow("ABS"))?,
        Value::Long(n) => n
            .checked_abs()
            .map(Value::Long)
            .ok_or_else(|| overflow("ABS"))?,
        Value::Single(n) => Value::Single(n.abs()),
        other => {
            let n = other.as_f64().ok_or_else(|| {
                RuntimeError::type_mismatch(format!("ABS of {}", other.type_name()))
            })?;
            Value::Double(n.abs())
        }
    };
    vm.push(result);
    Ok(())
}

fn exp(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_f64()?.exp();
    if n.is_infinite() {
        return Err(overflow("EXP"));
    }
    vm.push(Value::Double(n));
    Ok(())
}

fn log(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_f64()?;
    if n <= 0.0 {
        return Err(RuntimeError::illegal_call(format!("LOG of {}", n)));
    }
    vm.push(Value::Double(n.ln()));
    Ok(())
}

fn sqr(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_f64()?;
    if n < 0.0 {
        return Err(RuntimeError::illegal_call(format!("SQR of {}", n)));
    }
    vm.push(Value::Double(n.sqrt()));
    Ok(())
}

fn sgn(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_f64()?;
    vm.push(Value::Integer(math::sgn(n)));
    Ok(())
}

fn cint(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = math::round_even(vm.pop_f64()?);
    if n < i16::MIN as f64 || n > i16::MAX as f64 {
        return Err(overflow("CINT"));
    }
    vm.push(Value::Integer(n as i16));
    Ok(())
}

fn clng(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = math::round_even(vm.pop_f64()?);
    if n < i32::MIN as f64 || n > i32::MAX as f64 {
        return Err(overflow("CLNG"));
    }
    vm.push(Value::Long(n as i32));
    Ok(())
}

fn csng(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.pop_f64()?;
    vm.push(Value::Single(n as f32));
    Ok(())
}

/// RND ignores its argument and always draws the next number.
fn rnd(vm: &mut Vm) -> Result<(), RuntimeError> {
    if vm.pop_arg_count(1)? == 1 {
        vm.pop()?;
    }
    let n = vm.rnd().next();
    vm.push(Value::Single(n as f32));
    Ok(())
}

fn timer(vm: &mut Vm) -> Result<(), RuntimeError> {
    vm.push(Value::Single(math::timer() as f32));
    Ok(())
}

fn overflow(what: &str) -> RuntimeError {
    RuntimeError::new(OVERFLOW, format!("overflow in {}", what))
}

#[cfg(test)]
mod tests {
    use crate::builtins::testing::{run, run_err};

    #[test]
    fn test_rounding_functions() {
        assert_eq!(run("PRINT INT(-2.5); FIX(-2.5); CINT(2.5); CINT(3.5)"), "-3-224\n");
        assert_eq!(run("PRINT SGN(-7); SGN(0); SGN(3)"), "-101\n");
    }

    #[test]
    fn test_abs_keeps_type() {
        assert_eq!(run("x% = -5\nPRINT ABS(x%)"), "5\n");
        assert_eq!(run("PRINT ABS(-1.5)"), "1.5\n");
    }

    #[test]
    fn test_conversions_overflow() {
        assert_eq!(run_err("PRINT CINT(40000)").code, 6);
        assert_eq!(run("PRINT CLNG(40000)"), "40000\n");
    }

    #[test]
    fn test_domain_errors() {
        assert_eq!(run_err("PRINT SQR(-1)").code, 5);
        assert_eq!(run_err("PRINT LOG(0)").code, 5);
        assert_eq!(run("PRINT SQR(16)"), "4\n");
    }

    #[test]
    fn test_rnd_is_reproducible() {
        let first = run("PRINT RND; RND(1)");
        assert_eq!(first, run("PRINT RND; RND(5)"));
        assert_ne!(first, run("RANDOMIZE 42\nPRINT RND; RND"));
    }
}
