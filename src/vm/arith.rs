//! Operator evaluation.
//!
//! The result type of a binary operation is decided from the runtime types
//! of its operands with the same [`binary_result`] table the type checker
//! uses, and the result is stored through [`Type::copy`], so INTEGER and
//! LONG arithmetic wraps exactly like assignment does.

use super::error::{OVERFLOW, RuntimeError};
use crate::ast::BinaryOp;
use crate::types::{Type, Value, binary_result};
use qbvm_runtime::math;
use std::cmp::Ordering;

/// NULL reads as the empty string next to a string, zero otherwise.
fn materialize(value: Value, other: &Value) -> Value {
    match value {
        Value::Null if matches!(other, Value::String(_)) => Value::String(String::new()),
        Value::Null => Value::Integer(0),
        value => value,
    }
}

/// Evaluates `left op right`.
pub fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    let left = materialize(left, &right);
    let right = materialize(right, &left);

    let result_ty = binary_result(op, &left.ty(), &right.ty()).ok_or_else(|| {
        RuntimeError::type_mismatch(format!(
            "cannot apply {} to {} and {}",
            op.as_str(),
            left.type_name(),
            right.type_name()
        ))
    })?;

    if op.is_comparison() {
        return Ok(Value::from_bool(compare(op, &left, &right)?));
    }

    if let (Value::String(l), Value::String(r)) = (&left, &right) {
        // Only `+` reaches here for two strings.
        return Ok(Value::String(format!("{}{}", l, r)));
    }

    let (l, r) = numbers(&left, &right)?;
    let n = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Subtract => l - r,
        BinaryOp::Multiply => l * r,
        BinaryOp::Divide => {
            if r == 0.0 {
                return Err(RuntimeError::division_by_zero());
            }
            l / r
        }
        BinaryOp::Power => l.powf(r),
        BinaryOp::IntDivide | BinaryOp::Modulo => {
            let (l, r) = (long_operand(op, l)?, long_operand(op, r)?);
            if r == 0 {
                return Err(RuntimeError::division_by_zero());
            }
            let n = if op == BinaryOp::IntDivide {
                l.checked_div(r)
            } else {
                l.checked_rem(r)
            };
            n.ok_or_else(|| overflow(op))? as f64
        }
        _ => {
            let (l, r) = (math::round_even(l) as i64, math::round_even(r) as i64);
            (match op {
                BinaryOp::And => l & r,
                BinaryOp::Or => l | r,
                BinaryOp::Xor => l ^ r,
                BinaryOp::Eqv => !(l ^ r),
                BinaryOp::Imp => !l | r,
                _ => return Err(RuntimeError::internal(format!("bad operator {:?}", op))),
            }) as f64
        }
    };
    Ok(result_ty.copy(&Value::Double(n))?)
}

/// Rounds an operand of `\` or MOD, which must fit a LONG.
fn long_operand(op: BinaryOp, n: f64) -> Result<i64, RuntimeError> {
    let n = math::round_even(n);
    if !(i32::MIN as f64..=i32::MAX as f64).contains(&n) {
        return Err(overflow(op));
    }
    Ok(n as i64)
}

fn overflow(op: BinaryOp) -> RuntimeError {
    RuntimeError::new(OVERFLOW, format!("overflow in {}", op.as_str()))
}

fn numbers(left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(RuntimeError::type_mismatch(format!(
            "{} and {} are not both numeric",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    let ordering = match (left, right) {
        (Value::String(l), Value::String(r)) => l.cmp(r),
        _ => {
            let (l, r) = numbers(left, right)?;
            l.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
    };
    Ok(match op {
        BinaryOp::Equal => ordering == Ordering::Equal,
        BinaryOp::NotEqual => ordering != Ordering::Equal,
        BinaryOp::LessThan => ordering == Ordering::Less,
        BinaryOp::LessEqual => ordering != Ordering::Greater,
        BinaryOp::GreaterThan => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

/// Arithmetic negation, keeping the operand's type.
pub fn negate(value: Value) -> Result<Value, RuntimeError> {
    let ty = match value.ty() {
        Type::Null => Type::Integer,
        ty => ty,
    };
    let n = value
        .as_f64()
        .ok_or_else(|| RuntimeError::type_mismatch(format!("cannot negate {}", value.type_name())))?;
    Ok(ty.copy(&Value::Double(-n))?)
}

/// Bitwise NOT: INTEGER stays INTEGER, every other number becomes LONG.
pub fn not(value: Value) -> Result<Value, RuntimeError> {
    let n = value
        .as_f64()
        .ok_or_else(|| RuntimeError::type_mismatch(format!("NOT of {}", value.type_name())))?;
    let bits = !(math::round_even(n) as i64);
    let ty = if matches!(value, Value::Integer(_)) {
        Type::Integer
    } else {
        Type::Long
    };
    Ok(ty.copy(&Value::Double(bits as f64))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic_wraps() {
        let v = binary(BinaryOp::Add, Value::Integer(32767), Value::Integer(1)).unwrap();
        assert_eq!(v, Value::Integer(-32768));
    }

    #[test]
    fn test_division_promotes() {
        let v = binary(BinaryOp::Divide, Value::Integer(7), Value::Integer(2)).unwrap();
        assert_eq!(v, Value::Single(3.5));
        let v = binary(BinaryOp::IntDivide, Value::Integer(7), Value::Integer(2)).unwrap();
        assert_eq!(v, Value::Integer(3));
        let v = binary(BinaryOp::Modulo, Value::Integer(-7), Value::Integer(2)).unwrap();
        assert_eq!(v, Value::Integer(-1));
    }

    #[test]
    fn test_division_by_zero() {
        let err = binary(BinaryOp::Divide, Value::Integer(1), Value::Integer(0)).unwrap_err();
        assert_eq!(err.code, 11);
        assert!(binary(BinaryOp::Modulo, Value::Long(1), Value::Double(0.2)).is_err());
    }

    #[test]
    fn test_integer_division_range() {
        let v = binary(BinaryOp::IntDivide, Value::Long(i32::MIN), Value::Integer(-1)).unwrap();
        assert_eq!(v, Value::Long(i32::MIN));
        let v = binary(BinaryOp::Modulo, Value::Long(i32::MIN), Value::Integer(-1)).unwrap();
        assert_eq!(v, Value::Long(0));
        for op in [BinaryOp::IntDivide, BinaryOp::Modulo] {
            let err = binary(op, Value::Double(-1e30), Value::Integer(-1)).unwrap_err();
            assert_eq!(err.code, 6);
            let err = binary(op, Value::Integer(7), Value::Double(f64::NAN)).unwrap_err();
            assert_eq!(err.code, 6);
            let err = binary(op, Value::Double(2147483648.0), Value::Integer(3)).unwrap_err();
            assert_eq!(err.code, 6);
        }
    }

    #[test]
    fn test_strings() {
        let v = binary(BinaryOp::Add, Value::from("ab"), Value::from("cd")).unwrap();
        assert_eq!(v, Value::from("abcd"));
        let v = binary(BinaryOp::LessThan, Value::from("a"), Value::from("b")).unwrap();
        assert_eq!(v, Value::Integer(-1));
        let err = binary(BinaryOp::Add, Value::from("a"), Value::Integer(1)).unwrap_err();
        assert_eq!(err.code, 13);
    }

    #[test]
    fn test_logical_operators() {
        let v = binary(BinaryOp::And, Value::Integer(-1), Value::Integer(0)).unwrap();
        assert_eq!(v, Value::Integer(0));
        let v = binary(BinaryOp::Or, Value::Integer(4), Value::Integer(1)).unwrap();
        assert_eq!(v, Value::Integer(5));
        let v = binary(BinaryOp::Imp, Value::Integer(0), Value::Integer(0)).unwrap();
        assert_eq!(v, Value::Integer(-1));
    }

    #[test]
    fn test_unary() {
        assert_eq!(negate(Value::Integer(-32768)).unwrap(), Value::Integer(-32768));
        assert_eq!(negate(Value::Double(1.5)).unwrap(), Value::Double(-1.5));
        assert_eq!(not(Value::Integer(0)).unwrap(), Value::Integer(-1));
        assert_eq!(not(Value::Double(0.0)).unwrap(), Value::Long(-1));
    }

    #[test]
    fn test_null_operands() {
        let v = binary(BinaryOp::Add, Value::Null, Value::Integer(2)).unwrap();
        assert_eq!(v, Value::Integer(2));
        let v = binary(BinaryOp::Add, Value::Null, Value::from("x")).unwrap();
        assert_eq!(v, Value::from("x"));
    }
}
