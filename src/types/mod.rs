//! The qbvm type system.
//!
//! [`Type`] is shared by the compiler and the VM: the type checker stamps it
//! on every expression, and the VM uses it to create variables and to coerce
//! values on assignment.
//!
//! # Coercion
//!
//! Every store goes through [`Type::copy`]. Numeric copies convert between
//! the four numeric kinds, and the integer kinds wrap rather than overflow:
//! `INTEGER` rounds half-to-even and keeps the low 16 bits, `LONG` the low 32.
//! Records and arrays are deep-copied, so assignment never aliases storage.
//!
//! # Example
//!
//! ```
//! use qbvm::types::{Type, Value};
//!
//! let v = Type::Integer.copy(&Value::Long(32768)).unwrap();
//! assert_eq!(v, Value::Integer(-32768));
//! ```

mod array;
mod value;

pub use array::ArrayValue;
pub use value::{Cell, Record, Value, ValueError, cell};

use crate::ast::BinaryOp;
use qbvm_runtime::math;
use std::fmt;
use std::rc::Rc;

/// A user-defined record type (`TYPE ... END TYPE`).
#[derive(Debug, Clone, PartialEq)]
pub struct UserType {
    pub name: String,
    /// Members in declaration order.
    pub members: Vec<(String, Type)>,
}

impl UserType {
    pub fn new(name: impl Into<String>, members: Vec<(String, Type)>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    /// Index of a member, matched case-insensitively.
    pub fn member_index(&self, member: &str) -> Option<usize> {
        self.members
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(member))
    }

    /// Type of a member, matched case-insensitively.
    pub fn member_type(&self, member: &str) -> Option<&Type> {
        self.member_index(member).map(|i| &self.members[i].1)
    }

    /// Creates a record with one default-valued cell per member.
    pub fn instantiate(self: &Rc<Self>) -> Value {
        let fields = self
            .members
            .iter()
            .map(|(_, ty)| cell(ty.default_value()))
            .collect();
        Value::Record(Record {
            ty: Rc::clone(self),
            fields,
        })
    }
}

/// A BASIC type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Integer,
    Long,
    Single,
    Double,
    String,
    /// A parsed JSON document.
    Json,
    /// Wildcard: compatible with everything.
    Any,
    /// The type of "no value".
    Null,
    /// Array of `element` with `dims` dimensions.
    Array { element: Box<Type>, dims: usize },
    /// Record type.
    User(Rc<UserType>),
}

impl Type {
    /// Canonical, upper-case type name.
    pub fn name(&self) -> String {
        match self {
            Type::Integer => "INTEGER".to_string(),
            Type::Long => "LONG".to_string(),
            Type::Single => "SINGLE".to_string(),
            Type::Double => "DOUBLE".to_string(),
            Type::String => "STRING".to_string(),
            Type::Json => "JSON".to_string(),
            Type::Any => "ANY".to_string(),
            Type::Null => "NULL".to_string(),
            Type::Array { element, .. } => format!("{}()", element.name()),
            Type::User(user) => user.name.to_ascii_uppercase(),
        }
    }

    /// The type a variable name's sigil implies.
    pub fn from_sigil(name: &str) -> Option<Type> {
        match name.chars().last()? {
            '%' => Some(Type::Integer),
            '&' => Some(Type::Long),
            '!' => Some(Type::Single),
            '#' => Some(Type::Double),
            '$' => Some(Type::String),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Long | Type::Single | Type::Double)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Width order of the numeric kinds, `None` for everything else.
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            Type::Integer => Some(0),
            Type::Long => Some(1),
            Type::Single => Some(2),
            Type::Double => Some(3),
            _ => None,
        }
    }

    /// A fresh, zeroed value of this type.
    ///
    /// Array types get QBasic's implicit bounds of `0 TO 10` per dimension.
    pub fn default_value(&self) -> Value {
        match self {
            Type::Integer => Value::Integer(0),
            Type::Long => Value::Long(0),
            Type::Single => Value::Single(0.0),
            Type::Double => Value::Double(0.0),
            Type::String => Value::String(String::new()),
            Type::Json => Value::Json(serde_json::Value::Null),
            Type::Any | Type::Null => Value::Null,
            Type::Array { element, dims } => {
                Value::Array(ArrayValue::implicit((**element).clone(), *dims))
            }
            Type::User(user) => user.instantiate(),
        }
    }

    /// Coerces `value` into this type.
    ///
    /// Idempotent: copying an already-copied value returns it unchanged.
    pub fn copy(&self, value: &Value) -> Result<Value, ValueError> {
        let mismatch = || ValueError::TypeMismatch {
            expected: self.name(),
            found: value.type_name(),
        };

        match self {
            Type::Integer => value
                .as_f64()
                .map(|n| Value::Integer(math::wrap_i16(math::round_even(n))))
                .ok_or_else(mismatch),
            Type::Long => value
                .as_f64()
                .map(|n| Value::Long(math::wrap_i32(math::round_even(n))))
                .ok_or_else(mismatch),
            Type::Single => value
                .as_f64()
                .map(|n| Value::Single(n as f32))
                .ok_or_else(mismatch),
            Type::Double => match value {
                // Widen through the shortest decimal so 0.1! stays 0.1.
                Value::Single(n) => Ok(Value::Double(
                    n.to_string().parse().unwrap_or(*n as f64),
                )),
                _ => value.as_f64().map(Value::Double).ok_or_else(mismatch),
            },
            Type::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            Type::Json => match value {
                Value::Json(_) => Ok(value.clone()),
                Value::Null => Ok(Value::Json(serde_json::Value::Null)),
                _ => Err(mismatch()),
            },
            Type::Any => Ok(value.clone()),
            Type::Null => Ok(Value::Null),
            Type::Array { .. } => match value {
                Value::Array(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            Type::User(user) => match value {
                Value::Record(record) if record.ty.name.eq_ignore_ascii_case(&user.name) => {
                    Ok(value.clone())
                }
                _ => Err(mismatch()),
            },
        }
    }

    /// Whether a value of `other` may be stored in or passed as `self`.
    ///
    /// Names match, numerics coerce freely, ANY matches anything and arrays
    /// compare by element type.
    pub fn is_compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Array { element: a, .. }, Type::Array { element: b, .. }) => {
                a.is_compatible(b)
            }
            (Type::Array { .. }, _) | (_, Type::Array { .. }) => false,
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (a, b) => a.name() == b.name(),
        }
    }

    /// The wider of two numeric types.
    pub fn wider(&self, other: &Type) -> Type {
        match (self.numeric_rank(), other.numeric_rank()) {
            (Some(a), Some(b)) if b > a => other.clone(),
            _ => self.clone(),
        }
    }
}

impl Default for Type {
    /// SINGLE, the type of an undeclared variable with no DEFtype in effect.
    fn default() -> Self {
        Type::Single
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result type of `left op right`, or `None` when the operands don't fit.
///
/// - `+` on two strings concatenates.
/// - Arithmetic takes the wider operand; `/` and `^` are at least SINGLE.
/// - `\`, `MOD` and the logical operators produce INTEGER or LONG.
/// - Comparisons produce INTEGER (-1 for true, 0 for false).
pub fn binary_result(op: BinaryOp, left: &Type, right: &Type) -> Option<Type> {
    let dynamic = |t: &Type| matches!(t, Type::Any | Type::Null);

    if op.is_comparison() {
        let comparable = dynamic(left)
            || dynamic(right)
            || (left.is_numeric() && right.is_numeric())
            || (*left == Type::String && *right == Type::String);
        return comparable.then_some(Type::Integer);
    }
    if dynamic(left) || dynamic(right) {
        return Some(Type::Any);
    }
    if op == BinaryOp::Add && *left == Type::String && *right == Type::String {
        return Some(Type::String);
    }
    if !left.is_numeric() || !right.is_numeric() {
        return None;
    }

    let wide = left.wider(right);
    Some(match op {
        BinaryOp::Divide | BinaryOp::Power => wide.wider(&Type::Single),
        BinaryOp::IntDivide | BinaryOp::Modulo => integral(&wide),
        op if op.is_logical() => integral(&wide),
        _ => wide,
    })
}

fn integral(ty: &Type) -> Type {
    if *ty == Type::Integer {
        Type::Integer
    } else {
        Type::Long
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_copy_wraps() {
        assert_eq!(
            Type::Integer.copy(&Value::Long(32768)).unwrap(),
            Value::Integer(-32768)
        );
        assert_eq!(
            Type::Integer.copy(&Value::Long(-32769)).unwrap(),
            Value::Integer(32767)
        );
        assert_eq!(
            Type::Long.copy(&Value::Double(2_147_483_648.0)).unwrap(),
            Value::Long(-2_147_483_648)
        );
    }

    #[test]
    fn test_integer_copy_rounds_half_even() {
        assert_eq!(
            Type::Integer.copy(&Value::Single(2.5)).unwrap(),
            Value::Integer(2)
        );
        assert_eq!(
            Type::Integer.copy(&Value::Double(3.5)).unwrap(),
            Value::Integer(4)
        );
    }

    #[test]
    fn test_copy_is_idempotent() {
        let samples = [
            Value::Integer(7),
            Value::Long(40000),
            Value::Single(1.5),
            Value::Double(-2.75),
            Value::Double(1e12),
        ];
        for ty in [Type::Integer, Type::Long, Type::Single, Type::Double] {
            for v in &samples {
                let once = ty.copy(v).unwrap();
                assert_eq!(ty.copy(&once).unwrap(), once, "{} of {:?}", ty, v);
            }
        }
    }

    #[test]
    fn test_string_number_mismatch() {
        assert!(matches!(
            Type::String.copy(&Value::Integer(1)),
            Err(ValueError::TypeMismatch { .. })
        ));
        assert!(Type::Integer.copy(&Value::String("1".into())).is_err());
    }

    #[test]
    fn test_compatibility() {
        assert!(Type::Integer.is_compatible(&Type::Double));
        assert!(Type::String.is_compatible(&Type::Any));
        assert!(!Type::String.is_compatible(&Type::Long));
        let ints = Type::Array {
            element: Box::new(Type::Integer),
            dims: 1,
        };
        let strs = Type::Array {
            element: Box::new(Type::String),
            dims: 1,
        };
        assert!(ints.is_compatible(&ints));
        assert!(!ints.is_compatible(&strs));
        assert!(!ints.is_compatible(&Type::Integer));
    }

    #[test]
    fn test_from_sigil() {
        assert_eq!(Type::from_sigil("A$"), Some(Type::String));
        assert_eq!(Type::from_sigil("N%"), Some(Type::Integer));
        assert_eq!(Type::from_sigil("N"), None);
    }

    #[test]
    fn test_binary_result() {
        use BinaryOp::*;
        assert_eq!(
            binary_result(Add, &Type::Integer, &Type::Integer),
            Some(Type::Integer)
        );
        assert_eq!(
            binary_result(Add, &Type::Integer, &Type::Double),
            Some(Type::Double)
        );
        assert_eq!(
            binary_result(Divide, &Type::Integer, &Type::Integer),
            Some(Type::Single)
        );
        assert_eq!(
            binary_result(Modulo, &Type::Double, &Type::Integer),
            Some(Type::Long)
        );
        assert_eq!(
            binary_result(Add, &Type::String, &Type::String),
            Some(Type::String)
        );
        assert_eq!(
            binary_result(LessThan, &Type::String, &Type::String),
            Some(Type::Integer)
        );
        assert_eq!(binary_result(Subtract, &Type::String, &Type::String), None);
        assert_eq!(binary_result(Add, &Type::String, &Type::Integer), None);
    }

    #[test]
    fn test_user_type_instantiate() {
        let person = Rc::new(UserType::new(
            "Person",
            vec![
                ("NAME".to_string(), Type::String),
                ("AGE".to_string(), Type::Integer),
            ],
        ));
        let Value::Record(record) = person.instantiate() else {
            panic!("expected a record");
        };
        assert_eq!(record.fields.len(), 2);
        assert_eq!(*record.fields[1].borrow(), Value::Integer(0));
        assert_eq!(person.member_index("age"), Some(1));
    }
}
