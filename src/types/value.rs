//! Runtime values.

use super::{ArrayValue, UserType};
use qbvm_runtime::string;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Shared, mutable storage for one variable, array slot or record member.
///
/// BY-REF parameters and GOSUB frames alias the same `Cell`.
pub type Cell = Rc<RefCell<Value>>;

/// Wraps a value in a fresh [`Cell`].
pub fn cell(value: Value) -> Cell {
    Rc::new(RefCell::new(value))
}

/// Error raised by a value operation. The VM maps these onto QBasic codes.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValueError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("subscript out of range")]
    SubscriptOutOfRange,

    #[error("division by zero")]
    DivisionByZero,

    #[error("illegal function call: {0}")]
    Illegal(String),

    #[error("out of memory: {0}")]
    OutOfMemory(String),
}

/// An instance of a user-defined record type.
#[derive(Debug, PartialEq)]
pub struct Record {
    pub ty: Rc<UserType>,
    /// One cell per member, in declaration order.
    pub fields: Vec<Cell>,
}

impl Clone for Record {
    /// Deep copy: the clone owns fresh member cells.
    fn clone(&self) -> Self {
        Self {
            ty: Rc::clone(&self.ty),
            fields: self
                .fields
                .iter()
                .map(|field| cell(field.borrow().clone()))
                .collect(),
        }
    }
}

impl Record {
    /// The cell holding `member`, if the record type has it.
    pub fn field(&self, member: &str) -> Option<Cell> {
        self.ty
            .member_index(member)
            .map(|i| Rc::clone(&self.fields[i]))
    }
}

/// A BASIC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i16),
    Long(i32),
    Single(f32),
    Double(f64),
    String(String),
    Json(serde_json::Value),
    Null,
    Array(ArrayValue),
    Record(Record),
}

impl Value {
    /// BASIC truth values: -1 for true, 0 for false.
    pub fn from_bool(b: bool) -> Value {
        Value::Integer(if b { -1 } else { 0 })
    }

    /// Name of the value's type, for diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::Integer(_) => "INTEGER".to_string(),
            Value::Long(_) => "LONG".to_string(),
            Value::Single(_) => "SINGLE".to_string(),
            Value::Double(_) => "DOUBLE".to_string(),
            Value::String(_) => "STRING".to_string(),
            Value::Json(_) => "JSON".to_string(),
            Value::Null => "NULL".to_string(),
            Value::Array(array) => format!("{}()", array.element().name()),
            Value::Record(record) => record.ty.name.to_ascii_uppercase(),
        }
    }

    /// The runtime type of this value.
    pub fn ty(&self) -> super::Type {
        use super::Type;
        match self {
            Value::Integer(_) => Type::Integer,
            Value::Long(_) => Type::Long,
            Value::Single(_) => Type::Single,
            Value::Double(_) => Type::Double,
            Value::String(_) => Type::String,
            Value::Json(_) => Type::Json,
            Value::Null => Type::Null,
            Value::Array(array) => Type::Array {
                element: Box::new(array.element().clone()),
                dims: array.bounds().len(),
            },
            Value::Record(record) => Type::User(Rc::clone(&record.ty)),
        }
    }

    /// Numeric view of the value; NULL reads as zero.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Long(n) => Some(*n as f64),
            Value::Single(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            Value::Null => Some(0.0),
            _ => None,
        }
    }

    /// Numeric view rounded half-to-even, as BASIC does for integer arguments.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n.round_ties_even() as i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Nonzero numbers are true.
    pub fn is_true(&self) -> bool {
        self.as_f64().is_some_and(|n| n != 0.0)
    }

    /// Text form used by PRINT (no padding).
    pub fn to_print_string(&self) -> String {
        match self {
            Value::Integer(n) => n.to_string(),
            Value::Long(n) => n.to_string(),
            Value::Single(n) => string::format_single(*n),
            Value::Double(n) => string::format_double(*n),
            Value::String(s) => s.clone(),
            Value::Json(json) => json.to_string(),
            Value::Null => String::new(),
            Value::Array(_) | Value::Record(_) => self.type_name(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
