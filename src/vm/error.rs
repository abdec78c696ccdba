//! Runtime errors.
//!
//! Codes follow QBasic's error numbering so BASIC code reading `ERR` sees
//! familiar values.

use crate::ast::Locus;
use crate::types::ValueError;
use qbvm_runtime::DeviceError;
use std::fmt;
use thiserror::Error;

/// RETURN without GOSUB.
pub const RETURN_WITHOUT_GOSUB: u16 = 3;
/// READ past the last DATA item.
pub const OUT_OF_DATA: u16 = 4;
pub const ILLEGAL_FUNCTION_CALL: u16 = 5;
/// Numeric overflow, also used for call-stack overflow.
pub const OVERFLOW: u16 = 6;
pub const OUT_OF_MEMORY: u16 = 7;
pub const SUBSCRIPT_OUT_OF_RANGE: u16 = 9;
pub const DIVISION_BY_ZERO: u16 = 11;
pub const TYPE_MISMATCH: u16 = 13;
/// Stack underflow or malformed bytecode.
pub const INTERNAL_ERROR: u16 = 51;
pub const BAD_FILE_NUMBER: u16 = 52;
pub const FILE_NOT_FOUND: u16 = 53;
pub const DEVICE_IO_ERROR: u16 = 57;
/// Unknown syscall or missing device.
pub const FEATURE_UNAVAILABLE: u16 = 73;

/// An error raised while executing bytecode.
///
/// Recoverable errors are absorbed at the syscall boundary and reported to
/// BASIC code through `ERR`; everything else stops the VM.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct RuntimeError {
    pub code: u16,
    pub message: String,
    pub locus: Option<Locus>,
    pub recoverable: bool,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (error {})", self.message, self.code)?;
        if let Some(locus) = self.locus {
            write!(f, " at {}", locus)?;
        }
        Ok(())
    }
}

impl RuntimeError {
    /// A fatal error with `code`.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            locus: None,
            recoverable: false,
        }
    }

    /// Marks the error as recoverable.
    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }

    /// Attaches a locus unless one is already known.
    pub fn with_locus(mut self, locus: Locus) -> Self {
        self.locus.get_or_insert(locus);
        self
    }

    pub fn illegal_call(message: impl Into<String>) -> Self {
        Self::new(ILLEGAL_FUNCTION_CALL, message)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(TYPE_MISMATCH, message)
    }

    pub fn division_by_zero() -> Self {
        Self::new(DIVISION_BY_ZERO, "division by zero")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::new(FEATURE_UNAVAILABLE, format!("{} is not available", what.into()))
    }

    pub fn bad_file_number(file_num: i64) -> Self {
        Self::new(BAD_FILE_NUMBER, format!("bad file number #{}", file_num)).recoverable()
    }
}

impl From<ValueError> for RuntimeError {
    fn from(err: ValueError) -> Self {
        let code = match err {
            ValueError::TypeMismatch { .. } => TYPE_MISMATCH,
            ValueError::SubscriptOutOfRange => SUBSCRIPT_OUT_OF_RANGE,
            ValueError::DivisionByZero => DIVISION_BY_ZERO,
            ValueError::Illegal(_) => ILLEGAL_FUNCTION_CALL,
            ValueError::OutOfMemory(_) => OUT_OF_MEMORY,
        };
        Self::new(code, err.to_string())
    }
}

/// Device failures are always recoverable.
impl From<DeviceError> for RuntimeError {
    fn from(err: DeviceError) -> Self {
        Self::new(err.code(), err.to_string()).recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_locus_keeps_first() {
        let err = RuntimeError::division_by_zero()
            .with_locus(Locus::new(3, 7))
            .with_locus(Locus::new(9, 1));
        assert_eq!(err.locus, Some(Locus::new(3, 7)));
        assert_eq!(err.to_string(), "division by zero (error 11) at 3:7");
    }

    #[test]
    fn test_value_error_codes() {
        assert_eq!(RuntimeError::from(ValueError::SubscriptOutOfRange).code, 9);
        assert_eq!(
            RuntimeError::from(ValueError::TypeMismatch {
                expected: "STRING".into(),
                found: "INTEGER".into()
            })
            .code,
            13
        );
    }

    #[test]
    fn test_device_errors_are_recoverable() {
        let err = RuntimeError::from(DeviceError::NotFound("a.txt".into()));
        assert_eq!(err.code, FILE_NOT_FOUND);
        assert!(err.recoverable);
    }
}
