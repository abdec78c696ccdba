//! Device error type.
//!
//! Every capability method that can fail returns a [`DeviceError`]. The VM
//! turns these into recoverable runtime errors so BASIC code can branch on
//! `ERR` instead of the whole program stopping.

use thiserror::Error;

/// An error reported by a device adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The requested file or resource does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The device failed while performing the operation.
    #[error("device I/O error: {0}")]
    Io(String),

    /// The host did not install this capability.
    #[error("{0} is not available on this host")]
    Unsupported(String),

    /// A socket or channel was used after it closed.
    #[error("channel closed: {0}")]
    Closed(String),

    /// Console input ran out.
    #[error("input past end")]
    EndOfInput,
}

impl DeviceError {
    /// Returns the QBasic error number this failure maps to.
    pub fn code(&self) -> u16 {
        match self {
            DeviceError::NotFound(_) => 53,
            DeviceError::Io(_) => 57,
            DeviceError::Unsupported(_) => 73,
            DeviceError::Closed(_) => 57,
            DeviceError::EndOfInput => 62,
        }
    }
}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => DeviceError::NotFound(err.to_string()),
            std::io::ErrorKind::UnexpectedEof => DeviceError::EndOfInput,
            _ => DeviceError::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(DeviceError::NotFound("a.txt".into()).code(), 53);
        assert_eq!(DeviceError::Io("disk".into()).code(), 57);
        assert_eq!(DeviceError::Unsupported("audio".into()).code(), 73);
    }

    #[test]
    fn test_from_io_error() {
        let err: DeviceError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, DeviceError::NotFound(_)));
    }
}
