//! Code generation error types.
//!
//! The type checker catches almost everything first, so a code generation
//! error means either a program that still has diagnostics was handed over,
//! or a compiler bug.

use crate::ast::Locus;
use std::fmt;
use thiserror::Error;

/// An error that occurred during code generation or linking.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeGenError {
    /// The kind of error.
    pub kind: CodeGenErrorKind,
    /// Source location where the error occurred.
    pub locus: Option<Locus>,
    /// Additional context about the error.
    pub context: Option<String>,
}

impl CodeGenError {
    /// Creates a new code generation error.
    pub fn new(kind: CodeGenErrorKind) -> Self {
        Self {
            kind,
            locus: None,
            context: None,
        }
    }

    /// Adds a source locus to the error.
    pub fn with_locus(mut self, locus: Locus) -> Self {
        self.locus = Some(locus);
        self
    }

    /// Adds context information to the error.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// A reference the type checker should have rejected or resolved.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::new(CodeGenErrorKind::Unresolved(name.into()))
    }

    /// Creates an internal error (compiler bug).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CodeGenErrorKind::Internal(message.into()))
    }
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code generation error: {}", self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({})", ctx)?;
        }
        if let Some(locus) = &self.locus {
            write!(f, " at {}", locus)?;
        }
        Ok(())
    }
}

impl std::error::Error for CodeGenError {}

/// The specific kind of code generation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodeGenErrorKind {
    /// A name with no procedure, builtin or label behind it.
    #[error("unresolved reference '{0}'")]
    Unresolved(String),

    /// A label was referenced but never placed.
    #[error("label L{0} was never placed")]
    UnplacedLabel(usize),

    /// `link` was called on an already linked program.
    #[error("program is already linked")]
    AlreadyLinked,

    /// Internal compiler error (indicates a bug).
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodeGenError::unresolved("FOO");
        assert!(err.to_string().contains("unresolved reference 'FOO'"));
    }

    #[test]
    fn test_error_with_locus() {
        let err = CodeGenError::unresolved("X").with_locus(Locus::new(10, 2));
        assert!(err.to_string().ends_with("at 10:2"));
    }

    #[test]
    fn test_error_with_context() {
        let err = CodeGenError::internal("missing case").with_context("in emit_expr");
        assert!(err.to_string().contains("in emit_expr"));
    }
}
