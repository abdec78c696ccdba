//! Syntax errors.
//!
//! Every variant records the locus it refers to. The parser keeps going
//! after an error, so one run can report several.

use crate::ast::Locus;
use thiserror::Error;

/// A parse error with location and description.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Expected a specific token but found something else.
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        locus: Locus,
    },

    /// Reached end of input unexpectedly.
    #[error("unexpected end of file, expected {expected}")]
    UnexpectedEof {
        expected: String,
        /// Position of the last token.
        locus: Locus,
    },

    /// Invalid number literal.
    #[error("invalid number: {message}")]
    InvalidNumber {
        locus: Locus,
        message: String,
    },

    /// Missing END IF for block IF.
    #[error("missing END IF")]
    MissingEndIf { if_locus: Locus },

    /// Missing NEXT for FOR loop.
    #[error("missing NEXT for FOR loop")]
    MissingNext { for_locus: Locus },

    /// Missing WEND for WHILE loop.
    #[error("missing WEND for WHILE loop")]
    MissingWend { while_locus: Locus },

    /// Missing LOOP for DO loop.
    #[error("missing LOOP for DO")]
    MissingLoop { do_locus: Locus },

    /// Missing END SELECT for SELECT CASE.
    #[error("missing END SELECT")]
    MissingEndSelect { select_locus: Locus },

    /// Missing END SUB for SUB definition.
    #[error("missing END SUB")]
    MissingEndSub { sub_locus: Locus },

    /// Missing END FUNCTION for FUNCTION definition.
    #[error("missing END FUNCTION")]
    MissingEndFunction { function_locus: Locus },

    /// Missing END TYPE for TYPE definition.
    #[error("missing END TYPE")]
    MissingEndType {
        /// Location of the TYPE that's missing its END TYPE.
        type_locus: Locus,
    },

    /// General syntax error.
    #[error("{message}")]
    SyntaxError {
        locus: Locus,
        message: String,
    },
}

impl ParseError {
    /// Returns the locus of this error.
    pub fn locus(&self) -> Locus {
        match self {
            ParseError::UnexpectedToken { locus, .. } => *locus,
            ParseError::UnexpectedEof { locus, .. } => *locus,
            ParseError::InvalidNumber { locus, .. } => *locus,
            ParseError::MissingEndIf { if_locus } => *if_locus,
            ParseError::MissingNext { for_locus } => *for_locus,
            ParseError::MissingWend { while_locus } => *while_locus,
            ParseError::MissingLoop { do_locus } => *do_locus,
            ParseError::MissingEndSelect { select_locus } => *select_locus,
            ParseError::MissingEndSub { sub_locus } => *sub_locus,
            ParseError::MissingEndFunction { function_locus } => *function_locus,
            ParseError::MissingEndType { type_locus } => *type_locus,
            ParseError::SyntaxError { locus, .. } => *locus,
        }
    }

    /// Creates an "unexpected token" error.
    pub fn unexpected(expected: impl Into<String>, found: impl Into<String>, locus: Locus) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            locus,
        }
    }

    /// Creates an "unexpected EOF" error.
    pub fn eof(expected: impl Into<String>, locus: Locus) -> Self {
        ParseError::UnexpectedEof {
            expected: expected.into(),
            locus,
        }
    }

    /// Creates a syntax error with a message.
    pub fn syntax(message: impl Into<String>, locus: Locus) -> Self {
        ParseError::SyntaxError {
            locus,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_locus() {
        let err = ParseError::unexpected("THEN", "ELSE", Locus::new(2, 10));
        assert_eq!(err.locus(), Locus::new(2, 10));
    }

    #[test]
    fn test_eof_error() {
        let err = ParseError::eof("expression", Locus::new(1, 7));
        assert_eq!(err.locus(), Locus::new(1, 7));
        assert!(err.to_string().contains("end of file"));
    }

    #[test]
    fn test_syntax_error() {
        let err = ParseError::syntax("invalid operator", Locus::new(1, 1));
        assert!(err.to_string().contains("invalid operator"));
    }
}
