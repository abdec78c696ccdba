//! Parser for qbvm BASIC.
//!
//! The parser transforms a stream of tokens into an Abstract Syntax Tree (AST).
//! It uses recursive descent for statements and Pratt parsing (precedence climbing)
//! for expressions.
//!
//! # Example
//!
//! ```
//! use qbvm::lexer::lex;
//! use qbvm::parser::Parser;
//!
//! let source = r#"
//!     PRINT "Hello, World!"
//!     x = 1 + 2
//! "#;
//!
//! let tokens = lex(source).expect("lex failed");
//! let mut parser = Parser::new(&tokens);
//! let program = parser.parse().expect("parse failed");
//!
//! assert_eq!(program.main().body.len(), 2);
//! ```
//!
//! # Module Structure
//!
//! The parser is split into focused modules:
//! - [`tokens`] - Token navigation utilities (peek, advance, match, expect)
//! - [`expressions`] - Pratt parser for expressions
//! - [`statements`] - Statement dispatcher and simple statements
//! - [`control_flow`] - IF/FOR/WHILE/DO/SELECT parsing
//! - [`procedures`] - SUB/FUNCTION/TYPE/DECLARE definitions
//! - [`error`] - Parse error types
//!
//! # Error Recovery
//!
//! The parser attempts to recover from errors and continue parsing to report
//! multiple errors at once. This provides better feedback to users than stopping
//! at the first error.

mod control_flow;
mod error;
mod expressions;
mod procedures;
mod statements;
mod tokens;

pub use error::ParseError;

use crate::ast::{Program, Routine};
use crate::lexer::{Token, TokenKind};

/// Parser for BASIC source code.
///
/// The parser consumes a slice of tokens and produces an AST.
/// Errors are collected and returned at the end rather than failing immediately.
pub struct Parser<'a> {
    /// The tokens to parse.
    tokens: &'a [Token],
    /// Current position in the token stream.
    current: usize,
    /// Collected parse errors.
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given tokens.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    /// Parses the token stream into a program AST.
    ///
    /// Returns the program if successful, or the collected errors if parsing failed.
    pub fn parse(&mut self) -> Result<Program, Vec<ParseError>> {
        let program = self.parse_program();
        log::debug!(
            "parsed {} routine(s), {} error(s)",
            program.routines.len(),
            self.errors.len()
        );

        if self.errors.is_empty() {
            Ok(program)
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    /// Parses a complete program.
    ///
    /// Module-level statements form the main routine; each SUB and FUNCTION
    /// becomes a routine of its own.
    fn parse_program(&mut self) -> Program {
        let mut main_body = Vec::new();
        let mut routines: Vec<Routine> = Vec::new();

        loop {
            self.skip_separators();
            let Some(kind) = self.peek_kind() else {
                break;
            };

            match kind {
                TokenKind::Sub | TokenKind::Function => match self.parse_routine() {
                    Ok(routine) => routines.push(routine),
                    Err(()) => self.synchronize(),
                },
                _ => match self.parse_statement() {
                    Ok(stmt) => main_body.push(stmt),
                    Err(()) => self.synchronize(),
                },
            }
        }

        let mut program = Program::new();
        program.routines[0].body = main_body;
        program.routines.extend(routines);
        program
    }
}

/// Operator precedence levels for Pratt parsing.
///
/// Higher values mean higher precedence (bind tighter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    Lowest,
    Imp,
    Eqv,
    Xor,
    Or,
    And,
    Not,            // NOT (handled as unary)
    Comparison,     // =, <>, <, >, <=, >=
    Additive,       // +, -
    Modulo,         // MOD
    IntDivide,      // \
    Multiplicative, // *, /
    Unary,          // - (negation)
    Power,          // ^
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{RoutineKind, StatementKind};
    use crate::lexer::lex;

    fn parse(source: &str) -> Result<Program, Vec<ParseError>> {
        let tokens = lex(source).unwrap();
        let mut parser = Parser::new(&tokens);
        parser.parse()
    }

    #[test]
    fn test_parse_print() {
        let program = parse("PRINT 1 + 2").unwrap();
        assert_eq!(program.main().body.len(), 1);
    }

    #[test]
    fn test_parse_assignment() {
        let program = parse("x = 5").unwrap();
        assert!(matches!(
            program.main().body[0].kind,
            StatementKind::Assign { .. }
        ));
    }

    #[test]
    fn test_parse_multiple_statements() {
        let program = parse("\nPRINT \"Hello\"\nx = 5\nPRINT x\n").unwrap();
        assert_eq!(program.main().body.len(), 3);
    }

    #[test]
    fn test_routines_are_split_out() {
        let program = parse(
            "CALL Greet\nSUB Greet\n  PRINT \"hi\"\nEND SUB\nFUNCTION Twice%(n%)\n  Twice% = n% * 2\nEND FUNCTION\nPRINT Twice%(2)\n",
        )
        .unwrap();
        assert_eq!(program.routines.len(), 3);
        assert_eq!(program.main().body.len(), 2);
        assert_eq!(program.routines[1].kind, RoutineKind::Sub);
        assert_eq!(program.routines[1].name, "GREET");
        assert_eq!(program.routines[2].kind, RoutineKind::Function);
        assert_eq!(program.routines[2].params.len(), 1);
    }

    #[test]
    fn test_multiple_errors_reported() {
        let errors = parse("x = )\nPRINT 1\ny = (\n").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].locus().line, 1);
        assert_eq!(errors[1].locus().line, 3);
    }

    #[test]
    fn test_stray_terminator_is_an_error() {
        assert!(parse("WEND\n").is_err());
        assert!(parse("END IF\n").is_err());
    }
}
