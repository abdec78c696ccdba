//! # qbvm
//!
//! An interactive BASIC dialect: a QBasic-style compiler front end feeding a
//! cooperatively scheduled bytecode VM.
//!
//! ## Architecture
//!
//! ```text
//! Source (.bas) → Lexer → Parser → AST → Type checker → CodeGen → link → VM
//!                                                                     ↕
//!                                                         device adapters
//! ```
//!
//! Each phase is implemented as a separate module:
//!
//! - [`lexer`] - Tokenizes source code into a stream of tokens
//! - [`parser`] - Builds an Abstract Syntax Tree from tokens
//! - [`ast`] - AST type definitions
//! - [`semantic`] - Type checking and symbol resolution
//! - [`codegen`] - Lowering to bytecode and linking
//! - [`vm`] - The stack machine, its scheduler and the suspend/resume protocol
//! - [`builtins`] - The builtin function and subroutine registry
//! - [`types`] - BASIC types and runtime values
//! - [`lsp`] - Diagnostics-only Language Server Protocol implementation
//!
//! Device capabilities (console, files, network...) live in the
//! `qbvm-runtime` crate.
//!
//! ## Example
//!
//! ```
//! use qbvm::builtins::Registry;
//! use qbvm::vm::{Devices, Vm};
//! use qbvm_runtime::RecordingConsole;
//! use std::rc::Rc;
//!
//! let registry = Rc::new(Registry::standard());
//! let program = qbvm::compile("FOR i = 1 TO 3\nPRINT i;\nNEXT", &registry).unwrap();
//!
//! let console = RecordingConsole::new();
//! let mut vm = Vm::new(Devices::new(console.clone()), registry);
//! vm.run(program).unwrap();
//! assert_eq!(console.output(), "123");
//! ```

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod lexer;
pub mod lsp;
pub mod parser;
pub mod semantic;
pub mod types;
pub mod vm;

use builtins::Registry;
use codegen::{CodeGenError, QBasicProgram};
use lexer::LexError;
use parser::{ParseError, Parser};
use semantic::{SemanticAnalyzer, SemanticError};
use std::fmt;
use thiserror::Error;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::ast::{Expr, ExprKind, Locus, Program, Statement, StatementKind};
    pub use crate::builtins::{Builtin, Registry};
    pub use crate::codegen::{BytecodeBackend, CodeGenError, CodeGenerator, QBasicProgram};
    pub use crate::lexer::{Lexer, Token, TokenKind};
    pub use crate::parser::{ParseError, Parser};
    pub use crate::semantic::{SemanticAnalyzer, SemanticError};
    pub use crate::types::{Type, Value};
    pub use crate::vm::{Devices, RuntimeError, Vm, VmConfig, VmState};
    pub use crate::{CompileError, compile};
}

/// Why a source text did not compile. Each tier carries every error it
/// found, not just the first.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("{}", Listing(.0))]
    Lex(Vec<LexError>),

    #[error("{}", Listing(.0))]
    Parse(Vec<ParseError>),

    #[error("{}", Listing(.0))]
    Semantic(Vec<SemanticError>),

    #[error(transparent)]
    CodeGen(#[from] CodeGenError),
}

/// Errors one per line, each prefixed with its position.
struct Listing<'e, E>(&'e [E]);

trait Located: fmt::Display {
    fn position(&self) -> ast::Locus;
}

impl Located for LexError {
    fn position(&self) -> ast::Locus {
        self.locus()
    }
}

impl Located for ParseError {
    fn position(&self) -> ast::Locus {
        self.locus()
    }
}

impl Located for SemanticError {
    fn position(&self) -> ast::Locus {
        self.locus()
    }
}

impl<E: Located> fmt::Display for Listing<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", err.position(), err)?;
        }
        Ok(())
    }
}

impl CompileError {
    /// Number of individual errors.
    pub fn count(&self) -> usize {
        match self {
            CompileError::Lex(errors) => errors.len(),
            CompileError::Parse(errors) => errors.len(),
            CompileError::Semantic(errors) => errors.len(),
            CompileError::CodeGen(_) => 1,
        }
    }
}

/// Compiles BASIC source into a linked program.
///
/// Stops at the first tier that reports errors.
pub fn compile(source: &str, registry: &Registry) -> Result<QBasicProgram, CompileError> {
    let (tokens, lex_errors) = lexer::tokenize(source);
    if !lex_errors.is_empty() {
        return Err(CompileError::Lex(lex_errors));
    }

    let mut program = Parser::new(&tokens).parse().map_err(CompileError::Parse)?;

    let mut analyzer = SemanticAnalyzer::new(registry);
    let diagnostics = analyzer.analyze(&mut program);
    if !diagnostics.is_empty() {
        return Err(CompileError::Semantic(diagnostics));
    }

    let linked = codegen::generate(&program, analyzer.symbols(), registry)?;
    log::debug!(
        "compiled {} routine(s) into {} instructions",
        program.routines.len(),
        linked.instructions.len()
    );
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_ok() {
        let program = compile("PRINT \"hi\"", &Registry::standard()).unwrap();
        assert!(!program.instructions.is_empty());
    }

    #[test]
    fn test_lex_errors_stop_compilation() {
        let err = compile("PRINT \"open", &Registry::standard()).unwrap_err();
        assert!(matches!(err, CompileError::Lex(_)));
    }

    #[test]
    fn test_parse_errors_are_all_reported() {
        let err = compile("IF THEN\nFOR = 1\n", &Registry::standard()).unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        assert!(err.count() >= 2);
    }

    #[test]
    fn test_semantic_errors_are_listed_with_positions() {
        let err = compile("x$ = 1\nGOTO nowhere", &Registry::standard()).unwrap_err();
        let CompileError::Semantic(errors) = &err else {
            panic!("expected semantic errors, got {:?}", err);
        };
        assert_eq!(errors.len(), 2);
        assert!(err.to_string().starts_with("1:"));
    }
}
