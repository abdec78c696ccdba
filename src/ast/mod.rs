//! Abstract Syntax Tree (AST) definitions for qbvm.
//!
//! The AST represents the hierarchical structure of a BASIC program after parsing.
//! Each node in the tree corresponds to a syntactic construct in the source code.
//!
//! # Structure
//!
//! ```text
//! Program
//! └── Vec<Routine>            routines[0] is the main module body
//!     └── Vec<Statement>
//!         ├── Print { items: Vec<PrintItem>, ... }
//!         ├── Assign { target: Expr, value: Expr }
//!         ├── If { condition: Expr, then_branch, else_branch }
//!         └── ...
//! ```
//!
//! # Design Decisions
//!
//! - **Owned nodes**: AST nodes own their children (no lifetimes). This simplifies
//!   later compiler phases since the AST can outlive the source text.
//! - **Locus on every node**: Every node tracks its source line and column for
//!   diagnostics and for mapping bytecode back to source.
//! - **Closed sum types**: each pass (checker, code generator) walks the tree
//!   with an exhaustive `match`, so adding a node kind makes every pass that
//!   forgets it fail to compile.
//! - **Typed in place**: the type checker fills in [`Expr::ty`] and rewrites
//!   ambiguous `name(args)` nodes once it knows what `name` is.

mod expr;
mod stmt;

pub use expr::*;
pub use stmt::*;

use std::fmt;

/// A 1-based source position.
///
/// # Example
///
/// ```
/// use qbvm::ast::Locus;
///
/// let locus = Locus::new(3, 7);
/// assert_eq!(locus.to_string(), "3:7");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locus {
    /// Line number, starting at 1.
    pub line: usize,
    /// Column number, starting at 1.
    pub column: usize,
}

impl Locus {
    /// Creates a locus from a line and column.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Name of the implicit routine holding the module-level statements.
pub const MAIN_ROUTINE: &str = "_main";

/// A complete BASIC program.
///
/// The first routine is always the main module body; every SUB and
/// FUNCTION definition follows it in source order.
#[derive(Debug, Clone)]
pub struct Program {
    pub routines: Vec<Routine>,
}

impl Program {
    /// Creates a program with an empty main routine.
    pub fn new() -> Self {
        Self {
            routines: vec![Routine::main(Vec::new())],
        }
    }

    /// The module-level routine.
    pub fn main(&self) -> &Routine {
        &self.routines[0]
    }

    /// Looks up a SUB or FUNCTION by (case-insensitive) name.
    pub fn routine(&self, name: &str) -> Option<&Routine> {
        self.routines
            .iter()
            .skip(1)
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a routine is the main body, a SUB, or a FUNCTION.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Main,
    Sub,
    Function,
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutineKind::Main => write!(f, "MAIN"),
            RoutineKind::Sub => write!(f, "SUB"),
            RoutineKind::Function => write!(f, "FUNCTION"),
        }
    }
}

/// One compilation unit of statements: the main body, a SUB or a FUNCTION.
#[derive(Debug, Clone)]
pub struct Routine {
    pub kind: RoutineKind,
    pub name: String,
    pub params: Vec<Parameter>,
    /// `FUNCTION f(...) AS type`; otherwise the name's sigil decides.
    pub return_type: Option<TypeSpec>,
    pub body: Vec<Statement>,
    pub locus: Locus,
}

impl Routine {
    /// Creates the main routine around module-level statements.
    pub fn main(body: Vec<Statement>) -> Self {
        Self {
            kind: RoutineKind::Main,
            name: MAIN_ROUTINE.to_string(),
            params: Vec::new(),
            return_type: None,
            body,
            locus: Locus::new(1, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locus_ordering() {
        assert!(Locus::new(1, 9) < Locus::new(2, 1));
        assert!(Locus::new(2, 1) < Locus::new(2, 3));
    }

    #[test]
    fn test_program_has_main() {
        let program = Program::new();
        assert_eq!(program.routines.len(), 1);
        assert_eq!(program.main().kind, RoutineKind::Main);
        assert_eq!(program.main().name, MAIN_ROUTINE);
    }

    #[test]
    fn test_routine_lookup_is_case_insensitive() {
        let mut program = Program::new();
        program.routines.push(Routine {
            kind: RoutineKind::Sub,
            name: "Greet".to_string(),
            params: Vec::new(),
            return_type: None,
            body: Vec::new(),
            locus: Locus::new(3, 1),
        });
        assert!(program.routine("GREET").is_some());
        assert!(program.routine(MAIN_ROUTINE).is_none());
    }
}
