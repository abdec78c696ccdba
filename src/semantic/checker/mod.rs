//! Type checker for qbvm semantic analysis.
//!
//! The type checker walks each routine's statements, stamps a [`Type`] on
//! every expression and resolves `name(args)` references. It handles:
//!
//! - **Expression type inference**: literals, operators, variables, calls
//! - **Reference resolution**: array element vs FUNCTION vs builtin
//! - **Assignment type checking**: ensuring values fit their targets
//! - **Call validation**: argument count and type checking
//! - **Control flow validation**: EXIT context, FOR/NEXT matching, labels
//!
//! # Module Structure
//!
//! - [`expressions`] - expression typing and reference resolution
//! - [`statements`] - statement dispatcher, I/O and calls
//! - [`assignments`] - assignment targets and lvalue checks
//! - [`control_flow`] - IF, SELECT CASE, loops, jumps
//! - [`definitions`] - DIM/REDIM/CONST, type specs and constant folding
//!
//! # Error Recovery
//!
//! The type checker continues after errors, typing the offending
//! expression as ANY so one mistake does not cascade.

mod assignments;
mod control_flow;
mod definitions;
mod expressions;
mod statements;

pub(crate) use definitions::{const_type, resolve_type_spec};

use crate::ast::{ExitType, Expr, Locus, Routine, RoutineKind, Statement};
use crate::builtins::Registry;
use crate::semantic::error::SemanticError;
use crate::semantic::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::types::Type;

/// The kind of an enclosing loop, for EXIT validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopKind {
    For,
    While,
    Do,
}

/// Bundles FOR loop components for type checking.
pub(crate) struct ForLoopInfo<'s> {
    /// Loop counter variable name.
    pub variable: &'s str,
    pub start: &'s mut Expr,
    pub end: &'s mut Expr,
    pub step: Option<&'s mut Expr>,
    pub body: &'s mut [Statement],
    /// Variable named after NEXT, for validation.
    pub next_variable: Option<&'s (String, Locus)>,
    pub locus: Locus,
}

/// The type checker validates and annotates the AST with types.
pub struct TypeChecker<'a> {
    pub(crate) symbols: &'a mut SymbolTable,
    pub(crate) registry: &'a Registry,
    /// Accumulated errors.
    pub errors: Vec<SemanticError>,
    /// Enclosing loops, innermost last.
    pub(crate) loops: Vec<LoopKind>,
    /// Name and kind of the routine being checked.
    pub(crate) routine: String,
    pub(crate) routine_kind: RoutineKind,
    /// Block nesting depth inside the current routine.
    pub(crate) depth: usize,
}

impl<'a> TypeChecker<'a> {
    /// Creates a new type checker.
    pub fn new(symbols: &'a mut SymbolTable, registry: &'a Registry) -> Self {
        Self {
            symbols,
            registry,
            errors: Vec::new(),
            loops: Vec::new(),
            routine: String::new(),
            routine_kind: RoutineKind::Main,
            depth: 0,
        }
    }

    /// Type checks one routine in a fresh local scope.
    ///
    /// Parameters become locals; a FUNCTION's name is the local variable
    /// holding its return value.
    pub fn check_routine(&mut self, routine: &mut Routine) {
        self.routine = routine.name.clone();
        self.routine_kind = routine.kind;
        self.loops.clear();
        self.depth = 0;
        self.symbols.enter_scope();

        if let Some(entry) = self.symbols.lookup_procedure(&routine.name).cloned() {
            for (param, info) in routine.params.iter().zip(&entry.params) {
                self.declare_local(&param.name, info.ty.clone(), SymbolKind::Parameter, param.locus);
            }
            if let Some(return_type) = entry.return_type {
                self.declare_local(&routine.name, return_type, SymbolKind::Variable, routine.locus);
            }
        }

        self.check_block(&mut routine.body);
        self.symbols.exit_scope();
    }

    /// Type checks a list of statements at the current depth.
    pub fn check_block(&mut self, statements: &mut [Statement]) {
        for stmt in statements {
            self.check_statement(stmt);
        }
    }

    /// Type checks a nested block (loop or branch body).
    pub(crate) fn check_nested(&mut self, statements: &mut [Statement]) {
        self.depth += 1;
        self.check_block(statements);
        self.depth -= 1;
    }

    /// True at the top level of the main routine.
    pub(crate) fn at_module_level(&self) -> bool {
        self.routine_kind == RoutineKind::Main && self.depth == 0
    }

    pub(crate) fn in_main(&self) -> bool {
        self.routine_kind == RoutineKind::Main
    }

    fn declare_local(&mut self, name: &str, ty: Type, kind: SymbolKind, locus: Locus) {
        let symbol = Symbol {
            name: name.to_string(),
            kind,
            ty,
            locus,
            constant: None,
        };
        if let Err(existing) = self.symbols.define(symbol, false) {
            self.errors.push(SemanticError::DuplicateVariable {
                name: name.to_string(),
                original: existing.locus,
                duplicate: locus,
            });
        }
    }

    /// Whether an EXIT of this kind has something to leave.
    pub(crate) fn exit_allowed(&self, exit_type: ExitType) -> bool {
        match exit_type {
            ExitType::For => self.loops.contains(&LoopKind::For),
            ExitType::While => self.loops.contains(&LoopKind::While),
            ExitType::Do => self.loops.contains(&LoopKind::Do),
            ExitType::Sub => self.routine_kind == RoutineKind::Sub,
            ExitType::Function => self.routine_kind == RoutineKind::Function,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{DerefTarget, ExprKind, Program, StatementKind};
    use crate::builtins::Registry;
    use crate::lexer::lex;
    use crate::parser::Parser;
    use crate::semantic::{SemanticError, check};
    use crate::types::Type;

    fn analyze(source: &str) -> (Program, Vec<SemanticError>) {
        let tokens = lex(source).unwrap();
        let mut program = Parser::new(&tokens).parse().unwrap();
        let errors = check(&mut program, &Registry::standard());
        (program, errors)
    }

    fn errors(source: &str) -> Vec<SemanticError> {
        analyze(source).1
    }

    #[test]
    fn test_clean_program() {
        let errs = errors("DIM a AS INTEGER\na = 5\nPRINT a + 1\n");
        assert!(errs.is_empty(), "{:?}", errs);
    }

    #[test]
    fn test_types_are_stamped() {
        let (program, errs) = analyze("x% = 1\ny# = x% / 2\n");
        assert!(errs.is_empty(), "{:?}", errs);
        let StatementKind::Assign { value, .. } = &program.main().body[1].kind else {
            panic!("expected assignment");
        };
        assert_eq!(value.ty, Some(Type::Single));
    }

    #[test]
    fn test_string_to_number_mismatch() {
        let errs = errors("DIM n AS INTEGER\nn = \"hello\"\n");
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], SemanticError::TypeMismatch { .. }));
    }

    #[test]
    fn test_deref_resolution() {
        let (program, errs) = analyze(
            "DIM a(5) AS INTEGER\nx = a(1) + LEN(\"ab\") + Twice(3)\nFUNCTION Twice (n)\nTwice = n * 2\nEND FUNCTION\n",
        );
        assert!(errs.is_empty(), "{:?}", errs);
        let StatementKind::Assign { value, .. } = &program.main().body[1].kind else {
            panic!("expected assignment");
        };
        let ExprKind::Binary { left, right, .. } = &value.kind else {
            panic!("expected binary");
        };
        assert!(matches!(right.kind, ExprKind::Deref { target: DerefTarget::Function, .. }));
        let ExprKind::Binary { left, right, .. } = &left.kind else {
            panic!("expected binary");
        };
        assert!(matches!(left.kind, ExprKind::Deref { target: DerefTarget::Array, .. }));
        assert!(matches!(right.kind, ExprKind::Deref { target: DerefTarget::Builtin, .. }));
    }

    #[test]
    fn test_zero_arg_builtin_from_variable() {
        let (program, errs) = analyze("k$ = INKEY$\n");
        assert!(errs.is_empty(), "{:?}", errs);
        let StatementKind::Assign { value, .. } = &program.main().body[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value.kind, ExprKind::Deref { target: DerefTarget::Builtin, .. }));
    }

    #[test]
    fn test_undeclared_sub_reports_once() {
        let errs = errors("PRINT 1\nCALL Missing(1, x)\nPRINT 2\n");
        assert_eq!(errs.len(), 1);
        assert!(matches!(&errs[0], SemanticError::UndefinedProcedure { name, .. } if name == "MISSING"));
        assert_eq!(errs[0].locus().line, 2);
    }

    #[test]
    fn test_argument_count() {
        let errs = errors("SUB Show (a, b)\nEND SUB\nShow 1\n");
        assert!(matches!(errs[0], SemanticError::ArgumentCountMismatch { .. }));

        let errs = errors("x$ = LEFT$(\"abc\")\n");
        assert!(matches!(errs[0], SemanticError::ArgumentCountMismatch { .. }));
    }

    #[test]
    fn test_argument_types() {
        let errs = errors("SUB Show (s AS STRING)\nEND SUB\nShow 1\n");
        assert!(matches!(errs[0], SemanticError::ArgumentTypeMismatch { position: 1, .. }));
    }

    #[test]
    fn test_function_as_statement() {
        let errs = errors("FUNCTION F\nF = 1\nEND FUNCTION\nF\n");
        assert!(matches!(errs[0], SemanticError::FunctionUsedAsSub { .. }));
    }

    #[test]
    fn test_sub_as_function() {
        let errs = errors("SUB S (n)\nEND SUB\nx = S(1)\n");
        assert!(matches!(errs[0], SemanticError::SubUsedAsFunction { .. }));
    }

    #[test]
    fn test_declare_mismatch() {
        let errs = errors("DECLARE SUB Show (a AS INTEGER)\nSUB Show (a AS STRING)\nEND SUB\n");
        assert!(matches!(errs[0], SemanticError::DeclarationMismatch { .. }));

        let errs = errors("DECLARE SUB Show (a AS ANY)\nSUB Show (a AS STRING)\nEND SUB\n");
        assert!(errs.is_empty(), "{:?}", errs);
    }

    #[test]
    fn test_declared_but_never_defined() {
        let errs = errors("DECLARE SUB Later ()\nCALL Later\n");
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], SemanticError::UndefinedProcedure { .. }));
    }

    #[test]
    fn test_locals_are_private() {
        let errs = errors("DIM x AS STRING\nSUB S\nx = 5\nEND SUB\n");
        assert!(errs.is_empty(), "{:?}", errs);
    }

    #[test]
    fn test_shared_is_visible_in_subs() {
        let errs = errors("DIM SHARED x AS STRING\nSUB S\nx = 5\nEND SUB\n");
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], SemanticError::TypeMismatch { .. }));
    }

    #[test]
    fn test_shared_outside_main() {
        let errs = errors("SUB S\nDIM SHARED y\nEND SUB\n");
        assert!(matches!(errs[0], SemanticError::SharedOutsideMain { .. }));
    }

    #[test]
    fn test_deftype_changes_defaults() {
        let (program, errs) = analyze("DEFSTR S\ns = \"text\"\nn = 1\n");
        assert!(errs.is_empty(), "{:?}", errs);
        let StatementKind::Assign { target, .. } = &program.main().body[1].kind else {
            panic!("expected assignment");
        };
        assert_eq!(target.ty, Some(Type::String));
    }

    #[test]
    fn test_const_rules() {
        assert!(errors("CONST A = 2\nCONST B = A * 3 + 1\n").is_empty());

        let errs = errors("CONST A = 2\nA = 3\n");
        assert!(matches!(errs[0], SemanticError::AssignmentToConst { .. }));

        let errs = errors("x = 1\nCONST B = x\n");
        assert!(matches!(errs[0], SemanticError::NonConstantExpression { .. }));
    }

    #[test]
    fn test_duplicate_dim() {
        let errs = errors("DIM a AS INTEGER\nDIM a AS LONG\n");
        assert!(matches!(errs[0], SemanticError::DuplicateVariable { .. }));
    }

    #[test]
    fn test_array_rank_checked() {
        let errs = errors("DIM grid(3, 3)\nx = grid(1)\n");
        assert!(matches!(
            errs[0],
            SemanticError::ArrayDimensionMismatch { expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn test_invalid_bounds() {
        let errs = errors("DIM a(5 TO 1)\n");
        assert!(matches!(errs[0], SemanticError::InvalidBounds { .. }));
    }

    #[test]
    fn test_implicit_array() {
        let errs = errors("b(3) = 1\nPRINT b(3)\n");
        assert!(errs.is_empty(), "{:?}", errs);
    }

    #[test]
    fn test_records() {
        let source = "TYPE Point\n  x AS INTEGER\n  y AS INTEGER\nEND TYPE\nDIM p AS Point\np.x = 3\nPRINT p.y\n";
        assert!(errors(source).is_empty());

        let errs = errors(&format!("{}PRINT p.z\n", source));
        assert!(matches!(errs[0], SemanticError::UnknownMember { .. }));

        let errs = errors("DIM q AS Missing\n");
        assert!(matches!(errs[0], SemanticError::UnknownType { .. }));
    }

    #[test]
    fn test_exit_context() {
        let errs = errors("EXIT FOR\n");
        assert!(matches!(errs[0], SemanticError::ExitOutsideLoop { .. }));

        assert!(errors("FOR i = 1 TO 3\nDO\nEXIT FOR\nLOOP\nNEXT\n").is_empty());

        let errs = errors("SUB S\nEXIT FUNCTION\nEND SUB\n");
        assert!(matches!(errs[0], SemanticError::ExitOutsideLoop { .. }));
    }

    #[test]
    fn test_for_next_mismatch() {
        let errs = errors("FOR i = 1 TO 3\nNEXT j\n");
        assert!(matches!(errs[0], SemanticError::ForNextMismatch { .. }));
    }

    #[test]
    fn test_labels() {
        assert!(errors("GOTO done\nPRINT 1\ndone:\n").is_empty());

        let errs = errors("GOTO nowhere\n");
        assert!(matches!(errs[0], SemanticError::UndefinedLabel { .. }));

        let errs = errors("start:\nstart:\n");
        assert!(matches!(errs[0], SemanticError::DuplicateLabel { .. }));

        let errs = errors("top:\nSUB S\nGOTO top\nEND SUB\n");
        assert!(matches!(errs[0], SemanticError::LabelOutOfScope { .. }));
    }

    #[test]
    fn test_condition_must_be_numeric() {
        let errs = errors("IF \"yes\" THEN PRINT 1\n");
        assert!(matches!(errs[0], SemanticError::ConditionNotNumeric { .. }));
    }

    #[test]
    fn test_recursive_function() {
        let source = "FUNCTION Fact& (n AS INTEGER)\nIF n <= 1 THEN Fact& = 1 ELSE Fact& = n * Fact&(n - 1)\nEND FUNCTION\nPRINT Fact&(5)\n";
        let errs = errors(source);
        assert!(errs.is_empty(), "{:?}", errs);
    }

    #[test]
    fn test_whole_array_arguments() {
        let source = "DIM a(1 TO 4) AS INTEGER\nPRINT UBOUND(a)\nSUB Fill (arr() AS INTEGER)\nEND SUB\nFill a()\n";
        let errs = errors(source);
        assert!(errs.is_empty(), "{:?}", errs);

        let errs = errors("x = 1\nPRINT UBOUND(x)\n");
        assert!(matches!(errs[0], SemanticError::ArgumentTypeMismatch { .. }));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let errs = errors("DIM n AS INTEGER\nn = \"a\"\nGOTO nowhere\nEXIT DO\n");
        assert_eq!(errs.len(), 3);
    }
}
