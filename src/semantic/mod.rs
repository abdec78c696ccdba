//! Semantic analysis for qbvm.
//!
//! This module performs the semantic analysis phase of compilation, which occurs
//! after parsing and before code generation. It handles:
//!
//! - **Symbol resolution**: linking identifier uses to their declarations
//! - **Type checking**: ensuring operations have compatible types
//! - **Type inference**: stamping a type on every expression in place
//! - **Validation**: enforcing language rules beyond syntax
//!
//! # Architecture
//!
//! The semantic analyzer uses a **two-pass** approach:
//!
//! 1. **Pass 1 (Declaration Collection)**: applies DEFtype statements, registers
//!    TYPE records, SUB/FUNCTION definitions, DECLAREs and labels. This enables
//!    forward references - you can call a SUB before its definition appears.
//!
//! 2. **Pass 2 (Type Checking)**: walks the main routine and then every
//!    SUB/FUNCTION, resolving types and validating operations.
//!
//! # Usage
//!
//! ```
//! use qbvm::builtins::Registry;
//! use qbvm::lexer::lex;
//! use qbvm::parser::Parser;
//! use qbvm::semantic::check;
//!
//! let tokens = lex("x% = 1 + 2\nPRINT x%\n").unwrap();
//! let mut program = Parser::new(&tokens).parse().unwrap();
//! let diagnostics = check(&mut program, &Registry::standard());
//! assert!(diagnostics.is_empty());
//! ```

pub mod checker;
pub mod error;
pub mod symbols;

pub use checker::TypeChecker;
pub use error::SemanticError;
pub use symbols::{LabelEntry, ParameterInfo, ProcedureEntry, Symbol, SymbolKind, SymbolTable};

pub(crate) use checker::const_type;

use crate::ast::{Locus, Parameter, Program, Routine, RoutineKind, Statement, StatementKind, TypeSpec};
use crate::builtins::Registry;
use crate::types::{Type, UserType};
use checker::resolve_type_spec;
use std::rc::Rc;

/// Type checks `program` in place and returns every diagnostic found,
/// ordered by source position.
pub fn check(program: &mut Program, registry: &Registry) -> Vec<SemanticError> {
    SemanticAnalyzer::new(registry).analyze(program)
}

/// Main entry point for semantic analysis.
pub struct SemanticAnalyzer<'r> {
    symbols: SymbolTable,
    registry: &'r Registry,
    errors: Vec<SemanticError>,
}

impl<'r> SemanticAnalyzer<'r> {
    /// Creates a new semantic analyzer that resolves builtins in `registry`.
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            symbols: SymbolTable::new(),
            registry,
            errors: Vec::new(),
        }
    }

    /// Analyzes a program, annotating it with types.
    pub fn analyze(&mut self, program: &mut Program) -> Vec<SemanticError> {
        // Pass 1: Collect all declarations (enables forward references)
        self.collect_declarations(program);

        // Pass 2: Type check every routine, main first so SHARED names exist
        let mut checker = TypeChecker::new(&mut self.symbols, self.registry);
        for routine in &mut program.routines {
            checker.check_routine(routine);
        }
        self.errors.append(&mut checker.errors);

        self.errors.sort_by_key(|e| e.locus());
        log::debug!("semantic analysis: {} diagnostic(s)", self.errors.len());
        std::mem::take(&mut self.errors)
    }

    /// The symbol table as left by the last [`analyze`](Self::analyze).
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Pass 1: Collects all declarations without analyzing bodies.
    fn collect_declarations(&mut self, program: &Program) {
        let main = &program.main().body;

        // DEFtype applies module-wide; TYPEs may reference earlier TYPEs.
        for stmt in main {
            match &stmt.kind {
                StatementKind::DefType { type_spec, ranges } => {
                    if let Some(ty) = resolve_type_spec(&self.symbols, type_spec) {
                        for (from, to) in ranges {
                            self.symbols.set_default_type(*from, *to, ty.clone());
                        }
                    }
                }
                StatementKind::TypeDefinition { name, members } => {
                    let members = members
                        .iter()
                        .map(|member| {
                            let ty = self.resolve_or_report(&member.type_spec, member.locus);
                            (member.name.clone(), ty)
                        })
                        .collect();
                    let user = Rc::new(UserType::new(name.clone(), members));
                    if let Err(original) = self.symbols.define_type(user, stmt.locus) {
                        self.errors.push(SemanticError::DuplicateType {
                            name: name.clone(),
                            original,
                            duplicate: stmt.locus,
                        });
                    }
                }
                _ => {}
            }
        }

        for routine in program.routines.iter().skip(1) {
            self.register_routine(routine);
        }

        for stmt in main {
            if let StatementKind::Declare {
                kind,
                name,
                params,
                return_type,
            } = &stmt.kind
            {
                let entry = self.procedure_entry(*kind, name, params, return_type.as_ref(), stmt.locus, false);
                self.register_declaration(entry);
            }
        }

        for routine in &program.routines {
            self.collect_labels(&routine.body, &routine.name);
        }
    }

    fn resolve_or_report(&mut self, spec: &TypeSpec, locus: Locus) -> Type {
        match resolve_type_spec(&self.symbols, spec) {
            Some(ty) => ty,
            None => {
                if let TypeSpec::UserDefined(name) = spec {
                    self.errors.push(SemanticError::UnknownType {
                        name: name.clone(),
                        locus,
                    });
                }
                Type::Any
            }
        }
    }

    /// Builds the signature of a SUB/FUNCTION from its header.
    fn procedure_entry(
        &mut self,
        kind: RoutineKind,
        name: &str,
        params: &[Parameter],
        return_type: Option<&TypeSpec>,
        locus: Locus,
        defined: bool,
    ) -> ProcedureEntry {
        let params = params
            .iter()
            .map(|param| {
                let element = match &param.type_spec {
                    Some(spec) => self.resolve_or_report(spec, param.locus),
                    None => self.symbols.implicit_type(&param.name),
                };
                let ty = if param.is_array {
                    Type::Array {
                        element: Box::new(element),
                        dims: 0,
                    }
                } else {
                    element
                };
                ParameterInfo {
                    name: param.name.clone(),
                    ty,
                }
            })
            .collect();

        let return_type = (kind == RoutineKind::Function).then(|| match return_type {
            Some(spec) => self.resolve_or_report(spec, locus),
            None => self.symbols.implicit_type(name),
        });

        ProcedureEntry {
            name: name.to_string(),
            kind,
            params,
            return_type,
            locus,
            defined,
        }
    }

    fn register_routine(&mut self, routine: &Routine) {
        let entry = self.procedure_entry(
            routine.kind,
            &routine.name,
            &routine.params,
            routine.return_type.as_ref(),
            routine.locus,
            true,
        );
        if let Err(existing) = self.symbols.define_procedure(entry) {
            self.errors.push(SemanticError::DuplicateProcedure {
                name: routine.name.clone(),
                original: existing.locus,
                duplicate: routine.locus,
            });
        }
    }

    /// Registers a DECLARE, or matches it against the definition.
    fn register_declaration(&mut self, declared: ProcedureEntry) {
        let Some(defined) = self.symbols.lookup_procedure(&declared.name) else {
            let _ = self.symbols.define_procedure(declared);
            return;
        };

        if let Some(message) = declaration_mismatch(&declared, defined) {
            self.errors.push(SemanticError::DeclarationMismatch {
                name: declared.name.clone(),
                message,
                locus: declared.locus,
            });
        }
    }

    fn collect_labels(&mut self, statements: &[Statement], routine: &str) {
        for stmt in statements {
            match &stmt.kind {
                StatementKind::Label { name } => {
                    let entry = LabelEntry {
                        name: name.clone(),
                        locus: stmt.locus,
                        routine: routine.to_string(),
                    };
                    if let Err(existing) = self.symbols.define_label(entry) {
                        self.errors.push(SemanticError::DuplicateLabel {
                            name: name.clone(),
                            original: existing.locus,
                            duplicate: stmt.locus,
                        });
                    }
                }
                StatementKind::If {
                    then_branch,
                    elseif_branches,
                    else_branch,
                    ..
                } => {
                    self.collect_labels(then_branch, routine);
                    for (_, body) in elseif_branches {
                        self.collect_labels(body, routine);
                    }
                    if let Some(body) = else_branch {
                        self.collect_labels(body, routine);
                    }
                }
                StatementKind::SelectCase {
                    cases, case_else, ..
                } => {
                    for case in cases {
                        self.collect_labels(&case.body, routine);
                    }
                    if let Some(body) = case_else {
                        self.collect_labels(body, routine);
                    }
                }
                StatementKind::For { body, .. }
                | StatementKind::While { body, .. }
                | StatementKind::DoLoop { body, .. } => self.collect_labels(body, routine),
                _ => {}
            }
        }
    }
}

/// Describes how a DECLARE disagrees with a definition, if it does.
///
/// ANY in either signature matches any parameter type.
fn declaration_mismatch(declared: &ProcedureEntry, defined: &ProcedureEntry) -> Option<String> {
    if declared.kind != defined.kind {
        return Some(format!("declared as {}, defined as {}", declared.kind, defined.kind));
    }
    if declared.params.len() != defined.params.len() {
        return Some(format!(
            "declared with {} parameter(s), defined with {}",
            declared.params.len(),
            defined.params.len()
        ));
    }
    for (position, (a, b)) in declared.params.iter().zip(&defined.params).enumerate() {
        if !signature_types_match(&a.ty, &b.ty) {
            return Some(format!(
                "parameter {} declared {}, defined {}",
                position + 1,
                a.ty,
                b.ty
            ));
        }
    }
    match (&declared.return_type, &defined.return_type) {
        (Some(a), Some(b)) if !signature_types_match(a, b) => {
            Some(format!("returns {}, defined to return {}", a, b))
        }
        _ => None,
    }
}

fn signature_types_match(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Any, _) | (_, Type::Any) => true,
        (Type::Array { element: x, .. }, Type::Array { element: y, .. }) => {
            signature_types_match(x, y)
        }
        (Type::Array { .. }, _) | (_, Type::Array { .. }) => false,
        _ => a.name() == b.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::Parser;

    fn analyze(source: &str) -> Vec<SemanticError> {
        let tokens = lex(source).unwrap();
        let mut program = Parser::new(&tokens).parse().unwrap();
        check(&mut program, &Registry::standard())
    }

    #[test]
    fn test_forward_reference_to_sub() {
        let errs = analyze("Greet \"World\"\nSUB Greet (who$)\nPRINT \"Hello, \"; who$\nEND SUB\n");
        assert!(errs.is_empty(), "{:?}", errs);
    }

    #[test]
    fn test_duplicate_procedure() {
        let errs = analyze("SUB A\nEND SUB\nSUB A\nEND SUB\n");
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], SemanticError::DuplicateProcedure { .. }));
        assert_eq!(errs[0].locus().line, 3);
    }

    #[test]
    fn test_duplicate_type() {
        let errs = analyze("TYPE T\nx AS INTEGER\nEND TYPE\nTYPE T\ny AS LONG\nEND TYPE\n");
        assert!(matches!(errs[0], SemanticError::DuplicateType { .. }));
    }

    #[test]
    fn test_nested_record_types() {
        let source = "TYPE Inner\nv AS DOUBLE\nEND TYPE\nTYPE Outer\nin AS Inner\nEND TYPE\nDIM o AS Outer\no.in.v = 1.5\n";
        let errs = analyze(source);
        assert!(errs.is_empty(), "{:?}", errs);
    }

    #[test]
    fn test_diagnostics_sorted_by_position() {
        let errs = analyze("SUB S\nGOTO nowhere\nEND SUB\nDIM n AS INTEGER\nn = \"x\"\n");
        assert_eq!(errs.len(), 2);
        assert!(errs[0].locus() < errs[1].locus());
    }

    #[test]
    fn test_deftype_applies_to_parameters() {
        let errs = analyze("DEFSTR A-Z\nSUB Show (msg)\nPRINT msg\nEND SUB\nShow 42\n");
        assert!(matches!(errs[0], SemanticError::ArgumentTypeMismatch { .. }));
    }

    #[test]
    fn test_module_level_only() {
        let errs = analyze("SUB S\nDEFINT A-Z\nEND SUB\n");
        assert!(matches!(errs[0], SemanticError::ModuleLevelOnly { .. }));
    }

    #[test]
    fn test_restore_label_in_any_routine() {
        let errs = analyze("values:\nDATA 1, 2\nSUB S\nRESTORE values\nEND SUB\n");
        assert!(errs.is_empty(), "{:?}", errs);
    }
}
