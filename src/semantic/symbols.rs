//! Symbol table for qbvm semantic analysis.
//!
//! The symbol table tracks all named entities (variables, procedures, labels,
//! record types) and their properties during semantic analysis. It supports:
//!
//! - **Nested scopes**: a stack of local scopes, innermost last
//! - **SHARED variables**: `DIM SHARED` and module-level `CONST` live in one
//!   shared scope visible from every routine
//! - **DEFtype defaults**: type defaults by variable first letter
//!
//! # Scope Rules
//!
//! - The main routine and each SUB/FUNCTION get their own local scope
//! - Lookup order is local, then shared, then sigil, then default type
//! - Labels live in one program-wide namespace but remember their routine
//!
//! Names arrive from the parser already upper-cased, so lookups are plain
//! hash lookups.

use crate::ast::{Locus, RoutineKind};
use crate::types::{Type, UserType};
use std::collections::HashMap;
use std::rc::Rc;

/// A single symbol (variable, constant, or parameter).
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    /// Where the symbol was defined (or first used, if implicit).
    pub locus: Locus,
    /// Folded value of a numeric CONST.
    pub constant: Option<f64>,
}

/// The kind of symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Declared with DIM.
    Variable,
    /// Created by first use.
    Implicit,
    /// A CONST.
    Constant,
    /// A SUB/FUNCTION parameter.
    Parameter,
}

impl Symbol {
    /// Number of dimensions if this symbol is an array.
    pub fn dims(&self) -> Option<usize> {
        match &self.ty {
            Type::Array { dims, .. } => Some(*dims),
            _ => None,
        }
    }
}

/// A procedure (SUB or FUNCTION) entry.
#[derive(Debug, Clone)]
pub struct ProcedureEntry {
    pub name: String,
    pub kind: RoutineKind,
    pub params: Vec<ParameterInfo>,
    /// Return type (None for SUB).
    pub return_type: Option<Type>,
    pub locus: Locus,
    /// A body exists (as opposed to only a DECLARE).
    pub defined: bool,
}

/// Information about a procedure parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    /// Parameter type; arrays carry `Type::Array`.
    pub ty: Type,
}

/// A label for GOTO/GOSUB/RESTORE.
#[derive(Debug, Clone)]
pub struct LabelEntry {
    pub name: String,
    pub locus: Locus,
    /// Name of the routine containing the label.
    pub routine: String,
}

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, Symbol>,
}

/// The complete symbol table.
///
/// Manages all symbols, procedures, types and labels for a compilation unit.
pub struct SymbolTable {
    shared: Scope,
    locals: Vec<Scope>,
    procedures: HashMap<String, ProcedureEntry>,
    types: HashMap<String, (Rc<UserType>, Locus)>,
    labels: HashMap<String, LabelEntry>,
    /// Default type by first letter (A-Z). Index 0 = 'A', etc.
    default_types: [Type; 26],
}

impl SymbolTable {
    /// Creates an empty symbol table with no local scope.
    pub fn new() -> Self {
        Self {
            shared: Scope::default(),
            locals: Vec::new(),
            procedures: HashMap::new(),
            types: HashMap::new(),
            labels: HashMap::new(),
            default_types: std::array::from_fn(|_| Type::Single),
        }
    }

    // ==================== Scopes ====================

    /// Enters a new local scope (main body or a SUB/FUNCTION).
    pub fn enter_scope(&mut self) {
        self.locals.push(Scope::default());
    }

    /// Exits the current local scope.
    pub fn exit_scope(&mut self) {
        self.locals.pop();
    }

    /// Defines a symbol in the innermost local scope, or in the shared
    /// scope when `shared` is set.
    ///
    /// Returns the existing symbol if the name is already taken there.
    pub fn define(&mut self, symbol: Symbol, shared: bool) -> Result<(), Box<Symbol>> {
        let scope = match self.locals.last_mut() {
            Some(scope) if !shared => scope,
            _ => &mut self.shared,
        };
        if let Some(existing) = scope.symbols.get(&symbol.name) {
            return Err(Box::new(existing.clone()));
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Replaces a symbol's type wherever it is defined.
    pub fn retype(&mut self, name: &str, ty: Type) {
        if let Some(symbol) = self
            .locals
            .last_mut()
            .and_then(|scope| scope.symbols.get_mut(name))
            .or_else(|| self.shared.symbols.get_mut(name))
        {
            symbol.ty = ty;
        }
    }

    /// Looks up a symbol: innermost local scope first, then shared.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.locals
            .last()
            .and_then(|scope| scope.symbols.get(name))
            .or_else(|| self.shared.symbols.get(name))
    }

    /// Looks up a symbol in the shared scope only.
    pub fn lookup_shared(&self, name: &str) -> Option<&Symbol> {
        self.shared.symbols.get(name)
    }

    /// Names of every shared symbol.
    pub fn shared_names(&self) -> impl Iterator<Item = &String> {
        self.shared.symbols.keys()
    }

    // ==================== Procedures ====================

    /// Registers a procedure. Returns the existing entry on a clash.
    pub fn define_procedure(&mut self, entry: ProcedureEntry) -> Result<(), Box<ProcedureEntry>> {
        if let Some(existing) = self.procedures.get(&entry.name) {
            return Err(Box::new(existing.clone()));
        }
        self.procedures.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn lookup_procedure(&self, name: &str) -> Option<&ProcedureEntry> {
        self.procedures.get(name)
    }

    pub fn procedure_mut(&mut self, name: &str) -> Option<&mut ProcedureEntry> {
        self.procedures.get_mut(name)
    }

    // ==================== Types ====================

    /// Registers a record type. Returns the original locus on a clash.
    pub fn define_type(&mut self, ty: Rc<UserType>, locus: Locus) -> Result<(), Locus> {
        let key = ty.name.to_ascii_uppercase();
        if let Some((_, original)) = self.types.get(&key) {
            return Err(*original);
        }
        self.types.insert(key, (ty, locus));
        Ok(())
    }

    pub fn lookup_type(&self, name: &str) -> Option<&Rc<UserType>> {
        self.types.get(&name.to_ascii_uppercase()).map(|(ty, _)| ty)
    }

    /// All record types by upper-case name.
    pub fn types(&self) -> HashMap<String, Rc<UserType>> {
        self.types
            .iter()
            .map(|(name, (ty, _))| (name.clone(), Rc::clone(ty)))
            .collect()
    }

    // ==================== Labels ====================

    /// Defines a label. Returns the existing entry on a clash.
    pub fn define_label(&mut self, entry: LabelEntry) -> Result<(), Box<LabelEntry>> {
        if let Some(existing) = self.labels.get(&entry.name) {
            return Err(Box::new(existing.clone()));
        }
        self.labels.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn lookup_label(&self, name: &str) -> Option<&LabelEntry> {
        self.labels.get(name)
    }

    // ==================== Default Types ====================

    /// Gets the default type for a variable based on its first letter.
    ///
    /// By default, all variables are SINGLE. DEFtype statements change this.
    pub fn default_type_for(&self, name: &str) -> Type {
        match name.chars().next() {
            Some(first) if first.is_ascii_alphabetic() => {
                let index = first.to_ascii_uppercase() as usize - 'A' as usize;
                self.default_types[index].clone()
            }
            _ => Type::Single,
        }
    }

    /// Sets the default type for a range of first letters (DEFtype).
    pub fn set_default_type(&mut self, from: char, to: char, ty: Type) {
        let from_idx = (from.to_ascii_uppercase() as usize).saturating_sub('A' as usize);
        let to_idx = (to.to_ascii_uppercase() as usize).saturating_sub('A' as usize);

        for slot in self.default_types.iter_mut().take(to_idx.min(25) + 1).skip(from_idx) {
            *slot = ty.clone();
        }
    }

    /// The type an undeclared name gets: its sigil, else the letter default.
    pub fn implicit_type(&self, name: &str) -> Type {
        Type::from_sigil(name).unwrap_or_else(|| self.default_type_for(name))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(name: &str, ty: Type) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::Variable,
            ty,
            locus: Locus::new(1, 1),
            constant: None,
        }
    }

    #[test]
    fn test_define_and_lookup_symbol() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.define(variable("X", Type::Integer), false).unwrap();
        assert_eq!(table.lookup("X").unwrap().ty, Type::Integer);
    }

    #[test]
    fn test_duplicate_symbol_error() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.define(variable("X", Type::Integer), false).unwrap();
        assert!(table.define(variable("X", Type::Long), false).is_err());
    }

    #[test]
    fn test_locals_are_not_visible_from_other_routines() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.define(variable("G", Type::Integer), false).unwrap();
        table.exit_scope();

        table.enter_scope();
        assert!(table.lookup("G").is_none());
    }

    #[test]
    fn test_shared_variable_visible_everywhere() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.define(variable("TOTAL", Type::Long), true).unwrap();
        table.exit_scope();

        table.enter_scope();
        assert_eq!(table.lookup("TOTAL").unwrap().ty, Type::Long);
        assert!(table.lookup_shared("TOTAL").is_some());
    }

    #[test]
    fn test_local_shadows_shared() {
        let mut table = SymbolTable::new();
        table.define(variable("N", Type::Long), true).unwrap();
        table.enter_scope();
        table.define(variable("N", Type::String), false).unwrap();
        assert_eq!(table.lookup("N").unwrap().ty, Type::String);
    }

    #[test]
    fn test_default_types() {
        let mut table = SymbolTable::new();
        assert_eq!(table.default_type_for("X"), Type::Single);

        table.set_default_type('I', 'N', Type::Integer);
        assert_eq!(table.default_type_for("I"), Type::Integer);
        assert_eq!(table.default_type_for("INDEX"), Type::Integer);
        assert_eq!(table.default_type_for("N"), Type::Integer);
        assert_eq!(table.default_type_for("X"), Type::Single);

        // Sigils win over DEFtype
        assert_eq!(table.implicit_type("I$"), Type::String);
    }

    #[test]
    fn test_labels() {
        let mut table = SymbolTable::new();
        let entry = |routine: &str| LabelEntry {
            name: "START".to_string(),
            locus: Locus::new(1, 1),
            routine: routine.to_string(),
        };
        table.define_label(entry("_main")).unwrap();
        assert_eq!(table.lookup_label("START").unwrap().routine, "_main");
        assert!(table.define_label(entry("FOO")).is_err());
    }

    #[test]
    fn test_types_case_insensitive() {
        let mut table = SymbolTable::new();
        let point = Rc::new(UserType::new("POINT", vec![("X".to_string(), Type::Integer)]));
        table.define_type(point, Locus::new(1, 1)).unwrap();
        assert!(table.lookup_type("Point").is_some());
    }
}
