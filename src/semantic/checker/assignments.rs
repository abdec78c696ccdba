//! Assignment and lvalue checking.
//!
//! Handles `target = value` plus the statements that store into targets:
//! INPUT, LINE INPUT, READ and SWAP all go through [`TypeChecker::check_target`].

use crate::ast::{Expr, ExprKind};
use crate::semantic::error::SemanticError;
use crate::semantic::symbols::SymbolKind;
use crate::types::Type;

use super::TypeChecker;

impl<'a> TypeChecker<'a> {
    /// Checks `target = value`.
    pub(crate) fn check_assign(&mut self, target: &mut Expr, value: &mut Expr) {
        let target_ty = self.check_target(target);
        let value_ty = self.check_expr(value);

        if !target_ty.is_compatible(&value_ty) {
            self.errors.push(SemanticError::type_mismatch(
                target_ty.name(),
                value_ty.name(),
                value.locus,
            ));
        }
    }

    /// Checks that `target` names assignable storage and returns its type.
    ///
    /// CONSTs, function calls and whole arrays are rejected.
    pub(crate) fn check_target(&mut self, target: &mut Expr) -> Type {
        if let ExprKind::Variable(name) = &target.kind
            && let Some(symbol) = self.symbols.lookup(name)
            && symbol.kind == SymbolKind::Constant
        {
            self.errors.push(SemanticError::AssignmentToConst {
                name: name.clone(),
                locus: target.locus,
            });
            return Type::Any;
        }

        let ty = self.check_expr(target);
        if !target.is_lvalue() || ty.is_array() {
            self.errors
                .push(SemanticError::NotAssignable { locus: target.locus });
            return Type::Any;
        }
        ty
    }

    /// Checks a target that receives text or numbers (INPUT, READ).
    pub(crate) fn check_scalar_target(&mut self, target: &mut Expr) {
        let ty = self.check_target(target);
        if !(ty.is_numeric() || ty == Type::String || ty == Type::Any) {
            self.errors.push(SemanticError::type_mismatch(
                "numeric or STRING",
                ty.name(),
                target.locus,
            ));
        }
    }

    /// Checks a target that must be a STRING (LINE INPUT).
    pub(crate) fn check_string_target(&mut self, target: &mut Expr) {
        let ty = self.check_target(target);
        if !Type::String.is_compatible(&ty) {
            self.errors
                .push(SemanticError::type_mismatch("STRING", ty.name(), target.locus));
        }
    }
}
