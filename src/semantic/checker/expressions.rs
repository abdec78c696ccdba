//! Expression type checking.
//!
//! This module handles type checking for all expression types:
//! - Literals, whose variant fixes their type
//! - Variables, created implicitly on first use
//! - `name(args)` references: array element, FUNCTION call or builtin call
//! - Record member access
//! - Binary and unary operations

use crate::ast::{DerefTarget, Expr, ExprKind, Literal, Locus, RoutineKind, UnaryOp};
use crate::builtins::Builtin;
use crate::semantic::error::SemanticError;
use crate::semantic::symbols::{ParameterInfo, Symbol, SymbolKind};
use crate::types::{Type, binary_result};

use super::TypeChecker;

/// What a `name(args)` reference resolved to.
enum Resolution {
    Array(Type, usize),
    Function(Vec<ParameterInfo>, Type),
    Sub,
    Builtin(Builtin),
    NotAnArray,
    Implicit,
}

impl<'a> TypeChecker<'a> {
    // ========================================================================
    // Expression Type Checking
    // ========================================================================

    /// Type checks an expression, stamps its type and returns it.
    ///
    /// On error, records the error and types the expression as ANY.
    pub fn check_expr(&mut self, expr: &mut Expr) -> Type {
        let locus = expr.locus;
        let ty = match &mut expr.kind {
            ExprKind::Literal(literal) => match literal {
                Literal::Integer(_) => Type::Integer,
                Literal::Long(_) => Type::Long,
                Literal::Single(_) => Type::Single,
                Literal::Double(_) => Type::Double,
                Literal::String(_) => Type::String,
            },

            ExprKind::Variable(name) => {
                let name = name.clone();
                match self.variable_as_call(&name) {
                    Some(target) => {
                        expr.kind = ExprKind::Deref {
                            name,
                            args: Vec::new(),
                            target,
                        };
                        return self.check_expr(expr);
                    }
                    None => self.resolve_variable(&name, locus),
                }
            }

            ExprKind::Deref { name, args, target } => {
                let name = name.clone();
                let (resolved, ty) = self.check_deref(&name, args, locus);
                *target = resolved;
                ty
            }

            ExprKind::Member { object, member } => {
                let object_ty = self.check_expr(object);
                self.member_type(&object_ty, member, locus)
            }

            ExprKind::Binary { left, op, right } => {
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                match binary_result(*op, &left_ty, &right_ty) {
                    Some(ty) => ty,
                    None => {
                        self.errors.push(SemanticError::InvalidBinaryOp {
                            op: op.as_str().to_string(),
                            left_type: left_ty.name(),
                            right_type: right_ty.name(),
                            locus,
                        });
                        Type::Any
                    }
                }
            }

            ExprKind::Unary { op, operand } => {
                let operand_ty = self.check_expr(operand);
                self.unary_type(*op, operand_ty, locus)
            }

            ExprKind::Grouped(inner) => self.check_expr(inner),
        };

        expr.ty = Some(ty.clone());
        ty
    }

    fn unary_type(&mut self, op: UnaryOp, operand: Type, locus: Locus) -> Type {
        match (op, &operand) {
            (_, Type::Any) => Type::Any,
            (UnaryOp::Negate, ty) if ty.is_numeric() => operand,
            (UnaryOp::Not, Type::Integer) => Type::Integer,
            (UnaryOp::Not, ty) if ty.is_numeric() => Type::Long,
            _ => {
                self.errors.push(SemanticError::InvalidUnaryOp {
                    op: op.as_str().to_string(),
                    operand_type: operand.name(),
                    locus,
                });
                Type::Any
            }
        }
    }

    /// Type of `object.member`.
    pub(crate) fn member_type(&mut self, object: &Type, member: &str, locus: Locus) -> Type {
        match object {
            Type::User(user) => match user.member_type(member) {
                Some(ty) => ty.clone(),
                None => {
                    self.errors.push(SemanticError::UnknownMember {
                        type_name: user.name.clone(),
                        member: member.to_string(),
                        locus,
                    });
                    Type::Any
                }
            },
            Type::Any => Type::Any,
            other => {
                self.errors.push(SemanticError::NotARecord {
                    member: member.to_string(),
                    found: other.name(),
                    locus,
                });
                Type::Any
            }
        }
    }

    // ========================================================================
    // Variables
    // ========================================================================

    /// A bare name that is really a zero-argument call.
    ///
    /// Declared variables win; inside a FUNCTION its own name is the
    /// return-value variable.
    fn variable_as_call(&self, name: &str) -> Option<DerefTarget> {
        if self.symbols.lookup(name).is_some() {
            return None;
        }
        if let Some(entry) = self.symbols.lookup_procedure(name)
            && entry.kind == RoutineKind::Function
        {
            return Some(DerefTarget::Function);
        }
        match self.registry.function(name) {
            Some(builtin) if builtin.min_args == 0 => Some(DerefTarget::Builtin),
            _ => None,
        }
    }

    /// Type of a plain variable reference, declaring it on first use.
    pub(crate) fn resolve_variable(&mut self, name: &str, locus: Locus) -> Type {
        if let Some(symbol) = self.symbols.lookup(name) {
            return symbol.ty.clone();
        }
        let ty = self.symbols.implicit_type(name);
        self.define_implicit(name, ty.clone(), locus);
        ty
    }

    pub(crate) fn define_implicit(&mut self, name: &str, ty: Type, locus: Locus) {
        let symbol = Symbol {
            name: name.to_string(),
            kind: SymbolKind::Implicit,
            ty,
            locus,
            constant: None,
        };
        // Only reached when lookup failed, so the local scope has no clash.
        let _ = self.symbols.define(symbol, false);
    }

    // ========================================================================
    // name(args)
    // ========================================================================

    /// Resolves and checks `name(args)`, returning the target and result type.
    ///
    /// Order: declared array, user FUNCTION, user SUB (an error), builtin
    /// function, and finally an implicitly dimensioned array.
    pub(crate) fn check_deref(
        &mut self,
        name: &str,
        args: &mut [Expr],
        locus: Locus,
    ) -> (DerefTarget, Type) {
        match self.resolve_deref(name) {
            Resolution::Array(element, dims) => {
                if args.is_empty() {
                    // `a()` names the whole array
                    return (
                        DerefTarget::Array,
                        Type::Array {
                            element: Box::new(element),
                            dims,
                        },
                    );
                }
                if dims != 0 && dims != args.len() {
                    self.errors.push(SemanticError::ArrayDimensionMismatch {
                        name: name.to_string(),
                        expected: dims,
                        found: args.len(),
                        locus,
                    });
                }
                self.check_indices(args);
                (DerefTarget::Array, element)
            }
            Resolution::Function(params, return_type) => {
                self.check_call_args(name, &params, args, locus);
                (DerefTarget::Function, return_type)
            }
            Resolution::Sub => {
                self.check_args_only(args);
                self.errors.push(SemanticError::SubUsedAsFunction {
                    name: name.to_string(),
                    locus,
                });
                (DerefTarget::Function, Type::Any)
            }
            Resolution::Builtin(builtin) => {
                self.check_builtin_args(&builtin, args, locus);
                (
                    DerefTarget::Builtin,
                    builtin.return_type.clone().unwrap_or(Type::Null),
                )
            }
            Resolution::NotAnArray => {
                self.check_args_only(args);
                self.errors.push(SemanticError::NotAnArray {
                    name: name.to_string(),
                    locus,
                });
                (DerefTarget::Array, Type::Any)
            }
            Resolution::Implicit => {
                let element = self.symbols.implicit_type(name);
                if !args.is_empty() {
                    self.define_implicit(
                        name,
                        Type::Array {
                            element: Box::new(element.clone()),
                            dims: args.len(),
                        },
                        locus,
                    );
                }
                self.check_indices(args);
                (DerefTarget::Array, element)
            }
        }
    }

    fn resolve_deref(&self, name: &str) -> Resolution {
        let symbol = self.symbols.lookup(name);
        if let Some(Symbol {
            ty: Type::Array { element, dims },
            ..
        }) = symbol
        {
            return Resolution::Array((**element).clone(), *dims);
        }
        if let Some(entry) = self.symbols.lookup_procedure(name) {
            return match &entry.return_type {
                Some(ty) if entry.kind == RoutineKind::Function => {
                    Resolution::Function(entry.params.clone(), ty.clone())
                }
                _ => Resolution::Sub,
            };
        }
        if let Some(builtin) = self.registry.function(name) {
            return Resolution::Builtin(builtin.clone());
        }
        match symbol {
            Some(_) => Resolution::NotAnArray,
            None => Resolution::Implicit,
        }
    }

    fn check_indices(&mut self, args: &mut [Expr]) {
        for arg in args {
            let ty = self.check_expr(arg);
            if !ty.is_numeric() && ty != Type::Any {
                self.errors.push(SemanticError::NonNumericIndex {
                    found: ty.name(),
                    locus: arg.locus,
                });
            }
        }
    }

    /// Types arguments without validating them against anything.
    pub(crate) fn check_args_only(&mut self, args: &mut [Expr]) {
        for arg in args {
            self.check_expr(arg);
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Checks arguments of a user SUB/FUNCTION call.
    pub(crate) fn check_call_args(
        &mut self,
        name: &str,
        params: &[ParameterInfo],
        args: &mut [Expr],
        locus: Locus,
    ) {
        if params.len() != args.len() {
            self.errors.push(SemanticError::ArgumentCountMismatch {
                name: name.to_string(),
                expected: params.len().to_string(),
                found: args.len(),
                locus,
            });
            self.check_args_only(args);
            return;
        }
        for (position, (param, arg)) in params.iter().zip(args.iter_mut()).enumerate() {
            let ty = self.check_expr(arg);
            self.check_argument(name, position + 1, &param.ty, &ty, arg.locus);
        }
    }

    /// Checks arguments of a builtin call against the registry signature.
    pub(crate) fn check_builtin_args(&mut self, builtin: &Builtin, args: &mut [Expr], locus: Locus) {
        if args.len() < builtin.min_args || args.len() > builtin.max_args() {
            let expected = if builtin.counts_args() {
                format!("{} to {}", builtin.min_args, builtin.max_args())
            } else {
                builtin.min_args.to_string()
            };
            self.errors.push(SemanticError::ArgumentCountMismatch {
                name: builtin.name.clone(),
                expected,
                found: args.len(),
                locus,
            });
            self.check_args_only(args);
            return;
        }
        for (position, (expected, arg)) in builtin.arg_types.iter().zip(args.iter_mut()).enumerate() {
            let ty = self.check_expr(arg);
            self.check_argument(&builtin.name, position + 1, expected, &ty, arg.locus);
        }
    }

    fn check_argument(&mut self, name: &str, position: usize, expected: &Type, found: &Type, locus: Locus) {
        if !expected.is_compatible(found) {
            self.errors.push(SemanticError::ArgumentTypeMismatch {
                name: name.to_string(),
                position,
                expected: expected.name(),
                found: found.name(),
                locus,
            });
        }
    }
}
