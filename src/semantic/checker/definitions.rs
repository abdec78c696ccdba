//! DIM, REDIM and CONST checking, plus type-spec resolution and
//! compile-time constant folding.

use crate::ast::{ArrayDimension, BinaryOp, Expr, ExprKind, Literal, Locus, TypeSpec, UnaryOp, VarDecl};
use crate::semantic::error::SemanticError;
use crate::semantic::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::types::Type;

use super::TypeChecker;

/// Resolves an `AS` clause. `None` means an unknown record type.
pub(crate) fn resolve_type_spec(symbols: &SymbolTable, spec: &TypeSpec) -> Option<Type> {
    Some(match spec {
        TypeSpec::Integer => Type::Integer,
        TypeSpec::Long => Type::Long,
        TypeSpec::Single => Type::Single,
        TypeSpec::Double => Type::Double,
        TypeSpec::String => Type::String,
        TypeSpec::Json => Type::Json,
        TypeSpec::Any => Type::Any,
        TypeSpec::UserDefined(name) => Type::User(symbols.lookup_type(name)?.clone()),
    })
}

/// The type a CONST takes: its sigil, else the type of its value.
pub(crate) fn const_type(name: &str, value: &Expr) -> Type {
    Type::from_sigil(name).unwrap_or_else(|| value.ty())
}

impl<'a> TypeChecker<'a> {
    /// Resolves an `AS` clause, reporting unknown record types.
    pub(crate) fn type_from_spec(&mut self, spec: &TypeSpec, locus: Locus) -> Type {
        match resolve_type_spec(self.symbols, spec) {
            Some(ty) => ty,
            None => {
                let name = match spec {
                    TypeSpec::UserDefined(name) => name.clone(),
                    _ => String::new(),
                };
                self.errors.push(SemanticError::UnknownType { name, locus });
                Type::Any
            }
        }
    }

    fn element_type(&mut self, decl: &VarDecl) -> Type {
        match &decl.type_spec {
            Some(spec) => self.type_from_spec(spec, decl.locus),
            None => self.symbols.implicit_type(&decl.name),
        }
    }

    // ==================== DIM ====================

    /// Checks `DIM [SHARED] decl, ...`.
    pub(crate) fn check_dim(&mut self, shared: bool, decls: &mut [VarDecl], locus: Locus) {
        if shared && !self.in_main() {
            self.errors.push(SemanticError::SharedOutsideMain { locus });
        }
        let shared = shared && self.in_main();

        for decl in decls {
            let element = self.element_type(decl);
            let ty = if decl.is_array {
                self.check_bounds(&decl.name, &mut decl.dims, decl.locus);
                Type::Array {
                    element: Box::new(element),
                    dims: decl.dims.len(),
                }
            } else {
                element
            };

            if let Some(existing) = self.symbols.lookup_shared(&decl.name) {
                let error = if self.in_main() {
                    SemanticError::DuplicateVariable {
                        name: decl.name.clone(),
                        original: existing.locus,
                        duplicate: decl.locus,
                    }
                } else {
                    SemanticError::SharedRedeclared {
                        name: decl.name.clone(),
                        locus: decl.locus,
                    }
                };
                self.errors.push(error);
                continue;
            }

            let symbol = Symbol {
                name: decl.name.clone(),
                kind: SymbolKind::Variable,
                ty,
                locus: decl.locus,
                constant: None,
            };
            if let Err(existing) = self.symbols.define(symbol, shared) {
                self.errors.push(SemanticError::DuplicateVariable {
                    name: decl.name.clone(),
                    original: existing.locus,
                    duplicate: decl.locus,
                });
            }
        }
    }

    /// Checks array bounds: numeric, and `lower <= upper` when both fold.
    fn check_bounds(&mut self, name: &str, dims: &mut [ArrayDimension], locus: Locus) {
        for dim in dims {
            let lower = match &mut dim.lower {
                Some(lower) => {
                    self.check_bound(lower);
                    self.fold(lower)
                }
                None => Some(0.0),
            };
            self.check_bound(&mut dim.upper);
            let upper = self.fold(&dim.upper);

            if let (Some(lower), Some(upper)) = (lower, upper)
                && lower > upper
            {
                self.errors.push(SemanticError::InvalidBounds {
                    name: name.to_string(),
                    locus,
                });
            }
        }
    }

    fn check_bound(&mut self, bound: &mut Expr) {
        let ty = self.check_expr(bound);
        if !ty.is_numeric() && ty != Type::Any {
            self.errors.push(SemanticError::NonNumericIndex {
                found: ty.name(),
                locus: bound.locus,
            });
        }
    }

    // ==================== REDIM ====================

    /// Checks `REDIM [PRESERVE] decl, ...`.
    ///
    /// REDIM of an unknown name declares a dynamic array; REDIM of an
    /// existing array must keep its rank and element type.
    pub(crate) fn check_redim(&mut self, decls: &mut [VarDecl]) {
        for decl in decls {
            for dim in decl.dims.iter_mut() {
                if let Some(lower) = &mut dim.lower {
                    self.check_bound(lower);
                }
                self.check_bound(&mut dim.upper);
            }

            let rank = decl.dims.len();
            let existing = self.symbols.lookup(&decl.name).cloned();
            match existing {
                Some(Symbol {
                    ty: Type::Array { element, dims },
                    ..
                }) => {
                    if dims != 0 && dims != rank {
                        self.errors.push(SemanticError::ArrayDimensionMismatch {
                            name: decl.name.clone(),
                            expected: dims,
                            found: rank,
                            locus: decl.locus,
                        });
                    }
                    if let Some(spec) = &decl.type_spec {
                        let declared = self.type_from_spec(spec, decl.locus);
                        if declared.name() != element.name() && declared != Type::Any {
                            self.errors.push(SemanticError::type_mismatch(
                                element.name(),
                                declared.name(),
                                decl.locus,
                            ));
                        }
                    }
                    if dims == 0 {
                        self.symbols.retype(
                            &decl.name,
                            Type::Array {
                                element,
                                dims: rank,
                            },
                        );
                    }
                }
                Some(_) => self.errors.push(SemanticError::NotAnArray {
                    name: decl.name.clone(),
                    locus: decl.locus,
                }),
                None => {
                    let element = self.element_type(decl);
                    let symbol = Symbol {
                        name: decl.name.clone(),
                        kind: SymbolKind::Variable,
                        ty: Type::Array {
                            element: Box::new(element),
                            dims: rank,
                        },
                        locus: decl.locus,
                        constant: None,
                    };
                    let _ = self.symbols.define(symbol, false);
                }
            }
        }
    }

    // ==================== CONST ====================

    /// Checks `CONST name = value`. Module-level constants are shared.
    pub(crate) fn check_const(&mut self, name: &str, value: &mut Expr, locus: Locus) {
        let value_ty = self.check_expr(value);
        if !self.is_constant(value) {
            self.errors
                .push(SemanticError::NonConstantExpression { locus: value.locus });
        }

        let ty = const_type(name, value);
        if !ty.is_compatible(&value_ty) {
            self.errors.push(SemanticError::type_mismatch(
                ty.name(),
                value_ty.name(),
                value.locus,
            ));
        }

        let symbol = Symbol {
            name: name.to_string(),
            kind: SymbolKind::Constant,
            ty,
            locus,
            constant: self.fold(value),
        };
        let shared = self.in_main();
        if let Err(existing) = self.symbols.define(symbol, shared) {
            self.errors.push(SemanticError::DuplicateVariable {
                name: name.to_string(),
                original: existing.locus,
                duplicate: locus,
            });
        }
    }

    /// Literals, other CONSTs, and operators over them.
    pub(crate) fn is_constant(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Literal(_) => true,
            ExprKind::Variable(name) => self
                .symbols
                .lookup(name)
                .is_some_and(|s| s.kind == SymbolKind::Constant),
            ExprKind::Grouped(inner) => self.is_constant(inner),
            ExprKind::Unary { operand, .. } => self.is_constant(operand),
            ExprKind::Binary { left, right, .. } => {
                self.is_constant(left) && self.is_constant(right)
            }
            ExprKind::Deref { .. } | ExprKind::Member { .. } => false,
        }
    }

    /// Folds a numeric constant expression.
    pub(crate) fn fold(&self, expr: &Expr) -> Option<f64> {
        match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                Literal::Integer(n) | Literal::Long(n) => Some(*n as f64),
                Literal::Single(n) | Literal::Double(n) => Some(*n),
                Literal::String(_) => None,
            },
            ExprKind::Variable(name) => self.symbols.lookup(name)?.constant,
            ExprKind::Grouped(inner) => self.fold(inner),
            ExprKind::Unary {
                op: UnaryOp::Negate,
                operand,
            } => self.fold(operand).map(|n| -n),
            ExprKind::Binary { left, op, right } => {
                let (l, r) = (self.fold(left)?, self.fold(right)?);
                match op {
                    BinaryOp::Add => Some(l + r),
                    BinaryOp::Subtract => Some(l - r),
                    BinaryOp::Multiply => Some(l * r),
                    BinaryOp::Divide if r != 0.0 => Some(l / r),
                    BinaryOp::IntDivide if r.round() != 0.0 => Some((l.round() / r.round()).trunc()),
                    BinaryOp::Modulo if r.round() != 0.0 => Some(l.round() % r.round()),
                    BinaryOp::Power => Some(l.powf(r)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
