//! Expression lowering.
//!
//! Every expression leaves exactly one stack item: a value for reads, a
//! reference when the expression is an assignment target or a BY-REF
//! argument.

use super::error::CodeGenError;
use super::instruction::{Op, Target};
use super::stmt::Emitter;
use crate::ast::{DerefTarget, Expr, ExprKind, Literal, Locus, UnaryOp};
use crate::builtins::Builtin;
use crate::semantic::ParameterInfo;
use crate::types::{Type, Value};

impl Emitter<'_> {
    /// Pushes the value of `expr`.
    pub(super) fn emit_expr(&mut self, expr: &Expr) -> Result<(), CodeGenError> {
        match &expr.kind {
            ExprKind::Literal(literal) => {
                self.state.emit(Op::PushConst(literal_value(literal)));
                Ok(())
            }

            ExprKind::Variable(name) => {
                match expr.ty() {
                    Type::Array { element, dims } => self.state.emit(Op::PushArray {
                        name: name.clone(),
                        element: *element,
                        dims,
                    }),
                    _ => self.state.emit(Op::PushValue(name.clone())),
                }
                Ok(())
            }

            ExprKind::Deref { name, args, target } => match target {
                DerefTarget::Array => self.emit_element(name, args, &expr.ty(), false),
                DerefTarget::Function => self.emit_function_call(name, args, expr.locus),
                DerefTarget::Builtin => {
                    let registry = self.registry;
                    let builtin = registry
                        .function(name)
                        .ok_or_else(|| CodeGenError::unresolved(name).with_locus(expr.locus))?;
                    self.emit_builtin_call(builtin, args)
                }
                DerefTarget::Unresolved => Err(CodeGenError::unresolved(name)
                    .with_locus(expr.locus)
                    .with_context("reference was never type checked")),
            },

            ExprKind::Member { object, member } => {
                if object.is_lvalue() {
                    self.emit_ref(object)?;
                } else {
                    self.emit_expr(object)?;
                }
                self.state.emit(Op::MemberDeref {
                    member: member.clone(),
                    by_ref: false,
                });
                Ok(())
            }

            ExprKind::Binary { left, op, right } => {
                self.emit_expr(left)?;
                self.emit_expr(right)?;
                self.state.emit(Op::Binary(*op));
                Ok(())
            }

            ExprKind::Unary { op, operand } => {
                self.emit_expr(operand)?;
                self.state.emit(match op {
                    UnaryOp::Negate => Op::Neg,
                    UnaryOp::Not => Op::Not,
                });
                Ok(())
            }

            ExprKind::Grouped(inner) => self.emit_expr(inner),
        }
    }

    /// Pushes a reference to the storage `expr` names.
    pub(super) fn emit_ref(&mut self, expr: &Expr) -> Result<(), CodeGenError> {
        match &expr.kind {
            ExprKind::Variable(name) => {
                match expr.ty() {
                    Type::Array { element, dims } => self.state.emit(Op::PushArray {
                        name: name.clone(),
                        element: *element,
                        dims,
                    }),
                    _ => self.state.emit(Op::PushRef(name.clone())),
                }
                Ok(())
            }
            ExprKind::Deref {
                name,
                args,
                target: DerefTarget::Array,
            } => self.emit_element(name, args, &expr.ty(), true),
            ExprKind::Member { object, member } => {
                self.emit_ref(object)?;
                self.state.emit(Op::MemberDeref {
                    member: member.clone(),
                    by_ref: true,
                });
                Ok(())
            }
            ExprKind::Grouped(inner) => self.emit_ref(inner),
            _ => Err(CodeGenError::internal("assignment to a non-lvalue").with_locus(expr.locus)),
        }
    }

    /// `name(i, j)`, or the whole array for `name()`.
    ///
    /// `ty` is the checked type of the expression: the element type when
    /// indexed, the array type otherwise.
    fn emit_element(&mut self, name: &str, indices: &[Expr], ty: &Type, by_ref: bool) -> Result<(), CodeGenError> {
        if indices.is_empty() {
            let (element, dims) = match ty {
                Type::Array { element, dims } => ((**element).clone(), *dims),
                other => (other.clone(), 0),
            };
            self.state.emit(Op::PushArray {
                name: name.to_string(),
                element,
                dims,
            });
            return Ok(());
        }

        self.state.emit(Op::PushArray {
            name: name.to_string(),
            element: ty.clone(),
            dims: indices.len(),
        });
        for index in indices {
            self.emit_expr(index)?;
        }
        self.state.emit(Op::ArrayDeref {
            dims: indices.len(),
            by_ref,
        });
        Ok(())
    }

    fn emit_function_call(&mut self, name: &str, args: &[Expr], locus: Locus) -> Result<(), CodeGenError> {
        let symbols = self.symbols;
        let entry = symbols
            .lookup_procedure(name)
            .ok_or_else(|| CodeGenError::unresolved(name).with_locus(locus))?;
        self.emit_user_args(&entry.params, args)?;
        let label = self.state.routine_label(name);
        self.state.emit(Op::Call(Target::Label(label)));
        Ok(())
    }

    /// Arguments of a SUB/FUNCTION call.
    ///
    /// A variable, element or member whose type matches the parameter is
    /// passed by reference; anything else is passed as a value the callee
    /// coerces.
    pub(super) fn emit_user_args(&mut self, params: &[ParameterInfo], args: &[Expr]) -> Result<(), CodeGenError> {
        for (position, arg) in args.iter().enumerate() {
            let by_ref = arg.is_lvalue()
                && params
                    .get(position)
                    .is_some_and(|param| param.ty == Type::Any || param.ty.name() == arg.ty().name());
            if by_ref {
                self.emit_ref(arg)?;
            } else {
                self.emit_expr(arg)?;
            }
        }
        Ok(())
    }

    /// Arguments, the count when the builtin takes optional ones, then the
    /// syscall.
    pub(super) fn emit_builtin_call(&mut self, builtin: &Builtin, args: &[Expr]) -> Result<(), CodeGenError> {
        for arg in args {
            if builtin.by_ref && arg.is_lvalue() {
                self.emit_ref(arg)?;
            } else {
                self.emit_expr(arg)?;
            }
        }
        if builtin.counts_args() {
            self.push_count(args.len());
        }
        self.syscall(&builtin.name);
        Ok(())
    }
}

/// The constant a literal denotes. Integer literals too wide for their
/// type widen to LONG, then DOUBLE.
fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Integer(n) => match i16::try_from(*n) {
            Ok(n) => Value::Integer(n),
            Err(_) => long_value(*n),
        },
        Literal::Long(n) => long_value(*n),
        Literal::Single(n) => Value::Single(*n as f32),
        Literal::Double(n) => Value::Double(*n),
        Literal::String(s) => Value::String(s.clone()),
    }
}

fn long_value(n: i64) -> Value {
    match i32::try_from(n) {
        Ok(n) => Value::Long(n),
        Err(_) => Value::Double(n as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::testing::run;

    #[test]
    fn test_literal_widening() {
        assert_eq!(literal_value(&Literal::Integer(12)), Value::Integer(12));
        assert_eq!(literal_value(&Literal::Integer(70000)), Value::Long(70000));
        assert_eq!(literal_value(&Literal::Long(5_000_000_000)), Value::Double(5e9));
        assert_eq!(literal_value(&Literal::Single(0.5)), Value::Single(0.5));
    }

    #[test]
    fn test_arguments_by_reference() {
        let source = "\
x = 1
CALL Bump(x)
CALL Bump(x + 0)
PRINT x
SUB Bump(n)
  n = n + 10
END SUB";
        assert_eq!(run(source), "11\n");
    }

    #[test]
    fn test_mismatched_type_passes_a_copy() {
        let source = "i% = 1\nCALL Bump(i%)\nPRINT i%\nSUB Bump(n AS DOUBLE)\nn = n + 1\nEND SUB";
        assert_eq!(run(source), "1\n");
    }

    #[test]
    fn test_array_argument_and_element_reference() {
        let source = "\
DIM a(3) AS INTEGER
CALL Fill(a())
CALL Bump(a(2))
PRINT a(1); a(2); a(3)
SUB Fill(v() AS INTEGER)
  FOR i = LBOUND(v) TO UBOUND(v)
    v(i) = i
  NEXT
END SUB
SUB Bump(n AS INTEGER)
  n = n * 100
END SUB";
        assert_eq!(run(source), "12003\n");
    }

    #[test]
    fn test_record_members() {
        let source = "\
TYPE Point
  x AS INTEGER
  y AS INTEGER
END TYPE
DIM p AS Point
DIM ps(2) AS Point
p.x = 3
ps(1).y = p.x * 2
PRINT p.x; ps(1).y; ps(2).y";
        assert_eq!(run(source), "360\n");
    }

    #[test]
    fn test_recursive_function() {
        let source = "PRINT Fact&(6)\nFUNCTION Fact&(n AS INTEGER)\nIF n <= 1 THEN Fact& = 1 ELSE Fact& = n * Fact&(n - 1)\nEND FUNCTION";
        assert_eq!(run(source), "720\n");
    }

    #[test]
    fn test_zero_argument_builtin_and_function() {
        assert_eq!(run("PRINT Seven + ERR\nFUNCTION Seven\nSeven = 7\nEND FUNCTION"), "7\n");
    }
}
