//! Expression AST nodes.
//!
//! Expressions are constructs that evaluate to a value. In BASIC, expressions
//! include literals, variables, arithmetic operations, comparisons, array
//! elements, record members and function calls.
//!
//! # Expression Precedence
//!
//! From highest to lowest (as implemented in the parser):
//!
//! 1. Primary: literals, identifiers, parenthesized expressions
//! 2. Exponentiation: `^`
//! 3. Unary: `-x`
//! 4. Multiplicative: `*`, `/`
//! 5. Integer division: `\`
//! 6. Modulo: `MOD`
//! 7. Additive: `+`, `-`
//! 8. Comparison: `=`, `<>`, `<`, `>`, `<=`, `>=`
//! 9. Logical NOT: `NOT`
//! 10. `AND`, `OR`, `XOR`, `EQV`, `IMP`
//!
//! # Ambiguous references
//!
//! `name(args)` could be an array element, a user FUNCTION call or a
//! builtin call. The parser cannot tell which, so it emits
//! [`ExprKind::Deref`] with [`DerefTarget::Unresolved`] and the type
//! checker fills in the target once every name is known.

use super::Locus;
use crate::types::Type;

/// An expression with its source location and (after checking) its type.
#[derive(Debug, Clone)]
pub struct Expr {
    /// The kind of expression.
    pub kind: ExprKind,
    /// Source location of this expression.
    pub locus: Locus,
    /// Resolved type, filled in by the type checker.
    pub ty: Option<Type>,
}

impl Expr {
    /// Creates a new, not yet typed expression.
    pub fn new(kind: ExprKind, locus: Locus) -> Self {
        Self {
            kind,
            locus,
            ty: None,
        }
    }

    /// The checked type, or ANY when checking has not run.
    pub fn ty(&self) -> Type {
        self.ty.clone().unwrap_or(Type::Any)
    }

    /// Returns true if the expression names storage that can be assigned.
    ///
    /// Function-call derefs only become non-lvalues once resolved.
    pub fn is_lvalue(&self) -> bool {
        match &self.kind {
            ExprKind::Variable(_) | ExprKind::Member { .. } => true,
            ExprKind::Deref { target, .. } => {
                matches!(target, DerefTarget::Unresolved | DerefTarget::Array)
            }
            _ => false,
        }
    }

    /// The variable name at the root of an lvalue (`A` in `A(1).X`).
    pub fn root_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Variable(name) | ExprKind::Deref { name, .. } => Some(name),
            ExprKind::Member { object, .. } => object.root_name(),
            _ => None,
        }
    }
}

/// A literal constant. The variant fixes the literal's type.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// INTEGER literal: `42`, `7%`, `&HFF`
    Integer(i64),
    /// LONG literal: `40000`, `7&`
    Long(i64),
    /// SINGLE literal: `3.14!`, `2!`
    Single(f64),
    /// DOUBLE literal: `3.14`, `1D-3`, `2#`
    Double(f64),
    /// String literal: `"Hello, World!"`
    String(String),
}

/// What an `name(args)` expression turned out to refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerefTarget {
    /// Not yet resolved by the type checker.
    Unresolved,
    /// Array element.
    Array,
    /// User-defined FUNCTION call.
    Function,
    /// Registry builtin function call.
    Builtin,
}

/// The different kinds of expressions in BASIC.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Literal constant
    Literal(Literal),

    /// Variable or constant reference: `x`, `name$`, `PI`
    Variable(String),

    /// Array element or function call: `name(arg1, arg2, ...)`
    Deref {
        name: String,
        args: Vec<Expr>,
        target: DerefTarget,
    },

    /// Record member access: `person.age`
    Member { object: Box<Expr>, member: String },

    /// Binary operation: `left op right`
    ///
    /// Examples: `1 + 2`, `x * y`, `a > b`, `flag AND mask`
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// Unary operation: `op operand`
    ///
    /// Examples: `-x`, `NOT flag`
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Parenthesized expression: `(expr)`
    Grouped(Box<Expr>),
}

/// Binary operators, grouped from tightest to loosest binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Power,
    Multiply,
    Divide,
    IntDivide,
    Modulo,
    Add,
    Subtract,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Logical and bitwise
    And,
    Or,
    Xor,
    Eqv,
    Imp,
}

impl BinaryOp {
    /// Returns true for the six relational operators.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterEqual
        )
    }

    /// Returns true for the bitwise logical operators.
    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::Eqv | BinaryOp::Imp
        )
    }

    /// Returns a string representation of the operator for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Power => "^",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::IntDivide => "\\",
            BinaryOp::Modulo => "MOD",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::LessThan => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
            BinaryOp::Eqv => "EQV",
            BinaryOp::Imp => "IMP",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    /// Returns a string representation of the operator for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "NOT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::new(ExprKind::Variable(name.to_string()), Locus::new(1, 1))
    }

    #[test]
    fn test_binary_op_classes() {
        assert!(BinaryOp::LessEqual.is_comparison());
        assert!(!BinaryOp::Add.is_comparison());
        assert!(BinaryOp::Xor.is_logical());
        assert!(!BinaryOp::Modulo.is_logical());
    }

    #[test]
    fn test_binary_op_as_str() {
        assert_eq!(BinaryOp::Add.as_str(), "+");
        assert_eq!(BinaryOp::Modulo.as_str(), "MOD");
        assert_eq!(BinaryOp::NotEqual.as_str(), "<>");
    }

    #[test]
    fn test_lvalues() {
        assert!(var("X").is_lvalue());

        let call = Expr::new(
            ExprKind::Deref {
                name: "F".to_string(),
                args: vec![],
                target: DerefTarget::Function,
            },
            Locus::new(1, 1),
        );
        assert!(!call.is_lvalue());

        let literal = Expr::new(ExprKind::Literal(Literal::Integer(1)), Locus::new(1, 1));
        assert!(!literal.is_lvalue());
    }

    #[test]
    fn test_root_name_through_member() {
        let member = Expr::new(
            ExprKind::Member {
                object: Box::new(var("P")),
                member: "AGE".to_string(),
            },
            Locus::new(1, 1),
        );
        assert_eq!(member.root_name(), Some("P"));
    }

    #[test]
    fn test_untyped_expr_reports_any() {
        assert_eq!(var("X").ty(), Type::Any);
    }
}
