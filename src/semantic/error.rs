//! Semantic analysis error types.
//!
//! These errors represent problems found during type checking and symbol resolution
//! that aren't syntax errors. Each error includes source location information
//! for accurate diagnostics.

use crate::ast::Locus;
use thiserror::Error;

/// A semantic analysis error with location and description.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SemanticError {
    // === Variable/Symbol Errors ===
    /// Reference to a label that doesn't exist.
    #[error("undefined label `{name}`")]
    UndefinedLabel { name: String, locus: Locus },

    /// GOTO/GOSUB to a label that lives in another routine.
    #[error("label `{name}` is not in this SUB or FUNCTION")]
    LabelOutOfScope { name: String, locus: Locus },

    /// Call to a procedure that hasn't been defined.
    #[error("undefined procedure `{name}`")]
    UndefinedProcedure { name: String, locus: Locus },

    /// Variable declared more than once in the same scope.
    #[error("variable `{name}` already defined at {original}")]
    DuplicateVariable {
        name: String,
        original: Locus,
        duplicate: Locus,
    },

    /// Label defined more than once.
    #[error("label `{name}` already defined at {original}")]
    DuplicateLabel {
        name: String,
        original: Locus,
        duplicate: Locus,
    },

    /// Procedure defined more than once.
    #[error("procedure `{name}` already defined at {original}")]
    DuplicateProcedure {
        name: String,
        original: Locus,
        duplicate: Locus,
    },

    /// TYPE defined more than once.
    #[error("type `{name}` already defined at {original}")]
    DuplicateType {
        name: String,
        original: Locus,
        duplicate: Locus,
    },

    /// A DECLARE that disagrees with the definition.
    #[error("declaration of `{name}` does not match its definition: {message}")]
    DeclarationMismatch {
        name: String,
        message: String,
        locus: Locus,
    },

    // === Type Errors ===
    /// Expected one type but found another.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        locus: Locus,
    },

    /// AS names a TYPE that was never defined.
    #[error("unknown type `{name}`")]
    UnknownType { name: String, locus: Locus },

    /// Record has no such member.
    #[error("type `{type_name}` has no member `{member}`")]
    UnknownMember {
        type_name: String,
        member: String,
        locus: Locus,
    },

    /// `.member` applied to something that isn't a record.
    #[error("`.{member}` used on non-record type {found}")]
    NotARecord {
        member: String,
        found: String,
        locus: Locus,
    },

    /// Binary operator applied to incompatible types.
    #[error("operator `{op}` cannot be applied to types {left_type} and {right_type}")]
    InvalidBinaryOp {
        op: String,
        left_type: String,
        right_type: String,
        locus: Locus,
    },

    /// Unary operator applied to incompatible type.
    #[error("operator `{op}` cannot be applied to type {operand_type}")]
    InvalidUnaryOp {
        op: String,
        operand_type: String,
        locus: Locus,
    },

    /// IF/WHILE/DO condition is not numeric.
    #[error("condition must be numeric, found {found}")]
    ConditionNotNumeric { found: String, locus: Locus },

    // === Procedure/Function Errors ===
    /// Procedure called with wrong number of arguments.
    #[error("`{name}` called with {found} argument(s), expected {expected}")]
    ArgumentCountMismatch {
        name: String,
        expected: String,
        found: usize,
        locus: Locus,
    },

    /// Argument type doesn't match parameter type.
    #[error("argument {position} of `{name}`: expected {expected}, found {found}")]
    ArgumentTypeMismatch {
        name: String,
        position: usize,
        expected: String,
        found: String,
        locus: Locus,
    },

    /// SUB used where a value is expected (SUBs don't return values).
    #[error("SUB `{name}` does not return a value")]
    SubUsedAsFunction { name: String, locus: Locus },

    /// FUNCTION invoked as a statement.
    #[error("FUNCTION `{name}` cannot be called as a statement")]
    FunctionUsedAsSub { name: String, locus: Locus },

    // === Control Flow Errors ===
    /// EXIT statement outside its corresponding loop/procedure.
    #[error("EXIT {exit_type} outside of {exit_type}")]
    ExitOutsideLoop { exit_type: String, locus: Locus },

    /// NEXT variable doesn't match FOR variable.
    #[error("NEXT variable `{found}` does not match FOR variable `{expected}`")]
    ForNextMismatch {
        expected: String,
        found: String,
        locus: Locus,
    },

    // === Array Errors ===
    /// Trying to index something that isn't an array.
    #[error("`{name}` is not an array")]
    NotAnArray { name: String, locus: Locus },

    /// Array indexed with wrong number of dimensions.
    #[error("array `{name}` indexed with {found} dimension(s), expected {expected}")]
    ArrayDimensionMismatch {
        name: String,
        expected: usize,
        found: usize,
        locus: Locus,
    },

    /// Array index must be a numeric type.
    #[error("array index must be numeric, found {found}")]
    NonNumericIndex { found: String, locus: Locus },

    /// Constant bounds with lower > upper.
    #[error("array `{name}` has lower bound greater than upper bound")]
    InvalidBounds { name: String, locus: Locus },

    // === Assignment / Constant Errors ===
    /// Attempting to assign to a CONST.
    #[error("cannot assign to constant `{name}`")]
    AssignmentToConst { name: String, locus: Locus },

    /// Target is not a variable, array element or record member.
    #[error("expression cannot be assigned to")]
    NotAssignable { locus: Locus },

    /// CONST initializer isn't a compile-time constant.
    #[error("CONST value must be a compile-time constant")]
    NonConstantExpression { locus: Locus },

    // === Placement Errors ===
    /// DIM SHARED inside a SUB or FUNCTION.
    #[error("DIM SHARED is only allowed at module level")]
    SharedOutsideMain { locus: Locus },

    /// A SUB or FUNCTION redeclares a SHARED name.
    #[error("`{name}` is SHARED and cannot be redeclared here")]
    SharedRedeclared { name: String, locus: Locus },

    /// Statement only valid in the main module body.
    #[error("{what} is only allowed at module level")]
    ModuleLevelOnly { what: String, locus: Locus },
}

impl SemanticError {
    /// Returns the primary locus of this error.
    pub fn locus(&self) -> Locus {
        match self {
            SemanticError::UndefinedLabel { locus, .. }
            | SemanticError::LabelOutOfScope { locus, .. }
            | SemanticError::UndefinedProcedure { locus, .. }
            | SemanticError::DeclarationMismatch { locus, .. }
            | SemanticError::TypeMismatch { locus, .. }
            | SemanticError::UnknownType { locus, .. }
            | SemanticError::UnknownMember { locus, .. }
            | SemanticError::NotARecord { locus, .. }
            | SemanticError::InvalidBinaryOp { locus, .. }
            | SemanticError::InvalidUnaryOp { locus, .. }
            | SemanticError::ConditionNotNumeric { locus, .. }
            | SemanticError::ArgumentCountMismatch { locus, .. }
            | SemanticError::ArgumentTypeMismatch { locus, .. }
            | SemanticError::SubUsedAsFunction { locus, .. }
            | SemanticError::FunctionUsedAsSub { locus, .. }
            | SemanticError::ExitOutsideLoop { locus, .. }
            | SemanticError::ForNextMismatch { locus, .. }
            | SemanticError::NotAnArray { locus, .. }
            | SemanticError::ArrayDimensionMismatch { locus, .. }
            | SemanticError::NonNumericIndex { locus, .. }
            | SemanticError::InvalidBounds { locus, .. }
            | SemanticError::AssignmentToConst { locus, .. }
            | SemanticError::NotAssignable { locus }
            | SemanticError::NonConstantExpression { locus }
            | SemanticError::SharedOutsideMain { locus }
            | SemanticError::SharedRedeclared { locus, .. }
            | SemanticError::ModuleLevelOnly { locus, .. } => *locus,
            SemanticError::DuplicateVariable { duplicate, .. }
            | SemanticError::DuplicateLabel { duplicate, .. }
            | SemanticError::DuplicateProcedure { duplicate, .. }
            | SemanticError::DuplicateType { duplicate, .. } => *duplicate,
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>, locus: Locus) -> Self {
        SemanticError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            locus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message() {
        let err = SemanticError::type_mismatch("INTEGER", "STRING", Locus::new(1, 5));
        assert!(err.to_string().contains("INTEGER"));
        assert!(err.to_string().contains("STRING"));
        assert_eq!(err.locus(), Locus::new(1, 5));
    }

    #[test]
    fn test_duplicate_reports_second_locus() {
        let err = SemanticError::DuplicateVariable {
            name: "X".to_string(),
            original: Locus::new(1, 5),
            duplicate: Locus::new(3, 5),
        };
        assert_eq!(err.locus(), Locus::new(3, 5));
        assert!(err.to_string().contains("1:5"));
    }
}
