//! Statement AST nodes.
//!
//! Statements are constructs that perform actions but don't produce values.
//! In BASIC, most lines of code are statements: PRINT, IF, FOR, assignments, etc.
//!
//! # Statement Categories
//!
//! - **I/O**: PRINT, INPUT, LINE INPUT, WRITE, OPEN/CLOSE
//! - **Assignment**: LET (optional), target = expression
//! - **Control flow**: IF/THEN/ELSE, SELECT CASE, GOTO, GOSUB
//! - **Loops**: FOR/NEXT, WHILE/WEND, DO/LOOP
//! - **Declarations**: DIM, REDIM, CONST, TYPE, DECLARE, DEFtype
//! - **Procedures**: CALL and bare SUB invocations
//!
//! SUB and FUNCTION bodies are not statements; they become separate
//! [`Routine`](super::Routine)s of the program.

use super::{Expr, Locus, RoutineKind};

/// A statement with its source location.
#[derive(Debug, Clone)]
pub struct Statement {
    /// The kind of statement.
    pub kind: StatementKind,
    /// Source location of this statement.
    pub locus: Locus,
}

impl Statement {
    /// Creates a new statement with the given kind and locus.
    pub fn new(kind: StatementKind, locus: Locus) -> Self {
        Self { kind, locus }
    }
}

/// The different kinds of statements in BASIC.
#[derive(Debug, Clone)]
pub enum StatementKind {
    /// `PRINT [#n,] [USING fmt;] expr1; expr2, expr3`
    ///
    /// The `newline` field indicates whether to print a newline at the end.
    /// A trailing semicolon or comma suppresses the newline.
    Print {
        /// File number for `PRINT #n`.
        file: Option<Expr>,
        /// Format string for `PRINT USING`.
        using: Option<Expr>,
        items: Vec<PrintItem>,
        /// Whether to print a newline at the end.
        newline: bool,
    },

    /// `[LET] target = expression`
    ///
    /// The target is a variable, array element or record member.
    Assign { target: Expr, value: Expr },

    /// `DIM [SHARED] a AS type, b(1 TO 3) AS type, ...`
    Dim { shared: bool, decls: Vec<VarDecl> },

    /// `REDIM [PRESERVE] a(1 TO n) [AS type]`
    Redim { preserve: bool, decls: Vec<VarDecl> },

    /// `CONST name = value`
    Const { name: String, value: Expr },

    /// Single-line: `IF condition THEN statement [ELSE statement]`
    /// Multi-line: `IF condition THEN ... [ELSEIF ...] [ELSE ...] END IF`
    If {
        condition: Expr,
        then_branch: Vec<Statement>,
        elseif_branches: Vec<(Expr, Vec<Statement>)>,
        else_branch: Option<Vec<Statement>>,
    },

    /// `SELECT CASE expression ... END SELECT`
    SelectCase {
        test_expr: Expr,
        cases: Vec<CaseClause>,
        case_else: Option<Vec<Statement>>,
    },

    /// `FOR var = start TO end [STEP step] ... NEXT [var]`
    For {
        variable: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Vec<Statement>,
        /// Variable named after NEXT, with its position.
        next_variable: Option<(String, Locus)>,
    },

    /// `WHILE condition ... WEND`
    While {
        condition: Expr,
        body: Vec<Statement>,
    },

    /// `DO [WHILE|UNTIL condition] ... LOOP [WHILE|UNTIL condition]`
    DoLoop {
        pre_condition: Option<DoCondition>,
        body: Vec<Statement>,
        post_condition: Option<DoCondition>,
    },

    /// `GOTO label` or `GOTO lineNumber`
    Goto { target: String },

    /// `GOSUB label` or `GOSUB lineNumber`
    Gosub { target: String },

    /// `RETURN` - Return from GOSUB
    Return,

    /// `EXIT FOR`, `EXIT WHILE`, `EXIT DO`, `EXIT SUB`, `EXIT FUNCTION`
    Exit { exit_type: ExitType },

    /// `END` - End program execution
    End,

    /// Label definition: `labelName:` or a line number
    Label { name: String },

    /// `DECLARE SUB name(params)` / `DECLARE FUNCTION name(params) [AS type]`
    Declare {
        kind: RoutineKind,
        name: String,
        params: Vec<Parameter>,
        return_type: Option<TypeSpec>,
    },

    /// `CALL SubName(args)` or `SubName args`
    ///
    /// Builtin statements such as `CLS` and `LOCATE` parse to this as well.
    Call { name: String, args: Vec<Expr> },

    /// `INPUT [;]["prompt"{;|,}] target[, target...]`
    Input {
        prompt: Option<String>,
        /// Whether to show "? " after the prompt (`;` separator).
        question: bool,
        /// Lvalues to read into.
        targets: Vec<Expr>,
    },

    /// `LINE INPUT ["prompt";] target$`
    LineInput {
        prompt: Option<String>,
        /// Lvalue to read into (must be string).
        target: Expr,
    },

    /// `INPUT #n, targets` or `LINE INPUT #n, target$`
    FileInput {
        file_num: Expr,
        /// Lvalues to read into.
        targets: Vec<Expr>,
        /// LINE INPUT reads a whole line into one string.
        line: bool,
    },

    /// `OPEN path FOR mode AS [#]n`
    Open {
        /// The file name expression.
        path: Expr,
        /// INPUT, OUTPUT or APPEND.
        mode: FileMode,
        /// The file number expression.
        file_num: Expr,
    },

    /// `CLOSE [[#]n [, [#]n]...]`
    ///
    /// Closes one or more files. If no file numbers specified, closes all files.
    Close { file_nums: Vec<Expr> },

    /// `WRITE [#n,] expr, expr, ...` - comma-separated with strings quoted
    Write {
        file: Option<Expr>,
        values: Vec<Expr>,
    },

    /// `DATA value1, value2, ...` - compile-time data definition
    Data { values: Vec<DataValue> },

    /// `READ target1, target2, ...` - read from DATA pool
    Read { targets: Vec<Expr> },

    /// `RESTORE [label]` - reset DATA pointer
    Restore { label: Option<String> },

    /// `TYPE TypeName ... END TYPE` - User-defined type definition
    ///
    /// Example:
    /// ```basic
    /// TYPE Person
    ///     name AS STRING
    ///     age AS INTEGER
    /// END TYPE
    /// ```
    TypeDefinition {
        name: String,
        members: Vec<TypeMember>,
    },

    /// `DEFINT A-Z` and friends: per-letter default types
    DefType {
        type_spec: TypeSpec,
        ranges: Vec<(char, char)>,
    },

    /// `ON EVENT key$ GOSUB label` - registers an I/O bus event handler
    OnEvent { key: Expr, target: String },

    /// Comment: `' text` or `REM text`
    Comment(String),
}

/// File mode for OPEN statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// FOR INPUT - sequential read
    Input,
    /// FOR OUTPUT - sequential write (creates/truncates)
    Output,
    /// FOR APPEND - sequential write (creates/appends)
    Append,
}

impl FileMode {
    /// Numeric form passed to the OPEN syscall.
    pub fn code(self) -> i16 {
        match self {
            FileMode::Input => 0,
            FileMode::Output => 1,
            FileMode::Append => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(FileMode::Input),
            1 => Some(FileMode::Output),
            2 => Some(FileMode::Append),
            _ => None,
        }
    }
}

/// An item in a PRINT statement.
///
/// PRINT can have expressions separated by `;` (no spacing) or `,` (tab to next zone).
#[derive(Debug, Clone)]
pub struct PrintItem {
    /// The expression to print.
    pub expr: Expr,
    /// The separator after this item (if any).
    pub separator: Option<PrintSeparator>,
}

/// Separator between PRINT items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintSeparator {
    /// `;` - Print next item immediately after
    Semicolon,
    /// `,` - Tab to next 14-column print zone
    Comma,
}

/// One variable in a DIM or REDIM statement.
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    /// Array dimensions; empty for scalars and for `DIM a()`.
    pub dims: Vec<ArrayDimension>,
    /// Declared with parentheses.
    pub is_array: bool,
    pub type_spec: Option<TypeSpec>,
    pub locus: Locus,
}

/// Array dimension specification.
#[derive(Debug, Clone)]
pub struct ArrayDimension {
    /// Lower bound (defaults to 0).
    pub lower: Option<Expr>,
    /// Upper bound.
    pub upper: Expr,
}

/// Type specification for DIM statements, parameters and TYPE members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    Integer,
    Long,
    Single,
    Double,
    String,
    Json,
    Any,
    /// User-defined type reference
    UserDefined(String),
}

impl TypeSpec {
    /// Returns the type suffix character for this type.
    pub fn suffix(&self) -> Option<char> {
        match self {
            TypeSpec::Integer => Some('%'),
            TypeSpec::Long => Some('&'),
            TypeSpec::Single => Some('!'),
            TypeSpec::Double => Some('#'),
            TypeSpec::String => Some('$'),
            _ => None,
        }
    }

    /// The type a name's trailing sigil implies, if it has one.
    pub fn from_suffix(name: &str) -> Option<TypeSpec> {
        match name.chars().last()? {
            '%' => Some(TypeSpec::Integer),
            '&' => Some(TypeSpec::Long),
            '!' => Some(TypeSpec::Single),
            '#' => Some(TypeSpec::Double),
            '$' => Some(TypeSpec::String),
            _ => None,
        }
    }
}

/// A CASE clause in SELECT CASE.
#[derive(Debug, Clone)]
pub struct CaseClause {
    /// The values/conditions to match.
    pub matches: Vec<CaseMatch>,
    /// Statements to execute if matched.
    pub body: Vec<Statement>,
    pub locus: Locus,
}

/// A single match condition in a CASE clause.
#[derive(Debug, Clone)]
pub enum CaseMatch {
    /// Single value: `CASE 1`
    Single(Expr),
    /// Range: `CASE 1 TO 10`
    Range { from: Expr, to: Expr },
    /// Comparison: `CASE IS > 5`
    Comparison { op: CaseCompareOp, value: Expr },
}

/// Comparison operators allowed in CASE IS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseCompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

/// DO loop condition type.
#[derive(Debug, Clone)]
pub struct DoCondition {
    /// Whether this is WHILE (true) or UNTIL (false).
    pub is_while: bool,
    /// The condition expression.
    pub condition: Expr,
}

/// Exit statement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitType {
    For,
    While,
    Do,
    Sub,
    Function,
}

impl std::fmt::Display for ExitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExitType::For => "FOR",
            ExitType::While => "WHILE",
            ExitType::Do => "DO",
            ExitType::Sub => "SUB",
            ExitType::Function => "FUNCTION",
        };
        write!(f, "{}", name)
    }
}

/// Parameter definition for SUB/FUNCTION.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter type (if specified with AS).
    pub type_spec: Option<TypeSpec>,
    /// Declared as `name()`.
    pub is_array: bool,
    pub locus: Locus,
}

/// Member definition for TYPE (user-defined type).
///
/// Represents a field within a TYPE...END TYPE block.
#[derive(Debug, Clone)]
pub struct TypeMember {
    /// Member name (field name).
    pub name: String,
    /// Member type specification.
    pub type_spec: TypeSpec,
    pub locus: Locus,
}

/// A literal value in a DATA statement.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Integer literal.
    Integer(i64),
    /// Floating-point literal.
    Float(f64),
    /// String literal, quoted or bare.
    String(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_spec_suffix() {
        assert_eq!(TypeSpec::Integer.suffix(), Some('%'));
        assert_eq!(TypeSpec::String.suffix(), Some('$'));
        assert_eq!(TypeSpec::Double.suffix(), Some('#'));
        assert_eq!(TypeSpec::UserDefined("MyType".to_string()).suffix(), None);
    }

    #[test]
    fn test_type_spec_from_suffix() {
        assert_eq!(TypeSpec::from_suffix("NAME$"), Some(TypeSpec::String));
        assert_eq!(TypeSpec::from_suffix("COUNT&"), Some(TypeSpec::Long));
        assert_eq!(TypeSpec::from_suffix("X"), None);
    }

    #[test]
    fn test_create_print_statement() {
        let stmt = Statement::new(
            StatementKind::Print {
                file: None,
                using: None,
                items: vec![],
                newline: true,
            },
            Locus::new(1, 1),
        );
        assert!(matches!(
            stmt.kind,
            StatementKind::Print { newline: true, .. }
        ));
    }
}
