//! Token definitions for the qbvm lexer.
//!
//! This module defines all tokens recognized by the BASIC lexer, including:
//! - Keywords (IF, THEN, PRINT, etc.)
//! - Operators (+, -, AND, OR, etc.)
//! - Literals (numbers, strings)
//! - Punctuation and delimiters
//!
//! ## Design Notes
//!
//! We use the `logos` crate for lexical analysis. Logos generates a fast,
//! table-driven lexer from token definitions using procedural macros.
//!
//! BASIC is case-insensitive, so keywords are matched with `ignore(ascii_case)`.
//! A handful of builtin statements (CLS, LOCATE, COLOR...) are keywords too,
//! so that `CLS: PRINT` is never mistaken for a label definition.

use crate::ast::Locus;
use logos::Logos;
use std::fmt;

/// A token with its location in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// Byte offset where this token starts in the source
    pub span: std::ops::Range<usize>,
    /// The original text of the token (useful for identifiers, literals)
    pub text: String,
    /// Line and column of the first character
    pub locus: Locus,
}

impl Token {
    /// Create a new token with the given kind, span, text and locus.
    pub fn new(
        kind: TokenKind,
        span: std::ops::Range<usize>,
        text: impl Into<String>,
        locus: Locus,
    ) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
            locus,
        }
    }
}

/// All possible token types in the BASIC dialect.
///
/// Tokens are grouped into categories:
/// - Keywords (control flow, declarations, I/O, etc.)
/// - Operators (arithmetic, comparison, logical)
/// - Literals (numbers, strings)
/// - Punctuation and delimiters
/// - Special tokens (comments, newlines)
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")] // Skip horizontal whitespace (but not newlines!)
#[logos(skip r"_[ \t]*\r?\n")] // Line continuation joins physical lines
pub enum TokenKind {
    // ==================== Control Flow Keywords ====================

    #[token("IF", ignore(ascii_case))]
    If,

    #[token("THEN", ignore(ascii_case))]
    Then,

    #[token("ELSE", ignore(ascii_case))]
    Else,

    #[token("ELSEIF", ignore(ascii_case))]
    ElseIf,

    #[token("END", ignore(ascii_case))]
    End,

    /// FOR keyword - begins FOR loop, also OPEN ... FOR mode
    #[token("FOR", ignore(ascii_case))]
    For,

    /// TO keyword - FOR loop range, CASE range
    #[token("TO", ignore(ascii_case))]
    To,

    #[token("STEP", ignore(ascii_case))]
    Step,

    #[token("NEXT", ignore(ascii_case))]
    Next,

    #[token("WHILE", ignore(ascii_case))]
    While,

    #[token("WEND", ignore(ascii_case))]
    Wend,

    #[token("DO", ignore(ascii_case))]
    Do,

    #[token("LOOP", ignore(ascii_case))]
    Loop,

    #[token("UNTIL", ignore(ascii_case))]
    Until,

    #[token("SELECT", ignore(ascii_case))]
    Select,

    #[token("CASE", ignore(ascii_case))]
    Case,

    /// IS keyword - CASE IS comparison
    #[token("IS", ignore(ascii_case))]
    Is,

    #[token("GOTO", ignore(ascii_case))]
    Goto,

    #[token("GOSUB", ignore(ascii_case))]
    Gosub,

    /// RETURN keyword - return from GOSUB
    #[token("RETURN", ignore(ascii_case))]
    Return,

    #[token("EXIT", ignore(ascii_case))]
    Exit,

    /// ON keyword - ON EVENT handler registration
    #[token("ON", ignore(ascii_case))]
    On,

    /// EVENT keyword - ON EVENT
    #[token("EVENT", ignore(ascii_case))]
    Event,

    /// CALL keyword - explicit SUB invocation
    #[token("CALL", ignore(ascii_case))]
    Call,

    // ==================== Declaration Keywords ====================

    #[token("DIM", ignore(ascii_case))]
    Dim,

    #[token("REDIM", ignore(ascii_case))]
    Redim,

    /// PRESERVE keyword - REDIM PRESERVE
    #[token("PRESERVE", ignore(ascii_case))]
    Preserve,

    #[token("AS", ignore(ascii_case))]
    As,

    #[token("SHARED", ignore(ascii_case))]
    Shared,

    #[token("CONST", ignore(ascii_case))]
    Const,

    #[token("TYPE", ignore(ascii_case))]
    Type,

    #[token("DECLARE", ignore(ascii_case))]
    Declare,

    #[token("SUB", ignore(ascii_case))]
    Sub,

    #[token("FUNCTION", ignore(ascii_case))]
    Function,

    #[token("LET", ignore(ascii_case))]
    Let,

    /// DEFINT letter range
    #[token("DEFINT", ignore(ascii_case))]
    DefInt,

    /// DEFLNG letter range
    #[token("DEFLNG", ignore(ascii_case))]
    DefLng,

    /// DEFSNG letter range
    #[token("DEFSNG", ignore(ascii_case))]
    DefSng,

    /// DEFDBL letter range
    #[token("DEFDBL", ignore(ascii_case))]
    DefDbl,

    /// DEFSTR letter range
    #[token("DEFSTR", ignore(ascii_case))]
    DefStr,

    // ==================== Type Keywords ====================

    #[token("INTEGER", ignore(ascii_case))]
    Integer,

    #[token("LONG", ignore(ascii_case))]
    Long,

    #[token("SINGLE", ignore(ascii_case))]
    Single,

    #[token("DOUBLE", ignore(ascii_case))]
    Double,

    #[token("STRING", ignore(ascii_case))]
    String_, // Underscore to avoid conflict with Rust's String

    /// JSON type (parsed JSON document)
    #[token("JSON", ignore(ascii_case))]
    Json,

    /// ANY type (wildcard parameter type)
    #[token("ANY", ignore(ascii_case))]
    Any,

    // ==================== I/O Keywords ====================

    #[token("PRINT", ignore(ascii_case))]
    Print,

    /// USING keyword (PRINT USING)
    #[token("USING", ignore(ascii_case))]
    Using,

    /// INPUT statement, also OPEN ... FOR INPUT
    #[token("INPUT", ignore(ascii_case))]
    Input,

    /// LINE keyword (LINE INPUT)
    #[token("LINE", ignore(ascii_case))]
    Line,

    #[token("OPEN", ignore(ascii_case))]
    Open,

    /// OUTPUT file mode
    #[token("OUTPUT", ignore(ascii_case))]
    Output,

    /// APPEND file mode
    #[token("APPEND", ignore(ascii_case))]
    Append,

    #[token("CLOSE", ignore(ascii_case))]
    Close,

    #[token("WRITE", ignore(ascii_case))]
    Write,

    #[token("READ", ignore(ascii_case))]
    Read,

    #[token("DATA", ignore(ascii_case))]
    Data,

    #[token("RESTORE", ignore(ascii_case))]
    Restore,

    // ==================== Builtin Statement Keywords ====================

    #[token("CLS", ignore(ascii_case))]
    Cls,

    #[token("LOCATE", ignore(ascii_case))]
    Locate,

    #[token("COLOR", ignore(ascii_case))]
    Color,

    #[token("BEEP", ignore(ascii_case))]
    Beep,

    #[token("SLEEP", ignore(ascii_case))]
    Sleep,

    #[token("RANDOMIZE", ignore(ascii_case))]
    Randomize,

    #[token("PLAY", ignore(ascii_case))]
    Play,

    #[token("SOUND", ignore(ascii_case))]
    Sound,

    #[token("SWAP", ignore(ascii_case))]
    Swap,

    // ==================== Logical Operators (Keywords) ====================

    #[token("AND", ignore(ascii_case))]
    And,

    #[token("OR", ignore(ascii_case))]
    Or,

    #[token("NOT", ignore(ascii_case))]
    Not,

    #[token("XOR", ignore(ascii_case))]
    Xor,

    #[token("EQV", ignore(ascii_case))]
    Eqv,

    #[token("IMP", ignore(ascii_case))]
    Imp,

    #[token("MOD", ignore(ascii_case))]
    Mod,

    // ==================== Arithmetic Operators ====================

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("\\")]
    Backslash,

    #[token("^")]
    Caret,

    // ==================== Comparison Operators ====================

    #[token("=")]
    Equals,

    #[token("<>")]
    NotEquals,

    /// >< not equals (legacy spelling)
    #[token("><")]
    NotEqualsLegacy,

    #[token("<")]
    LessThan,

    #[token(">")]
    GreaterThan,

    #[token("<=")]
    LessEquals,

    /// =< less than or equal (legacy spelling)
    #[token("=<")]
    LessEqualsLegacy,

    #[token(">=")]
    GreaterEquals,

    /// => greater than or equal (legacy spelling)
    #[token("=>")]
    GreaterEqualsLegacy,

    // ==================== Punctuation ====================

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[token("#")]
    Hash,

    // ==================== Literals ====================

    /// Integer literal (decimal), optionally suffixed `%` or `&`
    /// Examples: 123, 0, 32768&
    #[regex(r"[0-9]+[%&]?", priority = 3)]
    IntegerLiteral,

    /// Hexadecimal literal
    /// Examples: &H1F, &HFF00&
    #[regex(r"&[Hh][0-9A-Fa-f]+&?")]
    HexLiteral,

    /// Octal literal
    /// Examples: &O17, &O777
    #[regex(r"&[Oo][0-7]+&?")]
    OctalLiteral,

    /// Binary literal
    /// Examples: &B1010, &B11110000
    #[regex(r"&[Bb][01]+&?")]
    BinaryLiteral,

    /// Floating point literal, optionally suffixed `!` or `#`
    /// Examples: 1.5, .5, 1., 1.5E10, 1.5D-3, 2#
    #[regex(r"[0-9]+\.[0-9]*([EeDd][+-]?[0-9]+)?[!#]?|\.[0-9]+([EeDd][+-]?[0-9]+)?[!#]?|[0-9]+[EeDd][+-]?[0-9]+[!#]?|[0-9]+[!#]")]
    FloatLiteral,

    /// String literal; `""` inside the quotes is an embedded quote
    #[regex(r#""([^"\n]|"")*""#)]
    StringLiteral,

    /// A string missing its closing quote before end of line
    #[regex(r#""([^"\n]|"")*"#)]
    UnterminatedString,

    // ==================== Identifiers ====================

    /// Identifier (variable, function, or label name)
    /// Must start with a letter, can contain letters, digits, and underscores
    /// May end with type suffix ($, %, &, !, #)
    #[regex(r"[A-Za-z][A-Za-z0-9_]*[$%&!#]?")]
    Identifier,

    // ==================== Special Tokens ====================

    /// Comment - starts with '
    #[regex(r"'[^\n]*")]
    Comment,

    /// REM comment (traditional BASIC comment keyword)
    /// Note: Must be followed by space or end of line to distinguish from identifiers like REMOVE
    #[regex(r"(?i:REM)([ \t][^\n]*)?", priority = 5)]
    RemComment,

    /// Newline - significant in BASIC (ends statements)
    #[regex(r"\n")]
    Newline,
}

impl TokenKind {
    /// Returns true for tokens that name a builtin statement (CLS, BEEP, ...).
    pub fn is_builtin_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Cls
                | TokenKind::Locate
                | TokenKind::Color
                | TokenKind::Beep
                | TokenKind::Sleep
                | TokenKind::Randomize
                | TokenKind::Play
                | TokenKind::Sound
                | TokenKind::Swap
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Keywords display as uppercase
            TokenKind::If => write!(f, "IF"),
            TokenKind::Then => write!(f, "THEN"),
            TokenKind::Else => write!(f, "ELSE"),
            TokenKind::ElseIf => write!(f, "ELSEIF"),
            TokenKind::End => write!(f, "END"),
            TokenKind::For => write!(f, "FOR"),
            TokenKind::To => write!(f, "TO"),
            TokenKind::Next => write!(f, "NEXT"),
            TokenKind::Wend => write!(f, "WEND"),
            TokenKind::Loop => write!(f, "LOOP"),
            TokenKind::Case => write!(f, "CASE"),
            TokenKind::As => write!(f, "AS"),
            TokenKind::Print => write!(f, "PRINT"),

            // Operators display as symbols
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Equals => write!(f, "="),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Hash => write!(f, "#"),
            TokenKind::Newline => write!(f, "end of line"),

            // Default: use debug representation
            _ => write!(f, "{:?}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logos::Logos;

    /// Helper to collect all tokens from source
    fn lex_all(source: &str) -> Vec<TokenKind> {
        TokenKind::lexer(source).filter_map(|r| r.ok()).collect()
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(lex_all("IF"), vec![TokenKind::If]);
        assert_eq!(lex_all("if"), vec![TokenKind::If]);
        assert_eq!(lex_all("If"), vec![TokenKind::If]);
        assert_eq!(lex_all("iF"), vec![TokenKind::If]);
    }

    #[test]
    fn test_simple_print_statement() {
        let tokens = lex_all(r#"PRINT "Hello, World!""#);
        assert_eq!(tokens, vec![TokenKind::Print, TokenKind::StringLiteral]);
    }

    #[test]
    fn test_embedded_quotes() {
        let tokens = lex_all(r#"PRINT "say ""hi""""#);
        assert_eq!(tokens, vec![TokenKind::Print, TokenKind::StringLiteral]);
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = lex_all("PRINT \"oops\nPRINT 1");
        assert_eq!(tokens[1], TokenKind::UnterminatedString);
        assert_eq!(tokens[2], TokenKind::Newline);
    }

    #[test]
    fn test_if_statement() {
        let tokens = lex_all("IF x > 10 THEN PRINT x");
        assert_eq!(tokens, vec![
            TokenKind::If,
            TokenKind::Identifier,
            TokenKind::GreaterThan,
            TokenKind::IntegerLiteral,
            TokenKind::Then,
            TokenKind::Print,
            TokenKind::Identifier,
        ]);
    }

    #[test]
    fn test_radix_literals() {
        let tokens = lex_all("&HFF &h1a &O17 &B101");
        assert_eq!(tokens, vec![
            TokenKind::HexLiteral,
            TokenKind::HexLiteral,
            TokenKind::OctalLiteral,
            TokenKind::BinaryLiteral,
        ]);
    }

    #[test]
    fn test_numeric_suffixes() {
        let tokens = lex_all("1% 2& 3! 4# 1.5 .5 1.5E10 1D-3");
        assert_eq!(tokens, vec![
            TokenKind::IntegerLiteral,
            TokenKind::IntegerLiteral,
            TokenKind::FloatLiteral,
            TokenKind::FloatLiteral,
            TokenKind::FloatLiteral,
            TokenKind::FloatLiteral,
            TokenKind::FloatLiteral,
            TokenKind::FloatLiteral,
        ]);
    }

    #[test]
    fn test_trailing_dot_float() {
        assert_eq!(lex_all("1. 2.# 3.E2"), vec![TokenKind::FloatLiteral; 3]);
    }

    #[test]
    fn test_comments() {
        let tokens = lex_all("x = 1 ' this is a comment\nREM another\nREMARK = 2");
        assert_eq!(tokens, vec![
            TokenKind::Identifier,
            TokenKind::Equals,
            TokenKind::IntegerLiteral,
            TokenKind::Comment,
            TokenKind::Newline,
            TokenKind::RemComment,
            TokenKind::Newline,
            TokenKind::Identifier,
            TokenKind::Equals,
            TokenKind::IntegerLiteral,
        ]);
    }

    #[test]
    fn test_legacy_operators() {
        let tokens = lex_all("a >< b =< c => d");
        assert_eq!(tokens[1], TokenKind::NotEqualsLegacy);
        assert_eq!(tokens[3], TokenKind::LessEqualsLegacy);
        assert_eq!(tokens[5], TokenKind::GreaterEqualsLegacy);
    }

    #[test]
    fn test_line_continuation() {
        let tokens = lex_all("PRINT 1, _\n  2");
        assert_eq!(tokens, vec![
            TokenKind::Print,
            TokenKind::IntegerLiteral,
            TokenKind::Comma,
            TokenKind::IntegerLiteral,
        ]);
    }

    #[test]
    fn test_type_suffixes() {
        let tokens = lex_all("name$ count% total& value! num#");
        assert_eq!(tokens, vec![
            TokenKind::Identifier, // name$ - suffix included in identifier
            TokenKind::Identifier, // count%
            TokenKind::Identifier, // total&
            TokenKind::Identifier, // value!
            TokenKind::Identifier, // num#
        ]);
    }

    #[test]
    fn test_builtin_statement_keywords() {
        let tokens = lex_all("CLS: beep");
        assert_eq!(tokens, vec![TokenKind::Cls, TokenKind::Colon, TokenKind::Beep]);
        assert!(TokenKind::Cls.is_builtin_statement());
        assert!(!TokenKind::Print.is_builtin_statement());
    }
}
