//! Lexical analysis for qbvm.
//!
//! This module converts BASIC source code into a stream of [`Token`]s.
//! It handles:
//!
//! - Case-insensitive keyword recognition (BASIC tradition)
//! - Multiple number formats (decimal, hex `&H`, octal `&O`, binary `&B`)
//!   with `%`, `&`, `!` and `#` type suffixes
//! - String literals with `""` as an embedded quote
//! - Comments (both `'` and `REM` styles)
//! - Line continuations (underscore at end of line)
//!
//! ## Example
//!
//! ```
//! use qbvm::lexer::Lexer;
//!
//! let source = r#"PRINT "Hello, World!""#;
//! let mut lexer = Lexer::new(source);
//!
//! while let Some(Ok(token)) = lexer.next_token() {
//!     println!("{}: {:?} at {}", token.text, token.kind, token.locus);
//! }
//! ```
//!
//! ## Design Notes
//!
//! The lexer is built on the [`logos`](https://docs.rs/logos) crate, which
//! generates a fast DFA-based lexer from our token definitions.
//!
//! We wrap logos in our own [`Lexer`] struct to provide:
//!
//! - A restartable iterator interface
//! - Line/column tracking via [`LineIndex`]
//! - [`LexError`]s for illegal characters and unterminated strings, so the
//!   caller decides whether to stop or carry on

mod token;

pub use token::{Token, TokenKind};

use crate::ast::Locus;
use logos::Logos;
use thiserror::Error;

/// An error produced while tokenizing.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LexError {
    /// A string literal ran into the end of the line.
    #[error("unterminated string literal")]
    UnterminatedString { locus: Locus },

    /// A character that starts no token.
    #[error("illegal character '{ch}'")]
    IllegalCharacter { ch: char, locus: Locus },
}

impl LexError {
    /// Returns where the error occurred.
    pub fn locus(&self) -> Locus {
        match self {
            LexError::UnterminatedString { locus } | LexError::IllegalCharacter { locus, .. } => {
                *locus
            }
        }
    }
}

/// Maps byte offsets to 1-based line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    /// Returns the locus of the byte at `offset`. Columns count bytes.
    pub fn locus(&self, offset: usize) -> Locus {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Locus::new(line + 1, offset - self.line_starts[line] + 1)
    }
}

/// The lexer for qbvm BASIC source code.
///
/// Wraps a `logos` lexer and yields located [`Token`]s, or a [`LexError`]
/// for input that forms no token. Lexing continues after an error.
///
/// ## Example
///
/// ```
/// use qbvm::lexer::{Lexer, TokenKind};
///
/// let tokens: Vec<_> = Lexer::new("PRINT 42").filter_map(Result::ok).collect();
///
/// assert_eq!(tokens.len(), 2);
/// assert_eq!(tokens[0].kind, TokenKind::Print);
/// assert_eq!(tokens[1].kind, TokenKind::IntegerLiteral);
/// assert_eq!(tokens[1].text, "42");
/// ```
pub struct Lexer<'source> {
    /// The underlying logos lexer
    inner: logos::Lexer<'source, TokenKind>,
    /// The original source (for error reporting)
    source: &'source str,
    lines: LineIndex,
}

impl<'source> Lexer<'source> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            lines: LineIndex::new(source),
        }
    }

    /// Get the original source code.
    pub fn source(&self) -> &'source str {
        self.source
    }

    /// Rewinds to the start of the source.
    pub fn restart(&mut self) {
        self.inner = TokenKind::lexer(self.source);
    }

    /// Get the next token, if any.
    ///
    /// Returns `None` when the end of input is reached.
    ///
    /// # Example
    ///
    /// ```
    /// use qbvm::lexer::{Lexer, TokenKind};
    ///
    /// let mut lexer = Lexer::new("PRINT");
    ///
    /// let token = lexer.next_token().unwrap().unwrap();
    /// assert_eq!(token.kind, TokenKind::Print);
    ///
    /// assert!(lexer.next_token().is_none());
    /// ```
    pub fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        let kind = self.inner.next()?;
        let span = self.inner.span();
        let locus = self.lines.locus(span.start);
        let text = self.inner.slice();

        Some(match kind {
            Ok(TokenKind::UnterminatedString) => Err(LexError::UnterminatedString { locus }),
            Ok(kind) => Ok(Token::new(kind, span, text, locus)),
            Err(()) => Err(LexError::IllegalCharacter {
                ch: text.chars().next().unwrap_or('?'),
                locus,
            }),
        })
    }
}

/// Implement Iterator so the lexer can be used with for loops and iterator adapters.
impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Lexes the whole source, failing with every error found.
///
/// # Example
///
/// ```
/// use qbvm::lexer::{lex, TokenKind};
///
/// let tokens = lex("PRINT 42").unwrap();
/// assert_eq!(tokens[0].kind, TokenKind::Print);
/// ```
pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let (tokens, errors) = tokenize(source);
    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// Lexes the whole source, returning tokens and errors side by side.
///
/// Tooling uses this to keep going past bad characters.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for item in Lexer::new(source) {
        match item {
            Ok(token) => tokens.push(token),
            Err(err) => errors.push(err),
        }
    }
    log::debug!("lexed {} tokens, {} errors", tokens.len(), errors.len());
    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexer_iterator() {
        let tokens: Vec<_> = Lexer::new("PRINT 42").collect();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.is_ok()));
    }

    #[test]
    fn test_token_spans() {
        let tokens = lex("PRINT 42").unwrap();

        // PRINT should span bytes 0..5
        assert_eq!(tokens[0].span, 0..5);
        assert_eq!(tokens[0].text, "PRINT");

        // 42 should span bytes 6..8
        assert_eq!(tokens[1].span, 6..8);
        assert_eq!(tokens[1].text, "42");
    }

    #[test]
    fn test_token_locus() {
        let tokens = lex("x = 1\n  y = 2").unwrap();
        assert_eq!(tokens[0].locus, Locus::new(1, 1));
        assert_eq!(tokens[2].locus, Locus::new(1, 5));
        // Token after the newline
        assert_eq!(tokens[4].locus, Locus::new(2, 3));
    }

    #[test]
    fn test_multiline() {
        let source = "x = 1\ny = 2";
        let tokens = lex(source).unwrap();

        // Should get: x, =, 1, newline, y, =, 2
        let kinds: Vec<_> = tokens.iter().map(|t| &t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &TokenKind::Identifier,
                &TokenKind::Equals,
                &TokenKind::IntegerLiteral,
                &TokenKind::Newline,
                &TokenKind::Identifier,
                &TokenKind::Equals,
                &TokenKind::IntegerLiteral,
            ]
        );
    }

    #[test]
    fn test_illegal_character() {
        let (tokens, errors) = tokenize("x = 1 @ 2");
        assert_eq!(tokens.len(), 4);
        assert_eq!(
            errors,
            vec![LexError::IllegalCharacter {
                ch: '@',
                locus: Locus::new(1, 7)
            }]
        );
    }

    #[test]
    fn test_unterminated_string_error() {
        let errors = lex("PRINT \"abc\nPRINT 1").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            LexError::UnterminatedString { locus } if locus == Locus::new(1, 7)
        ));
    }

    #[test]
    fn test_restart() {
        let mut lexer = Lexer::new("A B");
        let first = lexer.next_token();
        lexer.next_token();
        assert!(lexer.next_token().is_none());
        lexer.restart();
        assert_eq!(lexer.next_token(), first);
    }

    #[test]
    fn test_string_literal_content() {
        let tokens = lex(r#"PRINT "Hello, World!""#).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].text, r#""Hello, World!""#);
    }
}
