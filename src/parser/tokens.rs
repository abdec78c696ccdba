//! Cursor over the token slice: lookahead, consumption, and resynchronizing
//! after a syntax error.

use crate::ast::Locus;
use crate::lexer::{Token, TokenKind};

use super::{ParseError, Parser};

impl<'a> Parser<'a> {
    // ==================== Token Navigation ====================

    pub(super) fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.current)
    }

    pub(super) fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    /// Looks ahead n tokens (0 = current token).
    pub(super) fn peek_ahead(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.current + n)
    }

    /// Consumes and returns the current token.
    pub(super) fn advance(&mut self) -> Option<&'a Token> {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.tokens.get(self.current.wrapping_sub(1))
    }

    /// Returns true if we've reached the end of the token stream.
    pub(super) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    pub(super) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    pub(super) fn check_any(&self, kinds: &[TokenKind]) -> bool {
        self.peek_kind().is_some_and(|k| kinds.contains(k))
    }

    /// Consumes the current token if it matches, returns true if consumed.
    pub(super) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// True at a statement boundary: newline, colon, comment, the ELSE of
    /// a single-line IF, or end of input.
    pub(super) fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            None | Some(
                TokenKind::Newline
                    | TokenKind::Colon
                    | TokenKind::Comment
                    | TokenKind::RemComment
                    | TokenKind::Else
            )
        )
    }

    /// True if the current token is the first on its line.
    pub(super) fn at_line_start(&self) -> bool {
        self.current == 0
            || self
                .tokens
                .get(self.current - 1)
                .is_some_and(|t| t.kind == TokenKind::Newline)
    }

    /// Locus of the current token, or of the last one at end of input.
    pub(super) fn current_locus(&self) -> Locus {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.locus)
            .unwrap_or_default()
    }

    /// Records an error for the current token.
    pub(super) fn error_here(&mut self, expected_desc: &str) {
        match self.peek() {
            Some(token) => {
                let found = token.kind.to_string();
                self.errors
                    .push(ParseError::unexpected(expected_desc, found, token.locus));
            }
            None => {
                let locus = self.current_locus();
                self.errors.push(ParseError::eof(expected_desc, locus));
            }
        }
    }

    /// Expects the current token to match, or records an error.
    pub(super) fn expect(&mut self, kind: &TokenKind, expected_desc: &str) -> Result<&'a Token, ()> {
        if self.check(kind) {
            self.advance().ok_or(())
        } else {
            self.error_here(expected_desc);
            Err(())
        }
    }

    /// Expects an identifier and returns its upper-cased text.
    pub(super) fn expect_identifier(&mut self, expected_desc: &str) -> Result<(String, Locus), ()> {
        let token = self.expect(&TokenKind::Identifier, expected_desc)?;
        Ok((token.text.to_ascii_uppercase(), token.locus))
    }

    /// Skips newlines and colons between statements.
    pub(super) fn skip_separators(&mut self) {
        while self.check_any(&[TokenKind::Newline, TokenKind::Colon]) {
            self.advance();
        }
    }

    /// Skips separators and comments, where no statement may appear.
    pub(super) fn skip_trivia(&mut self) {
        while self.check_any(&[
            TokenKind::Newline,
            TokenKind::Colon,
            TokenKind::Comment,
            TokenKind::RemComment,
        ]) {
            self.advance();
        }
    }

    /// Attempts to recover from an error by skipping to a synchronization point.
    ///
    /// Synchronization points are:
    /// - Newlines (statement boundaries)
    /// - Statement-starting and block-closing keywords (PRINT, IF, NEXT, etc.)
    pub(super) fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            // Newline is a natural statement boundary
            if self.tokens.get(self.current - 1).map(|t| &t.kind) == Some(&TokenKind::Newline) {
                return;
            }

            // Statement-starting keywords are synchronization points
            match self.peek_kind() {
                Some(
                    TokenKind::Print
                    | TokenKind::If
                    | TokenKind::For
                    | TokenKind::While
                    | TokenKind::Do
                    | TokenKind::Dim
                    | TokenKind::Let
                    | TokenKind::Sub
                    | TokenKind::Function
                    | TokenKind::Select
                    | TokenKind::Case
                    | TokenKind::Next
                    | TokenKind::Wend
                    | TokenKind::Loop
                    | TokenKind::End,
                ) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}
