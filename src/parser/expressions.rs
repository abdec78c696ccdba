//! Expression parsing using Pratt (precedence climbing) parsing.
//!
//! Pratt parsing is an elegant technique for parsing expressions with
//! operator precedence. It handles:
//! - Binary operators with correct precedence and associativity
//! - Unary operators (negation, NOT)
//! - Parenthesized expressions
//! - `name(args)` references, left for the type checker to resolve
//!
//! # Precedence Levels (lowest to highest)
//!
//! 1. IMP, EQV, XOR, OR, AND (each its own level)
//! 2. NOT (unary)
//! 3. Comparison (=, <>, <, >, <=, >=)
//! 4. Addition (+, -)
//! 5. MOD
//! 6. Integer division (\)
//! 7. Multiplication (*, /)
//! 8. Unary minus
//! 9. Power (^)
//!
//! All binary operators are left-associative, `^` included.

use crate::ast::{BinaryOp, DerefTarget, Expr, ExprKind, Literal, UnaryOp};
use crate::lexer::{Token, TokenKind};

use super::{ParseError, Parser, Precedence};

impl<'a> Parser<'a> {
    // ==================== Expression Parsing (Pratt Parser) ====================

    /// Parses an expression.
    ///
    /// Returns `Err(())` on parse failure; actual errors are accumulated in `self.errors`.
    /// This pattern allows error recovery and reporting multiple errors.
    #[allow(clippy::result_unit_err)]
    pub fn parse_expression(&mut self) -> Result<Expr, ()> {
        self.parse_expr_precedence(Precedence::Lowest)
    }

    /// Parses an expression with the given minimum precedence.
    pub(super) fn parse_expr_precedence(&mut self, min_prec: Precedence) -> Result<Expr, ()> {
        // Parse prefix (primary expression or unary operator)
        let mut left = self.parse_prefix()?;

        // Parse infix operators while they have sufficient precedence
        while let Some(token) = self.peek() {
            let op_prec = Self::get_precedence(&token.kind);
            if op_prec <= min_prec {
                break;
            }

            left = self.parse_infix(left, op_prec)?;
        }

        Ok(left)
    }

    /// Parses a prefix expression (literal, identifier, unary op, or grouped).
    fn parse_prefix(&mut self) -> Result<Expr, ()> {
        let Some(token) = self.peek() else {
            self.error_here("expression");
            return Err(());
        };

        match &token.kind {
            TokenKind::IntegerLiteral => self.parse_integer_literal(),
            TokenKind::FloatLiteral => self.parse_float_literal(),
            TokenKind::HexLiteral => self.parse_radix_literal(16),
            TokenKind::OctalLiteral => self.parse_radix_literal(8),
            TokenKind::BinaryLiteral => self.parse_radix_literal(2),
            TokenKind::StringLiteral => self.parse_string_literal(),
            TokenKind::Identifier => self.parse_reference(),
            TokenKind::LeftParen => self.parse_grouped(),
            TokenKind::Minus => self.parse_unary(UnaryOp::Negate, Precedence::Unary),
            TokenKind::Plus => {
                // Unary plus is a no-op
                self.advance();
                self.parse_expr_precedence(Precedence::Unary)
            }
            TokenKind::Not => self.parse_unary(UnaryOp::Not, Precedence::Not),
            _ => {
                self.error_here("expression");
                if !self.at_statement_end() {
                    self.advance();
                }
                Err(())
            }
        }
    }

    /// Parses an infix expression (binary operation).
    fn parse_infix(&mut self, left: Expr, precedence: Precedence) -> Result<Expr, ()> {
        let Some(op_token) = self.advance() else {
            self.error_here("operator");
            return Err(());
        };

        let Some(op) = Self::token_to_binary_op(&op_token.kind) else {
            self.errors.push(ParseError::syntax(
                format!("expected operator, found {}", op_token.kind),
                op_token.locus,
            ));
            return Err(());
        };

        let right = self.parse_expr_precedence(precedence)?;
        let locus = left.locus;

        Ok(Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            locus,
        ))
    }

    fn number_error(&mut self, token: &Token, message: String) {
        self.errors.push(ParseError::InvalidNumber {
            locus: token.locus,
            message,
        });
    }

    /// Parses a decimal integer literal.
    ///
    /// Without a suffix the literal gets the narrowest type holding it:
    /// INTEGER, then LONG, then DOUBLE.
    fn parse_integer_literal(&mut self) -> Result<Expr, ()> {
        let token = self.advance().ok_or(())?;
        let (digits, suffix) = split_suffix(&token.text, &['%', '&']);

        let value: i64 = match digits.parse() {
            Ok(v) => v,
            // Too long for i64: only representable as DOUBLE
            Err(_) => {
                let value: f64 = digits.parse().map_err(|e| {
                    self.number_error(token, format!("invalid integer: {}", e));
                })?;
                return Ok(Expr::new(ExprKind::Literal(Literal::Double(value)), token.locus));
            }
        };

        let literal = match suffix {
            Some('%') if value > i16::MAX as i64 => {
                self.number_error(token, "overflow: value does not fit INTEGER".to_string());
                return Err(());
            }
            Some('%') => Literal::Integer(value),
            Some(_) if value > i32::MAX as i64 => {
                self.number_error(token, "overflow: value does not fit LONG".to_string());
                return Err(());
            }
            Some(_) => Literal::Long(value),
            None if value <= i16::MAX as i64 => Literal::Integer(value),
            None if value <= i32::MAX as i64 => Literal::Long(value),
            None => Literal::Double(value as f64),
        };

        Ok(Expr::new(ExprKind::Literal(literal), token.locus))
    }

    /// Parses a floating-point literal.
    ///
    /// `!` makes it SINGLE; `#`, a `D` exponent, or no suffix make it DOUBLE.
    fn parse_float_literal(&mut self) -> Result<Expr, ()> {
        let token = self.advance().ok_or(())?;
        let (body, suffix) = split_suffix(&token.text, &['!', '#']);

        // BASIC uses D for double exponents, convert to E for Rust parsing
        let text = body.replace(['D', 'd'], "E");
        let value: f64 = text.parse().map_err(|e| {
            self.number_error(token, format!("invalid float: {}", e));
        })?;

        let literal = match suffix {
            Some('!') => Literal::Single(value),
            _ => Literal::Double(value),
        };
        Ok(Expr::new(ExprKind::Literal(literal), token.locus))
    }

    /// Parses `&H`, `&O` and `&B` literals.
    ///
    /// Values up to 16 bits are INTEGER (so `&HFFFF` is -1), up to 32 bits LONG.
    fn parse_radix_literal(&mut self, radix: u32) -> Result<Expr, ()> {
        let token = self.advance().ok_or(())?;

        // Skip the &H / &O / &B prefix
        let (digits, suffix) = split_suffix(&token.text[2..], &['&']);
        let value = u64::from_str_radix(digits, radix).map_err(|e| {
            self.number_error(token, format!("invalid radix literal: {}", e));
        })?;

        let literal = if suffix.is_none() && value <= u16::MAX as u64 {
            Literal::Integer(value as u16 as i16 as i64)
        } else if value <= u32::MAX as u64 {
            Literal::Long(value as u32 as i32 as i64)
        } else {
            self.number_error(token, "overflow: value does not fit LONG".to_string());
            return Err(());
        };
        Ok(Expr::new(ExprKind::Literal(literal), token.locus))
    }

    /// Parses a string literal.
    ///
    /// # QBasic String Escape Semantics
    ///
    /// QBasic does NOT support C-style escape sequences (`\n`, `\t`, etc.).
    /// The only escape sequence is a doubled quote (`""`) which represents a
    /// single literal quote character.
    fn parse_string_literal(&mut self) -> Result<Expr, ()> {
        let token = self.advance().ok_or(())?;
        let value = unquote(&token.text);
        Ok(Expr::new(ExprKind::Literal(Literal::String(value)), token.locus))
    }

    /// Parses a variable, `name(args)` reference, or member access chain.
    ///
    /// Handles:
    /// - Simple identifiers: `x`
    /// - Array elements and calls alike: `arr(i)` / `fn(x)`
    /// - Member access: `p.age`, `people(i).name`
    pub(super) fn parse_reference(&mut self) -> Result<Expr, ()> {
        let (name, locus) = self.expect_identifier("identifier")?;

        let mut expr = if self.match_token(&TokenKind::LeftParen) {
            let args = self.parse_argument_list()?;
            self.expect(&TokenKind::RightParen, ")")?;
            Expr::new(
                ExprKind::Deref {
                    name,
                    args,
                    target: DerefTarget::Unresolved,
                },
                locus,
            )
        } else {
            Expr::new(ExprKind::Variable(name), locus)
        };

        // Handle member access chain: obj.field.subfield
        while self.match_token(&TokenKind::Dot) {
            let (member, _) = self.expect_identifier("member name after `.`")?;
            expr = Expr::new(
                ExprKind::Member {
                    object: Box::new(expr),
                    member,
                },
                locus,
            );
        }

        Ok(expr)
    }

    /// Parses a parenthesized expression.
    fn parse_grouped(&mut self) -> Result<Expr, ()> {
        let locus = self.advance().map(|t| t.locus).unwrap_or_default(); // consume (
        let inner = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, ")")?;
        Ok(Expr::new(ExprKind::Grouped(Box::new(inner)), locus))
    }

    /// Parses a unary expression.
    fn parse_unary(&mut self, op: UnaryOp, operand_prec: Precedence) -> Result<Expr, ()> {
        let locus = self.advance().map(|t| t.locus).unwrap_or_default(); // consume operator
        let operand = self.parse_expr_precedence(operand_prec)?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            locus,
        ))
    }

    /// Parses a comma-separated argument list.
    pub(super) fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ()> {
        let mut args = Vec::new();

        if !self.check(&TokenKind::RightParen) {
            args.push(self.parse_expression()?);

            while self.match_token(&TokenKind::Comma) {
                args.push(self.parse_expression()?);
            }
        }

        Ok(args)
    }

    /// Returns the precedence of a token (for infix operators).
    pub(super) fn get_precedence(kind: &TokenKind) -> Precedence {
        match kind {
            TokenKind::Caret => Precedence::Power,
            TokenKind::Star | TokenKind::Slash => Precedence::Multiplicative,
            TokenKind::Backslash => Precedence::IntDivide,
            TokenKind::Mod => Precedence::Modulo,
            TokenKind::Plus | TokenKind::Minus => Precedence::Additive,
            TokenKind::Equals
            | TokenKind::NotEquals
            | TokenKind::NotEqualsLegacy
            | TokenKind::LessThan
            | TokenKind::LessEquals
            | TokenKind::LessEqualsLegacy
            | TokenKind::GreaterThan
            | TokenKind::GreaterEquals
            | TokenKind::GreaterEqualsLegacy => Precedence::Comparison,
            TokenKind::And => Precedence::And,
            TokenKind::Or => Precedence::Or,
            TokenKind::Xor => Precedence::Xor,
            TokenKind::Eqv => Precedence::Eqv,
            TokenKind::Imp => Precedence::Imp,
            _ => Precedence::Lowest,
        }
    }

    /// Converts a token kind to a binary operator.
    pub(super) fn token_to_binary_op(kind: &TokenKind) -> Option<BinaryOp> {
        match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Subtract),
            TokenKind::Star => Some(BinaryOp::Multiply),
            TokenKind::Slash => Some(BinaryOp::Divide),
            TokenKind::Backslash => Some(BinaryOp::IntDivide),
            TokenKind::Mod => Some(BinaryOp::Modulo),
            TokenKind::Caret => Some(BinaryOp::Power),
            TokenKind::Equals => Some(BinaryOp::Equal),
            TokenKind::NotEquals | TokenKind::NotEqualsLegacy => Some(BinaryOp::NotEqual),
            TokenKind::LessThan => Some(BinaryOp::LessThan),
            TokenKind::LessEquals | TokenKind::LessEqualsLegacy => Some(BinaryOp::LessEqual),
            TokenKind::GreaterThan => Some(BinaryOp::GreaterThan),
            TokenKind::GreaterEquals | TokenKind::GreaterEqualsLegacy => {
                Some(BinaryOp::GreaterEqual)
            }
            TokenKind::And => Some(BinaryOp::And),
            TokenKind::Or => Some(BinaryOp::Or),
            TokenKind::Xor => Some(BinaryOp::Xor),
            TokenKind::Eqv => Some(BinaryOp::Eqv),
            TokenKind::Imp => Some(BinaryOp::Imp),
            _ => None,
        }
    }
}

/// Splits a trailing type suffix off a literal's text.
fn split_suffix<'t>(text: &'t str, suffixes: &[char]) -> (&'t str, Option<char>) {
    match text.chars().last() {
        Some(c) if suffixes.contains(&c) => (&text[..text.len() - 1], Some(c)),
        _ => (text, None),
    }
}

/// Strips the quotes from a string literal token and collapses `""`.
pub(super) fn unquote(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    inner.replace("\"\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Locus;
    use crate::lexer::lex;

    fn expr(source: &str) -> Expr {
        let tokens = lex(source).unwrap();
        let mut parser = Parser::new(&tokens);
        let expr = parser.parse_expression().unwrap();
        assert!(parser.errors.is_empty());
        expr
    }

    fn literal(e: &Expr) -> &Literal {
        match &e.kind {
            ExprKind::Literal(lit) => lit,
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_literal_sizing() {
        assert_eq!(literal(&expr("42")), &Literal::Integer(42));
        assert_eq!(literal(&expr("32768")), &Literal::Long(32768));
        assert_eq!(literal(&expr("7&")), &Literal::Long(7));
        assert_eq!(literal(&expr("3000000000")), &Literal::Double(3e9));
    }

    #[test]
    fn test_float_literal_types() {
        assert_eq!(literal(&expr("1.5")), &Literal::Double(1.5));
        assert_eq!(literal(&expr("1.5!")), &Literal::Single(1.5));
        assert_eq!(literal(&expr("2#")), &Literal::Double(2.0));
        assert_eq!(literal(&expr("1D3")), &Literal::Double(1000.0));
        assert_eq!(literal(&expr("1.")), &Literal::Double(1.0));
        assert_eq!(literal(&expr("2.!")), &Literal::Single(2.0));
    }

    #[test]
    fn test_radix_literals() {
        assert_eq!(literal(&expr("&HFF")), &Literal::Integer(255));
        assert_eq!(literal(&expr("&HFFFF")), &Literal::Integer(-1));
        assert_eq!(literal(&expr("&HFFFF&")), &Literal::Long(65535));
        assert_eq!(literal(&expr("&O17")), &Literal::Integer(15));
        assert_eq!(literal(&expr("&B101")), &Literal::Integer(5));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            literal(&expr(r#""say ""hi""""#)),
            &Literal::String("say \"hi\"".to_string())
        );
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let e = expr("1 + 2 * 3");
        let ExprKind::Binary { op, right, .. } = &e.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            right.kind,
            ExprKind::Binary {
                op: BinaryOp::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_negation_binds_looser_than_power() {
        // -2 ^ 2 parses as -(2 ^ 2)
        let e = expr("-2 ^ 2");
        let ExprKind::Unary { op, operand } = &e.kind else {
            panic!("expected unary");
        };
        assert_eq!(*op, UnaryOp::Negate);
        assert!(matches!(
            operand.kind,
            ExprKind::Binary {
                op: BinaryOp::Power,
                ..
            }
        ));
    }

    #[test]
    fn test_not_binds_looser_than_comparison() {
        let e = expr("NOT a = b");
        let ExprKind::Unary { operand, .. } = &e.kind else {
            panic!("expected unary");
        };
        assert!(matches!(
            operand.kind,
            ExprKind::Binary {
                op: BinaryOp::Equal,
                ..
            }
        ));
    }

    #[test]
    fn test_deref_and_members() {
        let e = expr("people(i + 1).name");
        let ExprKind::Member { object, member } = &e.kind else {
            panic!("expected member access");
        };
        assert_eq!(member, "NAME");
        assert!(matches!(
            &object.kind,
            ExprKind::Deref { name, args, target: DerefTarget::Unresolved }
                if name == "PEOPLE" && args.len() == 1
        ));
    }

    #[test]
    fn test_expression_locus() {
        let e = expr("  x + 1");
        assert_eq!(e.locus, Locus::new(1, 3));
    }
}
