//! Control flow statement parsing.
//!
//! This module handles parsing of control flow constructs:
//! - IF/THEN/ELSEIF/ELSE/END IF (block and single-line forms)
//! - SELECT CASE/CASE/CASE ELSE/END SELECT
//! - FOR/NEXT loops
//! - WHILE/WEND loops
//! - DO/LOOP (with WHILE/UNTIL variants)

use crate::ast::{
    CaseClause, CaseCompareOp, CaseMatch, DoCondition, Locus, Statement, StatementKind,
};
use crate::lexer::TokenKind;

use super::{ParseError, Parser};

impl<'a> Parser<'a> {
    // ==================== Blocks ====================

    /// Parses statements until `is_end` holds at a statement boundary.
    ///
    /// Returns the statements and whether the terminator was found (it is
    /// not consumed). Errors inside the block are recorded and skipped.
    pub(super) fn parse_block(&mut self, is_end: impl Fn(&Self) -> bool) -> (Vec<Statement>, bool) {
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            if self.is_at_end() {
                return (body, false);
            }
            if is_end(self) {
                return (body, true);
            }
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(()) => self.synchronize(),
            }
        }
    }

    /// True at `END <kind>`.
    pub(super) fn check_end(&self, kind: &TokenKind) -> bool {
        self.check(&TokenKind::End) && self.peek_ahead(1).map(|t| &t.kind) == Some(kind)
    }

    // ==================== IF Statement ====================

    /// Parses an IF statement.
    pub(super) fn parse_if(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume IF
        let condition = self.parse_expression()?;

        // IF cond GOTO label
        if self.check(&TokenKind::Goto) {
            let then_branch = vec![self.parse_goto()?];
            let else_branch = self.parse_single_line_else()?;
            return Ok(Self::if_statement(condition, then_branch, else_branch, locus));
        }

        self.expect(&TokenKind::Then, "THEN")?;

        if !matches!(
            self.peek_kind(),
            None | Some(TokenKind::Newline | TokenKind::Comment | TokenKind::RemComment)
        ) {
            let then_branch = self.parse_single_line_branch()?;
            let else_branch = self.parse_single_line_else()?;
            return Ok(Self::if_statement(condition, then_branch, else_branch, locus));
        }

        let is_branch_end =
            |p: &Self| p.check_any(&[TokenKind::ElseIf, TokenKind::Else]) || p.check_end(&TokenKind::If);

        let (then_branch, mut terminated) = self.parse_block(is_branch_end);
        let mut elseif_branches = Vec::new();
        let mut else_branch = None;

        while terminated && self.match_token(&TokenKind::ElseIf) {
            let elseif_condition = self.parse_expression()?;
            self.expect(&TokenKind::Then, "THEN")?;
            let (body, found) = self.parse_block(is_branch_end);
            elseif_branches.push((elseif_condition, body));
            terminated = found;
        }

        if terminated && self.match_token(&TokenKind::Else) {
            let (body, found) = self.parse_block(|p| p.check_end(&TokenKind::If));
            else_branch = Some(body);
            terminated = found;
        }

        if !terminated || !self.check_end(&TokenKind::If) {
            self.errors.push(ParseError::MissingEndIf { if_locus: locus });
            return Err(());
        }
        self.advance(); // END
        self.advance(); // IF

        Ok(Statement::new(
            StatementKind::If {
                condition,
                then_branch,
                elseif_branches,
                else_branch,
            },
            locus,
        ))
    }

    fn if_statement(
        condition: crate::ast::Expr,
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
        locus: Locus,
    ) -> Statement {
        Statement::new(
            StatementKind::If {
                condition,
                then_branch,
                elseif_branches: Vec::new(),
                else_branch,
            },
            locus,
        )
    }

    /// Parses the colon-separated statements of a single-line branch.
    ///
    /// A bare line number (`THEN 100`) is an implicit GOTO.
    fn parse_single_line_branch(&mut self) -> Result<Vec<Statement>, ()> {
        if let Some(token) = self.peek()
            && token.kind == TokenKind::IntegerLiteral
        {
            self.advance();
            return Ok(vec![Statement::new(
                StatementKind::Goto {
                    target: token.text.clone(),
                },
                token.locus,
            )]);
        }

        let mut body = vec![self.parse_statement()?];
        while self.match_token(&TokenKind::Colon) {
            if matches!(self.peek_kind(), None | Some(TokenKind::Newline | TokenKind::Else)) {
                break;
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_single_line_else(&mut self) -> Result<Option<Vec<Statement>>, ()> {
        if self.match_token(&TokenKind::Else) {
            Ok(Some(self.parse_single_line_branch()?))
        } else {
            Ok(None)
        }
    }

    // ==================== SELECT CASE Statement ====================

    /// Parses a SELECT CASE statement.
    pub(super) fn parse_select_case(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume SELECT
        self.expect(&TokenKind::Case, "CASE")?;
        let test_expr = self.parse_expression()?;

        let mut cases = Vec::new();
        let mut case_else = None;
        let is_case_end = |p: &Self| p.check(&TokenKind::Case) || p.check_end(&TokenKind::Select);

        loop {
            self.skip_trivia();
            if self.is_at_end() {
                self.errors
                    .push(ParseError::MissingEndSelect { select_locus: locus });
                return Err(());
            }
            if self.check_end(&TokenKind::Select) {
                self.advance(); // END
                self.advance(); // SELECT
                break;
            }

            let case_locus = self.expect(&TokenKind::Case, "CASE or END SELECT")?.locus;
            if self.match_token(&TokenKind::Else) {
                let (body, _) = self.parse_block(|p| p.check_end(&TokenKind::Select));
                case_else = Some(body);
                continue;
            }

            let matches = self.parse_case_matches()?;
            let (body, _) = self.parse_block(is_case_end);
            cases.push(CaseClause {
                matches,
                body,
                locus: case_locus,
            });
        }

        Ok(Statement::new(
            StatementKind::SelectCase {
                test_expr,
                cases,
                case_else,
            },
            locus,
        ))
    }

    /// Parses the comma-separated match list of a CASE clause.
    fn parse_case_matches(&mut self) -> Result<Vec<CaseMatch>, ()> {
        let mut matches = Vec::new();
        loop {
            // CASE IS > 5, or the shorthand CASE > 5
            let is_prefixed = self.match_token(&TokenKind::Is);
            if let Some(op) = self.parse_case_compare_op() {
                let value = self.parse_expression()?;
                matches.push(CaseMatch::Comparison { op, value });
            } else if is_prefixed {
                self.error_here("comparison operator after IS");
                return Err(());
            } else {
                let from = self.parse_expression()?;
                if self.match_token(&TokenKind::To) {
                    let to = self.parse_expression()?;
                    matches.push(CaseMatch::Range { from, to });
                } else {
                    matches.push(CaseMatch::Single(from));
                }
            }

            if !self.match_token(&TokenKind::Comma) {
                return Ok(matches);
            }
        }
    }

    /// Consumes a CASE IS comparison operator, if one is next.
    fn parse_case_compare_op(&mut self) -> Option<CaseCompareOp> {
        let op = match self.peek_kind()? {
            TokenKind::Equals => CaseCompareOp::Equal,
            TokenKind::NotEquals | TokenKind::NotEqualsLegacy => CaseCompareOp::NotEqual,
            TokenKind::LessThan => CaseCompareOp::LessThan,
            TokenKind::LessEquals | TokenKind::LessEqualsLegacy => CaseCompareOp::LessEqual,
            TokenKind::GreaterThan => CaseCompareOp::GreaterThan,
            TokenKind::GreaterEquals | TokenKind::GreaterEqualsLegacy => {
                CaseCompareOp::GreaterEqual
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    // ==================== FOR Loop ====================

    /// Parses a FOR...NEXT loop.
    pub(super) fn parse_for(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume FOR
        let (variable, _) = self.expect_identifier("loop variable")?;
        self.expect(&TokenKind::Equals, "=")?;
        let start = self.parse_expression()?;
        self.expect(&TokenKind::To, "TO")?;
        let end = self.parse_expression()?;
        let step = if self.match_token(&TokenKind::Step) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let (body, terminated) = self.parse_block(|p| p.check(&TokenKind::Next));
        if !terminated {
            self.errors.push(ParseError::MissingNext { for_locus: locus });
            return Err(());
        }
        self.advance(); // NEXT

        let next_variable = if self.check(&TokenKind::Identifier) {
            Some(self.expect_identifier("loop variable")?)
        } else {
            None
        };

        Ok(Statement::new(
            StatementKind::For {
                variable,
                start,
                end,
                step,
                body,
                next_variable,
            },
            locus,
        ))
    }

    // ==================== WHILE Loop ====================

    /// Parses a WHILE...WEND loop.
    pub(super) fn parse_while(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume WHILE
        let condition = self.parse_expression()?;

        let (body, terminated) = self.parse_block(|p| p.check(&TokenKind::Wend));
        if !terminated {
            self.errors
                .push(ParseError::MissingWend { while_locus: locus });
            return Err(());
        }
        self.advance(); // WEND

        Ok(Statement::new(StatementKind::While { condition, body }, locus))
    }

    // ==================== DO Loop ====================

    /// Parses a DO...LOOP statement.
    pub(super) fn parse_do_loop(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume DO
        let pre_condition = self.parse_do_condition()?;

        let (body, terminated) = self.parse_block(|p| p.check(&TokenKind::Loop));
        if !terminated {
            self.errors.push(ParseError::MissingLoop { do_locus: locus });
            return Err(());
        }
        self.advance(); // LOOP

        let post_condition = self.parse_do_condition()?;
        if pre_condition.is_some() && post_condition.is_some() {
            self.errors.push(ParseError::syntax(
                "DO loop cannot have both a pre-condition and a post-condition",
                locus,
            ));
            return Err(());
        }

        Ok(Statement::new(
            StatementKind::DoLoop {
                pre_condition,
                body,
                post_condition,
            },
            locus,
        ))
    }

    /// Parses an optional `WHILE cond` / `UNTIL cond` after DO or LOOP.
    fn parse_do_condition(&mut self) -> Result<Option<DoCondition>, ()> {
        let is_while = if self.match_token(&TokenKind::While) {
            true
        } else if self.match_token(&TokenKind::Until) {
            false
        } else {
            return Ok(None);
        };
        let condition = self.parse_expression()?;
        Ok(Some(DoCondition {
            is_while,
            condition,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Program, Routine};
    use crate::lexer::lex;

    fn main_body(source: &str) -> Vec<Statement> {
        let tokens = lex(source).unwrap();
        let mut parser = Parser::new(&tokens);
        let program: Program = parser.parse().unwrap();
        let Routine { body, .. } = program.routines.into_iter().next().unwrap();
        body
    }

    fn parse_errors(source: &str) -> Vec<ParseError> {
        let tokens = lex(source).unwrap();
        Parser::new(&tokens).parse().unwrap_err()
    }

    #[test]
    fn test_single_line_if_with_else() {
        let body = main_body("IF x THEN PRINT 1: PRINT 2 ELSE PRINT 3");
        assert_eq!(body.len(), 1);
        let StatementKind::If {
            then_branch,
            else_branch,
            ..
        } = &body[0].kind
        else {
            panic!("expected IF");
        };
        assert_eq!(then_branch.len(), 2);
        assert_eq!(else_branch.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_if_then_line_number() {
        let body = main_body("IF x THEN 100");
        let StatementKind::If { then_branch, .. } = &body[0].kind else {
            panic!("expected IF");
        };
        assert!(matches!(
            &then_branch[0].kind,
            StatementKind::Goto { target } if target == "100"
        ));
    }

    #[test]
    fn test_block_if_elseif_else() {
        let body = main_body(
            "IF a THEN\n  PRINT 1\nELSEIF b THEN\n  PRINT 2\nELSE\n  PRINT 3\nEND IF\n",
        );
        let StatementKind::If {
            elseif_branches,
            else_branch,
            ..
        } = &body[0].kind
        else {
            panic!("expected IF");
        };
        assert_eq!(elseif_branches.len(), 1);
        assert!(else_branch.is_some());
    }

    #[test]
    fn test_missing_end_if() {
        let errors = parse_errors("IF a THEN\n  PRINT 1\n");
        assert!(matches!(
            errors[0],
            ParseError::MissingEndIf { if_locus } if if_locus == Locus::new(1, 1)
        ));
    }

    #[test]
    fn test_select_case_forms() {
        let body = main_body(
            "SELECT CASE n\n' comment\nCASE 1, 2\n  PRINT \"low\"\nCASE 3 TO 5\nCASE IS >< 9\nCASE ELSE\n  PRINT \"other\"\nEND SELECT\n",
        );
        let StatementKind::SelectCase {
            cases, case_else, ..
        } = &body[0].kind
        else {
            panic!("expected SELECT CASE");
        };
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0].matches.len(), 2);
        assert!(matches!(cases[1].matches[0], CaseMatch::Range { .. }));
        assert!(matches!(
            cases[2].matches[0],
            CaseMatch::Comparison {
                op: CaseCompareOp::NotEqual,
                ..
            }
        ));
        assert!(case_else.is_some());
    }

    #[test]
    fn test_for_on_one_line() {
        let body = main_body("FOR I=1 TO 3: PRINT I: NEXT I");
        let StatementKind::For {
            variable,
            body: loop_body,
            next_variable,
            step,
            ..
        } = &body[0].kind
        else {
            panic!("expected FOR");
        };
        assert_eq!(variable, "I");
        assert_eq!(loop_body.len(), 1);
        assert!(step.is_none());
        assert_eq!(
            next_variable.as_ref().map(|(name, _)| name.as_str()),
            Some("I")
        );
    }

    #[test]
    fn test_missing_next() {
        let errors = parse_errors("FOR i = 1 TO 3\nPRINT i\n");
        assert!(matches!(errors[0], ParseError::MissingNext { .. }));
    }

    #[test]
    fn test_do_loop_variants() {
        let body = main_body("DO WHILE x < 3\nx = x + 1\nLOOP\nDO\nx = x - 1\nLOOP UNTIL x = 0\n");
        assert!(matches!(
            &body[0].kind,
            StatementKind::DoLoop {
                pre_condition: Some(DoCondition { is_while: true, .. }),
                post_condition: None,
                ..
            }
        ));
        assert!(matches!(
            &body[1].kind,
            StatementKind::DoLoop {
                pre_condition: None,
                post_condition: Some(DoCondition { is_while: false, .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_while_wend() {
        let body = main_body("WHILE x > 0\n  x = x - 1\nWEND");
        assert!(matches!(&body[0].kind, StatementKind::While { body, .. } if body.len() == 1));
    }

    #[test]
    fn test_errors_in_block_are_all_reported() {
        let errors = parse_errors("WHILE 1\n  x = )\n  y = )\nWEND\n");
        assert_eq!(errors.len(), 2);
    }
}
