//! Procedure and type definition parsing.
//!
//! This module handles parsing of:
//! - SUB definitions (become routines of the program)
//! - FUNCTION definitions (become routines of the program)
//! - DECLARE forward declarations
//! - TYPE definitions (user-defined types)

use crate::ast::{Parameter, Routine, RoutineKind, Statement, StatementKind, TypeMember, TypeSpec};
use crate::lexer::TokenKind;

use super::{ParseError, Parser};

impl<'a> Parser<'a> {
    // ==================== SUB / FUNCTION ====================

    /// Parses a SUB or FUNCTION definition through its END line.
    ///
    /// A malformed header is reported and the body is still parsed, so the
    /// END SUB / END FUNCTION line does not cascade into more errors.
    pub(super) fn parse_routine(&mut self) -> Result<Routine, ()> {
        let token = self.advance().ok_or(())?; // consume SUB / FUNCTION
        let (kind, end_kind) = match token.kind {
            TokenKind::Function => (RoutineKind::Function, TokenKind::Function),
            _ => (RoutineKind::Sub, TokenKind::Sub),
        };
        let locus = token.locus;

        let header = self.parse_routine_header(kind);
        if header.is_err() {
            self.skip_line();
        }

        // STATIC is accepted and ignored; locals are always fresh per call
        if self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Identifier && t.text.eq_ignore_ascii_case("STATIC"))
        {
            self.advance();
        }

        let (body, terminated) = self.parse_block(|p| p.check_end(&end_kind));
        if !terminated {
            self.errors.push(match kind {
                RoutineKind::Function => ParseError::MissingEndFunction {
                    function_locus: locus,
                },
                _ => ParseError::MissingEndSub { sub_locus: locus },
            });
            return Err(());
        }
        self.advance(); // END
        self.advance(); // SUB / FUNCTION

        let (name, params, return_type) = header?;
        Ok(Routine {
            kind,
            name,
            params,
            return_type,
            body,
            locus,
        })
    }

    /// Parses `name [(params)] [AS type]`; `AS` only for functions.
    fn parse_routine_header(
        &mut self,
        kind: RoutineKind,
    ) -> Result<(String, Vec<Parameter>, Option<TypeSpec>), ()> {
        let (name, _) = self.expect_identifier(&format!("{} name", kind))?;

        let params = if self.match_token(&TokenKind::LeftParen) {
            let params = self.parse_parameter_list()?;
            self.expect(&TokenKind::RightParen, ")")?;
            params
        } else {
            Vec::new()
        };

        let return_type = if kind == RoutineKind::Function && self.match_token(&TokenKind::As) {
            Some(self.parse_type_spec()?)
        } else {
            None
        };

        Ok((name, params, return_type))
    }

    /// Skips the rest of the current line.
    fn skip_line(&mut self) {
        while !self.is_at_end() && !self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Parses `DECLARE SUB|FUNCTION name [(params)] [AS type]`.
    pub(super) fn parse_declare(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume DECLARE
        let kind = match self.peek_kind() {
            Some(TokenKind::Sub) => RoutineKind::Sub,
            Some(TokenKind::Function) => RoutineKind::Function,
            _ => {
                self.error_here("SUB or FUNCTION after DECLARE");
                return Err(());
            }
        };
        self.advance();

        let (name, params, return_type) = self.parse_routine_header(kind)?;
        Ok(Statement::new(
            StatementKind::Declare {
                kind,
                name,
                params,
                return_type,
            },
            locus,
        ))
    }

    // ==================== TYPE Definition ====================

    /// Parses a TYPE...END TYPE definition.
    ///
    /// ```basic
    /// TYPE Point
    ///     x AS INTEGER
    ///     y AS INTEGER
    /// END TYPE
    /// ```
    pub(super) fn parse_type_definition(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume TYPE
        let (name, _) = self.expect_identifier("type name")?;

        let mut members = Vec::new();
        loop {
            self.skip_trivia();
            if self.is_at_end() {
                self.errors.push(ParseError::MissingEndType { type_locus: locus });
                return Err(());
            }
            if self.check_end(&TokenKind::Type) {
                self.advance(); // END
                self.advance(); // TYPE
                break;
            }

            let (member, member_locus) = self.expect_identifier("member name")?;
            self.expect(&TokenKind::As, "AS")?;
            let type_spec = self.parse_type_spec()?;
            members.push(TypeMember {
                name: member,
                type_spec,
                locus: member_locus,
            });
        }

        Ok(Statement::new(
            StatementKind::TypeDefinition { name, members },
            locus,
        ))
    }

    // ==================== Parameters and Types ====================

    /// Parses a parameter list: `a, b AS STRING, arr() AS INTEGER`.
    pub(super) fn parse_parameter_list(&mut self) -> Result<Vec<Parameter>, ()> {
        let mut params = Vec::new();
        if self.check(&TokenKind::RightParen) {
            return Ok(params);
        }

        loop {
            let (name, locus) = self.expect_identifier("parameter name")?;
            let is_array = if self.match_token(&TokenKind::LeftParen) {
                self.expect(&TokenKind::RightParen, ")")?;
                true
            } else {
                false
            };
            let type_spec = if self.match_token(&TokenKind::As) {
                Some(self.parse_type_spec()?)
            } else {
                None
            };
            params.push(Parameter {
                name,
                type_spec,
                is_array,
                locus,
            });

            if !self.match_token(&TokenKind::Comma) {
                return Ok(params);
            }
        }
    }

    /// Parses a type name after AS.
    ///
    /// `STRING * n` is accepted; strings are always variable-length here.
    pub(super) fn parse_type_spec(&mut self) -> Result<TypeSpec, ()> {
        let Some(token) = self.peek() else {
            self.error_here("type name");
            return Err(());
        };

        let spec = match token.kind {
            TokenKind::Integer => TypeSpec::Integer,
            TokenKind::Long => TypeSpec::Long,
            TokenKind::Single => TypeSpec::Single,
            TokenKind::Double => TypeSpec::Double,
            TokenKind::String_ => TypeSpec::String,
            TokenKind::Json => TypeSpec::Json,
            TokenKind::Any => TypeSpec::Any,
            TokenKind::Identifier => TypeSpec::UserDefined(token.text.to_ascii_uppercase()),
            _ => {
                self.error_here("type name");
                return Err(());
            }
        };
        self.advance();

        if spec == TypeSpec::String && self.match_token(&TokenKind::Star) {
            self.expect(&TokenKind::IntegerLiteral, "string length")?;
        }
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;
    use crate::lexer::lex;

    fn parse(source: &str) -> Result<Program, Vec<ParseError>> {
        let tokens = lex(source).unwrap();
        Parser::new(&tokens).parse()
    }

    #[test]
    fn test_sub_with_params() {
        let program = parse("SUB Show (a AS INTEGER, items() AS STRING, b$)\nPRINT a\nEND SUB\n").unwrap();
        let sub = &program.routines[1];
        assert_eq!(sub.name, "SHOW");
        assert_eq!(sub.params.len(), 3);
        assert_eq!(sub.params[0].type_spec, Some(TypeSpec::Integer));
        assert!(sub.params[1].is_array);
        assert_eq!(sub.params[2].type_spec, None);
        assert_eq!(sub.body.len(), 1);
    }

    #[test]
    fn test_function_return_type() {
        let program = parse("FUNCTION Area (w, h) AS DOUBLE\nArea = w * h\nEND FUNCTION\n").unwrap();
        assert_eq!(program.routines[1].kind, RoutineKind::Function);
        assert_eq!(program.routines[1].return_type, Some(TypeSpec::Double));
    }

    #[test]
    fn test_missing_end_sub() {
        let errors = parse("SUB Foo\nPRINT 1\n").unwrap_err();
        assert!(matches!(errors[0], ParseError::MissingEndSub { .. }));
    }

    #[test]
    fn test_bad_header_reports_once() {
        let errors = parse("SUB Foo (1)\nPRINT 1\nEND SUB\nPRINT 2\n").unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_declare() {
        let program = parse("DECLARE FUNCTION Max% (a%, b%)\n").unwrap();
        assert!(matches!(
            &program.main().body[0].kind,
            StatementKind::Declare { kind: RoutineKind::Function, name, params, .. }
                if name == "MAX%" && params.len() == 2
        ));
    }

    #[test]
    fn test_type_definition() {
        let program =
            parse("TYPE Person\n  name AS STRING * 20\n  ' age in years\n  age AS INTEGER\nEND TYPE\n").unwrap();
        let StatementKind::TypeDefinition { name, members } = &program.main().body[0].kind else {
            panic!("expected TYPE");
        };
        assert_eq!(name, "PERSON");
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].type_spec, TypeSpec::String);
    }

    #[test]
    fn test_nested_sub_is_rejected() {
        assert!(parse("IF 1 THEN\nSUB Foo\nEND SUB\nEND IF\n").is_err());
    }
}
