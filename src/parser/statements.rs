//! Statement parsing for the parser.
//!
//! This module contains the main statement dispatcher and parsing for
//! simple statements like PRINT, LET, DIM, CONST, GOTO, INPUT, etc.
//!
//! More complex statements (control flow, procedures) are handled in their
//! respective modules.

use crate::ast::{
    ArrayDimension, DataValue, Expr, ExprKind, ExitType, FileMode, Literal, PrintItem,
    PrintSeparator, Statement, StatementKind, TypeSpec, VarDecl,
};
use crate::lexer::{Token, TokenKind};

use super::expressions::unquote;
use super::{ParseError, Parser};

impl<'a> Parser<'a> {
    // ==================== Statement Dispatcher ====================

    /// Parses a single statement.
    pub(super) fn parse_statement(&mut self) -> Result<Statement, ()> {
        let Some(token) = self.peek() else {
            self.error_here("statement");
            return Err(());
        };

        match &token.kind {
            // I/O statements
            TokenKind::Print => self.parse_print(),
            TokenKind::Input => self.parse_input(),
            TokenKind::Line => self.parse_line_input(),
            TokenKind::Open => self.parse_open(),
            TokenKind::Close => self.parse_close(),
            TokenKind::Write => self.parse_write(),

            // Variable statements
            TokenKind::Let => self.parse_let_explicit(),
            TokenKind::Dim => self.parse_dim(),
            TokenKind::Redim => self.parse_redim(),
            TokenKind::Const => self.parse_const(),
            TokenKind::DefInt
            | TokenKind::DefLng
            | TokenKind::DefSng
            | TokenKind::DefDbl
            | TokenKind::DefStr => self.parse_deftype(),

            // Control flow (delegated to control_flow.rs)
            TokenKind::If => self.parse_if(),
            TokenKind::Select => self.parse_select_case(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_loop(),
            TokenKind::Goto => self.parse_goto(),
            TokenKind::Gosub => self.parse_gosub(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Exit => self.parse_exit(),
            TokenKind::End => self.parse_end(),
            TokenKind::On => self.parse_on_event(),

            // DATA statements
            TokenKind::Data => self.parse_data(),
            TokenKind::Read => self.parse_read(),
            TokenKind::Restore => self.parse_restore(),

            // Declarations (delegated to procedures.rs)
            TokenKind::Type => self.parse_type_definition(),
            TokenKind::Declare => self.parse_declare(),
            TokenKind::Call => self.parse_call(),
            TokenKind::Sub | TokenKind::Function => {
                self.errors.push(ParseError::syntax(
                    format!("{} definitions are only allowed at module level", token.text.to_ascii_uppercase()),
                    token.locus,
                ));
                Err(())
            }

            // Other
            TokenKind::Comment | TokenKind::RemComment => self.parse_comment(),
            TokenKind::IntegerLiteral if self.at_line_start() => self.parse_line_number(),
            TokenKind::Identifier => self.parse_identifier_statement(),
            kind if kind.is_builtin_statement() => self.parse_builtin_statement(),

            _ => {
                self.errors.push(ParseError::syntax(
                    format!("unexpected {} at start of statement", token.kind),
                    token.locus,
                ));
                Err(())
            }
        }
    }

    // ==================== PRINT Statement ====================

    /// Parses `PRINT [#n,] [USING fmt;] items`.
    pub(super) fn parse_print(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume PRINT

        let file = if self.match_token(&TokenKind::Hash) {
            let file = self.parse_expression()?;
            self.expect(&TokenKind::Comma, ", after file number")?;
            Some(file)
        } else {
            None
        };

        let using = if self.match_token(&TokenKind::Using) {
            let format = self.parse_expression()?;
            self.expect(&TokenKind::Semicolon, "; after USING format")?;
            Some(format)
        } else {
            None
        };

        let mut items: Vec<PrintItem> = Vec::new();
        while !self.at_statement_end() {
            if self.match_token(&TokenKind::Semicolon) {
                if let Some(last) = items.last_mut()
                    && last.separator.is_none()
                {
                    last.separator = Some(PrintSeparator::Semicolon);
                }
                continue;
            }

            if let Some(comma) = self.peek()
                && comma.kind == TokenKind::Comma
            {
                self.advance();
                match items.last_mut() {
                    Some(last) if last.separator.is_none() => {
                        last.separator = Some(PrintSeparator::Comma);
                    }
                    // A leading or doubled comma skips a whole zone
                    _ => items.push(PrintItem {
                        expr: Expr::new(ExprKind::Literal(Literal::String(String::new())), comma.locus),
                        separator: Some(PrintSeparator::Comma),
                    }),
                }
                continue;
            }

            let expr = self.parse_expression()?;
            items.push(PrintItem {
                expr,
                separator: None,
            });
        }

        // Trailing separator suppresses the newline
        let newline = items.last().is_none_or(|item| item.separator.is_none());

        Ok(Statement::new(
            StatementKind::Print {
                file,
                using,
                items,
                newline,
            },
            locus,
        ))
    }

    // ==================== Assignment / Calls ====================

    /// Parses `LET target = value`.
    fn parse_let_explicit(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume LET
        let target = self.parse_reference()?;
        self.expect(&TokenKind::Equals, "= in assignment")?;
        let value = self.parse_expression()?;
        Ok(Statement::new(StatementKind::Assign { target, value }, locus))
    }

    /// Parses a statement that starts with an identifier.
    ///
    /// `name:` at the start of a line is a label, `ref = value` an
    /// assignment, and anything else a bare SUB call `name arg, arg`.
    pub(super) fn parse_identifier_statement(&mut self) -> Result<Statement, ()> {
        let token = self.peek().ok_or(())?;
        let locus = token.locus;

        if self.at_line_start() && self.peek_ahead(1).is_some_and(|t| t.kind == TokenKind::Colon) {
            self.advance();
            self.advance();
            return Ok(Statement::new(
                StatementKind::Label {
                    name: token.text.to_ascii_uppercase(),
                },
                locus,
            ));
        }

        let target = self.parse_reference()?;
        if self.match_token(&TokenKind::Equals) {
            let value = self.parse_expression()?;
            return Ok(Statement::new(StatementKind::Assign { target, value }, locus));
        }

        match target.kind {
            ExprKind::Variable(name) => {
                let args = self.parse_call_args()?;
                Ok(Statement::new(StatementKind::Call { name, args }, locus))
            }
            // `Foo (a), b` passes the parenthesized list first
            ExprKind::Deref { name, mut args, .. } => {
                while self.match_token(&TokenKind::Comma) {
                    args.push(self.parse_expression()?);
                }
                if !self.at_statement_end() {
                    self.error_here("end of statement");
                    return Err(());
                }
                Ok(Statement::new(StatementKind::Call { name, args }, locus))
            }
            _ => {
                self.error_here("= in assignment");
                Err(())
            }
        }
    }

    /// Parses comma-separated arguments up to the end of the statement.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ()> {
        let mut args = Vec::new();
        if self.at_statement_end() {
            return Ok(args);
        }
        args.push(self.parse_expression()?);
        while self.match_token(&TokenKind::Comma) {
            args.push(self.parse_expression()?);
        }
        if !self.at_statement_end() {
            self.error_here("end of statement");
            return Err(());
        }
        Ok(args)
    }

    /// Parses `CALL name[(args)]`.
    pub(super) fn parse_call(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume CALL
        let (name, _) = self.expect_identifier("SUB name")?;
        let args = if self.match_token(&TokenKind::LeftParen) {
            let args = self.parse_argument_list()?;
            self.expect(&TokenKind::RightParen, ")")?;
            args
        } else {
            self.parse_call_args()?
        };
        Ok(Statement::new(StatementKind::Call { name, args }, locus))
    }

    /// Parses a builtin statement keyword (`CLS`, `LOCATE r, c`, `SWAP a, b`...)
    /// into a call of the builtin of the same name.
    fn parse_builtin_statement(&mut self) -> Result<Statement, ()> {
        let token = self.advance().ok_or(())?;
        let args = self.parse_call_args()?;
        Ok(Statement::new(
            StatementKind::Call {
                name: token.text.to_ascii_uppercase(),
                args,
            },
            token.locus,
        ))
    }

    // ==================== DIM / REDIM / CONST ====================

    /// Parses `DIM [SHARED] decl, decl...`.
    pub(super) fn parse_dim(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume DIM
        let shared = self.match_token(&TokenKind::Shared);
        let decls = self.parse_var_decls()?;
        Ok(Statement::new(StatementKind::Dim { shared, decls }, locus))
    }

    /// Parses `REDIM [PRESERVE] decl, decl...`.
    fn parse_redim(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume REDIM
        let preserve = self.match_token(&TokenKind::Preserve);
        let decls = self.parse_var_decls()?;
        Ok(Statement::new(StatementKind::Redim { preserve, decls }, locus))
    }

    fn parse_var_decls(&mut self) -> Result<Vec<VarDecl>, ()> {
        let mut decls = vec![self.parse_var_decl()?];
        while self.match_token(&TokenKind::Comma) {
            decls.push(self.parse_var_decl()?);
        }
        Ok(decls)
    }

    /// Parses `name[(dims)] [AS type]`.
    fn parse_var_decl(&mut self) -> Result<VarDecl, ()> {
        let (name, locus) = self.expect_identifier("variable name")?;

        let mut is_array = false;
        let mut dims = Vec::new();
        if self.match_token(&TokenKind::LeftParen) {
            is_array = true;
            if !self.check(&TokenKind::RightParen) {
                dims = self.parse_array_dimensions()?;
            }
            self.expect(&TokenKind::RightParen, ")")?;
        }

        let type_spec = if self.match_token(&TokenKind::As) {
            Some(self.parse_type_spec()?)
        } else {
            None
        };

        Ok(VarDecl {
            name,
            dims,
            is_array,
            type_spec,
            locus,
        })
    }

    /// Parses `[lower TO] upper, ...`.
    fn parse_array_dimensions(&mut self) -> Result<Vec<ArrayDimension>, ()> {
        let mut dims = Vec::new();
        loop {
            let first = self.parse_expression()?;
            let dim = if self.match_token(&TokenKind::To) {
                ArrayDimension {
                    lower: Some(first),
                    upper: self.parse_expression()?,
                }
            } else {
                ArrayDimension {
                    lower: None,
                    upper: first,
                }
            };
            dims.push(dim);

            if !self.match_token(&TokenKind::Comma) {
                return Ok(dims);
            }
        }
    }

    /// Parses `CONST name = value`.
    pub(super) fn parse_const(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume CONST
        let (name, _) = self.expect_identifier("constant name")?;
        self.expect(&TokenKind::Equals, "=")?;
        let value = self.parse_expression()?;
        Ok(Statement::new(StatementKind::Const { name, value }, locus))
    }

    /// Parses `DEFINT A-C, X` and friends.
    fn parse_deftype(&mut self) -> Result<Statement, ()> {
        let token = self.advance().ok_or(())?;
        let type_spec = match token.kind {
            TokenKind::DefInt => TypeSpec::Integer,
            TokenKind::DefLng => TypeSpec::Long,
            TokenKind::DefSng => TypeSpec::Single,
            TokenKind::DefDbl => TypeSpec::Double,
            _ => TypeSpec::String,
        };

        let mut ranges = Vec::new();
        loop {
            let from = self.expect_letter()?;
            let to = if self.match_token(&TokenKind::Minus) {
                self.expect_letter()?
            } else {
                from
            };
            if from > to {
                self.errors.push(ParseError::syntax(
                    format!("invalid letter range {}-{}", from, to),
                    token.locus,
                ));
                return Err(());
            }
            ranges.push((from, to));

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(Statement::new(
            StatementKind::DefType { type_spec, ranges },
            token.locus,
        ))
    }

    /// Expects a single-letter identifier and returns it upper-cased.
    fn expect_letter(&mut self) -> Result<char, ()> {
        let (name, locus) = self.expect_identifier("letter")?;
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Ok(c),
            _ => {
                self.errors
                    .push(ParseError::syntax(format!("expected a letter, found {}", name), locus));
                Err(())
            }
        }
    }

    // ==================== INPUT ====================

    /// Parses `INPUT [;] ["prompt" {;|,}] targets` and `INPUT #n, targets`.
    pub(super) fn parse_input(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume INPUT

        if self.match_token(&TokenKind::Hash) {
            let file_num = self.parse_expression()?;
            self.expect(&TokenKind::Comma, ", after file number")?;
            let targets = self.parse_targets()?;
            return Ok(Statement::new(
                StatementKind::FileInput {
                    file_num,
                    targets,
                    line: false,
                },
                locus,
            ));
        }

        // INPUT; keeps the cursor on the line; the console decides that.
        self.match_token(&TokenKind::Semicolon);

        let (prompt, question) = match self.peek() {
            Some(token) if token.kind == TokenKind::StringLiteral => {
                self.advance();
                let question = if self.match_token(&TokenKind::Semicolon) {
                    true
                } else if self.match_token(&TokenKind::Comma) {
                    false
                } else {
                    self.error_here("; or , after INPUT prompt");
                    return Err(());
                };
                (Some(unquote(&token.text)), question)
            }
            _ => (None, true),
        };

        let targets = self.parse_targets()?;
        Ok(Statement::new(
            StatementKind::Input {
                prompt,
                question,
                targets,
            },
            locus,
        ))
    }

    /// Parses `LINE INPUT ["prompt";] target$` and `LINE INPUT #n, target$`.
    fn parse_line_input(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume LINE
        self.expect(&TokenKind::Input, "INPUT after LINE")?;

        if self.match_token(&TokenKind::Hash) {
            let file_num = self.parse_expression()?;
            self.expect(&TokenKind::Comma, ", after file number")?;
            let target = self.parse_reference()?;
            return Ok(Statement::new(
                StatementKind::FileInput {
                    file_num,
                    targets: vec![target],
                    line: true,
                },
                locus,
            ));
        }

        self.match_token(&TokenKind::Semicolon);
        let prompt = match self.peek() {
            Some(token) if token.kind == TokenKind::StringLiteral => {
                self.advance();
                if !self.match_token(&TokenKind::Semicolon) {
                    self.expect(&TokenKind::Comma, "; or , after LINE INPUT prompt")?;
                }
                Some(unquote(&token.text))
            }
            _ => None,
        };

        let target = self.parse_reference()?;
        Ok(Statement::new(
            StatementKind::LineInput { prompt, target },
            locus,
        ))
    }

    /// Parses a comma-separated list of lvalue references.
    fn parse_targets(&mut self) -> Result<Vec<Expr>, ()> {
        let mut targets = vec![self.parse_reference()?];
        while self.match_token(&TokenKind::Comma) {
            targets.push(self.parse_reference()?);
        }
        Ok(targets)
    }

    // ==================== Files ====================

    /// Parses `OPEN path FOR mode AS [#]n`.
    fn parse_open(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume OPEN
        let path = self.parse_expression()?;
        self.expect(&TokenKind::For, "FOR")?;

        let mode = match self.peek_kind() {
            Some(TokenKind::Input) => FileMode::Input,
            Some(TokenKind::Output) => FileMode::Output,
            Some(TokenKind::Append) => FileMode::Append,
            _ => {
                self.error_here("INPUT, OUTPUT or APPEND");
                return Err(());
            }
        };
        self.advance();

        self.expect(&TokenKind::As, "AS")?;
        self.match_token(&TokenKind::Hash);
        let file_num = self.parse_expression()?;

        Ok(Statement::new(
            StatementKind::Open {
                path,
                mode,
                file_num,
            },
            locus,
        ))
    }

    /// Parses `CLOSE [[#]n, ...]`.
    fn parse_close(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume CLOSE
        let mut file_nums = Vec::new();
        if !self.at_statement_end() {
            loop {
                self.match_token(&TokenKind::Hash);
                file_nums.push(self.parse_expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(Statement::new(StatementKind::Close { file_nums }, locus))
    }

    /// Parses `WRITE [#n,] values`.
    fn parse_write(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume WRITE
        let file = if self.match_token(&TokenKind::Hash) {
            let file = self.parse_expression()?;
            self.expect(&TokenKind::Comma, ", after file number")?;
            Some(file)
        } else {
            None
        };
        let values = self.parse_call_args()?;
        Ok(Statement::new(StatementKind::Write { file, values }, locus))
    }

    // ==================== Jumps ====================

    /// Parses a label reference: a name or a line number.
    fn parse_label_ref(&mut self) -> Result<String, ()> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                self.advance();
                Ok(token.text.to_ascii_uppercase())
            }
            Some(token) if token.kind == TokenKind::IntegerLiteral => {
                self.advance();
                Ok(token.text.clone())
            }
            _ => {
                self.error_here("label or line number");
                Err(())
            }
        }
    }

    /// Parses a line number at the start of a line as a label.
    fn parse_line_number(&mut self) -> Result<Statement, ()> {
        let token = self.advance().ok_or(())?;
        self.match_token(&TokenKind::Colon);
        Ok(Statement::new(
            StatementKind::Label {
                name: token.text.clone(),
            },
            token.locus,
        ))
    }

    /// Parses `GOTO label`.
    pub(super) fn parse_goto(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume GOTO
        let target = self.parse_label_ref()?;
        Ok(Statement::new(StatementKind::Goto { target }, locus))
    }

    /// Parses `GOSUB label`.
    pub(super) fn parse_gosub(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume GOSUB
        let target = self.parse_label_ref()?;
        Ok(Statement::new(StatementKind::Gosub { target }, locus))
    }

    pub(super) fn parse_return(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume RETURN
        Ok(Statement::new(StatementKind::Return, locus))
    }

    /// Parses `EXIT FOR|WHILE|DO|SUB|FUNCTION`.
    pub(super) fn parse_exit(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume EXIT
        let exit_type = match self.peek_kind() {
            Some(TokenKind::For) => ExitType::For,
            Some(TokenKind::While) => ExitType::While,
            Some(TokenKind::Do) => ExitType::Do,
            Some(TokenKind::Sub) => ExitType::Sub,
            Some(TokenKind::Function) => ExitType::Function,
            _ => {
                self.error_here("FOR, WHILE, DO, SUB or FUNCTION after EXIT");
                return Err(());
            }
        };
        self.advance();
        Ok(Statement::new(StatementKind::Exit { exit_type }, locus))
    }

    /// Parses `END`. Block terminators met here have no open block.
    pub(super) fn parse_end(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume END
        if let Some(token) = self.peek()
            && matches!(
                token.kind,
                TokenKind::If
                    | TokenKind::Select
                    | TokenKind::Sub
                    | TokenKind::Function
                    | TokenKind::Type
            )
        {
            self.errors.push(ParseError::syntax(
                format!("END {} without matching block", token.text.to_ascii_uppercase()),
                locus,
            ));
            return Err(());
        }
        Ok(Statement::new(StatementKind::End, locus))
    }

    /// Parses `ON EVENT key GOSUB label`.
    fn parse_on_event(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume ON
        self.expect(&TokenKind::Event, "EVENT after ON")?;
        let key = self.parse_expression()?;
        self.expect(&TokenKind::Gosub, "GOSUB")?;
        let target = self.parse_label_ref()?;
        Ok(Statement::new(StatementKind::OnEvent { key, target }, locus))
    }

    // ==================== DATA / READ / RESTORE ====================

    /// Parses `DATA value, value...`.
    pub(super) fn parse_data(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume DATA
        let mut values = vec![self.parse_data_value()];
        while self.match_token(&TokenKind::Comma) {
            values.push(self.parse_data_value());
        }
        Ok(Statement::new(StatementKind::Data { values }, locus))
    }

    /// Parses one DATA item: a quoted string, a signed number, or bare text.
    fn parse_data_value(&mut self) -> DataValue {
        let start = self.current;
        while !self.is_at_end()
            && !self.check_any(&[
                TokenKind::Comma,
                TokenKind::Newline,
                TokenKind::Colon,
                TokenKind::Comment,
                TokenKind::RemComment,
            ])
        {
            self.advance();
        }
        data_value(&self.tokens[start..self.current])
    }

    /// Parses `READ target, target...`.
    pub(super) fn parse_read(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume READ
        let targets = self.parse_targets()?;
        Ok(Statement::new(StatementKind::Read { targets }, locus))
    }

    /// Parses `RESTORE [label]`.
    pub(super) fn parse_restore(&mut self) -> Result<Statement, ()> {
        let locus = self.advance().ok_or(())?.locus; // consume RESTORE
        let label = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_label_ref()?)
        };
        Ok(Statement::new(StatementKind::Restore { label }, locus))
    }

    pub(super) fn parse_comment(&mut self) -> Result<Statement, ()> {
        let token = self.advance().ok_or(())?;
        let text = match token.kind {
            TokenKind::RemComment => token.text.get(3..).unwrap_or_default(),
            _ => token.text.get(1..).unwrap_or_default(),
        };
        Ok(Statement::new(
            StatementKind::Comment(text.trim().to_string()),
            token.locus,
        ))
    }
}

/// Interprets the tokens of one DATA item.
fn data_value(tokens: &[Token]) -> DataValue {
    let (negative, rest) = match tokens {
        [sign, rest @ ..] if sign.kind == TokenKind::Minus => (true, rest),
        [sign, rest @ ..] if sign.kind == TokenKind::Plus => (false, rest),
        _ => (false, tokens),
    };

    if let [token] = rest {
        let number = match token.kind {
            TokenKind::StringLiteral if tokens.len() == 1 => {
                return DataValue::String(unquote(&token.text));
            }
            TokenKind::IntegerLiteral => token
                .text
                .trim_end_matches(['%', '&'])
                .parse::<i64>()
                .ok()
                .map(DataValue::Integer),
            TokenKind::HexLiteral | TokenKind::OctalLiteral | TokenKind::BinaryLiteral => {
                let radix = match token.kind {
                    TokenKind::HexLiteral => 16,
                    TokenKind::OctalLiteral => 8,
                    _ => 2,
                };
                token
                    .text
                    .get(2..)
                    .and_then(|digits| i64::from_str_radix(digits.trim_end_matches('&'), radix).ok())
                    .map(DataValue::Integer)
            }
            TokenKind::FloatLiteral => token
                .text
                .trim_end_matches(['!', '#'])
                .replace(['D', 'd'], "E")
                .parse::<f64>()
                .ok()
                .map(DataValue::Float),
            _ => None,
        };

        if let Some(value) = number {
            return match value {
                DataValue::Integer(n) if negative => DataValue::Integer(-n),
                DataValue::Float(n) if negative => DataValue::Float(-n),
                other => other,
            };
        }
    }

    let text: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    DataValue::String(text.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Locus, Program};
    use crate::lexer::lex;

    fn parse(source: &str) -> Program {
        let tokens = lex(source).unwrap();
        let mut parser = Parser::new(&tokens);
        parser.parse().unwrap()
    }

    fn first(source: &str) -> StatementKind {
        parse(source).routines[0].body[0].kind.clone()
    }

    #[test]
    fn test_print_separators() {
        let StatementKind::Print { items, newline, .. } = first("PRINT \"a\"; 1, 2;") else {
            panic!("expected PRINT");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].separator, Some(PrintSeparator::Semicolon));
        assert_eq!(items[1].separator, Some(PrintSeparator::Comma));
        assert!(!newline);
    }

    #[test]
    fn test_print_file_and_using() {
        let StatementKind::Print { file, using, items, newline } =
            first("PRINT #1, USING \"##.#\"; x")
        else {
            panic!("expected PRINT");
        };
        assert!(file.is_some());
        assert!(using.is_some());
        assert_eq!(items.len(), 1);
        assert!(newline);
    }

    #[test]
    fn test_label_and_line_number() {
        let body = parse("start:\n10 PRINT 1\nGOTO start\n").routines[0].body.clone();
        assert!(matches!(&body[0].kind, StatementKind::Label { name } if name == "START"));
        assert!(matches!(&body[1].kind, StatementKind::Label { name } if name == "10"));
        assert!(matches!(&body[2].kind, StatementKind::Print { .. }));
        assert!(matches!(&body[3].kind, StatementKind::Goto { target } if target == "START"));
    }

    #[test]
    fn test_bare_sub_call() {
        let StatementKind::Call { name, args } = first("Greet \"Bob\", 3") else {
            panic!("expected call");
        };
        assert_eq!(name, "GREET");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_call_statement_with_parens() {
        let StatementKind::Call { name, args } = first("CALL Move(1, 2)") else {
            panic!("expected call");
        };
        assert_eq!(name, "MOVE");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_builtin_statement() {
        let StatementKind::Call { name, args } = first("LOCATE 3, 4") else {
            panic!("expected call");
        };
        assert_eq!(name, "LOCATE");
        assert_eq!(args.len(), 2);
        assert!(matches!(first("CLS"), StatementKind::Call { name, .. } if name == "CLS"));
    }

    #[test]
    fn test_dim_forms() {
        let StatementKind::Dim { shared, decls } =
            first("DIM SHARED a(1 TO 3, 5) AS INTEGER, b$, c() AS DOUBLE")
        else {
            panic!("expected DIM");
        };
        assert!(shared);
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].dims.len(), 2);
        assert!(decls[0].dims[0].lower.is_some());
        assert!(decls[0].dims[1].lower.is_none());
        assert_eq!(decls[0].type_spec, Some(TypeSpec::Integer));
        assert!(!decls[1].is_array);
        assert!(decls[2].is_array && decls[2].dims.is_empty());
    }

    #[test]
    fn test_redim_preserve() {
        assert!(matches!(
            first("REDIM PRESERVE a(20)"),
            StatementKind::Redim { preserve: true, .. }
        ));
    }

    #[test]
    fn test_input_prompts() {
        assert!(matches!(
            first("INPUT \"Enter name\"; name$"),
            StatementKind::Input { prompt: Some(_), question: true, .. }
        ));
        assert!(matches!(
            first("INPUT \"Enter name\", name$"),
            StatementKind::Input { prompt: Some(_), question: false, .. }
        ));
        assert!(matches!(
            first("INPUT a, b"),
            StatementKind::Input { prompt: None, targets, .. } if targets.len() == 2
        ));
        assert!(matches!(
            first("LINE INPUT #2, l$"),
            StatementKind::FileInput { line: true, .. }
        ));
    }

    #[test]
    fn test_input_prompt_missing_separator() {
        let tokens = lex("INPUT \"Enter name\" name$").unwrap();
        assert!(Parser::new(&tokens).parse().is_err());
    }

    #[test]
    fn test_open_close_write() {
        assert!(matches!(
            first("OPEN \"out.txt\" FOR APPEND AS #2"),
            StatementKind::Open { mode: FileMode::Append, .. }
        ));
        assert!(matches!(
            first("CLOSE #1, #2"),
            StatementKind::Close { file_nums } if file_nums.len() == 2
        ));
        assert!(matches!(
            first("CLOSE"),
            StatementKind::Close { file_nums } if file_nums.is_empty()
        ));
        assert!(matches!(
            first("WRITE #1, a, \"b\""),
            StatementKind::Write { file: Some(_), values } if values.len() == 2
        ));
    }

    #[test]
    fn test_data_values() {
        let StatementKind::Data { values } = first("DATA 1, -2.5, \"x,y\", hello world, &H10") else {
            panic!("expected DATA");
        };
        assert_eq!(
            values,
            vec![
                DataValue::Integer(1),
                DataValue::Float(-2.5),
                DataValue::String("x,y".to_string()),
                DataValue::String("hello world".to_string()),
                DataValue::Integer(16),
            ]
        );
    }

    #[test]
    fn test_deftype_ranges() {
        let StatementKind::DefType { type_spec, ranges } = first("DEFINT A-C, X") else {
            panic!("expected DEFINT");
        };
        assert_eq!(type_spec, TypeSpec::Integer);
        assert_eq!(ranges, vec![('A', 'C'), ('X', 'X')]);
    }

    #[test]
    fn test_on_event() {
        assert!(matches!(
            first("ON EVENT \"key\" GOSUB handler"),
            StatementKind::OnEvent { target, .. } if target == "HANDLER"
        ));
    }

    #[test]
    fn test_statement_locus() {
        let program = parse("\n  x = 1");
        assert_eq!(program.routines[0].body[0].locus, Locus::new(2, 3));
    }

    #[test]
    fn test_comment_statement() {
        assert!(matches!(first("REM hello"), StatementKind::Comment(text) if text == "hello"));
        assert!(matches!(first("' note"), StatementKind::Comment(text) if text == "note"));
    }
}
