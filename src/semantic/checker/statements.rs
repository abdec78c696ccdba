//! Statement type checking.
//!
//! This module contains the statement dispatcher plus the I/O statements
//! (PRINT, INPUT, files, DATA/READ) and SUB calls.

use crate::ast::{Expr, Locus, PrintItem, RoutineKind, Statement, StatementKind};
use crate::semantic::error::SemanticError;
use crate::types::Type;

use super::{ForLoopInfo, TypeChecker};

impl<'a> TypeChecker<'a> {
    /// Type checks a single statement.
    pub fn check_statement(&mut self, stmt: &mut Statement) {
        let locus = stmt.locus;
        match &mut stmt.kind {
            StatementKind::Print {
                file, using, items, ..
            } => self.check_print(file.as_mut(), using.as_mut(), items),

            StatementKind::Assign { target, value } => self.check_assign(target, value),

            StatementKind::Dim { shared, decls } => self.check_dim(*shared, decls, locus),
            StatementKind::Redim { decls, .. } => self.check_redim(decls),
            StatementKind::Const { name, value } => {
                let name = name.clone();
                self.check_const(&name, value, locus)
            }

            StatementKind::If {
                condition,
                then_branch,
                elseif_branches,
                else_branch,
            } => self.check_if(condition, then_branch, elseif_branches, else_branch.as_deref_mut()),
            StatementKind::SelectCase {
                test_expr,
                cases,
                case_else,
            } => self.check_select(test_expr, cases, case_else.as_deref_mut()),
            StatementKind::For {
                variable,
                start,
                end,
                step,
                body,
                next_variable,
            } => self.check_for(ForLoopInfo {
                variable: variable.as_str(),
                start,
                end,
                step: step.as_mut(),
                body,
                next_variable: next_variable.as_ref(),
                locus,
            }),
            StatementKind::While { condition, body } => self.check_while(condition, body),
            StatementKind::DoLoop {
                pre_condition,
                body,
                post_condition,
            } => self.check_do(pre_condition.as_mut(), body, post_condition.as_mut()),

            StatementKind::Goto { target } | StatementKind::Gosub { target } => {
                let target = target.clone();
                self.check_jump(&target, locus)
            }
            StatementKind::Exit { exit_type } => {
                if !self.exit_allowed(*exit_type) {
                    self.errors.push(SemanticError::ExitOutsideLoop {
                        exit_type: exit_type.to_string(),
                        locus,
                    });
                }
            }
            StatementKind::OnEvent { key, target } => {
                self.expect_string(key);
                let target = target.clone();
                self.check_jump(&target, locus)
            }
            StatementKind::Restore { label: Some(label) } => {
                if self.symbols.lookup_label(label).is_none() {
                    self.errors.push(SemanticError::UndefinedLabel {
                        name: label.clone(),
                        locus,
                    });
                }
            }

            // Collected before the walk; only placement is checked here.
            StatementKind::Declare { .. } => self.module_level_only("DECLARE", locus),
            StatementKind::TypeDefinition { .. } => self.module_level_only("TYPE", locus),
            StatementKind::DefType { .. } => self.module_level_only("DEFtype", locus),

            StatementKind::Call { name, args } => {
                let name = name.clone();
                self.check_call_statement(&name, args, locus)
            }

            StatementKind::Input { targets, .. } | StatementKind::Read { targets } => {
                for target in targets {
                    self.check_scalar_target(target);
                }
            }
            StatementKind::LineInput { target, .. } => self.check_string_target(target),
            StatementKind::FileInput {
                file_num,
                targets,
                line,
            } => {
                self.expect_numeric(file_num);
                for target in targets {
                    if *line {
                        self.check_string_target(target);
                    } else {
                        self.check_scalar_target(target);
                    }
                }
            }
            StatementKind::Open { path, file_num, .. } => {
                self.expect_string(path);
                self.expect_numeric(file_num);
            }
            StatementKind::Close { file_nums } => {
                for file_num in file_nums {
                    self.expect_numeric(file_num);
                }
            }
            StatementKind::Write { file, values } => {
                if let Some(file) = file {
                    self.expect_numeric(file);
                }
                for value in values {
                    self.expect_printable(value);
                }
            }

            StatementKind::Restore { label: None }
            | StatementKind::Data { .. }
            | StatementKind::Label { .. }
            | StatementKind::Return
            | StatementKind::End
            | StatementKind::Comment(_) => {}
        }
    }

    fn module_level_only(&mut self, what: &str, locus: Locus) {
        if !self.at_module_level() {
            self.errors.push(SemanticError::ModuleLevelOnly {
                what: what.to_string(),
                locus,
            });
        }
    }

    // ==================== PRINT ====================

    fn check_print(&mut self, file: Option<&mut Expr>, using: Option<&mut Expr>, items: &mut [PrintItem]) {
        if let Some(file) = file {
            self.expect_numeric(file);
        }
        if let Some(using) = using {
            self.expect_string(using);
        }
        for item in items {
            self.expect_printable(&mut item.expr);
        }
    }

    // ==================== Calls ====================

    /// Checks `CALL name(args)` / `name args`.
    ///
    /// An unknown name yields exactly one diagnostic at the statement.
    pub(crate) fn check_call_statement(&mut self, name: &str, args: &mut [Expr], locus: Locus) {
        if let Some(entry) = self.symbols.lookup_procedure(name).cloned() {
            if entry.kind == RoutineKind::Function {
                self.check_args_only(args);
                self.errors.push(SemanticError::FunctionUsedAsSub {
                    name: name.to_string(),
                    locus,
                });
            } else if !entry.defined {
                self.check_args_only(args);
                self.errors.push(SemanticError::UndefinedProcedure {
                    name: name.to_string(),
                    locus,
                });
            } else {
                self.check_call_args(name, &entry.params, args, locus);
            }
            return;
        }

        if let Some(builtin) = self.registry.sub(name).cloned() {
            self.check_builtin_args(&builtin, args, locus);
            if builtin.by_ref {
                self.check_by_ref_args(args);
            }
            return;
        }

        self.check_args_only(args);
        if self.registry.function(name).is_some() {
            self.errors.push(SemanticError::FunctionUsedAsSub {
                name: name.to_string(),
                locus,
            });
        } else {
            self.errors.push(SemanticError::UndefinedProcedure {
                name: name.to_string(),
                locus,
            });
        }
    }

    /// Arguments passed by reference must be storage of one shared type.
    fn check_by_ref_args(&mut self, args: &[Expr]) {
        let Some(first) = args.first() else {
            return;
        };
        for arg in args {
            if !arg.is_lvalue() {
                self.errors
                    .push(SemanticError::NotAssignable { locus: arg.locus });
            } else if first.ty().name() != arg.ty().name()
                && !(first.ty().is_numeric() && arg.ty().is_numeric())
            {
                self.errors.push(SemanticError::type_mismatch(
                    first.ty().name(),
                    arg.ty().name(),
                    arg.locus,
                ));
            }
        }
    }

    // ==================== Helpers ====================

    pub(crate) fn expect_numeric(&mut self, expr: &mut Expr) {
        let ty = self.check_expr(expr);
        if !ty.is_numeric() && ty != Type::Any {
            self.errors
                .push(SemanticError::type_mismatch("numeric", ty.name(), expr.locus));
        }
    }

    pub(crate) fn expect_string(&mut self, expr: &mut Expr) {
        let ty = self.check_expr(expr);
        if !Type::String.is_compatible(&ty) {
            self.errors
                .push(SemanticError::type_mismatch("STRING", ty.name(), expr.locus));
        }
    }

    /// Anything PRINT and WRITE can render: no arrays or records.
    fn expect_printable(&mut self, expr: &mut Expr) {
        let ty = self.check_expr(expr);
        if matches!(ty, Type::Array { .. } | Type::User(_)) {
            self.errors.push(SemanticError::type_mismatch(
                "printable value",
                ty.name(),
                expr.locus,
            ));
        }
    }
}
