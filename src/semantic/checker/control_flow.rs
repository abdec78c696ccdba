//! Control flow statement checking.
//!
//! IF, SELECT CASE, FOR/NEXT, WHILE/WEND, DO/LOOP, and GOTO/GOSUB targets.

use crate::ast::{BinaryOp, CaseClause, CaseMatch, DoCondition, Expr, Locus, Statement};
use crate::semantic::error::SemanticError;
use crate::semantic::symbols::SymbolKind;
use crate::types::{Type, binary_result};

use super::{ForLoopInfo, LoopKind, TypeChecker};

impl<'a> TypeChecker<'a> {
    /// Conditions are numeric: zero is false, anything else true.
    pub(crate) fn check_condition(&mut self, condition: &mut Expr) {
        let ty = self.check_expr(condition);
        if !ty.is_numeric() && ty != Type::Any {
            self.errors.push(SemanticError::ConditionNotNumeric {
                found: ty.name(),
                locus: condition.locus,
            });
        }
    }

    pub(crate) fn check_if(
        &mut self,
        condition: &mut Expr,
        then_branch: &mut [Statement],
        elseif_branches: &mut [(Expr, Vec<Statement>)],
        else_branch: Option<&mut [Statement]>,
    ) {
        self.check_condition(condition);
        self.check_nested(then_branch);
        for (condition, body) in elseif_branches {
            self.check_condition(condition);
            self.check_nested(body);
        }
        if let Some(else_branch) = else_branch {
            self.check_nested(else_branch);
        }
    }

    /// Every CASE value must compare against the tested expression.
    pub(crate) fn check_select(
        &mut self,
        test_expr: &mut Expr,
        cases: &mut [CaseClause],
        case_else: Option<&mut [Statement]>,
    ) {
        let test_ty = self.check_expr(test_expr);
        for case in cases.iter_mut() {
            for case_match in case.matches.iter_mut() {
                match case_match {
                    CaseMatch::Single(value) | CaseMatch::Comparison { value, .. } => {
                        self.check_case_value(&test_ty, value);
                    }
                    CaseMatch::Range { from, to } => {
                        self.check_case_value(&test_ty, from);
                        self.check_case_value(&test_ty, to);
                    }
                }
            }
            self.check_nested(&mut case.body);
        }
        if let Some(case_else) = case_else {
            self.check_nested(case_else);
        }
    }

    fn check_case_value(&mut self, test_ty: &Type, value: &mut Expr) {
        let ty = self.check_expr(value);
        if binary_result(BinaryOp::Equal, test_ty, &ty).is_none() {
            self.errors
                .push(SemanticError::type_mismatch(test_ty.name(), ty.name(), value.locus));
        }
    }

    /// FOR needs a numeric, assignable counter and numeric bounds.
    pub(crate) fn check_for(&mut self, info: ForLoopInfo<'_>) {
        let counter_ty = match self.symbols.lookup(info.variable) {
            Some(symbol) if symbol.kind == SymbolKind::Constant => {
                self.errors.push(SemanticError::AssignmentToConst {
                    name: info.variable.to_string(),
                    locus: info.locus,
                });
                Type::Any
            }
            _ => self.resolve_variable(info.variable, info.locus),
        };
        if !counter_ty.is_numeric() && counter_ty != Type::Any {
            self.errors
                .push(SemanticError::type_mismatch("numeric", counter_ty.name(), info.locus));
        }

        self.expect_numeric(info.start);
        self.expect_numeric(info.end);
        if let Some(step) = info.step {
            self.expect_numeric(step);
        }

        self.loops.push(LoopKind::For);
        self.check_nested(info.body);
        self.loops.pop();

        if let Some((next, next_locus)) = info.next_variable
            && next != info.variable
        {
            self.errors.push(SemanticError::ForNextMismatch {
                expected: info.variable.to_string(),
                found: next.clone(),
                locus: *next_locus,
            });
        }
    }

    pub(crate) fn check_while(&mut self, condition: &mut Expr, body: &mut [Statement]) {
        self.check_condition(condition);
        self.loops.push(LoopKind::While);
        self.check_nested(body);
        self.loops.pop();
    }

    pub(crate) fn check_do(
        &mut self,
        pre_condition: Option<&mut DoCondition>,
        body: &mut [Statement],
        post_condition: Option<&mut DoCondition>,
    ) {
        if let Some(pre) = pre_condition {
            self.check_condition(&mut pre.condition);
        }
        self.loops.push(LoopKind::Do);
        self.check_nested(body);
        self.loops.pop();
        if let Some(post) = post_condition {
            self.check_condition(&mut post.condition);
        }
    }

    /// GOTO/GOSUB targets must exist and live in the current routine.
    pub(crate) fn check_jump(&mut self, target: &str, locus: Locus) {
        match self.symbols.lookup_label(target) {
            None => self.errors.push(SemanticError::UndefinedLabel {
                name: target.to_string(),
                locus,
            }),
            Some(label) if label.routine != self.routine => {
                self.errors.push(SemanticError::LabelOutOfScope {
                    name: target.to_string(),
                    locus,
                })
            }
            Some(_) => {}
        }
    }
}
