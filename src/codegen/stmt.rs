//! Statement lowering.
//!
//! # Loop Handling
//!
//! Loops are tracked on a stack to support EXIT statements. Each FOR, WHILE
//! and DO loop mints an exit label that EXIT jumps to; EXIT SUB and EXIT
//! FUNCTION jump to the routine's own exit label instead.
//!
//! # Compiler temporaries
//!
//! FOR keeps its evaluated end and step, and SELECT CASE its test value, in
//! variables whose names start with `~`. BASIC names never do, so these
//! cannot collide with user variables.

use super::error::CodeGenError;
use super::instruction::{LabelId, Op, Target};
use super::state::{CodeGenState, LoopContext};
use crate::ast::{
    ArrayDimension, BinaryOp, CaseClause, CaseCompareOp, CaseMatch, DataValue, DoCondition, ExitType,
    Expr, Locus, PrintItem, PrintSeparator, Program, Routine, RoutineKind, Statement, StatementKind,
    TypeSpec, VarDecl,
};
use crate::builtins::Registry;
use crate::semantic::{SymbolTable, const_type};
use crate::semantic::checker::resolve_type_spec;
use crate::types::{Type, Value};

/// Walks the checked AST and appends instructions to a [`CodeGenState`].
pub(super) struct Emitter<'a> {
    pub(super) state: CodeGenState,
    pub(super) symbols: &'a SymbolTable,
    pub(super) registry: &'a Registry,
    /// Exit label of the SUB/FUNCTION being emitted.
    routine_exit: Option<LabelId>,
}

impl<'a> Emitter<'a> {
    pub fn new(symbols: &'a SymbolTable, registry: &'a Registry) -> Self {
        Self {
            state: CodeGenState::new(),
            symbols,
            registry,
            routine_exit: None,
        }
    }

    pub fn finish(self) -> CodeGenState {
        self.state
    }

    // ==================== Program layout ====================

    /// Main body, then every SUB and FUNCTION.
    pub fn emit_program(&mut self, program: &Program) -> Result<(), CodeGenError> {
        let main = program.main();

        // DEFtype applies to the whole module, wherever it appears.
        for stmt in &main.body {
            if let StatementKind::DefType { type_spec, ranges } = &stmt.kind {
                self.state.set_locus(stmt.locus);
                let ty = self.type_of_spec(type_spec, stmt.locus)?;
                for &(from, to) in ranges {
                    self.state.emit(Op::SetDefaultType {
                        from,
                        to,
                        ty: ty.clone(),
                    });
                }
            }
        }

        self.emit_block(&main.body)?;
        self.state.emit(Op::End);

        for routine in program.routines.iter().skip(1) {
            self.emit_routine(routine)?;
        }
        if program.routines.len() > 1 {
            // Landing pad for the last jump-over stub.
            self.state.emit(Op::End);
        }
        log::debug!(
            "codegen: {} instructions, {} DATA items before linking",
            self.state.instructions().len(),
            self.state.data().len()
        );
        Ok(())
    }

    fn emit_routine(&mut self, routine: &Routine) -> Result<(), CodeGenError> {
        let symbols = self.symbols;
        let entry_info = symbols
            .lookup_procedure(&routine.name)
            .ok_or_else(|| CodeGenError::unresolved(&routine.name).with_locus(routine.locus))?;

        self.state.set_locus(routine.locus);
        let skip = self.state.new_label();
        self.state.emit(Op::Jmp(Target::Label(skip)));

        let entry = self.state.routine_label(&routine.name);
        self.state.place(entry)?;
        // Arguments were pushed left to right.
        for param in entry_info.params.iter().rev() {
            self.state.emit(Op::PopParam {
                name: param.name.clone(),
                ty: param.ty.clone(),
            });
        }
        let is_function = routine.kind == RoutineKind::Function;
        if is_function {
            self.state.emit(Op::Dim {
                name: routine.name.clone(),
                ty: entry_info.return_type.clone().unwrap_or(Type::Any),
            });
        }

        let exit = self.state.new_label();
        self.routine_exit = Some(exit);
        self.emit_block(&routine.body)?;
        self.routine_exit = None;

        self.state.place(exit)?;
        if is_function {
            self.state.emit(Op::PushValue(routine.name.clone()));
        }
        self.state.emit(Op::Ret);
        self.state.place(skip)
    }

    pub fn emit_block(&mut self, statements: &[Statement]) -> Result<(), CodeGenError> {
        for stmt in statements {
            self.emit_statement(stmt)?;
        }
        Ok(())
    }

    // ==================== Statements ====================

    fn emit_statement(&mut self, stmt: &Statement) -> Result<(), CodeGenError> {
        self.state.set_locus(stmt.locus);
        match &stmt.kind {
            StatementKind::Print {
                file,
                using,
                items,
                newline,
            } => self.emit_print(file.as_ref(), using.as_ref(), items, *newline),

            StatementKind::Assign { target, value } => {
                self.emit_ref(target)?;
                self.emit_expr(value)?;
                self.state.emit(Op::Assign);
                Ok(())
            }

            StatementKind::Dim { decls, .. } => {
                for decl in decls {
                    self.emit_dim(decl)?;
                }
                Ok(())
            }

            StatementKind::Redim { preserve, decls } => {
                for decl in decls {
                    self.state.set_locus(decl.locus);
                    self.emit_bounds(&decl.dims)?;
                    self.state.emit(Op::Redim {
                        name: decl.name.clone(),
                        element: self.element_type(decl)?,
                        dims: decl.dims.len(),
                        preserve: *preserve,
                    });
                }
                Ok(())
            }

            StatementKind::Const { name, value } => {
                self.state.emit(Op::Dim {
                    name: name.clone(),
                    ty: const_type(name, value),
                });
                self.state.emit(Op::PushRef(name.clone()));
                self.emit_expr(value)?;
                self.state.emit(Op::Assign);
                Ok(())
            }

            StatementKind::If {
                condition,
                then_branch,
                elseif_branches,
                else_branch,
            } => self.emit_if(condition, then_branch, elseif_branches, else_branch.as_deref()),

            StatementKind::SelectCase {
                test_expr,
                cases,
                case_else,
            } => self.emit_select(test_expr, cases, case_else.as_deref()),

            StatementKind::For {
                variable,
                start,
                end,
                step,
                body,
                ..
            } => self.emit_for(variable, start, end, step.as_ref(), body),

            StatementKind::While { condition, body } => {
                let top = self.state.new_label();
                let exit = self.state.new_label();
                self.state.place(top)?;
                self.emit_expr(condition)?;
                self.state.emit(Op::Bz(Target::Label(exit)));
                self.emit_loop_body(ExitType::While, exit, body)?;
                self.state.emit(Op::Jmp(Target::Label(top)));
                self.state.place(exit)
            }

            StatementKind::DoLoop {
                pre_condition,
                body,
                post_condition,
            } => self.emit_do(pre_condition.as_ref(), body, post_condition.as_ref()),

            StatementKind::Goto { target } => {
                let label = self.state.named_label(target);
                self.state.emit(Op::Jmp(Target::Label(label)));
                Ok(())
            }
            StatementKind::Gosub { target } => {
                let label = self.state.named_label(target);
                self.state.emit(Op::Gosub(Target::Label(label)));
                Ok(())
            }
            StatementKind::Return => {
                self.state.emit(Op::Ret);
                Ok(())
            }
            StatementKind::Exit { exit_type } => self.emit_exit(*exit_type, stmt.locus),
            StatementKind::End => {
                self.state.emit(Op::End);
                Ok(())
            }
            StatementKind::Label { name } => {
                let label = self.state.named_label(name);
                self.state.place(label)
            }

            StatementKind::Call { name, args } => self.emit_call_statement(name, args, stmt.locus),

            StatementKind::Input {
                prompt,
                question,
                targets,
            } => {
                let prompt = match prompt {
                    Some(p) if *question => format!("{}? ", p),
                    Some(p) => p.clone(),
                    None => "? ".to_string(),
                };
                self.state.emit(Op::PushConst(Value::String(prompt)));
                for target in targets {
                    self.emit_ref(target)?;
                }
                self.push_count(targets.len());
                self.syscall("_INPUT");
                Ok(())
            }
            StatementKind::LineInput { prompt, target } => {
                let prompt = prompt.clone().unwrap_or_default();
                self.state.emit(Op::PushConst(Value::String(prompt)));
                self.emit_ref(target)?;
                self.syscall("_LINE_INPUT");
                Ok(())
            }
            StatementKind::FileInput {
                file_num,
                targets,
                line,
            } => {
                self.emit_expr(file_num)?;
                if *line {
                    if let Some(target) = targets.first() {
                        self.emit_ref(target)?;
                    }
                    self.syscall("_FILE_LINE_INPUT");
                } else {
                    for target in targets {
                        self.emit_ref(target)?;
                    }
                    self.push_count(targets.len());
                    self.syscall("_FILE_INPUT");
                }
                Ok(())
            }
            StatementKind::Open {
                path,
                mode,
                file_num,
            } => {
                self.emit_expr(path)?;
                self.state.emit(Op::PushConst(Value::Integer(mode.code())));
                self.emit_expr(file_num)?;
                self.syscall("_OPEN");
                Ok(())
            }
            StatementKind::Close { file_nums } => {
                if file_nums.is_empty() {
                    self.push_count(0);
                    self.syscall("_CLOSE");
                }
                for file_num in file_nums {
                    self.emit_expr(file_num)?;
                    self.push_count(1);
                    self.syscall("_CLOSE");
                }
                Ok(())
            }
            StatementKind::Write { file, values } => {
                if let Some(file) = file {
                    self.select_output(file)?;
                }
                for value in values {
                    self.emit_expr(value)?;
                }
                self.push_count(values.len());
                self.syscall("_WRITE");
                if file.is_some() {
                    self.select_console();
                }
                Ok(())
            }

            StatementKind::Data { values } => {
                for value in values {
                    self.state.push_data(data_value(value));
                }
                Ok(())
            }
            StatementKind::Read { targets } => {
                for target in targets {
                    self.emit_ref(target)?;
                    self.state.emit(Op::Read);
                }
                Ok(())
            }
            StatementKind::Restore { label } => {
                let target = match label {
                    Some(name) => Target::Label(self.state.named_label(name)),
                    None => Target::Resolved(0),
                };
                self.state.emit(Op::Restore(target));
                Ok(())
            }

            StatementKind::OnEvent { key, target } => {
                self.emit_expr(key)?;
                let label = self.state.named_label(target);
                self.state.emit(Op::RegEventHandler(Target::Label(label)));
                Ok(())
            }

            // Hoisted by emit_program, or compile-time only.
            StatementKind::DefType { .. }
            | StatementKind::Declare { .. }
            | StatementKind::TypeDefinition { .. }
            | StatementKind::Comment(_) => Ok(()),
        }
    }

    // ==================== Declarations ====================

    fn emit_dim(&mut self, decl: &VarDecl) -> Result<(), CodeGenError> {
        self.state.set_locus(decl.locus);
        let element = self.element_type(decl)?;
        if !decl.is_array {
            self.state.emit(Op::Dim {
                name: decl.name.clone(),
                ty: element,
            });
        } else if decl.dims.is_empty() {
            // `DIM a() AS t`: an empty dynamic array that remembers its
            // element type for the REDIM that sizes it.
            self.state.emit(Op::Dim {
                name: decl.name.clone(),
                ty: Type::Array {
                    element: Box::new(element),
                    dims: 0,
                },
            });
        } else {
            self.emit_bounds(&decl.dims)?;
            self.state.emit(Op::DimArray {
                name: decl.name.clone(),
                element,
                dims: decl.dims.len(),
            });
        }
        Ok(())
    }

    /// Pushes `lower, upper` per dimension; a missing lower bound is 0.
    fn emit_bounds(&mut self, dims: &[ArrayDimension]) -> Result<(), CodeGenError> {
        for dim in dims {
            match &dim.lower {
                Some(lower) => self.emit_expr(lower)?,
                None => self.state.emit(Op::PushConst(Value::Integer(0))),
            }
            self.emit_expr(&dim.upper)?;
        }
        Ok(())
    }

    fn element_type(&self, decl: &VarDecl) -> Result<Type, CodeGenError> {
        match &decl.type_spec {
            Some(spec) => self.type_of_spec(spec, decl.locus),
            None => Ok(self.symbols.implicit_type(&decl.name)),
        }
    }

    fn type_of_spec(&self, spec: &TypeSpec, locus: Locus) -> Result<Type, CodeGenError> {
        resolve_type_spec(self.symbols, spec).ok_or_else(|| {
            let name = match spec {
                TypeSpec::UserDefined(name) => name.clone(),
                _ => String::new(),
            };
            CodeGenError::unresolved(name).with_locus(locus)
        })
    }

    // ==================== Branches ====================

    fn emit_if(
        &mut self,
        condition: &Expr,
        then_branch: &[Statement],
        elseif_branches: &[(Expr, Vec<Statement>)],
        else_branch: Option<&[Statement]>,
    ) -> Result<(), CodeGenError> {
        let end = self.state.new_label();
        let arms = std::iter::once((condition, then_branch))
            .chain(elseif_branches.iter().map(|(c, b)| (c, b.as_slice())));

        for (condition, body) in arms {
            let next = self.state.new_label();
            self.emit_expr(condition)?;
            self.state.emit(Op::Bz(Target::Label(next)));
            self.emit_block(body)?;
            self.state.emit(Op::Jmp(Target::Label(end)));
            self.state.place(next)?;
        }
        if let Some(body) = else_branch {
            self.emit_block(body)?;
        }
        self.state.place(end)
    }

    /// The test value is evaluated once into a temporary; each CASE
    /// compares against it in order.
    fn emit_select(
        &mut self,
        test_expr: &Expr,
        cases: &[CaseClause],
        case_else: Option<&[Statement]>,
    ) -> Result<(), CodeGenError> {
        let selector = self.state.temp_name("SEL");
        // ANY storage keeps the test value's own type.
        self.state.emit(Op::Dim {
            name: selector.clone(),
            ty: Type::Any,
        });
        self.state.emit(Op::PushRef(selector.clone()));
        self.emit_expr(test_expr)?;
        self.state.emit(Op::Assign);

        let end = self.state.new_label();
        for case in cases {
            self.state.set_locus(case.locus);
            let body = self.state.new_label();
            let next = self.state.new_label();
            for case_match in &case.matches {
                self.emit_case_match(&selector, case_match)?;
                self.state.emit(Op::Bnz(Target::Label(body)));
            }
            self.state.emit(Op::Jmp(Target::Label(next)));
            self.state.place(body)?;
            self.emit_block(&case.body)?;
            self.state.emit(Op::Jmp(Target::Label(end)));
            self.state.place(next)?;
        }
        if let Some(body) = case_else {
            self.emit_block(body)?;
        }
        self.state.place(end)
    }

    /// Leaves -1 on the stack when `selector` matches.
    fn emit_case_match(&mut self, selector: &str, case_match: &CaseMatch) -> Result<(), CodeGenError> {
        match case_match {
            CaseMatch::Single(value) => {
                self.state.emit(Op::PushValue(selector.to_string()));
                self.emit_expr(value)?;
                self.state.emit(Op::Binary(BinaryOp::Equal));
            }
            CaseMatch::Range { from, to } => {
                self.state.emit(Op::PushValue(selector.to_string()));
                self.emit_expr(from)?;
                self.state.emit(Op::Binary(BinaryOp::GreaterEqual));
                self.state.emit(Op::PushValue(selector.to_string()));
                self.emit_expr(to)?;
                self.state.emit(Op::Binary(BinaryOp::LessEqual));
                self.state.emit(Op::Binary(BinaryOp::And));
            }
            CaseMatch::Comparison { op, value } => {
                self.state.emit(Op::PushValue(selector.to_string()));
                self.emit_expr(value)?;
                self.state.emit(Op::Binary(case_operator(*op)));
            }
        }
        Ok(())
    }

    // ==================== Loops ====================

    /// `FOR v = start TO end STEP step`. End and step are evaluated once,
    /// before the first test.
    fn emit_for(
        &mut self,
        variable: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &[Statement],
    ) -> Result<(), CodeGenError> {
        self.state.emit(Op::PushRef(variable.to_string()));
        self.emit_expr(start)?;
        self.state.emit(Op::Assign);

        let end_var = self.state.temp_name("FOREND");
        let step_var = self.state.temp_name("FORSTEP");
        self.emit_temp(&end_var, Type::Double, |emitter| emitter.emit_expr(end))?;
        self.emit_temp(&step_var, Type::Double, |emitter| match step {
            Some(step) => emitter.emit_expr(step),
            None => {
                emitter.state.emit(Op::PushConst(Value::Integer(1)));
                Ok(())
            }
        })?;

        let top = self.state.new_label();
        let exit = self.state.new_label();
        self.state.place(top)?;
        self.state.emit(Op::PushValue(variable.to_string()));
        self.state.emit(Op::PushValue(end_var));
        self.state.emit(Op::PushValue(step_var.clone()));
        self.state.emit(Op::ForLoop(Target::Label(exit)));

        self.emit_loop_body(ExitType::For, exit, body)?;

        self.state.emit(Op::PushRef(variable.to_string()));
        self.state.emit(Op::PushValue(step_var));
        self.state.emit(Op::ForStep);
        self.state.emit(Op::Jmp(Target::Label(top)));
        self.state.place(exit)
    }

    fn emit_do(
        &mut self,
        pre_condition: Option<&DoCondition>,
        body: &[Statement],
        post_condition: Option<&DoCondition>,
    ) -> Result<(), CodeGenError> {
        let top = self.state.new_label();
        let exit = self.state.new_label();
        self.state.place(top)?;

        if let Some(pre) = pre_condition {
            self.emit_expr(&pre.condition)?;
            let leave = Target::Label(exit);
            self.state
                .emit(if pre.is_while { Op::Bz(leave) } else { Op::Bnz(leave) });
        }

        self.emit_loop_body(ExitType::Do, exit, body)?;

        match post_condition {
            Some(post) => {
                self.emit_expr(&post.condition)?;
                let again = Target::Label(top);
                self.state
                    .emit(if post.is_while { Op::Bnz(again) } else { Op::Bz(again) });
            }
            None => self.state.emit(Op::Jmp(Target::Label(top))),
        }
        self.state.place(exit)
    }

    fn emit_loop_body(&mut self, kind: ExitType, exit: LabelId, body: &[Statement]) -> Result<(), CodeGenError> {
        self.state.loop_stack.push(LoopContext { kind, exit });
        let result = self.emit_block(body);
        self.state.loop_stack.pop();
        result
    }

    fn emit_exit(&mut self, exit_type: ExitType, locus: Locus) -> Result<(), CodeGenError> {
        let label = match exit_type {
            ExitType::Sub | ExitType::Function => self.routine_exit,
            kind => self
                .state
                .loop_stack
                .iter()
                .rev()
                .find(|ctx| ctx.kind == kind)
                .map(|ctx| ctx.exit),
        };
        let label = label.ok_or_else(|| {
            CodeGenError::internal(format!("EXIT {} outside its block", exit_type)).with_locus(locus)
        })?;
        self.state.emit(Op::Jmp(Target::Label(label)));
        Ok(())
    }

    /// `DIM temp AS ty` followed by `temp = <value>`.
    fn emit_temp(
        &mut self,
        name: &str,
        ty: Type,
        value: impl FnOnce(&mut Self) -> Result<(), CodeGenError>,
    ) -> Result<(), CodeGenError> {
        self.state.emit(Op::Dim {
            name: name.to_string(),
            ty,
        });
        self.state.emit(Op::PushRef(name.to_string()));
        value(self)?;
        self.state.emit(Op::Assign);
        Ok(())
    }

    // ==================== Output ====================

    fn emit_print(
        &mut self,
        file: Option<&Expr>,
        using: Option<&Expr>,
        items: &[PrintItem],
        newline: bool,
    ) -> Result<(), CodeGenError> {
        if let Some(file) = file {
            self.select_output(file)?;
        }

        match using {
            Some(template) => {
                self.emit_expr(template)?;
                for item in items {
                    self.emit_expr(&item.expr)?;
                }
                self.push_count(items.len());
                self.syscall("_PRINT_USING");
            }
            None => {
                for item in items {
                    self.emit_expr(&item.expr)?;
                    self.syscall("_PRINT");
                    if item.separator == Some(PrintSeparator::Comma) {
                        self.syscall("_PRINT_ZONE");
                    }
                }
            }
        }
        if newline {
            self.syscall("_PRINT_NEWLINE");
        }

        if file.is_some() {
            self.select_console();
        }
        Ok(())
    }

    fn select_output(&mut self, file: &Expr) -> Result<(), CodeGenError> {
        self.emit_expr(file)?;
        self.syscall("_SELECT_OUTPUT");
        Ok(())
    }

    fn select_console(&mut self) {
        self.state.emit(Op::PushConst(Value::Integer(0)));
        self.syscall("_SELECT_OUTPUT");
    }

    // ==================== Calls ====================

    /// `CALL name(args)` or a bare statement such as `CLS`.
    ///
    /// User SUBs take precedence over builtin subroutines of the same name.
    fn emit_call_statement(&mut self, name: &str, args: &[Expr], locus: Locus) -> Result<(), CodeGenError> {
        let symbols = self.symbols;
        if let Some(entry) = symbols.lookup_procedure(name) {
            self.emit_user_args(&entry.params, args)?;
            let label = self.state.routine_label(name);
            self.state.emit(Op::Call(Target::Label(label)));
            if entry.kind == RoutineKind::Function {
                // Result unused.
                self.state.emit(Op::Pop);
            }
            return Ok(());
        }
        let registry = self.registry;
        match registry.sub(name) {
            Some(builtin) => self.emit_builtin_call(builtin, args),
            None => Err(CodeGenError::unresolved(name).with_locus(locus)),
        }
    }

    pub(super) fn push_count(&mut self, count: usize) {
        self.state
            .emit(Op::PushConst(Value::Integer(count.min(i16::MAX as usize) as i16)));
    }

    pub(super) fn syscall(&mut self, name: &str) {
        self.state.emit(Op::Syscall(name.to_string()));
    }
}

fn case_operator(op: CaseCompareOp) -> BinaryOp {
    match op {
        CaseCompareOp::Equal => BinaryOp::Equal,
        CaseCompareOp::NotEqual => BinaryOp::NotEqual,
        CaseCompareOp::LessThan => BinaryOp::LessThan,
        CaseCompareOp::LessEqual => BinaryOp::LessEqual,
        CaseCompareOp::GreaterThan => BinaryOp::GreaterThan,
        CaseCompareOp::GreaterEqual => BinaryOp::GreaterEqual,
    }
}

/// DATA integers that fit INTEGER stay INTEGER; everything else numeric
/// is DOUBLE.
fn data_value(value: &DataValue) -> Value {
    match value {
        DataValue::Integer(n) => match i16::try_from(*n) {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Double(*n as f64),
        },
        DataValue::Float(n) => Value::Double(*n),
        DataValue::String(s) => Value::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::testing::{run, run_input};

    #[test]
    fn test_data_value_representation() {
        assert_eq!(data_value(&DataValue::Integer(7)), Value::Integer(7));
        assert_eq!(data_value(&DataValue::Integer(40000)), Value::Double(40000.0));
        assert_eq!(data_value(&DataValue::Float(0.5)), Value::Double(0.5));
    }

    #[test]
    fn test_if_elseif_else() {
        let source = "\
FOR i = 1 TO 3
  IF i = 1 THEN
    PRINT \"one\"
  ELSEIF i = 2 THEN
    PRINT \"two\"
  ELSE
    PRINT \"many\"
  END IF
NEXT";
        assert_eq!(run(source), "one\ntwo\nmany\n");
    }

    #[test]
    fn test_select_case_forms() {
        let source = "\
FOR n = 0 TO 12 STEP 4
  SELECT CASE n
    CASE 0
      PRINT \"zero\"
    CASE 1 TO 5
      PRINT \"small\"
    CASE IS > 10
      PRINT \"big\"
    CASE ELSE
      PRINT \"other\"
  END SELECT
NEXT";
        assert_eq!(run(source), "zero\nsmall\nother\nbig\n");
    }

    #[test]
    fn test_select_case_strings() {
        let source = "s$ = \"b\"\nSELECT CASE s$\nCASE \"a\", \"b\"\nPRINT \"ab\"\nCASE ELSE\nPRINT \"?\"\nEND SELECT";
        assert_eq!(run(source), "ab\n");
    }

    #[test]
    fn test_for_evaluates_bounds_once() {
        let source = "n = 3\nFOR i = 1 TO n\nn = 10\nPRINT i;\nNEXT\nPRINT";
        assert_eq!(run(source), "123\n");
    }

    #[test]
    fn test_for_negative_step_and_skipped_body() {
        assert_eq!(run("FOR i = 3 TO 1 STEP -1\nPRINT i;\nNEXT\nPRINT"), "321\n");
        assert_eq!(run("FOR i = 5 TO 1\nPRINT \"never\"\nNEXT\nPRINT i"), "5\n");
    }

    #[test]
    fn test_exit_innermost_loop() {
        let source = "\
DO
  FOR i = 1 TO 10
    IF i = 3 THEN EXIT FOR
  NEXT
  PRINT i
  EXIT DO
LOOP
PRINT \"out\"";
        assert_eq!(run(source), "3\nout\n");
    }

    #[test]
    fn test_do_loop_variants() {
        assert_eq!(run("i = 0\nDO WHILE i < 3\ni = i + 1\nLOOP\nPRINT i"), "3\n");
        assert_eq!(run("i = 0\nDO\ni = i + 1\nLOOP UNTIL i >= 4\nPRINT i"), "4\n");
        assert_eq!(run("i = 9\nDO UNTIL i > 5\ni = i + 1\nLOOP\nPRINT i"), "9\n");
        assert_eq!(run("i = 9\nDO\ni = i + 1\nLOOP WHILE i < 5\nPRINT i"), "10\n");
    }

    #[test]
    fn test_while_wend() {
        assert_eq!(run("x = 1\nWHILE x < 100\nx = x * 3\nWEND\nPRINT x"), "243\n");
    }

    #[test]
    fn test_gosub_shares_variables() {
        let source = "x = 1\nGOSUB bump\nPRINT x\nEND\nbump:\nx = x + 41\nRETURN";
        assert_eq!(run(source), "42\n");
    }

    #[test]
    fn test_exit_sub_and_function() {
        let source = "\
CALL Show(5)
PRINT Half(9)
SUB Show(n)
  IF n > 3 THEN EXIT SUB
  PRINT \"small\"
END SUB
FUNCTION Half(n)
  Half = n / 2
  EXIT FUNCTION
  Half = 0
END FUNCTION";
        assert_eq!(run(source), "4.5\n");
    }

    #[test]
    fn test_const_and_read_restore() {
        let source = "\
CONST LIMIT = 2
FOR i = 1 TO LIMIT
  READ a$, n
  PRINT a$; n
NEXT
RESTORE
READ a$
PRINT a$
DATA apple, 1, pear, 2";
        assert_eq!(run(source), "apple1\npear2\napple\n");
    }

    #[test]
    fn test_dim_empty_array_keeps_element_type() {
        assert_eq!(run("DIM a() AS STRING\nREDIM a(2)\na(2) = \"z\"\nPRINT a(2); UBOUND(a)"), "z2\n");
    }

    #[test]
    fn test_line_input_through_statement() {
        assert_eq!(run_input("LINE INPUT l$\nPRINT \"[\"; l$; \"]\"", &["x, y"]), "x, y\n[x, y]\n");
    }
}
