//! Emission state and the linker.
//!
//! Instructions are appended in one linear pass. Every jump names a label
//! minted on demand, so forward GOTOs and calls to routines that appear
//! later need no second walk; [`CodeGenState::link`] rewrites the label
//! arguments to absolute offsets once the whole program has been emitted.

use super::error::{CodeGenError, CodeGenErrorKind};
use super::instruction::{Instruction, LabelId, Op};
use crate::ast::{ExitType, Locus};
use crate::types::Value;
use std::collections::HashMap;

/// A jump target and the DATA position at the same point of the source.
#[derive(Debug, Clone, Default)]
struct Label {
    /// Source name, for named labels and routine entries.
    name: Option<String>,
    code: Option<usize>,
    data: Option<usize>,
}

/// An enclosing loop, for EXIT.
#[derive(Debug, Clone, Copy)]
pub(super) struct LoopContext {
    pub kind: ExitType,
    /// Placed right after the loop.
    pub exit: LabelId,
}

/// Everything code generation accumulates before linking.
#[derive(Debug, Default)]
pub struct CodeGenState {
    instructions: Vec<Instruction>,
    data: Vec<Value>,
    labels: Vec<Label>,
    /// Named BASIC labels.
    label_map: HashMap<String, LabelId>,
    /// SUB/FUNCTION entry points.
    routine_map: HashMap<String, LabelId>,
    pub(super) loop_stack: Vec<LoopContext>,
    temp_counter: usize,
    /// Locus stamped on emitted instructions.
    locus: Locus,
    linked: bool,
}

impl CodeGenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn data(&self) -> &[Value] {
        &self.data
    }

    pub(super) fn set_locus(&mut self, locus: Locus) {
        self.locus = locus;
    }

    pub(super) fn emit(&mut self, op: Op) {
        self.instructions.push(Instruction::new(op, self.locus));
    }

    pub(super) fn push_data(&mut self, value: Value) {
        self.data.push(value);
    }

    // ==================== Labels ====================

    /// Mints an anonymous label.
    pub fn new_label(&mut self) -> LabelId {
        self.labels.push(Label::default());
        self.labels.len() - 1
    }

    /// The label for BASIC label `name`, created on first reference.
    pub(super) fn named_label(&mut self, name: &str) -> LabelId {
        if let Some(&id) = self.label_map.get(name) {
            return id;
        }
        let id = self.new_label();
        self.labels[id].name = Some(name.to_string());
        self.label_map.insert(name.to_string(), id);
        id
    }

    /// The entry label of SUB/FUNCTION `name`, created on first reference.
    pub(super) fn routine_label(&mut self, name: &str) -> LabelId {
        if let Some(&id) = self.routine_map.get(name) {
            return id;
        }
        let id = self.new_label();
        self.labels[id].name = Some(name.to_string());
        self.routine_map.insert(name.to_string(), id);
        id
    }

    /// Binds `label` to the next instruction and the next DATA item.
    pub fn place(&mut self, label: LabelId) -> Result<(), CodeGenError> {
        let next_code = self.instructions.len();
        let next_data = self.data.len();
        let slot = self
            .labels
            .get_mut(label)
            .ok_or_else(|| CodeGenError::internal(format!("no label L{}", label)))?;
        if slot.code.is_some() {
            return Err(CodeGenError::internal(format!("label L{} placed twice", label)));
        }
        slot.code = Some(next_code);
        slot.data = Some(next_data);
        Ok(())
    }

    /// A compiler-private variable name. `~` never starts a BASIC name.
    pub(super) fn temp_name(&mut self, prefix: &str) -> String {
        self.temp_counter += 1;
        format!("~{}{}", prefix, self.temp_counter)
    }

    // ==================== Linking ====================

    /// Rewrites every label argument to its absolute offset.
    ///
    /// Runs once; labels are frozen afterwards.
    pub fn link(&mut self) -> Result<(), CodeGenError> {
        if self.linked {
            return Err(CodeGenError::new(CodeGenErrorKind::AlreadyLinked));
        }
        let labels = &self.labels;
        for instruction in &mut self.instructions {
            instruction
                .op
                .relocate(
                    |id| labels.get(id).and_then(|l| l.code),
                    |id| labels.get(id).and_then(|l| l.data),
                )
                .map_err(|id| {
                    let err = CodeGenError::new(CodeGenErrorKind::UnplacedLabel(id))
                        .with_locus(instruction.locus);
                    match labels.get(id).and_then(|l| l.name.as_deref()) {
                        Some(name) => err.with_context(name.to_string()),
                        None => err,
                    }
                })?;
        }
        self.linked = true;
        log::debug!(
            "codegen: linked {} instructions, {} labels, {} DATA items",
            self.instructions.len(),
            self.labels.len(),
            self.data.len()
        );
        Ok(())
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// The instruction list and DATA segment.
    pub(super) fn into_parts(self) -> (Vec<Instruction>, Vec<Value>) {
        (self.instructions, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::instruction::Target;

    #[test]
    fn test_forward_jump_links() {
        let mut state = CodeGenState::new();
        let end = state.new_label();
        state.emit(Op::Jmp(Target::Label(end)));
        state.emit(Op::Pop);
        state.place(end).unwrap();
        state.emit(Op::End);
        state.link().unwrap();
        assert_eq!(state.instructions()[0].op, Op::Jmp(Target::Resolved(2)));
    }

    #[test]
    fn test_label_records_data_offset() {
        let mut state = CodeGenState::new();
        state.push_data(Value::Integer(1));
        let here = state.named_label("VALUES");
        state.place(here).unwrap();
        state.push_data(Value::Integer(2));
        state.emit(Op::Restore(Target::Label(here)));
        state.link().unwrap();
        assert_eq!(state.instructions()[0].op, Op::Restore(Target::Resolved(1)));
    }

    #[test]
    fn test_link_twice_is_an_error() {
        let mut state = CodeGenState::new();
        state.emit(Op::End);
        state.link().unwrap();
        assert_eq!(state.link().unwrap_err().kind, CodeGenErrorKind::AlreadyLinked);
    }

    #[test]
    fn test_unplaced_label_names_the_label() {
        let mut state = CodeGenState::new();
        let id = state.named_label("NOWHERE");
        state.emit(Op::Jmp(Target::Label(id)));
        let err = state.link().unwrap_err();
        assert_eq!(err.kind, CodeGenErrorKind::UnplacedLabel(id));
        assert_eq!(err.context.as_deref(), Some("NOWHERE"));
    }

    #[test]
    fn test_place_twice_is_an_error() {
        let mut state = CodeGenState::new();
        let id = state.new_label();
        state.place(id).unwrap();
        assert!(state.place(id).is_err());
    }
}
