//! Bytecode instructions and the linked program.
//!
//! An [`Instruction`] is an [`Op`] plus the [`Locus`] of the source that
//! produced it. Ops that transfer control carry a [`Target`]: a label id
//! while code is being generated, an absolute index once the program has
//! been linked.

use crate::ast::{BinaryOp, Locus};
use crate::types::{Type, UserType, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Identifier of a label minted during code generation.
pub type LabelId = usize;

/// A jump destination, or a position in the DATA segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Not yet linked.
    Label(LabelId),
    /// Absolute instruction index or data offset.
    Resolved(usize),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Label(id) => write!(f, "L{}", id),
            Target::Resolved(at) => write!(f, "{:04}", at),
        }
    }
}

/// One VM operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    // ==================== Stack ====================
    /// Pushes a constant.
    PushConst(Value),
    /// Pushes a variable's current value.
    PushValue(String),
    /// Pushes a reference to a variable's cell.
    PushRef(String),
    /// Pushes a reference to an array variable, creating an implicit
    /// `0 TO 10` array of `element` on first use.
    PushArray {
        name: String,
        element: Type,
        dims: usize,
    },
    /// Discards the top of the stack.
    Pop,

    // ==================== Variables ====================
    /// Pops a value, then a reference, and stores the value through the
    /// reference's type.
    Assign,
    /// Pops one argument into a parameter of the current frame. A reference
    /// aliases the caller's storage; a value is coerced to `ty`.
    PopParam { name: String, ty: Type },
    /// Creates (or reinitializes) a scalar variable.
    Dim { name: String, ty: Type },
    /// Pops `dims` lower/upper bound pairs and creates an array.
    DimArray {
        name: String,
        element: Type,
        dims: usize,
    },
    /// Pops `dims` bound pairs and resizes (or creates) an array.
    Redim {
        name: String,
        element: Type,
        dims: usize,
        preserve: bool,
    },
    /// Per-letter default type for lazily created variables.
    SetDefaultType { from: char, to: char, ty: Type },

    // ==================== Operators ====================
    Binary(BinaryOp),
    Neg,
    Not,

    // ==================== Control flow ====================
    Jmp(Target),
    /// Pops a value and jumps when it is zero.
    Bz(Target),
    /// Pops a value and jumps when it is nonzero.
    Bnz(Target),
    /// Enters a SUB/FUNCTION with a fresh variable table.
    Call(Target),
    /// Enters a subroutine that shares the caller's variable table.
    Gosub(Target),
    Ret,
    /// Pops counter, end and step; jumps to the target once the counter
    /// has passed the end in the direction of the step.
    ForLoop(Target),
    /// Pops the step and the counter reference and advances the counter.
    /// Leaving the counter's INTEGER or LONG range is an overflow, not a
    /// wrap.
    ForStep,
    End,

    // ==================== Dereference ====================
    /// Pops `dims` indices, then the array reference.
    ArrayDeref { dims: usize, by_ref: bool },
    /// Pops a record and selects one member.
    MemberDeref { member: String, by_ref: bool },

    // ==================== DATA ====================
    /// Pops a reference and stores the next DATA item into it.
    Read,
    /// Moves the DATA pointer.
    Restore(Target),

    // ==================== Builtins and events ====================
    /// Dispatches a builtin function or subroutine by name.
    Syscall(String),
    /// Pops an event key and installs a GOSUB handler for it.
    RegEventHandler(Target),
}

impl Op {
    /// The instruction-address argument, if the op has one.
    pub fn address(&self) -> Option<Target> {
        match self {
            Op::Jmp(t)
            | Op::Bz(t)
            | Op::Bnz(t)
            | Op::Call(t)
            | Op::Gosub(t)
            | Op::ForLoop(t)
            | Op::RegEventHandler(t) => Some(*t),
            _ => None,
        }
    }

    fn address_mut(&mut self) -> Option<&mut Target> {
        match self {
            Op::Jmp(t)
            | Op::Bz(t)
            | Op::Bnz(t)
            | Op::Call(t)
            | Op::Gosub(t)
            | Op::ForLoop(t)
            | Op::RegEventHandler(t) => Some(t),
            _ => None,
        }
    }

    /// The data-segment argument, if the op has one.
    pub fn data_offset(&self) -> Option<Target> {
        match self {
            Op::Restore(t) => Some(*t),
            _ => None,
        }
    }

    /// Rewrites label arguments through `resolve`. Used by the linker.
    pub(crate) fn relocate(
        &mut self,
        code: impl Fn(LabelId) -> Option<usize>,
        data: impl Fn(LabelId) -> Option<usize>,
    ) -> Result<(), LabelId> {
        if let Some(target) = self.address_mut()
            && let Target::Label(id) = *target
        {
            *target = Target::Resolved(code(id).ok_or(id)?);
        }
        if let Op::Restore(target) = self
            && let Target::Label(id) = *target
        {
            *target = Target::Resolved(data(id).ok_or(id)?);
        }
        Ok(())
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::PushConst(Value::String(s)) => write!(f, "PUSH_CONST \"{}\"", s),
            Op::PushConst(v) => write!(f, "PUSH_CONST {}", v.to_print_string()),
            Op::PushValue(name) => write!(f, "PUSH_VALUE {}", name),
            Op::PushRef(name) => write!(f, "PUSH_REF {}", name),
            Op::PushArray {
                name,
                element,
                dims,
            } => write!(f, "PUSH_ARRAY {} {}[{}]", name, element, dims),
            Op::Pop => write!(f, "POP"),
            Op::Assign => write!(f, "ASSIGN"),
            Op::PopParam { name, ty } => write!(f, "POP_PARAM {} AS {}", name, ty),
            Op::Dim { name, ty } => write!(f, "DIM {} AS {}", name, ty),
            Op::DimArray {
                name,
                element,
                dims,
            } => write!(f, "DIM_ARRAY {} {}[{}]", name, element, dims),
            Op::Redim {
                name,
                element,
                dims,
                preserve,
            } => write!(
                f,
                "REDIM{} {} {}[{}]",
                if *preserve { "_PRESERVE" } else { "" },
                name,
                element,
                dims
            ),
            Op::SetDefaultType { from, to, ty } => {
                write!(f, "SET_DEFAULT_TYPE {}-{} {}", from, to, ty)
            }
            Op::Binary(op) => write!(f, "BINARY {}", op.as_str()),
            Op::Neg => write!(f, "NEG"),
            Op::Not => write!(f, "NOT"),
            Op::Jmp(t) => write!(f, "JMP {}", t),
            Op::Bz(t) => write!(f, "BZ {}", t),
            Op::Bnz(t) => write!(f, "BNZ {}", t),
            Op::Call(t) => write!(f, "CALL {}", t),
            Op::Gosub(t) => write!(f, "GOSUB {}", t),
            Op::Ret => write!(f, "RET"),
            Op::ForLoop(t) => write!(f, "FORLOOP {}", t),
            Op::ForStep => write!(f, "FORSTEP"),
            Op::End => write!(f, "END"),
            Op::ArrayDeref { dims, by_ref } => {
                write!(f, "ARRAY_DEREF {}{}", dims, if *by_ref { " REF" } else { "" })
            }
            Op::MemberDeref { member, by_ref } => {
                write!(f, "MEMBER_DEREF {}{}", member, if *by_ref { " REF" } else { "" })
            }
            Op::Read => write!(f, "READ"),
            Op::Restore(t) => write!(f, "RESTORE {}", t),
            Op::Syscall(name) => write!(f, "SYSCALL {}", name),
            Op::RegEventHandler(t) => write!(f, "REG_EVENT_HANDLER {}", t),
        }
    }
}

/// An op plus the source position it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Op,
    pub locus: Locus,
}

impl Instruction {
    pub fn new(op: Op, locus: Locus) -> Self {
        Self { op, locus }
    }
}

/// The linked output of code generation; everything the VM needs to run.
#[derive(Debug, Clone, Default)]
pub struct QBasicProgram {
    pub instructions: Vec<Instruction>,
    /// DATA items in source order.
    pub data: Vec<Value>,
    /// Record types by upper-case name.
    pub types: HashMap<String, Rc<UserType>>,
    /// Type of a variable whose first letter has no DEFtype.
    pub default_type: Type,
    /// Names whose storage lives in the main frame.
    pub shared: HashSet<String>,
}

impl fmt::Display for QBasicProgram {
    /// A disassembly listing, one instruction per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.shared.is_empty() {
            let mut shared: Vec<_> = self.shared.iter().map(String::as_str).collect();
            shared.sort_unstable();
            writeln!(f, "; shared: {}", shared.join(", "))?;
        }
        for (pc, instruction) in self.instructions.iter().enumerate() {
            writeln!(
                f,
                "{:04}  {:<40} ; {}:{}",
                pc, instruction.op, instruction.locus.line, instruction.locus.column
            )?;
        }
        if !self.data.is_empty() {
            writeln!(f, "; data:")?;
            for (offset, value) in self.data.iter().enumerate() {
                writeln!(f, "{:04}  {:?}", offset, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocate_rewrites_labels() {
        let mut op = Op::Bz(Target::Label(3));
        op.relocate(|id| (id == 3).then_some(17), |_| None).unwrap();
        assert_eq!(op, Op::Bz(Target::Resolved(17)));

        let mut restore = Op::Restore(Target::Label(1));
        restore.relocate(|_| None, |_| Some(4)).unwrap();
        assert_eq!(restore.data_offset(), Some(Target::Resolved(4)));
    }

    #[test]
    fn test_relocate_unknown_label() {
        let mut op = Op::Call(Target::Label(9));
        assert_eq!(op.relocate(|_| None, |_| None), Err(9));
    }

    #[test]
    fn test_disassembly_line() {
        let program = QBasicProgram {
            instructions: vec![Instruction::new(
                Op::Syscall("_PRINT".to_string()),
                Locus::new(1, 1),
            )],
            ..Default::default()
        };
        assert!(program.to_string().contains("0000  SYSCALL _PRINT"));
    }
}
