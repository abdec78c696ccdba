//! Code generation for qbvm.
//!
//! This module lowers a checked [`Program`] into the flat instruction list
//! the VM executes. The architecture keeps a trait at the seam so that other
//! targets can sit beside the bytecode emitter.
//!
//! # Architecture
//!
//! ```text
//! Program + SymbolTable → CodeGenerator → CodeGenState → link() → QBasicProgram
//!                               ↑
//!                        BytecodeBackend
//! ```
//!
//! # Layout of the emitted code
//!
//! ```text
//! SET_DEFAULT_TYPE ...        hoisted DEFtype statements
//! <main body>
//! END
//! JMP skip_1                  one block per SUB/FUNCTION
//! entry_1: POP_PARAM ...
//!          <body>
//! exit_1:  RET
//! skip_1:
//! ...
//! ```
//!
//! # Example
//!
//! ```
//! use qbvm::builtins::Registry;
//!
//! let registry = Registry::standard();
//! let program = qbvm::compile("PRINT 1 + 2", &registry).unwrap();
//! assert!(program.to_string().contains("SYSCALL _PRINT"));
//! ```

mod error;
mod expr;
mod instruction;
mod state;
mod stmt;

pub use error::{CodeGenError, CodeGenErrorKind};
pub use instruction::{Instruction, LabelId, Op, QBasicProgram, Target};
pub use state::CodeGenState;

use crate::ast::Program;
use crate::builtins::Registry;
use crate::semantic::SymbolTable;
use crate::types::Type;

use self::stmt::Emitter;

/// Trait for code generation backends.
///
/// Implementations receive a program the type checker accepted, together
/// with the symbol table it filled in.
pub trait CodeGenerator {
    /// Generates a linked program.
    ///
    /// # Returns
    ///
    /// * `Ok(QBasicProgram)` - Linked, ready to load into a VM
    /// * `Err(CodeGenError)` - Code generation or linking failed
    fn generate(&self, program: &Program, symbols: &SymbolTable) -> Result<QBasicProgram, CodeGenError>;

    /// Returns the name of this backend for diagnostics.
    fn backend_name(&self) -> &str;
}

/// The stack-VM backend.
pub struct BytecodeBackend<'r> {
    registry: &'r Registry,
}

impl<'r> BytecodeBackend<'r> {
    /// Creates a backend that lowers builtin calls against `registry`.
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }
}

impl CodeGenerator for BytecodeBackend<'_> {
    fn generate(&self, program: &Program, symbols: &SymbolTable) -> Result<QBasicProgram, CodeGenError> {
        let mut emitter = Emitter::new(symbols, self.registry);
        emitter.emit_program(program)?;

        let mut state = emitter.finish();
        state.link()?;
        let (instructions, data) = state.into_parts();

        Ok(QBasicProgram {
            instructions,
            data,
            types: symbols.types(),
            default_type: Type::Single,
            shared: symbols.shared_names().cloned().collect(),
        })
    }

    fn backend_name(&self) -> &str {
        "bytecode"
    }
}

/// Generates a linked program with the bytecode backend.
pub fn generate(
    program: &Program,
    symbols: &SymbolTable,
    registry: &Registry,
) -> Result<QBasicProgram, CodeGenError> {
    BytecodeBackend::new(registry).generate(program, symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::types::Value;

    fn compile(source: &str) -> QBasicProgram {
        crate::compile(source, &Registry::standard()).unwrap()
    }

    fn ops(program: &QBasicProgram) -> Vec<&Op> {
        program.instructions.iter().map(|i| &i.op).collect()
    }

    #[test]
    fn test_backend_name() {
        let registry = Registry::new();
        assert_eq!(BytecodeBackend::new(&registry).backend_name(), "bytecode");
    }

    #[test]
    fn test_empty_program_is_just_end() {
        let program = compile("");
        assert_eq!(ops(&program), vec![&Op::End]);
    }

    #[test]
    fn test_assignment_shape() {
        let program = compile("x% = 1 + 2");
        assert_eq!(
            ops(&program),
            vec![
                &Op::PushRef("X%".to_string()),
                &Op::PushConst(Value::Integer(1)),
                &Op::PushConst(Value::Integer(2)),
                &Op::Binary(BinaryOp::Add),
                &Op::Assign,
                &Op::End,
            ]
        );
    }

    #[test]
    fn test_for_loop_starts_with_counter_assignment() {
        let program = compile("FOR i = 1 TO 3\nNEXT i");
        let ops = ops(&program);
        assert_eq!(ops[0], &Op::PushRef("I".to_string()));
        assert_eq!(ops[1], &Op::PushConst(Value::Integer(1)));
        assert_eq!(ops[2], &Op::Assign);
        assert!(ops.iter().any(|op| matches!(op, Op::ForLoop(_))));
        assert!(ops.contains(&&Op::ForStep));
    }

    #[test]
    fn test_every_target_is_linked_in_range() {
        let source = "\
GOSUB work
PRINT Twice(4)
END
work:
  FOR i = 1 TO 2
    IF i = 2 THEN EXIT FOR
  NEXT
RETURN
FUNCTION Twice(n)
  Twice = n * 2
END FUNCTION";
        let program = compile(source);
        let len = program.instructions.len();
        for instruction in &program.instructions {
            if let Some(target) = instruction.op.address() {
                match target {
                    Target::Resolved(at) => assert!(at < len, "{} out of range", instruction.op),
                    Target::Label(id) => panic!("unlinked label L{}", id),
                }
            }
        }
    }

    #[test]
    fn test_routines_follow_main_end() {
        let program = compile("CALL Hello\nSUB Hello\nPRINT \"hi\"\nEND SUB");
        let ops = ops(&program);
        let end = ops.iter().position(|op| **op == Op::End).unwrap();
        assert!(matches!(ops[end + 1], Op::Jmp(_)));
        assert_eq!(&ops[ops.len() - 2..], &[&Op::Ret, &Op::End]);
    }

    #[test]
    fn test_data_segment_and_restore_offset() {
        let program = compile("DATA 1, 2\nsecond:\nDATA \"x\", 2.5, 70000\nRESTORE second");
        assert_eq!(
            program.data,
            vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::String("x".to_string()),
                Value::Double(2.5),
                Value::Double(70000.0),
            ]
        );
        assert!(ops(&program).contains(&&Op::Restore(Target::Resolved(2))));
    }

    #[test]
    fn test_deftype_is_hoisted() {
        let program = compile("x = 1\nDEFINT A-Z");
        assert!(matches!(program.instructions[0].op, Op::SetDefaultType { .. }));
    }

    #[test]
    fn test_shared_names_and_types_carried() {
        let program = compile("TYPE P\nx AS INTEGER\nEND TYPE\nDIM SHARED total AS LONG");
        assert!(program.shared.contains("TOTAL"));
        assert!(program.types.contains_key("P"));
    }

    #[test]
    fn test_disassembly_lists_every_instruction() {
        let program = compile("PRINT \"hi\"");
        let listing = program.to_string();
        assert!(listing.contains("PUSH_CONST \"hi\""));
        assert!(listing.contains("SYSCALL _PRINT_NEWLINE"));
        assert_eq!(listing.lines().count(), program.instructions.len());
    }
}
