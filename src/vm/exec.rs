//! Instruction handlers.

use super::error::{self, RuntimeError};
use super::frame::Frame;
use super::pending::{Completion, DeviceRequest};
use super::{StackItem, Vm, arith, store};
use crate::codegen::{Op, Target};
use crate::types::{ArrayValue, Type, Value, cell};
use qbvm_runtime::math;
use std::rc::Rc;

impl Vm {
    /// Executes one op. `self.pc` already points past it.
    pub(super) fn execute(&mut self, op: &Op) -> Result<(), RuntimeError> {
        match op {
            // ==================== Stack ====================
            Op::PushConst(value) => self.push(value.clone()),
            Op::PushValue(name) => {
                let value = self.get_variable(name).borrow().clone();
                self.push(value);
            }
            Op::PushRef(name) => {
                let storage = self.get_variable(name);
                self.push_ref(storage);
            }
            Op::PushArray {
                name,
                element,
                dims,
            } => {
                let storage = self.array_variable(name, element, *dims)?;
                self.push_ref(storage);
            }
            Op::Pop => {
                self.pop()?;
            }

            // ==================== Variables ====================
            Op::Assign => {
                let value = self.pop_value()?;
                let target = self.pop_ref()?;
                store(&target, value)?;
            }
            Op::PopParam { name, ty } => {
                let storage = match self.pop()? {
                    StackItem::Ref(storage) => storage,
                    StackItem::Value(value) => match ty {
                        Type::Any => cell(value),
                        ty => cell(ty.copy(&value)?),
                    },
                };
                // Parameters always live in the callee's frame.
                let frame = &self.frames[self.frames.len() - 1];
                frame.insert(name, storage);
            }
            Op::Dim { name, ty } => self.bind(name, cell(ty.default_value())),
            Op::DimArray {
                name,
                element,
                dims,
            } => {
                let bounds = self.pop_bounds(*dims)?;
                let array = ArrayValue::new(element.clone(), bounds)?;
                self.bind(name, cell(Value::Array(array)));
            }
            Op::Redim {
                name,
                element,
                dims,
                preserve,
            } => {
                let bounds = self.pop_bounds(*dims)?;
                let storage = self.get_variable(name);
                let mut current = storage.borrow_mut();
                match &mut *current {
                    Value::Array(array) => array.resize(bounds, *preserve)?,
                    slot => *slot = Value::Array(ArrayValue::new(element.clone(), bounds)?),
                }
            }
            Op::SetDefaultType { from, to, ty } => {
                for letter in from.to_ascii_uppercase()..=to.to_ascii_uppercase() {
                    if letter.is_ascii_uppercase() {
                        self.default_types[(letter as u8 - b'A') as usize] = ty.clone();
                    }
                }
            }

            // ==================== Operators ====================
            Op::Binary(op) => {
                let right = self.pop_value()?;
                let left = self.pop_value()?;
                let result = arith::binary(*op, left, right)?;
                self.push(result);
            }
            Op::Neg => {
                let value = self.pop_value()?;
                self.push(arith::negate(value)?);
            }
            Op::Not => {
                let value = self.pop_value()?;
                self.push(arith::not(value)?);
            }

            // ==================== Control flow ====================
            Op::Jmp(target) => self.pc = address(target)?,
            Op::Bz(target) => {
                if !self.pop_value()?.is_true() {
                    self.pc = address(target)?;
                }
            }
            Op::Bnz(target) => {
                if self.pop_value()?.is_true() {
                    self.pc = address(target)?;
                }
            }
            Op::Call(target) => {
                self.check_call_depth()?;
                self.frames.push(Frame::call(self.pc));
                self.pc = address(target)?;
            }
            Op::Gosub(target) => {
                self.check_call_depth()?;
                let frame = Frame::gosub(self.pc, self.frame());
                self.frames.push(frame);
                self.pc = address(target)?;
            }
            Op::Ret => {
                if self.frames.len() <= 1 {
                    return Err(RuntimeError::new(
                        error::RETURN_WITHOUT_GOSUB,
                        "RETURN without GOSUB",
                    ));
                }
                if let Some(frame) = self.frames.pop() {
                    self.pc = frame.return_pc;
                }
            }
            Op::ForLoop(exit) => {
                let step = self.pop_f64()?;
                let end = self.pop_f64()?;
                let counter = self.pop_f64()?;
                let done = if step >= 0.0 {
                    counter > end
                } else {
                    counter < end
                };
                if done {
                    self.pc = address(exit)?;
                }
            }
            Op::ForStep => {
                let step = self.pop_f64()?;
                let counter = self.pop_ref()?;
                let current = counter.borrow().clone();
                let next = current.as_f64().ok_or_else(|| {
                    RuntimeError::type_mismatch(format!("FOR counter is {}", current.type_name()))
                })? + step;
                let rounded = math::round_even(next);
                let fits = match current.ty() {
                    Type::Integer => (i16::MIN as f64..=i16::MAX as f64).contains(&rounded),
                    Type::Long => (i32::MIN as f64..=i32::MAX as f64).contains(&rounded),
                    _ => true,
                };
                if !fits {
                    return Err(RuntimeError::new(error::OVERFLOW, "FOR counter overflow"));
                }
                store(&counter, Value::Double(next))?;
            }
            Op::End => self.end()?,

            // ==================== Dereference ====================
            Op::ArrayDeref { dims, by_ref } => {
                let indices = self.pop_indices(*dims)?;
                let array = self.pop_ref()?;
                let slot = match &*array.borrow() {
                    Value::Array(array) => array.get(&indices)?,
                    other => {
                        return Err(RuntimeError::type_mismatch(format!(
                            "{} is not an array",
                            other.type_name()
                        )));
                    }
                };
                self.push_slot(slot, *by_ref);
            }
            Op::MemberDeref { member, by_ref } => {
                let field = match self.pop()? {
                    StackItem::Ref(record) => field_of(&record.borrow(), member)?,
                    StackItem::Value(record) => field_of(&record, member)?,
                };
                self.push_slot(field, *by_ref);
            }

            // ==================== DATA ====================
            Op::Read => {
                let target = self.pop_ref()?;
                let value = match self.next_data()? {
                    // A numeric item read into a string keeps its text.
                    v @ (Value::Integer(_) | Value::Double(_))
                        if matches!(*target.borrow(), Value::String(_)) =>
                    {
                        Value::String(v.to_print_string())
                    }
                    v => v,
                };
                store(&target, value)?;
            }
            Op::Restore(target) => self.data_pointer = address(target)?,

            // ==================== Builtins and events ====================
            Op::Syscall(name) => self.syscall(name)?,
            Op::RegEventHandler(target) => {
                let key = self.pop_string()?;
                self.handlers.insert(key, address(target)?);
            }
        }
        Ok(())
    }

    /// Runs a builtin. Recoverable failures land in the status register
    /// and a function still yields its type's default.
    fn syscall(&mut self, name: &str) -> Result<(), RuntimeError> {
        let Some(builtin) = self.registry.lookup(name) else {
            return Err(RuntimeError::unavailable(format!("syscall {}", name)));
        };
        let action = builtin.action;
        let return_type = builtin.return_type.clone();

        match action(self) {
            Ok(()) => Ok(()),
            Err(err) if err.recoverable => {
                log::warn!("{}: {}", name, err);
                self.status = err.code;
                if let Some(ty) = return_type
                    && self.pending.is_none()
                {
                    self.push(ty.default_value());
                }
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// The array variable `name`, implicitly dimensioned on first use.
    fn array_variable(
        &self,
        name: &str,
        element: &Type,
        dims: usize,
    ) -> Result<crate::types::Cell, RuntimeError> {
        let owner = self.owner(name);
        if let Some(existing) = owner.lookup(name) {
            return match &*existing.borrow() {
                Value::Array(_) => Ok(Rc::clone(&existing)),
                other => Err(RuntimeError::type_mismatch(format!(
                    "{} is a {}, not an array",
                    name,
                    other.type_name()
                ))),
            };
        }
        let created = cell(Value::Array(ArrayValue::implicit(element.clone(), dims)));
        owner.insert(name, Rc::clone(&created));
        Ok(created)
    }

    fn push_slot(&mut self, slot: crate::types::Cell, by_ref: bool) {
        if by_ref {
            self.push_ref(slot);
        } else {
            let value = slot.borrow().clone();
            self.push(value);
        }
    }

    /// Pops `count` subscripts, returned in source order.
    fn pop_indices(&mut self, count: usize) -> Result<Vec<i64>, RuntimeError> {
        let mut indices = (0..count)
            .map(|_| self.pop_i64())
            .collect::<Result<Vec<_>, _>>()?;
        indices.reverse();
        Ok(indices)
    }

    /// Pops `dims` `(lower, upper)` pairs, returned in source order.
    fn pop_bounds(&mut self, dims: usize) -> Result<Vec<(i64, i64)>, RuntimeError> {
        let flat = self.pop_indices(dims * 2)?;
        Ok(flat.chunks(2).map(|pair| (pair[0], pair[1])).collect())
    }

    fn check_call_depth(&self) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.config.max_call_depth {
            return Err(RuntimeError::new(error::OVERFLOW, "out of stack space"));
        }
        Ok(())
    }

    /// END: closes every file and stops. Output files are written back
    /// first, which suspends.
    fn end(&mut self) -> Result<(), RuntimeError> {
        self.pc = self.program.instructions.len();
        let flushes: Vec<_> = self
            .files
            .drain()
            .filter_map(|(_, file)| file.into_flush())
            .collect();
        self.output = None;
        if !flushes.is_empty() {
            self.suspend(DeviceRequest::WriteFiles(flushes), Completion::Ignore)?;
        }
        Ok(())
    }
}

fn address(target: &Target) -> Result<usize, RuntimeError> {
    match target {
        Target::Resolved(at) => Ok(*at),
        Target::Label(id) => Err(RuntimeError::internal(format!("unlinked label L{}", id))),
    }
}

fn field_of(record: &Value, member: &str) -> Result<crate::types::Cell, RuntimeError> {
    match record {
        Value::Record(record) => record.field(member).ok_or_else(|| {
            RuntimeError::illegal_call(format!("{} has no member {}", record.ty.name, member))
        }),
        other => Err(RuntimeError::type_mismatch(format!(
            "{} is not a record",
            other.type_name()
        ))),
    }
}
