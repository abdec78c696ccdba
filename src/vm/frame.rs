//! Call frames and operand stack items.

use crate::types::{Cell, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A frame's variables, by upper-case name.
pub type Variables = Rc<RefCell<HashMap<String, Cell>>>;

/// How a frame was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Main,
    /// `CALL` or a FUNCTION reference: a fresh variable table.
    Call,
    /// `GOSUB`: the caller's variable table.
    Gosub,
    /// An `ON EVENT` handler, entered like a GOSUB.
    Event,
}

/// One activation record.
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    /// Where `RET` continues.
    pub return_pc: usize,
    pub variables: Variables,
}

impl Frame {
    pub fn main() -> Self {
        Self {
            kind: FrameKind::Main,
            return_pc: 0,
            variables: Variables::default(),
        }
    }

    pub fn call(return_pc: usize) -> Self {
        Self {
            kind: FrameKind::Call,
            return_pc,
            variables: Variables::default(),
        }
    }

    /// A frame sharing `caller`'s variables.
    pub fn gosub(return_pc: usize, caller: &Frame) -> Self {
        Self {
            kind: FrameKind::Gosub,
            return_pc,
            variables: Rc::clone(&caller.variables),
        }
    }

    /// Marks a GOSUB frame as an event handler's.
    pub fn into_event(mut self) -> Self {
        self.kind = FrameKind::Event;
        self
    }

    pub fn lookup(&self, name: &str) -> Option<Cell> {
        self.variables.borrow().get(name).cloned()
    }

    pub fn insert(&self, name: &str, cell: Cell) {
        self.variables.borrow_mut().insert(name.to_string(), cell);
    }
}

/// An operand stack entry.
#[derive(Debug, Clone)]
pub enum StackItem {
    Value(Value),
    /// A variable, array slot or record member, for BY-REF passing and
    /// assignment.
    Ref(Cell),
}

impl StackItem {
    /// The value, reading through a reference.
    pub fn into_value(self) -> Value {
        match self {
            StackItem::Value(value) => value,
            StackItem::Ref(cell) => cell.borrow().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cell;

    #[test]
    fn test_gosub_shares_variables() {
        let main = Frame::main();
        main.insert("X", cell(Value::Integer(1)));
        let gosub = Frame::gosub(5, &main);
        assert!(gosub.lookup("X").is_some());
        gosub.insert("Y", cell(Value::Integer(2)));
        assert!(main.lookup("Y").is_some());
    }

    #[test]
    fn test_call_frame_is_fresh() {
        let main = Frame::main();
        main.insert("X", cell(Value::Integer(1)));
        let call = Frame::call(5);
        assert!(call.lookup("X").is_none());
    }

    #[test]
    fn test_ref_reads_through() {
        let c = cell(Value::Long(9));
        let item = StackItem::Ref(Rc::clone(&c));
        *c.borrow_mut() = Value::Long(10);
        assert_eq!(item.into_value(), Value::Long(10));
    }
}
