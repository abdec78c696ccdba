//! Builtin function and subroutine registry.
//!
//! Every builtin is plain data: a name, a signature and a function pointer
//! that works on the VM's operand stack. The type checker validates calls
//! against the signature, the code generator lowers calls to `SYSCALL name`,
//! and the VM looks the name up again when the instruction executes.
//!
//! # Calling convention
//!
//! Arguments are pushed left to right, so an action pops them in reverse.
//! When a builtin's minimum and maximum argument counts differ, the caller
//! pushes the actual count last and the action pops it first. A function
//! pushes exactly one result.
//!
//! # Internal syscalls
//!
//! Statements such as PRINT and INPUT lower to syscalls whose names start
//! with `_`. The lexer never produces such identifiers, so BASIC code cannot
//! call them directly.
//!
//! # Example
//!
//! ```
//! use qbvm::builtins::{Builtin, Registry};
//! use qbvm::types::{Type, Value};
//!
//! let mut registry = Registry::standard();
//! registry.register_function(Builtin::function("ANSWER", Type::Integer, vec![], |vm| {
//!     vm.push(Value::Integer(42));
//!     Ok(())
//! }));
//! assert!(registry.function("ANSWER").is_some());
//! ```

mod audio;
mod console;
mod files;
mod internals;
mod io;
mod json;
mod math;
mod misc;
mod net;
mod strings;

use crate::types::Type;
use crate::vm::{RuntimeError, Vm};
use std::collections::HashMap;
use std::fmt;

/// The native half of a builtin.
pub type Action = fn(&mut Vm) -> Result<(), RuntimeError>;

/// Signature and implementation of one builtin.
#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    /// `Some` for functions, `None` for subroutines.
    pub return_type: Option<Type>,
    pub arg_types: Vec<Type>,
    pub min_args: usize,
    /// Lvalue arguments are passed as references (`SWAP`).
    pub by_ref: bool,
    pub action: Action,
}

impl Builtin {
    /// A function taking exactly `arg_types`.
    pub fn function(name: &str, return_type: Type, arg_types: Vec<Type>, action: Action) -> Self {
        Self {
            name: name.to_string(),
            return_type: Some(return_type),
            min_args: arg_types.len(),
            arg_types,
            by_ref: false,
            action,
        }
    }

    /// A subroutine taking exactly `arg_types`.
    pub fn sub(name: &str, arg_types: Vec<Type>, action: Action) -> Self {
        Self {
            name: name.to_string(),
            return_type: None,
            min_args: arg_types.len(),
            arg_types,
            by_ref: false,
            action,
        }
    }

    /// Makes every argument after the first `min_args` optional.
    pub fn optional(mut self, min_args: usize) -> Self {
        self.min_args = min_args.min(self.arg_types.len());
        self
    }

    /// Passes lvalue arguments by reference.
    pub fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    pub fn max_args(&self) -> usize {
        self.arg_types.len()
    }

    /// Whether callers push a trailing argument count.
    pub fn counts_args(&self) -> bool {
        self.min_args != self.max_args()
    }

    pub fn is_function(&self) -> bool {
        self.return_type.is_some()
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("arg_types", &self.arg_types)
            .field("min_args", &self.min_args)
            .finish()
    }
}

/// Name-keyed builtin tables, one for functions and one for subroutines.
///
/// A registry is owned by whoever compiles and runs a program, so hosts can
/// run several VMs with different syscall sets side by side.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: HashMap<String, Builtin>,
    subs: HashMap<String, Builtin>,
}

impl Registry {
    /// An empty registry. Statements like PRINT need [`Registry::standard`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The full builtin library plus the internal statement syscalls.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        internals::register(&mut registry);
        math::register(&mut registry);
        strings::register(&mut registry);
        console::register(&mut registry);
        files::register(&mut registry);
        json::register(&mut registry);
        net::register(&mut registry);
        audio::register(&mut registry);
        io::register(&mut registry);
        misc::register(&mut registry);
        log::debug!(
            "standard registry: {} functions, {} subs",
            registry.functions.len(),
            registry.subs.len()
        );
        registry
    }

    /// Adds or replaces a function. Names are matched upper-case.
    pub fn register_function(&mut self, builtin: Builtin) {
        self.functions
            .insert(builtin.name.to_ascii_uppercase(), builtin);
    }

    /// Adds or replaces a subroutine. Names are matched upper-case.
    pub fn register_sub(&mut self, builtin: Builtin) {
        self.subs.insert(builtin.name.to_ascii_uppercase(), builtin);
    }

    pub fn function(&self, name: &str) -> Option<&Builtin> {
        self.functions.get(&name.to_ascii_uppercase())
    }

    pub fn sub(&self, name: &str) -> Option<&Builtin> {
        self.subs.get(&name.to_ascii_uppercase())
    }

    /// Function first, then subroutine; how `SYSCALL` resolves a name.
    pub fn lookup(&self, name: &str) -> Option<&Builtin> {
        self.function(name).or_else(|| self.sub(name))
    }
}

/// `Type::Array` with an unknown element type and rank.
pub(crate) fn any_array() -> Type {
    Type::Array {
        element: Box::new(Type::Any),
        dims: 0,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Compile-and-run helpers for builtin tests.

    use super::Registry;
    use crate::vm::{Devices, RuntimeError, Vm};
    use qbvm_runtime::RecordingConsole;
    use std::rc::Rc;

    /// Runs `source` against `devices`, returning the VM for inspection.
    pub fn run_on(source: &str, devices: Devices) -> (Vm, Result<(), RuntimeError>) {
        let registry = Rc::new(Registry::standard());
        let program = crate::compile(source, &registry).unwrap();
        let mut vm = Vm::new(devices, registry);
        let result = vm.run(program);
        (vm, result)
    }

    /// Console output of a program fed `input` lines.
    pub fn run_input(source: &str, input: &[&str]) -> String {
        let console = RecordingConsole::with_input(input.iter().copied());
        let (_, result) = run_on(source, Devices::new(console.clone()));
        result.unwrap();
        console.output()
    }

    pub fn run(source: &str) -> String {
        run_input(source, &[])
    }

    /// The fatal error a program stops with.
    pub fn run_err(source: &str) -> RuntimeError {
        let (_, result) = run_on(source, Devices::new(RecordingConsole::new()));
        result.unwrap_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_contents() {
        let registry = Registry::standard();
        assert!(registry.function("LEFT$").is_some());
        assert!(registry.function("left$").is_some());
        assert!(registry.sub("CLS").is_some());
        assert!(registry.sub("_PRINT").is_some());
        assert!(registry.function("CLS").is_none());
    }

    #[test]
    fn test_optional_arguments() {
        let registry = Registry::standard();
        let mid = registry.function("MID$").unwrap();
        assert_eq!(mid.min_args, 2);
        assert_eq!(mid.max_args(), 3);
        assert!(mid.counts_args());

        let len = registry.function("LEN").unwrap();
        assert!(!len.counts_args());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = Registry::standard();
        registry.register_function(Builtin::function("LEN", Type::Long, vec![], |_| Ok(())));
        assert!(registry.function("LEN").unwrap().arg_types.is_empty());
    }
}
