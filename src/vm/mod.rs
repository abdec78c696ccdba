//! The qbvm virtual machine.
//!
//! A stack-based interpreter for linked [`QBasicProgram`]s. The VM owns an
//! operand stack, a call-frame stack whose first frame is the main module,
//! and the device adapters a host installs through [`Devices`].
//!
//! # States
//!
//! ```text
//! Idle ─▶ Running ◀─▶ Suspended
//!            │  ╲         │
//!            ▼   ╲        ▼
//!        Finished ╲──▶  Error
//! ```
//!
//! # Scheduling
//!
//! [`Vm::run`] executes synchronously until the program ends, performing
//! device requests inline. [`Vm::run_async`] runs time- and
//! instruction-budgeted slices on a tokio interval, so an interactive
//! program shares the host's event loop. Hosts that drive devices
//! themselves call [`Vm::step`] or [`Vm::tick`], read [`Vm::pending`] when
//! the VM suspends, and deliver the result with [`Vm::resume`].
//!
//! # Example
//!
//! ```
//! use qbvm::builtins::Registry;
//! use qbvm::vm::{Devices, Vm};
//! use qbvm_runtime::RecordingConsole;
//! use std::rc::Rc;
//!
//! let registry = Rc::new(Registry::standard());
//! let program = qbvm::compile("PRINT 1 + 2", &registry).unwrap();
//!
//! let console = RecordingConsole::new();
//! let mut vm = Vm::new(Devices::new(console.clone()), registry);
//! vm.run(program).unwrap();
//! assert_eq!(console.output(), "3\n");
//! ```

pub mod arith;
pub mod error;
mod exec;
mod files;
mod frame;
mod pending;
mod scheduler;

pub use error::RuntimeError;
pub use files::OpenFile;
pub use frame::{Frame, FrameKind, StackItem};
pub use pending::{Completion, DeviceReply, DeviceRequest, FileFlush, Pending};

use crate::builtins::Registry;
use crate::codegen::QBasicProgram;
use crate::types::{Cell, Type, Value, cell};
use qbvm_runtime::math::Rnd;
use qbvm_runtime::string;
use qbvm_runtime::{
    AudioDevice, Console, Crypto, DeviceError, FileSystem, Gamepad, IoBus, NetworkDevice, Pointer,
};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Width of a PRINT comma zone.
pub const PRINT_ZONE_WIDTH: usize = 14;

/// Scheduler and resource limits.
#[derive(Debug, Clone, PartialEq)]
pub struct VmConfig {
    /// Period of the asynchronous scheduler.
    pub tick_interval: Duration,
    /// Instructions executed per tick at most.
    pub instruction_budget: usize,
    /// Wall-clock time per tick at most.
    pub time_slice: Duration,
    /// Frames beyond this raise an overflow error.
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(66),
            instruction_budget: 2000,
            time_slice: Duration::from_millis(10),
            max_call_depth: 10_000,
        }
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Idle,
    Running,
    Suspended,
    Finished,
    Error,
}

/// Lifecycle notifications delivered to [`Vm::subscribe`]rs.
#[derive(Debug, Clone, PartialEq)]
pub enum VmEvent {
    Reset,
    Running,
    Suspended,
    Finished,
    Error(RuntimeError),
}

/// The capabilities a host gives the VM. Only the console is mandatory.
pub struct Devices {
    pub console: Box<dyn Console>,
    pub audio: Option<Box<dyn AudioDevice>>,
    pub network: Option<Box<dyn NetworkDevice>>,
    pub fs: Option<Box<dyn FileSystem>>,
    pub io: Option<Box<dyn IoBus>>,
    pub crypto: Option<Box<dyn Crypto>>,
    pub gamepad: Option<Box<dyn Gamepad>>,
    pub pointer: Option<Box<dyn Pointer>>,
}

impl Devices {
    pub fn new(console: impl Console + 'static) -> Self {
        Self {
            console: Box::new(console),
            audio: None,
            network: None,
            fs: None,
            io: None,
            crypto: None,
            gamepad: None,
            pointer: None,
        }
    }

    pub fn with_audio(mut self, audio: impl AudioDevice + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    pub fn with_network(mut self, network: impl NetworkDevice + 'static) -> Self {
        self.network = Some(Box::new(network));
        self
    }

    pub fn with_fs(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Some(Box::new(fs));
        self
    }

    pub fn with_io(mut self, io: impl IoBus + 'static) -> Self {
        self.io = Some(Box::new(io));
        self
    }

    pub fn with_crypto(mut self, crypto: impl Crypto + 'static) -> Self {
        self.crypto = Some(Box::new(crypto));
        self
    }

    pub fn with_gamepad(mut self, gamepad: impl Gamepad + 'static) -> Self {
        self.gamepad = Some(Box::new(gamepad));
        self
    }

    pub fn with_pointer(mut self, pointer: impl Pointer + 'static) -> Self {
        self.pointer = Some(Box::new(pointer));
        self
    }

    /// Restores every adapter to its power-on state.
    fn reset(&mut self) {
        self.console.reset();
        if let Some(audio) = &mut self.audio {
            audio.reset();
        }
        if let Some(network) = &mut self.network {
            network.reset();
        }
        if let Some(fs) = &mut self.fs {
            fs.reset();
        }
        if let Some(io) = &mut self.io {
            io.reset();
        }
    }
}

/// The virtual machine.
pub struct Vm {
    config: VmConfig,
    registry: Rc<Registry>,
    pub devices: Devices,
    program: Rc<QBasicProgram>,
    pc: usize,
    stack: Vec<StackItem>,
    frames: Vec<Frame>,
    state: VmState,
    pending: Option<Pending>,
    /// Code of the last recoverable error, 0 after a successful device call.
    status: u16,
    default_types: [Type; 26],
    data_pointer: usize,
    /// Event key to handler address.
    handlers: HashMap<String, usize>,
    events: VecDeque<(String, String)>,
    event_data: String,
    files: HashMap<i64, OpenFile>,
    /// File number PRINT and WRITE currently go to; `None` is the console.
    output: Option<i64>,
    column: usize,
    rnd: Rnd,
    subscribers: Vec<mpsc::UnboundedSender<VmEvent>>,
}

impl Vm {
    pub fn new(devices: Devices, registry: Rc<Registry>) -> Self {
        Self {
            config: VmConfig::default(),
            registry,
            devices,
            program: Rc::new(QBasicProgram::default()),
            pc: 0,
            stack: Vec::new(),
            frames: vec![Frame::main()],
            state: VmState::Idle,
            pending: None,
            status: 0,
            default_types: std::array::from_fn(|_| Type::default()),
            data_pointer: 0,
            handlers: HashMap::new(),
            events: VecDeque::new(),
            event_data: String::new(),
            files: HashMap::new(),
            output: None,
            column: 0,
            rnd: Rnd::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    /// Index of the next instruction to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn program(&self) -> &QBasicProgram {
        &self.program
    }

    /// The operation the VM is suspended on, if any.
    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    /// Number of entries on the operand stack.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of active frames, the main frame included.
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns a receiver for lifecycle events.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<VmEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: VmEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_state(&mut self, state: VmState) {
        if self.state == state {
            return;
        }
        log::debug!("vm: {:?} -> {:?} at pc {}", self.state, state, self.pc);
        self.state = state;
        match state {
            VmState::Running => self.emit(VmEvent::Running),
            VmState::Suspended => self.emit(VmEvent::Suspended),
            VmState::Finished => self.emit(VmEvent::Finished),
            VmState::Idle | VmState::Error => {}
        }
    }

    fn fail(&mut self, err: RuntimeError) {
        log::debug!("vm: error {}", err);
        self.state = VmState::Error;
        self.emit(VmEvent::Error(err));
    }

    // ==================== Lifecycle ====================

    /// Clears all execution state. With a program, also loads it and
    /// resets the device adapters.
    pub fn reset(&mut self, program: Option<Rc<QBasicProgram>>) {
        if let Some(program) = program {
            self.program = program;
            self.devices.reset();
            self.rnd = Rnd::new();
        }
        self.stack.clear();
        self.frames = vec![Frame::main()];
        self.pc = 0;
        self.pending = None;
        self.status = 0;
        self.default_types = std::array::from_fn(|_| self.program.default_type.clone());
        self.data_pointer = 0;
        self.handlers.clear();
        self.events.clear();
        self.event_data.clear();
        self.files.clear();
        self.output = None;
        self.column = 0;
        self.state = VmState::Idle;
        log::debug!(
            "vm: reset ({} instructions)",
            self.program.instructions.len()
        );
        self.emit(VmEvent::Reset);
    }

    /// Loads `program`, leaving the VM idle at its first instruction.
    pub fn load(&mut self, program: impl Into<Rc<QBasicProgram>>) {
        self.reset(Some(program.into()));
    }

    /// Runs `program` to completion, servicing device requests inline.
    pub fn run(&mut self, program: impl Into<Rc<QBasicProgram>>) -> Result<(), RuntimeError> {
        self.load(program);
        self.set_state(VmState::Running);
        loop {
            match self.state {
                VmState::Running | VmState::Idle => {
                    self.step()?;
                }
                VmState::Suspended => self.service_pending()?,
                VmState::Finished | VmState::Error => return Ok(()),
            }
        }
    }

    /// Executes exactly one instruction.
    ///
    /// Returns `false` without doing anything while the VM is suspended,
    /// finished or stopped by an error.
    pub fn step(&mut self) -> Result<bool, RuntimeError> {
        if self.state == VmState::Idle {
            self.set_state(VmState::Running);
        }
        if self.state != VmState::Running {
            return Ok(false);
        }
        self.deliver_event();

        let program = Rc::clone(&self.program);
        let Some(instruction) = program.instructions.get(self.pc) else {
            self.set_state(VmState::Finished);
            return Ok(false);
        };
        log::trace!("{:04} {} ({})", self.pc, instruction.op, instruction.locus);
        self.pc += 1;

        if let Err(err) = self.execute(&instruction.op) {
            let err = err.with_locus(instruction.locus);
            self.fail(err.clone());
            return Err(err);
        }
        if self.pc >= program.instructions.len() && self.state == VmState::Running {
            self.set_state(VmState::Finished);
        }
        Ok(true)
    }

    // ==================== Suspension ====================

    /// Freezes the VM until [`Vm::resume`] delivers the result of `request`.
    pub fn suspend(
        &mut self,
        request: DeviceRequest,
        completion: Completion,
    ) -> Result<(), RuntimeError> {
        if self.pending.is_some() {
            return Err(RuntimeError::internal("suspended twice without a resume"));
        }
        log::debug!("vm: suspend on {:?}", request);
        self.pending = Some(Pending {
            request,
            completion,
        });
        self.set_state(VmState::Suspended);
        Ok(())
    }

    /// Completes the outstanding operation and lets execution continue.
    ///
    /// A device failure is recorded in the status register; function
    /// builtins still get a default-valued result.
    pub fn resume(&mut self, reply: Result<DeviceReply, DeviceError>) -> Result<(), RuntimeError> {
        let Some(pending) = self.pending.take() else {
            return Err(RuntimeError::internal("resume without a pending operation"));
        };
        log::debug!("vm: resume from {:?}", pending.request);

        let result = match reply {
            Ok(reply) => {
                self.status = 0;
                self.complete(pending.completion, reply)
            }
            Err(err) => {
                log::warn!("device error: {}", err);
                self.status = err.code();
                match pending.completion {
                    Completion::PushString => self.push(Value::String(String::new())),
                    Completion::PushLong => self.push(Value::Long(0)),
                    _ => {}
                }
                Ok(())
            }
        };

        if let Err(err) = result {
            self.fail(err.clone());
            return Err(err);
        }
        self.set_state(VmState::Running);
        Ok(())
    }

    fn complete(&mut self, completion: Completion, reply: DeviceReply) -> Result<(), RuntimeError> {
        let text = match reply {
            DeviceReply::Text(text) => text,
            DeviceReply::Handle(handle) => {
                if let Completion::PushLong = completion {
                    self.push(Value::Long(handle));
                }
                return Ok(());
            }
            DeviceReply::Done => String::new(),
        };

        match completion {
            Completion::Ignore => Ok(()),
            Completion::Input(targets) => {
                let mut fields = text.split(',');
                for target in targets {
                    let field = fields.next().unwrap_or("").trim();
                    let value = input_value(&target, field);
                    store(&target, value)?;
                }
                Ok(())
            }
            Completion::LineInput(target) => store(&target, Value::String(text)),
            Completion::OpenInput { file_num, path } => {
                self.files.insert(file_num, OpenFile::input(path, text));
                Ok(())
            }
            Completion::PushString => {
                self.push(Value::String(text));
                Ok(())
            }
            Completion::PushLong => {
                self.push(Value::Long(string::val(&text) as i32));
                Ok(())
            }
        }
    }

    /// Performs the pending request against the installed devices, then
    /// resumes.
    pub fn service_pending(&mut self) -> Result<(), RuntimeError> {
        let Some(request) = self.pending.as_ref().map(|p| p.request.clone()) else {
            return Ok(());
        };
        let reply = self.perform(request);
        self.resume(reply)
    }

    fn perform(&mut self, request: DeviceRequest) -> Result<DeviceReply, DeviceError> {
        let unsupported = |what: &str| DeviceError::Unsupported(what.to_string());
        match request {
            DeviceRequest::ReadLine => self.devices.console.read_line().map(DeviceReply::Text),
            DeviceRequest::ReadFile { path } => {
                let fs = self.devices.fs.as_mut().ok_or_else(|| unsupported("file system"))?;
                fs.read(&path).map(DeviceReply::Text)
            }
            DeviceRequest::WriteFiles(flushes) => {
                let fs = self.devices.fs.as_mut().ok_or_else(|| unsupported("file system"))?;
                for flush in flushes {
                    fs.write(&flush.path, &flush.contents, flush.append)?;
                }
                Ok(DeviceReply::Done)
            }
            DeviceRequest::Fetch { url } => {
                let network = self.devices.network.as_mut().ok_or_else(|| unsupported("network"))?;
                network.fetch(&url).map(DeviceReply::Text)
            }
            DeviceRequest::WsOpen { url } => {
                let network = self.devices.network.as_mut().ok_or_else(|| unsupported("network"))?;
                network.ws_open(&url).map(DeviceReply::Handle)
            }
            DeviceRequest::Digest { algorithm, data } => {
                let crypto = self.devices.crypto.as_mut().ok_or_else(|| unsupported("crypto"))?;
                crypto.digest(&algorithm, &data).map(DeviceReply::Text)
            }
            DeviceRequest::LoadSound { name, url } => {
                let audio = self.devices.audio.as_mut().ok_or_else(|| unsupported("audio"))?;
                audio.load_sound(&name, &url).map(|()| DeviceReply::Done)
            }
            DeviceRequest::Sleep(duration) => {
                std::thread::sleep(duration);
                Ok(DeviceReply::Done)
            }
        }
    }

    // ==================== Events ====================

    /// Queues an inbound I/O-bus event for its `ON EVENT` handler.
    pub fn dispatch_event(&mut self, key: impl Into<String>, data: impl Into<String>) {
        self.events.push_back((key.into(), data.into()));
    }

    /// Enters the handler of the next queued event, GOSUB-style. Handlers
    /// do not nest.
    fn deliver_event(&mut self) {
        if let Some(io) = &mut self.devices.io {
            while let Some(event) = io.poll_event() {
                self.events.push_back(event);
            }
        }
        if self.events.is_empty() || self.frames.iter().any(|f| f.kind == FrameKind::Event) {
            return;
        }
        let Some((key, data)) = self.events.pop_front() else {
            return;
        };
        let Some(&handler) = self.handlers.get(&key) else {
            log::trace!("vm: dropped event {:?} with no handler", key);
            return;
        };
        log::debug!("vm: delivering event {:?}", key);
        self.event_data = data;
        // Handler labels are module-level code, even when the event lands
        // inside a SUB.
        let frame = Frame::gosub(self.pc, &self.frames[0]).into_event();
        self.frames.push(frame);
        self.pc = handler;
    }

    /// Data of the event being handled (EVENTDATA$).
    pub fn event_data(&self) -> &str {
        &self.event_data
    }

    // ==================== Variables ====================

    fn frame(&self) -> &Frame {
        // frames[0] is never popped.
        &self.frames[self.frames.len() - 1]
    }

    /// The frame that owns `name`: main for shared names, else the
    /// current one.
    fn owner(&self, name: &str) -> &Frame {
        if self.program.shared.contains(name) {
            &self.frames[0]
        } else {
            self.frame()
        }
    }

    /// Type of an undeclared variable: its sigil, else the letter's default.
    pub fn implicit_type(&self, name: &str) -> Type {
        Type::from_sigil(name).unwrap_or_else(|| {
            name.chars()
                .next()
                .filter(char::is_ascii_alphabetic)
                .map(|c| self.default_types[(c.to_ascii_uppercase() as u8 - b'A') as usize].clone())
                .unwrap_or_else(|| self.program.default_type.clone())
        })
    }

    /// The cell holding `name`, created with a default value on first use.
    pub fn get_variable(&self, name: &str) -> Cell {
        let owner = self.owner(name);
        if let Some(existing) = owner.lookup(name) {
            return existing;
        }
        let created = cell(self.implicit_type(name).default_value());
        owner.insert(name, Rc::clone(&created));
        created
    }

    /// Stores `value` into `name`, coerced to the variable's type.
    pub fn set_variable(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        store(&self.get_variable(name), value)
    }

    /// Binds `name` to `storage` in the frame that owns it.
    fn bind(&self, name: &str, storage: Cell) {
        self.owner(name).insert(name, storage);
    }

    // ==================== Operand stack ====================

    pub fn push(&mut self, value: Value) {
        self.stack.push(StackItem::Value(value));
    }

    pub fn push_ref(&mut self, storage: Cell) {
        self.stack.push(StackItem::Ref(storage));
    }

    pub fn pop(&mut self) -> Result<StackItem, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::internal("stack underflow"))
    }

    /// Pops a value, reading through a reference.
    pub fn pop_value(&mut self) -> Result<Value, RuntimeError> {
        self.pop().map(StackItem::into_value)
    }

    /// Pops a reference pushed for assignment or BY-REF passing.
    pub fn pop_ref(&mut self) -> Result<Cell, RuntimeError> {
        match self.pop()? {
            StackItem::Ref(storage) => Ok(storage),
            StackItem::Value(value) => Err(RuntimeError::internal(format!(
                "expected a reference, found {}",
                value.type_name()
            ))),
        }
    }

    pub fn pop_string(&mut self) -> Result<String, RuntimeError> {
        match self.pop_value()? {
            Value::String(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Err(RuntimeError::type_mismatch(format!(
                "expected STRING, found {}",
                other.type_name()
            ))),
        }
    }

    pub fn pop_f64(&mut self) -> Result<f64, RuntimeError> {
        let value = self.pop_value()?;
        value.as_f64().ok_or_else(|| {
            RuntimeError::type_mismatch(format!("expected a number, found {}", value.type_name()))
        })
    }

    /// Pops a number rounded half-to-even.
    pub fn pop_i64(&mut self) -> Result<i64, RuntimeError> {
        self.pop_f64().map(|n| n.round_ties_even() as i64)
    }

    /// Pops the trailing argument count of a builtin with optional
    /// arguments.
    pub fn pop_arg_count(&mut self, max: usize) -> Result<usize, RuntimeError> {
        let count = self.pop_i64()?;
        usize::try_from(count)
            .ok()
            .filter(|&n| n <= max)
            .ok_or_else(|| RuntimeError::internal(format!("bad argument count {}", count)))
    }

    // ==================== Output ====================

    /// Writes text to the console, or to the file selected by PRINT #.
    pub fn print(&mut self, text: &str) -> Result<(), RuntimeError> {
        if let Some(file_num) = self.output {
            let file = self
                .files
                .get_mut(&file_num)
                .filter(|file| !file.is_input())
                .ok_or_else(|| RuntimeError::bad_file_number(file_num))?;
            file.write(text);
            return Ok(());
        }
        self.devices.console.print(text);
        match text.rfind('\n') {
            Some(i) => self.column = text[i + 1..].chars().count(),
            None => self.column += text.chars().count(),
        }
        Ok(())
    }

    /// Current output column, 0-based.
    pub fn column(&self) -> usize {
        match self.output {
            Some(file_num) => self.files.get(&file_num).map_or(0, |f| f.column),
            None => self.column,
        }
    }

    /// Sends PRINT and WRITE to an open OUTPUT/APPEND file, or back to the
    /// console with `None`.
    pub fn select_output(&mut self, file_num: Option<i64>) -> Result<(), RuntimeError> {
        // Selected even when invalid, so the PRINT items that follow fail
        // too instead of reaching the console.
        self.output = file_num;
        match file_num {
            Some(n) if self.files.get(&n).is_none_or(OpenFile::is_input) => {
                Err(RuntimeError::bad_file_number(n))
            }
            _ => Ok(()),
        }
    }

    // ==================== Builtin support ====================

    /// Code of the last recoverable error (ERR).
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, code: u16) {
        self.status = code;
    }

    pub fn rnd(&mut self) -> &mut Rnd {
        &mut self.rnd
    }

    pub fn files(&mut self) -> &mut HashMap<i64, OpenFile> {
        &mut self.files
    }

    /// The next DATA item.
    pub fn next_data(&mut self) -> Result<Value, RuntimeError> {
        let value = self
            .program
            .data
            .get(self.data_pointer)
            .cloned()
            .ok_or_else(|| RuntimeError::new(error::OUT_OF_DATA, "out of DATA"))?;
        self.data_pointer += 1;
        Ok(value)
    }
}

/// Stores `value` into `storage` through the type of what it holds.
pub fn store(storage: &Cell, value: Value) -> Result<(), RuntimeError> {
    let ty = storage.borrow().ty();
    let value = match ty {
        Type::Null => value,
        ty => ty.copy(&value)?,
    };
    *storage.borrow_mut() = value;
    Ok(())
}

/// Interprets one INPUT field for `target`: text for strings, VAL for
/// numbers.
pub fn input_value(target: &Cell, field: &str) -> Value {
    if matches!(*target.borrow(), Value::String(_)) {
        Value::String(field.trim_matches('"').to_string())
    } else {
        Value::Double(string::val(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbvm_runtime::RecordingConsole;

    fn vm() -> (Vm, RecordingConsole) {
        let console = RecordingConsole::new();
        let vm = Vm::new(Devices::new(console.clone()), Rc::new(Registry::standard()));
        (vm, console)
    }

    #[test]
    fn test_lazy_variables_use_sigils() {
        let (vm, _) = vm();
        assert_eq!(*vm.get_variable("A$").borrow(), Value::String(String::new()));
        assert_eq!(*vm.get_variable("N%").borrow(), Value::Integer(0));
        assert_eq!(*vm.get_variable("X").borrow(), Value::Single(0.0));
    }

    #[test]
    fn test_set_variable_coerces() {
        let (vm, _) = vm();
        vm.set_variable("N%", Value::Double(32768.0)).unwrap();
        assert_eq!(*vm.get_variable("N%").borrow(), Value::Integer(-32768));
        assert!(vm.set_variable("N%", Value::from("x")).is_err());
    }

    #[test]
    fn test_stack_underflow_is_internal() {
        let (mut vm, _) = vm();
        assert_eq!(vm.pop().unwrap_err().code, error::INTERNAL_ERROR);
    }

    #[test]
    fn test_print_tracks_column() {
        let (mut vm, console) = vm();
        vm.print("abc").unwrap();
        assert_eq!(vm.column(), 3);
        vm.print("x\nyz").unwrap();
        assert_eq!(vm.column(), 2);
        assert_eq!(console.output(), "abcx\nyz");
    }

    #[test]
    fn test_resume_without_pending() {
        let (mut vm, _) = vm();
        assert!(vm.resume(Ok(DeviceReply::Done)).is_err());
    }

    #[test]
    fn test_double_suspend_rejected() {
        let (mut vm, _) = vm();
        vm.suspend(DeviceRequest::ReadLine, Completion::Ignore).unwrap();
        assert!(vm.suspend(DeviceRequest::ReadLine, Completion::Ignore).is_err());
    }

    #[test]
    fn test_input_completion_splits_fields() {
        let (mut vm, _) = vm();
        let name = vm.get_variable("NAME$");
        let age = vm.get_variable("AGE%");
        vm.suspend(
            DeviceRequest::ReadLine,
            Completion::Input(vec![Rc::clone(&name), Rc::clone(&age)]),
        )
        .unwrap();
        vm.resume(Ok(DeviceReply::Text("Ada, 36".to_string()))).unwrap();
        assert_eq!(*name.borrow(), Value::from("Ada"));
        assert_eq!(*age.borrow(), Value::Integer(36));
        assert_eq!(vm.state(), VmState::Running);
    }

    #[test]
    fn test_failed_device_sets_status() {
        let (mut vm, _) = vm();
        vm.suspend(
            DeviceRequest::ReadFile {
                path: "missing.txt".to_string(),
            },
            Completion::PushString,
        )
        .unwrap();
        // No file system installed.
        vm.service_pending().unwrap();
        assert_eq!(vm.status(), error::FEATURE_UNAVAILABLE);
        assert_eq!(vm.pop_value().unwrap(), Value::from(""));
    }
}
