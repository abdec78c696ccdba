//! Outstanding external operations.
//!
//! A builtin that needs a slow device does not call it. It records a
//! [`Pending`] operation and suspends the VM; the host (or
//! [`Vm::service_pending`](super::Vm::service_pending)) performs the
//! request and hands the [`DeviceReply`] back through
//! [`Vm::resume`](super::Vm::resume), which runs the [`Completion`] and
//! lets execution continue at the instruction after the syscall.

use crate::types::Cell;
use std::time::Duration;

/// Buffered contents of a closed OUTPUT or APPEND file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFlush {
    pub path: String,
    pub contents: String,
    pub append: bool,
}

/// What the VM is waiting for.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceRequest {
    /// One line from the console.
    ReadLine,
    /// A whole file, for `OPEN ... FOR INPUT`.
    ReadFile { path: String },
    /// Files written back on CLOSE.
    WriteFiles(Vec<FileFlush>),
    Fetch { url: String },
    WsOpen { url: String },
    Digest { algorithm: String, data: String },
    LoadSound { name: String, url: String },
    Sleep(Duration),
}

/// The result of a [`DeviceRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceReply {
    /// No data, only completion.
    Done,
    Text(String),
    Handle(i32),
}

/// What to do with the reply once it arrives.
#[derive(Debug, Clone)]
pub enum Completion {
    /// Nothing beyond clearing the status.
    Ignore,
    /// Split a console line on commas into these targets (`INPUT`).
    Input(Vec<Cell>),
    /// Store the whole line (`LINE INPUT`).
    LineInput(Cell),
    /// Install the text as an open INPUT file.
    OpenInput { file_num: i64, path: String },
    /// Push the text as a function result.
    PushString,
    /// Push the handle as a LONG function result.
    PushLong,
}

/// An external operation the VM is suspended on.
#[derive(Debug, Clone)]
pub struct Pending {
    pub request: DeviceRequest,
    pub completion: Completion,
}
