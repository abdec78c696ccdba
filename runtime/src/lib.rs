//! qbvm Runtime Library
//!
//! Everything the virtual machine needs from the outside world lives here:
//! the capability traits a host implements to give BASIC programs a screen,
//! speakers, a network, a file system and so on, a handful of reference
//! adapters, and the pure BASIC helper functions (math, strings, number
//! formatting) that the builtin table calls into.
//!
//! # Architecture
//!
//! The runtime is organized into modules:
//! - `devices` - Capability traits (`Console`, `FileSystem`, `NetworkDevice`, ...)
//! - `console` - Headless recording console and a stdio console
//! - `fs` - In-memory and host file systems
//! - `math` - Numeric helpers and the QBasic RND generator
//! - `string` - String helpers, number formatting and `PRINT USING`
//! - `error` - `DeviceError`
//!
//! Device adapters are free-standing: the VM only ever calls into them by
//! method and never hands them a reference back to itself.

pub mod console;
pub mod devices;
pub mod error;
pub mod fs;
pub mod math;
pub mod string;

pub use console::{RecordingConsole, StdioConsole};
pub use devices::{AudioDevice, Console, Crypto, FileSystem, Gamepad, IoBus, NetworkDevice, Pointer};
pub use error::DeviceError;
pub use fs::{MemoryFileSystem, StdFileSystem};
