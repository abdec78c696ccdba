//! Capability traits.
//!
//! The VM is constructed with a [`Console`] and, optionally, any of the other
//! capabilities below. Each one is a narrow interface: the VM calls methods
//! on it and never the other way round. Inbound events (for example keyed
//! messages arriving on an [`IoBus`]) are pulled by the VM through
//! [`IoBus::poll_event`] or pushed by the host through the VM's own event
//! queue.
//!
//! Methods are synchronous. When a real device is asynchronous the host
//! drives the VM by hand instead: it reads the VM's pending operation,
//! performs it however it likes, and delivers the result with `resume`.

use crate::error::DeviceError;

/// Text console. The only mandatory capability.
pub trait Console {
    /// Writes text at the cursor. Newlines are part of `text`.
    fn print(&mut self, text: &str);

    /// Blocks until a full line of input is available (without the newline).
    fn read_line(&mut self) -> Result<String, DeviceError>;

    /// Returns the next pending keystroke without blocking.
    fn inkey(&mut self) -> Option<String> {
        None
    }

    /// Clears the screen (CLS).
    fn cls(&mut self) {}

    /// Moves the cursor (LOCATE). `None` keeps the current coordinate.
    fn locate(&mut self, _row: Option<i32>, _column: Option<i32>) {}

    /// Sets text colors (COLOR). `None` keeps the current color.
    fn color(&mut self, _foreground: Option<i32>, _background: Option<i32>) {}

    /// Sounds the bell (BEEP).
    fn beep(&mut self) {}

    /// Restores power-on state. Called when the VM loads a new program.
    fn reset(&mut self) {}
}

/// Audio output.
pub trait AudioDevice {
    /// Plays a music macro string (PLAY).
    fn play(&mut self, music: &str) -> Result<(), DeviceError>;

    /// Plays a tone of `frequency` Hz for `duration` clock ticks (SOUND).
    fn sound(&mut self, frequency: f64, duration: f64) -> Result<(), DeviceError>;

    /// Fetches and decodes a sample under `name`. May take a while.
    fn load_sound(&mut self, name: &str, url: &str) -> Result<(), DeviceError>;

    /// Plays a sample previously loaded with [`AudioDevice::load_sound`].
    fn play_sound(&mut self, name: &str) -> Result<(), DeviceError>;

    fn reset(&mut self) {}
}

/// HTTP and WebSocket access.
pub trait NetworkDevice {
    /// Performs a GET request and returns the body.
    fn fetch(&mut self, url: &str) -> Result<String, DeviceError>;

    /// Opens a socket and returns its handle.
    fn ws_open(&mut self, url: &str) -> Result<i32, DeviceError>;

    fn ws_send(&mut self, handle: i32, message: &str) -> Result<(), DeviceError>;

    /// Returns the next queued message, or `None` when nothing has arrived.
    fn ws_recv(&mut self, handle: i32) -> Result<Option<String>, DeviceError>;

    fn reset(&mut self) {}
}

/// Whole-file storage.
pub trait FileSystem {
    fn read(&mut self, path: &str) -> Result<String, DeviceError>;

    /// Writes `contents`, replacing the file unless `append` is set.
    fn write(&mut self, path: &str, contents: &str, append: bool) -> Result<(), DeviceError>;

    fn reset(&mut self) {}
}

/// Generic keyed I/O bus.
pub trait IoBus {
    fn write(&mut self, key: &str, value: &str) -> Result<(), DeviceError>;

    fn read(&mut self, key: &str) -> Result<Option<String>, DeviceError>;

    /// Returns the next inbound `(key, data)` event, if any.
    fn poll_event(&mut self) -> Option<(String, String)> {
        None
    }

    fn reset(&mut self) {}
}

/// Hashing provider.
pub trait Crypto {
    /// Returns the lowercase hex digest of `data` under `algorithm`.
    fn digest(&mut self, algorithm: &str, data: &str) -> Result<String, DeviceError>;
}

/// Joystick / gamepad state.
pub trait Gamepad {
    /// Axis reading for STICK(n).
    fn stick(&self, axis: i32) -> i32;

    /// Button state for STRIG(n).
    fn trigger(&self, button: i32) -> bool;
}

/// Mouse or touch pointer state.
pub trait Pointer {
    fn position(&self) -> (i32, i32);

    fn is_down(&self) -> bool;
}
