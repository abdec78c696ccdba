//! Console adapters.
//!
//! - [`RecordingConsole`] - headless console for golden-output tests. It
//!   records everything printed and feeds scripted input lines.
//! - [`StdioConsole`] - terminal console using ANSI escape sequences.

use crate::devices::Console;
use crate::error::DeviceError;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

// ============================================================================
// Recording Console
// ============================================================================

#[derive(Debug, Default)]
struct Recording {
    output: String,
    input: VecDeque<String>,
    keys: VecDeque<String>,
    beeps: usize,
}

/// A console that records output instead of rendering it.
///
/// Clones share the same recording, so a test can hand one clone to the VM
/// and keep another to inspect the output afterwards.
///
/// # Example
///
/// ```
/// use qbvm_runtime::{Console, RecordingConsole};
///
/// let console = RecordingConsole::new();
/// let mut device = console.clone();
/// device.print("3\n");
/// assert_eq!(console.output(), "3\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingConsole {
    inner: Rc<RefCell<Recording>>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a console whose `read_line` returns `lines` in order.
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let console = Self::new();
        for line in lines {
            console.push_input(line);
        }
        console
    }

    /// Queues one more line of input.
    pub fn push_input(&self, line: impl Into<String>) {
        self.inner.borrow_mut().input.push_back(line.into());
    }

    /// Queues a keystroke for INKEY$.
    pub fn push_key(&self, key: impl Into<String>) {
        self.inner.borrow_mut().keys.push_back(key.into());
    }

    /// Everything printed so far.
    pub fn output(&self) -> String {
        self.inner.borrow().output.clone()
    }

    /// Number of BEEPs heard.
    pub fn beeps(&self) -> usize {
        self.inner.borrow().beeps
    }

    /// Discards the recorded output.
    pub fn clear(&self) {
        self.inner.borrow_mut().output.clear();
    }
}

impl Console for RecordingConsole {
    fn print(&mut self, text: &str) {
        self.inner.borrow_mut().output.push_str(text);
    }

    fn read_line(&mut self) -> Result<String, DeviceError> {
        let line = self.inner.borrow_mut().input.pop_front();
        match line {
            Some(line) => {
                // Echo like a terminal would, so transcripts read naturally.
                let mut inner = self.inner.borrow_mut();
                inner.output.push_str(&line);
                inner.output.push('\n');
                Ok(line)
            }
            None => Err(DeviceError::EndOfInput),
        }
    }

    fn inkey(&mut self) -> Option<String> {
        self.inner.borrow_mut().keys.pop_front()
    }

    fn beep(&mut self) {
        self.inner.borrow_mut().beeps += 1;
    }
}

// ============================================================================
// Stdio Console
// ============================================================================

/// A console on the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct StdioConsole;

impl StdioConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for StdioConsole {
    fn print(&mut self, text: &str) {
        let mut out = io::stdout();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn read_line(&mut self) -> Result<String, DeviceError> {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(DeviceError::EndOfInput);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }

    fn cls(&mut self) {
        self.print("\x1B[2J\x1B[H");
    }

    fn locate(&mut self, row: Option<i32>, column: Option<i32>) {
        match (row, column) {
            (Some(row), Some(col)) => self.print(&format!("\x1B[{};{}H", row, col)),
            (Some(row), None) => self.print(&format!("\x1B[{}d", row)),
            (None, Some(col)) => self.print(&format!("\x1B[{}G", col)),
            (None, None) => {}
        }
    }

    fn color(&mut self, foreground: Option<i32>, background: Option<i32>) {
        if let Some(fg) = foreground {
            self.print(&format!("\x1B[{}m", basic_to_ansi_color(fg)));
        }
        if let Some(bg) = background {
            // Background codes are +10
            self.print(&format!("\x1B[{}m", basic_to_ansi_color(bg) + 10));
        }
    }

    fn beep(&mut self) {
        self.print("\x07");
    }

    fn reset(&mut self) {
        self.print("\x1B[0m");
    }
}

/// Converts a BASIC color number to an ANSI color code.
fn basic_to_ansi_color(color: i32) -> i32 {
    // 0-7 map to ANSI 30-37, 8-15 to the bright range 90-97
    match color {
        0 => 30,
        1 => 34,
        2 => 32,
        3 => 36,
        4 => 31,
        5 => 35,
        6 => 33,
        7 => 37,
        8 => 90,
        9 => 94,
        10 => 92,
        11 => 96,
        12 => 91,
        13 => 95,
        14 => 93,
        15 => 97,
        _ => 37,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_shares_output() {
        let console = RecordingConsole::new();
        let mut handle = console.clone();
        handle.print("Hello");
        handle.print(", World\n");
        assert_eq!(console.output(), "Hello, World\n");
    }

    #[test]
    fn test_scripted_input() {
        let mut console = RecordingConsole::with_input(["42", "abc"]);
        assert_eq!(console.read_line().unwrap(), "42");
        assert_eq!(console.read_line().unwrap(), "abc");
        assert_eq!(console.read_line(), Err(DeviceError::EndOfInput));
        assert_eq!(console.output(), "42\nabc\n");
    }

    #[test]
    fn test_inkey_queue() {
        let mut console = RecordingConsole::new();
        assert_eq!(console.inkey(), None);
        console.push_key("A");
        assert_eq!(console.inkey(), Some("A".to_string()));
    }

    #[test]
    fn test_basic_to_ansi_color() {
        assert_eq!(basic_to_ansi_color(0), 30);
        assert_eq!(basic_to_ansi_color(7), 37);
        assert_eq!(basic_to_ansi_color(15), 97);
    }
}
