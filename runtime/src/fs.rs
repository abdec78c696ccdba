//! File system adapters.

use crate::devices::FileSystem;
use crate::error::DeviceError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

/// A file system held entirely in memory.
///
/// Clones share storage, so tests can seed files before a run and inspect
/// them afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), contents.into());
    }

    pub fn contents(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read(&mut self, path: &str) -> Result<String, DeviceError> {
        self.contents(path)
            .ok_or_else(|| DeviceError::NotFound(path.to_string()))
    }

    fn write(&mut self, path: &str, contents: &str, append: bool) -> Result<(), DeviceError> {
        let mut files = self.files.borrow_mut();
        let entry = files.entry(path.to_string()).or_default();
        if !append {
            entry.clear();
        }
        entry.push_str(contents);
        Ok(())
    }
}

/// The host file system, with every path resolved under `root`.
#[derive(Debug, Clone)]
pub struct StdFileSystem {
    root: PathBuf,
}

impl StdFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl FileSystem for StdFileSystem {
    fn read(&mut self, path: &str) -> Result<String, DeviceError> {
        log::debug!("reading {}", self.resolve(path).display());
        Ok(std::fs::read_to_string(self.resolve(path))?)
    }

    fn write(&mut self, path: &str, contents: &str, append: bool) -> Result<(), DeviceError> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(self.resolve(path))?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }
}
