//! Sequential files: OPEN, CLOSE, INPUT #, LINE INPUT # and EOF.
//!
//! Opening a file FOR INPUT reads it whole through the file-system device,
//! which suspends. OUTPUT and APPEND files collect PRINT # and WRITE #
//! text in memory and are written back on CLOSE or END.

use super::{Builtin, Registry};
use crate::ast::FileMode;
use crate::types::{Cell, Type, Value};
use crate::vm::{Completion, DeviceRequest, OpenFile, RuntimeError, Vm, input_value, store};
use qbvm_runtime::DeviceError;

pub(super) fn register(registry: &mut Registry) {
    registry.register_function(Builtin::function("EOF", Type::Integer, vec![Type::Integer], eof));
    registry.register_sub(Builtin::sub(
        "_OPEN",
        vec![Type::String, Type::Integer, Type::Integer],
        open,
    ));
    registry.register_sub(Builtin::sub("_CLOSE", vec![Type::Integer], close).optional(0));
    registry.register_sub(Builtin::sub("_FILE_INPUT", vec![Type::Integer], file_input));
    registry.register_sub(Builtin::sub(
        "_FILE_LINE_INPUT",
        vec![Type::Integer, Type::String],
        file_line_input,
    ));
}

fn pop_file_num(vm: &mut Vm) -> Result<i64, RuntimeError> {
    let file_num = vm.pop_i64()?;
    if !(1..=255).contains(&file_num) {
        return Err(RuntimeError::bad_file_number(file_num));
    }
    Ok(file_num)
}

/// The open INPUT file `file_num`.
fn input_file(vm: &mut Vm, file_num: i64) -> Result<&mut OpenFile, RuntimeError> {
    vm.files()
        .get_mut(&file_num)
        .filter(|file| file.is_input())
        .ok_or_else(|| RuntimeError::bad_file_number(file_num))
}

/// `_OPEN path, mode, n`
fn open(vm: &mut Vm) -> Result<(), RuntimeError> {
    let file_num = pop_file_num(vm)?;
    let mode = vm.pop_i64()?;
    let path = vm.pop_string()?;
    let mode = FileMode::from_code(mode)
        .ok_or_else(|| RuntimeError::internal(format!("bad file mode {}", mode)))?;

    if vm.files().contains_key(&file_num) {
        return Err(RuntimeError::new(55, format!("file #{} already open", file_num)).recoverable());
    }
    log::debug!("open {:?} as #{} for {:?}", path, file_num, mode);
    match mode {
        FileMode::Input => vm.suspend(
            DeviceRequest::ReadFile { path: path.clone() },
            Completion::OpenInput { file_num, path },
        ),
        FileMode::Output | FileMode::Append => {
            vm.files().insert(file_num, OpenFile::output(path, mode));
            Ok(())
        }
    }
}

/// `_CLOSE [n]`: one file, or all of them without an argument.
fn close(vm: &mut Vm) -> Result<(), RuntimeError> {
    let closing: Vec<OpenFile> = if vm.pop_arg_count(1)? == 1 {
        let file_num = pop_file_num(vm)?;
        let file = vm
            .files()
            .remove(&file_num)
            .ok_or_else(|| RuntimeError::bad_file_number(file_num))?;
        vec![file]
    } else {
        vm.files().drain().map(|(_, file)| file).collect()
    };

    let flushes: Vec<_> = closing.into_iter().filter_map(OpenFile::into_flush).collect();
    if flushes.is_empty() {
        return Ok(());
    }
    vm.suspend(DeviceRequest::WriteFiles(flushes), Completion::Ignore)
}

/// `_FILE_INPUT n, refs..., count`
fn file_input(vm: &mut Vm) -> Result<(), RuntimeError> {
    let count = vm.pop_i64()?;
    let mut targets: Vec<Cell> = Vec::new();
    for _ in 0..count {
        targets.push(vm.pop_ref()?);
    }
    targets.reverse();
    let file_num = pop_file_num(vm)?;

    let file = input_file(vm, file_num)?;
    let mut values = Vec::with_capacity(targets.len());
    for target in &targets {
        let field = file.read_field().ok_or(DeviceError::EndOfInput)?;
        values.push(input_value(target, &field));
    }
    for (target, value) in targets.iter().zip(values) {
        store(target, value)?;
    }
    Ok(())
}

/// `_FILE_LINE_INPUT n, ref`
fn file_line_input(vm: &mut Vm) -> Result<(), RuntimeError> {
    let target = vm.pop_ref()?;
    let file_num = pop_file_num(vm)?;
    let line = input_file(vm, file_num)?
        .read_line()
        .ok_or(DeviceError::EndOfInput)?;
    store(&target, Value::String(line))
}

fn eof(vm: &mut Vm) -> Result<(), RuntimeError> {
    let file_num = pop_file_num(vm)?;
    let at_end = input_file(vm, file_num)?.eof();
    vm.push(Value::from_bool(at_end));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::builtins::testing::run_on;
    use crate::vm::Devices;
    use qbvm_runtime::{MemoryFileSystem, RecordingConsole};

    fn run_fs(source: &str, fs: &MemoryFileSystem) -> String {
        let console = RecordingConsole::new();
        let (_, result) = run_on(source, Devices::new(console.clone()).with_fs(fs.clone()));
        result.unwrap();
        console.output()
    }

    #[test]
    fn test_write_then_read_back() {
        let fs = MemoryFileSystem::new();
        let source = r#"
OPEN "data.txt" FOR OUTPUT AS #1
PRINT #1, "alpha"
WRITE #1, 7, "b, c"
CLOSE #1
OPEN "data.txt" FOR INPUT AS #2
LINE INPUT #2, first$
INPUT #2, n%, rest$
PRINT first$; n% * 2; rest$
PRINT EOF(2)
CLOSE
"#;
        assert_eq!(run_fs(source, &fs), "alpha14b, c\n-1\n");
        assert_eq!(fs.contents("data.txt").as_deref(), Some("alpha\n7,\"b, c\"\n"));
    }

    #[test]
    fn test_append_keeps_contents() {
        let fs = MemoryFileSystem::new();
        fs.insert("log.txt", "one\n");
        run_fs("OPEN \"log.txt\" FOR APPEND AS #1\nPRINT #1, \"two\"\nCLOSE #1", &fs);
        assert_eq!(fs.contents("log.txt").as_deref(), Some("one\ntwo\n"));
    }

    #[test]
    fn test_end_flushes_open_files() {
        let fs = MemoryFileSystem::new();
        run_fs("OPEN \"out.txt\" FOR OUTPUT AS #3\nPRINT #3, 42\nEND", &fs);
        assert_eq!(fs.contents("out.txt").as_deref(), Some("42\n"));
    }

    #[test]
    fn test_missing_file_sets_err() {
        let fs = MemoryFileSystem::new();
        let out = run_fs("OPEN \"nope.txt\" FOR INPUT AS #1\nPRINT ERR", &fs);
        assert_eq!(out, "53\n");
    }

    #[test]
    fn test_bad_file_number_is_recoverable() {
        let fs = MemoryFileSystem::new();
        assert_eq!(run_fs("PRINT #4, \"x\"\nPRINT ERR", &fs), "52\n");
    }
}
