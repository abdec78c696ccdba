//! The open-file table behind OPEN, CLOSE, PRINT #, WRITE #, INPUT # and EOF.
//!
//! INPUT files are read whole when opened; OUTPUT and APPEND files buffer
//! their text until CLOSE hands it to the file-system device.

use super::pending::FileFlush;
use crate::ast::FileMode;

/// One open file.
#[derive(Debug, Clone)]
pub struct OpenFile {
    pub path: String,
    pub mode: FileMode,
    /// Input text, or output written so far.
    text: String,
    /// Read position into `text`, for INPUT files.
    pos: usize,
    /// Print column, for PRINT # zones.
    pub column: usize,
}

impl OpenFile {
    pub fn input(path: impl Into<String>, contents: String) -> Self {
        Self {
            path: path.into(),
            mode: FileMode::Input,
            text: contents,
            pos: 0,
            column: 0,
        }
    }

    pub fn output(path: impl Into<String>, mode: FileMode) -> Self {
        Self {
            path: path.into(),
            mode,
            text: String::new(),
            pos: 0,
            column: 0,
        }
    }

    pub fn is_input(&self) -> bool {
        self.mode == FileMode::Input
    }

    /// True once every character has been read.
    pub fn eof(&self) -> bool {
        self.rest().trim_end_matches(['\r', '\n']).is_empty()
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    /// Appends printed text.
    pub fn write(&mut self, text: &str) {
        self.text.push_str(text);
        match text.rfind('\n') {
            Some(i) => self.column = text[i + 1..].chars().count(),
            None => self.column += text.chars().count(),
        }
    }

    /// The next line, without its terminator.
    pub fn read_line(&mut self) -> Option<String> {
        if self.pos >= self.text.len() {
            return None;
        }
        let rest = self.rest();
        let (line, consumed) = match rest.find('\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        let line = line.trim_end_matches('\r').to_string();
        self.pos += consumed;
        Some(line)
    }

    /// The next comma- or newline-separated field. Quoted fields may
    /// contain commas.
    pub fn read_field(&mut self) -> Option<String> {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches([' ', '\t', '\r', '\n']);
        if trimmed.is_empty() {
            self.pos = self.text.len();
            return None;
        }
        let start = self.pos + (rest.len() - trimmed.len());

        let (field, after) = if let Some(quoted) = trimmed.strip_prefix('"') {
            let end = quoted.find('"').unwrap_or(quoted.len());
            let after = start + 1 + (end + 1).min(quoted.len());
            (quoted[..end].to_string(), after)
        } else {
            let end = trimmed.find([',', '\n']).unwrap_or(trimmed.len());
            (trimmed[..end].trim_end().to_string(), start + end)
        };

        // Skip to just past the separator.
        let tail = &self.text[after..];
        self.pos = match tail.find([',', '\n']) {
            Some(i) => after + i + 1,
            None => self.text.len(),
        };
        Some(field)
    }

    /// What CLOSE writes back, or `None` for INPUT files.
    pub fn into_flush(self) -> Option<FileFlush> {
        (!self.is_input()).then(|| FileFlush {
            append: self.mode == FileMode::Append,
            path: self.path,
            contents: self.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_fields() {
        let mut file = OpenFile::input("a.txt", "1, \"x, y\",3\n4\n".to_string());
        assert_eq!(file.read_field().as_deref(), Some("1"));
        assert_eq!(file.read_field().as_deref(), Some("x, y"));
        assert_eq!(file.read_field().as_deref(), Some("3"));
        assert!(!file.eof());
        assert_eq!(file.read_field().as_deref(), Some("4"));
        assert!(file.eof());
        assert_eq!(file.read_field(), None);
    }

    #[test]
    fn test_read_lines() {
        let mut file = OpenFile::input("a.txt", "one\r\ntwo".to_string());
        assert_eq!(file.read_line().as_deref(), Some("one"));
        assert_eq!(file.read_line().as_deref(), Some("two"));
        assert_eq!(file.read_line(), None);
        assert!(file.eof());
    }

    #[test]
    fn test_output_flush() {
        let mut file = OpenFile::output("out.txt", FileMode::Append);
        file.write("hello");
        assert_eq!(file.column, 5);
        file.write("\n");
        assert_eq!(file.column, 0);
        let flush = file.into_flush().unwrap();
        assert!(flush.append);
        assert_eq!(flush.contents, "hello\n");
    }
}
