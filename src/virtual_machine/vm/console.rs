//! Console I/O seam for the `read` and `print` instructions.

use crate::virtual_machine::errors::VMError;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// Input and output the machine talks to.
pub trait Console {
    /// Blocks until input arrives and returns what one read produced.
    ///
    /// An empty string means the input is exhausted.
    fn read(&mut self) -> Result<String, VMError>;
    /// Emits one value written by `print`.
    fn print(&mut self, value: i64) -> Result<(), VMError>;
}

/// Character a value stands for, or U+FFFD if it is not a code point.
pub fn display_char(value: i64) -> char {
    u32::try_from(value)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// How `print` shows a value: the quoted character, then the number.
pub fn format_output(value: i64) -> String {
    format!("{:?} ({})", display_char(value), value)
}

/// [`Console`] over a line-buffered reader and a writer.
///
/// Each `read` consumes one line, since that is what a terminal delivers.
pub struct IoConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> IoConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl IoConsole<StdinLock<'static>, Stdout> {
    /// Console on the process' stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console for IoConsole<R, W> {
    fn read(&mut self) -> Result<String, VMError> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| VMError::InputError {
                reason: e.to_string(),
            })?;
        if read == 0 {
            return Ok(String::new());
        }

        let content = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(&line);
        // a bare Enter is the newline character itself
        if content.is_empty() {
            return Ok("\n".to_string());
        }
        Ok(content.to_string())
    }

    fn print(&mut self, value: i64) -> Result<(), VMError> {
        writeln!(self.output, "{}", format_output(value))
            .and_then(|_| self.output.flush())
            .map_err(|e| VMError::OutputError {
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted console: hands out queued reads and records printed values.
    #[derive(Default)]
    pub struct TestConsole {
        inputs: VecDeque<Result<String, String>>,
        pub printed: Vec<i64>,
    }

    impl TestConsole {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_input<I, S>(inputs: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                inputs: inputs.into_iter().map(|s| Ok(s.into())).collect(),
                printed: Vec::new(),
            }
        }

        /// Queues a read that fails with `reason`.
        pub fn fail_next_read(mut self, reason: &str) -> Self {
            self.inputs.push_back(Err(reason.to_string()));
            self
        }

        /// Printed values as text.
        pub fn printed_text(&self) -> String {
            self.printed.iter().map(|v| display_char(*v)).collect()
        }
    }

    impl Console for TestConsole {
        fn read(&mut self) -> Result<String, VMError> {
            match self.inputs.pop_front() {
                Some(Ok(s)) => Ok(s),
                Some(Err(reason)) => Err(VMError::InputError { reason }),
                None => Ok(String::new()),
            }
        }

        fn print(&mut self, value: i64) -> Result<(), VMError> {
            self.printed.push(value);
            Ok(())
        }
    }

    #[test]
    fn format_output_quotes_character() {
        assert_eq!(format_output(65), "'A' (65)");
        assert_eq!(format_output(10), "'\\n' (10)");
        assert_eq!(format_output(-1), "'\u{fffd}' (-1)");
        assert_eq!(format_output(0xD800), "'\u{fffd}' (55296)");
    }

    #[test]
    fn io_console_reads_one_line_per_read() {
        let mut console = IoConsole::new("hi\r\n\nx".as_bytes(), Vec::new());
        assert_eq!(console.read().unwrap(), "hi");
        assert_eq!(console.read().unwrap(), "\n");
        assert_eq!(console.read().unwrap(), "x");
        assert_eq!(console.read().unwrap(), "");
    }

    #[test]
    fn io_console_prints_char_and_value() {
        let mut console = IoConsole::new(io::empty(), Vec::new());
        console.print(72).unwrap();
        console.print(105).unwrap();
        let out = String::from_utf8(console.into_output()).unwrap();
        assert_eq!(out, "'H' (72)\n'i' (105)\n");
    }
}
