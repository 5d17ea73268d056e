use mexico_derive::Error;

/// Errors raised while assembling, transporting or executing a program.
#[derive(Debug, Error)]
pub enum VMError {
    // ---------- assembly ----------
    /// Source line is neither a label, a known opcode nor a `push`.
    #[error("line {line}: unrecognized instruction '{text}'")]
    UnrecognizedInstruction { line: usize, text: String },
    /// `push` argument is neither a declared label nor an integer literal.
    #[error("line {line}: '{operand}' in '{text}' is neither a label nor an integer constant")]
    UnresolvablePushOperand {
        line: usize,
        text: String,
        operand: String,
    },
    /// Label declared more than once.
    #[error("line {line}: duplicate label: {label}")]
    DuplicateLabel { line: usize, label: String },
    /// More instructions than there are MX preference values.
    #[error("program has {count} instructions, but priorities stop at 65535")]
    ProgramTooLarge { count: usize },

    // ---------- execution ----------
    /// Decoded program holds no instructions.
    #[error("no instructions to execute")]
    EmptyProgram,
    /// Decoded code is not in the instruction table.
    #[error("unknown opcode: {code}")]
    UnknownOpcode { code: String },
    /// Known opcode with the wrong number of operands.
    #[error("{instruction}: expected {expected} operand(s), found {found}")]
    WrongOperandCount {
        instruction: &'static str,
        expected: usize,
        found: usize,
    },
    /// Operand of a decoded instruction is not an integer.
    #[error("{instruction}: operand '{operand}' is not an integer")]
    MalformedOperand {
        instruction: &'static str,
        operand: String,
    },
    /// Pop on an empty stack. The program is broken; the run cannot go on.
    #[error("tried to pop a value from an empty stack")]
    StackUnderflow,
    /// Operand outside the domain an instruction accepts.
    #[error("{instruction}: expected 0 or 1, got {value}")]
    InvalidOperand {
        instruction: &'static str,
        value: i64,
    },
    /// `div` or `mod` with a zero divisor.
    #[error("{instruction}: division by zero")]
    DivisionByZero { instruction: &'static str },
    /// `read` got no character at all.
    #[error("failed to read a character: input exhausted")]
    InputExhausted,
    /// `read` failed on the input stream.
    #[error("failed to read a character: {reason}")]
    InputError { reason: String },
    /// `print` failed on the output stream.
    #[error("failed to print: {reason}")]
    OutputError { reason: String },
    /// A jump landed beyond the last instruction.
    #[error("jump from priority {from} found no instruction at or after {counter}")]
    NoNextInstruction { from: u16, counter: i64 },
    /// An instruction failed; wraps the cause with where it happened.
    #[error("priority {priority} ({code}): {source}")]
    Execution {
        priority: u16,
        code: String,
        #[source]
        source: Box<VMError>,
    },

    // ---------- transport ----------
    /// Zone file line could not be understood.
    #[error("zone line {line}: {reason}")]
    ZoneSyntax { line: usize, reason: String },
    /// File could not be read or written.
    #[error("{path}: {reason}")]
    Io { path: String, reason: String },
}

impl VMError {
    /// The innermost cause, looking through [`VMError::Execution`].
    pub fn root_cause(&self) -> &VMError {
        match self {
            VMError::Execution { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Source line for assembly errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            VMError::UnrecognizedInstruction { line, .. }
            | VMError::UnresolvablePushOperand { line, .. }
            | VMError::DuplicateLabel { line, .. }
            | VMError::ZoneSyntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_interpolates_fields() {
        let err = VMError::UnrecognizedInstruction {
            line: 4,
            text: "hop".into(),
        };
        assert_eq!(err.to_string(), "line 4: unrecognized instruction 'hop'");
        assert_eq!(
            VMError::ProgramTooLarge { count: 70_000 }.to_string(),
            "program has 70000 instructions, but priorities stop at 65535"
        );
    }

    #[test]
    fn execution_error_exposes_source() {
        let err = VMError::Execution {
            priority: 3,
            code: "del".into(),
            source: Box::new(VMError::StackUnderflow),
        };
        assert_eq!(
            err.to_string(),
            "priority 3 (del): tried to pop a value from an empty stack"
        );
        assert!(err.source().is_some());
        assert!(matches!(err.root_cause(), VMError::StackUnderflow));
        assert!(VMError::StackUnderflow.source().is_none());
    }

    #[test]
    fn operand_count_message() {
        let err = VMError::WrongOperandCount {
            instruction: "push",
            expected: 1,
            found: 2,
        };
        assert_eq!(err.to_string(), "push: expected 1 operand(s), found 2");
    }
}
