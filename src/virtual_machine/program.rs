//! Program representation shared by the encoder, the transport and the engine.
//!
//! A program is a list of [`Codeline`]s: a priority (the MX preference, used as
//! the instruction's address) paired with a piece of code. Coming out of the
//! assembler the code is a namespaced token (`push-5.mexico.invalid.`); coming
//! out of the decoder it is the command form (`push 5`).

use crate::virtual_machine::isa::Op;

/// Namespace every instruction token lives under.
pub const NAMESPACE: &str = "mexico.invalid.";

/// A priority paired with one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Codeline {
    pub priority: u16,
    pub code: String,
}

impl Codeline {
    pub fn new(priority: u16, code: impl Into<String>) -> Self {
        Self {
            priority,
            code: code.into(),
        }
    }
}

/// Renders an operation as an MX exchange name.
///
/// The operand is joined to the mnemonic with `-` since hostname labels
/// cannot hold spaces: `push 5` becomes `push-5.mexico.invalid.`.
pub fn to_token(op: &Op) -> String {
    match op.operand() {
        Some(value) => format!("{}-{}.{}", op.mnemonic(), value, NAMESPACE),
        None => format!("{}.{}", op.mnemonic(), NAMESPACE),
    }
}

/// Decoded program, ordered by ascending priority.
///
/// Priorities may have gaps. Equal priorities keep the order they were given
/// in; only the first of them is ever reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    lines: Vec<Codeline>,
}

impl Program {
    pub fn new(mut lines: Vec<Codeline>) -> Self {
        lines.sort_by_key(|line| line.priority);
        Self { lines }
    }

    pub fn lines(&self) -> &[Codeline] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the first line whose priority is at least `counter`.
    pub fn position_at_or_after(&self, counter: i64) -> Option<usize> {
        let index = self
            .lines
            .partition_point(|line| i64::from(line.priority) < counter);
        (index < self.lines.len()).then_some(index)
    }
}

impl From<Vec<Codeline>> for Program {
    fn from(lines: Vec<Codeline>) -> Self {
        Self::new(lines)
    }
}
