//! Operand stack.

use crate::virtual_machine::errors::VMError;

/// LIFO stack of `i64` values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    values: Vec<i64>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: i64) {
        self.values.push(value);
    }

    /// Removes and returns the top value.
    ///
    /// An empty stack means the program is broken: [`VMError::StackUnderflow`]
    /// is returned and the run must stop.
    pub fn pop(&mut self) -> Result<i64, VMError> {
        self.values.pop().ok_or(VMError::StackUnderflow)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values from bottom to top.
    pub fn values(&self) -> &[i64] {
        &self.values
    }
}
