//! The machine's memory: a line of integer cells under a movable head.

/// Auto-growing tape of `i64` cells.
///
/// Cells spring into existence as zeros the first time the head reaches
/// them, and the tape never shrinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tape {
    head: usize,
    cells: Vec<i64>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current head position.
    pub fn head(&self) -> usize {
        self.head
    }

    /// Cells allocated so far.
    pub fn cells(&self) -> &[i64] {
        &self.cells
    }

    /// Extends the tape with zeros until `index` is addressable.
    fn grow_to(&mut self, index: usize) {
        if self.cells.len() <= index {
            self.cells.resize(index + 1, 0);
        }
    }

    fn set_head(&mut self, position: usize) {
        self.grow_to(position);
        self.head = position;
    }

    /// Moves one cell left. At cell 0 this does nothing.
    pub fn move_left(&mut self) {
        if self.head > 0 {
            self.set_head(self.head - 1);
        }
    }

    pub fn move_right(&mut self) {
        self.set_head(self.head + 1);
    }

    /// Value under the head.
    pub fn get(&mut self) -> i64 {
        self.grow_to(self.head);
        self.cells[self.head]
    }

    /// Overwrites the value under the head.
    pub fn set(&mut self, value: i64) {
        self.grow_to(self.head);
        self.cells[self.head] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tape_reads_zero() {
        let mut tape = Tape::new();
        assert_eq!(tape.head(), 0);
        assert_eq!(tape.get(), 0);
        assert_eq!(tape.cells(), &[0]);
    }

    #[test]
    fn move_left_at_origin_is_noop() {
        let mut tape = Tape::new();
        tape.move_left();
        assert_eq!(tape.head(), 0);
        assert!(tape.cells().is_empty());
    }

    #[test]
    fn moving_right_grows() {
        let mut tape = Tape::new();
        for _ in 0..5 {
            tape.move_right();
        }
        assert_eq!(tape.head(), 5);
        assert_eq!(tape.get(), 0);
        assert_eq!(tape.cells().len(), 6);
    }

    #[test]
    fn never_shrinks_when_moving_back() {
        let mut tape = Tape::new();
        for _ in 0..5 {
            tape.move_right();
        }
        tape.set(9);
        for _ in 0..8 {
            tape.move_left();
        }
        assert_eq!(tape.head(), 0);
        assert_eq!(tape.cells(), &[0, 0, 0, 0, 0, 9]);
    }

    #[test]
    fn set_and_get_per_cell() {
        let mut tape = Tape::new();
        tape.set(3);
        tape.move_right();
        tape.set(-4);
        tape.move_left();
        assert_eq!(tape.get(), 3);
        tape.move_right();
        assert_eq!(tape.get(), -4);
    }
}
