//! Execution engine.
//!
//! The machine owns one [`Tape`] and one [`Stack`] and walks a decoded
//! [`Program`] by priority. After every instruction the counter either moves
//! one past the current priority or is set to a jump target, and the next
//! instruction is whichever line holds the first priority at or after it. Gaps
//! in the numbering are skipped that way, so the program never needs to be
//! contiguous.

mod console;
mod stack;
mod tape;

pub use console::{Console, IoConsole, display_char, format_output};
pub use stack::Stack;
pub use tape::Tape;

#[cfg(test)]
pub use console::tests::TestConsole;

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Op;
use crate::virtual_machine::program::Program;
use crate::{debug, warn};

/// What the counter does after an instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    /// Move one past the current priority.
    Next,
    /// Set the counter to the target.
    Jump(i64),
}

/// Outcome of a single [`VM::step`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Running,
    Halted,
}

macro_rules! exec_vm {
    // Entry point
    (
        vm = $vm:ident,
        console = $console:ident,
        op = $op:ident,
        { $( $variant:ident { $( $field:ident ),* } => $handler:ident $args:tt ),* $(,)? }
    ) => {{
        match $op {
            $(
                Op::$variant { $( $field ),* } => {
                    let instr_name = $op.mnemonic();
                    exec_vm!(@call $vm, $console, instr_name, $handler, $args)
                }
            ),*
        }
    }};

    // Handler talking to the console (semicolon separator)
    (@call $vm:ident, $console:ident, $instr_name:expr, $handler:ident,
        (console; $( $field:ident ),* $(,)? )
    ) => {{
        $vm.$handler($instr_name, $console, $( $field ),*)
    }};

    // Handler on tape and stack only
    (@call $vm:ident, $console:ident, $instr_name:expr, $handler:ident,
        ( $( $field:ident ),* $(,)? )
    ) => {{
        $vm.$handler($instr_name, $( $field ),*)
    }};
}

/// Tape-and-stack machine running a priority-ordered program.
pub struct VM {
    program: Program,
    /// Priority of the current instruction, or the last requested target.
    counter: i64,
    /// Index of the current instruction in `program`.
    pointer: usize,
    tape: Tape,
    stack: Stack,
    /// Instructions executed so far.
    steps: u64,
    halted: bool,
}

impl VM {
    /// Creates a machine positioned on the first instruction at or after
    /// priority 0.
    pub fn new(program: Program) -> Result<Self, VMError> {
        let pointer = program
            .position_at_or_after(0)
            .ok_or(VMError::EmptyProgram)?;
        let counter = i64::from(program.lines()[pointer].priority);
        Ok(Self {
            program,
            counter,
            pointer,
            tape: Tape::new(),
            stack: Stack::new(),
            steps: 0,
            halted: false,
        })
    }

    /// Runs until the program halts or an instruction fails.
    ///
    /// Stepping past the last instruction is a normal halt. Every failure
    /// aborts the run; there is no recovery.
    pub fn run<C: Console>(&mut self, console: &mut C) -> Result<(), VMError> {
        while self.step(console)? == Status::Running {}
        Ok(())
    }

    /// Executes the current instruction and advances to the next one.
    pub fn step<C: Console>(&mut self, console: &mut C) -> Result<Status, VMError> {
        if self.halted {
            return Ok(Status::Halted);
        }
        let Some(line) = self.program.lines().get(self.pointer) else {
            self.halted = true;
            return Ok(Status::Halted);
        };
        let priority = line.priority;
        debug!("priority {priority}: {}", line.code);

        let result = Op::parse(&line.code).and_then(|op| self.exec(op, console));
        let flow = match result {
            Ok(flow) => flow,
            Err(source) => {
                self.halted = true;
                return Err(VMError::Execution {
                    priority,
                    code: self.program.lines()[self.pointer].code.clone(),
                    source: Box::new(source),
                });
            }
        };
        self.steps += 1;

        let target = match flow {
            Flow::Next => self.counter + 1,
            Flow::Jump(target) => target,
        };
        match self.program.position_at_or_after(target) {
            Some(index) => {
                self.pointer = index;
                self.counter = i64::from(self.program.lines()[index].priority);
                Ok(Status::Running)
            }
            None => {
                self.counter = target;
                self.halted = true;
                match flow {
                    Flow::Next => Ok(Status::Halted),
                    Flow::Jump(_) => Err(VMError::NoNextInstruction {
                        from: priority,
                        counter: target,
                    }),
                }
            }
        }
    }

    /// Executes a single instruction.
    fn exec<C: Console>(&mut self, op: Op, console: &mut C) -> Result<Flow, VMError> {
        exec_vm! {
            vm = self,
            console = console,
            op = op,
            {
                // Tape
                Left {} => op_left(),
                Right {} => op_right(),
                PushTape {} => op_push_tape(),
                Pop {} => op_pop(),
                // Stack
                Push { value } => op_push(value),
                Dup {} => op_dup(),
                Del {} => op_del(),
                // Comparison
                Eq {} => op_eq(),
                Not {} => op_not(),
                Gt {} => op_gt(),
                Lt {} => op_lt(),
                // Arithmetic
                Add {} => op_add(),
                Sub {} => op_sub(),
                Mult {} => op_mult(),
                Div {} => op_div(),
                Mod {} => op_mod(),
                // Console
                Read {} => op_read(console;),
                Print {} => op_print(console;),
                // Control flow
                Jmp {} => op_jmp(),
                Jmpc {} => op_jmpc(),
            }
        }
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Priority of the instruction that runs next.
    pub fn counter(&self) -> i64 {
        self.counter
    }

    /// Number of instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Tape cells followed by stack rows, one line each.
    pub fn dump(&self) -> Vec<String> {
        let cells = self
            .tape
            .cells()
            .iter()
            .enumerate()
            .map(|(i, v)| format!("Cell {i}: {v} ({})", display_char(*v)));
        let rows = self
            .stack
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| format!("Stack row {i}: {v} ({})", display_char(*v)));
        cells.chain(rows).collect()
    }

    /// Pops `a`, then `b`, and pushes `f(a, b)`.
    fn binary(&mut self, f: impl FnOnce(i64, i64) -> i64) -> Result<Flow, VMError> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        self.stack.push(f(a, b));
        Ok(Flow::Next)
    }

    /// Like [`VM::binary`], refusing a zero `b`.
    fn binary_divisor(
        &mut self,
        instr: &'static str,
        f: impl FnOnce(i64, i64) -> i64,
    ) -> Result<Flow, VMError> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        if b == 0 {
            return Err(VMError::DivisionByZero { instruction: instr });
        }
        self.stack.push(f(a, b));
        Ok(Flow::Next)
    }

    fn op_left(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        self.tape.move_left();
        Ok(Flow::Next)
    }

    fn op_right(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        self.tape.move_right();
        Ok(Flow::Next)
    }

    fn op_push_tape(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        let value = self.tape.get();
        self.stack.push(value);
        Ok(Flow::Next)
    }

    fn op_pop(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        let value = self.stack.pop()?;
        self.tape.set(value);
        Ok(Flow::Next)
    }

    fn op_push(&mut self, _instr: &'static str, value: i64) -> Result<Flow, VMError> {
        self.stack.push(value);
        Ok(Flow::Next)
    }

    fn op_dup(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        let value = self.stack.pop()?;
        self.stack.push(value);
        self.stack.push(value);
        Ok(Flow::Next)
    }

    fn op_del(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        self.stack.pop()?;
        Ok(Flow::Next)
    }

    fn op_eq(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        self.binary(|a, b| i64::from(a == b))
    }

    fn op_not(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        let value = match self.stack.pop()? {
            0 => 1,
            1 => 0,
            other => {
                return Err(VMError::InvalidOperand {
                    instruction: instr,
                    value: other,
                });
            }
        };
        self.stack.push(value);
        Ok(Flow::Next)
    }

    fn op_gt(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        self.binary(|a, b| i64::from(a > b))
    }

    fn op_lt(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        self.binary(|a, b| i64::from(a < b))
    }

    fn op_add(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        self.binary(i64::wrapping_add)
    }

    fn op_sub(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        self.binary(i64::wrapping_sub)
    }

    fn op_mult(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        self.binary(i64::wrapping_mul)
    }

    fn op_div(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.binary_divisor(instr, i64::wrapping_div)
    }

    fn op_mod(&mut self, instr: &'static str) -> Result<Flow, VMError> {
        self.binary_divisor(instr, i64::wrapping_rem)
    }

    fn op_read<C: Console>(
        &mut self,
        instr: &'static str,
        console: &mut C,
    ) -> Result<Flow, VMError> {
        let input = console.read()?;
        let mut chars = input.chars();
        let first = chars.next().ok_or(VMError::InputExhausted)?;
        if chars.next().is_some() {
            warn!("{instr}: read more than one character, ignoring all but '{first}'");
        }
        self.stack.push(i64::from(u32::from(first)));
        Ok(Flow::Next)
    }

    fn op_print<C: Console>(
        &mut self,
        _instr: &'static str,
        console: &mut C,
    ) -> Result<Flow, VMError> {
        let value = self.stack.pop()?;
        console.print(value)?;
        Ok(Flow::Next)
    }

    fn op_jmp(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        let target = self.stack.pop()?;
        Ok(Flow::Jump(target))
    }

    fn op_jmpc(&mut self, _instr: &'static str) -> Result<Flow, VMError> {
        let target = self.stack.pop()?;
        let condition = self.stack.pop()?;
        if condition != 0 {
            Ok(Flow::Jump(target))
        } else {
            Ok(Flow::Next)
        }
    }
}
