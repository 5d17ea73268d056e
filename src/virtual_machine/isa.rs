//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction list and invokes a callback macro with it, so the
//! opcode table is written down exactly once.
//!
//! This module generates:
//! - [`Instruction`]: the bare opcode, with its mnemonic and arity
//! - [`Op`]: an opcode together with its operands, ready to execute
//!
//! # Textual forms
//!
//! An [`Op`] has two spellings. The command form is what a programmer writes
//! and what the decoder hands to the engine (`push 5`, `left`). The token form
//! is a hostname label that can sit in an MX record (`push-5`, `left`); see
//! [`program::to_token`](super::program::to_token).

use crate::virtual_machine::errors::VMError;
use std::fmt;

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Tape
            // =========================
            /// left ; move the tape head one cell left (no-op at cell 0)
            Left = 0x00, "left" => [],
            /// right ; move the tape head one cell right
            Right = 0x01, "right" => [],
            /// pusht ; push the value of the current cell
            PushTape = 0x02, "pusht" => [],
            /// pop ; pop into the current cell
            Pop = 0x03, "pop" => [],
            // =========================
            // Stack
            // =========================
            /// push n ; push the constant n
            Push = 0x10, "push" => [value: Imm],
            /// dup ; duplicate the top value
            Dup = 0x11, "dup" => [],
            /// del ; discard the top value
            Del = 0x12, "del" => [],
            // =========================
            // Comparison
            // =========================
            /// eq ; a = pop, b = pop, push a == b
            Eq = 0x20, "eq" => [],
            /// not ; a = pop, push 1 - a (a must be 0 or 1)
            Not = 0x21, "not" => [],
            /// gt ; a = pop, b = pop, push a > b
            Gt = 0x22, "gt" => [],
            /// lt ; a = pop, b = pop, push a < b
            Lt = 0x23, "lt" => [],
            // =========================
            // Arithmetic
            // =========================
            /// add ; a = pop, b = pop, push a + b
            Add = 0x30, "add" => [],
            /// sub ; a = pop, b = pop, push a - b
            Sub = 0x31, "sub" => [],
            /// mult ; a = pop, b = pop, push a * b
            Mult = 0x32, "mult" => [],
            /// div ; a = pop, b = pop, push a / b
            Div = 0x33, "div" => [],
            /// mod ; a = pop, b = pop, push a % b
            Mod = 0x34, "mod" => [],
            // =========================
            // Console
            // =========================
            /// read ; push the code of one character read from input
            Read = 0x40, "read" => [],
            /// print ; pop and print as character and number
            Print = 0x41, "print" => [],
            // =========================
            // Control flow
            // =========================
            /// jmp ; jump to priority pop
            Jmp = 0x50, "jmp" => [],
            /// jmpc ; target = pop, condition = pop, jump to target if condition != 0
            Jmpc = 0x51, "jmpc" => [],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:expr, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        // =========================
        // Opcodes
        // =========================
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl Instruction {
            /// Every instruction, in table order.
            pub const ALL: &'static [Instruction] = &[ $( Instruction::$name ),* ];

            /// Returns the assembly mnemonic for this instruction.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }

            /// Number of operands written after the mnemonic.
            pub const fn arity(&self) -> usize {
                match self {
                    $( Instruction::$name => define_instructions!(@count $( $field ),*), )*
                }
            }

            /// Looks an instruction up by its exact mnemonic.
            pub fn from_mnemonic(name: &str) -> Option<Self> {
                match name {
                    $( $mnemonic => Some(Instruction::$name), )*
                    _ => None,
                }
            }
        }

        // =========================
        // Executable operations
        // =========================
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub enum Op {
            $(
                $(#[$doc])*
                $name {
                    $( $field: define_instructions!(@ty $kind) ),*
                },
            )*
        }

        impl Op {
            /// The opcode of this operation.
            pub const fn instruction(&self) -> Instruction {
                match self {
                    $( Op::$name { .. } => Instruction::$name, )*
                }
            }

            /// The operand, for the instructions that carry one.
            pub fn operand(&self) -> Option<i64> {
                match self {
                    $(
                        #[allow(unused_variables)]
                        Op::$name { $( $field ),* } => {
                            None $( .or(Some(*$field)) )*
                        }
                    )*
                }
            }

            /// Builds an operation from an opcode and its operands.
            ///
            /// Returns `None` when the operand count does not match the arity.
            pub fn from_parts(instruction: Instruction, operands: &[i64]) -> Option<Self> {
                if operands.len() != instruction.arity() {
                    return None;
                }
                #[allow(unused_mut, unused_variables)]
                let mut it = operands.iter().copied();
                Some(match instruction {
                    $(
                        Instruction::$name => Op::$name {
                            $( $field: it.next()? ),*
                        },
                    )*
                })
            }
        }
    };

    // ---------- types ----------
    (@ty Imm) => { i64 };

    // ---------- counting ----------
    (@count $( $x:ident ),* ) => {
        <[()]>::len(&[ $( define_instructions!(@unit $x) ),* ])
    };

    (@unit $x:ident) => { () };
}

for_each_instruction!(define_instructions);

impl Op {
    /// Parses the command form (`push 5`, `left`) of an operation.
    ///
    /// Unknown mnemonics are [`VMError::UnknownOpcode`], a known one with the
    /// wrong operand count is [`VMError::WrongOperandCount`], and a
    /// non-integer operand is [`VMError::MalformedOperand`].
    pub fn parse(code: &str) -> Result<Self, VMError> {
        let mut parts = code.split_whitespace();
        let instruction = parts
            .next()
            .and_then(Instruction::from_mnemonic)
            .ok_or_else(|| VMError::UnknownOpcode {
                code: code.to_string(),
            })?;

        let operands = parts
            .map(|tok| {
                tok.parse::<i64>().map_err(|_| VMError::MalformedOperand {
                    instruction: instruction.mnemonic(),
                    operand: tok.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Op::from_parts(instruction, &operands).ok_or(VMError::WrongOperandCount {
            instruction: instruction.mnemonic(),
            expected: instruction.arity(),
            found: operands.len(),
        })
    }

    pub const fn mnemonic(&self) -> &'static str {
        self.instruction().mnemonic()
    }
}

/// Writes the command form.
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;
        if let Some(value) = self.operand() {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_are_unique_and_resolvable() {
        for instr in Instruction::ALL {
            assert_eq!(Instruction::from_mnemonic(instr.mnemonic()), Some(*instr));
        }
        assert_eq!(Instruction::ALL.len(), 20);
    }

    #[test]
    fn only_push_takes_an_operand() {
        for instr in Instruction::ALL {
            let expected = if *instr == Instruction::Push { 1 } else { 0 };
            assert_eq!(instr.arity(), expected, "{}", instr.mnemonic());
        }
    }

    #[test]
    fn parse_command_forms() {
        assert_eq!(Op::parse("left").unwrap(), Op::Left {});
        assert_eq!(Op::parse("push 42").unwrap(), Op::Push { value: 42 });
        assert_eq!(Op::parse("push -7").unwrap(), Op::Push { value: -7 });
        assert_eq!(Op::parse("  push   3 ").unwrap(), Op::Push { value: 3 });
    }

    #[test]
    fn parse_rejects_unknown_mnemonics() {
        assert!(matches!(
            Op::parse("halt"),
            Err(VMError::UnknownOpcode { code }) if code == "halt"
        ));
        assert!(matches!(Op::parse(""), Err(VMError::UnknownOpcode { .. })));
    }

    #[test]
    fn parse_rejects_wrong_operand_count_for_known_opcodes() {
        assert!(matches!(
            Op::parse("push"),
            Err(VMError::WrongOperandCount {
                instruction: "push",
                expected: 1,
                found: 0
            })
        ));
        assert!(matches!(
            Op::parse("push 5 6"),
            Err(VMError::WrongOperandCount {
                instruction: "push",
                expected: 1,
                found: 2
            })
        ));
        assert!(matches!(
            Op::parse("left 1"),
            Err(VMError::WrongOperandCount {
                instruction: "left",
                expected: 0,
                found: 1
            })
        ));
    }

    #[test]
    fn parse_rejects_non_integer_operand() {
        assert!(matches!(
            Op::parse("push abc"),
            Err(VMError::MalformedOperand { instruction: "push", operand }) if operand == "abc"
        ));
    }

    #[test]
    fn display_is_command_form() {
        assert_eq!(Op::Push { value: -3 }.to_string(), "push -3");
        assert_eq!(Op::PushTape {}.to_string(), "pusht");
        assert_eq!(Op::Jmpc {}.operand(), None);
        assert_eq!(Op::Push { value: 9 }.operand(), Some(9));
    }
}
