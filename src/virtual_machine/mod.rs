//! Tape-and-stack machine whose programs travel as DNS MX records.
//!
//! Every instruction of a program becomes one MX record of a base domain: the
//! record's preference is the instruction's priority (its address) and the
//! exchange name spells the instruction under the `mexico.invalid.` namespace.
//! Reading a program back means fetching the records, keeping the namespaced
//! ones and ordering them by preference.
//!
//! # Pipeline
//!
//! 1. [`assembler`]: source text to `(priority, token)` codelines, with labels
//!    resolved to priorities
//! 2. [`zone`]: codelines to a zone file and back
//! 3. [`decoder`]: raw MX records to ordered command-form codelines
//! 4. [`vm`]: runs the decoded [`program::Program`] on a tape and a stack
//!
//! # Modules
//!
//! - [`errors`]: Assembly, transport and execution error types
//! - [`isa`]: Instruction set definition and command parsing
//! - [`program`]: Codelines, tokens and the priority-ordered program

pub mod assembler;
pub mod decoder;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod program;
pub mod vm;
pub mod zone;
