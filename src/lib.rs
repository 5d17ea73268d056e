//! Mexico library.
//!
//! Compiles programs for a small tape-and-stack machine into DNS MX records,
//! and reads them back to run them.

pub mod utils;
pub mod virtual_machine;
