//! Test utilities for compiling and running programs.

#[cfg(test)]
pub mod utils {
    use crate::virtual_machine::assembler::assemble_source;
    use crate::virtual_machine::decoder::decode;
    use crate::virtual_machine::program::{Codeline, Program};

    /// Assembles source text and decodes it back, as the interpreter would
    /// after an MX lookup.
    pub fn compile(source: &str) -> Program {
        let records = assemble_source(source).expect("assembly failed");
        Program::new(decode(&records))
    }

    /// Program built straight from `(priority, command)` pairs, for layouts
    /// the assembler never produces.
    pub fn program_of(lines: &[(u16, &str)]) -> Program {
        Program::new(
            lines
                .iter()
                .map(|(priority, code)| Codeline::new(*priority, *code))
                .collect(),
        )
    }
}
