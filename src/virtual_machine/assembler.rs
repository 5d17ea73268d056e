//! Assembly source to MX record compiler.
//!
//! Compilation takes three passes over the source:
//! 1. [`clean_source`]: trim lines, drop blanks and comments
//! 2. number the remaining lines and collect labels into an [`AsmContext`]
//! 3. translate every instruction into its namespaced token, resolving
//!    label references to priorities
//!
//! Because labels are collected before anything is translated, a `push`
//! may refer to a label declared further down.
//!
//! # Syntax
//!
//! ```text
//! # comment            ; comment            // comment
//! loop:                label, binds to the next instruction
//! push 10              integer constant
//! push loop            label reference, becomes its priority
//! jmp                  any other opcode, written alone on its line
//! ```

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instruction, Op};
use crate::virtual_machine::program::{Codeline, to_token};
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_PREFIXES: [&str; 3] = ["#", ";", "//"];
const LABEL_SUFFIX: char = ':';
const PUSH_PREFIX: &str = "push ";

/// Formats a compiler-style diagnostic for assembly failures.
pub fn render_assembly_diagnostic(file: &str, source: &str, err: &VMError) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {err}");

    let Some(line) = err.line() else {
        return diag;
    };

    let raw_line = source
        .lines()
        .nth(line.saturating_sub(1))
        .map(|l| l.trim_end_matches('\r'));
    let column = raw_line
        .map(|l| l.len() - l.trim_start().len() + 1)
        .unwrap_or(1);
    let _ = writeln!(diag, " --> {file}:{line}:{column}");

    if let Some(text) = raw_line {
        let width = text.trim().len().max(1);
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, text);
        let _ = writeln!(
            diag,
            "  | {}{}",
            " ".repeat(column - 1),
            "^".repeat(width)
        );
    }

    diag
}

/// A cleaned source line that remembers where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// 1-based line number in the original source.
    pub line: usize,
    pub text: &'a str,
}

/// Label table built during numbering.
#[derive(Debug, Default)]
pub struct AsmContext {
    /// Label names mapped to the priority of the instruction that follows them.
    labels: HashMap<String, usize>,
}

impl AsmContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a label at the given priority.
    fn define_label(&mut self, name: &str, priority: usize, line: usize) -> Result<(), VMError> {
        if self.labels.contains_key(name) {
            return Err(VMError::DuplicateLabel {
                line,
                label: name.to_string(),
            });
        }
        self.labels.insert(name.to_string(), priority);
        Ok(())
    }

    /// Resolves a label to its priority.
    pub fn resolve_label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.iter().map(|(name, p)| (name.as_str(), *p))
    }
}

/// Trims lines and drops empty lines and comment lines, keeping order.
pub fn clean_source<'a, I>(lines: I) -> Vec<SourceLine<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let text = raw.trim();
            let is_comment = COMMENT_PREFIXES.iter().any(|p| text.starts_with(p));
            (!text.is_empty() && !is_comment).then_some(SourceLine {
                line: idx + 1,
                text,
            })
        })
        .collect()
}

/// Checks if a line is a label declaration.
fn is_label_def(text: &str) -> bool {
    text.ends_with(LABEL_SUFFIX)
}

/// Assigns priorities to instructions and records labels.
///
/// Labels take the current counter without advancing it, so they bind to the
/// instruction after them.
fn number_lines<'a>(
    lines: &[SourceLine<'a>],
) -> Result<(Vec<(u16, SourceLine<'a>)>, AsmContext), VMError> {
    let count = lines.iter().filter(|l| !is_label_def(l.text)).count();
    if count > usize::from(u16::MAX) + 1 {
        return Err(VMError::ProgramTooLarge { count });
    }

    let mut ctx = AsmContext::new();
    let mut numbered = Vec::with_capacity(count);
    let mut counter: usize = 0;

    for line in lines {
        if is_label_def(line.text) {
            let name = &line.text[..line.text.len() - LABEL_SUFFIX.len_utf8()];
            ctx.define_label(name, counter, line.line)?;
            continue;
        }
        // count was checked above, every counter value fits
        let priority = u16::try_from(counter).map_err(|_| VMError::ProgramTooLarge { count })?;
        numbered.push((priority, *line));
        counter += 1;
    }

    Ok((numbered, ctx))
}

/// Translates one instruction line into an operation.
fn translate_line(ctx: &AsmContext, line: &SourceLine) -> Result<Op, VMError> {
    if let Some(instr) = Instruction::from_mnemonic(line.text)
        && let Some(op) = Op::from_parts(instr, &[])
    {
        return Ok(op);
    }

    if let Some(arg) = line.text.strip_prefix(PUSH_PREFIX) {
        let arg = arg.trim();
        let value = match ctx.resolve_label(arg) {
            Some(priority) => priority as i64,
            None => arg
                .parse::<i64>()
                .map_err(|_| VMError::UnresolvablePushOperand {
                    line: line.line,
                    text: line.text.to_string(),
                    operand: arg.to_string(),
                })?,
        };
        return Ok(Op::Push { value });
    }

    Err(VMError::UnrecognizedInstruction {
        line: line.line,
        text: line.text.to_string(),
    })
}

/// Compiles source lines into namespaced codelines.
///
/// Stops at the first error; nothing is returned for a partly valid program.
pub fn assemble<'a, I>(lines: I) -> Result<Vec<Codeline>, VMError>
where
    I: IntoIterator<Item = &'a str>,
{
    let cleaned = clean_source(lines);
    let (numbered, ctx) = number_lines(&cleaned)?;

    numbered
        .iter()
        .map(|(priority, line)| {
            let op = translate_line(&ctx, line)?;
            Ok(Codeline::new(*priority, to_token(&op)))
        })
        .collect()
}

/// Compiles a whole source text.
pub fn assemble_source(source: &str) -> Result<Vec<Codeline>, VMError> {
    assemble(source.lines())
}

/// Reads and compiles a source file.
///
/// Assembly errors are also rendered as a diagnostic on the log.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Vec<Codeline>, VMError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|e| VMError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    assemble_source(&source).inspect_err(|err| {
        if err.line().is_some() {
            crate::error!(
                "{}",
                render_assembly_diagnostic(&path.display().to_string(), &source, err)
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(source: &str) -> Vec<(u16, String)> {
        assemble_source(source)
            .expect("assembly failed")
            .into_iter()
            .map(|c| (c.priority, c.code))
            .collect()
    }

    fn assemble_err(source: &str) -> VMError {
        assemble_source(source).expect_err("expected assembly error")
    }

    // ==================== Cleaning ====================

    #[test]
    fn clean_drops_blanks_and_comments() {
        let source = "  # a comment\n\n  left  \n; another\n// third\n\tright\n";
        let cleaned = clean_source(source.lines());
        assert_eq!(
            cleaned,
            vec![
                SourceLine {
                    line: 3,
                    text: "left"
                },
                SourceLine {
                    line: 6,
                    text: "right"
                },
            ]
        );
    }

    // ==================== Numbering ====================

    #[test]
    fn labels_bind_to_next_instruction() {
        let cleaned = clean_source("start:\nleft\nmid:\nright\nend:".lines());
        let (numbered, ctx) = number_lines(&cleaned).unwrap();
        assert_eq!(numbered.len(), 2);
        assert_eq!(ctx.resolve_label("start"), Some(0));
        assert_eq!(ctx.resolve_label("mid"), Some(1));
        assert_eq!(ctx.resolve_label("end"), Some(2));
        assert_eq!(ctx.labels().count(), 3);
    }

    #[test]
    fn duplicate_label_rejected() {
        assert!(matches!(
            assemble_err("a:\nleft\na:\nright"),
            VMError::DuplicateLabel { line: 3, label } if label == "a"
        ));
    }

    // ==================== Translation ====================

    #[test]
    fn zero_operand_opcodes_pass_through() {
        assert_eq!(
            codes("left\npusht\njmpc"),
            vec![
                (0, "left.mexico.invalid.".to_string()),
                (1, "pusht.mexico.invalid.".to_string()),
                (2, "jmpc.mexico.invalid.".to_string()),
            ]
        );
    }

    #[test]
    fn push_constants() {
        assert_eq!(
            codes("push 72\npush -1"),
            vec![
                (0, "push-72.mexico.invalid.".to_string()),
                (1, "push--1.mexico.invalid.".to_string()),
            ]
        );
    }

    #[test]
    fn push_label_declared_before_use() {
        assert_eq!(
            codes("a:\npush a\njmp"),
            vec![
                (0, "push-0.mexico.invalid.".to_string()),
                (1, "jmp.mexico.invalid.".to_string()),
            ]
        );
    }

    #[test]
    fn push_label_declared_after_use() {
        assert_eq!(
            codes("push done\njmp\nleft\ndone:\nright"),
            vec![
                (0, "push-3.mexico.invalid.".to_string()),
                (1, "jmp.mexico.invalid.".to_string()),
                (2, "left.mexico.invalid.".to_string()),
                (3, "right.mexico.invalid.".to_string()),
            ]
        );
    }

    #[test]
    fn label_used_on_both_sides_of_declaration() {
        assert_eq!(
            codes("push l2\nl2:\nleft\npush l2"),
            vec![
                (0, "push-1.mexico.invalid.".to_string()),
                (1, "left.mexico.invalid.".to_string()),
                (2, "push-1.mexico.invalid.".to_string()),
            ]
        );
    }

    #[test]
    fn label_wins_over_numeric_literal() {
        // a label literally named "7" shadows the constant
        assert_eq!(
            codes("left\n7:\nright\npush 7"),
            vec![
                (0, "left.mexico.invalid.".to_string()),
                (1, "right.mexico.invalid.".to_string()),
                (2, "push-1.mexico.invalid.".to_string()),
            ]
        );
    }

    #[test]
    fn unresolvable_push_operand() {
        let err = assemble_err("left\n\npush nowhere");
        assert!(matches!(
            &err,
            VMError::UnresolvablePushOperand { line: 3, text, operand }
                if text == "push nowhere" && operand == "nowhere"
        ));
    }

    #[test]
    fn unrecognized_instruction() {
        assert!(matches!(
            assemble_err("left\nhalt"),
            VMError::UnrecognizedInstruction { line: 2, text } if text == "halt"
        ));
        assert!(matches!(
            assemble_err("push"),
            VMError::UnrecognizedInstruction { .. }
        ));
        assert!(matches!(
            assemble_err("LEFT"),
            VMError::UnrecognizedInstruction { .. }
        ));
    }

    #[test]
    fn first_error_stops_assembly() {
        let err = assemble_err("bogus\npush missing");
        assert!(matches!(err, VMError::UnrecognizedInstruction { line: 1, .. }));
    }

    #[test]
    fn empty_source_assembles_to_nothing() {
        assert!(assemble_source("# only comments\n\n").unwrap().is_empty());
    }

    #[test]
    fn too_many_instructions() {
        let source = "del\n".repeat(usize::from(u16::MAX) + 2);
        assert!(matches!(
            assemble_err(&source),
            VMError::ProgramTooLarge { count: 65_537 }
        ));
    }

    #[test]
    fn largest_program_fits() {
        let source = "del\n".repeat(usize::from(u16::MAX) + 1);
        let code = assemble_source(&source).unwrap();
        assert_eq!(code.last().map(|c| c.priority), Some(u16::MAX));
    }

    // ==================== Files and diagnostics ====================

    #[test]
    fn assemble_file_reads_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.mex");
        fs::write(&path, "push 72\nprint\n").unwrap();
        let code = assemble_file(&path).unwrap();
        assert_eq!(code.len(), 2);
    }

    #[test]
    fn assemble_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = assemble_file(dir.path().join("absent.mex")).unwrap_err();
        assert!(matches!(err, VMError::Io { .. }));
    }

    #[test]
    fn diagnostic_points_at_line() {
        let source = "left\n   frobnicate\n";
        let err = assemble_err(source);
        let diag = render_assembly_diagnostic("prog.mex", source, &err);
        assert!(diag.starts_with("error: line 2: unrecognized instruction 'frobnicate'"));
        assert!(diag.contains(" --> prog.mex:2:4"));
        assert!(diag.contains("   2 |    frobnicate"));
        assert!(diag.contains("  |    ^^^^^^^^^^"));
    }
}
