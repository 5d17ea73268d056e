//! Turns MX records back into executable codelines.
//!
//! The records come from a lookup on some domain, so they arrive unordered
//! and may include ordinary mail exchangers. Only exchanges under the
//! instruction namespace are kept; everything else is silently ignored.

use crate::virtual_machine::program::{Codeline, NAMESPACE};

/// Restores the command form of a namespaced token.
///
/// Returns `None` for exchanges outside the namespace. Exactly one trailing
/// namespace label is removed, and the first `-` becomes the space between
/// opcode and operand: `push--5.mexico.invalid.` yields `push -5`.
pub fn decode_token(token: &str) -> Option<String> {
    let command = token.strip_suffix(NAMESPACE)?.strip_suffix('.')?;
    Some(command.replacen('-', " ", 1))
}

/// Filters, decodes and orders raw `(priority, token)` records.
///
/// The sort is stable: records sharing a priority keep their input order.
/// Opcode names are not checked here; unknown ones fail when executed.
pub fn decode<'a, I>(records: I) -> Vec<Codeline>
where
    I: IntoIterator<Item = &'a Codeline>,
{
    let mut lines: Vec<Codeline> = records
        .into_iter()
        .filter_map(|record| {
            decode_token(&record.code).map(|code| Codeline::new(record.priority, code))
        })
        .collect();
    lines.sort_by_key(|line| line.priority);
    lines
}
