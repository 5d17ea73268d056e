//! Zone file transport.
//!
//! Compiled programs are published as MX records of a base domain. The
//! writer renders a minimal zone (one SOA plus one MX per codeline) that a
//! DNS server can load. The reader is the other half: it pulls the MX records
//! of a domain back out of such a file, standing in for a live MX lookup.

use crate::utils::time::UtcTime;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::program::Codeline;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Base domain used when none is configured.
pub const DEFAULT_BASE_DOMAIN: &str = "mexico.invalid";

/// Settings for rendering a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneConfig {
    /// Domain the program is published under.
    pub base_domain: String,
    /// SOA serial. Defaults to the current UTC hour as `YYYYMMDDHH`.
    pub serial: Option<String>,
}

impl ZoneConfig {
    pub fn new(base_domain: impl Into<String>) -> Self {
        Self {
            base_domain: base_domain.into(),
            serial: None,
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Base domain as a fully qualified name.
    pub fn origin(&self) -> String {
        fqdn(&self.base_domain)
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DOMAIN)
    }
}

/// Appends the root dot if it is missing.
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Renders the zone for a compiled program.
pub fn render_zone(config: &ZoneConfig, code: &[Codeline]) -> String {
    let domain = config.origin();
    let serial = config
        .serial
        .clone()
        .unwrap_or_else(|| UtcTime::now().zone_serial());

    let mut zone = String::new();
    let _ = writeln!(
        zone,
        "{domain}\tIN SOA\t{domain} mexico.{domain} ({serial} 1h 1h 1h 1h)"
    );
    for line in code {
        let _ = writeln!(zone, "{domain}\tIN MX\t{} {}", line.priority, line.code);
    }
    zone
}

/// Renders the zone and writes it to `path`.
pub fn write_zone_file<P: AsRef<Path>>(
    path: P,
    config: &ZoneConfig,
    code: &[Codeline],
) -> Result<(), VMError> {
    let path = path.as_ref();
    fs::write(path, render_zone(config, code)).map_err(|e| VMError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Record classes that may appear between owner and type.
const CLASSES: [&str; 4] = ["IN", "CH", "HS", "CS"];

/// Removes a `;` comment, ignoring semicolons inside quoted strings.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

/// One logical record: parenthesised continuations are joined.
struct Entry {
    line: usize,
    inherits_owner: bool,
    text: String,
}

fn logical_entries(text: &str) -> Result<Vec<Entry>, VMError> {
    let mut entries = Vec::new();
    let mut open: Option<Entry> = None;

    for (idx, raw) in text.lines().enumerate() {
        let content = strip_comment(raw);
        let depth_change = content.matches('(').count() as isize
            - content.matches(')').count() as isize;

        if let Some(entry) = open.as_mut() {
            entry.text.push(' ');
            entry.text.push_str(content);
            if entry.text.matches('(').count() <= entry.text.matches(')').count() {
                entries.extend(open.take());
            }
            continue;
        }

        if content.trim().is_empty() {
            continue;
        }

        let entry = Entry {
            line: idx + 1,
            inherits_owner: content.starts_with([' ', '\t']),
            text: content.to_string(),
        };
        if depth_change > 0 {
            open = Some(entry);
        } else {
            entries.push(entry);
        }
    }

    if let Some(entry) = open {
        return Err(VMError::ZoneSyntax {
            line: entry.line,
            reason: "unclosed parenthesis".to_string(),
        });
    }
    Ok(entries)
}

/// Resolves a possibly relative name against the origin.
fn absolute(name: &str, origin: &str) -> String {
    if name == "@" {
        origin.to_string()
    } else if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.{origin}")
    }
}

/// Extracts the MX records from zone file text as raw codelines.
///
/// With `domain` set, only records owned by that domain are returned. The
/// origin for relative names is the last `$ORIGIN`, else `domain`, else the
/// root. Other record types are skipped.
pub fn parse_zone(text: &str, domain: Option<&str>) -> Result<Vec<Codeline>, VMError> {
    let wanted = domain.map(|d| fqdn(d).to_ascii_lowercase());
    let mut origin = wanted.clone().unwrap_or_else(|| ".".to_string());
    let mut owner: Option<String> = None;
    let mut records = Vec::new();

    for entry in logical_entries(text)? {
        let cleaned = entry.text.replace(['(', ')'], " ");
        let mut tokens = cleaned.split_whitespace().peekable();

        if let Some(&directive) = tokens.peek()
            && directive.starts_with('$')
        {
            if directive.eq_ignore_ascii_case("$ORIGIN")
                && let Some(name) = tokens.nth(1)
            {
                origin = fqdn(name).to_ascii_lowercase();
            }
            continue;
        }

        if !entry.inherits_owner {
            let Some(name) = tokens.next() else {
                continue;
            };
            owner = Some(absolute(name, &origin).to_ascii_lowercase());
        }
        let Some(current_owner) = owner.as_deref() else {
            return Err(VMError::ZoneSyntax {
                line: entry.line,
                reason: "record without an owner".to_string(),
            });
        };

        // skip TTL and class, in either order
        let rtype = loop {
            match tokens.next() {
                Some(tok)
                    if tok.starts_with(|c: char| c.is_ascii_digit())
                        || CLASSES.iter().any(|c| tok.eq_ignore_ascii_case(c)) =>
                {
                    continue;
                }
                Some(tok) => break tok,
                None => {
                    return Err(VMError::ZoneSyntax {
                        line: entry.line,
                        reason: "missing record type".to_string(),
                    });
                }
            }
        };

        if !rtype.eq_ignore_ascii_case("MX") {
            continue;
        }
        if wanted.as_deref().is_some_and(|w| w != current_owner) {
            continue;
        }

        let (Some(preference), Some(exchange)) = (tokens.next(), tokens.next()) else {
            return Err(VMError::ZoneSyntax {
                line: entry.line,
                reason: "MX record needs a preference and an exchange".to_string(),
            });
        };
        let priority = preference
            .parse::<u16>()
            .map_err(|_| VMError::ZoneSyntax {
                line: entry.line,
                reason: format!("invalid MX preference '{preference}'"),
            })?;

        records.push(Codeline::new(priority, absolute(exchange, &origin)));
    }

    Ok(records)
}

/// Reads a zone file and extracts its MX records.
pub fn read_zone_file<P: AsRef<Path>>(
    path: P,
    domain: Option<&str>,
) -> Result<Vec<Codeline>, VMError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| VMError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_zone(&text, domain)
}
