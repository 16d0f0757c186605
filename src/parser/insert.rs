//! `INSERT INTO ... VALUES` statement recovery.

use super::values::{split_value_tuples, tokenize_tuple, RawToken};
use super::strip_leading_comments;
use once_cell::sync::Lazy;
use regex::Regex;

/// Header of an INSERT: modifiers, table, optional column list, then VALUES.
static INSERT_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^INSERT\s+(?:(?:LOW_PRIORITY|DELAYED|HIGH_PRIORITY)\s+)?(IGNORE\s+)?INTO\s+((?:(?:`[^`]+`|"[^"]+"|[\w$]+)\s*\.\s*)?(?:`[^`]+`|"[^"]+"|[\w$]+))\s*(?:\(([^)]*)\))?\s*VALUES?\b"#,
    )
    .unwrap()
});

/// A data-carrying INSERT recovered from the dump.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInsert {
    /// Unqualified, unquoted table name
    pub table: String,
    /// Explicit column list, when the statement names its columns
    pub columns: Option<Vec<String>>,
    /// One token list per `(...)` tuple
    pub tuples: Vec<Vec<RawToken>>,
    /// `INSERT IGNORE`
    pub ignore: bool,
}

impl ParsedInsert {
    pub fn is_positional(&self) -> bool {
        self.columns.is_none()
    }

    /// Representative row used for alignment.
    pub fn first_tuple(&self) -> Option<&[RawToken]> {
        self.tuples.first().map(Vec::as_slice)
    }
}

/// Parse an INSERT statement. Returns `None` for anything that is not an
/// `INSERT ... VALUES` statement (e.g. `INSERT ... SELECT`).
pub fn parse_insert(stmt: &str) -> Option<ParsedInsert> {
    let body = strip_leading_comments(stmt);
    let caps = INSERT_HEADER_RE.captures(body)?;

    let ignore = caps.get(1).is_some();
    let table = unqualified_name(caps.get(2)?.as_str());
    let columns = caps.get(3).map(|m| parse_column_list(m.as_str()));
    let values_end = caps.get(0)?.end();

    let tuples = split_value_tuples(&body[values_end..])
        .iter()
        .map(|t| tokenize_tuple(t))
        .collect();

    Some(ParsedInsert {
        table,
        columns,
        tuples,
        ignore,
    })
}

/// Strip quoting and any schema qualifier from a table reference.
pub fn unqualified_name(reference: &str) -> String {
    let last = split_qualified(reference).pop().unwrap_or_default();
    unquote_identifier(&last)
}

fn split_qualified(reference: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in reference.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None if c == '`' || c == '"' => {
                quote = Some(c);
                current.push(c);
            }
            None if c == '.' => parts.push(std::mem::take(&mut current)),
            None => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Remove surrounding backticks or double quotes from an identifier.
pub fn unquote_identifier(ident: &str) -> String {
    let ident = ident.trim();
    for q in ['`', '"'] {
        if ident.len() >= 2 && ident.starts_with(q) && ident.ends_with(q) {
            let doubled = format!("{q}{q}");
            return ident[1..ident.len() - 1].replace(&doubled, &q.to_string());
        }
    }
    ident.to_string()
}

/// Parse a comma-separated column list, stripping identifier quotes.
pub fn parse_column_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(unquote_identifier)
        .filter(|c| !c.is_empty())
        .collect()
}
