//! Tuple and field splitting for `VALUES` clauses.

use super::ScanState;
use std::borrow::Cow;
use std::fmt;

/// One raw field of a dump tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawToken {
    /// `NULL` keyword
    Null,
    /// `DEFAULT` keyword
    Default,
    /// String literal exactly as written, quotes included
    Quoted(String),
    /// Numeric literal, keyword or expression as written
    Bare(String),
}

impl RawToken {
    /// Classify a single trimmed field.
    pub fn classify(field: &str) -> Self {
        let field = field.trim();
        if field.eq_ignore_ascii_case("NULL") {
            return RawToken::Null;
        }
        if field.eq_ignore_ascii_case("DEFAULT") {
            return RawToken::Default;
        }

        let bytes = field.as_bytes();
        if bytes.len() >= 2 {
            let first = bytes[0];
            let last = bytes[bytes.len() - 1];
            if (first == b'\'' || first == b'"') && first == last {
                return RawToken::Quoted(field.to_string());
            }
        }

        RawToken::Bare(field.to_string())
    }

    /// SQL text for re-emission.
    pub fn as_sql(&self) -> &str {
        match self {
            RawToken::Null => "NULL",
            RawToken::Default => "DEFAULT",
            RawToken::Quoted(s) | RawToken::Bare(s) => s,
        }
    }

    /// Unescaped content of a quoted literal; `None` for other tokens.
    pub fn unquoted(&self) -> Option<Cow<'_, str>> {
        match self {
            RawToken::Quoted(s) => Some(unescape_literal(s)),
            _ => None,
        }
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self, RawToken::Quoted(_))
    }
}

impl fmt::Display for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Strip the outer quotes of a MySQL string literal and resolve escapes.
pub fn unescape_literal(literal: &str) -> Cow<'_, str> {
    let bytes = literal.as_bytes();
    if bytes.len() < 2 {
        return Cow::Borrowed(literal);
    }
    let quote = bytes[0] as char;
    let inner = &literal[1..literal.len() - 1];

    if !inner.contains('\\') && !inner.contains(quote) {
        return Cow::Borrowed(inner);
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('0') => out.push('\0'),
                Some('Z') => out.push('\x1a'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else if c == quote && chars.peek() == Some(&quote) {
            chars.next();
            out.push(quote);
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Split the text after `VALUES` into the inner text of each top-level tuple.
///
/// Scanning stops at the first word character found at depth zero once a
/// tuple has been read, so trailing clauses such as
/// `ON DUPLICATE KEY UPDATE a = VALUES(a)` are not taken for tuples.
pub fn split_value_tuples(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut tuples = Vec::new();
    let mut state = ScanState::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        if state.in_code() {
            match bytes[i] {
                b'(' => {
                    if depth == 0 {
                        start = i + 1;
                    }
                    depth += 1;
                }
                b')' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        tuples.push(text[start..i].to_string());
                    }
                }
                b if depth == 0 && !tuples.is_empty() && b.is_ascii_alphabetic() => break,
                _ => {}
            }
        }
        i += state.step(bytes, i);
    }

    tuples
}

/// Split one tuple's inner text on top-level commas.
///
/// Fields keep their original quoting and are trimmed. An empty tuple yields
/// no fields.
pub fn split_tuple_fields(tuple: &str) -> Vec<String> {
    let bytes = tuple.as_bytes();
    let mut fields = Vec::new();
    let mut state = ScanState::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut i = 0;

    if tuple.trim().is_empty() {
        return fields;
    }

    while i < bytes.len() {
        if state.in_code() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => {
                    fields.push(tuple[start..i].trim().to_string());
                    start = i + 1;
                }
                _ => {}
            }
        }
        i += state.step(bytes, i);
    }
    fields.push(tuple[start..].trim().to_string());

    fields
}

/// Split a tuple straight into classified tokens.
pub fn tokenize_tuple(tuple: &str) -> Vec<RawToken> {
    split_tuple_fields(tuple)
        .iter()
        .map(|f| RawToken::classify(f))
        .collect()
}
