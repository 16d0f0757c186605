//! SQL dump tokenizing and INSERT recovery.
//!
//! The scanner in this module is shared by every splitter: statement
//! splitting, tuple splitting and field splitting all thread a [`ScanState`]
//! through the bytes they walk, so quote, escape and comment handling is
//! identical everywhere.

pub mod insert;
pub mod values;

pub use insert::{parse_insert, ParsedInsert};
pub use values::{split_tuple_fields, split_value_tuples, RawToken};

/// Lexical context of the scanner at the current byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanContext {
    /// Plain SQL text, where `;`, `(`, `)` and `,` are structural
    #[default]
    Code,
    /// Inside `'...'`
    SingleQuote,
    /// Inside `"..."`
    DoubleQuote,
    /// Inside a `` `...` `` identifier
    Backtick,
    /// Inside `-- ...` or `# ...` up to end of line
    LineComment,
    /// Inside `/* ... */` (including MySQL `/*! ... */` conditional comments)
    BlockComment,
}

/// Quote/escape/comment state threaded through a byte scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanState {
    context: ScanContext,
    escaped: bool,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the byte about to be stepped over is structural SQL.
    #[inline]
    pub fn in_code(&self) -> bool {
        self.context == ScanContext::Code && !self.escaped
    }

    pub fn context(&self) -> ScanContext {
        self.context
    }

    /// Advance over the byte at `i`, returning how many bytes were consumed.
    ///
    /// Two bytes are consumed for doubled quotes (`''`, `""`, ` `` `) and for
    /// comment delimiters, so callers never observe half of such a pair.
    pub fn step(&mut self, bytes: &[u8], i: usize) -> usize {
        if self.escaped {
            self.escaped = false;
            return 1;
        }

        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match self.context {
            ScanContext::Code => match b {
                b'\'' => self.context = ScanContext::SingleQuote,
                b'"' => self.context = ScanContext::DoubleQuote,
                b'`' => self.context = ScanContext::Backtick,
                b'#' => self.context = ScanContext::LineComment,
                b'-' if next == Some(b'-') && starts_line_comment(bytes.get(i + 2).copied()) => {
                    self.context = ScanContext::LineComment;
                    return 2;
                }
                b'/' if next == Some(b'*') => {
                    self.context = ScanContext::BlockComment;
                    return 2;
                }
                _ => {}
            },
            ScanContext::SingleQuote => return self.step_quoted(b, next, b'\'', true),
            ScanContext::DoubleQuote => return self.step_quoted(b, next, b'"', true),
            ScanContext::Backtick => return self.step_quoted(b, next, b'`', false),
            ScanContext::LineComment => {
                if b == b'\n' {
                    self.context = ScanContext::Code;
                }
            }
            ScanContext::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    self.context = ScanContext::Code;
                    return 2;
                }
            }
        }

        1
    }

    fn step_quoted(&mut self, b: u8, next: Option<u8>, quote: u8, backslash: bool) -> usize {
        if backslash && b == b'\\' {
            self.escaped = true;
            return 1;
        }
        if b == quote {
            if next == Some(quote) {
                return 2;
            }
            self.context = ScanContext::Code;
        }
        1
    }
}

/// MySQL only treats `--` as a comment when followed by whitespace or EOF.
#[inline]
fn starts_line_comment(after: Option<u8>) -> bool {
    match after {
        None => true,
        Some(b) => b.is_ascii_whitespace(),
    }
}

/// Split a script into trimmed, non-empty top-level statements.
///
/// The terminating `;` is not included. A trailing fragment without a
/// terminator is returned as the last statement when it is not blank.
pub fn split_statements(script: &str) -> Vec<String> {
    let bytes = script.as_bytes();
    let mut statements = Vec::new();
    let mut state = ScanState::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if state.in_code() && bytes[i] == b';' {
            push_trimmed(&mut statements, &script[start..i]);
            i += 1;
            start = i;
            continue;
        }
        i += state.step(bytes, i);
    }

    if start < bytes.len() {
        push_trimmed(&mut statements, &script[start..]);
    }

    statements
}

fn push_trimmed(out: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Remove leading whitespace and comments from a statement.
///
/// Conditional comments (`/*!40101 ... */`) are stripped like any other block
/// comment; the restore never replays their session settings.
pub fn strip_leading_comments(stmt: &str) -> &str {
    let mut rest = stmt.trim_start();
    loop {
        if rest.starts_with("/*") {
            match rest.find("*/") {
                Some(end) => rest = rest[end + 2..].trim_start(),
                None => return "",
            }
        } else if rest.starts_with('#')
            || (rest.starts_with("--")
                && starts_line_comment(rest.as_bytes().get(2).copied()))
        {
            match rest.find('\n') {
                Some(end) => rest = rest[end + 1..].trim_start(),
                None => return "",
            }
        } else {
            return rest;
        }
    }
}

/// Statement classification for the restore's keep/drop decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Lock,
    Unlock,
    DropTable,
    Truncate,
    CreateTable,
    AlterTable,
    Set,
    /// Nothing but comments
    Comment,
    Other,
}

impl StatementKind {
    pub fn classify(stmt: &str) -> Self {
        let body = strip_leading_comments(stmt);
        if body.is_empty() {
            return StatementKind::Comment;
        }

        let words: Vec<String> = body
            .split_whitespace()
            .take(2)
            .map(|w| w.to_ascii_uppercase())
            .collect();
        let first = words.first().map(String::as_str).unwrap_or("");
        let second = words.get(1).map(String::as_str).unwrap_or("");

        match (first, second) {
            ("INSERT", _) => StatementKind::Insert,
            ("LOCK", "TABLES" | "TABLE") => StatementKind::Lock,
            ("UNLOCK", "TABLES" | "TABLE") => StatementKind::Unlock,
            ("DROP", "TABLE") => StatementKind::DropTable,
            ("TRUNCATE", _) => StatementKind::Truncate,
            ("CREATE", "TABLE") => StatementKind::CreateTable,
            ("ALTER", "TABLE") => StatementKind::AlterTable,
            ("SET", _) => StatementKind::Set,
            _ => StatementKind::Other,
        }
    }

    /// Schema, session and locking statements that a data restore discards.
    pub fn is_dropped(&self) -> bool {
        matches!(
            self,
            StatementKind::Lock
                | StatementKind::Unlock
                | StatementKind::DropTable
                | StatementKind::Truncate
                | StatementKind::CreateTable
                | StatementKind::AlterTable
                | StatementKind::Set
        )
    }
}
