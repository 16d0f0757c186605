//! Value compatibility tests and placeholder synthesis.

use crate::parser::RawToken;
use crate::schema::{ColumnMeta, DataType};
use once_cell::sync::Lazy;
use regex::Regex;

static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$").unwrap());

static DATE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());

/// Hex, bit and charset-introduced literals MySQL dumps emit for binary data.
static BINARY_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?:0x[0-9a-f]*|x'[0-9a-f]*'|0b[01]*|b'[01]*'|_[a-z0-9]+\s*'.*')$").unwrap()
});

pub fn is_numeric_literal(s: &str) -> bool {
    NUMERIC_RE.is_match(s)
}

/// Can `token` be written into `column` with confidence that it belongs there?
pub fn is_compatible_value(column: &ColumnMeta, token: &RawToken) -> bool {
    match token {
        RawToken::Default => true,
        RawToken::Null => column.nullable || column.has_default || column.auto_increment,
        RawToken::Quoted(_) => match column.data_type {
            DataType::Enum => token
                .unquoted()
                .map(|v| column.enum_values.iter().any(|e| e.eq_ignore_ascii_case(&v)))
                .unwrap_or(false),
            DataType::Json => token.unquoted().map(|v| looks_like_json(&v)).unwrap_or(false),
            DataType::Date | DataType::DateTime => token
                .unquoted()
                .map(|v| DATE_PREFIX_RE.is_match(&v))
                .unwrap_or(false),
            DataType::Time | DataType::String => true,
            DataType::Integer | DataType::Decimal | DataType::Boolean => false,
        },
        RawToken::Bare(text) if column.is_bit() => {
            is_numeric_literal(text) || BINARY_LITERAL_RE.is_match(text)
        }
        RawToken::Bare(text) => match column.data_type {
            DataType::Integer | DataType::Decimal => is_numeric_literal(text),
            DataType::Boolean => {
                is_numeric_literal(text)
                    || text.eq_ignore_ascii_case("TRUE")
                    || text.eq_ignore_ascii_case("FALSE")
            }
            DataType::String => BINARY_LITERAL_RE.is_match(text),
            _ => false,
        },
    }
}

/// Can a value addressed by column name be written as-is?
///
/// Named values are kept verbatim, whatever their literal shape. Only a
/// generated column or a `NULL` the column cannot hold is refused.
pub fn accepts_by_name(column: &ColumnMeta, token: &RawToken) -> bool {
    if column.generated {
        return *token == RawToken::Default;
    }
    match token {
        RawToken::Null => is_compatible_value(column, token),
        _ => true,
    }
}

fn looks_like_json(content: &str) -> bool {
    let trimmed = content.trim_start();
    match trimmed.chars().next() {
        Some('{' | '[' | '"' | '-' | '+') => true,
        Some(c) if c.is_ascii_digit() => true,
        _ => {
            let lower = trimmed.to_ascii_lowercase();
            lower.starts_with("true") || lower.starts_with("false") || lower.starts_with("null")
        }
    }
}

/// Safe value for a column that received no usable source value.
pub fn placeholder_for_column(column: &ColumnMeta) -> RawToken {
    if column.has_default || column.generated {
        return RawToken::Default;
    }
    if column.nullable || column.auto_increment {
        return RawToken::Null;
    }

    match column.data_type {
        DataType::Enum => match column.enum_values.first() {
            Some(first) => RawToken::Quoted(quote_literal(first)),
            None => RawToken::Quoted("''".to_string()),
        },
        DataType::Integer | DataType::Decimal | DataType::Boolean => RawToken::Bare("0".to_string()),
        DataType::Json => RawToken::Quoted("'{}'".to_string()),
        DataType::Date | DataType::DateTime => RawToken::Bare("CURRENT_TIMESTAMP".to_string()),
        DataType::Time => RawToken::Quoted("'00:00:00'".to_string()),
        DataType::String => RawToken::Quoted("''".to_string()),
    }
}

/// Quote a string as a MySQL single-quoted literal.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(s: &str) -> RawToken {
        RawToken::Quoted(s.to_string())
    }

    fn bare(s: &str) -> RawToken {
        RawToken::Bare(s.to_string())
    }

    #[test]
    fn test_keywords() {
        let required = ColumnMeta::new("a", "int").nullable(false);
        let nullable = ColumnMeta::new("b", "int");
        let identity = ColumnMeta::new("id", "int").nullable(false).auto_increment(true);
        assert!(is_compatible_value(&required, &RawToken::Default));
        assert!(!is_compatible_value(&required, &RawToken::Null));
        assert!(is_compatible_value(&nullable, &RawToken::Null));
        assert!(is_compatible_value(&identity, &RawToken::Null));
    }

    #[test]
    fn test_enum_membership() {
        let col = ColumnMeta::new("status", "enum('new','paid')").nullable(false);
        assert!(is_compatible_value(&col, &quoted("'PAID'")));
        assert!(!is_compatible_value(&col, &quoted("'refunded'")));
        assert!(!is_compatible_value(&col, &bare("1")));
        assert_eq!(placeholder_for_column(&col), quoted("'new'"));
    }

    #[test]
    fn test_json() {
        let col = ColumnMeta::new("meta", "json").nullable(false);
        assert!(is_compatible_value(&col, &quoted(r#"'{"a":1}'"#)));
        assert!(is_compatible_value(&col, &quoted("'[1,2]'")));
        assert!(is_compatible_value(&col, &quoted("'true'")));
        assert!(is_compatible_value(&col, &quoted("'-3'")));
        assert!(!is_compatible_value(&col, &quoted("'hello'")));
        assert_eq!(placeholder_for_column(&col), quoted("'{}'"));
    }

    #[test]
    fn test_numeric_and_boolean() {
        let int = ColumnMeta::new("n", "int").nullable(false);
        let flag = ColumnMeta::new("f", "tinyint(1)").nullable(false);
        assert!(is_compatible_value(&int, &bare("-42")));
        assert!(is_compatible_value(&int, &bare("1.5e3")));
        assert!(!is_compatible_value(&int, &quoted("'42'")));
        assert!(!is_compatible_value(&int, &bare("TRUE")));
        assert!(is_compatible_value(&flag, &bare("true")));
        assert!(is_compatible_value(&flag, &bare("0")));
        assert_eq!(placeholder_for_column(&flag), bare("0"));
    }

    #[test]
    fn test_dates() {
        let col = ColumnMeta::new("at", "datetime").nullable(false);
        assert!(is_compatible_value(&col, &quoted("'2023-01-31 10:00:00'")));
        assert!(!is_compatible_value(&col, &quoted("'yesterday'")));
        assert!(!is_compatible_value(&col, &bare("20230131")));
        assert_eq!(placeholder_for_column(&col), bare("CURRENT_TIMESTAMP"));
    }

    #[test]
    fn test_strings() {
        let col = ColumnMeta::new("name", "varchar(10)").nullable(false);
        assert!(is_compatible_value(&col, &quoted("'Ada'")));
        assert!(is_compatible_value(&col, &bare("0x4164")));
        assert!(is_compatible_value(&col, &bare("_binary 'x'")));
        assert!(!is_compatible_value(&col, &bare("42")));
        assert!(accepts_by_name(&col, &bare("42")));
        assert_eq!(placeholder_for_column(&col), quoted("''"));
    }

    #[test]
    fn test_bit_literals() {
        let flag = ColumnMeta::new("flag", "bit(1)").nullable(false);
        let mask = ColumnMeta::new("mask", "bit(8)").nullable(false);
        assert!(is_compatible_value(&flag, &bare("b'1'")));
        assert!(is_compatible_value(&flag, &bare("0x01")));
        assert!(is_compatible_value(&flag, &bare("_binary '\\0'")));
        assert!(is_compatible_value(&mask, &bare("b'10100000'")));
        assert!(is_compatible_value(&mask, &bare("3")));
        assert!(!is_compatible_value(&mask, &quoted("'3'")));

        let int = ColumnMeta::new("n", "int").nullable(false);
        assert!(!is_compatible_value(&int, &bare("0x01")));
    }

    #[test]
    fn test_accepts_by_name_keeps_literal_shape() {
        let price = ColumnMeta::new("price", "decimal(8,2)").nullable(false);
        let at = ColumnMeta::new("at", "datetime").nullable(false);
        let note = ColumnMeta::new("note", "text");
        assert!(accepts_by_name(&price, &quoted("'9.99'")));
        assert!(accepts_by_name(&at, &bare("NOW()")));
        assert!(accepts_by_name(&note, &RawToken::Null));
        assert!(!accepts_by_name(&price, &RawToken::Null));

        let computed = ColumnMeta::new("total_x2", "int").generated(true);
        assert!(!accepts_by_name(&computed, &bare("4")));
        assert!(accepts_by_name(&computed, &RawToken::Default));
    }

    #[test]
    fn test_placeholder_precedence() {
        let defaulted = ColumnMeta::new("a", "int").nullable(false).with_default(true);
        let nullable = ColumnMeta::new("b", "int");
        let identity = ColumnMeta::new("c", "int").nullable(false).auto_increment(true);
        let generated = ColumnMeta::new("d", "int").generated(true);
        assert_eq!(placeholder_for_column(&defaulted), RawToken::Default);
        assert_eq!(placeholder_for_column(&nullable), RawToken::Null);
        assert_eq!(placeholder_for_column(&identity), RawToken::Null);
        assert_eq!(placeholder_for_column(&generated), RawToken::Default);
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal("a\\b"), "'a\\\\b'");
    }
}
