//! Schema catalog from a MySQL DDL file.
//!
//! Parses the CREATE TABLE statements of a schema script (for example the
//! output of `mysqldump --no-data`) to extract, per table:
//! - Column names in declaration order
//! - Column type declarations
//! - Nullability, defaults, AUTO_INCREMENT and generated columns

use super::{Catalog, ColumnMeta, TableCatalog};
use crate::parser::insert::{unqualified_name, unquote_identifier};
use crate::parser::{split_statements, split_tuple_fields, strip_leading_comments, ScanState, StatementKind};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Regex to extract table name from CREATE TABLE
/// Supports: `table`, "table", table (unquoted), schema.table
static CREATE_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^CREATE\s+(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?((?:(?:`[^`]+`|"[^"]+"|[\w$]+)\s*\.\s*)?(?:`[^`]+`|"[^"]+"|[\w$]+))"#,
    )
    .unwrap()
});

/// Column name followed by the type keyword
static COLUMN_HEAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(`(?:[^`]|``)+`|"[^"]+"|[\w$]+)\s+([A-Za-z]+)"#).unwrap()
});

/// Type modifiers that belong to the type declaration rather than the attributes
static TYPE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*((?:(?:unsigned|signed|zerofill)\b\s*)+)").unwrap());

static NOT_NULL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").unwrap());

static DEFAULT_NULL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bDEFAULT\s+NULL\b").unwrap());

static DEFAULT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bDEFAULT\b").unwrap());

static AUTO_INCREMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bAUTO_INCREMENT\b").unwrap());

/// `GENERATED ALWAYS AS (...)` or the short form `AS (...)`
static GENERATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\bGENERATED\s+ALWAYS\s+)?\bAS\s*\(").unwrap());

/// Table-level clauses inside a CREATE TABLE body that are not columns
const CONSTRAINT_PREFIXES: &[&str] = &[
    "PRIMARY KEY",
    "CONSTRAINT",
    "FOREIGN KEY",
    "KEY ",
    "INDEX ",
    "UNIQUE ",
    "UNIQUE(",
    "FULLTEXT ",
    "SPATIAL ",
    "CHECK ",
    "CHECK(",
];

/// Load a catalog from a DDL file on disk.
pub fn load_ddl_catalog(path: &Path) -> anyhow::Result<Catalog> {
    let script = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema DDL {}", path.display()))?;
    Ok(parse_ddl(&script))
}

/// Build a catalog from every CREATE TABLE statement in a script.
pub fn parse_ddl(script: &str) -> Catalog {
    let mut catalog = Catalog::new();
    for stmt in split_statements(script) {
        if StatementKind::classify(&stmt) != StatementKind::CreateTable {
            continue;
        }
        if let Some(table) = parse_create_table(&stmt) {
            catalog.add_table(table);
        }
    }
    catalog
}

/// Parse a single CREATE TABLE statement.
pub fn parse_create_table(stmt: &str) -> Option<TableCatalog> {
    let body_stmt = strip_leading_comments(stmt);
    let name = extract_create_table_name(body_stmt)?;
    let body = extract_table_body(body_stmt)?;

    let mut table = TableCatalog::new(name);
    for part in split_tuple_fields(body) {
        let upper = part.to_uppercase();
        if part.is_empty() || CONSTRAINT_PREFIXES.iter().any(|p| upper.starts_with(p)) {
            continue;
        }
        if let Some(col) = parse_column_def(&part) {
            table.columns.push(col);
        }
    }
    Some(table)
}

/// Extract table name from CREATE TABLE statement
pub fn extract_create_table_name(stmt: &str) -> Option<String> {
    CREATE_TABLE_NAME_RE
        .captures(stmt)
        .and_then(|c| c.get(1))
        .map(|m| unqualified_name(m.as_str()))
}

/// Extract the body of a CREATE TABLE statement (between first ( and matching ))
fn extract_table_body(stmt: &str) -> Option<&str> {
    let bytes = stmt.as_bytes();
    let mut state = ScanState::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut i = 0;

    while i < bytes.len() {
        if state.in_code() {
            match bytes[i] {
                b'(' => {
                    if depth == 0 {
                        start = Some(i + 1);
                    }
                    depth += 1;
                }
                b')' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        return start.map(|s| &stmt[s..i]);
                    }
                }
                _ => {}
            }
        }
        i += state.step(bytes, i);
    }

    None
}

/// Parse a column definition such as
/// `` `status` enum('a','b') NOT NULL DEFAULT 'a' ``.
fn parse_column_def(def: &str) -> Option<ColumnMeta> {
    let caps = COLUMN_HEAD_RE.captures(def)?;
    let name = unquote_identifier(caps.get(1)?.as_str());
    let type_word = caps.get(2)?;

    // Type arguments, e.g. (10,2) or ('a','b'), may contain quoted parens
    let mut type_end = type_word.end();
    let after_word = &def[type_end..];
    if after_word.trim_start().starts_with('(') {
        let offset = after_word.len() - after_word.trim_start().len();
        let args = balanced_parens(&after_word[offset..])?;
        type_end += offset + args.len();
    }
    if let Some(m) = TYPE_SUFFIX_RE.captures(&def[type_end..]).and_then(|c| c.get(1)) {
        type_end += m.end();
    }

    let raw_type = def[type_word.start()..type_end].trim().to_string();
    let attributes = strip_quoted(&def[type_end..]);

    let generated = GENERATED_RE.is_match(&attributes);
    let has_default = DEFAULT_RE.is_match(&attributes) && !DEFAULT_NULL_RE.is_match(&attributes);

    Some(
        ColumnMeta::new(name, raw_type)
            .nullable(!NOT_NULL_RE.is_match(&attributes))
            .with_default(has_default)
            .auto_increment(AUTO_INCREMENT_RE.is_match(&attributes))
            .generated(generated),
    )
}

/// Return the leading `(...)` group, quote aware.
fn balanced_parens(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut state = ScanState::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        if state.in_code() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(&s[..=i]);
                    }
                }
                _ => {}
            }
        }
        i += state.step(bytes, i);
    }
    None
}

/// Blank out quoted text so COMMENT 'not null' does not read as a constraint.
fn strip_quoted(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut state = ScanState::new();
    let mut out = Vec::with_capacity(s.len());
    let mut i = 0;

    while i < bytes.len() {
        let was_code = state.in_code();
        let n = state.step(bytes, i);
        if was_code && state.in_code() {
            out.extend_from_slice(&bytes[i..i + n]);
        } else {
            out.extend(std::iter::repeat(b' ').take(n));
        }
        i += n;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    const DDL: &str = r#"
-- Table structure for table `orders`
DROP TABLE IF EXISTS `orders`;
/*!40101 SET @saved_cs_client = @@character_set_client */;
CREATE TABLE `orders` (
  `id` int(10) unsigned NOT NULL AUTO_INCREMENT,
  `status` enum('new','paid','it''s') NOT NULL DEFAULT 'new',
  `total` decimal(10,2) NOT NULL COMMENT 'not null, (really)',
  `note` varchar(255) DEFAULT NULL,
  `meta` json DEFAULT NULL,
  `total_cents` int GENERATED ALWAYS AS ((`total` * 100)) VIRTUAL,
  `created_at` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP,
  PRIMARY KEY (`id`),
  KEY `orders_status_idx` (`status`),
  CONSTRAINT `fk` FOREIGN KEY (`id`) REFERENCES `other` (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
"#;

    #[test]
    fn test_parse_ddl_columns() {
        let catalog = parse_ddl(DDL);
        assert_eq!(catalog.len(), 1);
        let orders = catalog.get_table("orders").unwrap();
        let names: Vec<&str> = orders.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "status", "total", "note", "meta", "total_cents", "created_at"]
        );

        let id = &orders.columns[0];
        assert_eq!(id.raw_type, "int(10) unsigned");
        assert!(id.auto_increment);
        assert!(!id.nullable);

        let status = &orders.columns[1];
        assert_eq!(status.enum_values, vec!["new", "paid", "it's"]);
        assert!(status.has_default);

        let total = &orders.columns[2];
        assert_eq!(total.data_type, DataType::Decimal);
        assert!(total.is_required());

        let note = &orders.columns[3];
        assert!(note.nullable);
        assert!(!note.has_default);

        assert!(orders.columns[5].generated);
        assert!(orders.columns[6].has_default);
    }

    #[test]
    fn test_extract_create_table_name() {
        assert_eq!(
            extract_create_table_name("CREATE TABLE IF NOT EXISTS `db`.`users` (id INT)"),
            Some("users".to_string())
        );
        assert_eq!(
            extract_create_table_name("create table items (id int)"),
            Some("items".to_string())
        );
    }
}
