//! Live schema catalog.
//!
//! This module provides:
//! - Column metadata with a semantic type category and parsed enum literals
//! - A case-insensitive table catalog ordered by physical column position
//! - Loaders for a live MySQL database and for a schema DDL file

mod ddl;
mod information_schema;

pub use ddl::*;
pub use information_schema::*;

use ahash::AHashMap;
use std::fmt;

/// Semantic type category of a column, as far as value compatibility goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// INT, BIGINT, SMALLINT, MEDIUMINT, YEAR, non-boolean TINYINT
    Integer,
    /// DECIMAL, NUMERIC, FLOAT, DOUBLE, REAL
    Decimal,
    /// BOOL, BOOLEAN, TINYINT(1), BIT(1)
    Boolean,
    Date,
    /// DATETIME, TIMESTAMP
    DateTime,
    Time,
    Json,
    Enum,
    /// Everything else: CHAR, VARCHAR, TEXT, BLOB, SET, ...
    String,
}

impl DataType {
    /// Classify a MySQL column type declaration such as `int(10) unsigned`.
    pub fn from_mysql_type(type_str: &str) -> Self {
        let lower = type_str.trim().to_ascii_lowercase();
        let base = lower
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or("");

        match base {
            "tinyint" if lower.starts_with("tinyint(1)") => DataType::Boolean,
            "bit" if lower.starts_with("bit(1)") || lower == "bit" => DataType::Boolean,
            "bool" | "boolean" => DataType::Boolean,
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" | "year"
            | "serial" | "bit" => DataType::Integer,
            "decimal" | "numeric" | "dec" | "fixed" | "float" | "double" | "real" => {
                DataType::Decimal
            }
            "date" => DataType::Date,
            "datetime" | "timestamp" => DataType::DateTime,
            "time" => DataType::Time,
            "json" => DataType::Json,
            "enum" => DataType::Enum,
            _ => DataType::String,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Decimal | DataType::Boolean)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::Time => "time",
            DataType::Json => "json",
            DataType::Enum => "enum",
            DataType::String => "string",
        };
        f.write_str(s)
    }
}

/// Metadata for one live column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: DataType,
    /// Type declaration as reported by the catalog source
    pub raw_type: String,
    /// Allowed literals for enum columns, in declaration order
    pub enum_values: Vec<String>,
    pub nullable: bool,
    pub has_default: bool,
    pub auto_increment: bool,
    /// Computed column; only `DEFAULT` may be inserted into it
    pub generated: bool,
}

impl ColumnMeta {
    /// Build column metadata, classifying the type and parsing enum literals once.
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        let raw_type = raw_type.into();
        let data_type = DataType::from_mysql_type(&raw_type);
        let enum_values = if data_type == DataType::Enum {
            parse_enum_values(&raw_type)
        } else {
            Vec::new()
        };

        Self {
            name: name.into(),
            data_type,
            raw_type,
            enum_values,
            nullable: true,
            has_default: false,
            auto_increment: false,
            generated: false,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_default(mut self, has_default: bool) -> Self {
        self.has_default = has_default;
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn generated(mut self, generated: bool) -> Self {
        self.generated = generated;
        self
    }

    /// BIT columns, which dumps fill with `b'..'` or hex literals.
    pub fn is_bit(&self) -> bool {
        let lower = self.raw_type.trim_start().to_ascii_lowercase();
        lower == "bit" || lower.starts_with("bit(") || lower.starts_with("bit ")
    }

    /// A column the database cannot fill on its own.
    pub fn is_required(&self) -> bool {
        !self.nullable && !self.has_default && !self.auto_increment && !self.generated
    }
}

/// Parse the literal list of an `enum('a','b',...)` declaration.
///
/// Handles both `''` and `\'` escapes inside literals.
pub fn parse_enum_values(raw_type: &str) -> Vec<String> {
    let Some(open) = raw_type.find('(') else {
        return Vec::new();
    };
    let body = &raw_type[open + 1..];

    let mut values = Vec::new();
    let mut chars = body.chars().peekable();
    let mut current = String::new();
    let mut in_literal = false;

    while let Some(c) = chars.next() {
        if !in_literal {
            match c {
                '\'' => in_literal = true,
                ')' => break,
                _ => {}
            }
            continue;
        }

        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                current.push('\'');
            }
            '\'' => {
                values.push(std::mem::take(&mut current));
                in_literal = false;
            }
            _ => current.push(c),
        }
    }

    values
}

/// Ordered live columns of one table.
#[derive(Debug, Clone)]
pub struct TableCatalog {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
}

impl TableCatalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_columns(name: impl Into<String>, columns: Vec<ColumnMeta>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Get a column's position by name (case-insensitive)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnMeta> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// The live schema: every table's ordered column metadata.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Lowercased table name -> index into `tables`
    index: AHashMap<String, usize>,
    tables: Vec<TableCatalog>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, replacing any previous table of the same name.
    pub fn add_table(&mut self, table: TableCatalog) {
        let key = table.name.to_lowercase();
        match self.index.get(&key) {
            Some(&idx) => self.tables[idx] = table,
            None => {
                self.index.insert(key, self.tables.len());
                self.tables.push(table);
            }
        }
    }

    /// Get a table by name (case-insensitive)
    pub fn get_table(&self, name: &str) -> Option<&TableCatalog> {
        self.index
            .get(&name.to_lowercase())
            .map(|&idx| &self.tables[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_table(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableCatalog> {
        self.tables.iter()
    }

    /// Group flat `(table, column)` rows, already ordered by position, into a catalog.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, ColumnMeta)>,
    {
        let mut catalog = Catalog::new();
        for (table, column) in rows {
            let key = table.to_lowercase();
            let idx = match catalog.index.get(&key) {
                Some(&idx) => idx,
                None => {
                    catalog.index.insert(key, catalog.tables.len());
                    catalog.tables.push(TableCatalog::new(table));
                    catalog.tables.len() - 1
                }
            };
            catalog.tables[idx].columns.push(column);
        }
        catalog
    }
}
