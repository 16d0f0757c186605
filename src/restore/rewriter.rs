//! Rewrites dump INSERTs so they fit the live schema.

use super::align::{align, apply_alignment, AlignOptions, Alignment};
use super::policy::{accepts_by_name, placeholder_for_column};
use crate::parser::{ParsedInsert, RawToken};
use crate::schema::{Catalog, TableCatalog};
use ahash::AHashSet;

/// How a rewritten INSERT assigned its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueMapping {
    /// Explicit-column INSERT: per live column, the dump column index it took
    ByName(Vec<Option<usize>>),
    /// Positional INSERT: per live column, the value index chosen by the aligner
    Aligned(Alignment),
}

impl ValueMapping {
    pub fn sources(&self) -> &[Option<usize>] {
        match self {
            ValueMapping::ByName(sources) => sources,
            ValueMapping::Aligned(alignment) => &alignment.mapping,
        }
    }
}

/// An INSERT shaped to the live table.
#[derive(Debug, Clone)]
pub struct RewrittenInsert {
    /// Live table name
    pub table: String,
    /// Column list to emit; `None` for a positional INSERT
    pub columns: Option<Vec<String>>,
    pub rows: Vec<Vec<RawToken>>,
    pub ignore: bool,
    pub mapping: ValueMapping,
    /// Values in the output that were synthesized rather than copied
    pub placeholders: u64,
}

impl RewrittenInsert {
    /// Render as a single multi-row INSERT statement.
    pub fn to_sql(&self) -> String {
        let mut sql = String::with_capacity(64 + self.rows.len() * 32);
        sql.push_str(if self.ignore {
            "INSERT IGNORE INTO "
        } else {
            "INSERT INTO "
        });
        sql.push_str(&quote_identifier(&self.table));

        if let Some(columns) = &self.columns {
            sql.push_str(" (");
            let quoted: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
            sql.push_str(&quoted.join(", "));
            sql.push(')');
        }

        sql.push_str(" VALUES");
        for (idx, row) in self.rows.iter().enumerate() {
            if idx > 0 {
                sql.push(',');
            }
            sql.push_str("\n(");
            let values: Vec<&str> = row.iter().map(RawToken::as_sql).collect();
            sql.push_str(&values.join(","));
            sql.push(')');
        }
        sql.push(';');
        sql
    }
}

/// Quote a MySQL identifier with backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Result of offering one INSERT to the rewriter.
#[derive(Debug)]
pub enum RewriteOutcome {
    Rewritten(RewrittenInsert),
    /// Table absent from the live catalog
    UnknownTable(String),
    /// Table excluded by configuration, or an INSERT without tuples
    Skipped,
}

/// Counters collected while rewriting a dump.
#[derive(Debug, Default, Clone)]
pub struct RewriteStats {
    pub statements_rewritten: u64,
    pub rows_written: u64,
    pub placeholders: u64,
    pub statements_unknown_table: u64,
    pub statements_skipped: u64,
}

/// Shapes dump INSERTs to the live catalog.
pub struct Rewriter<'a> {
    catalog: &'a Catalog,
    options: AlignOptions,
    skip_tables: AHashSet<String>,
    warned_tables: AHashSet<String>,
    warned_columns: AHashSet<(String, String)>,
    stats: RewriteStats,
}

impl<'a> Rewriter<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            options: AlignOptions::default(),
            skip_tables: AHashSet::new(),
            warned_tables: AHashSet::new(),
            warned_columns: AHashSet::new(),
            stats: RewriteStats::default(),
        }
    }

    pub fn with_options(mut self, options: AlignOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_skip_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.skip_tables = tables
            .into_iter()
            .map(|t| t.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn stats(&self) -> &RewriteStats {
        &self.stats
    }

    /// Tables that appeared in the dump but not in the catalog.
    pub fn unknown_tables(&self) -> impl Iterator<Item = &String> {
        self.warned_tables.iter()
    }

    pub fn rewrite(&mut self, insert: &ParsedInsert) -> RewriteOutcome {
        if self.skip_tables.contains(&insert.table.to_lowercase()) {
            tracing::debug!(table = %insert.table, "table excluded by configuration");
            self.stats.statements_skipped += 1;
            return RewriteOutcome::Skipped;
        }

        let catalog = self.catalog;
        let Some(table) = catalog.get_table(&insert.table) else {
            if self.warned_tables.insert(insert.table.clone()) {
                tracing::warn!(
                    table = %insert.table,
                    "table not found in live schema; skipping its rows"
                );
            }
            self.stats.statements_unknown_table += 1;
            return RewriteOutcome::UnknownTable(insert.table.clone());
        };

        if insert.tuples.is_empty() {
            self.stats.statements_skipped += 1;
            return RewriteOutcome::Skipped;
        }

        let rewritten = match &insert.columns {
            Some(columns) => self.rewrite_explicit(table, columns, insert),
            None => self.rewrite_positional(table, insert),
        };

        self.stats.statements_rewritten += 1;
        self.stats.rows_written += rewritten.rows.len() as u64;
        self.stats.placeholders += rewritten.placeholders;

        RewriteOutcome::Rewritten(rewritten)
    }

    fn rewrite_explicit(
        &mut self,
        table: &TableCatalog,
        columns: &[String],
        insert: &ParsedInsert,
    ) -> RewrittenInsert {
        // Live column index -> position in the dump's column list
        let mut sources: Vec<Option<usize>> = vec![None; table.len()];
        for (k, name) in columns.iter().enumerate() {
            match table.column_index(name) {
                Some(live) if sources[live].is_none() => sources[live] = Some(k),
                Some(_) => {}
                None => self.warn_dropped_column(&table.name, name),
            }
        }

        let mut placeholders = 0u64;
        let rows = insert
            .tuples
            .iter()
            .map(|tuple| {
                // Values beyond the named columns are discarded
                let values = &tuple[..tuple.len().min(columns.len())];
                table
                    .columns
                    .iter()
                    .zip(&sources)
                    .map(|(column, source)| {
                        let value = source
                            .and_then(|k| values.get(k))
                            .filter(|token| accepts_by_name(column, token));
                        match value {
                            Some(token) => token.clone(),
                            None => {
                                placeholders += 1;
                                placeholder_for_column(column)
                            }
                        }
                    })
                    .collect()
            })
            .collect();

        RewrittenInsert {
            table: table.name.clone(),
            columns: Some(table.columns.iter().map(|c| c.name.clone()).collect()),
            rows,
            ignore: insert.ignore,
            mapping: ValueMapping::ByName(sources),
            placeholders,
        }
    }

    fn rewrite_positional(&mut self, table: &TableCatalog, insert: &ParsedInsert) -> RewrittenInsert {
        let representative = insert.first_tuple().unwrap_or(&[]);
        let alignment = align(&table.columns, representative, self.options);

        tracing::debug!(
            table = %table.name,
            live_columns = table.len(),
            dump_values = representative.len(),
            mapped = alignment.mapped_count(),
            score = alignment.score,
            "aligned positional insert"
        );

        let mut placeholders = 0u64;
        let rows = insert
            .tuples
            .iter()
            .map(|tuple| {
                let row = apply_alignment(&table.columns, &alignment, tuple);
                placeholders += row
                    .iter()
                    .zip(&alignment.mapping)
                    .filter(|(token, source)| match source {
                        Some(j) => tuple.get(*j) != Some(*token),
                        None => true,
                    })
                    .count() as u64;
                row
            })
            .collect();

        RewrittenInsert {
            table: table.name.clone(),
            columns: None,
            rows,
            ignore: insert.ignore,
            mapping: ValueMapping::Aligned(alignment),
            placeholders,
        }
    }

    fn warn_dropped_column(&mut self, table: &str, column: &str) {
        if self
            .warned_columns
            .insert((table.to_lowercase(), column.to_lowercase()))
        {
            tracing::warn!(table, column, "column not found in live schema; dropping its values");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_insert;
    use crate::schema::ColumnMeta;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_table(TableCatalog::with_columns(
            "t",
            vec![
                ColumnMeta::new("id", "int").nullable(false),
                ColumnMeta::new("name", "varchar(20)").nullable(false),
                ColumnMeta::new("flag", "tinyint(1)").nullable(false),
            ],
        ));
        catalog
    }

    #[test]
    fn test_positional_drift_fills_new_required_column() {
        let catalog = catalog();
        let mut rewriter = Rewriter::new(&catalog);
        let insert = parse_insert("INSERT INTO t VALUES (1,'x')").unwrap();

        let RewriteOutcome::Rewritten(out) = rewriter.rewrite(&insert) else {
            panic!("expected a rewritten insert");
        };
        assert_eq!(out.rows, vec![vec![
            RawToken::Bare("1".into()),
            RawToken::Quoted("'x'".into()),
            RawToken::Bare("0".into()),
        ]]);
        assert_eq!(out.placeholders, 1);
        assert_eq!(out.to_sql(), "INSERT INTO `t` VALUES\n(1,'x',0);");
    }

    #[test]
    fn test_explicit_columns_matched_by_name() {
        let catalog = catalog();
        let mut rewriter = Rewriter::new(&catalog);
        let insert =
            parse_insert("INSERT INTO `t` (`name`, `legacy`, `id`) VALUES ('a', 9, 5, 'excess'), ('b', 8)")
                .unwrap();

        let RewriteOutcome::Rewritten(out) = rewriter.rewrite(&insert) else {
            panic!("expected a rewritten insert");
        };
        assert_eq!(
            out.columns,
            Some(vec!["id".to_string(), "name".to_string(), "flag".to_string()])
        );
        assert_eq!(out.rows[0], vec![
            RawToken::Bare("5".into()),
            RawToken::Quoted("'a'".into()),
            RawToken::Bare("0".into()),
        ]);
        // Second tuple is short: `id` falls back to a placeholder
        assert_eq!(out.rows[1][0], RawToken::Bare("0".into()));
        assert_eq!(out.rows[1][1], RawToken::Quoted("'b'".into()));
        assert_eq!(
            out.to_sql(),
            "INSERT INTO `t` (`id`, `name`, `flag`) VALUES\n(5,'a',0),\n(0,'b',0);"
        );
    }

    #[test]
    fn test_explicit_values_kept_verbatim() {
        let mut catalog = Catalog::new();
        catalog.add_table(TableCatalog::with_columns(
            "p",
            vec![
                ColumnMeta::new("id", "int").nullable(false),
                ColumnMeta::new("price", "decimal(8,2)").nullable(false),
                ColumnMeta::new("flag", "bit(1)").nullable(false),
                ColumnMeta::new("price_x2", "decimal(9,2)").generated(true),
            ],
        ));
        let mut rewriter = Rewriter::new(&catalog);
        let insert =
            parse_insert("INSERT INTO p (id, price, flag, price_x2) VALUES ('7', '9.99', b'1', 19.98)")
                .unwrap();

        let RewriteOutcome::Rewritten(out) = rewriter.rewrite(&insert) else {
            panic!("expected a rewritten insert");
        };
        assert_eq!(out.rows[0], vec![
            RawToken::Quoted("'7'".into()),
            RawToken::Quoted("'9.99'".into()),
            RawToken::Bare("b'1'".into()),
            RawToken::Default,
        ]);
        assert_eq!(out.placeholders, 1);
    }

    #[test]
    fn test_explicit_null_into_required_column() {
        let catalog = catalog();
        let mut rewriter = Rewriter::new(&catalog);
        let insert = parse_insert("INSERT INTO t (id, name, flag) VALUES (1, NULL, TRUE)").unwrap();

        let RewriteOutcome::Rewritten(out) = rewriter.rewrite(&insert) else {
            panic!("expected a rewritten insert");
        };
        assert_eq!(out.to_sql(), "INSERT INTO `t` (`id`, `name`, `flag`) VALUES\n(1,'',TRUE);");
    }

    #[test]
    fn test_unknown_table_is_skipped() {
        let catalog = catalog();
        let mut rewriter = Rewriter::new(&catalog);
        let insert = parse_insert("INSERT INTO gone VALUES (1)").unwrap();
        assert!(matches!(rewriter.rewrite(&insert), RewriteOutcome::UnknownTable(t) if t == "gone"));
        assert!(matches!(rewriter.rewrite(&insert), RewriteOutcome::UnknownTable(_)));
        assert_eq!(rewriter.stats().statements_unknown_table, 2);
        assert_eq!(rewriter.unknown_tables().count(), 1);
    }

    #[test]
    fn test_skip_tables() {
        let catalog = catalog();
        let mut rewriter = Rewriter::new(&catalog).with_skip_tables(["T"]);
        let insert = parse_insert("INSERT INTO t VALUES (1,'x',1)").unwrap();
        assert!(matches!(rewriter.rewrite(&insert), RewriteOutcome::Skipped));
    }

    #[test]
    fn test_ignore_modifier_preserved() {
        let catalog = catalog();
        let mut rewriter = Rewriter::new(&catalog);
        let insert = parse_insert("INSERT IGNORE INTO t VALUES (1,'x',1)").unwrap();
        let RewriteOutcome::Rewritten(out) = rewriter.rewrite(&insert) else {
            panic!("expected a rewritten insert");
        };
        assert!(out.to_sql().starts_with("INSERT IGNORE INTO `t` VALUES"));
    }
}
