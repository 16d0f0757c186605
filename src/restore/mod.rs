//! Restore orchestration: dump → rewritten script → migration tool.
//!
//! - [`policy`]: which values a column accepts and what to write when none fits
//! - [`align`]: column/value alignment for positional INSERTs
//! - [`rewriter`]: per-INSERT reshaping onto the live schema
//! - [`executor`]: script output and the external tool

pub mod align;
pub mod executor;
pub mod policy;
pub mod rewriter;

use crate::error::RestoreError;
use crate::input::read_dump;
use crate::parser::{parse_insert, split_statements, StatementKind};
use crate::schema::{load_database_catalog, load_ddl_catalog, Catalog, DatabaseUrl};
use ahash::AHashSet;
use align::AlignOptions;
use anyhow::Context;
use chrono::Local;
use executor::{MigrationTool, RestoreScript, ScriptTarget};
use rewriter::{RewriteOutcome, RewriteStats, RewrittenInsert, Rewriter};
use std::path::PathBuf;

/// Where the live schema is read from.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    /// `CREATE TABLE` statements in a schema file
    Ddl(PathBuf),
    /// `information_schema` of a running database
    Database(DatabaseUrl),
}

impl CatalogSource {
    pub fn load(&self) -> anyhow::Result<Catalog> {
        let catalog = match self {
            CatalogSource::Ddl(path) => load_ddl_catalog(path)?,
            CatalogSource::Database(url) => load_database_catalog(url)?,
        };
        tracing::info!(tables = catalog.len(), "live schema catalog loaded");
        Ok(catalog)
    }
}

/// Restore configuration
pub struct RestoreConfig {
    pub dump: PathBuf,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    pub truncate: bool,
    pub catalog: CatalogSource,
    /// Schema definition handed to the migration tool
    pub schema: PathBuf,
    pub tool: MigrationTool,
    pub align: AlignOptions,
    pub skip_tables: Vec<String>,
    pub progress_fn: Option<Box<dyn Fn(u64)>>,
}

impl RestoreConfig {
    pub fn new(dump: PathBuf, catalog: CatalogSource) -> Self {
        Self {
            dump,
            output: None,
            dry_run: false,
            truncate: false,
            catalog,
            schema: PathBuf::from("prisma/schema.prisma"),
            tool: MigrationTool::default(),
            align: AlignOptions::default(),
            skip_tables: Vec::new(),
            progress_fn: None,
        }
    }
}

/// Statement counts from planning a restore.
#[derive(Debug, Default, Clone)]
pub struct PlanStats {
    pub statements_total: u64,
    pub inserts_found: u64,
    /// Schema, session and locking statements discarded on sight
    pub statements_dropped: u64,
    /// Comments and anything else that is not replayed
    pub statements_ignored: u64,
    pub inserts_unparsed: u64,
    pub rewrite: RewriteStats,
}

/// The rewritten INSERTs for a dump, ready to be written out.
#[derive(Debug, Default)]
pub struct RestorePlan {
    pub statements: Vec<RewrittenInsert>,
    /// Tables receiving rows, in first-seen order
    pub tables: Vec<String>,
    /// Dump tables with no live counterpart
    pub unknown_tables: Vec<String>,
    pub stats: PlanStats,
}

/// Split, classify and rewrite every statement of a dump.
pub fn plan_restore(
    script: &str,
    catalog: &Catalog,
    options: AlignOptions,
    skip_tables: &[String],
) -> RestorePlan {
    let mut rewriter = Rewriter::new(catalog)
        .with_options(options)
        .with_skip_tables(skip_tables);
    let mut plan = RestorePlan::default();
    let mut seen_tables: AHashSet<String> = AHashSet::new();
    let mut seen_unknown: AHashSet<String> = AHashSet::new();

    for stmt in split_statements(script) {
        plan.stats.statements_total += 1;

        match StatementKind::classify(&stmt) {
            StatementKind::Insert => {}
            kind if kind.is_dropped() => {
                plan.stats.statements_dropped += 1;
                continue;
            }
            _ => {
                plan.stats.statements_ignored += 1;
                continue;
            }
        }

        plan.stats.inserts_found += 1;
        let Some(insert) = parse_insert(&stmt) else {
            let preview: String = stmt.chars().take(60).collect();
            tracing::warn!(statement = %preview, "could not parse INSERT; skipping");
            plan.stats.inserts_unparsed += 1;
            continue;
        };

        match rewriter.rewrite(&insert) {
            RewriteOutcome::Rewritten(rewritten) => {
                if seen_tables.insert(rewritten.table.to_lowercase()) {
                    plan.tables.push(rewritten.table.clone());
                }
                plan.statements.push(rewritten);
            }
            RewriteOutcome::UnknownTable(table) => {
                if seen_unknown.insert(table.to_lowercase()) {
                    plan.unknown_tables.push(table);
                }
            }
            RewriteOutcome::Skipped => {}
        }
    }

    plan.stats.rewrite = rewriter.stats().clone();
    plan
}

/// Outcome of a restore run.
#[derive(Debug)]
pub struct RestoreStats {
    pub plan: PlanStats,
    pub tables: Vec<String>,
    pub unknown_tables: Vec<String>,
    /// On-disk size of the dump, compressed size for `.gz` and `.zst`
    pub dump_file_size: u64,
    pub bytes_written: u64,
    /// Script location, when it outlives the run
    pub script: Option<PathBuf>,
    pub executed: bool,
}

/// Run a restore end to end.
///
/// Dry runs stop after writing the script. Otherwise the script is passed to
/// the migration tool; a non-zero exit surfaces as [`RestoreError::ToolFailed`].
pub fn run(mut config: RestoreConfig) -> anyhow::Result<RestoreStats> {
    if !config.dump.is_file() {
        return Err(RestoreError::DumpNotFound(vec![config.dump.clone()]).into());
    }
    if !config.dry_run && !config.schema.exists() {
        return Err(RestoreError::SchemaNotFound(config.schema.clone()).into());
    }

    let catalog = config.catalog.load()?;

    tracing::info!(dump = %config.dump.display(), "reading dump");
    let dump_file_size = std::fs::metadata(&config.dump)?.len();
    let script = read_dump(&config.dump, config.progress_fn.take())
        .with_context(|| format!("failed to read dump {}", config.dump.display()))?;

    let plan = plan_restore(&script, &catalog, config.align, &config.skip_tables);
    drop(script);
    tracing::info!(
        statements = plan.statements.len(),
        tables = plan.tables.len(),
        "dump rewritten"
    );

    let target = ScriptTarget::prepare(config.output.as_deref(), config.dry_run)
        .context("failed to prepare output location")?;
    let bytes_written = RestoreScript {
        source: &config.dump,
        generated_at: Local::now(),
        statements: &plan.statements,
        tables: &plan.tables,
        truncate: config.truncate,
    }
    .write_file(target.path())
    .with_context(|| format!("failed to write {}", target.path().display()))?;
    tracing::info!(path = %target.path().display(), bytes = bytes_written, "restore script written");

    let mut stats = RestoreStats {
        plan: plan.stats,
        tables: plan.tables,
        unknown_tables: plan.unknown_tables,
        dump_file_size,
        bytes_written,
        script: target.is_kept().then(|| target.path().to_path_buf()),
        executed: false,
    };

    if config.dry_run {
        return Ok(stats);
    }

    let result = config.tool.run(target.path(), &config.schema);
    target.cleanup();
    result?;

    stats.executed = true;
    Ok(stats)
}
