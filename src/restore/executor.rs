//! Writing the rewritten script and handing it to the migration tool.

use super::rewriter::{quote_identifier, RewrittenInsert};
use crate::error::RestoreError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Everything the output script is built from.
pub struct RestoreScript<'a> {
    pub source: &'a Path,
    pub generated_at: DateTime<Local>,
    pub statements: &'a [RewrittenInsert],
    /// Tables receiving rows, in first-seen order
    pub tables: &'a [String],
    pub truncate: bool,
}

impl RestoreScript<'_> {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.write_header(w)?;

        if self.truncate && !self.tables.is_empty() {
            for table in self.tables {
                writeln!(w, "TRUNCATE TABLE {};", quote_identifier(table))?;
            }
            writeln!(w)?;
        }

        for statement in self.statements {
            writeln!(w, "{}", statement.to_sql())?;
            writeln!(w)?;
        }

        writeln!(w, "SET FOREIGN_KEY_CHECKS = 1;")?;
        Ok(())
    }

    fn write_header<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "-- Restored data script")?;
        writeln!(w, "-- Generated by sql-restore")?;
        writeln!(w, "-- Source: {}", self.source.display())?;
        writeln!(
            w,
            "-- Generated at: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S %:z")
        )?;
        writeln!(w, "-- Tables: {}", self.tables.len())?;
        writeln!(w)?;
        writeln!(w, "SET FOREIGN_KEY_CHECKS = 0;")?;
        writeln!(w)?;
        Ok(())
    }

    /// Write the script to `path`, returning the number of bytes written.
    pub fn write_file(&self, path: &Path) -> io::Result<u64> {
        let file = File::create(path)?;
        let mut w = BufWriter::with_capacity(256 * 1024, file);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(std::fs::metadata(path)?.len())
    }
}

/// Where the script is written.
pub enum ScriptTarget {
    /// A path that outlives the run
    Kept(PathBuf),
    /// A file inside a directory removed when the target is dropped
    Temporary { dir: TempDir, path: PathBuf },
}

impl ScriptTarget {
    /// Explicit output wins. Otherwise dry runs get a timestamped file in the
    /// system temp directory and executions a throwaway directory.
    pub fn prepare(output: Option<&Path>, dry_run: bool) -> io::Result<Self> {
        if let Some(path) = output {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            return Ok(ScriptTarget::Kept(path.to_path_buf()));
        }

        if dry_run {
            let name = format!(
                "sql-restore-{}-{}.sql",
                Local::now().format("%Y%m%d-%H%M%S"),
                std::process::id()
            );
            return Ok(ScriptTarget::Kept(std::env::temp_dir().join(name)));
        }

        let dir = tempfile::Builder::new().prefix("sql-restore-").tempdir()?;
        let path = dir.path().join("restore.sql");
        Ok(ScriptTarget::Temporary { dir, path })
    }

    pub fn path(&self) -> &Path {
        match self {
            ScriptTarget::Kept(path) => path,
            ScriptTarget::Temporary { path, .. } => path,
        }
    }

    pub fn is_kept(&self) -> bool {
        matches!(self, ScriptTarget::Kept(_))
    }

    /// Remove the temporary directory now, logging instead of failing.
    pub fn cleanup(self) {
        if let ScriptTarget::Temporary { dir, .. } = self {
            let location = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(path = %location.display(), error = %e, "failed to remove temp directory");
            }
        }
    }
}

/// External command that executes a raw SQL file against the database.
///
/// `{file}` and `{schema}` in the arguments are replaced with the script path
/// and the schema definition path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationTool {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for MigrationTool {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: ["prisma", "db", "execute", "--file", "{file}", "--schema", "{schema}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl MigrationTool {
    pub fn command_args(&self, file: &Path, schema: &Path) -> Vec<String> {
        let file = file.display().to_string();
        let schema = schema.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{file}", &file).replace("{schema}", &schema))
            .collect()
    }

    /// Human-readable command line, for logs and dry-run reports.
    pub fn describe(&self, file: &Path, schema: &Path) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.command_args(file, schema));
        parts.join(" ")
    }

    /// Run the tool with inherited stdio and wait for it.
    pub fn run(&self, file: &Path, schema: &Path) -> Result<(), RestoreError> {
        tracing::info!(command = %self.describe(file, schema), "executing restore script");

        let status = Command::new(&self.program)
            .args(self.command_args(file, schema))
            .status()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => RestoreError::ToolNotFound(self.program.clone()),
                _ => RestoreError::ToolSpawn {
                    program: self.program.clone(),
                    source: e,
                },
            })?;

        if status.success() {
            Ok(())
        } else {
            // Killed by a signal: no code to forward
            Err(RestoreError::ToolFailed {
                code: status.code().unwrap_or(1),
            })
        }
    }
}
