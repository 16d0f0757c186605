//! Failures the restore reports by kind.
//!
//! Everything else travels as `anyhow::Error`; these variants exist so the
//! binary can pick an exit code and tests can match on the failure.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("dump file not found; looked in: {}", format_paths(.0))]
    DumpNotFound(Vec<PathBuf>),

    #[error("schema definition not found at {}", .0.display())]
    SchemaNotFound(PathBuf),

    #[error("no schema catalog source: pass --schema-ddl <file> or set DATABASE_URL")]
    NoCatalogSource,

    #[error("invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("schema catalog query failed: {0}")]
    CatalogQuery(String),

    #[error("'{0}' command not found on PATH")]
    ToolNotFound(String),

    #[error("failed to start '{program}': {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("migration tool exited with status {code}")]
    ToolFailed { code: i32 },
}

impl RestoreError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RestoreError::ToolFailed { code } => *code,
            _ => 1,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
