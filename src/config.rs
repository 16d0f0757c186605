//! YAML configuration and resolution of restore settings.
//!
//! Precedence for every setting: command-line flag, then environment variable
//! (read by clap for the flags that have one), then the YAML file, then the
//! built-in default.

use crate::error::RestoreError;
use crate::restore::align::AlignOptions;
use crate::restore::executor::MigrationTool;
use crate::restore::{CatalogSource, RestoreConfig};
use crate::schema::DatabaseUrl;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "restore.yaml";
/// Dump locations tried when none is configured
pub const DEFAULT_DUMP_FILES: [&str; 3] = ["backup.sql", "backup.sql.gz", "backup.sql.zst"];
pub const DEFAULT_SCHEMA_FILE: &str = "prisma/schema.prisma";

/// Complete YAML configuration for the restore command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RestoreYamlConfig {
    /// Dump file to restore
    pub dump: Option<PathBuf>,
    /// Where to write the rewritten script
    pub output: Option<PathBuf>,
    /// Live database to read the schema catalog from
    pub database_url: Option<String>,
    /// Schema DDL file to read the catalog from instead of a database
    pub schema_ddl: Option<PathBuf>,
    /// Schema definition passed to the migration tool
    pub schema: Option<PathBuf>,
    pub truncate: Option<bool>,
    pub preserve_identity: Option<bool>,
    /// Tables whose rows are never restored
    pub skip_tables: Vec<String>,
    /// Command that executes the script
    pub migrate: Option<MigrationTool>,
}

impl RestoreYamlConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RestoreYamlConfig = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Load an explicitly named file, or `restore.yaml` if it exists.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    tracing::debug!(path = DEFAULT_CONFIG_FILE, "using default config file");
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Restore settings as given on the command line. `None` and `false` mean
/// "not given"; environment fallbacks are already folded in by clap.
#[derive(Debug, Clone, Default)]
pub struct RestoreArgs {
    pub dump: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    pub truncate: bool,
    pub database_url: Option<String>,
    pub schema_ddl: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub preserve_identity: bool,
}

/// Pick the dump file.
///
/// A configured path is used as-is and must exist. Without one, the default
/// names are tried in the working directory.
pub fn resolve_dump(
    flag: Option<&Path>,
    yaml: Option<&Path>,
    base: &Path,
) -> Result<PathBuf, RestoreError> {
    if let Some(path) = flag.or(yaml) {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(RestoreError::DumpNotFound(vec![path.to_path_buf()]))
        };
    }

    let candidates: Vec<PathBuf> = DEFAULT_DUMP_FILES.iter().map(|f| base.join(f)).collect();
    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        return Ok(found.clone());
    }
    Err(RestoreError::DumpNotFound(candidates))
}

/// Pick the catalog source. A DDL file wins over a database URL.
pub fn resolve_catalog_source(
    schema_ddl: Option<PathBuf>,
    database_url: Option<&str>,
) -> Result<CatalogSource, RestoreError> {
    if let Some(path) = schema_ddl {
        return Ok(CatalogSource::Ddl(path));
    }
    match database_url {
        Some(url) if !url.trim().is_empty() => Ok(CatalogSource::Database(DatabaseUrl::parse(url)?)),
        _ => Err(RestoreError::NoCatalogSource),
    }
}

/// Merge flags, environment, YAML and defaults into a [`RestoreConfig`].
pub fn resolve(args: RestoreArgs) -> anyhow::Result<RestoreConfig> {
    let yaml = RestoreYamlConfig::discover(args.config.as_deref())?;

    let dump = resolve_dump(args.dump.as_deref(), yaml.dump.as_deref(), Path::new("."))?;
    let catalog = resolve_catalog_source(
        args.schema_ddl.or(yaml.schema_ddl),
        args.database_url.as_deref().or(yaml.database_url.as_deref()),
    )?;

    let mut config = RestoreConfig::new(dump, catalog);
    config.output = args.output.or(yaml.output);
    config.dry_run = args.dry_run;
    config.truncate = args.truncate || yaml.truncate.unwrap_or(false);
    config.schema = args
        .schema
        .or(yaml.schema)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_FILE));
    config.tool = yaml.migrate.unwrap_or_default();
    config.align = AlignOptions {
        preserve_identity: args.preserve_identity || yaml.preserve_identity.unwrap_or(false),
    };
    config.skip_tables = yaml.skip_tables;

    Ok(config)
}
