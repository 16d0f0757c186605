use crate::config::{self, RestoreArgs};
use crate::input::Compression;
use crate::restore::{self, CatalogSource, RestoreStats};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

pub fn run(args: RestoreArgs, progress: bool) -> anyhow::Result<()> {
    let mut config = config::resolve(args)?;

    let file_size = std::fs::metadata(&config.dump)?.len();
    eprintln!(
        "Restoring {} ({:.2} MB)",
        config.dump.display(),
        file_size as f64 / (1024.0 * 1024.0)
    );
    let compression = Compression::from_path(&config.dump);
    if compression != Compression::None {
        eprintln!("Detected compression: {}", compression);
    }
    match &config.catalog {
        CatalogSource::Ddl(path) => eprintln!("Schema catalog: {}", path.display()),
        CatalogSource::Database(url) => {
            eprintln!("Schema catalog: {}/{}", url.host, url.database)
        }
    }
    if config.dry_run {
        eprintln!("Mode: dry run (script is written, not executed)");
    }
    if config.truncate {
        eprintln!("Restored tables will be truncated before insert");
    }
    eprintln!();

    let pb = if progress {
        let pb = ProgressBar::new(file_size);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg}",
            )?
            .progress_chars("█▓▒░  ")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        let pb_clone = pb.clone();
        config.progress_fn = Some(Box::new(move |bytes: u64| pb_clone.set_position(bytes)));
        Some(pb)
    } else {
        None
    };

    let start_time = Instant::now();
    let result = restore::run(config);
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    let stats = result?;

    print_stats(&stats, start_time.elapsed());
    Ok(())
}

fn print_stats(stats: &RestoreStats, elapsed: std::time::Duration) {
    if stats.executed {
        eprintln!("\n✓ Restore completed successfully!");
    } else {
        eprintln!("\n✓ Dry run completed!");
    }

    let plan = &stats.plan;
    eprintln!("\nStatistics:");
    eprintln!("  Statements read: {}", plan.statements_total);
    eprintln!("  INSERT statements rewritten: {}", plan.rewrite.statements_rewritten);
    eprintln!("  Rows written: {}", plan.rewrite.rows_written);
    eprintln!("  Placeholder values: {}", plan.rewrite.placeholders);
    eprintln!("  Schema/session statements dropped: {}", plan.statements_dropped);
    if plan.statements_ignored > 0 {
        eprintln!("  Other statements ignored: {}", plan.statements_ignored);
    }
    if plan.inserts_unparsed > 0 {
        eprintln!("  Unparseable INSERTs skipped: {}", plan.inserts_unparsed);
    }
    eprintln!("  Tables restored: {}", stats.tables.len());
    eprintln!("  Elapsed time: {:.3?}", elapsed);

    if !stats.unknown_tables.is_empty() {
        eprintln!("\nSkipped tables missing from the live schema:");
        for table in &stats.unknown_tables {
            eprintln!("  - {}", table);
        }
    }

    if let Some(path) = &stats.script {
        eprintln!(
            "\nScript: {} ({:.2} MB)",
            path.display(),
            stats.bytes_written as f64 / (1024.0 * 1024.0)
        );
    }
}
