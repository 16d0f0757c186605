use crate::config::{self, RestoreArgs};
use crate::input::read_dump;
use crate::parser::{parse_insert, split_statements, ParsedInsert, StatementKind};
use crate::restore::rewriter::{RewriteOutcome, RewrittenInsert, Rewriter, ValueMapping};
use crate::schema::Catalog;
use serde::Serialize;

/// JSON output for the inspect command
#[derive(Serialize)]
pub(crate) struct InspectJsonOutput {
    dump: String,
    live_tables: usize,
    statements: Vec<InsertReport>,
}

#[derive(Serialize)]
pub(crate) struct InsertReport {
    table: String,
    mode: &'static str,
    tuples: usize,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    columns: Vec<ColumnReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dropped: Vec<String>,
}

#[derive(Serialize)]
pub(crate) struct ColumnReport {
    column: String,
    /// Dump column name or value position the column takes, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    /// Value written for the first tuple
    value: String,
}

pub fn run(args: RestoreArgs, json: bool) -> anyhow::Result<()> {
    let config = config::resolve(args)?;
    let catalog = config.catalog.load()?;
    let script = read_dump(&config.dump, None)?;

    let mut rewriter = Rewriter::new(&catalog)
        .with_options(config.align)
        .with_skip_tables(&config.skip_tables);

    let reports: Vec<InsertReport> = split_statements(&script)
        .iter()
        .filter(|stmt| StatementKind::classify(stmt) == StatementKind::Insert)
        .filter_map(|stmt| parse_insert(stmt))
        .map(|insert| report(&catalog, &mut rewriter, &insert))
        .collect();

    if json {
        let output = InspectJsonOutput {
            dump: config.dump.display().to_string(),
            live_tables: catalog.len(),
            statements: reports,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_reports(&reports);
    }

    Ok(())
}

fn report(catalog: &Catalog, rewriter: &mut Rewriter<'_>, insert: &ParsedInsert) -> InsertReport {
    let mode = if insert.is_positional() {
        "positional"
    } else {
        "explicit"
    };
    let mut report = InsertReport {
        table: insert.table.clone(),
        mode,
        tuples: insert.tuples.len(),
        status: "rewritten",
        score: None,
        columns: Vec::new(),
        dropped: Vec::new(),
    };

    match rewriter.rewrite(insert) {
        RewriteOutcome::Rewritten(rewritten) => {
            describe_mapping(catalog, insert, &rewritten, &mut report);
        }
        RewriteOutcome::UnknownTable(_) => report.status = "unknown_table",
        RewriteOutcome::Skipped => report.status = "skipped",
    }
    report
}

fn describe_mapping(
    catalog: &Catalog,
    insert: &ParsedInsert,
    rewritten: &RewrittenInsert,
    report: &mut InsertReport,
) {
    let Some(table) = catalog.get_table(&rewritten.table) else {
        return;
    };
    let first_row = rewritten.rows.first();
    let sources = rewritten.mapping.sources();

    report.columns = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| ColumnReport {
            column: column.name.clone(),
            source: sources.get(i).copied().flatten().map(|k| match &insert.columns {
                Some(names) => names[k].clone(),
                None => format!("#{}", k + 1),
            }),
            value: first_row
                .and_then(|row| row.get(i))
                .map(|v| v.to_string())
                .unwrap_or_default(),
        })
        .collect();

    match &rewritten.mapping {
        ValueMapping::Aligned(alignment) => {
            report.score = Some(alignment.score);
            let value_count = insert.first_tuple().map(<[_]>::len).unwrap_or(0);
            report.dropped = alignment
                .dropped_values(value_count)
                .into_iter()
                .map(|j| format!("#{}", j + 1))
                .collect();
        }
        ValueMapping::ByName(sources) => {
            let names = insert.columns.as_deref().unwrap_or(&[]);
            report.dropped = names
                .iter()
                .enumerate()
                .filter(|(k, _)| !sources.contains(&Some(*k)))
                .map(|(_, name)| name.clone())
                .collect();
        }
    }
}

fn print_reports(reports: &[InsertReport]) {
    if reports.is_empty() {
        println!("No INSERT statements found.");
        return;
    }

    for (idx, report) in reports.iter().enumerate() {
        println!(
            "[{}] {} ({}, {} tuple{})",
            idx + 1,
            report.table,
            report.mode,
            report.tuples,
            if report.tuples == 1 { "" } else { "s" }
        );
        match report.status {
            "unknown_table" => {
                println!("    not in live schema; skipped");
                continue;
            }
            "skipped" => {
                println!("    skipped");
                continue;
            }
            _ => {}
        }
        if let Some(score) = report.score {
            println!("    alignment score: {}", score);
        }
        for column in &report.columns {
            match &column.source {
                Some(source) => println!("    {:<24} <- {:<12} {}", column.column, source, column.value),
                None => println!("    {:<24} <- {:<12} {}", column.column, "(filled)", column.value),
            }
        }
        if !report.dropped.is_empty() {
            println!("    dropped: {}", report.dropped.join(", "));
        }
    }
}
