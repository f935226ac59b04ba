use crate::error::invalid_input;
use anyhow::{Context as _, Result};
use phonedir_config::AppConfig;
use phonedir_core::{convert as convert_cards, ConvertReport, RawCard, SkippedRecord};
use phonedir_sync::write_document;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub mod completions;
pub mod convert;
pub mod sync;

pub struct Context<'a> {
    pub json: bool,
    pub config: &'a AppConfig,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    source: &'static str,
    output: Option<String>,
    dry_run: bool,
    #[serde(flatten)]
    report: &'a ConvertReport,
}

/// `--out` beats `directory.output`; with neither the document goes to stdout.
pub fn resolve_output(ctx: &Context<'_>, out: Option<PathBuf>) -> Option<PathBuf> {
    out.or_else(|| ctx.config.directory.output.clone())
}

pub fn publish(
    ctx: &Context<'_>,
    source: &'static str,
    cards: &[RawCard],
    output: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    if ctx.json && output.is_none() && !dry_run {
        return Err(invalid_input(
            "--json requires an output path (--out or directory.output)",
        ));
    }

    let conversion = convert_cards(cards, &ctx.config.directory.convert_options());
    log_report(&conversion.report);

    if !dry_run {
        write_document(output, &conversion.document).with_context(|| match output {
            Some(path) => format!("write directory {}", path.display()),
            None => "write directory to stdout".to_string(),
        })?;
    }

    let report = &conversion.report;
    if ctx.json {
        return print_json(&RunReport {
            source,
            output: output.map(|path| path.display().to_string()),
            dry_run,
            report,
        });
    }

    let summary = summary_line(report, output, dry_run);
    if output.is_some() || dry_run {
        println!("{summary}");
    } else {
        eprintln!("{summary}");
    }
    Ok(())
}

fn summary_line(report: &ConvertReport, output: Option<&Path>, dry_run: bool) -> String {
    let target = match output {
        Some(path) => path.display().to_string(),
        None => "stdout".to_string(),
    };
    let verb = if dry_run { "Would write" } else { "Wrote" };
    format!(
        "{verb} {} of {} contacts to {target} ({} skipped, {} numbers discarded)",
        report.entries,
        report.cards,
        report.skipped.len(),
        report.discarded_numbers
    )
}

fn log_report(report: &ConvertReport) {
    for skipped in &report.skipped {
        debug!(%skipped, "card skipped");
    }
    if report.malformed > 0 {
        warn!(count = report.malformed, "malformed cards skipped");
    }
    let without_numbers = report
        .skipped
        .iter()
        .filter(|skipped| matches!(skipped, SkippedRecord::NoNumbers { .. }))
        .count();
    if without_numbers > 0 {
        warn!(count = without_numbers, "contacts without usable numbers left out");
    }
}
