//! Output formatting: summary tables or JSON.
//!
//! Renders command results in the format selected by `--output`. Tables use
//! `tabled`; JSON serializes the result struct itself.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use skysync_core::{Counts, HistoryResult, RecoveryResult, SyncResult, TimezoneReport};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Errors listed in table output before the rest are summarized.
pub const MAX_LISTED_ERRORS: usize = 10;

// ── Color helpers ────────────────────────────────────────────────────

pub fn should_color() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn status_line(ok: bool, text: &str) -> String {
    match (should_color(), ok) {
        (false, _) => text.to_owned(),
        (true, true) => text.green().bold().to_string(),
        (true, false) => text.red().bold().to_string(),
    }
}

// ── Render dispatcher ────────────────────────────────────────────────

/// Render a result in the chosen format. `detail_fn` builds the table view.
pub fn render<T: Serialize>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
    }
}

/// Print rendered output to stdout.
pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// The first [`MAX_LISTED_ERRORS`] errors, then a count of the rest.
pub fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = format!("\nErrors ({}):", errors.len());
    for error in errors.iter().take(MAX_LISTED_ERRORS) {
        out.push_str("\n  - ");
        out.push_str(error);
    }
    if errors.len() > MAX_LISTED_ERRORS {
        out.push_str(&format!(
            "\n  ... and {} more errors",
            errors.len() - MAX_LISTED_ERRORS
        ));
    }
    out
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Entity")]
    entity: &'static str,
    #[tabled(rename = "Created")]
    created: usize,
    #[tabled(rename = "Updated")]
    updated: usize,
    #[tabled(rename = "Skipped")]
    skipped: usize,
}

impl CountRow {
    fn new(entity: &'static str, counts: Counts) -> Self {
        Self {
            entity,
            created: counts.created,
            updated: counts.updated,
            skipped: counts.skipped,
        }
    }
}

pub fn sync_detail(result: &SyncResult) -> String {
    let mode = if result.dry_run { " (dry run)" } else { "" };
    let headline = if result.aborted {
        format!("Sync of '{}' aborted{mode}", result.site)
    } else if result.is_success() {
        format!("Sync of '{}' complete{mode}", result.site)
    } else {
        format!("Sync of '{}' finished with errors{mode}", result.site)
    };

    let rows = [
        CountRow::new("Sites", result.sites),
        CountRow::new("Equipment", result.equipment),
        CountRow::new("Points", result.points),
    ];
    format!(
        "{}\n{}{}",
        status_line(result.is_success(), &headline),
        render_table(&rows),
        error_list(&result.errors)
    )
}

// ── Reference recovery ───────────────────────────────────────────────

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Count")]
    count: usize,
}

pub fn recovery_detail(result: &RecoveryResult) -> String {
    let rows = [
        StatRow {
            metric: "Points found",
            count: result.points_found,
        },
        StatRow {
            metric: "References updated",
            count: result.refs_updated,
        },
        StatRow {
            metric: "Points skipped",
            count: result.points_skipped,
        },
    ];
    let headline = if result.is_success() {
        "Reference recovery complete"
    } else {
        "Reference recovery finished with errors"
    };
    format!(
        "{}\n{}{}",
        status_line(result.is_success(), headline),
        render_table(&rows),
        error_list(&result.errors)
    )
}

// ── History ──────────────────────────────────────────────────────────

pub fn history_detail(result: &HistoryResult) -> String {
    let rows = [
        StatRow {
            metric: "Points processed",
            count: result.points_processed,
        },
        StatRow {
            metric: "Points skipped",
            count: result.points_skipped,
        },
        StatRow {
            metric: "Samples written",
            count: result.samples_written,
        },
    ];
    let headline = if result.is_success() {
        "History write complete"
    } else {
        "History write finished with errors"
    };
    format!(
        "{}\n{}{}",
        status_line(result.is_success(), headline),
        render_table(&rows),
        error_list(&result.errors)
    )
}

// ── Timezones ────────────────────────────────────────────────────────

#[derive(Tabled)]
struct MismatchRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    dis: String,
    #[tabled(rename = "Timezone")]
    tz: String,
}

pub fn timezone_detail(report: &TimezoneReport) -> String {
    let headline = format!(
        "Checked {} entities against project timezone {}",
        report.checked, report.project_tz
    );
    if report.is_consistent() {
        return format!(
            "{}\n{}",
            headline,
            status_line(true, "All timezones match")
        );
    }

    let rows: Vec<MismatchRow> = report
        .mismatches
        .iter()
        .map(|m| MismatchRow {
            kind: m.kind.to_string(),
            id: m.id.clone(),
            dis: m.dis.clone(),
            tz: m.tz.clone().unwrap_or_else(|| "(none)".into()),
        })
        .collect();
    format!(
        "{}\n{}\n{}",
        headline,
        status_line(
            false,
            &format!("{} mismatched timezone(s)", report.mismatches.len())
        ),
        render_table(&rows)
    )
}
