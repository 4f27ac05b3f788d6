//! `skysync job`
//!
//! Runs the sections of a job file in a fixed order: sync, reference
//! recovery, history, timezone audit. Command-line flags override the file
//! and the file overrides the environment.

use std::path::Path;

use tracing::{info, warn};

use skysync_config::{JobFile, JobFormat};
use skysync_core::{HistoryRequest, SyncRequest, parse_bound};

use crate::cli::{GlobalOpts, JobArgs, JobCommand, JobFormatArg};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::{history, refs, sync, timezones};

pub async fn handle(args: JobArgs, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        JobCommand::Run { file, dry_run } => run(&file, dry_run, session, global).await,
        JobCommand::Template { format } => template(format),
    }
}

/// Print a template job file.
pub fn template(format: JobFormatArg) -> Result<(), CliError> {
    let format = match format {
        JobFormatArg::Yaml => JobFormat::Yaml,
        JobFormatArg::Json => JobFormat::Json,
    };
    output::print_output(&JobFile::template().render(format)?);
    Ok(())
}

/// Tally a section outcome: partial failures are counted and the job goes
/// on; anything else stops it.
fn settle(outcome: Result<(), CliError>, failed: &mut usize) -> Result<(), CliError> {
    match outcome {
        Err(CliError::Incomplete { count, operation }) => {
            warn!(operation = %operation, errors = count, "job section finished with errors");
            *failed += count;
            Ok(())
        }
        other => other,
    }
}

async fn run(
    file: &Path,
    force_dry_run: bool,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let job = JobFile::from_path(file)?;
    if job.is_empty() {
        return Err(CliError::Validation {
            field: "job".into(),
            reason: format!("{} has no sections", file.display()),
        });
    }
    if job.check_timezones.as_ref().is_some_and(|s| s.fix) {
        return Err(CliError::FixUnsupported);
    }
    info!(file = %file.display(), "running job");

    let format = global.output;
    let mut failed = 0;

    if let Some(section) = job.sync {
        let request = SyncRequest {
            site: session.site(Some(section.site))?,
            dry_run: session.dry_run(force_dry_run || section.dry_run),
            limit: section.limit,
            sync_all: section.sync_all,
        };
        let outcome = sync::execute(session, &request, section.batch_size, format).await;
        settle(outcome, &mut failed)?;
    }

    if let Some(section) = job.sync_refs {
        let dry_run = session.dry_run(force_dry_run || section.dry_run);
        let outcome = refs::execute(session, section.site.as_deref(), dry_run, format).await;
        settle(outcome, &mut failed)?;
    }

    if let Some(section) = job.write_history {
        let request = HistoryRequest {
            site: session.site(Some(section.site))?,
            start: parse_bound(&section.start, false)?,
            end: parse_bound(&section.end, true)?,
            limit: section.limit,
            chunk_size: section.chunk_size,
            dry_run: session.dry_run(force_dry_run || section.dry_run),
        };
        let outcome = history::execute(session, &request, format).await;
        settle(outcome, &mut failed)?;
    }

    if let Some(section) = job.check_timezones {
        let outcome = timezones::execute(session, section.site.as_deref(), format).await;
        settle(outcome, &mut failed)?;
    }

    if failed > 0 {
        return Err(CliError::Incomplete {
            operation: "Job".into(),
            count: failed,
        });
    }
    Ok(())
}
