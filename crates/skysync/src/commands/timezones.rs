//! `skysync check-timezones`

use skysync_core::check_timezones;

use crate::cli::{CheckTimezonesArgs, GlobalOpts, OutputFormat};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: CheckTimezonesArgs,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.fix {
        return Err(CliError::FixUnsupported);
    }
    execute(session, args.site.as_deref(), global.output).await
}

/// Mismatches are reported, not treated as a failure.
pub async fn execute(
    session: &Session,
    site: Option<&str>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let span = tracing::info_span!("check_timezones", site = site.unwrap_or("*"));
    let report = check_timezones(&session.sink, site, span).await?;
    output::print_output(&output::render(format, &report, output::timezone_detail)?);
    Ok(())
}
