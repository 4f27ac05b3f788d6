//! `skysync sync-refs-from-skyspark`

use skysync_core::RefRecovery;

use crate::cli::{GlobalOpts, OutputFormat, SyncRefsArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: SyncRefsArgs,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let dry_run = session.dry_run(args.dry_run);
    execute(session, args.site.as_deref(), dry_run, global.output).await
}

pub async fn execute(
    session: &Session,
    site: Option<&str>,
    dry_run: bool,
    format: OutputFormat,
) -> Result<(), CliError> {
    let span = tracing::info_span!("sync_refs", site = site.unwrap_or("*"), dry_run);
    let recovery = RefRecovery::new(
        &session.source,
        &session.sink,
        session.config.app.batch_size,
        span,
    );
    let result = recovery.recover_refs(site, dry_run).await;

    output::print_output(&output::render(format, &result, output::recovery_detail)?);
    if result.is_success() {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            operation: "Reference recovery".into(),
            count: result.errors.len(),
        })
    }
}
