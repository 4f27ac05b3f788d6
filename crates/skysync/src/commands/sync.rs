//! `skysync sync`

use tracing::info;

use skysync_core::{Reconciler, SyncRequest};

use crate::cli::{GlobalOpts, OutputFormat, SyncArgs};
use crate::config::{Session, count};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: SyncArgs, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let request = SyncRequest {
        site: session.site(args.site)?,
        dry_run: session.dry_run(args.dry_run),
        limit: count(args.limit, "limit")?,
        sync_all: args.sync_all,
    };
    let batch_size = count(args.batch_size, "batch-size")?;
    execute(session, &request, batch_size, global.output).await
}

/// Run one reconciliation and print its summary.
pub async fn execute(
    session: &Session,
    request: &SyncRequest,
    batch_size: Option<usize>,
    format: OutputFormat,
) -> Result<(), CliError> {
    info!(
        site = %request.site,
        dry_run = request.dry_run,
        limit = ?request.limit,
        sync_all = request.sync_all,
        "sync starting"
    );
    let span = tracing::info_span!("sync", site = %request.site, dry_run = request.dry_run);
    let reconciler = Reconciler::new(
        &session.source,
        &session.sink,
        session.settings(batch_size),
        span,
    );
    let result = reconciler.run(request).await;
    info!(
        created = result.points.created,
        updated = result.points.updated,
        skipped = result.points.skipped,
        errors = result.errors.len(),
        "sync complete"
    );

    output::print_output(&output::render(format, &result, output::sync_detail)?);
    if result.is_success() {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            operation: "Sync".into(),
            count: result.errors.len(),
        })
    }
}
