//! `skysync write-history`

use skysync_core::{DEFAULT_CHUNK_SIZE, HistoryRequest, HistoryWriter, parse_bound};

use crate::cli::{GlobalOpts, OutputFormat, WriteHistoryArgs};
use crate::config::{Session, count};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: WriteHistoryArgs,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let request = HistoryRequest {
        site: session.site(args.site)?,
        start: parse_bound(&args.start, false)?,
        end: parse_bound(&args.end, true)?,
        limit: count(args.limit, "limit")?,
        chunk_size: count(args.chunk_size, "chunk-size")?.unwrap_or(DEFAULT_CHUNK_SIZE),
        dry_run: session.dry_run(args.dry_run),
    };
    execute(session, &request, global.output).await
}

pub async fn execute(
    session: &Session,
    request: &HistoryRequest,
    format: OutputFormat,
) -> Result<(), CliError> {
    let span = tracing::info_span!(
        "write_history",
        site = %request.site,
        start = %request.start,
        end = %request.end,
        dry_run = request.dry_run
    );
    let writer = HistoryWriter::new(&session.source, &session.sink, session.settings(None), span);
    let result = writer.write_history(request).await;

    output::print_output(&output::render(format, &result, output::history_detail)?);
    if result.is_success() {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            operation: "History write".into(),
            count: result.errors.len(),
        })
    }
}
