// ── History writer ──
//
// Copies FlightDeck timeseries into SkySpark for points that already carry
// a cross-reference. Points never synced are skipped, not created.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{Instrument, Span, debug, info, warn};

use crate::batch::batches;
use crate::error::CoreError;
use crate::fetch::SourceFetcher;
use crate::model::SinkId;
use crate::ports::{EntitySink, PointSource};
use crate::reconcile::SyncSettings;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Parse a history bound: RFC 3339, or `YYYY-MM-DD` meaning the start of
/// that day (or its last second when `end_of_day` is set), UTC.
pub fn parse_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, CoreError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        CoreError::ValidationFailed {
            message: format!("'{raw}' is neither RFC 3339 nor YYYY-MM-DD"),
        }
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)
    } else {
        Some(NaiveTime::MIN)
    }
    .ok_or_else(|| CoreError::Internal("invalid time of day".into()))?;
    Ok(date.and_time(time).and_utc())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub site: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: Option<usize>,
    pub chunk_size: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryResult {
    pub points_processed: usize,
    pub points_skipped: usize,
    pub samples_written: usize,
    pub errors: Vec<String>,
}

impl HistoryResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct HistoryWriter<'a, S, K> {
    source: &'a S,
    sink: &'a K,
    settings: SyncSettings,
    span: Span,
}

impl<'a, S: PointSource, K: EntitySink> HistoryWriter<'a, S, K> {
    pub fn new(source: &'a S, sink: &'a K, settings: SyncSettings, span: Span) -> Self {
        Self {
            source,
            sink,
            settings,
            span,
        }
    }

    pub async fn write_history(&self, request: &HistoryRequest) -> HistoryResult {
        let mut result = HistoryResult::default();
        if request.start > request.end {
            result
                .errors
                .push(format!("start {} is after end {}", request.start, request.end));
            return result;
        }

        async {
            let mut points = SourceFetcher::new(
                self.source,
                self.settings.page_size,
                self.settings.page_delay,
                self.span.clone(),
            )
            .fetch_points(&request.site, true)
            .await;
            points.sort_by(|a, b| a.name.cmp(&b.name));
            if let Some(limit) = request.limit {
                points.truncate(limit);
            }

            let start = request.start.to_rfc3339_opts(SecondsFormat::Secs, true);
            let end = request.end.to_rfc3339_opts(SecondsFormat::Secs, true);

            for point in &points {
                let Some(stored) = point.refs.point.as_deref() else {
                    debug!(point = %point.name, "no cross-reference, skipping");
                    result.points_skipped += 1;
                    continue;
                };
                let id = SinkId::new(stored);

                let samples = match self.source.get_samples(&point.name, &start, &end).await {
                    Ok(samples) => samples,
                    Err(e) => {
                        let msg = format!("Failed to read history for {}: {e}", point.name);
                        warn!("{msg}");
                        result.errors.push(msg);
                        continue;
                    }
                };
                result.points_processed += 1;

                if request.dry_run {
                    result.samples_written += samples.len();
                    continue;
                }

                for chunk in batches(&samples, request.chunk_size) {
                    match self.sink.his_write(&id, chunk.items).await {
                        Ok(()) => result.samples_written += chunk.items.len(),
                        Err(e) => {
                            let msg = format!(
                                "Failed to write history chunk {}/{} for {}: {e}",
                                chunk.number, chunk.total, point.name
                            );
                            warn!("{msg}");
                            result.errors.push(msg);
                        }
                    }
                }
            }

            info!(
                processed = result.points_processed,
                skipped = result.points_skipped,
                samples = result.samples_written,
                dry_run = request.dry_run,
                "history write finished"
            );
        }
        .instrument(self.span.clone())
        .await;

        result
    }
}
