// ── Inventory fetchers ──
//
// Read paths for both systems. Neither fetcher fails a run: FlightDeck
// has known bad pages, so a page error ends pagination with what was
// collected; a failed SkySpark read is treated as "nothing there yet".

use std::time::Duration;

use tracing::{Instrument, Span, debug, info, warn};

use crate::error::CoreError;
use crate::model::{EntityKind, SinkEntity, SourcePoint};
use crate::ports::{EntitySink, PointSource};

pub const DEFAULT_PAGE_SIZE: u32 = 500;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Paginated reader over a `PointSource`.
pub struct SourceFetcher<'a, S> {
    source: &'a S,
    page_size: u32,
    page_delay: Duration,
    span: Span,
}

impl<'a, S: PointSource> SourceFetcher<'a, S> {
    pub fn new(source: &'a S, page_size: u32, page_delay: Duration, span: Span) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            page_delay,
            span,
        }
    }

    /// All points for `site`, page by page, pausing `page_delay` between
    /// requests. A failing page stops pagination; earlier pages are kept.
    pub async fn fetch_points(&self, site: &str, configured_only: bool) -> Vec<SourcePoint> {
        async {
            let mut points = Vec::new();
            let mut page = 1;

            loop {
                match self
                    .source
                    .get_points_page(site, page, self.page_size, configured_only)
                    .await
                {
                    Ok(listing) => {
                        let received = listing.points.len();
                        debug!(page, pages = listing.pages, received, "fetched page");
                        points.extend(listing.points);

                        if received == 0 || page >= listing.pages {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(
                            page,
                            error = %e,
                            kept = points.len(),
                            "page fetch failed, continuing with points fetched so far"
                        );
                        break;
                    }
                }

                page += 1;
                tokio::time::sleep(self.page_delay).await;
            }

            info!(count = points.len(), configured_only, "fetched source points");
            points
        }
        .instrument(self.span.clone())
        .await
    }
}

/// Full-scan reader over an `EntitySink`.
pub struct SinkFetcher<'a, K> {
    sink: &'a K,
    span: Span,
}

impl<'a, K: EntitySink> SinkFetcher<'a, K> {
    pub fn new(sink: &'a K, span: Span) -> Self {
        Self { sink, span }
    }

    async fn fetch(&self, kind: EntityKind) -> Vec<SinkEntity> {
        match self
            .sink
            .read_entities(kind)
            .instrument(self.span.clone())
            .await
        {
            Ok(entities) => {
                debug!(parent: &self.span, %kind, count = entities.len(), "read sink entities");
                entities
            }
            Err(e) => {
                warn!(parent: &self.span, %kind, error = %e, "sink read failed, assuming none exist");
                Vec::new()
            }
        }
    }

    pub async fn fetch_sites(&self) -> Vec<SinkEntity> {
        self.fetch(EntityKind::Site).await
    }

    pub async fn fetch_equipment(&self) -> Vec<SinkEntity> {
        self.fetch(EntityKind::Equip).await
    }

    pub async fn fetch_points(&self) -> Vec<SinkEntity> {
        self.fetch(EntityKind::Point).await
    }

    /// Unlike entity reads, a timezone failure is reported to the caller.
    pub async fn project_timezone(&self) -> Result<String, CoreError> {
        self.sink
            .project_timezone()
            .instrument(self.span.clone())
            .await
    }
}
