// ── Port adapters ──
//
// Bind the HTTP clients from skysync-api to the engine's ports.

use chrono::SecondsFormat;
use skysync_api::flightdeck::FdPointWrite;
use skysync_api::skyspark::{Row, Value};
use skysync_api::{FlightDeckClient, SkysparkClient};

use crate::convert::{RefWriteBack, entity_from_row, sample_from_wire};
use crate::error::CoreError;
use crate::model::{EntityKind, Sample, SinkEntity, SinkId, SinkUpdate, SourcePage, SourceSite};
use crate::ports::{EntitySink, PointSource};

// ── FlightDeck ──────────────────────────────────────────────────────

impl PointSource for FlightDeckClient {
    async fn get_site(&self, name: &str) -> Result<SourceSite, CoreError> {
        Ok(FlightDeckClient::get_site(self, name).await?.into())
    }

    async fn get_points_page(
        &self,
        site: &str,
        page: u32,
        page_size: u32,
        configured_only: bool,
    ) -> Result<SourcePage, CoreError> {
        let listing = self
            .get_points(site, page, page_size, configured_only)
            .await?;
        Ok(SourcePage {
            page: listing.page,
            pages: listing.pages,
            points: listing.items.into_iter().map(Into::into).collect(),
        })
    }

    async fn write_back(&self, writes: &[RefWriteBack]) -> Result<(), CoreError> {
        let points: Vec<FdPointWrite> = writes.iter().map(FdPointWrite::from).collect();
        // Merge, never overwrite: other tags on the point must survive.
        self.write_points(&points, false, false).await?;
        Ok(())
    }

    async fn get_samples(
        &self,
        point: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<Sample>, CoreError> {
        let raw = self.get_timeseries(point, start, end).await?;
        Ok(raw.iter().filter_map(sample_from_wire).collect())
    }
}

// ── SkySpark ────────────────────────────────────────────────────────

fn entities(rows: Vec<Row>) -> Vec<SinkEntity> {
    rows.into_iter().filter_map(entity_from_row).collect()
}

impl EntitySink for SkysparkClient {
    fn project(&self) -> &str {
        SkysparkClient::project(self)
    }

    async fn project_timezone(&self) -> Result<String, CoreError> {
        Ok(SkysparkClient::project_timezone(self).await?)
    }

    async fn read_entities(&self, kind: EntityKind) -> Result<Vec<SinkEntity>, CoreError> {
        let rows = match kind {
            EntityKind::Site => self.read_sites().await?,
            EntityKind::Equip => self.read_equipment().await?,
            EntityKind::Point => self.read_points().await?,
        };
        Ok(entities(rows))
    }

    async fn create(
        &self,
        kind: EntityKind,
        records: &[SinkEntity],
    ) -> Result<Vec<SinkEntity>, CoreError> {
        let rows: Vec<Row> = records.iter().map(SinkEntity::to_add_row).collect();
        let created = match kind {
            EntityKind::Site => self.create_sites(rows).await?,
            EntityKind::Equip => self.create_equipment(rows).await?,
            EntityKind::Point => self.create_points(rows).await?,
        };
        Ok(entities(created))
    }

    async fn update(
        &self,
        kind: EntityKind,
        updates: &[SinkUpdate],
    ) -> Result<Vec<SinkEntity>, CoreError> {
        let rows: Vec<Row> = updates.iter().map(SinkUpdate::to_row).collect();
        let updated = match kind {
            EntityKind::Point => self.update_points(rows).await?,
            EntityKind::Equip => self.update_equipment(rows).await?,
            EntityKind::Site => {
                return Err(CoreError::Unsupported {
                    operation: "site update".into(),
                });
            }
        };
        Ok(entities(updated))
    }

    async fn his_write(&self, id: &SinkId, samples: &[Sample]) -> Result<(), CoreError> {
        let rows = samples
            .iter()
            .map(|s| {
                let ts = Value::DateTime {
                    val: s.time.to_rfc3339_opts(SecondsFormat::Secs, true),
                    tz: Some("UTC".into()),
                };
                (ts, Value::number(s.value))
            })
            .collect();
        SkysparkClient::his_write(self, id.as_str(), rows).await?;
        Ok(())
    }
}
