// ── Ports ──
//
// What the engine needs from each system. The HTTP clients implement
// these in `adapters`; tests substitute in-memory fakes.

use std::future::Future;

use crate::convert::RefWriteBack;
use crate::error::CoreError;
use crate::model::{EntityKind, Sample, SinkEntity, SinkId, SinkUpdate, SourcePage, SourceSite};

/// The inventory being mirrored (FlightDeck).
pub trait PointSource: Send + Sync {
    fn get_site(&self, name: &str) -> impl Future<Output = Result<SourceSite, CoreError>> + Send;

    /// One page of a site's points, 1-based.
    fn get_points_page(
        &self,
        site: &str,
        page: u32,
        page_size: u32,
        configured_only: bool,
    ) -> impl Future<Output = Result<SourcePage, CoreError>> + Send;

    /// Merge cross-reference tags onto source points.
    fn write_back(
        &self,
        writes: &[RefWriteBack],
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// History samples for one point; times are RFC 3339.
    fn get_samples(
        &self,
        point: &str,
        start: &str,
        end: &str,
    ) -> impl Future<Output = Result<Vec<Sample>, CoreError>> + Send;
}

/// The tag database being populated (SkySpark).
pub trait EntitySink: Send + Sync {
    /// Project name, embedded in every cross-reference token.
    fn project(&self) -> &str;

    fn project_timezone(&self) -> impl Future<Output = Result<String, CoreError>> + Send;

    fn read_entities(
        &self,
        kind: EntityKind,
    ) -> impl Future<Output = Result<Vec<SinkEntity>, CoreError>> + Send;

    /// Create records; returns them as stored, ids assigned.
    fn create(
        &self,
        kind: EntityKind,
        entities: &[SinkEntity],
    ) -> impl Future<Output = Result<Vec<SinkEntity>, CoreError>> + Send;

    fn update(
        &self,
        kind: EntityKind,
        updates: &[SinkUpdate],
    ) -> impl Future<Output = Result<Vec<SinkEntity>, CoreError>> + Send;

    fn his_write(
        &self,
        id: &SinkId,
        samples: &[Sample],
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}
