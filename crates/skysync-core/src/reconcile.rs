// ── Reconciliation engine ──
//
// One run mirrors one FlightDeck site into SkySpark:
//
//   timezone → site → source points → equipment → points
//
// Each stage is gated on the one before it. The timezone and site stages
// are fatal; everything after degrades per entity or per batch and lands
// in the `SyncResult`.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use skysync_api::skyspark::{Row, Value};
use tracing::{Instrument, Span, debug, info, warn};

use crate::batch::{BatchOutcome, BatchWriter, DEFAULT_BATCH_SIZE, PendingCreate, PendingUpdate};
use crate::convert::RefWriteBack;
use crate::error::CoreError;
use crate::fetch::{DEFAULT_PAGE_DELAY, DEFAULT_PAGE_SIZE, SinkFetcher, SourceFetcher};
use crate::model::{
    EntityKind, FunctionMarker, PointFacet, SinkEntity, SinkId, SinkUpdate, SourcePoint,
    SourceSite, UNASSIGNED_EQUIP_KEY, ValueKind,
};
use crate::ports::{EntitySink, PointSource};
use crate::reference::{self, ORIGIN_TOPIC_TAG};
use crate::result::SyncResult;

/// Tags the engine owns on sink records; never copied from source kv tags.
const STRUCTURAL_TAGS: &[&str] = &[
    "id", "dis", "refName", "siteRef", "equipRef", "tz", "mod", "kind", "unit", "his",
    "site", "equip", "point",
];

// ── Run parameters ──────────────────────────────────────────────────

/// Tuning knobs fixed for the lifetime of a `Reconciler`.
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub batch_size: usize,
    pub page_size: u32,
    pub page_delay: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

/// What to sync on one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub site: String,
    pub dry_run: bool,
    /// Cap on source points, applied after sorting by name.
    pub limit: Option<usize>,
    /// Include points not flagged for collection.
    pub sync_all: bool,
}

impl SyncRequest {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            dry_run: false,
            limit: None,
            sync_all: false,
        }
    }
}

// ── Naming ──────────────────────────────────────────────────────────

/// Lowercase, alphanumerics kept, every other run of characters one `-`.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

pub fn site_ref_name(site: &str) -> String {
    format!("ace-site-{}", slug(site))
}

pub fn equip_ref_name(site: &str, key: &str) -> String {
    format!("ace-equip-{}-{key}", slug(site))
}

pub fn point_ref_name(point: &SourcePoint) -> String {
    match point.id {
        Some(id) => format!("ace-point-{id}"),
        None => format!("ace-{}", point.name.replace(' ', "_")),
    }
}

// ── Entity builders ─────────────────────────────────────────────────

fn site_entity(site: &SourceSite, tz: &str) -> SinkEntity {
    let dis = site.display_name.as_deref().unwrap_or(&site.name);
    let mut entity = SinkEntity::new(EntityKind::Site, dis);
    entity.ref_name = Some(site_ref_name(&site.name));
    entity.tz = Some(tz.to_owned());
    entity.markers = site
        .markers
        .iter()
        .filter(|m| !STRUCTURAL_TAGS.contains(&m.as_str()))
        .cloned()
        .collect();
    entity.tags = site
        .tags
        .iter()
        .filter(|(name, _)| !STRUCTURAL_TAGS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.to_value()))
        .collect();
    if let Some(address) = &site.address {
        entity.tags.insert("geoAddr".into(), Value::str(address));
    }
    if let (Some(lat), Some(lng)) = (site.latitude, site.longitude) {
        entity.tags.insert("geoCoord".into(), Value::Coord { lat, lng });
    }
    entity
}

/// A fresh point record in its desired state. The function marker is
/// left to the caller.
fn point_entity(point: &SourcePoint, site: &SinkId, equip: &SinkId, tz: &str) -> SinkEntity {
    let mut entity = SinkEntity::new(EntityKind::Point, point.display_name());
    entity.ref_name = Some(point_ref_name(point));
    entity.site_ref = Some(site.clone());
    entity.equip_ref = Some(equip.clone());
    entity.tz = Some(tz.to_owned());
    entity.markers = point
        .markers
        .iter()
        .filter(|m| !STRUCTURAL_TAGS.contains(&m.as_str()))
        .filter(|m| !FunctionMarker::is_function_marker(m))
        .cloned()
        .collect();
    entity.tags = source_kv(point);
    entity.point = Some(PointFacet {
        kind: Some(ValueKind::from_object_type(point.object_type.as_deref())),
        unit: point.unit.clone(),
        his: point.collect_enabled,
        function: FunctionMarker::find_in(&point.markers),
    });
    entity
}

fn source_kv(point: &SourcePoint) -> BTreeMap<String, Value> {
    let mut tags: BTreeMap<String, Value> = point
        .tags
        .iter()
        .filter(|(name, _)| !STRUCTURAL_TAGS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.to_value()))
        .collect();
    tags.insert(ORIGIN_TOPIC_TAG.to_owned(), Value::str(&point.name));
    tags
}

/// Merge the desired state onto an existing sink point.
///
/// Source tags overwrite, sink-only tags survive, refs follow this run.
/// Identity (refName, tz) stays as the sink has it; records missing either
/// get this run's value.
fn merge_point(desired: &SinkEntity, existing: &SinkEntity) -> SinkEntity {
    let mut merged = existing.clone();
    if merged.ref_name.is_none() {
        merged.ref_name.clone_from(&desired.ref_name);
    }
    if merged.tz.is_none() {
        merged.tz.clone_from(&desired.tz);
    }
    merged.dis.clone_from(&desired.dis);
    merged.site_ref.clone_from(&desired.site_ref);
    merged.equip_ref.clone_from(&desired.equip_ref);
    merged.markers.extend(desired.markers.iter().cloned());
    merged
        .markers
        .retain(|m| !FunctionMarker::is_function_marker(m));
    merged.tags.extend(desired.tags.clone());

    let current = existing.point.as_ref();
    let wanted = desired.point.as_ref();
    merged.point = Some(PointFacet {
        kind: wanted.and_then(|p| p.kind).or(current.and_then(|p| p.kind)),
        unit: wanted
            .and_then(|p| p.unit.clone())
            .or_else(|| current.and_then(|p| p.unit.clone())),
        his: wanted.is_some_and(|p| p.his),
        function: Some(
            wanted
                .and_then(|p| p.function)
                .or(current.and_then(|p| p.function))
                .unwrap_or(FunctionMarker::Sensor),
        ),
    });
    merged
}

// ── Reconciler ──────────────────────────────────────────────────────

/// Site identity resolved by the site stage.
struct SiteContext {
    id: SinkId,
    name: String,
}

pub struct Reconciler<'a, S, K> {
    source: &'a S,
    sink: &'a K,
    settings: SyncSettings,
    span: Span,
}

impl<'a, S: PointSource, K: EntitySink> Reconciler<'a, S, K> {
    pub fn new(source: &'a S, sink: &'a K, settings: SyncSettings, span: Span) -> Self {
        Self {
            source,
            sink,
            settings,
            span,
        }
    }

    fn writer(&self) -> BatchWriter<'a, S, K> {
        BatchWriter::new(
            self.source,
            self.sink,
            self.settings.batch_size,
            self.span.clone(),
        )
    }

    /// Run one reconciliation. Never fails: fatal problems set
    /// `aborted` and everything else is collected in `errors`.
    pub async fn run(&self, request: &SyncRequest) -> SyncResult {
        let mut result = SyncResult::new(&request.site, request.dry_run);
        self.run_stages(request, &mut result)
            .instrument(self.span.clone())
            .await;
        info!(
            parent: &self.span,
            site = %request.site,
            dry_run = request.dry_run,
            sites = ?result.sites,
            equipment = ?result.equipment,
            points = ?result.points,
            errors = result.errors.len(),
            aborted = result.aborted,
            "sync finished"
        );
        result
    }

    async fn run_stages(&self, request: &SyncRequest, result: &mut SyncResult) {
        let sink_reads = SinkFetcher::new(self.sink, self.span.clone());

        // 1. Timezone
        let tz = match sink_reads.project_timezone().await {
            Ok(tz) => tz,
            Err(e) => {
                result.abort(format!("Failed to resolve project timezone: {e}"));
                return;
            }
        };
        debug!(%tz, "resolved project timezone");

        // 2. Site
        let site = match self.sync_site(request, &tz, &sink_reads, result).await {
            Ok(site) => site,
            Err(e) => {
                result.abort(format!("Failed to sync site '{}': {e}", request.site));
                return;
            }
        };

        // 3. Source points
        let mut points = SourceFetcher::new(
            self.source,
            self.settings.page_size,
            self.settings.page_delay,
            self.span.clone(),
        )
        .fetch_points(&request.site, !request.sync_all)
        .await;
        points.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(limit) = request.limit {
            points.truncate(limit);
        }
        if points.is_empty() {
            info!(site = %request.site, "no source points to sync");
            return;
        }

        let mut keyed = Vec::with_capacity(points.len());
        for point in points {
            match point.equipment_key() {
                Ok(key) => keyed.push((point, key)),
                Err(e) => result.add_error(format!("Failed to prepare point {}: {e}", point.name)),
            }
        }

        // 4. Equipment
        let equip_ids = self
            .sync_equipment(&site, &keyed, &tz, request.dry_run, &sink_reads, result)
            .await;

        // 5–6. Points and write-back
        self.sync_points(&site, &keyed, &equip_ids, &tz, request.dry_run, &sink_reads, result)
            .await;
    }

    // ── Site ──

    async fn sync_site(
        &self,
        request: &SyncRequest,
        tz: &str,
        sink_reads: &SinkFetcher<'_, K>,
        result: &mut SyncResult,
    ) -> Result<SiteContext, CoreError> {
        let source_site = self.source.get_site(&request.site).await?;
        let existing = sink_reads.fetch_sites().await;
        let ref_name = site_ref_name(&source_site.name);

        let by_stored_ref = source_site.stored_ref.as_deref().and_then(|stored| {
            let bare = reference::decode_str(stored);
            existing.iter().find(|s| s.bare_id() == Some(bare))
        });
        let found =
            by_stored_ref.or_else(|| existing.iter().find(|s| s.ref_name.as_deref() == Some(&ref_name)));

        if let Some(id) = found.and_then(|s| s.id.clone()) {
            info!(site = %source_site.name, id = %id, "site already in sink");
            result.sites.skipped += 1;
            return Ok(SiteContext {
                id,
                name: source_site.name,
            });
        }

        let desired = site_entity(&source_site, tz);
        let id = if request.dry_run {
            info!(site = %source_site.name, %ref_name, "dry run: would create site");
            SinkId::placeholder("site")
        } else {
            let created = self.sink.create(EntityKind::Site, &[desired]).await?;
            created
                .into_iter()
                .find_map(|s| s.id)
                .ok_or_else(|| CoreError::Internal("site create returned no record".into()))?
        };
        result.sites.created += 1;
        info!(site = %source_site.name, id = %id, "created site");

        warn!(
            site = %source_site.name,
            reference = %reference::encode(self.sink.project(), id.bare()),
            "FlightDeck has no site tag endpoint; site reference not persisted"
        );

        Ok(SiteContext {
            id,
            name: source_site.name,
        })
    }

    // ── Equipment ──

    async fn sync_equipment(
        &self,
        site: &SiteContext,
        points: &[(SourcePoint, String)],
        tz: &str,
        dry_run: bool,
        sink_reads: &SinkFetcher<'_, K>,
        result: &mut SyncResult,
    ) -> HashMap<String, SinkId> {
        // Group key → display name, first device name wins.
        let mut groups: BTreeMap<&str, String> = BTreeMap::new();
        for (point, key) in points {
            let device_name = point.device.as_ref().and_then(|d| d.name.clone());
            let entry = groups.entry(key.as_str()).or_insert_with(|| {
                if key == UNASSIGNED_EQUIP_KEY {
                    "Unassigned".to_owned()
                } else {
                    key.clone()
                }
            });
            if *entry == *key {
                if let Some(name) = device_name {
                    *entry = name;
                }
            }
        }

        let existing = sink_reads.fetch_equipment().await;
        let by_ref_name: HashMap<&str, &SinkEntity> = existing
            .iter()
            .filter_map(|e| Some((e.ref_name.as_deref()?, e)))
            .collect();

        let mut ids: HashMap<String, SinkId> = HashMap::new();
        let mut creates = Vec::new();
        let mut creates_by_ref: HashMap<String, String> = HashMap::new();
        let mut updates = Vec::new();

        for (key, dis) in groups {
            let ref_name = equip_ref_name(&site.name, key);
            match by_ref_name.get(ref_name.as_str()).copied() {
                Some(found) => {
                    let Some(id) = found.id.clone() else { continue };
                    let attached = found.site_ref.as_ref().map(SinkId::bare);
                    if attached == Some(site.id.bare()) {
                        result.equipment.skipped += 1;
                    } else {
                        debug!(%key, from = ?attached, to = %site.id, "repairing equipment siteRef");
                        let mut repaired = found.clone();
                        repaired.site_ref = Some(site.id.clone());
                        updates.push(PendingUpdate {
                            update: SinkUpdate {
                                id: id.clone(),
                                mod_token: found.mod_token.clone(),
                                changes: Row::from([("siteRef".to_owned(), site.id.to_value())]),
                            },
                            entity: repaired,
                            source: None,
                        });
                    }
                    ids.insert(key.to_owned(), id);
                }
                None => {
                    let mut entity = SinkEntity::new(EntityKind::Equip, dis);
                    entity.ref_name = Some(ref_name.clone());
                    entity.site_ref = Some(site.id.clone());
                    entity.tz = Some(tz.to_owned());
                    creates_by_ref.insert(ref_name, key.to_owned());
                    creates.push(PendingCreate {
                        entity,
                        source: None,
                    });
                }
            }
        }

        if dry_run {
            for (ref_name, key) in &creates_by_ref {
                info!(%ref_name, "dry run: would create equipment");
                ids.insert(key.clone(), SinkId::placeholder(format!("equip-{key}")));
            }
            result.equipment.created += creates.len();
            result.equipment.updated += updates.len();
            return ids;
        }

        let writer = self.writer();
        if !creates.is_empty() {
            let outcome = writer.create_batch(EntityKind::Equip, &creates).await;
            for stored in &outcome.written {
                let key = stored.ref_name.as_ref().and_then(|r| creates_by_ref.get(r));
                if let (Some(key), Some(id)) = (key, stored.id.clone()) {
                    ids.insert(key.clone(), id);
                }
            }
            let created = absorb(outcome, result);
            result.equipment.created += created;
        }
        if !updates.is_empty() {
            let outcome = writer.update_batch(EntityKind::Equip, &updates).await;
            let updated = absorb(outcome, result);
            result.equipment.updated += updated;
        }
        ids
    }

    // ── Points ──

    #[allow(clippy::too_many_arguments)]
    async fn sync_points(
        &self,
        site: &SiteContext,
        points: &[(SourcePoint, String)],
        equip_ids: &HashMap<String, SinkId>,
        tz: &str,
        dry_run: bool,
        sink_reads: &SinkFetcher<'_, K>,
        result: &mut SyncResult,
    ) {
        let existing = sink_reads.fetch_points().await;
        let by_id: HashMap<&str, &SinkEntity> = existing
            .iter()
            .filter_map(|e| Some((e.bare_id()?, e)))
            .collect();

        let writer = self.writer();
        let mut creates = Vec::new();
        let mut updates = Vec::new();
        let mut stale = Vec::new();
        let mut orphaned = 0usize;

        for (point, key) in points {
            let Some(equip_id) = equip_ids.get(key) else {
                warn!(point = %point.name, equipment = %key, "no equipment record, skipping point");
                orphaned += 1;
                continue;
            };

            let mut desired = point_entity(point, &site.id, equip_id, tz);
            let resolved = point
                .refs
                .point
                .as_deref()
                .map(reference::decode_str)
                .and_then(|bare| by_id.get(bare).copied());

            match resolved {
                Some(current) => {
                    let merged = merge_point(&desired, current);
                    match SinkUpdate::between(&merged, current) {
                        Some(update) => updates.push(PendingUpdate {
                            update,
                            entity: merged,
                            source: Some(point.key()),
                        }),
                        None => {
                            result.points.skipped += 1;
                            if let Some(wb) = writer.write_back_for(point.key(), &merged) {
                                if is_stale(point, &wb) {
                                    stale.push(wb);
                                }
                            }
                        }
                    }
                }
                None => {
                    if let Some(facet) = desired.point.as_mut() {
                        facet.function.get_or_insert(FunctionMarker::Sensor);
                    }
                    creates.push(PendingCreate {
                        entity: desired,
                        source: Some(point.key()),
                    });
                }
            }
        }

        if orphaned > 0 {
            result.add_error(format!(
                "{orphaned} point(s) skipped: their equipment could not be created"
            ));
        }

        if dry_run {
            info!(
                creates = creates.len(),
                updates = updates.len(),
                "dry run: point writes not sent"
            );
            result.points.created += creates.len();
            result.points.updated += updates.len();
            return;
        }

        if !creates.is_empty() {
            let outcome = writer.create_batch(EntityKind::Point, &creates).await;
            let created = absorb(outcome, result);
            result.points.created += created;
        }
        if !updates.is_empty() {
            let outcome = writer.update_batch(EntityKind::Point, &updates).await;
            let updated = absorb(outcome, result);
            result.points.updated += updated;
        }
        if !stale.is_empty() {
            let persisted = writer.persist_refs(&stale).await;
            info!(count = persisted, "refreshed stale references on skipped points");
        }
    }
}

/// True when the references stored on the source differ from `wb`.
fn is_stale(point: &SourcePoint, wb: &RefWriteBack) -> bool {
    point.refs.point.as_deref() != Some(wb.point_ref.as_str())
        || point.refs.site != wb.site_ref
        || point.refs.equip != wb.equip_ref
}

/// Move a batch outcome's errors into the run; returns the success count.
fn absorb(outcome: BatchOutcome, result: &mut SyncResult) -> usize {
    result.errors.extend(outcome.errors);
    outcome.succeeded
}
