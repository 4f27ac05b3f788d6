// In-memory FlightDeck and SkySpark stand-ins for engine tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use skysync_api::skyspark::{Row, Value};
use skysync_core::convert::entity_from_row;
use skysync_core::model::{DeviceBinding, SinkUpdate, SourcePage, StoredRefs};
use skysync_core::{
    CoreError, EntityKind, EntitySink, PointSource, RefWriteBack, Sample, Scalar, SinkEntity,
    SinkId, SourcePoint, SourceSite,
};

pub const PROJECT: &str = "demo";
pub const TZ: &str = "New_York";

// ── Builders ────────────────────────────────────────────────────────

pub fn site(name: &str) -> SourceSite {
    SourceSite {
        name: name.into(),
        client: Some("acme".into()),
        display_name: None,
        address: None,
        latitude: None,
        longitude: None,
        markers: BTreeSet::new(),
        tags: BTreeMap::new(),
        stored_ref: None,
    }
}

/// A collected point named `acme/<site>/<short>`.
pub fn point(site: &str, id: i64, short: &str, device: Option<(&str, &str)>) -> SourcePoint {
    SourcePoint {
        id: Some(id),
        name: format!("acme/{site}/{short}"),
        site: site.into(),
        client: "acme".into(),
        markers: BTreeSet::from(["temp".to_owned()]),
        tags: BTreeMap::from([("floor".to_owned(), Scalar::Str("2".into()))]),
        refs: StoredRefs::default(),
        device: device.map(|(address, id)| DeviceBinding {
            address: Some(address.into()),
            device_id: Some(id.into()),
            name: Some(format!("Device {id}")),
        }),
        object_name: None,
        object_type: Some("analogInput".into()),
        unit: Some("°F".into()),
        collect_enabled: true,
    }
}

// ── FlightDeck ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct SourceState {
    pub sites: HashMap<String, SourceSite>,
    pub points: Vec<SourcePoint>,
    pub failing_pages: HashSet<u32>,
    pub fail_write_back: bool,
    pub write_back_calls: usize,
    /// Point names in write-back order.
    pub written_back: Vec<String>,
    pub page_requests: Vec<u32>,
    pub samples: HashMap<String, Vec<Sample>>,
}

#[derive(Default)]
pub struct FakeSource {
    pub state: Mutex<SourceState>,
}

impl FakeSource {
    pub fn new(site: SourceSite, points: Vec<SourcePoint>) -> Self {
        let state = SourceState {
            sites: HashMap::from([(site.name.clone(), site)]),
            points,
            ..SourceState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn point(&self, name: &str) -> SourcePoint {
        let state = self.state.lock().unwrap();
        state.points.iter().find(|p| p.name == name).cloned().unwrap()
    }

    pub fn set_tag(&self, name: &str, tag: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        let point = state.points.iter_mut().find(|p| p.name == name).unwrap();
        point.tags.insert(tag.into(), Scalar::Str(value.into()));
    }
}

impl PointSource for FakeSource {
    async fn get_site(&self, name: &str) -> Result<SourceSite, CoreError> {
        let state = self.state.lock().unwrap();
        state
            .sites
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::SiteNotFound { name: name.into() })
    }

    async fn get_points_page(
        &self,
        site: &str,
        page: u32,
        page_size: u32,
        configured_only: bool,
    ) -> Result<SourcePage, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.page_requests.push(page);
        if state.failing_pages.contains(&page) {
            return Err(CoreError::Api {
                message: format!("page {page} is corrupt"),
                status: Some(500),
            });
        }

        let matching: Vec<SourcePoint> = state
            .points
            .iter()
            .filter(|p| p.site == site && (!configured_only || p.collect_enabled))
            .cloned()
            .collect();
        let size = usize::try_from(page_size).unwrap();
        let pages = u32::try_from(matching.len().div_ceil(size)).unwrap();
        let start = (usize::try_from(page).unwrap() - 1) * size;
        let points = matching.into_iter().skip(start).take(size).collect();
        Ok(SourcePage {
            points,
            page,
            pages,
        })
    }

    async fn write_back(&self, writes: &[RefWriteBack]) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        state.write_back_calls += 1;
        if state.fail_write_back {
            return Err(CoreError::Api {
                message: "write-back rejected".into(),
                status: Some(502),
            });
        }
        for wb in writes {
            state.written_back.push(wb.key.name.clone());
            if let Some(point) = state.points.iter_mut().find(|p| p.name == wb.key.name) {
                point.refs.point = Some(wb.point_ref.clone());
                if wb.site_ref.is_some() {
                    point.refs.site.clone_from(&wb.site_ref);
                }
                if wb.equip_ref.is_some() {
                    point.refs.equip.clone_from(&wb.equip_ref);
                }
            }
        }
        Ok(())
    }

    async fn get_samples(
        &self,
        point: &str,
        _start: &str,
        _end: &str,
    ) -> Result<Vec<Sample>, CoreError> {
        let state = self.state.lock().unwrap();
        state
            .samples
            .get(point)
            .cloned()
            .ok_or_else(|| CoreError::Api {
                message: format!("no timeseries for {point}"),
                status: Some(404),
            })
    }
}

// ── SkySpark ────────────────────────────────────────────────────────

pub struct SinkState {
    pub tz: Option<String>,
    pub rows: Vec<Row>,
    next_id: usize,
    /// 1-based create calls (per kind) that fail.
    pub failing_creates: HashSet<(EntityKind, usize)>,
    create_calls: HashMap<EntityKind, usize>,
    /// Kinds whose reads fail.
    pub failing_reads: HashSet<EntityKind>,
    /// 1-based update calls (all kinds) that fail.
    pub failing_updates: HashSet<usize>,
    pub update_calls: usize,
    pub his: Vec<(SinkId, Vec<Sample>)>,
}

pub struct FakeSink {
    pub state: Mutex<SinkState>,
}

impl Default for FakeSink {
    fn default() -> Self {
        Self::with_timezone(Some(TZ))
    }
}

impl FakeSink {
    pub fn with_timezone(tz: Option<&str>) -> Self {
        Self {
            state: Mutex::new(SinkState {
                tz: tz.map(str::to_owned),
                rows: Vec::new(),
                next_id: 0,
                failing_creates: HashSet::new(),
                create_calls: HashMap::new(),
                failing_reads: HashSet::new(),
                failing_updates: HashSet::new(),
                update_calls: 0,
                his: Vec::new(),
            }),
        }
    }

    /// Store a row as-is, assigning an id; returns the bare id.
    pub fn seed(&self, mut row: Row) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("r{}", state.next_id);
        row.insert(
            "id".into(),
            Value::reference(format!("p:{PROJECT}:r:{id}")),
        );
        state.rows.push(row);
        id
    }

    pub fn fail_create(&self, kind: EntityKind, call: usize) {
        let mut state = self.state.lock().unwrap();
        state.failing_creates.insert((kind, call));
    }

    pub fn fail_read(&self, kind: EntityKind) {
        let mut state = self.state.lock().unwrap();
        state.failing_reads.insert(kind);
    }

    pub fn fail_update(&self, call: usize) {
        let mut state = self.state.lock().unwrap();
        state.failing_updates.insert(call);
    }

    pub fn entities(&self, kind: EntityKind) -> Vec<SinkEntity> {
        let state = self.state.lock().unwrap();
        state
            .rows
            .iter()
            .cloned()
            .filter_map(entity_from_row)
            .filter(|e| e.kind == kind)
            .collect()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities(kind).len()
    }
}

fn bare_of(row: &Row) -> Option<String> {
    let raw = row.get("id")?.as_ref_val()?;
    Some(skysync_core::reference::decode_str(raw).to_owned())
}

impl EntitySink for FakeSink {
    fn project(&self) -> &str {
        PROJECT
    }

    async fn project_timezone(&self) -> Result<String, CoreError> {
        let state = self.state.lock().unwrap();
        state.tz.clone().ok_or_else(|| CoreError::Api {
            message: "about op failed".into(),
            status: Some(500),
        })
    }

    async fn read_entities(&self, kind: EntityKind) -> Result<Vec<SinkEntity>, CoreError> {
        if self.state.lock().unwrap().failing_reads.contains(&kind) {
            return Err(CoreError::Api {
                message: format!("read of {kind} timed out"),
                status: Some(504),
            });
        }
        Ok(self.entities(kind))
    }

    async fn create(
        &self,
        kind: EntityKind,
        entities: &[SinkEntity],
    ) -> Result<Vec<SinkEntity>, CoreError> {
        let mut state = self.state.lock().unwrap();
        let call = {
            let calls = state.create_calls.entry(kind).or_insert(0);
            *calls += 1;
            *calls
        };
        if state.failing_creates.contains(&(kind, call)) {
            return Err(CoreError::Api {
                message: format!("commit add rejected ({kind} call {call})"),
                status: None,
            });
        }

        let mut created = Vec::new();
        for entity in entities {
            state.next_id += 1;
            let mut row = entity.to_add_row();
            row.insert(
                "id".into(),
                Value::reference(format!("p:{PROJECT}:r:r{}", state.next_id)),
            );
            row.insert(
                "mod".into(),
                Value::DateTime {
                    val: "2024-01-01T00:00:00Z".into(),
                    tz: Some("UTC".into()),
                },
            );
            state.rows.push(row.clone());
            created.extend(entity_from_row(row));
        }
        Ok(created)
    }

    async fn update(
        &self,
        _kind: EntityKind,
        updates: &[SinkUpdate],
    ) -> Result<Vec<SinkEntity>, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.update_calls += 1;
        let call = state.update_calls;
        if state.failing_updates.contains(&call) {
            return Err(CoreError::Api {
                message: format!("commit update rejected (call {call})"),
                status: None,
            });
        }
        let mut updated = Vec::new();
        for update in updates {
            let target = update.id.bare().to_owned();
            let row = state
                .rows
                .iter_mut()
                .find(|r| bare_of(r).as_deref() == Some(target.as_str()))
                .ok_or_else(|| CoreError::Api {
                    message: format!("unknown rec {target}"),
                    status: None,
                })?;
            for (name, value) in &update.changes {
                if *value == Value::Remove {
                    row.remove(name);
                } else {
                    row.insert(name.clone(), value.clone());
                }
            }
            updated.extend(entity_from_row(row.clone()));
        }
        Ok(updated)
    }

    async fn his_write(&self, id: &SinkId, samples: &[Sample]) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        state.his.push((id.clone(), samples.to_vec()));
        Ok(())
    }
}
