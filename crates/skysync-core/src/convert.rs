// ── Wire → domain conversion ──
//
// The only place FlightDeck JSON and SkySpark rows are looked at. Every
// record entering the engine passes through here first.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use skysync_api::flightdeck::{FdPoint, FdPointWrite, FdSample, FdSite};
use skysync_api::skyspark::{Row, Value};
use tracing::debug;

use crate::model::{
    DeviceBinding, EntityKind, FunctionMarker, PointFacet, Sample, Scalar, SinkEntity, SinkId,
    SourcePoint, SourceSite, StoredRefs, ValueKind,
};
use crate::reference::{EQUIP_REF_TAG, POINT_REF_TAG, SITE_REF_TAG};
use crate::tags::normalize;

// ── FlightDeck → source records ──────────────────────────────────────

/// Markers become payload-less entries, kv tags keep their payload.
fn raw_tags(
    markers: &[String],
    kv: &BTreeMap<String, serde_json::Value>,
) -> BTreeMap<String, Option<Scalar>> {
    let mut tags: BTreeMap<String, Option<Scalar>> =
        markers.iter().map(|m| (m.clone(), None)).collect();
    for (name, value) in kv {
        tags.insert(name.clone(), Scalar::from_json(value));
    }
    tags
}

fn stored_tag(kv: &BTreeMap<String, serde_json::Value>, name: &str) -> Option<String> {
    kv.get(name)
        .and_then(Scalar::from_json)
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<FdPoint> for SourcePoint {
    fn from(fd: FdPoint) -> Self {
        let (markers, mut tags) = normalize(&raw_tags(&fd.marker_tags, &fd.kv_tags));

        let refs = StoredRefs {
            point: stored_tag(&fd.kv_tags, POINT_REF_TAG),
            site: stored_tag(&fd.kv_tags, SITE_REF_TAG),
            equip: stored_tag(&fd.kv_tags, EQUIP_REF_TAG),
        };

        let bacnet = fd.bacnet_data.unwrap_or_default();
        let unit = tags
            .remove("unit")
            .map(|u| u.to_string())
            .or(bacnet.object_units.clone());
        let unit = non_blank(unit);

        // Names are `client/site/point`; fill gaps from the name itself.
        let mut segments = fd.name.splitn(3, '/');
        let name_client = segments.next().map(str::to_owned);
        let name_site = segments.next().map(str::to_owned);

        let device = if bacnet.device_address.is_some() || bacnet.device_id.is_some() {
            Some(DeviceBinding {
                address: bacnet.device_address,
                device_id: bacnet.device_id,
                name: non_blank(bacnet.device_name),
            })
        } else {
            None
        };

        Self {
            id: fd.id,
            site: fd.site.or(name_site).unwrap_or_default(),
            client: fd.client.or(name_client).unwrap_or_default(),
            name: fd.name,
            markers,
            tags,
            refs,
            device,
            object_name: non_blank(bacnet.object_name),
            object_type: bacnet.object_type,
            unit,
            collect_enabled: fd.collect_enabled,
        }
    }
}

impl From<FdSite> for SourceSite {
    fn from(fd: FdSite) -> Self {
        let (markers, tags) = normalize(&raw_tags(&fd.marker_tags, &fd.kv_tags));
        Self {
            stored_ref: stored_tag(&fd.kv_tags, POINT_REF_TAG),
            name: fd.name,
            client: fd.client,
            display_name: non_blank(fd.nice_name),
            address: non_blank(fd.address),
            latitude: fd.latitude,
            longitude: fd.longitude,
            markers,
            tags,
        }
    }
}

/// A timeseries sample, or `None` if its time or value does not parse.
pub fn sample_from_wire(fd: &FdSample) -> Option<Sample> {
    let time = DateTime::parse_from_rfc3339(&fd.time)
        .ok()?
        .with_timezone(&Utc);
    let value = fd.value.as_f64()?;
    Some(Sample { time, value })
}

// ── SkySpark rows → sink records ─────────────────────────────────────

fn take_str(row: &mut Row, name: &str) -> Option<String> {
    match row.remove(name) {
        Some(Value::Str(s)) => Some(s),
        Some(other) => {
            row.insert(name.to_owned(), other);
            None
        }
        None => None,
    }
}

fn take_ref(row: &mut Row, name: &str) -> Option<SinkId> {
    match row.remove(name) {
        Some(Value::Ref { val, .. }) => Some(SinkId::new(val)),
        Some(other) => {
            row.insert(name.to_owned(), other);
            None
        }
        None => None,
    }
}

/// Convert a read or commit-echo row. Rows without an id or a kind
/// marker are not entities this engine manages.
pub fn entity_from_row(mut row: Row) -> Option<SinkEntity> {
    let Some(id) = take_ref(&mut row, "id") else {
        debug!("skipping row without id");
        return None;
    };

    let kind = [EntityKind::Point, EntityKind::Equip, EntityKind::Site]
        .into_iter()
        .find(|k| row.get(k.marker()).is_some_and(Value::is_marker))?;
    for k in [EntityKind::Point, EntityKind::Equip, EntityKind::Site] {
        row.remove(k.marker());
    }

    let ref_name = take_str(&mut row, "refName");
    let dis = take_str(&mut row, "dis")
        .or_else(|| ref_name.clone())
        .unwrap_or_else(|| id.to_string());

    let mut entity = SinkEntity::new(kind, dis);
    entity.id = Some(id);
    entity.ref_name = ref_name;
    entity.site_ref = take_ref(&mut row, "siteRef");
    entity.equip_ref = take_ref(&mut row, "equipRef");
    entity.tz = take_str(&mut row, "tz");
    entity.mod_token = row.remove("mod");

    if kind == EntityKind::Point {
        let value_kind = take_str(&mut row, "kind").and_then(|k| k.parse::<ValueKind>().ok());
        let unit = take_str(&mut row, "unit");
        let his = row.remove("his").is_some_and(|v| v.is_marker());
        entity.point = Some(PointFacet {
            kind: value_kind,
            unit,
            his,
            function: None,
        });
    }

    for (name, value) in row {
        if value.is_marker() {
            entity.markers.insert(name);
        } else {
            entity.tags.insert(name, value);
        }
    }

    if let Some(point) = entity.point.as_mut() {
        point.function = FunctionMarker::find_in(&entity.markers);
    }

    Some(entity)
}

// ── Write-back → FlightDeck ──────────────────────────────────────────

/// Cross-references to merge onto one FlightDeck point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefWriteBack {
    pub key: crate::model::SourceKey,
    pub point_ref: String,
    pub site_ref: Option<String>,
    pub equip_ref: Option<String>,
}

impl From<&RefWriteBack> for FdPointWrite {
    fn from(wb: &RefWriteBack) -> Self {
        let mut kv_tags = BTreeMap::from([(POINT_REF_TAG.to_owned(), wb.point_ref.clone())]);
        if let Some(site) = &wb.site_ref {
            kv_tags.insert(SITE_REF_TAG.to_owned(), site.clone());
        }
        if let Some(equip) = &wb.equip_ref {
            kv_tags.insert(EQUIP_REF_TAG.to_owned(), equip.clone());
        }
        Self {
            name: wb.key.name.clone(),
            client: wb.key.client.clone(),
            site: wb.key.site.clone(),
            kv_tags,
            marker_tags: Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn fd_point(value: serde_json::Value) -> FdPoint {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn flightdeck_point_to_source_point() {
        let point: SourcePoint = fd_point(json!({
            "id": 101,
            "name": "acme/hq/ZN-T",
            "site": "hq",
            "client": "acme",
            "marker_tags": ["temp", "zone", "sensor"],
            "kv_tags": {
                "haystackRef": "p:demo:r:abc",
                "haystackSiteRef": "p:demo:r:s1",
                "unit": "°F",
                "floor": "2",
                "note": ""
            },
            "bacnet_data": {
                "device_address": "10.0.0.5",
                "device_id": "1001",
                "device_name": "VAV-1",
                "object_type": "analogInput",
                "object_name": "Zone Temp"
            },
            "collect_enabled": true
        }))
        .into();

        assert_eq!(point.refs.point.as_deref(), Some("p:demo:r:abc"));
        assert_eq!(point.refs.site.as_deref(), Some("p:demo:r:s1"));
        assert_eq!(point.refs.equip, None);
        assert_eq!(point.unit.as_deref(), Some("°F"));
        assert!(point.markers.contains("sensor"));
        assert!(point.markers.contains("note"));
        assert!(!point.tags.contains_key("haystackRef"));
        assert!(!point.tags.contains_key("unit"));
        assert_eq!(point.tags["floor"], Scalar::Str("2".into()));
        assert_eq!(point.equipment_key().unwrap(), "10.0.0.5-1001");
        assert_eq!(point.display_name(), "Zone Temp");
    }

    #[test]
    fn client_and_site_fall_back_to_name_segments() {
        let point: SourcePoint = fd_point(json!({"name": "acme/hq/AHU-1/SAT"})).into();
        assert_eq!(point.client, "acme");
        assert_eq!(point.site, "hq");
        assert!(point.device.is_none());
    }

    #[test]
    fn sink_row_to_point_entity() {
        let row: Row = serde_json::from_value(json!({
            "id": {"_kind": "ref", "val": "@p:demo:r:abc", "dis": "Zone Temp"},
            "point": {"_kind": "marker"},
            "his": {"_kind": "marker"},
            "cmd": {"_kind": "marker"},
            "temp": {"_kind": "marker"},
            "dis": "Zone Temp",
            "refName": "ace-point-101",
            "siteRef": {"_kind": "ref", "val": "p:demo:r:s1"},
            "equipRef": {"_kind": "ref", "val": "p:demo:r:e1"},
            "kind": "Number",
            "unit": "°F",
            "tz": "New_York",
            "aceTopic": "acme/hq/ZN-T",
            "mod": {"_kind": "dateTime", "val": "2024-01-01T00:00:00Z", "tz": "UTC"}
        }))
        .unwrap();

        let entity = entity_from_row(row).unwrap();
        assert_eq!(entity.kind, EntityKind::Point);
        assert_eq!(entity.bare_id(), Some("abc"));
        assert_eq!(entity.site_ref.as_ref().map(SinkId::bare), Some("s1"));
        assert_eq!(entity.tz.as_deref(), Some("New_York"));
        assert!(entity.mod_token.is_some());
        assert!(entity.markers.contains("temp"));
        assert_eq!(entity.tags["aceTopic"], Value::str("acme/hq/ZN-T"));

        let facet = entity.point.unwrap();
        assert_eq!(facet.kind, Some(ValueKind::Number));
        assert!(facet.his);
        assert_eq!(facet.function, Some(FunctionMarker::Cmd));
    }

    #[test]
    fn rows_without_id_or_kind_are_skipped() {
        let no_id: Row = serde_json::from_value(json!({"site": {"_kind": "marker"}})).unwrap();
        assert!(entity_from_row(no_id).is_none());

        let no_kind: Row =
            serde_json::from_value(json!({"id": {"_kind": "ref", "val": "x"}})).unwrap();
        assert!(entity_from_row(no_kind).is_none());
    }

    #[test]
    fn write_back_payload() {
        let wb = RefWriteBack {
            key: crate::model::SourceKey {
                name: "acme/hq/ZN-T".into(),
                client: "acme".into(),
                site: "hq".into(),
            },
            point_ref: "p:demo:r:abc".into(),
            site_ref: Some("p:demo:r:s1".into()),
            equip_ref: None,
        };
        let write = FdPointWrite::from(&wb);
        assert_eq!(write.kv_tags.len(), 2);
        assert_eq!(write.kv_tags["haystackSiteRef"], "p:demo:r:s1");
        assert!(write.marker_tags.is_empty());
    }

    #[test]
    fn sample_parsing() {
        let fd: FdSample = serde_json::from_value(json!({
            "value": "71.5", "time": "2024-01-01T00:05:00Z"
        }))
        .unwrap();
        let sample = sample_from_wire(&fd).unwrap();
        assert!((sample.value - 71.5).abs() < f64::EPSILON);

        let bad: FdSample =
            serde_json::from_value(json!({"value": "n/a", "time": "2024-01-01T00:05:00Z"}))
                .unwrap();
        assert!(sample_from_wire(&bad).is_none());
    }
}
