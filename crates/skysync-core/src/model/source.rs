// ── Source-side records ──
//
// Canonical views of FlightDeck sites and points. Built once at the
// ingestion boundary and read-only for the rest of a run.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::scalar::Scalar;
use crate::error::CoreError;

/// Equipment grouping key for points with no device binding.
pub const UNASSIGNED_EQUIP_KEY: &str = "unassigned";

/// Cross-references a previous run stored on a source point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoredRefs {
    pub point: Option<String>,
    pub site: Option<String>,
    pub equip: Option<String>,
}

/// Device info used to derive the owning equipment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceBinding {
    pub address: Option<String>,
    pub device_id: Option<String>,
    pub name: Option<String>,
}

impl DeviceBinding {
    fn part(value: Option<&String>) -> Option<&str> {
        value.map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

/// Identity of a point in FlightDeck; write-backs are keyed on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceKey {
    pub name: String,
    pub client: String,
    pub site: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcePoint {
    pub id: Option<i64>,
    pub name: String,
    pub site: String,
    pub client: String,
    pub markers: BTreeSet<String>,
    pub tags: BTreeMap<String, Scalar>,
    pub refs: StoredRefs,
    pub device: Option<DeviceBinding>,
    pub object_name: Option<String>,
    pub object_type: Option<String>,
    pub unit: Option<String>,
    pub collect_enabled: bool,
}

impl SourcePoint {
    pub fn key(&self) -> SourceKey {
        SourceKey {
            name: self.name.clone(),
            client: self.client.clone(),
            site: self.site.clone(),
        }
    }

    /// Equipment grouping key: `"{address}-{device_id}"`, or the
    /// unassigned bucket when the point has no device binding at all.
    ///
    /// A binding with only one half present is malformed.
    pub fn equipment_key(&self) -> Result<String, CoreError> {
        let Some(device) = &self.device else {
            return Ok(UNASSIGNED_EQUIP_KEY.to_owned());
        };

        match (
            DeviceBinding::part(device.address.as_ref()),
            DeviceBinding::part(device.device_id.as_ref()),
        ) {
            (Some(address), Some(id)) => Ok(format!("{address}-{id}")),
            (None, None) => Ok(UNASSIGNED_EQUIP_KEY.to_owned()),
            (Some(_), None) => Err(CoreError::InvalidDevice {
                point: self.name.clone(),
                reason: "device address without device id".into(),
            }),
            (None, Some(_)) => Err(CoreError::InvalidDevice {
                point: self.name.clone(),
                reason: "device id without device address".into(),
            }),
        }
    }

    /// Display name: the object-name override when it has content.
    pub fn display_name(&self) -> &str {
        self.object_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSite {
    pub name: String,
    pub client: Option<String>,
    pub display_name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub markers: BTreeSet<String>,
    pub tags: BTreeMap<String, Scalar>,
    pub stored_ref: Option<String>,
}

/// One page of source points.
#[derive(Debug, Clone)]
pub struct SourcePage {
    pub points: Vec<SourcePoint>,
    pub page: u32,
    pub pages: u32,
}

/// A single history sample from the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub value: f64,
}
