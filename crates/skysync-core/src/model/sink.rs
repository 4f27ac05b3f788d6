// ── Sink-side records ──
//
// SinkEntity is the one shape Sites, Equipment and Points take inside the
// engine. Structural tags (kind markers, refs, function marker, point
// facet) live in typed fields; everything else stays in `markers`/`tags`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use skysync_api::skyspark::{Row, Value};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::reference;

// ── SinkId ──────────────────────────────────────────────────────────

/// A SkySpark record id, sigil stripped.
///
/// Keeps the id in the form the server sent (`p:demo:r:abc` or `abc`) so
/// refs written back to SkySpark resolve; `bare()` is the matching key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SinkId(String);

impl SinkId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim_start_matches('@').to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing id segment, used to index and compare records.
    pub fn bare(&self) -> &str {
        reference::decode_str(&self.0)
    }

    /// Ids handed out in dry runs; never sent to the sink.
    pub fn placeholder(label: impl fmt::Display) -> Self {
        Self(format!("dry-run-{label}"))
    }

    pub fn to_value(&self) -> Value {
        Value::reference(self.0.clone())
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Enums ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Site,
    Equip,
    Point,
}

impl EntityKind {
    /// The Haystack marker tag naming this kind.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Equip => "equip",
            Self::Point => "point",
        }
    }
}

/// The role marker every point carries exactly one of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FunctionMarker {
    Sensor,
    Cmd,
    Sp,
    Synthetic,
}

impl FunctionMarker {
    /// First function marker found in `markers`, in declaration order.
    pub fn find_in(markers: &BTreeSet<String>) -> Option<Self> {
        Self::iter().find(|f| markers.contains(&f.to_string()))
    }

    pub fn is_function_marker(name: &str) -> bool {
        name.parse::<Self>().is_ok()
    }
}

/// Haystack `kind` of a point's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
pub enum ValueKind {
    Number,
    Bool,
    Str,
}

impl ValueKind {
    /// Infer from a BACnet object type: binary objects are booleans.
    pub fn from_object_type(object_type: Option<&str>) -> Self {
        match object_type {
            Some(t) if t.to_ascii_lowercase().starts_with("binary") => Self::Bool,
            _ => Self::Number,
        }
    }
}

// ── SinkEntity ──────────────────────────────────────────────────────

/// Point-only fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointFacet {
    pub kind: Option<ValueKind>,
    pub unit: Option<String>,
    pub his: bool,
    pub function: Option<FunctionMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinkEntity {
    pub id: Option<SinkId>,
    pub kind: EntityKind,
    pub dis: String,
    pub ref_name: Option<String>,
    pub site_ref: Option<SinkId>,
    pub equip_ref: Option<SinkId>,
    pub tz: Option<String>,
    pub markers: BTreeSet<String>,
    pub tags: BTreeMap<String, Value>,
    pub point: Option<PointFacet>,
    #[serde(skip)]
    pub mod_token: Option<Value>,
}

impl SinkEntity {
    /// Empty entity of the given kind.
    pub fn new(kind: EntityKind, dis: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            dis: dis.into(),
            ref_name: None,
            site_ref: None,
            equip_ref: None,
            tz: None,
            markers: BTreeSet::new(),
            tags: BTreeMap::new(),
            point: (kind == EntityKind::Point).then(|| PointFacet {
                kind: None,
                unit: None,
                his: false,
                function: None,
            }),
            mod_token: None,
        }
    }

    pub fn bare_id(&self) -> Option<&str> {
        self.id.as_ref().map(SinkId::bare)
    }

    /// Full commit row, without id or mod (for `commit add`).
    pub fn to_add_row(&self) -> Row {
        let mut row = Row::new();
        row.insert(self.kind.marker().to_owned(), Value::Marker);
        row.insert("dis".to_owned(), Value::str(&self.dis));
        if let Some(ref_name) = &self.ref_name {
            row.insert("refName".to_owned(), Value::str(ref_name));
        }
        if let Some(site_ref) = &self.site_ref {
            row.insert("siteRef".to_owned(), site_ref.to_value());
        }
        if let Some(equip_ref) = &self.equip_ref {
            row.insert("equipRef".to_owned(), equip_ref.to_value());
        }
        if let Some(tz) = &self.tz {
            row.insert("tz".to_owned(), Value::str(tz));
        }
        for marker in &self.markers {
            row.insert(marker.clone(), Value::Marker);
        }
        for (name, value) in &self.tags {
            row.insert(name.clone(), value.clone());
        }
        if let Some(point) = &self.point {
            if let Some(kind) = point.kind {
                row.insert("kind".to_owned(), Value::str(kind.to_string()));
            }
            if let Some(unit) = &point.unit {
                row.insert("unit".to_owned(), Value::str(unit));
            }
            if point.his {
                row.insert("his".to_owned(), Value::Marker);
            }
            if let Some(function) = point.function {
                row.insert(function.to_string(), Value::Marker);
            }
        }
        row
    }

    /// Tags that change going from `existing` to `self`, as a commit
    /// `update` body (without id/mod). Empty when nothing changed.
    ///
    /// Tags present only on `existing` are left alone, except function
    /// markers other than the desired one and a dropped `his`, which are
    /// removed explicitly.
    pub fn diff_row(&self, existing: &SinkEntity) -> Row {
        let desired = self.to_add_row();
        let current = existing.to_add_row();

        let removals: Vec<String> = if self.kind == EntityKind::Point {
            current
                .keys()
                .filter(|name| !desired.contains_key(*name))
                .filter(|name| FunctionMarker::is_function_marker(name) || *name == "his")
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        let mut row: Row = desired
            .into_iter()
            .filter(|(name, value)| current.get(name) != Some(value))
            .collect();
        for name in removals {
            row.insert(name, Value::Remove);
        }
        row
    }
}

/// An update ready to commit: target id, lock token, changed tags.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkUpdate {
    pub id: SinkId,
    pub mod_token: Option<Value>,
    pub changes: Row,
}

impl SinkUpdate {
    /// `None` if `desired` does not differ from `existing`.
    pub fn between(desired: &SinkEntity, existing: &SinkEntity) -> Option<Self> {
        let id = existing.id.clone()?;
        let changes = desired.diff_row(existing);
        if changes.is_empty() {
            return None;
        }
        Some(Self {
            id,
            mod_token: existing.mod_token.clone(),
            changes,
        })
    }

    pub fn to_row(&self) -> Row {
        let mut row = self.changes.clone();
        row.insert("id".to_owned(), self.id.to_value());
        if let Some(token) = &self.mod_token {
            row.insert("mod".to_owned(), token.clone());
        }
        row
    }
}
