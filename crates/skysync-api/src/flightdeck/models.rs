// FlightDeck wire types
//
// Shapes as returned by the FlightDeck REST API. Fields the sync never
// reads are left out; everything optional on the server is optional here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One page of a paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FdSite {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub nice_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub marker_tags: Vec<String>,
    #[serde(default)]
    pub kv_tags: BTreeMap<String, serde_json::Value>,
}

/// BACnet discovery data attached to a point.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BacnetData {
    #[serde(default)]
    pub device_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default)]
    pub object_units: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FdPoint {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub marker_tags: Vec<String>,
    #[serde(default)]
    pub kv_tags: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub bacnet_data: Option<BacnetData>,
    #[serde(default)]
    pub collect_enabled: bool,
    #[serde(default)]
    pub point_type: Option<String>,
}

/// Body entry for `PUT points`. Keyed server-side by (name, client, site).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FdPointWrite {
    pub name: String,
    pub client: String,
    pub site: String,
    pub kv_tags: BTreeMap<String, String>,
    pub marker_tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PointsBody<'a> {
    pub points: &'a [FdPointWrite],
}

/// A sample value; FlightDeck serves numerics as numbers or strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl SampleValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FdSample {
    #[serde(default)]
    pub name: Option<String>,
    pub value: SampleValue,
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Timeseries {
    #[serde(default)]
    pub point_samples: Vec<FdSample>,
}

/// Device ids come back as strings or integers depending on the driver.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
