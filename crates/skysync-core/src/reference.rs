// ── Cross-system references ──
//
// A FlightDeck point remembers its SkySpark record as `p:<project>:r:<id>`
// in its kv tags. That token is the idempotency key for every run.

use skysync_api::skyspark::Value;

use crate::model::Scalar;

/// FlightDeck kv tag naming the SkySpark point.
pub const POINT_REF_TAG: &str = "haystackRef";
/// FlightDeck kv tag naming the SkySpark site.
pub const SITE_REF_TAG: &str = "haystackSiteRef";
/// FlightDeck kv tag naming the SkySpark equipment.
pub const EQUIP_REF_TAG: &str = "haystackEquipRef";

/// Bookkeeping tags; never copied onto SkySpark records.
pub const BOOKKEEPING_TAGS: [&str; 3] = [POINT_REF_TAG, SITE_REF_TAG, EQUIP_REF_TAG];

/// SkySpark tag recording the FlightDeck point a record came from.
pub const ORIGIN_TOPIC_TAG: &str = "aceTopic";

/// Trailing id of a `p:<project>:r:<id>` (or `p:<project>:<id>`) token.
///
/// A leading `@` is ignored. Anything else comes back unchanged.
pub fn decode_str(raw: &str) -> &str {
    let token = raw.trim_start_matches('@');
    let parts: Vec<&str> = token.split(':').collect();
    match parts.as_slice() {
        ["p", project, "r", id] | ["p", project, id]
            if !project.is_empty() && !id.is_empty() =>
        {
            *id
        }
        _ => raw,
    }
}

/// Decode a ref or string tag value. Other kinds carry no reference.
pub fn decode(value: &Value) -> Option<String> {
    match value {
        Value::Ref { val, .. } | Value::Str(val) => Some(decode_str(val).to_owned()),
        _ => None,
    }
}

pub fn encode(project: &str, id: &str) -> String {
    format!("p:{project}:r:{id}")
}

pub fn is_marker(value: &Value) -> bool {
    value.is_marker()
}

/// Payload of a key-value tag. Markers and structural values have none.
pub fn unwrap(value: &Value) -> Option<Scalar> {
    match value {
        Value::Number { value, .. } => Some(Scalar::Number(*value)),
        Value::Str(s) => Some(Scalar::Str(s.clone())),
        Value::Bool(b) => Some(Scalar::Bool(*b)),
        Value::Date(s) => Some(Scalar::Date(s.clone())),
        Value::Time(s) => Some(Scalar::Time(s.clone())),
        Value::DateTime { val, .. } => Some(Scalar::DateTime(val.clone())),
        Value::Ref { val, .. } => Some(Scalar::Ref(val.clone())),
        Value::Uri(s) => Some(Scalar::Uri(s.clone())),
        Value::Marker
        | Value::Remove
        | Value::Na
        | Value::Coord { .. }
        | Value::Symbol(_)
        | Value::List(_)
        | Value::Dict(_) => None,
    }
}
