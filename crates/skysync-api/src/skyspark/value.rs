// Haystack JSON values
//
// SkySpark encodes tag values as Haystack JSON v4: scalars that JSON can
// express natively travel bare (strings, booleans), everything else is an
// object discriminated by `_kind`. `Value` is the decoded sum type; the
// wire shape only exists inside this module.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single Haystack tag value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Wire", into = "Wire")]
pub enum Value {
    Marker,
    /// Tag removal sentinel, only meaningful in commit `update` rows.
    Remove,
    Na,
    Number {
        value: f64,
        unit: Option<String>,
    },
    Str(String),
    Bool(bool),
    Ref {
        val: String,
        dis: Option<String>,
    },
    Date(String),
    Time(String),
    DateTime {
        val: String,
        tz: Option<String>,
    },
    Uri(String),
    Coord {
        lat: f64,
        lng: f64,
    },
    Symbol(String),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    pub fn number(value: f64) -> Self {
        Self::Number { value, unit: None }
    }

    /// A ref value with no display string.
    pub fn reference(id: impl Into<String>) -> Self {
        Self::Ref {
            val: id.into(),
            dis: None,
        }
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, Self::Marker)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Raw `val` of a ref, sigil included if the server sent one.
    pub fn as_ref_val(&self) -> Option<&str> {
        match self {
            Self::Ref { val, .. } => Some(val),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number { value, .. } => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marker => f.write_str("\u{2713}"),
            Self::Remove => f.write_str("remove"),
            Self::Na => f.write_str("NA"),
            Self::Number { value, unit } => match unit {
                Some(unit) => write!(f, "{value}{unit}"),
                None => write!(f, "{value}"),
            },
            Self::Str(s) | Self::Date(s) | Self::Time(s) | Self::Uri(s) | Self::Symbol(s) => {
                f.write_str(s)
            }
            Self::Bool(b) => write!(f, "{b}"),
            Self::Ref { val, .. } => write!(f, "@{}", val.trim_start_matches('@')),
            Self::DateTime { val, tz } => match tz {
                Some(tz) => write!(f, "{val} {tz}"),
                None => f.write_str(val),
            },
            Self::Coord { lat, lng } => write!(f, "C({lat},{lng})"),
            Self::List(items) => write!(f, "[{} items]", items.len()),
            Self::Dict(map) => write!(f, "{{{} tags}}", map.len()),
        }
    }
}

// ── Wire shape ──────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Wire {
    Kinded(Kinded),
    Str(String),
    Bool(bool),
    Num(f64),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "_kind", rename_all = "camelCase")]
enum Kinded {
    Marker,
    Remove,
    Na,
    Number {
        val: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Ref {
        val: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dis: Option<String>,
    },
    Date {
        val: String,
    },
    Time {
        val: String,
    },
    DateTime {
        val: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tz: Option<String>,
    },
    Uri {
        val: String,
    },
    Coord {
        lat: f64,
        lng: f64,
    },
    Symbol {
        val: String,
    },
}

impl From<Wire> for Value {
    fn from(wire: Wire) -> Self {
        match wire {
            Wire::Kinded(k) => match k {
                Kinded::Marker => Self::Marker,
                Kinded::Remove => Self::Remove,
                Kinded::Na => Self::Na,
                Kinded::Number { val, unit } => Self::Number { value: val, unit },
                Kinded::Ref { val, dis } => Self::Ref { val, dis },
                Kinded::Date { val } => Self::Date(val),
                Kinded::Time { val } => Self::Time(val),
                Kinded::DateTime { val, tz } => Self::DateTime { val, tz },
                Kinded::Uri { val } => Self::Uri(val),
                Kinded::Coord { lat, lng } => Self::Coord { lat, lng },
                Kinded::Symbol { val } => Self::Symbol(val),
            },
            Wire::Str(s) => Self::Str(s),
            Wire::Bool(b) => Self::Bool(b),
            Wire::Num(n) => Self::number(n),
            Wire::List(items) => Self::List(items),
            Wire::Dict(map) => Self::Dict(map),
        }
    }
}

impl From<Value> for Wire {
    fn from(value: Value) -> Self {
        match value {
            Value::Marker => Self::Kinded(Kinded::Marker),
            Value::Remove => Self::Kinded(Kinded::Remove),
            Value::Na => Self::Kinded(Kinded::Na),
            Value::Number { value, unit } => Self::Kinded(Kinded::Number { val: value, unit }),
            Value::Str(s) => Self::Str(s),
            Value::Bool(b) => Self::Bool(b),
            Value::Ref { val, dis } => Self::Kinded(Kinded::Ref { val, dis }),
            Value::Date(val) => Self::Kinded(Kinded::Date { val }),
            Value::Time(val) => Self::Kinded(Kinded::Time { val }),
            Value::DateTime { val, tz } => Self::Kinded(Kinded::DateTime { val, tz }),
            Value::Uri(val) => Self::Kinded(Kinded::Uri { val }),
            Value::Coord { lat, lng } => Self::Kinded(Kinded::Coord { lat, lng }),
            Value::Symbol(val) => Self::Kinded(Kinded::Symbol { val }),
            Value::List(items) => Self::List(items),
            Value::Dict(map) => Self::Dict(map),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_kinded_values() {
        let v: Value = serde_json::from_value(json!({"_kind": "marker"})).unwrap();
        assert!(v.is_marker());

        let v: Value =
            serde_json::from_value(json!({"_kind": "number", "val": 72.5, "unit": "°F"})).unwrap();
        assert_eq!(
            v,
            Value::Number {
                value: 72.5,
                unit: Some("°F".into())
            }
        );

        let v: Value =
            serde_json::from_value(json!({"_kind": "ref", "val": "p:demo:r:abc", "dis": "AHU-1"}))
                .unwrap();
        assert_eq!(v.as_ref_val(), Some("p:demo:r:abc"));

        let v: Value = serde_json::from_value(
            json!({"_kind": "dateTime", "val": "2024-01-01T00:00:00-05:00", "tz": "New_York"}),
        )
        .unwrap();
        assert!(matches!(v, Value::DateTime { tz: Some(ref tz), .. } if tz == "New_York"));
    }

    #[test]
    fn decodes_bare_json_scalars() {
        let v: Value = serde_json::from_value(json!("hello")).unwrap();
        assert_eq!(v.as_str(), Some("hello"));
        let v: Value = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(v, Value::Bool(true));
        let v: Value = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(v.as_f64(), Some(3.0));
    }

    #[test]
    fn plain_object_without_kind_is_a_dict() {
        let v: Value = serde_json::from_value(json!({"a": "b"})).unwrap();
        assert!(matches!(v, Value::Dict(ref m) if m.get("a") == Some(&Value::str("b"))));
    }

    #[test]
    fn encodes_to_haystack_json() {
        assert_eq!(
            serde_json::to_value(Value::Marker).unwrap(),
            json!({"_kind": "marker"})
        );
        assert_eq!(
            serde_json::to_value(Value::reference("abc")).unwrap(),
            json!({"_kind": "ref", "val": "abc"})
        );
        assert_eq!(serde_json::to_value(Value::str("x")).unwrap(), json!("x"));
        assert_eq!(
            serde_json::to_value(Value::number(1.5)).unwrap(),
            json!({"_kind": "number", "val": 1.5})
        );
    }
}
