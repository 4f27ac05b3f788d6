// ── Tag scalars ──
//
// The payload of a key-value tag once unwrapped from whichever wire
// format carried it. FlightDeck tags arrive as loose JSON, SkySpark tags
// as Haystack values; both land here.

use std::fmt;

use serde::Serialize;
use skysync_api::skyspark::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Number(f64),
    Bool(bool),
    Date(String),
    Time(String),
    DateTime(String),
    Ref(String),
    Uri(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// True for the empty string, which tags treat like a marker.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Str(s) if s.trim().is_empty())
    }

    /// Decode a FlightDeck tag value. JSON null means "no payload".
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            other => Some(Self::Str(other.to_string())),
        }
    }

    /// Encode for a SkySpark commit row.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Str(s) => Value::Str(s.clone()),
            Self::Number(n) => Value::number(*n),
            Self::Bool(b) => Value::Bool(*b),
            Self::Date(s) => Value::Date(s.clone()),
            Self::Time(s) => Value::Time(s.clone()),
            Self::DateTime(s) => Value::DateTime {
                val: s.clone(),
                tz: None,
            },
            Self::Ref(s) => Value::reference(s.clone()),
            Self::Uri(s) => Value::Uri(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s)
            | Self::Date(s)
            | Self::Time(s)
            | Self::DateTime(s)
            | Self::Ref(s)
            | Self::Uri(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}
