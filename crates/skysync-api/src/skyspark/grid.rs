// Haystack JSON grids
//
// Every SkySpark op request and response body is a grid: grid-level meta,
// column definitions, and rows of name → value. Null cells are dropped on
// decode so a row only holds tags that are actually present.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use super::value::Value;

/// One grid row (a Haystack dict).
pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Col {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    #[serde(rename = "_kind", default = "grid_kind")]
    kind: String,
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,
    #[serde(default)]
    pub cols: Vec<Col>,
    #[serde(default, deserialize_with = "rows_without_nulls")]
    pub rows: Vec<Row>,
}

fn grid_kind() -> String {
    "grid".into()
}

fn rows_without_nulls<'de, D>(deserializer: D) -> Result<Vec<Row>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<BTreeMap<String, Option<Value>>> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|row| row.into_iter().filter_map(|(k, v)| Some((k, v?))).collect())
        .collect())
}

impl Grid {
    /// Build a request grid. Columns are the union of all row keys.
    pub fn from_rows(meta: BTreeMap<String, Value>, rows: Vec<Row>) -> Self {
        let names: BTreeSet<&String> = rows.iter().flat_map(BTreeMap::keys).collect();
        let cols = names
            .into_iter()
            .map(|name| Col { name: name.clone() })
            .collect();

        let mut meta = meta;
        meta.entry("ver".into()).or_insert_with(|| Value::str("3.0"));

        Self {
            kind: grid_kind(),
            meta,
            cols,
            rows,
        }
    }

    /// `Some((dis, trace))` if this is an error grid.
    pub fn error(&self) -> Option<(String, Option<String>)> {
        if !self.meta.get("err").is_some_and(Value::is_marker) {
            return None;
        }
        let dis = self
            .meta
            .get("dis")
            .and_then(Value::as_str)
            .unwrap_or("unknown SkySpark error")
            .to_owned();
        let trace = self
            .meta
            .get("errTrace")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Some((dis, trace))
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_drops_null_cells() {
        let grid: Grid = serde_json::from_value(json!({
            "_kind": "grid",
            "meta": {"ver": "3.0"},
            "cols": [{"name": "id"}, {"name": "dis"}],
            "rows": [
                {"id": {"_kind": "ref", "val": "a"}, "dis": null},
                {"id": {"_kind": "ref", "val": "b"}, "dis": "Bee"}
            ]
        }))
        .unwrap();

        assert_eq!(grid.rows.len(), 2);
        assert!(!grid.rows[0].contains_key("dis"));
        assert_eq!(grid.rows[1].get("dis"), Some(&Value::str("Bee")));
        assert!(grid.error().is_none());
    }

    #[test]
    fn detects_error_grid() {
        let grid: Grid = serde_json::from_value(json!({
            "_kind": "grid",
            "meta": {"ver": "3.0", "err": {"_kind": "marker"}, "dis": "sys::ParseErr: bad filter", "errTrace": "trace..."},
            "cols": [{"name": "empty"}],
            "rows": []
        }))
        .unwrap();

        let (dis, trace) = grid.error().unwrap();
        assert_eq!(dis, "sys::ParseErr: bad filter");
        assert_eq!(trace.as_deref(), Some("trace..."));
    }

    #[test]
    fn request_grid_collects_columns() {
        let mut a = Row::new();
        a.insert("dis".into(), Value::str("A"));
        let mut b = Row::new();
        b.insert("site".into(), Value::Marker);

        let mut meta = BTreeMap::new();
        meta.insert("commit".into(), Value::str("add"));
        let grid = Grid::from_rows(meta, vec![a, b]);

        let names: Vec<&str> = grid.cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["dis", "site"]);
        assert_eq!(grid.meta.get("ver"), Some(&Value::str("3.0")));

        let body = serde_json::to_value(&grid).unwrap();
        assert_eq!(body["_kind"], "grid");
        assert_eq!(body["meta"]["commit"], "add");
    }
}
