// ── Tag normalization ──
//
// FlightDeck hands back tags as name → optional payload. A missing or
// empty payload means the tag is a marker.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::Scalar;
use crate::reference::BOOKKEEPING_TAGS;

/// Split tags into (markers, key-value tags), dropping the
/// cross-reference bookkeeping keys.
pub fn normalize<'a, I>(tags: I) -> (BTreeSet<String>, BTreeMap<String, Scalar>)
where
    I: IntoIterator<Item = (&'a String, &'a Option<Scalar>)>,
{
    let mut markers = BTreeSet::new();
    let mut kv = BTreeMap::new();

    for (name, value) in tags {
        if BOOKKEEPING_TAGS.contains(&name.as_str()) {
            continue;
        }
        match value {
            Some(scalar) if !scalar.is_blank() => {
                kv.insert(name.clone(), scalar.clone());
            }
            _ => {
                markers.insert(name.clone());
            }
        }
    }

    (markers, kv)
}
