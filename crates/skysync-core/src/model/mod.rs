// ── Domain model ──
//
// Canonical records for both systems. Wire shapes are converted into these
// at the boundary (see `convert`) and never reach the engine.

pub mod scalar;
pub mod sink;
pub mod source;

pub use scalar::Scalar;
pub use sink::{EntityKind, FunctionMarker, PointFacet, SinkEntity, SinkId, SinkUpdate, ValueKind};
pub use source::{
    DeviceBinding, Sample, SourceKey, SourcePage, SourcePoint, SourceSite, StoredRefs,
    UNASSIGNED_EQUIP_KEY,
};
