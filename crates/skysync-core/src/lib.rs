//! Reconciliation engine between `skysync-api` and the `skysync` CLI.
//!
//! Mirrors a FlightDeck site's point inventory into SkySpark and stores
//! the resulting SkySpark ids back on the FlightDeck points, so the next
//! run updates instead of duplicating:
//!
//! - **[`Reconciler`]**: one sync run, timezone → site → equipment →
//!   points, returning a [`SyncResult`] that is never an `Err`.
//! - **[`BatchWriter`]**: sequential chunked sink writes with a
//!   best-effort reference write-back after every chunk.
//! - **[`RefRecovery`]**: rebuilds lost FlightDeck references from the
//!   origin topic SkySpark points carry.
//! - **[`HistoryWriter`]** and [`check_timezones`]: history backfill and
//!   a read-only timezone audit.
//! - **Ports** ([`PointSource`], [`EntitySink`]): what the engine needs
//!   from each system, implemented for the HTTP clients in `adapters`.
//!
//! Wire shapes never reach the engine; [`convert`] turns them into the
//! canonical [`model`] types at the boundary.

mod adapters;
pub mod audit;
pub mod batch;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod history;
pub mod model;
pub mod ports;
pub mod reconcile;
pub mod recovery;
pub mod reference;
pub mod result;
pub mod tags;

// ── Primary re-exports ──────────────────────────────────────────────
pub use audit::{TimezoneMismatch, TimezoneReport, check_timezones};
pub use batch::{BatchOutcome, BatchWriter, Batches, DEFAULT_BATCH_SIZE, batches};
pub use convert::RefWriteBack;
pub use error::CoreError;
pub use fetch::{DEFAULT_PAGE_DELAY, DEFAULT_PAGE_SIZE, SinkFetcher, SourceFetcher};
pub use history::{DEFAULT_CHUNK_SIZE, HistoryRequest, HistoryResult, HistoryWriter, parse_bound};
pub use ports::{EntitySink, PointSource};
pub use reconcile::{Reconciler, SyncRequest, SyncSettings};
pub use recovery::{RecoveryResult, RefRecovery};
pub use result::{Counts, SyncResult};

pub use model::{
    EntityKind, FunctionMarker, Sample, Scalar, SinkEntity, SinkId, SourceKey, SourcePoint,
    SourceSite,
};
