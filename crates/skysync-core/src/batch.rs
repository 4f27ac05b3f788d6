// ── Batched writes ──
//
// Creates and updates go to SkySpark in fixed-size chunks, strictly one
// after another. After each chunk lands, its cross-references are merged
// back onto the FlightDeck points before the next chunk starts, so a run
// that dies midway leaves every written chunk resumable.

use tracing::{Instrument, Span, debug, error, info, warn};

use crate::convert::RefWriteBack;
use crate::model::{EntityKind, SinkEntity, SinkUpdate, SourceKey};
use crate::ports::{EntitySink, PointSource};
use crate::reference;

pub const DEFAULT_BATCH_SIZE: usize = 100;

// ── Chunking ────────────────────────────────────────────────────────

/// One chunk of a larger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a, T> {
    /// 1-based position, for logging.
    pub number: usize,
    pub total: usize,
    pub items: &'a [T],
}

/// Lazy chunk iterator. A clone resumes from the same position.
#[derive(Debug)]
pub struct Batches<'a, T> {
    items: &'a [T],
    size: usize,
    next: usize,
}

/// Chunk `items` into batches of at most `size` (a zero size means 1).
pub fn batches<T>(items: &[T], size: usize) -> Batches<'_, T> {
    Batches {
        items,
        size: size.max(1),
        next: 0,
    }
}

impl<T> Clone for Batches<'_, T> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<T> Batches<'_, T> {
    /// Start over from the first chunk.
    pub fn rewind(&mut self) {
        self.next = 0;
    }

    pub fn total(&self) -> usize {
        self.items.len().div_ceil(self.size)
    }
}

impl<'a, T> Iterator for Batches<'a, T> {
    type Item = Batch<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next * self.size;
        if start >= self.items.len() {
            return None;
        }
        let end = (start + self.size).min(self.items.len());
        self.next += 1;
        Some(Batch {
            number: self.next,
            total: self.total(),
            items: &self.items[start..end],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl<T> ExactSizeIterator for Batches<'_, T> {}

// ── Pending writes ──────────────────────────────────────────────────

/// A record to create, with the source point it mirrors (if any).
#[derive(Debug, Clone)]
pub struct PendingCreate {
    pub entity: SinkEntity,
    pub source: Option<SourceKey>,
}

/// A record to update. `entity` is the desired end state, used to build
/// the write-back once the update lands.
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub update: SinkUpdate,
    pub entity: SinkEntity,
    pub source: Option<SourceKey>,
}

/// Tally of one `create_batch`/`update_batch` call.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
    /// Records as the sink stored them, across all successful chunks.
    pub written: Vec<SinkEntity>,
    pub errors: Vec<String>,
}

// ── Writer ──────────────────────────────────────────────────────────

pub struct BatchWriter<'a, S, K> {
    source: &'a S,
    sink: &'a K,
    batch_size: usize,
    span: Span,
}

impl<'a, S: PointSource, K: EntitySink> BatchWriter<'a, S, K> {
    pub fn new(source: &'a S, sink: &'a K, batch_size: usize, span: Span) -> Self {
        Self {
            source,
            sink,
            batch_size: batch_size.max(1),
            span,
        }
    }

    pub async fn create_batch(&self, kind: EntityKind, writes: &[PendingCreate]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for batch in batches(writes, self.batch_size) {
            let records: Vec<SinkEntity> = batch.items.iter().map(|w| w.entity.clone()).collect();
            let result = self
                .sink
                .create(kind, &records)
                .instrument(self.span.clone())
                .await;

            match result {
                Ok(created) => {
                    info!(parent: &self.span, %kind, batch = batch.number, of = batch.total, count = created.len(), "created batch");
                    outcome.succeeded += batch.items.len();

                    let pairs = match_created(batch.items, &created);
                    let write_backs: Vec<RefWriteBack> = pairs
                        .iter()
                        .filter_map(|(pending, stored)| {
                            let key = pending.source.clone()?;
                            self.write_back_for(key, stored)
                        })
                        .collect();
                    self.persist_refs(&write_backs).await;
                    outcome.written.extend(created);
                }
                Err(e) => {
                    let msg = format!(
                        "Failed to create {kind} batch {}/{} ({} records): {e}",
                        batch.number,
                        batch.total,
                        batch.items.len()
                    );
                    error!(parent: &self.span, "{msg}");
                    outcome.failed += batch.items.len();
                    outcome.errors.push(msg);
                }
            }
        }
        outcome
    }

    pub async fn update_batch(&self, kind: EntityKind, writes: &[PendingUpdate]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for batch in batches(writes, self.batch_size) {
            let updates: Vec<SinkUpdate> = batch.items.iter().map(|w| w.update.clone()).collect();
            let result = self
                .sink
                .update(kind, &updates)
                .instrument(self.span.clone())
                .await;

            match result {
                Ok(updated) => {
                    info!(parent: &self.span, %kind, batch = batch.number, of = batch.total, count = batch.items.len(), "updated batch");
                    outcome.succeeded += batch.items.len();

                    let write_backs: Vec<RefWriteBack> = batch
                        .items
                        .iter()
                        .filter_map(|w| self.write_back_for(w.source.clone()?, &w.entity))
                        .collect();
                    self.persist_refs(&write_backs).await;
                    outcome.written.extend(updated);
                }
                Err(e) => {
                    let msg = format!(
                        "Failed to update {kind} batch {}/{} ({} records): {e}",
                        batch.number,
                        batch.total,
                        batch.items.len()
                    );
                    error!(parent: &self.span, "{msg}");
                    outcome.failed += batch.items.len();
                    outcome.errors.push(msg);
                }
            }
        }
        outcome
    }

    /// Merge cross-references onto source points, chunked like the sink
    /// writes. Failures are logged only: the sink already holds the data
    /// and `sync-refs-from-skyspark` can rebuild the references.
    pub async fn persist_refs(&self, write_backs: &[RefWriteBack]) -> usize {
        let mut persisted = 0;
        for batch in batches(write_backs, self.batch_size) {
            match self
                .source
                .write_back(batch.items)
                .instrument(self.span.clone())
                .await
            {
                Ok(()) => {
                    debug!(parent: &self.span, count = batch.items.len(), "persisted references");
                    persisted += batch.items.len();
                }
                Err(e) => {
                    warn!(
                        parent: &self.span,
                        count = batch.items.len(),
                        error = %e,
                        "reference write-back failed; sink records are intact"
                    );
                }
            }
        }
        persisted
    }

    /// Reference tokens for a stored record, or `None` if it has no id.
    pub fn write_back_for(&self, key: SourceKey, stored: &SinkEntity) -> Option<RefWriteBack> {
        let project = self.sink.project();
        let id = stored.bare_id()?;
        Some(RefWriteBack {
            key,
            point_ref: reference::encode(project, id),
            site_ref: stored
                .site_ref
                .as_ref()
                .map(|r| reference::encode(project, r.bare())),
            equip_ref: stored
                .equip_ref
                .as_ref()
                .map(|r| reference::encode(project, r.bare())),
        })
    }
}

/// Pair pending creates with the records the sink echoed back.
///
/// SkySpark echoes rows in request order, so equal lengths pair by
/// position; otherwise pair by refName, using each stored record once.
fn match_created<'p, 'c>(
    pending: &'p [PendingCreate],
    created: &'c [SinkEntity],
) -> Vec<(&'p PendingCreate, &'c SinkEntity)> {
    if pending.len() == created.len() {
        return pending.iter().zip(created).collect();
    }

    let mut unclaimed: Vec<&'c SinkEntity> = created.iter().collect();
    pending
        .iter()
        .filter_map(|p| {
            let ref_name = p.entity.ref_name.as_deref()?;
            let at = unclaimed
                .iter()
                .position(|c| c.ref_name.as_deref() == Some(ref_name))?;
            Some((p, unclaimed.remove(at)))
        })
        .collect()
}
