// ── Reverse-sync recovery ──
//
// Rebuilds FlightDeck cross-references from what SkySpark already holds.
// Every point the engine writes carries its origin topic, which is enough
// to find the FlightDeck point again.

use serde::Serialize;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::batch::{BatchWriter, batches};
use crate::convert::RefWriteBack;
use crate::model::{EntityKind, SinkEntity, SourceKey};
use crate::ports::{EntitySink, PointSource};
use crate::reference::ORIGIN_TOPIC_TAG;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryResult {
    /// Sink points carrying an origin topic (after the site filter).
    pub points_found: usize,
    pub refs_updated: usize,
    pub points_skipped: usize,
    pub errors: Vec<String>,
}

impl RecoveryResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Split an origin topic into its FlightDeck key.
///
/// Topics are `client/site/point...`; the point segment may itself contain
/// slashes. The full topic is the FlightDeck point name.
pub fn parse_topic(topic: &str) -> Option<SourceKey> {
    let mut parts = topic.splitn(3, '/');
    let client = parts.next().filter(|s| !s.is_empty())?;
    let site = parts.next().filter(|s| !s.is_empty())?;
    parts.next().filter(|s| !s.is_empty())?;
    Some(SourceKey {
        name: topic.to_owned(),
        client: client.to_owned(),
        site: site.to_owned(),
    })
}

fn topic_of(entity: &SinkEntity) -> Option<&str> {
    entity.tags.get(ORIGIN_TOPIC_TAG)?.as_str()
}

pub struct RefRecovery<'a, S, K> {
    source: &'a S,
    sink: &'a K,
    batch_size: usize,
    span: Span,
}

impl<'a, S: PointSource, K: EntitySink> RefRecovery<'a, S, K> {
    pub fn new(source: &'a S, sink: &'a K, batch_size: usize, span: Span) -> Self {
        Self {
            source,
            sink,
            batch_size,
            span,
        }
    }

    pub async fn recover_refs(&self, site_filter: Option<&str>, dry_run: bool) -> RecoveryResult {
        async {
            let mut result = RecoveryResult::default();

            let points = match self.sink.read_entities(EntityKind::Point).await {
                Ok(points) => points,
                Err(e) => {
                    let msg = format!("Failed to read SkySpark points: {e}");
                    error!("{msg}");
                    result.errors.push(msg);
                    return result;
                }
            };

            let writer = BatchWriter::new(self.source, self.sink, self.batch_size, self.span.clone());
            let mut write_backs: Vec<RefWriteBack> = Vec::new();

            for entity in &points {
                let Some(topic) = topic_of(entity) else {
                    continue;
                };
                let key = parse_topic(topic);
                if let Some(filter) = site_filter {
                    if key.as_ref().is_none_or(|k| k.site != filter) {
                        continue;
                    }
                }
                result.points_found += 1;

                let Some(key) = key else {
                    debug!(%topic, "unparseable origin topic");
                    result.points_skipped += 1;
                    continue;
                };
                match writer.write_back_for(key, entity) {
                    Some(wb) => write_backs.push(wb),
                    None => result.points_skipped += 1,
                }
            }

            info!(
                found = result.points_found,
                recoverable = write_backs.len(),
                skipped = result.points_skipped,
                "collected references to recover"
            );

            if dry_run {
                result.refs_updated = write_backs.len();
                return result;
            }

            for batch in batches(&write_backs, self.batch_size) {
                match self.source.write_back(batch.items).await {
                    Ok(()) => {
                        debug!(batch = batch.number, of = batch.total, "references restored");
                        result.refs_updated += batch.items.len();
                    }
                    Err(e) => {
                        let msg = format!(
                            "Failed to write references for batch {}/{}: {e}",
                            batch.number, batch.total
                        );
                        warn!("{msg}");
                        result.errors.push(msg);
                    }
                }
            }
            result
        }
        .instrument(self.span.clone())
        .await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn topics_parse_into_keys() {
        let key = parse_topic("acme/hq/AHU-1/SAT");
        assert_eq!(
            key,
            Some(SourceKey {
                name: "acme/hq/AHU-1/SAT".into(),
                client: "acme".into(),
                site: "hq".into(),
            })
        );
    }

    #[test]
    fn malformed_topics_are_rejected() {
        for topic in ["", "acme", "acme/hq", "acme//ZN-T", "/hq/ZN-T", "acme/hq/"] {
            assert_eq!(parse_topic(topic), None, "{topic}");
        }
    }
}
