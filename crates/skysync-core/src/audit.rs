// ── Timezone audit ──
//
// SkySpark refuses tz edits on existing records, so a record written with
// the wrong zone stays wrong. This only reports; it never writes.

use serde::Serialize;
use tracing::{Instrument, Span, info};

use crate::error::CoreError;
use crate::model::{EntityKind, SinkEntity};
use crate::ports::EntitySink;

/// A record whose tz differs from the project's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimezoneMismatch {
    pub kind: EntityKind,
    pub id: String,
    pub dis: String,
    /// `None` when the record has no tz tag at all.
    pub tz: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimezoneReport {
    pub project_tz: String,
    pub checked: usize,
    pub mismatches: Vec<TimezoneMismatch>,
}

impl TimezoneReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

fn site_matches(site: &SinkEntity, filter: &str) -> bool {
    site.ref_name.as_deref() == Some(filter) || site.dis == filter
}

/// Compare every site, equip and point tz against the project timezone.
///
/// With `site_filter` (refName or dis of a site), only that site and the
/// records attached to it are checked.
pub async fn check_timezones<K: EntitySink>(
    sink: &K,
    site_filter: Option<&str>,
    span: Span,
) -> Result<TimezoneReport, CoreError> {
    async {
        let project_tz = sink.project_timezone().await?;
        let sites = sink.read_entities(EntityKind::Site).await?;
        let equipment = sink.read_entities(EntityKind::Equip).await?;
        let points = sink.read_entities(EntityKind::Point).await?;

        let site_ids: Option<Vec<&str>> = match site_filter {
            Some(filter) => {
                let ids: Vec<&str> = sites
                    .iter()
                    .filter(|s| site_matches(s, filter))
                    .filter_map(SinkEntity::bare_id)
                    .collect();
                if ids.is_empty() {
                    return Err(CoreError::SiteNotFound {
                        name: filter.to_owned(),
                    });
                }
                Some(ids)
            }
            None => None,
        };

        let in_scope = |entity: &SinkEntity| match &site_ids {
            None => true,
            Some(ids) => {
                let own = match entity.kind {
                    EntityKind::Site => entity.bare_id(),
                    EntityKind::Equip | EntityKind::Point => {
                        entity.site_ref.as_ref().map(|r| r.bare())
                    }
                };
                own.is_some_and(|id| ids.contains(&id))
            }
        };

        let mut report = TimezoneReport {
            project_tz: project_tz.clone(),
            ..TimezoneReport::default()
        };
        for entity in sites.iter().chain(&equipment).chain(&points) {
            if !in_scope(entity) {
                continue;
            }
            report.checked += 1;
            if entity.tz.as_deref() != Some(project_tz.as_str()) {
                report.mismatches.push(TimezoneMismatch {
                    kind: entity.kind,
                    id: entity.bare_id().unwrap_or_default().to_owned(),
                    dis: entity.dis.clone(),
                    tz: entity.tz.clone(),
                });
            }
        }

        info!(
            project_tz = %report.project_tz,
            checked = report.checked,
            mismatches = report.mismatches.len(),
            "timezone audit complete"
        );
        Ok(report)
    }
    .instrument(span)
    .await
}
