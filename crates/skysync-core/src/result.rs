// ── Sync result ──

use std::fmt;

use serde::Serialize;
use tracing::error;

/// Created/updated/skipped tally for one entity class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped
    }
}

/// Outcome of one reconciliation run.
///
/// Always returned, even when the run aborts early; `errors` holds what
/// went wrong in the order it happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub site: String,
    pub dry_run: bool,
    pub sites: Counts,
    pub equipment: Counts,
    pub points: Counts,
    pub errors: Vec<String>,
    /// A fatal step (timezone, site) failed and the run stopped there.
    pub aborted: bool,
}

impl SyncResult {
    pub fn new(site: impl Into<String>, dry_run: bool) -> Self {
        Self {
            site: site.into(),
            dry_run,
            ..Self::default()
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        error!("{error}");
        self.errors.push(error);
    }

    /// Record a fatal error and mark the run aborted.
    pub fn abort(&mut self, error: impl Into<String>) {
        self.add_error(error);
        self.aborted = true;
    }

    pub fn is_success(&self) -> bool {
        !self.aborted && self.errors.is_empty()
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "Sync of site '{}'{mode}", self.site)?;
        for (label, counts) in [
            ("Sites", self.sites),
            ("Equipment", self.equipment),
            ("Points", self.points),
        ] {
            writeln!(
                f,
                "  {label:<10} created {:>5}  updated {:>5}  skipped {:>5}",
                counts.created, counts.updated, counts.skipped
            )?;
        }
        if self.aborted {
            writeln!(f, "  run aborted")?;
        }
        write!(f, "  errors: {}", self.errors.len())
    }
}
