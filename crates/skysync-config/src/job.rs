//! Job files: saved per-command parameters in YAML or JSON.
//!
//! A job file may hold any subset of the four sections. Values from the
//! command line override the file, and the file overrides the
//! environment.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::ConfigError;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncJob {
    pub site: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub sync_all: bool,
    #[serde(default)]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncRefsJob {
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WriteHistoryJob {
    pub site: String,
    /// RFC 3339 or `YYYY-MM-DD`.
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckTimezonesJob {
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub fix: bool,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct JobFile {
    #[serde(default)]
    pub sync: Option<SyncJob>,
    #[serde(default)]
    pub sync_refs: Option<SyncRefsJob>,
    #[serde(default)]
    pub write_history: Option<WriteHistoryJob>,
    #[serde(default)]
    pub check_timezones: Option<CheckTimezonesJob>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum JobFormat {
    #[default]
    Yaml,
    Json,
}

impl JobFormat {
    /// Format implied by a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat { extension }),
        }
    }
}

fn positive(value: Option<usize>, field: &str) -> Result<(), ConfigError> {
    if value == Some(0) {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be positive".into(),
        });
    }
    Ok(())
}

impl JobFile {
    pub fn parse(text: &str, format: JobFormat, origin: &Path) -> Result<Self, ConfigError> {
        let parsed: Result<Self, String> = match format {
            JobFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            JobFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        };
        let job = parsed.map_err(|reason| ConfigError::Parse {
            path: origin.to_path_buf(),
            reason,
        })?;
        job.validate()?;
        Ok(job)
    }

    /// Read a job file; the format follows the extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let format = JobFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, format, path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(sync) = &self.sync {
            positive(sync.limit, "sync.limit")?;
            positive(sync.batch_size, "sync.batch_size")?;
        }
        if let Some(history) = &self.write_history {
            positive(history.limit, "write_history.limit")?;
            positive(Some(history.chunk_size), "write_history.chunk_size")?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sync.is_none()
            && self.sync_refs.is_none()
            && self.write_history.is_none()
            && self.check_timezones.is_none()
    }

    pub fn render(&self, format: JobFormat) -> Result<String, ConfigError> {
        match format {
            JobFormat::Yaml => {
                serde_yaml::to_string(self).map_err(|e| ConfigError::Serialization(e.to_string()))
            }
            JobFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::Serialization(e.to_string())),
        }
    }

    /// A job file with every section filled with placeholder values.
    pub fn template() -> Self {
        Self {
            sync: Some(SyncJob {
                site: "my-site-name".into(),
                dry_run: false,
                limit: None,
                sync_all: false,
                batch_size: None,
            }),
            sync_refs: Some(SyncRefsJob::default()),
            write_history: Some(WriteHistoryJob {
                site: "my-site-name".into(),
                start: "2025-11-01T00:00:00Z".into(),
                end: "2025-11-01T23:59:59Z".into(),
                limit: None,
                chunk_size: DEFAULT_CHUNK_SIZE,
                dry_run: false,
            }),
            check_timezones: Some(CheckTimezonesJob::default()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse_yaml(text: &str) -> Result<JobFile, ConfigError> {
        JobFile::parse(text, JobFormat::Yaml, Path::new("job.yaml"))
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let job = parse_yaml(
            "write_history:\n  site: hq\n  start: 2025-11-01\n  end: 2025-11-02\n",
        )
        .unwrap();
        let history = job.write_history.unwrap();
        assert_eq!(history.chunk_size, 1000);
        assert!(!history.dry_run);
        assert!(job.sync.is_none());
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = parse_yaml("sync:\n  site: hq\n  limit: 0\n").unwrap_err();
        assert!(err.to_string().contains("sync.limit"));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = parse_yaml(
            "write_history:\n  site: hq\n  start: a\n  end: b\n  chunk_size: 0\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn sync_requires_site() {
        assert!(matches!(
            parse_yaml("sync:\n  dry_run: true\n"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn template_renders_in_both_formats() {
        let template = JobFile::template();
        for format in [JobFormat::Yaml, JobFormat::Json] {
            let text = template.render(format).unwrap();
            let back = JobFile::parse(&text, format, Path::new("t")).unwrap();
            assert_eq!(back, template);
        }
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(JobFormat::from_path(Path::new("a.YML")).unwrap(), JobFormat::Yaml);
        assert_eq!(JobFormat::from_path(Path::new("a.json")).unwrap(), JobFormat::Json);
        assert!(JobFormat::from_path(Path::new("a.toml")).is_err());
    }
}
