//! Config resolution for the CLI.
//!
//! Loads `skysync-config`, applies command-line overrides, and builds the
//! FlightDeck and SkySpark clients shared by every command.

use skysync_api::{FlightDeckClient, SkysparkClient, TransportConfig};
use skysync_config::{Config, LogLevel};
use skysync_core::SyncSettings;

use crate::cli::{GlobalOpts, LogLevelArg};
use crate::error::CliError;

/// Loaded config plus connected clients.
pub struct Session {
    pub config: Config,
    pub source: FlightDeckClient,
    pub sink: SkysparkClient,
}

impl Session {
    pub fn connect(config: Config) -> Result<Self, CliError> {
        let source = FlightDeckClient::from_token(
            &config.flightdeck.api_url,
            &config.flightdeck.jwt,
            &TransportConfig::new(config.flightdeck.timeout),
        )?;
        let sink = SkysparkClient::new(
            &config.skyspark.url,
            config.skyspark.project.clone(),
            config.skyspark.user.clone(),
            config.skyspark.password.clone(),
            &TransportConfig::new(config.skyspark.timeout),
        )?;
        Ok(Self {
            config,
            source,
            sink,
        })
    }

    /// Engine settings, with an optional batch-size override.
    pub fn settings(&self, batch_size: Option<usize>) -> SyncSettings {
        SyncSettings {
            batch_size: batch_size.unwrap_or(self.config.app.batch_size),
            page_size: self.config.app.page_size,
            page_delay: self.config.app.page_delay,
        }
    }

    /// The explicit site, else `FLIGHTDECK_SITE`.
    pub fn site(&self, explicit: Option<String>) -> Result<String, CliError> {
        explicit
            .or_else(|| self.config.flightdeck.site.clone())
            .filter(|s| !s.trim().is_empty())
            .ok_or(CliError::NoSite)
    }

    /// A flag set anywhere turns dry-run on; `ACE_SKYSPARK_CLI_DRY_RUN` too.
    pub fn dry_run(&self, requested: bool) -> bool {
        requested || self.config.app.dry_run
    }
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(Config::load(global.env_file.as_deref())?)
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Warning => LogLevel::Warning,
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Critical => LogLevel::Critical,
        }
    }
}

/// Convert a clap count into `usize`.
pub fn count(value: Option<u64>, field: &str) -> Result<Option<usize>, CliError> {
    value
        .map(|v| {
            usize::try_from(v).map_err(|_| CliError::Validation {
                field: field.into(),
                reason: format!("{v} is too large"),
            })
        })
        .transpose()
}
