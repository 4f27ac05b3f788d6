//! Configuration for the skysync CLI.
//!
//! Settings come from, lowest precedence first: built-in defaults, an
//! optional `skysync.toml`, then environment variables (`FLIGHTDECK_*`,
//! `SKYSPARK_*`, `ACE_SKYSPARK_CLI_*`). A `.env` file is loaded into the
//! process environment first and never overrides variables already set.
//! Job files (see [`job`]) sit on top of this for per-run parameters.

pub mod job;

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, EnumString};
use thiserror::Error;

pub use job::{JobFile, JobFormat};

/// Default config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "skysync.toml";
/// Default env file.
pub const ENV_FILE: &str = ".env";

const MASK: &str = "***MASKED***";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required setting {field} (set {env})")]
    Missing { field: String, env: String },

    #[error("failed to load env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("unsupported job file format '{extension}' (use .yaml, .yml or .json)")]
    UnsupportedFormat { extension: String },

    #[error("{} already exists (use --force to overwrite)", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("failed to serialize: {0}")]
    Serialization(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Raw layer (what figment extracts) ───────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
struct RawFlightDeck {
    api_url: String,
    jwt: Option<String>,
    user: Option<String>,
    site: Option<String>,
    timeout: u64,
}

impl Default for RawFlightDeck {
    fn default() -> Self {
        Self {
            api_url: "https://flightdeck.aceiot.cloud/api".into(),
            jwt: None,
            user: None,
            site: None,
            timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
struct RawSkySpark {
    url: Option<String>,
    project: Option<String>,
    user: Option<String>,
    password: Option<String>,
    timeout: f64,
    max_retries: u32,
    pool_size: usize,
}

impl Default for RawSkySpark {
    fn default() -> Self {
        Self {
            url: None,
            project: None,
            user: None,
            password: None,
            timeout: 30.0,
            max_retries: 3,
            pool_size: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
struct RawApp {
    log_level: String,
    log_json: bool,
    batch_size: usize,
    max_concurrent: usize,
    dry_run: bool,
    page_size: u32,
    page_delay_ms: u64,
}

impl Default for RawApp {
    fn default() -> Self {
        Self {
            log_level: "INFO".into(),
            log_json: false,
            batch_size: 100,
            max_concurrent: 5,
            dry_run: false,
            page_size: 500,
            page_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct RawConfig {
    flightdeck: RawFlightDeck,
    skyspark: RawSkySpark,
    app: RawApp,
}

// ── Validated config ────────────────────────────────────────────────

/// Log verbosity as configured; maps onto tracing levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightDeckConfig {
    pub api_url: String,
    #[serde(serialize_with = "masked")]
    pub jwt: SecretString,
    pub user: Option<String>,
    /// Default site when a command is given none.
    pub site: Option<String>,
    #[serde(serialize_with = "seconds")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkySparkConfig {
    /// Server URL, always ending in `/api`.
    pub url: String,
    pub project: String,
    pub user: String,
    #[serde(serialize_with = "masked")]
    pub password: SecretString,
    #[serde(serialize_with = "seconds")]
    pub timeout: Duration,
    pub max_retries: u32,
    pub pool_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub log_level: LogLevel,
    pub log_json: bool,
    pub batch_size: usize,
    pub max_concurrent: usize,
    pub dry_run: bool,
    pub page_size: u32,
    #[serde(serialize_with = "seconds")]
    pub page_delay: Duration,
}

/// Complete, validated configuration. Serializes with secrets masked.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub flightdeck: FlightDeckConfig,
    pub skyspark: SkySparkConfig,
    pub app: AppConfig,
}

fn masked<S: Serializer>(_: &SecretString, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(MASK)
}

fn seconds<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

fn required(value: Option<String>, field: &str, env: &str) -> Result<String, ConfigError> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(invalid(field, "cannot be empty")),
        None => Err(ConfigError::Missing {
            field: field.into(),
            env: env.into(),
        }),
    }
}

/// Check scheme and append `/api` unless already present.
pub fn normalize_skyspark_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(invalid(
            "skyspark.url",
            "must start with http:// or https://",
        ));
    }
    url::Url::parse(trimmed).map_err(|e| invalid("skyspark.url", e.to_string()))?;

    let base = trimmed.trim_end_matches('/');
    Ok(if base.ends_with("/api") {
        base.to_owned()
    } else {
        format!("{base}/api")
    })
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let RawConfig {
            flightdeck: fd,
            skyspark: ss,
            app,
        } = raw;

        let flightdeck = FlightDeckConfig {
            api_url: fd.api_url.trim().trim_end_matches('/').to_owned(),
            jwt: SecretString::from(required(fd.jwt, "flightdeck.jwt", "FLIGHTDECK_JWT")?),
            user: fd.user,
            site: fd.site.filter(|s| !s.trim().is_empty()),
            timeout: Duration::from_secs(fd.timeout),
        };

        let url = required(ss.url, "skyspark.url", "SKYSPARK_URL")?;
        if !ss.timeout.is_finite() || ss.timeout <= 0.0 {
            return Err(invalid("skyspark.timeout", "must be a positive number of seconds"));
        }
        let skyspark = SkySparkConfig {
            url: normalize_skyspark_url(&url)?,
            project: required(ss.project, "skyspark.project", "SKYSPARK_PROJECT")?,
            user: required(ss.user, "skyspark.user", "SKYSPARK_USER")?,
            password: SecretString::from(
                ss.password
                    .ok_or_else(|| ConfigError::Missing {
                        field: "skyspark.password".into(),
                        env: "SKYSPARK_PASSWORD".into(),
                    })?,
            ),
            timeout: Duration::from_secs_f64(ss.timeout),
            max_retries: ss.max_retries,
            pool_size: ss.pool_size,
        };

        let log_level: LogLevel = app.log_level.trim().parse().map_err(|_| {
            invalid(
                "app.log_level",
                format!(
                    "'{}' is not one of DEBUG, INFO, WARNING, ERROR, CRITICAL",
                    app.log_level
                ),
            )
        })?;
        if app.batch_size == 0 {
            return Err(invalid("app.batch_size", "must be positive"));
        }
        if app.page_size == 0 {
            return Err(invalid("app.page_size", "must be positive"));
        }
        let app = AppConfig {
            log_level,
            log_json: app.log_json,
            batch_size: app.batch_size,
            max_concurrent: app.max_concurrent,
            dry_run: app.dry_run,
            page_size: app.page_size,
            page_delay: Duration::from_millis(app.page_delay_ms),
        };

        Ok(Self {
            flightdeck,
            skyspark,
            app,
        })
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load an env file into the process environment.
///
/// With `None`, a missing `./.env` is fine. An explicitly named file must
/// exist. Returns the path actually loaded.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match path {
        Some(path) => dotenvy::from_path(path)
            .map(|()| Some(path.to_path_buf()))
            .map_err(|source| ConfigError::EnvFile {
                path: path.to_path_buf(),
                source,
            }),
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => Ok(None),
            Err(source) => Err(ConfigError::EnvFile {
                path: PathBuf::from(ENV_FILE),
                source,
            }),
        },
    }
}

fn section_env(prefix: &'static str, section: &'static str) -> Env {
    Env::prefixed(prefix).map(move |key| {
        format!("{section}.{}", key.as_str().to_ascii_lowercase()).into()
    })
}

/// Defaults, then `config_file` (if it exists), then the environment.
pub fn figment(config_file: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RawConfig::default()))
        .merge(Toml::file(config_file))
        .merge(section_env("FLIGHTDECK_", "flightdeck"))
        .merge(section_env("SKYSPARK_", "skyspark"))
        .merge(section_env("ACE_SKYSPARK_CLI_", "app"))
}

impl Config {
    /// Extract and validate from a prepared figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let raw: RawConfig = figment.extract()?;
        raw.try_into()
    }

    /// Load the env file, then build config from `skysync.toml` and the
    /// environment.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        load_env_file(env_file)?;
        Self::from_figment(&figment(Path::new(CONFIG_FILE)))
    }

    /// JSON view with every secret replaced by a mask, for logging.
    pub fn masked(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

// ── .env template ───────────────────────────────────────────────────

pub const ENV_TEMPLATE: &str = "\
# FlightDeck
FLIGHTDECK_API_URL=https://flightdeck.aceiot.cloud/api
FLIGHTDECK_JWT=
# FLIGHTDECK_USER=
# FLIGHTDECK_SITE=
# FLIGHTDECK_TIMEOUT=30

# SkySpark
SKYSPARK_URL=https://skyspark.example.com
SKYSPARK_PROJECT=
SKYSPARK_USER=
SKYSPARK_PASSWORD=
# SKYSPARK_TIMEOUT=30

# skysync
ACE_SKYSPARK_CLI_LOG_LEVEL=INFO
ACE_SKYSPARK_CLI_LOG_JSON=false
ACE_SKYSPARK_CLI_BATCH_SIZE=100
# ACE_SKYSPARK_CLI_PAGE_SIZE=500
# ACE_SKYSPARK_CLI_PAGE_DELAY_MS=1000
ACE_SKYSPARK_CLI_DRY_RUN=false
";

/// Write [`ENV_TEMPLATE`] to `path`, refusing to clobber unless `force`.
pub fn write_env_template(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    std::fs::write(path, ENV_TEMPLATE).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn raw() -> RawConfig {
        let mut raw = RawConfig::default();
        raw.flightdeck.jwt = Some("  token  ".into());
        raw.skyspark.url = Some("https://sky.example.com/".into());
        raw.skyspark.project = Some("demo".into());
        raw.skyspark.user = Some("admin".into());
        raw.skyspark.password = Some("secret".into());
        raw
    }

    #[test]
    fn defaults_validate() {
        let config = Config::try_from(raw()).unwrap();
        assert_eq!(config.flightdeck.jwt.expose_secret(), "token");
        assert_eq!(config.flightdeck.timeout, Duration::from_secs(30));
        assert_eq!(config.skyspark.url, "https://sky.example.com/api");
        assert_eq!(config.app.log_level, LogLevel::Info);
        assert_eq!(config.app.batch_size, 100);
        assert_eq!(config.app.page_delay, Duration::from_secs(1));
    }

    #[test]
    fn skyspark_url_rules() {
        assert_eq!(
            normalize_skyspark_url("http://host:8080/api/").unwrap(),
            "http://host:8080/api"
        );
        assert!(normalize_skyspark_url("host:8080").is_err());
        assert!(normalize_skyspark_url("ftp://host").is_err());
    }

    #[test]
    fn blank_jwt_rejected() {
        let mut raw = raw();
        raw.flightdeck.jwt = Some("   ".into());
        assert!(matches!(
            Config::try_from(raw),
            Err(ConfigError::Validation { field, .. }) if field == "flightdeck.jwt"
        ));
    }

    #[test]
    fn missing_password_names_env_var() {
        let mut raw = raw();
        raw.skyspark.password = None;
        let err = Config::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("SKYSPARK_PASSWORD"));
    }

    #[test]
    fn log_level_is_case_insensitive_and_checked() {
        let mut raw = raw();
        raw.app.log_level = "warning".into();
        let config = Config::try_from(raw.clone()).unwrap();
        assert_eq!(config.app.log_level, LogLevel::Warning);
        assert_eq!(config.app.log_level.as_filter(), "warn");

        raw.app.log_level = "TRACE".into();
        assert!(Config::try_from(raw).is_err());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let mut raw = raw();
        raw.app.batch_size = 0;
        assert!(Config::try_from(raw).is_err());
    }

    #[test]
    fn masked_view_hides_secrets() {
        let config = Config::try_from(raw()).unwrap();
        let masked = config.masked();
        assert_eq!(masked["flightdeck"]["jwt"], MASK);
        assert_eq!(masked["skyspark"]["password"], MASK);
        assert_eq!(masked["skyspark"]["project"], "demo");
        assert!(!masked.to_string().contains("secret"));
    }
}
