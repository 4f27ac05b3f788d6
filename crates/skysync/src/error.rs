//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use skysync_config::ConfigError;
use skysync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to {url}: {reason}")]
    #[diagnostic(
        code(skysync::connection_failed),
        help("Check that the server is reachable and the URL in your .env is correct.")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(skysync::auth_failed),
        help(
            "Verify FLIGHTDECK_JWT and the SKYSPARK_USER / SKYSPARK_PASSWORD pair.\n\
             Run: skysync version  (to see which servers are configured)"
        )
    )]
    AuthFailed { message: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(skysync::timeout),
        help("Raise FLIGHTDECK_TIMEOUT or SKYSPARK_TIMEOUT, or retry later.")
    )]
    Timeout,

    // ── Resources ────────────────────────────────────────────────────

    #[error("Site '{name}' not found")]
    #[diagnostic(
        code(skysync::site_not_found),
        help("Site names are case-sensitive and must match FlightDeck exactly.")
    )]
    SiteNotFound { name: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error: {message}")]
    #[diagnostic(code(skysync::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(skysync::validation))]
    Validation { field: String, reason: String },

    #[error("No site given")]
    #[diagnostic(
        code(skysync::no_site),
        help("Pass --site or set FLIGHTDECK_SITE in your .env file.")
    )]
    NoSite,

    #[error("Timezone fixes are not supported")]
    #[diagnostic(
        code(skysync::tz_fix_unsupported),
        help(
            "SkySpark does not allow changing tz on existing records.\n\
             Recreate the affected entities, or run without --fix to list them."
        )
    )]
    FixUnsupported,

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(skysync::config),
        help("Create a template with: skysync init")
    )]
    Config(#[from] ConfigError),

    // ── Run outcome ──────────────────────────────────────────────────

    #[error("{operation} finished with {count} error(s)")]
    #[diagnostic(
        code(skysync::partial_failure),
        help("Rerun the same command; completed batches are picked up where they left off.")
    )]
    Incomplete { operation: String, count: usize },

    #[error("Interrupted")]
    #[diagnostic(code(skysync::interrupted))]
    Interrupted,

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(skysync::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::NoSite | Self::FixUnsupported => exit_code::USAGE,
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Timeout => CliError::Timeout,
            CoreError::SiteNotFound { name } => CliError::SiteNotFound { name },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::InvalidDevice { point, reason } => CliError::Validation {
                field: format!("device of {point}"),
                reason,
            },
            CoreError::Unsupported { operation } => CliError::ApiError {
                message: format!("unsupported operation: {operation}"),
            },
            CoreError::Api { message, status } => CliError::ApiError {
                message: match status {
                    Some(code) => format!("{message} (HTTP {code})"),
                    None => message,
                },
            },
            CoreError::Internal(message) => CliError::ApiError { message },
        }
    }
}

impl From<skysync_api::Error> for CliError {
    fn from(err: skysync_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
