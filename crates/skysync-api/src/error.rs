use thiserror::Error;

/// Top-level error type for the `skysync-api` crate.
///
/// Covers both API surfaces: the FlightDeck REST API and the SkySpark
/// Haystack API. `skysync-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected (expired JWT, wrong SkySpark password, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── FlightDeck ──────────────────────────────────────────────────
    /// Non-success response from the FlightDeck API.
    #[error("FlightDeck API error (HTTP {status}): {message}")]
    FlightDeck { status: u16, message: String },

    // ── SkySpark ────────────────────────────────────────────────────
    /// Non-success HTTP response from SkySpark.
    #[error("SkySpark API error (HTTP {status}): {message}")]
    SkySpark { status: u16, message: String },

    /// SkySpark returned an error grid (`meta.err` marker) with HTTP 200.
    #[error("SkySpark error grid: {dis}")]
    Grid { dis: String, trace: Option<String> },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the credentials were rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::FlightDeck { status, .. } | Self::SkySpark { status, .. } => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::FlightDeck { status: 404, .. } | Self::SkySpark { status: 404, .. } => true,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::FlightDeck { status, .. } | Self::SkySpark { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// First `max` characters of a response body, for error messages.
pub(crate) fn preview(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
