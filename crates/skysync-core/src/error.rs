// ── Core error types ──
//
// Domain errors from skysync-core. Consumers never see raw HTTP or JSON
// failures; the `From<skysync_api::Error>` impl translates them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Site not found: {name}")]
    SiteNotFound { name: String },

    #[error("Invalid device binding on point {point}: {reason}")]
    InvalidDevice { point: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<skysync_api::Error> for CoreError {
    fn from(err: skysync_api::Error) -> Self {
        match err {
            skysync_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            skysync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            skysync_api::Error::InvalidUrl(e) => CoreError::ValidationFailed {
                message: format!("Invalid URL: {e}"),
            },
            skysync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            skysync_api::Error::FlightDeck { status, message }
            | skysync_api::Error::SkySpark { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            skysync_api::Error::Grid { dis, trace: _ } => CoreError::Api {
                message: dis,
                status: None,
            },
            skysync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
