// ── Core error types ──
//
// Errors a caller sees from the pairing facade itself. Pairing outcomes
// (device not found, token expired, ...) are not errors here; they travel
// as `ErrorCode`s inside failure records.

use thiserror::Error;

use crate::model::ErrorCode;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach pairing platform at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Access code rejected: {message}")]
    Unauthorized { message: String },

    #[error("Pairing platform request timed out")]
    Timeout,

    // ── Platform errors ──────────────────────────────────────────────
    #[error("Platform error (code {code}): {message}")]
    Platform { code: String, message: String },

    #[error("Malformed platform response: {message}")]
    MalformedResponse { message: String },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Product catalog unavailable: {reason}")]
    CatalogUnavailable { reason: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Pairing request rejected: {code}")]
    Rejected { code: ErrorCode },

    #[error("Pairing session is shut down")]
    SessionClosed,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The pairing error code a caller would have seen through the
    /// failure callback for this error, if any.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::CatalogUnavailable { .. } => Some(ErrorCode::InternalServerError),
            Self::Rejected { code } => Some(*code),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<pairkit_api::Error> for CoreError {
    fn from(err: pairkit_api::Error) -> Self {
        match err {
            pairkit_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            pairkit_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            pairkit_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            pairkit_api::Error::Unauthorized { message } => CoreError::Unauthorized { message },
            pairkit_api::Error::Http { status, body } => CoreError::Platform {
                code: status.to_string(),
                message: body,
            },
            pairkit_api::Error::Platform { code, message } => {
                CoreError::Platform { code, message }
            }
            pairkit_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
        }
    }
}
