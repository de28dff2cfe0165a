use thiserror::Error;

/// Top-level error type for the `pairkit-api` crate.
///
/// Covers every failure mode of the pairing platform surface: transport,
/// HTTP status, envelope-level failures and payload decoding.
/// `pairkit-core` maps these into pairing error codes.
#[derive(Debug, Error)]
pub enum Error {
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

    // ── HTTP ────────────────────────────────────────────────────────
    /// Access code missing, expired or rejected.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Non-success HTTP status with a truncated body preview.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── Platform ────────────────────────────────────────────────────
    /// The `{code, result}` envelope came back without a usable result.
    #[error("Platform error (code {code}): {message}")]
    Platform { code: String, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the access code was rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Extract the platform status code, if available.
    pub fn platform_code(&self) -> Option<&str> {
        match self {
            Self::Platform { code, .. } => Some(code),
            _ => None,
        }
    }
}
