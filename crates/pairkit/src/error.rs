//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use pairkit_config::ConfigError;
use pairkit_core::{CoreError, ErrorCode};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the pairing platform at {url}")]
    #[diagnostic(
        code(pairkit::connection_failed),
        help(
            "Check network access to the platform.\n\
             URL: {url}\n\
             Use --insecure (-k) or ca_cert in your profile for private certificates."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Platform request timed out")]
    #[diagnostic(
        code(pairkit::timeout),
        help("Increase the request timeout with --timeout or request_timeout in your profile.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Access code rejected: {message}")]
    #[diagnostic(
        code(pairkit::auth_failed),
        help(
            "Verify the SDK access code for profile '{profile}'.\n\
             Run: pairkit config init, or set PAIRKIT_ACCESS_CODE."
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No {secret} configured for profile '{profile}'")]
    #[diagnostic(
        code(pairkit::missing_secret),
        help(
            "Pass it on the command line, store it with: pairkit config init\n\
             or set PAIRKIT_WIFI_PASSWORD."
        )
    )]
    MissingSecret { secret: String, profile: String },

    #[error("No home configured for profile '{profile}'")]
    #[diagnostic(
        code(pairkit::no_home),
        help("Pass --home-id, set PAIRKIT_HOME_ID, or pass an API-supplied --token.")
    )]
    NoHome { profile: String },

    // ── Platform ─────────────────────────────────────────────────────
    #[error("Platform error ({code}): {message}")]
    #[diagnostic(code(pairkit::platform_error))]
    Platform { code: String, message: String },

    #[error("Could not load the supported product catalog: {reason}")]
    #[diagnostic(
        code(pairkit::catalog_unavailable),
        help("Pairing cannot start until the catalog loads. Run: pairkit -v catalog")
    )]
    CatalogUnavailable { reason: String },

    // ── Pairing ──────────────────────────────────────────────────────
    #[error("Pairing failed: {code}")]
    #[diagnostic(code(pairkit::pairing_failed))]
    PairingFailed { code: ErrorCode },

    #[error("A pairing attempt is already running ({code})")]
    #[diagnostic(code(pairkit::busy))]
    Busy { code: ErrorCode },

    #[error("No device paired before the timeout")]
    #[diagnostic(
        code(pairkit::no_device),
        help("Put the device into pairing mode and retry, or raise --timeout.")
    )]
    NoDevicePaired,

    #[error("Pairing session closed unexpectedly")]
    #[diagnostic(code(pairkit::session_closed))]
    SessionClosed,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pairkit::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(pairkit::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: pairkit config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(pairkit::config), help("Check the file reported by: pairkit config path"))]
    Config { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Prompt failed: {0}")]
    #[diagnostic(code(pairkit::prompt))]
    Prompt(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::MissingSecret { .. } | Self::NoHome { .. } => {
                exit_code::AUTH
            }
            Self::ProfileNotFound { .. } | Self::NoDevicePaired => exit_code::NOT_FOUND,
            Self::Busy { .. } => exit_code::CONFLICT,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Unauthorized { message } => Self::AuthFailed {
                profile: "current".into(),
                message,
            },
            CoreError::Timeout => Self::Timeout,
            CoreError::Platform { code, message } => Self::Platform { code, message },
            CoreError::MalformedResponse { message } => Self::Platform {
                code: "malformed".into(),
                message,
            },
            CoreError::CatalogUnavailable { reason } => Self::CatalogUnavailable { reason },
            CoreError::InvalidArgument { message } => Self::Validation {
                field: "timing".into(),
                reason: message,
            },
            CoreError::Rejected { code } => from_error_code(code),
            CoreError::SessionClosed => Self::SessionClosed,
            CoreError::Config { message } | CoreError::Internal(message) => {
                Self::Config { message }
            }
        }
    }
}

/// CLI error for a pairing outcome code reported by the session.
pub fn from_error_code(code: ErrorCode) -> CliError {
    match code {
        ErrorCode::ProcessingPairingApMode
        | ErrorCode::ProcessingPairingEzMode
        | ErrorCode::ProcessingPairingQrMode => CliError::Busy { code },
        ErrorCode::NotFoundPairingDevice => CliError::NoDevicePaired,
        _ => CliError::PairingFailed { code },
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::MissingSecret { secret, profile } => {
                Self::MissingSecret { secret, profile }
            }
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
