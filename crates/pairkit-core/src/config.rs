// ── Session configuration ──
//
// Describes where the pairing platform lives and how a session behaves.
// Core never reads config files; the CLI builds a `SessionConfig` and
// hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Production pairing platform.
pub const DEFAULT_PLATFORM_URL: &str = "https://api.pairkit.dev/openapi/";
/// Staging platform selected by debug builds of client apps.
pub const DEBUG_PLATFORM_URL: &str = "https://api.dev.pairkit.dev/openapi/";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Only meant for local platform mocks.
    DangerAcceptInvalid,
}

/// Configuration for one pairing session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pairing platform base URL.
    pub platform_url: Url,
    /// Opaque credential sent on every platform request.
    pub access_code: Option<SecretString>,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Default overall pairing timeout in seconds.
    pub pairing_timeout_secs: u32,
    /// Seconds before the deadline at which the radio stack is stopped.
    pub timeout_margin_secs: u32,
    /// Default timeout for status-only checks.
    pub check_timeout_secs: u32,
    /// Delay between the terminal outcome and the completion callback.
    pub completion_grace: Duration,
}

impl SessionConfig {
    pub const DEFAULT_PAIRING_TIMEOUT_SECS: u32 = 120;
    pub const DEFAULT_CHECK_TIMEOUT_SECS: u32 = 30;
    /// QR pairing always runs with this fixed timeout.
    pub const QR_TIMEOUT_SECS: u32 = 100;

    pub fn new(platform_url: Url) -> Self {
        Self {
            platform_url,
            access_code: None,
            tls: TlsVerification::default(),
            request_timeout: Duration::from_secs(30),
            pairing_timeout_secs: Self::DEFAULT_PAIRING_TIMEOUT_SECS,
            timeout_margin_secs: 0,
            check_timeout_secs: Self::DEFAULT_CHECK_TIMEOUT_SECS,
            completion_grace: Duration::from_millis(500),
        }
    }

    #[must_use]
    pub fn with_access_code(mut self, code: SecretString) -> Self {
        self.access_code = Some(code);
        self
    }
}
