// ── Collaborator seams ──
//
// The session talks to three outside parties: the pairing cloud, the
// local radio stack and the app's login session. Each is a trait object
// so hosts and tests can plug in their own.

use std::time::Duration;

use async_trait::async_trait;
use pairkit_api::{PlatformClient, TlsMode, TransportConfig};
use secrecy::SecretString;
use tracing::debug;

use crate::config::{SessionConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{PairingBatchResult, RadioMode};

/// The pairing platform.
#[async_trait]
pub trait PairingCloud: Send + Sync {
    /// Supported product ids.
    async fn product_ids(&self) -> Result<Vec<String>, CoreError>;

    /// Issue a pairing token for a home. May legitimately be empty.
    async fn issue_token(&self, home_id: &str) -> Result<String, CoreError>;

    /// One status poll for `token` since `start_time_millis`.
    async fn pairing_status(
        &self,
        token: &str,
        start_time_millis: i64,
    ) -> Result<PairingBatchResult, CoreError>;
}

/// Arguments for starting the local radio stack.
#[derive(Debug, Clone)]
pub struct RadioStart {
    pub mode: RadioMode,
    pub ssid: String,
    pub password: SecretString,
    /// Token in radio form.
    pub token: String,
    pub timeout: Duration,
}

/// The vendor radio stack that broadcasts WiFi credentials.
///
/// Results come back asynchronously through a
/// [`RadioEventSink`](crate::RadioEventSink).
pub trait RadioStack: Send + Sync {
    fn start(&self, request: RadioStart);
    /// Must be idempotent.
    fn stop(&self);
}

/// The host application's login state.
pub trait LoginSession: Send + Sync {
    fn is_logged_in(&self) -> bool;
    fn current_home_id(&self) -> Option<String>;
}

// ── Platform-backed cloud ────────────────────────────────────────────

/// [`PairingCloud`] over the HTTP platform client.
#[derive(Debug, Clone)]
pub struct PlatformBackend {
    client: PlatformClient,
}

impl PlatformBackend {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    /// Build the HTTP client from session configuration.
    pub fn from_config(config: &SessionConfig) -> Result<Self, CoreError> {
        let tls = match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        let mut transport = TransportConfig {
            tls,
            timeout: config.request_timeout,
            ..TransportConfig::default()
        };
        if let Some(code) = &config.access_code {
            transport = transport.with_access_code(code.clone());
        }

        let client = PlatformClient::new(config.platform_url.clone(), &transport)?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PairingCloud for PlatformBackend {
    async fn product_ids(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.client.list_product_ids().await?)
    }

    async fn issue_token(&self, home_id: &str) -> Result<String, CoreError> {
        Ok(self.client.issue_pairing_token(home_id).await?)
    }

    async fn pairing_status(
        &self,
        token: &str,
        start_time_millis: i64,
    ) -> Result<PairingBatchResult, CoreError> {
        let status = self.client.pairing_status(token, start_time_millis).await?;
        debug!(code = %status.code, has_result = status.result.is_some(), "pairing status");
        Ok(status.into())
    }
}

// ── Static login ─────────────────────────────────────────────────────

/// A login session fixed at construction, for hosts without an app login.
#[derive(Debug, Clone, Default)]
pub struct StaticLogin {
    home_id: Option<String>,
}

impl StaticLogin {
    pub fn new(home_id: Option<String>) -> Self {
        Self { home_id }
    }
}

impl LoginSession for StaticLogin {
    fn is_logged_in(&self) -> bool {
        self.home_id.is_some()
    }

    fn current_home_id(&self) -> Option<String> {
        self.home_id.clone()
    }
}
