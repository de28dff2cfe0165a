// ── Pairing facade ──
//
// The entry point hosts use. Cheaply cloneable; every operation is a
// message to the session actor, and every outcome comes back through the
// registered listener and the event broadcast.

use std::collections::HashSet;
use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{LoginSession, PairingCloud, PlatformBackend, RadioStack};
use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::event::{PairingEvent, PairingListener};
use crate::model::PairingMode;
use crate::radio::RadioEventSink;
use crate::session::{Session, SessionInput, SessionParts, SessionStatus};

const EVENT_CHANNEL_SIZE: usize = 256;

type ListenerSlot = Option<Arc<dyn PairingListener>>;

// ── PairingRequest ───────────────────────────────────────────────

/// Arguments for [`Pairing::start_pairing`].
///
/// An empty `token` asks the platform to issue one for the current home;
/// anything else is treated as an API-supplied base64 token.
#[derive(Debug, Clone)]
pub struct PairingRequest {
    pub ssid: String,
    pub password: SecretString,
    pub token: String,
    pub mode: PairingMode,
    /// Falls back to [`SessionConfig::pairing_timeout_secs`].
    pub timeout_secs: Option<u32>,
    /// Falls back to [`SessionConfig::timeout_margin_secs`].
    pub margin_secs: Option<u32>,
}

impl PairingRequest {
    pub fn new(ssid: impl Into<String>, password: SecretString) -> Self {
        Self {
            ssid: ssid.into(),
            password,
            token: String::new(),
            mode: PairingMode::default(),
            timeout_secs: None,
            margin_secs: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_mode(mut self, mode: PairingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, secs: u32) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_margin(mut self, secs: u32) -> Self {
        self.margin_secs = Some(secs);
        self
    }
}

// ── Pairing ──────────────────────────────────────────────────────

/// The pairing session handle.
///
/// At most one attempt runs at a time. Results are delivered to the
/// listener set with [`Pairing::set_listener`] and to every
/// [`Pairing::events`] subscriber, in the same order.
#[derive(Clone)]
pub struct Pairing {
    inner: Arc<PairingInner>,
}

struct PairingInner {
    config: SessionConfig,
    cloud: Arc<dyn PairingCloud>,
    login: Arc<dyn LoginSession>,
    inputs: mpsc::UnboundedSender<SessionInput>,
    status: watch::Receiver<SessionStatus>,
    listener: watch::Sender<ListenerSlot>,
    event_tx: broadcast::Sender<PairingEvent>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for PairingInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Pairing {
    /// Create a session over the given collaborators.
    ///
    /// Spawns the session and dispatcher tasks, so it must be called from
    /// within a Tokio runtime.
    pub fn new(
        config: SessionConfig,
        cloud: Arc<dyn PairingCloud>,
        radio: Arc<dyn RadioStack>,
        login: Arc<dyn LoginSession>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (listener, listener_rx) = watch::channel::<ListenerSlot>(None);
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();

        let session = Session::spawn(
            SessionParts {
                cloud: Arc::clone(&cloud),
                radio,
                login: Arc::clone(&login),
                completion_grace: config.completion_grace,
            },
            dispatch_tx,
            cancel.child_token(),
        );
        let dispatcher = tokio::spawn(dispatch_task(
            dispatch_rx,
            listener_rx,
            event_tx.clone(),
            cancel.child_token(),
        ));

        Self {
            inner: Arc::new(PairingInner {
                config,
                cloud,
                login,
                inputs: session.inputs,
                status: session.status,
                listener,
                event_tx,
                cancel,
                task_handles: Mutex::new(vec![session.task, dispatcher]),
            }),
        }
    }

    /// Create a session that talks to the HTTP pairing platform.
    pub fn with_platform(
        config: SessionConfig,
        radio: Arc<dyn RadioStack>,
        login: Arc<dyn LoginSession>,
    ) -> Result<Self, CoreError> {
        let cloud = PlatformBackend::from_config(&config)?;
        Ok(Self::new(config, Arc::new(cloud), radio, login))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ── Observers ────────────────────────────────────────────────

    /// Register the callback observer, replacing any previous one.
    pub fn set_listener(&self, listener: Arc<dyn PairingListener>) {
        self.inner.listener.send_replace(Some(listener));
    }

    pub fn clear_listener(&self) {
        self.inner.listener.send_replace(None);
    }

    /// Subscribe to the event broadcast stream.
    pub fn events(&self) -> broadcast::Receiver<PairingEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Handle the host forwards radio stack callbacks through.
    pub fn radio_events(&self) -> RadioEventSink {
        RadioEventSink::new(self.inner.inputs.clone())
    }

    pub fn status(&self) -> SessionStatus {
        *self.inner.status.borrow()
    }

    pub fn is_processing(&self) -> bool {
        self.status().processing
    }

    // ── Operations ───────────────────────────────────────────────

    /// Load the supported product catalog.
    ///
    /// Returns the catalog size. On failure the catalog stays as it was
    /// and the error maps to `INTERNAL_SERVER_ERROR`.
    pub async fn initialize(&self) -> Result<usize, CoreError> {
        if !self.inner.login.is_logged_in() {
            warn!("initializing without a logged-in session");
        }

        let ids = self.inner.cloud.product_ids().await.map_err(|e| {
            warn!(error = %e, "failed to load product catalog");
            CoreError::CatalogUnavailable {
                reason: e.to_string(),
            }
        })?;
        let catalog: HashSet<String> = ids.into_iter().filter(|id| !id.is_empty()).collect();
        let size = catalog.len();
        self.send(SessionInput::Catalog(catalog))?;
        info!(products = size, "pairing initialized");
        Ok(size)
    }

    /// Start a pairing attempt. Outcomes arrive through the observers.
    pub fn start_pairing(&self, request: PairingRequest) -> Result<(), CoreError> {
        let timeout_secs = request
            .timeout_secs
            .unwrap_or(self.inner.config.pairing_timeout_secs);
        let margin_secs = request
            .margin_secs
            .unwrap_or(self.inner.config.timeout_margin_secs);
        validate_timing(timeout_secs, margin_secs)?;

        self.send(SessionInput::Start {
            request,
            timeout_secs,
            margin_secs,
            qr_reply: None,
        })
    }

    /// Stop the in-flight attempt with `STOP_PROCESSING_PAIRING`.
    pub fn stop_pairing(&self) -> Result<(), CoreError> {
        self.send(SessionInput::Stop)
    }

    /// Stop the radio stack and poll timer without notifying anyone.
    pub fn reset_pairing(&self) -> Result<(), CoreError> {
        self.send(SessionInput::Reset)
    }

    /// Poll the platform for an API-supplied token without starting the
    /// radio stack.
    pub fn check_pairing_status(
        &self,
        token: impl Into<String>,
        timeout_secs: Option<u32>,
    ) -> Result<(), CoreError> {
        let timeout_secs = timeout_secs.unwrap_or(self.inner.config.check_timeout_secs);
        validate_timing(timeout_secs, 0)?;
        self.send(SessionInput::Check {
            token: token.into(),
            timeout_secs,
        })
    }

    /// Start a QR-mode attempt and return the payload the device should
    /// scan.
    pub async fn start_qr_pairing(
        &self,
        ssid: impl Into<String>,
        password: SecretString,
        token: impl Into<String>,
    ) -> Result<String, CoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = PairingRequest::new(ssid, password)
            .with_token(token)
            .with_mode(PairingMode::Qr);

        self.send(SessionInput::Start {
            request,
            timeout_secs: SessionConfig::QR_TIMEOUT_SECS,
            margin_secs: 0,
            qr_reply: Some(reply_tx),
        })?;

        match reply_rx.await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(code)) => Err(CoreError::Rejected { code }),
            Err(_) => Err(CoreError::SessionClosed),
        }
    }

    /// Stop everything and wait for background tasks to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        self.clear_listener();
        debug!("pairing session shut down");
    }

    fn send(&self, input: SessionInput) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::SessionClosed);
        }
        self.inner
            .inputs
            .send(input)
            .map_err(|_| CoreError::SessionClosed)
    }
}

fn validate_timing(timeout_secs: u32, margin_secs: u32) -> Result<(), CoreError> {
    if timeout_secs == 0 {
        return Err(CoreError::InvalidArgument {
            message: "timeout must be at least one second".into(),
        });
    }
    if margin_secs >= timeout_secs {
        return Err(CoreError::InvalidArgument {
            message: format!("margin ({margin_secs}s) must be shorter than timeout ({timeout_secs}s)"),
        });
    }
    Ok(())
}

// ── Dispatcher ───────────────────────────────────────────────────

/// Delivers session events to the listener, then to broadcast
/// subscribers, one at a time.
async fn dispatch_task(
    mut rx: mpsc::UnboundedReceiver<PairingEvent>,
    listener: watch::Receiver<ListenerSlot>,
    event_tx: broadcast::Sender<PairingEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                let current = listener.borrow().clone();
                if let Some(listener) = current {
                    event.dispatch(listener.as_ref());
                }
                let _ = event_tx.send(event);
            }
        }
    }
}
