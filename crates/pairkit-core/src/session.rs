// ── Pairing session actor ──
//
// Owns all mutable pairing state and is the only place it changes.
// Facade calls, radio callbacks, poll reports, token resolution and
// completion timers all arrive as messages and are handled one at a time.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{LoginSession, PairingCloud, RadioStack, RadioStart};
use crate::event::PairingEvent;
use crate::model::{ErrorCode, PairedDevice, PairingMode, RadioMode, partition_supported};
use crate::pairing::PairingRequest;
use crate::qr::qr_payload;
use crate::radio::{RADIO_TIMEOUT_CODE, RadioDevice, RadioEvent};
use crate::timer::{PollOutcome, PollReport, PollRequest, PollTimer};
use crate::token::PairingToken;

pub(crate) type QrReply = oneshot::Sender<Result<String, ErrorCode>>;

pub(crate) enum SessionInput {
    Start {
        request: PairingRequest,
        timeout_secs: u32,
        margin_secs: u32,
        qr_reply: Option<QrReply>,
    },
    Check {
        token: String,
        timeout_secs: u32,
    },
    Stop,
    Reset,
    Catalog(HashSet<String>),
    Radio(RadioEvent),
    TokenResolved {
        attempt: u64,
        result: Result<ResolvedToken, ErrorCode>,
    },
    CompleteDue {
        attempt: u64,
    },
}

/// Token forms an attempt runs with.
#[derive(Debug)]
pub(crate) struct ResolvedToken {
    radio: String,
    /// Present only for API-supplied tokens; selects cloud polling.
    polling: Option<String>,
}

/// Observable session state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub processing: bool,
    pub attempt: u64,
    pub mode: PairingMode,
    pub catalog_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    /// Results come from the poll timer; radio events are ignored.
    Cloud,
    /// Results come from radio events; nothing is polled.
    Radio,
}

enum Phase {
    Idle,
    Resolving {
        timeout_secs: u32,
        margin_secs: u32,
        qr_reply: Option<QrReply>,
    },
    Running {
        source: Source,
        margin_secs: u32,
    },
}

pub(crate) struct SessionParts {
    pub cloud: Arc<dyn PairingCloud>,
    pub radio: Arc<dyn RadioStack>,
    pub login: Arc<dyn LoginSession>,
    pub completion_grace: Duration,
}

pub(crate) struct SessionHandle {
    pub inputs: mpsc::UnboundedSender<SessionInput>,
    pub status: watch::Receiver<SessionStatus>,
    pub task: JoinHandle<()>,
}

pub(crate) struct Session {
    cloud: Arc<dyn PairingCloud>,
    radio: Arc<dyn RadioStack>,
    login: Arc<dyn LoginSession>,
    events: mpsc::UnboundedSender<PairingEvent>,
    inputs: mpsc::UnboundedSender<SessionInput>,
    polls: mpsc::UnboundedSender<PollReport>,
    status: watch::Sender<SessionStatus>,
    completion_grace: Duration,

    catalog: HashSet<String>,
    timer: PollTimer,
    phase: Phase,
    attempt: u64,
    mode: PairingMode,
    ssid: String,
    password: SecretString,

    // Dedup and sticky-success state. Survives until the next attempt.
    succeeded: bool,
    last_success: Vec<PairedDevice>,
    last_failure: Vec<PairedDevice>,

    // Distinct records delivered during the attempt, for the completion.
    delivered_success: Vec<PairedDevice>,
    delivered_failure: Vec<PairedDevice>,
    pending_complete: Option<u64>,
}

impl Session {
    /// Spawn the actor. Must be called from within a Tokio runtime.
    pub(crate) fn spawn(
        parts: SessionParts,
        events: mpsc::UnboundedSender<PairingEvent>,
        cancel: CancellationToken,
    ) -> SessionHandle {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());

        let session = Self {
            timer: PollTimer::new(Arc::clone(&parts.cloud)),
            cloud: parts.cloud,
            radio: parts.radio,
            login: parts.login,
            events,
            inputs: input_tx.clone(),
            polls: poll_tx,
            status: status_tx,
            completion_grace: parts.completion_grace,
            catalog: HashSet::new(),
            phase: Phase::Idle,
            attempt: 0,
            mode: PairingMode::default(),
            ssid: String::new(),
            password: SecretString::from(String::new()),
            succeeded: false,
            last_success: Vec::new(),
            last_failure: Vec::new(),
            delivered_success: Vec::new(),
            delivered_failure: Vec::new(),
            pending_complete: None,
        };

        let task = tokio::spawn(session.run(input_rx, poll_rx, cancel));
        SessionHandle {
            inputs: input_tx,
            status: status_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<SessionInput>,
        mut polls: mpsc::UnboundedReceiver<PollReport>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                input = inputs.recv() => {
                    let Some(input) = input else { break };
                    self.handle(input);
                }
                Some(report) = polls.recv() => self.on_poll(report),
            }
        }

        self.timer.reset_timer();
        if self.is_processing() {
            self.radio.stop();
        }
        debug!("pairing session task exiting");
    }

    fn handle(&mut self, input: SessionInput) {
        match input {
            SessionInput::Start {
                request,
                timeout_secs,
                margin_secs,
                qr_reply,
            } => self.on_start(request, timeout_secs, margin_secs, qr_reply),
            SessionInput::Check {
                token,
                timeout_secs,
            } => self.on_check(&token, timeout_secs),
            SessionInput::Stop => self.on_stop(),
            SessionInput::Reset => self.on_reset(),
            SessionInput::Catalog(ids) => {
                info!(products = ids.len(), "product catalog loaded");
                self.catalog = ids;
                self.publish_status();
            }
            SessionInput::Radio(event) => self.on_radio(event),
            SessionInput::TokenResolved { attempt, result } => self.on_token(attempt, result),
            SessionInput::CompleteDue { attempt } => {
                if self.pending_complete == Some(attempt) {
                    self.fire_complete();
                }
            }
        }
    }

    // ── Starting ─────────────────────────────────────────────────────

    fn on_start(
        &mut self,
        request: PairingRequest,
        timeout_secs: u32,
        margin_secs: u32,
        qr_reply: Option<QrReply>,
    ) {
        if self.is_processing() {
            let code = self.reject(request.mode);
            if let Some(reply) = qr_reply {
                let _ = reply.send(Err(code));
            }
            return;
        }

        self.begin_attempt(request.mode);
        self.ssid = request.ssid;
        self.password = request.password;
        info!(
            attempt = self.attempt,
            mode = %self.mode,
            timeout_secs,
            margin_secs,
            "pairing started"
        );

        if let Err(code) = self.check_ready() {
            self.fail_attempt(code, qr_reply);
            return;
        }

        if request.token.is_empty() {
            let Some(home_id) = self.login.current_home_id() else {
                self.fail_attempt(ErrorCode::AutoPairingFailInitial, qr_reply);
                return;
            };
            self.phase = Phase::Resolving {
                timeout_secs,
                margin_secs,
                qr_reply,
            };
            self.publish_status();
            self.spawn_token_request(home_id);
            return;
        }

        let Some(token) = PairingToken::decode(&request.token) else {
            self.fail_attempt(ErrorCode::PairingTokenParsingError, qr_reply);
            return;
        };
        let resolved = ResolvedToken {
            radio: token.radio_form(),
            polling: Some(token.polling_form().to_owned()),
        };
        self.launch(resolved, timeout_secs, margin_secs, qr_reply);
    }

    fn on_check(&mut self, token: &str, timeout_secs: u32) {
        if self.is_processing() {
            self.reject(PairingMode::Ap);
            return;
        }

        self.begin_attempt(PairingMode::Ap);
        info!(attempt = self.attempt, timeout_secs, "pairing status check started");

        if let Err(code) = self.check_ready() {
            self.fail_attempt(code, None);
            return;
        }
        let Some(token) = PairingToken::decode(token) else {
            self.fail_attempt(ErrorCode::PairingTokenParsingError, None);
            return;
        };

        self.timer.start(
            PollRequest {
                run: self.attempt,
                token: token.polling_form().to_owned(),
                mode: RadioMode::Ap,
                timeout_secs,
                margin_secs: 0,
            },
            self.polls.clone(),
        );
        self.phase = Phase::Running {
            source: Source::Cloud,
            margin_secs: 0,
        };
        self.publish_status();
    }

    /// Reset per-attempt state. A completion still waiting on its grace
    /// delay is delivered first.
    fn begin_attempt(&mut self, mode: PairingMode) {
        if self.pending_complete.is_some() {
            self.fire_complete();
        }
        self.timer.reset_timer();

        self.attempt += 1;
        self.mode = mode;
        self.succeeded = false;
        self.last_success.clear();
        self.last_failure.clear();
        self.delivered_success.clear();
        self.delivered_failure.clear();
    }

    fn check_ready(&self) -> Result<(), ErrorCode> {
        if !self.login.is_logged_in() {
            warn!("no logged-in session; continuing anyway");
        }
        if self.catalog.is_empty() {
            return Err(ErrorCode::NotInitialize);
        }
        Ok(())
    }

    fn spawn_token_request(&self, home_id: String) {
        let cloud = Arc::clone(&self.cloud);
        let inputs = self.inputs.clone();
        let attempt = self.attempt;

        tokio::spawn(async move {
            let result = match cloud.issue_token(&home_id).await {
                Ok(token) if token.is_empty() => Err(ErrorCode::AutoPairingTokenEmpty),
                Ok(token) => Ok(ResolvedToken {
                    radio: token,
                    polling: None,
                }),
                Err(e) => {
                    warn!(error = %e, "pairing token request failed");
                    Err(ErrorCode::AutoPairingTokenFail)
                }
            };
            let _ = inputs.send(SessionInput::TokenResolved { attempt, result });
        });
    }

    fn on_token(&mut self, attempt: u64, result: Result<ResolvedToken, ErrorCode>) {
        if attempt != self.attempt || !matches!(self.phase, Phase::Resolving { .. }) {
            debug!(attempt, "stale token resolution ignored");
            return;
        }
        let Phase::Resolving {
            timeout_secs,
            margin_secs,
            qr_reply,
        } = std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return;
        };

        match result {
            Ok(resolved) => self.launch(resolved, timeout_secs, margin_secs, qr_reply),
            Err(code) => self.fail_attempt(code, qr_reply),
        }
    }

    /// Start the radio stack and, for API-supplied tokens, the poll timer.
    fn launch(
        &mut self,
        resolved: ResolvedToken,
        timeout_secs: u32,
        margin_secs: u32,
        qr_reply: Option<QrReply>,
    ) {
        let payload = qr_reply
            .is_some()
            .then(|| qr_payload(&self.ssid, self.password.expose_secret(), &resolved.radio));

        let radio_mode = if payload.is_some() {
            RadioMode::Qr
        } else {
            self.mode.into()
        };

        self.radio.stop();
        self.radio.start(RadioStart {
            mode: radio_mode,
            ssid: self.ssid.clone(),
            password: self.password.clone(),
            token: resolved.radio,
            timeout: Duration::from_secs(u64::from(timeout_secs.saturating_sub(margin_secs))),
        });
        if let (Some(reply), Some(payload)) = (qr_reply, payload) {
            let _ = reply.send(Ok(payload));
        }

        let source = if let Some(token) = resolved.polling {
            self.timer.start(
                PollRequest {
                    run: self.attempt,
                    token,
                    mode: self.mode.into(),
                    timeout_secs,
                    margin_secs,
                },
                self.polls.clone(),
            );
            Source::Cloud
        } else {
            Source::Radio
        };
        debug!(attempt = self.attempt, ?source, "pairing attempt running");

        self.phase = Phase::Running {
            source,
            margin_secs,
        };
        self.publish_status();
    }

    // ── Results ──────────────────────────────────────────────────────

    fn on_poll(&mut self, report: PollReport) {
        let Phase::Running {
            source: Source::Cloud,
            margin_secs,
        } = self.phase
        else {
            debug!(run = report.run, "poll report outside a polling attempt dropped");
            return;
        };
        if report.run != self.attempt {
            debug!(run = report.run, "stale poll report dropped");
            return;
        }

        let (failures, successes, remaining) = match report.outcome {
            PollOutcome::MarginReached => {
                info!("timeout margin reached; stopping radio stack");
                self.radio.stop();
                return;
            }
            PollOutcome::Found { devices, remaining } => {
                let (unsupported, supported) = partition_supported(devices, &self.catalog);
                (unsupported, supported, remaining)
            }
            PollOutcome::Failed { devices, remaining } => {
                let failures = devices
                    .into_iter()
                    .map(|d| {
                        if d.is_success() {
                            d.with_error(ErrorCode::MainPairingException)
                        } else {
                            d
                        }
                    })
                    .collect();
                (failures, Vec::new(), remaining)
            }
        };

        if margin_secs > 0 && remaining == margin_secs {
            self.radio.stop();
        }
        self.deliver(failures, successes);

        if remaining == 0 || !self.mode.keeps_running() {
            self.conclude(true);
        }
    }

    fn on_radio(&mut self, event: RadioEvent) {
        if !matches!(
            self.phase,
            Phase::Running {
                source: Source::Radio,
                ..
            }
        ) {
            debug!(?event, "radio event outside a radio-driven attempt dropped");
            return;
        }
        let stop_radio = !self.mode.keeps_running();

        match event {
            RadioEvent::Failed { code } => {
                let mapped = if code == RADIO_TIMEOUT_CODE {
                    ErrorCode::AutoPairingFailTimeout
                } else {
                    ErrorCode::AutoPairingFailUnknown
                };
                warn!(radio_code = code, %mapped, "radio stack failed");
                self.deliver(vec![PairedDevice::failure(mapped)], Vec::new());
                self.conclude(stop_radio);
            }
            RadioEvent::Device {
                device,
                step,
                error,
            } => {
                let Some(device) = device.filter(|d| !d.device_id.is_empty()) else {
                    debug!(step, "radio event without a device ignored");
                    return;
                };
                let record = radio_record(device);

                if let Some(code) = error {
                    warn!(device_id = %record.device_id, radio_code = code, "device failed to pair");
                    self.deliver(
                        vec![record.with_error(ErrorCode::AutoPairingFail)],
                        Vec::new(),
                    );
                    self.conclude(stop_radio);
                    return;
                }

                debug!(device_id = %record.device_id, step, "device reported by radio");
                let (unsupported, supported) = partition_supported(vec![record], &self.catalog);
                self.deliver(unsupported, supported);
                if !self.mode.keeps_running() {
                    self.conclude(true);
                }
            }
        }
    }

    /// Apply dedup and sticky-success rules, then notify observers.
    /// Failures go out before successes.
    fn deliver(&mut self, failures: Vec<PairedDevice>, successes: Vec<PairedDevice>) {
        if !failures.is_empty() {
            if self.succeeded {
                debug!(count = failures.len(), "failure suppressed after success");
            } else if failures == self.last_failure {
                debug!(count = failures.len(), "duplicate failure suppressed");
            } else {
                self.last_failure.clone_from(&failures);
                push_distinct(&mut self.delivered_failure, &failures);
                self.emit(PairingEvent::failure(failures));
            }
        }

        if !successes.is_empty() {
            if successes == self.last_success {
                debug!(count = successes.len(), "duplicate success suppressed");
            } else {
                self.last_success.clone_from(&successes);
                self.succeeded = true;
                push_distinct(&mut self.delivered_success, &successes);
                self.emit(PairingEvent::Success { devices: successes });
            }
        }
    }

    fn fail_attempt(&mut self, code: ErrorCode, qr_reply: Option<QrReply>) {
        warn!(attempt = self.attempt, %code, "pairing attempt failed");
        if let Some(reply) = qr_reply {
            let _ = reply.send(Err(code));
        }
        self.deliver(vec![PairedDevice::failure(code)], Vec::new());
        self.conclude(!self.mode.keeps_running());
    }

    /// End the in-flight attempt and schedule its completion.
    fn conclude(&mut self, stop_radio: bool) {
        self.timer.reset_timer();
        self.phase = Phase::Idle;
        if stop_radio {
            self.radio.stop();
        }
        info!(attempt = self.attempt, "pairing attempt concluded");
        self.publish_status();

        let attempt = self.attempt;
        let inputs = self.inputs.clone();
        let grace = self.completion_grace;
        self.pending_complete = Some(attempt);
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = inputs.send(SessionInput::CompleteDue { attempt });
        });
    }

    fn fire_complete(&mut self) {
        self.pending_complete = None;
        let success = std::mem::take(&mut self.delivered_success);
        let failed = self.delivered_failure.clone();
        debug!(
            success = success.len(),
            failed = failed.len(),
            "pairing complete"
        );
        self.emit(PairingEvent::Complete { success, failed });
    }

    // ── Stop / reset ─────────────────────────────────────────────────

    fn on_stop(&mut self) {
        let in_flight = self.is_processing();
        info!(processing = in_flight, "stop requested");
        self.timer.reset_timer();
        self.radio.stop();

        if let Phase::Resolving { qr_reply, .. } = &mut self.phase {
            if let Some(reply) = qr_reply.take() {
                let _ = reply.send(Err(ErrorCode::StopProcessingPairing));
            }
        }

        let stop = vec![PairedDevice::failure(ErrorCode::StopProcessingPairing)];
        if in_flight {
            self.deliver(stop, Vec::new());
            self.conclude(true);
        } else if !self.succeeded && stop != self.last_failure {
            // No attempt owns an idle stop, so it stays out of any completion.
            self.last_failure.clone_from(&stop);
            self.emit(PairingEvent::failure(stop));
        }
    }

    fn on_reset(&mut self) {
        debug!("pairing reset");
        self.timer.reset_timer();
        self.radio.stop();

        if let Phase::Resolving { qr_reply, .. } = &mut self.phase {
            if let Some(reply) = qr_reply.take() {
                let _ = reply.send(Err(ErrorCode::StopProcessingPairing));
            }
        }
        self.phase = Phase::Idle;
        self.publish_status();
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn is_processing(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Answer a start made while another attempt is in flight. Goes
    /// straight to observers without touching attempt state.
    fn reject(&self, mode: PairingMode) -> ErrorCode {
        let code = ErrorCode::processing_for(mode);
        info!(%code, "pairing already in progress");
        self.emit(PairingEvent::failure(vec![PairedDevice::failure(code)]));
        code
    }

    fn emit(&self, event: PairingEvent) {
        if self.events.send(event).is_err() {
            debug!("pairing event dropped; dispatcher gone");
        }
    }

    fn publish_status(&self) {
        self.status.send_replace(SessionStatus {
            processing: self.is_processing(),
            attempt: self.attempt,
            mode: self.mode,
            catalog_size: self.catalog.len(),
        });
    }
}

fn radio_record(device: RadioDevice) -> PairedDevice {
    PairedDevice {
        error_code: None,
        device_id: device.device_id,
        name: device.name,
        product_id: device.product_id,
        model_name: device.model_name,
    }
}

fn push_distinct(into: &mut Vec<PairedDevice>, records: &[PairedDevice]) {
    for record in records {
        if !into.contains(record) {
            into.push(record.clone());
        }
    }
}
