#![allow(clippy::unwrap_used, clippy::too_many_lines)]

// Pairing session behavior against in-memory collaborators, on tokio's
// paused clock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast;
use url::Url;

use pairkit_core::{
    CoreError, ErrorCode, LoginSession, PairedDevice, Pairing, PairingBatchResult, PairingCloud,
    PairingEvent, PairingListener, PairingMode, PairingRequest, RadioDevice, RadioEvent,
    RadioMode, RadioStack, RadioStart, SessionConfig,
};

// ── Fakes ───────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeCloud {
    catalog: Option<Vec<String>>,
    issued_token: Option<String>,
    script: Mutex<VecDeque<PairingBatchResult>>,
    issued_for: Mutex<Vec<String>>,
}

impl FakeCloud {
    fn with_catalog(ids: &[&str]) -> Self {
        Self {
            catalog: Some(ids.iter().map(|s| (*s).to_owned()).collect()),
            ..Self::default()
        }
    }

    fn issuing(mut self, token: &str) -> Self {
        self.issued_token = Some(token.to_owned());
        self
    }

    fn scripted(self, batches: Vec<PairingBatchResult>) -> Self {
        *self.script.lock().unwrap() = batches.into();
        self
    }
}

#[async_trait]
impl PairingCloud for FakeCloud {
    async fn product_ids(&self) -> Result<Vec<String>, CoreError> {
        self.catalog.clone().ok_or_else(|| CoreError::Platform {
            code: "500".into(),
            message: "catalog down".into(),
        })
    }

    async fn issue_token(&self, home_id: &str) -> Result<String, CoreError> {
        self.issued_for.lock().unwrap().push(home_id.to_owned());
        self.issued_token.clone().ok_or(CoreError::Timeout)
    }

    async fn pairing_status(
        &self,
        _token: &str,
        _start_time_millis: i64,
    ) -> Result<PairingBatchResult, CoreError> {
        Ok(self.script.lock().unwrap().pop_front().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RadioCall {
    Start {
        mode: RadioMode,
        token: String,
        timeout: Duration,
    },
    Stop,
}

#[derive(Default)]
struct RecordingRadio {
    calls: Mutex<Vec<RadioCall>>,
    last_password: Mutex<String>,
}

impl RecordingRadio {
    fn starts(&self) -> Vec<RadioCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, RadioCall::Start { .. }))
            .cloned()
            .collect()
    }

    fn stop_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, RadioCall::Stop))
            .count()
    }
}

impl RadioStack for RecordingRadio {
    fn start(&self, request: RadioStart) {
        *self.last_password.lock().unwrap() = request.password.expose_secret().to_owned();
        self.calls.lock().unwrap().push(RadioCall::Start {
            mode: request.mode,
            token: request.token,
            timeout: request.timeout,
        });
    }

    fn stop(&self) {
        self.calls.lock().unwrap().push(RadioCall::Stop);
    }
}

struct FakeLogin {
    home: Option<String>,
}

impl LoginSession for FakeLogin {
    fn is_logged_in(&self) -> bool {
        true
    }

    fn current_home_id(&self) -> Option<String> {
        self.home.clone()
    }
}

#[derive(Default)]
struct RecordingListener {
    seen: Mutex<Vec<String>>,
}

impl PairingListener for RecordingListener {
    fn on_success(&self, devices: &[PairedDevice]) {
        self.seen
            .lock()
            .unwrap()
            .push(format!("success:{}", devices.len()));
    }

    fn on_failure(&self, devices: &[PairedDevice]) {
        let code = devices[0].error_code.unwrap();
        self.seen.lock().unwrap().push(format!("failure:{code}"));
    }

    fn on_complete(&self, success: &[PairedDevice], failed: &[PairedDevice]) {
        self.seen
            .lock()
            .unwrap()
            .push(format!("complete:{}/{}", success.len(), failed.len()));
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

struct Harness {
    pairing: Pairing,
    radio: Arc<RecordingRadio>,
    cloud: Arc<FakeCloud>,
    events: broadcast::Receiver<PairingEvent>,
}

fn harness(cloud: FakeCloud, home: Option<&str>) -> Harness {
    let cloud = Arc::new(cloud);
    let radio = Arc::new(RecordingRadio::default());
    let login = Arc::new(FakeLogin {
        home: home.map(str::to_owned),
    });
    let config = SessionConfig::new(Url::parse("http://platform.invalid/openapi/").unwrap());
    let pairing = Pairing::new(config, cloud.clone(), radio.clone(), login);
    let events = pairing.events();
    Harness {
        pairing,
        radio,
        cloud,
        events,
    }
}

fn api_token() -> String {
    STANDARD.encode("kr-s1-t1")
}

fn request(mode: PairingMode, timeout: u32) -> PairingRequest {
    PairingRequest::new("home-wifi", SecretString::from("hunter2".to_owned()))
        .with_token(api_token())
        .with_mode(mode)
        .with_timeout(timeout)
}

fn device(id: &str, product: &str) -> PairedDevice {
    PairedDevice {
        device_id: id.into(),
        product_id: product.into(),
        ..PairedDevice::default()
    }
}

fn found(devices: Vec<PairedDevice>) -> PairingBatchResult {
    PairingBatchResult {
        status_code: "200".into(),
        success: devices,
        failed: Vec::new(),
    }
}

fn failure(code: ErrorCode) -> PairingEvent {
    PairingEvent::Failure {
        devices: vec![PairedDevice::failure(code)],
    }
}

async fn next_event(rx: &mut broadcast::Receiver<PairingEvent>) -> PairingEvent {
    tokio::time::timeout(Duration::from_secs(600), rx.recv())
        .await
        .expect("timed out waiting for a pairing event")
        .unwrap()
}

async fn assert_quiet(rx: &mut broadcast::Receiver<PairingEvent>) {
    let next = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
    assert!(next.is_err(), "unexpected event: {next:?}");
}

async fn wait_for_radio_start(radio: &RecordingRadio) {
    for _ in 0..100 {
        if !radio.starts().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("radio stack never started");
}

// ── Initialization ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn initialize_loads_catalog() {
    let h = harness(FakeCloud::with_catalog(&["p1", "p2"]), None);

    assert_eq!(h.pairing.initialize().await.unwrap(), 2);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(h.pairing.status().catalog_size, 2);
}

#[tokio::test(start_paused = true)]
async fn initialize_failure_maps_to_internal_server_error() {
    let h = harness(FakeCloud::default(), None);

    let err = h.pairing.initialize().await.unwrap_err();
    assert_eq!(err.error_code(), Some(ErrorCode::InternalServerError));
}

#[tokio::test(start_paused = true)]
async fn start_before_initialize_fails_then_completes() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);

    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();

    assert_eq!(next_event(&mut h.events).await, failure(ErrorCode::NotInitialize));
    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Complete {
            success: Vec::new(),
            failed: vec![PairedDevice::failure(ErrorCode::NotInitialize)],
        }
    );
    assert!(!h.pairing.is_processing());
}

// ── Cloud-polled attempts ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn polled_success_is_delivered_and_completed() {
    let cloud = FakeCloud::with_catalog(&["p1"]).scripted(vec![
        PairingBatchResult::default(),
        found(vec![device("d1", "p1")]),
    ]);
    let mut h = harness(cloud, None);
    h.pairing.initialize().await.unwrap();

    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Success {
            devices: vec![device("d1", "p1")],
        }
    );
    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Complete {
            success: vec![device("d1", "p1")],
            failed: Vec::new(),
        }
    );

    assert_eq!(
        h.radio.starts(),
        vec![RadioCall::Start {
            mode: RadioMode::Ap,
            token: "krt1s1".into(),
            timeout: Duration::from_secs(60),
        }]
    );
    assert_eq!(*h.radio.last_password.lock().unwrap(), "hunter2");
    assert!(h.radio.stop_count() >= 2);
}

#[tokio::test(start_paused = true)]
async fn unsupported_product_is_a_failure() {
    let cloud = FakeCloud::with_catalog(&["p1"]).scripted(vec![found(vec![device("d1", "p9")])]);
    let mut h = harness(cloud, None);
    h.pairing.initialize().await.unwrap();

    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();

    let tagged = device("d1", "p9").with_error(ErrorCode::NotSupportPairingDevice);
    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Failure {
            devices: vec![tagged.clone()],
        }
    );
    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Complete {
            success: Vec::new(),
            failed: vec![tagged],
        }
    );
}

#[tokio::test(start_paused = true)]
async fn mixed_batch_reports_failure_before_success() {
    let cloud = FakeCloud::with_catalog(&["p1"])
        .scripted(vec![found(vec![device("ok", "p1"), device("bad", "p9")])]);
    let mut h = harness(cloud, None);
    h.pairing.initialize().await.unwrap();

    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();

    assert!(matches!(next_event(&mut h.events).await, PairingEvent::Failure { .. }));
    assert!(matches!(next_event(&mut h.events).await, PairingEvent::Success { .. }));
    assert!(matches!(
        next_event(&mut h.events).await,
        PairingEvent::Complete { ref success, ref failed } if success.len() == 1 && failed.len() == 1
    ));
}

#[tokio::test(start_paused = true)]
async fn expiry_without_devices_reports_not_found() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);
    h.pairing.initialize().await.unwrap();

    h.pairing.start_pairing(request(PairingMode::Ap, 3)).unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::NotFoundPairingDevice)
    );
    assert!(matches!(
        next_event(&mut h.events).await,
        PairingEvent::Complete { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn failed_record_without_code_is_tagged() {
    let batch = PairingBatchResult {
        status_code: "200".into(),
        success: Vec::new(),
        failed: vec![device("d1", "p1")],
    };
    let cloud = FakeCloud::with_catalog(&["p1"]).scripted(vec![batch]);
    let mut h = harness(cloud, None);
    h.pairing.initialize().await.unwrap();

    // Expires right after the only poll, so that poll is the last batch.
    h.pairing.start_pairing(request(PairingMode::Ap, 2)).unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Failure {
            devices: vec![device("d1", "p1").with_error(ErrorCode::MainPairingException)],
        }
    );
}

#[tokio::test(start_paused = true)]
async fn expired_token_ends_attempt_early() {
    let expired = PairingBatchResult {
        status_code: "6001".into(),
        ..PairingBatchResult::default()
    };
    let cloud = FakeCloud::with_catalog(&["p1"]).scripted(vec![expired]);
    let mut h = harness(cloud, None);
    h.pairing.initialize().await.unwrap();

    h.pairing.start_pairing(request(PairingMode::Ez, 120)).unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::DeviceTokenExpired)
    );
    assert!(matches!(
        next_event(&mut h.events).await,
        PairingEvent::Complete { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn ez_dedups_and_keeps_success_sticky() {
    let d1 = device("d1", "p1");
    let cloud = FakeCloud::with_catalog(&["p1"]).scripted(vec![
        found(vec![d1.clone()]),
        found(vec![d1.clone()]),
    ]);
    let mut h = harness(cloud, None);
    h.pairing.initialize().await.unwrap();

    h.pairing.start_pairing(request(PairingMode::Ez, 5)).unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Success {
            devices: vec![d1.clone()],
        }
    );
    // The repeat is a duplicate and the NOT_FOUND at expiry follows a
    // success, so the next thing out is the completion.
    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Complete {
            success: vec![d1],
            failed: Vec::new(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn radio_events_are_ignored_while_polling() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);
    h.pairing.initialize().await.unwrap();
    let sink = h.pairing.radio_events();

    h.pairing.start_pairing(request(PairingMode::Ap, 3)).unwrap();
    wait_for_radio_start(&h.radio).await;
    assert!(sink.send(RadioEvent::Device {
        device: Some(RadioDevice {
            device_id: "d1".into(),
            name: "plug".into(),
            product_id: "p1".into(),
            model_name: String::new(),
        }),
        step: 1,
        error: None,
    }));

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::NotFoundPairingDevice)
    );
}

#[tokio::test(start_paused = true)]
async fn status_check_polls_without_radio() {
    let cloud = FakeCloud::with_catalog(&["p1"]).scripted(vec![found(vec![device("d1", "p1")])]);
    let mut h = harness(cloud, None);
    h.pairing.initialize().await.unwrap();

    h.pairing
        .check_pairing_status(api_token(), Some(30))
        .unwrap();

    assert!(matches!(
        next_event(&mut h.events).await,
        PairingEvent::Success { .. }
    ));
    assert!(h.radio.starts().is_empty());
}

// ── Token resolution ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn malformed_token_is_rejected() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);
    h.pairing.initialize().await.unwrap();

    h.pairing
        .start_pairing(request(PairingMode::Ap, 60).with_token("definitely-not-a-token"))
        .unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::PairingTokenParsingError)
    );
}

#[tokio::test(start_paused = true)]
async fn issued_token_needs_a_home() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]).issuing("tok"), None);
    h.pairing.initialize().await.unwrap();

    h.pairing
        .start_pairing(request(PairingMode::Ap, 60).with_token(""))
        .unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::AutoPairingFailInitial)
    );
}

#[tokio::test(start_paused = true)]
async fn empty_issued_token_fails() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]).issuing(""), Some("home-1"));
    h.pairing.initialize().await.unwrap();

    h.pairing
        .start_pairing(request(PairingMode::Ap, 60).with_token(""))
        .unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::AutoPairingTokenEmpty)
    );
    assert_eq!(*h.cloud.issued_for.lock().unwrap(), vec!["home-1".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn token_request_failure_is_reported() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), Some("home-1"));
    h.pairing.initialize().await.unwrap();

    h.pairing
        .start_pairing(request(PairingMode::Ap, 60).with_token(""))
        .unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::AutoPairingTokenFail)
    );
}

// ── Radio-pushed attempts ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn ez_radio_attempt_collects_devices_until_stopped() {
    let mut h = harness(
        FakeCloud::with_catalog(&["p1"]).issuing("radio-tok"),
        Some("home-1"),
    );
    h.pairing.initialize().await.unwrap();
    let sink = h.pairing.radio_events();

    h.pairing
        .start_pairing(request(PairingMode::Ez, 60).with_token(""))
        .unwrap();
    wait_for_radio_start(&h.radio).await;
    assert_eq!(
        h.radio.starts(),
        vec![RadioCall::Start {
            mode: RadioMode::Ez,
            token: "radio-tok".into(),
            timeout: Duration::from_secs(60),
        }]
    );

    for id in ["d1", "d2"] {
        sink.send(RadioEvent::Device {
            device: Some(RadioDevice {
                device_id: id.into(),
                name: String::new(),
                product_id: "p1".into(),
                model_name: String::new(),
            }),
            step: 2,
            error: None,
        });
        assert!(matches!(
            next_event(&mut h.events).await,
            PairingEvent::Success { .. }
        ));
    }
    assert!(h.pairing.is_processing());

    // STOP after a success is suppressed; only the completion follows.
    h.pairing.stop_pairing().unwrap();
    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Complete {
            success: vec![device("d1", "p1"), device("d2", "p1")],
            failed: Vec::new(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn radio_timeout_maps_to_timeout_code() {
    let mut h = harness(
        FakeCloud::with_catalog(&["p1"]).issuing("radio-tok"),
        Some("home-1"),
    );
    h.pairing.initialize().await.unwrap();
    let sink = h.pairing.radio_events();

    h.pairing
        .start_pairing(request(PairingMode::Ap, 60).with_token(""))
        .unwrap();
    wait_for_radio_start(&h.radio).await;
    sink.send(RadioEvent::Failed { code: 1512 });

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::AutoPairingFailTimeout)
    );
    assert!(matches!(
        next_event(&mut h.events).await,
        PairingEvent::Complete { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn radio_device_error_is_auto_pairing_fail() {
    let mut h = harness(
        FakeCloud::with_catalog(&["p1"]).issuing("radio-tok"),
        Some("home-1"),
    );
    h.pairing.initialize().await.unwrap();
    let sink = h.pairing.radio_events();

    h.pairing
        .start_pairing(request(PairingMode::Ap, 60).with_token(""))
        .unwrap();
    wait_for_radio_start(&h.radio).await;
    sink.send(RadioEvent::Device {
        device: None,
        step: 0,
        error: Some(7),
    });
    sink.send(RadioEvent::Device {
        device: Some(RadioDevice {
            device_id: "d1".into(),
            name: "bulb".into(),
            product_id: "p1".into(),
            model_name: "A19".into(),
        }),
        step: 3,
        error: Some(7),
    });

    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Failure {
            devices: vec![PairedDevice {
                error_code: Some(ErrorCode::AutoPairingFail),
                device_id: "d1".into(),
                name: "bulb".into(),
                product_id: "p1".into(),
                model_name: "A19".into(),
            }],
        }
    );
}

// ── Guard, stop, completion ─────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn second_start_is_rejected_without_disturbing_first() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);
    h.pairing.initialize().await.unwrap();

    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();
    h.pairing.start_pairing(request(PairingMode::Ez, 60)).unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::ProcessingPairingEzMode)
    );
    assert!(h.pairing.is_processing());

    h.pairing.stop_pairing().unwrap();
    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::StopProcessingPairing)
    );
    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Complete {
            success: Vec::new(),
            failed: vec![PairedDevice::failure(ErrorCode::StopProcessingPairing)],
        }
    );
    assert_eq!(h.radio.starts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_stop_delivers_at_most_one_failure() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);

    h.pairing.stop_pairing().unwrap();
    h.pairing.stop_pairing().unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::StopProcessingPairing)
    );
    assert_quiet(&mut h.events).await;
}

#[tokio::test(start_paused = true)]
async fn restart_after_stop_is_accepted() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);
    h.pairing.initialize().await.unwrap();

    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    h.pairing.stop_pairing().unwrap();
    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::StopProcessingPairing)
    );
    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Complete {
            success: Vec::new(),
            failed: vec![PairedDevice::failure(ErrorCode::StopProcessingPairing)],
        }
    );
    assert_quiet(&mut h.events).await;
    assert!(h.pairing.is_processing());
    assert_eq!(h.radio.starts().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_after_completed_attempt_delivers_at_most_one_failure() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);

    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();
    assert_eq!(next_event(&mut h.events).await, failure(ErrorCode::NotInitialize));
    assert!(matches!(
        next_event(&mut h.events).await,
        PairingEvent::Complete { .. }
    ));

    h.pairing.stop_pairing().unwrap();
    h.pairing.stop_pairing().unwrap();

    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::StopProcessingPairing)
    );
    assert_quiet(&mut h.events).await;
    assert!(!h.pairing.is_processing());
}

#[tokio::test(start_paused = true)]
async fn idle_stop_stays_out_of_pending_completion() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);

    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();
    h.pairing.stop_pairing().unwrap();

    assert_eq!(next_event(&mut h.events).await, failure(ErrorCode::NotInitialize));
    assert_eq!(
        next_event(&mut h.events).await,
        failure(ErrorCode::StopProcessingPairing)
    );
    assert_eq!(
        next_event(&mut h.events).await,
        PairingEvent::Complete {
            success: Vec::new(),
            failed: vec![PairedDevice::failure(ErrorCode::NotInitialize)],
        }
    );
}

#[tokio::test(start_paused = true)]
async fn reset_is_silent() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);
    h.pairing.initialize().await.unwrap();

    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();
    h.pairing.reset_pairing().unwrap();

    assert_quiet(&mut h.events).await;
    assert!(!h.pairing.is_processing());
}

#[tokio::test(start_paused = true)]
async fn new_attempt_flushes_pending_completion() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);

    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();
    h.pairing.start_pairing(request(PairingMode::Ap, 60)).unwrap();

    let order: Vec<PairingEvent> = vec![
        next_event(&mut h.events).await,
        next_event(&mut h.events).await,
        next_event(&mut h.events).await,
        next_event(&mut h.events).await,
    ];
    let complete = PairingEvent::Complete {
        success: Vec::new(),
        failed: vec![PairedDevice::failure(ErrorCode::NotInitialize)],
    };
    assert_eq!(
        order,
        vec![
            failure(ErrorCode::NotInitialize),
            complete.clone(),
            failure(ErrorCode::NotInitialize),
            complete,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn listener_sees_events_in_order() {
    let mut h = harness(FakeCloud::with_catalog(&["p1"]), None);
    let listener = Arc::new(RecordingListener::default());
    h.pairing.set_listener(listener.clone());

    h.pairing.start_pairing(request(PairingMode::Qr, 60)).unwrap();
    next_event(&mut h.events).await;
    next_event(&mut h.events).await;

    assert_eq!(
        *listener.seen.lock().unwrap(),
        vec!["failure:NOT_INITIALIZE".to_owned(), "complete:0/1".to_owned()]
    );
}

// ── QR ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn qr_pairing_returns_payload() {
    let h = harness(FakeCloud::with_catalog(&["p1"]), None);
    h.pairing.initialize().await.unwrap();

    let payload = h
        .pairing
        .start_qr_pairing("home", SecretString::from("pw".to_owned()), api_token())
        .await
        .unwrap();

    assert_eq!(payload, r#"{"s":"home","p":"pw","t":"krt1s1"}"#);
    assert_eq!(
        h.radio.starts(),
        vec![RadioCall::Start {
            mode: RadioMode::Qr,
            token: "krt1s1".into(),
            timeout: Duration::from_secs(100),
        }]
    );
    h.pairing.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn public_qr_mode_runs_radio_as_ap() {
    let h = harness(FakeCloud::with_catalog(&["p1"]), None);
    h.pairing.initialize().await.unwrap();

    h.pairing.start_pairing(request(PairingMode::Qr, 60)).unwrap();
    wait_for_radio_start(&h.radio).await;

    assert_eq!(
        h.radio.starts(),
        vec![RadioCall::Start {
            mode: RadioMode::Ap,
            token: "krt1s1".into(),
            timeout: Duration::from_secs(60),
        }]
    );
    h.pairing.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn qr_pairing_reports_rejection() {
    let h = harness(FakeCloud::with_catalog(&["p1"]), None);

    let err = h
        .pairing
        .start_qr_pairing("home", SecretString::from("pw".to_owned()), api_token())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::Rejected {
            code: ErrorCode::NotInitialize
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn operations_fail_after_shutdown() {
    let h = harness(FakeCloud::with_catalog(&["p1"]), None);
    h.pairing.shutdown().await;

    assert!(matches!(
        h.pairing.stop_pairing(),
        Err(CoreError::SessionClosed)
    ));
}
