// ── Poll timer ──
//
// Counts an attempt down once per second and polls the cloud on every
// tick. Outcomes are pushed to the session as `PollReport`s; the live
// countdown and the last decoded batch are published on a watch channel.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::PairingCloud;
use crate::error::CoreError;
use crate::model::{ErrorCode, PairedDevice, PairingBatchResult, RadioMode};

const TICK: Duration = Duration::from_secs(1);

/// What to poll and for how long.
#[derive(Debug, Clone)]
pub struct PollRequest {
    /// Echoed back in every report so stale runs can be told apart.
    pub run: u64,
    /// Polling form of the token.
    pub token: String,
    pub mode: RadioMode,
    pub timeout_secs: u32,
    pub margin_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Found {
        devices: Vec<PairedDevice>,
        remaining: u32,
    },
    Failed {
        devices: Vec<PairedDevice>,
        remaining: u32,
    },
    /// The countdown hit the radio margin; polling continues.
    MarginReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub run: u64,
    pub outcome: PollOutcome,
}

/// Live view of the countdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSnapshot {
    pub remaining: u32,
    pub last_batch: PairingBatchResult,
}

struct ActiveRun {
    run: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    sink: mpsc::UnboundedSender<PollReport>,
}

/// Countdown driver. Owned by the session; at most one run is active.
pub struct PollTimer {
    cloud: Arc<dyn PairingCloud>,
    snapshot: Arc<watch::Sender<PollSnapshot>>,
    active: Option<ActiveRun>,
}

impl PollTimer {
    pub fn new(cloud: Arc<dyn PairingCloud>) -> Self {
        let (snapshot, _) = watch::channel(PollSnapshot::default());
        Self {
            cloud,
            snapshot: Arc::new(snapshot),
            active: None,
        }
    }

    /// Start a countdown, cancelling any previous one first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self, request: PollRequest, sink: mpsc::UnboundedSender<PollReport>) {
        self.reset_timer();
        info!(
            run = request.run,
            mode = %request.mode,
            timeout_secs = request.timeout_secs,
            margin_secs = request.margin_secs,
            "poll timer started"
        );

        self.snapshot.send_replace(PollSnapshot {
            remaining: request.timeout_secs,
            last_batch: PairingBatchResult::default(),
        });

        let cancel = CancellationToken::new();
        let run = request.run;
        let task = TimerTask {
            cloud: Arc::clone(&self.cloud),
            snapshot: Arc::clone(&self.snapshot),
            sink: sink.clone(),
            remaining: request.timeout_secs,
            last_batch: PairingBatchResult::default(),
            start_millis: chrono::Utc::now().timestamp_millis(),
            request,
        };
        let handle = tokio::spawn(task.run(cancel.clone()));

        self.active = Some(ActiveRun {
            run,
            cancel,
            handle,
            sink,
        });
    }

    /// Cancel the countdown without notifying anyone. Idempotent.
    pub fn reset_timer(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(run = active.run, "poll timer reset");
            active.cancel.cancel();
        }
        self.snapshot.send_modify(|s| s.remaining = 0);
    }

    /// Cancel the countdown and deliver one failure carrying `code`.
    ///
    /// Returns `false` (and delivers nothing) when no countdown was
    /// running.
    pub fn stop_timer(&mut self, code: ErrorCode) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.cancel.cancel();
        self.snapshot.send_modify(|s| s.remaining = 0);

        if active.handle.is_finished() {
            return false;
        }
        info!(run = active.run, %code, "poll timer stopped");
        active
            .sink
            .send(PollReport {
                run: active.run,
                outcome: PollOutcome::Failed {
                    devices: vec![PairedDevice::failure(code)],
                    remaining: 0,
                },
            })
            .is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| !a.handle.is_finished())
    }

    pub fn remaining(&self) -> u32 {
        self.snapshot.borrow().remaining
    }

    pub fn last_batch(&self) -> PairingBatchResult {
        self.snapshot.borrow().last_batch.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.snapshot.subscribe()
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

// ── Background task ──────────────────────────────────────────────────

struct TimerTask {
    cloud: Arc<dyn PairingCloud>,
    snapshot: Arc<watch::Sender<PollSnapshot>>,
    sink: mpsc::UnboundedSender<PollReport>,
    request: PollRequest,
    remaining: u32,
    last_batch: PairingBatchResult,
    start_millis: i64,
}

impl TimerTask {
    async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls: JoinSet<Result<PairingBatchResult, CoreError>> = JoinSet::new();

        loop {
            let flow = tokio::select! {
                biased;

                () = cancel.cancelled() => ControlFlow::Break(()),

                Some(joined) = polls.join_next() => match joined {
                    Ok(Ok(batch)) => self.on_response(batch),
                    Ok(Err(e)) => {
                        warn!(error = %e, "status poll failed; retrying on next tick");
                        ControlFlow::Continue(())
                    }
                    Err(e) => {
                        warn!(error = %e, "status poll task failed");
                        ControlFlow::Continue(())
                    }
                },

                _ = ticker.tick() => self.on_tick(&mut polls),
            };
            if flow.is_break() {
                break;
            }
        }
        debug!(run = self.request.run, "poll timer task exiting");
    }

    fn on_tick(
        &mut self,
        polls: &mut JoinSet<Result<PairingBatchResult, CoreError>>,
    ) -> ControlFlow<()> {
        self.remaining = self.remaining.saturating_sub(1);
        self.snapshot.send_modify(|s| s.remaining = self.remaining);

        if self.remaining == 0 {
            let outcome = expiry_outcome(&self.last_batch);
            debug!(run = self.request.run, ?outcome, "poll timer expired");
            self.report(outcome);
            return ControlFlow::Break(());
        }
        if self.remaining == self.request.margin_secs {
            self.report(PollOutcome::MarginReached);
        }

        let cloud = Arc::clone(&self.cloud);
        let token = self.request.token.clone();
        let start = self.start_millis;
        polls.spawn(async move { cloud.pairing_status(&token, start).await });
        ControlFlow::Continue(())
    }

    fn on_response(&mut self, batch: PairingBatchResult) -> ControlFlow<()> {
        self.last_batch = batch.clone();
        self.snapshot
            .send_modify(|s| s.last_batch.clone_from(&self.last_batch));

        if !batch.success.is_empty() {
            if matches!(self.request.mode, RadioMode::Ez) {
                self.report(PollOutcome::Found {
                    devices: batch.success,
                    remaining: self.remaining,
                });
                return ControlFlow::Continue(());
            }
            self.finish(PollOutcome::Found {
                devices: batch.success,
                remaining: 0,
            });
            return ControlFlow::Break(());
        }

        if batch.is_empty() {
            if let Some(code) = ErrorCode::terminal_status(&batch.status_code) {
                self.finish(PollOutcome::Failed {
                    devices: vec![PairedDevice::failure(code)],
                    remaining: 0,
                });
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn finish(&mut self, outcome: PollOutcome) {
        self.remaining = 0;
        self.snapshot.send_modify(|s| s.remaining = 0);
        self.report(outcome);
    }

    fn report(&self, outcome: PollOutcome) {
        if self
            .sink
            .send(PollReport {
                run: self.request.run,
                outcome,
            })
            .is_err()
        {
            debug!(run = self.request.run, "poll report dropped; session gone");
        }
    }
}

/// What an expired countdown delivers: reported failures, else reported
/// successes, else "not found".
fn expiry_outcome(last: &PairingBatchResult) -> PollOutcome {
    if !last.failed.is_empty() {
        PollOutcome::Failed {
            devices: last.failed.clone(),
            remaining: 0,
        }
    } else if !last.success.is_empty() {
        PollOutcome::Found {
            devices: last.success.clone(),
            remaining: 0,
        }
    } else {
        PollOutcome::Failed {
            devices: vec![PairedDevice::failure(ErrorCode::NotFoundPairingDevice)],
            remaining: 0,
        }
    }
}
