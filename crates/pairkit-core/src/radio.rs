// ── Radio stack events ──
//
// The vendor radio stack reports back on its own schedule. Hosts forward
// its callbacks through a `RadioEventSink`, which queues them for the
// session actor.

use tokio::sync::mpsc;

use crate::session::SessionInput;

/// Radio error code meaning the stack gave up waiting.
pub const RADIO_TIMEOUT_CODE: i64 = 1512;

/// A device as reported by the radio stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadioDevice {
    pub device_id: String,
    pub name: String,
    pub product_id: String,
    pub model_name: String,
}

/// One callback from the radio stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// The stack failed without a device.
    Failed { code: i64 },
    /// A device changed state. `step` is the vendor's step number and is
    /// only logged.
    Device {
        device: Option<RadioDevice>,
        step: u32,
        error: Option<i64>,
    },
}

/// Cloneable handle for pushing radio events into a session.
#[derive(Debug, Clone)]
pub struct RadioEventSink {
    tx: mpsc::UnboundedSender<SessionInput>,
}

impl RadioEventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SessionInput>) -> Self {
        Self { tx }
    }

    /// Queue an event. Returns `false` once the session has shut down.
    pub fn send(&self, event: RadioEvent) -> bool {
        self.tx.send(SessionInput::Radio(event)).is_ok()
    }
}
