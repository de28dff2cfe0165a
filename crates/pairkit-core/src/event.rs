use serde::Serialize;

use crate::model::PairedDevice;

/// Everything a pairing session tells its observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PairingEvent {
    Success {
        devices: Vec<PairedDevice>,
    },
    Failure {
        devices: Vec<PairedDevice>,
    },
    /// Final summary of an attempt. Fires once, after the attempt ends.
    Complete {
        success: Vec<PairedDevice>,
        failed: Vec<PairedDevice>,
    },
}

impl PairingEvent {
    pub(crate) fn failure(devices: Vec<PairedDevice>) -> Self {
        Self::Failure { devices }
    }

    pub(crate) fn dispatch(&self, listener: &dyn PairingListener) {
        match self {
            Self::Success { devices } => listener.on_success(devices),
            Self::Failure { devices } => listener.on_failure(devices),
            Self::Complete { success, failed } => listener.on_complete(success, failed),
        }
    }
}

/// Callback-style observer. All callbacks run on one dispatcher task,
/// in delivery order.
pub trait PairingListener: Send + Sync {
    fn on_success(&self, devices: &[PairedDevice]);

    fn on_failure(&self, devices: &[PairedDevice]);

    fn on_complete(&self, _success: &[PairedDevice], _failed: &[PairedDevice]) {}
}
