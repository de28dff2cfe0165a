// ── Pairing result model ──
//
// Devices and batches as the session sees them, independent of whether
// they came from a cloud poll or a local radio event.

use pairkit_api::{DeviceRecord, PairingStatus};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::error_code::ErrorCode;

/// Pairing mode requested by the caller.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum PairingMode {
    /// Access-point mode: the phone joins the device's own hotspot.
    #[default]
    Ap,
    /// Broadcast ("easy") mode: credentials are sent over the air.
    Ez,
    /// The device scans a QR code holding the credentials.
    Qr,
}

impl PairingMode {
    /// EZ attempts stay in flight across intermediate results; AP and QR
    /// attempts conclude on the first delivered result.
    pub const fn keeps_running(self) -> bool {
        matches!(self, Self::Ez)
    }
}

/// Mode understood by the local radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RadioMode {
    Ap,
    Ez,
    Qr,
}

/// Public QR attempts run the radio in AP mode. Only a QR-code start
/// hands the radio its own QR flow.
impl From<PairingMode> for RadioMode {
    fn from(mode: PairingMode) -> Self {
        match mode {
            PairingMode::Ap | PairingMode::Qr => Self::Ap,
            PairingMode::Ez => Self::Ez,
        }
    }
}

/// A device outcome. `error_code == None` means the device paired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairedDevice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub model_name: String,
}

impl PairedDevice {
    /// Synthetic record that only carries an error code.
    pub fn failure(code: ErrorCode) -> Self {
        Self {
            error_code: Some(code),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_error(mut self, code: ErrorCode) -> Self {
        self.error_code = Some(code);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error_code.is_none()
    }
}

impl From<DeviceRecord> for PairedDevice {
    fn from(r: DeviceRecord) -> Self {
        Self {
            error_code: ErrorCode::parse_wire(&r.error_code),
            device_id: r.device_id,
            name: r.name,
            product_id: r.product_id,
            model_name: r.model_name,
        }
    }
}

/// One decoded status poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingBatchResult {
    pub status_code: String,
    pub success: Vec<PairedDevice>,
    pub failed: Vec<PairedDevice>,
}

impl PairingBatchResult {
    /// Nothing reported yet; the device is still being searched for.
    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.failed.is_empty()
    }
}

impl From<PairingStatus> for PairingBatchResult {
    fn from(status: PairingStatus) -> Self {
        let (success, failed) = status.result.map_or_else(Default::default, |r| {
            (
                r.success.into_iter().map(PairedDevice::from).collect(),
                r.failed.into_iter().map(PairedDevice::from).collect(),
            )
        });
        Self {
            status_code: status.code,
            success,
            failed,
        }
    }
}

/// Split reported successes against the supported product catalog.
///
/// Devices whose product is unknown come back in the first list, tagged
/// [`ErrorCode::NotSupportPairingDevice`]. The rest are passed through.
pub fn partition_supported<S>(
    devices: Vec<PairedDevice>,
    catalog: &std::collections::HashSet<String, S>,
) -> (Vec<PairedDevice>, Vec<PairedDevice>)
where
    S: std::hash::BuildHasher,
{
    let (supported, unsupported): (Vec<_>, Vec<_>) = devices
        .into_iter()
        .partition(|d| catalog.contains(&d.product_id));
    let unsupported = unsupported
        .into_iter()
        .map(|d| d.with_error(ErrorCode::NotSupportPairingDevice))
        .collect();
    (unsupported, supported)
}
