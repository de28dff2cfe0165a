// ── Pairing error taxonomy ──
//
// Closed set of numeric codes carried inside failure records. The numbers
// are part of the wire contract with the platform and with SDK callers.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use super::device::PairingMode;

/// Why a pairing attempt, or one device within it, failed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(into = "u32", from = "u32")]
pub enum ErrorCode {
    // ── Initialization ───────────────────────────────────────────────
    /// The supported product catalog has not been loaded.
    NotInitialize,
    /// The platform failed while loading the catalog.
    InternalServerError,

    // ── Token ────────────────────────────────────────────────────────
    /// No home is selected, so no token can be issued.
    AutoPairingFailInitial,
    /// The platform issued an empty token.
    AutoPairingTokenEmpty,
    /// The token request itself failed.
    AutoPairingTokenFail,
    /// An API-supplied token is not a base64 `region-secret-token` triple.
    PairingTokenParsingError,

    // ── Radio stack ──────────────────────────────────────────────────
    /// The radio stack reported an error for a discovered device.
    AutoPairingFail,
    /// The radio stack timed out.
    AutoPairingFailTimeout,
    /// The radio stack reported an unrecognized error.
    AutoPairingFailUnknown,

    // ── Single-flight guard ──────────────────────────────────────────
    ProcessingPairingApMode,
    ProcessingPairingEzMode,
    ProcessingPairingQrMode,

    // ── Outcomes ─────────────────────────────────────────────────────
    /// The caller stopped the attempt.
    StopProcessingPairing,
    /// Polling ran out of time without seeing a device.
    NotFoundPairingDevice,
    /// A device paired but its product is not in the catalog.
    NotSupportPairingDevice,
    /// The platform reported a failed device without a code.
    MainPairingException,
    /// The status endpoint misbehaved.
    MainPairingApiException,

    // ── Platform status codes ────────────────────────────────────────
    /// The polling token expired on the platform side.
    DeviceTokenExpired,
    /// The platform rejected the status request as malformed.
    CheckReqInformation,

    /// Fallback for numeric codes outside this table.
    Unknown,
}

impl ErrorCode {
    /// Numeric wire value.
    pub const fn code(self) -> u32 {
        match self {
            Self::NotInitialize => 1000,
            Self::InternalServerError => 1001,
            Self::AutoPairingFailInitial => 2000,
            Self::AutoPairingTokenEmpty => 2001,
            Self::AutoPairingTokenFail => 2002,
            Self::PairingTokenParsingError => 2003,
            Self::AutoPairingFail => 2100,
            Self::AutoPairingFailTimeout => 2101,
            Self::AutoPairingFailUnknown => 2102,
            Self::ProcessingPairingApMode => 3000,
            Self::ProcessingPairingEzMode => 3001,
            Self::ProcessingPairingQrMode => 3002,
            Self::StopProcessingPairing => 3100,
            Self::NotFoundPairingDevice => 4000,
            Self::NotSupportPairingDevice => 4001,
            Self::MainPairingException => 5000,
            Self::MainPairingApiException => 5001,
            Self::DeviceTokenExpired => 6001,
            Self::CheckReqInformation => 6002,
            Self::Unknown => 9999,
        }
    }

    /// Look up a known numeric code.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::iter().find(|c| c.code() == code)
    }

    /// Parse the string form used in wire records.
    ///
    /// Empty means "no error". Anything that is not a known number maps
    /// to [`ErrorCode::Unknown`].
    pub fn parse_wire(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(
            raw.parse::<u32>()
                .ok()
                .and_then(Self::from_code)
                .unwrap_or(Self::Unknown),
        )
    }

    /// The "already processing" code for a pairing mode.
    pub const fn processing_for(mode: PairingMode) -> Self {
        match mode {
            PairingMode::Ap => Self::ProcessingPairingApMode,
            PairingMode::Ez => Self::ProcessingPairingEzMode,
            PairingMode::Qr => Self::ProcessingPairingQrMode,
        }
    }

    /// Platform status codes that end a polling attempt early.
    pub fn terminal_status(status_code: &str) -> Option<Self> {
        match Self::parse_wire(status_code)? {
            code @ (Self::DeviceTokenExpired | Self::CheckReqInformation) => Some(code),
            _ => None,
        }
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        Self::from_code(code).unwrap_or(Self::Unknown)
    }
}
