//! Pairing orchestration between the pairing platform, the local radio
//! stack and the host application.
//!
//! - **[`Pairing`]**: Cloneable facade. Every operation is a message to a
//!   single session actor, so pairing state is only ever touched from one
//!   task. Outcomes reach the host through a [`PairingListener`] and the
//!   [`PairingEvent`] broadcast, in the same order.
//!
//! - **Session**: Owns the in-flight attempt: single-flight guard, token
//!   resolution, product filtering, duplicate suppression, sticky success
//!   and the delayed completion summary.
//!
//! - **[`PollTimer`]**: One-second countdown that polls the platform for
//!   API-supplied tokens and decides what an expired attempt reports.
//!
//! - **Collaborators** ([`PairingCloud`], [`RadioStack`],
//!   [`LoginSession`]): Trait seams for the platform, the vendor radio stack and the app's
//!   login state. [`PlatformBackend`] wraps `pairkit-api`.
//!
//! - **Model** ([`model`]): [`PairedDevice`], [`ErrorCode`] and the
//!   pairing modes.

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod pairing;
pub mod qr;
pub mod radio;
mod session;
pub mod timer;
pub mod token;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{LoginSession, PairingCloud, PlatformBackend, RadioStack, RadioStart, StaticLogin};
pub use config::{SessionConfig, TlsVerification};
pub use error::CoreError;
pub use event::{PairingEvent, PairingListener};
pub use model::{ErrorCode, PairedDevice, PairingBatchResult, PairingMode, RadioMode};
pub use pairing::{Pairing, PairingRequest};
pub use qr::qr_payload;
pub use radio::{RadioDevice, RadioEvent, RadioEventSink};
pub use session::SessionStatus;
pub use timer::{PollOutcome, PollReport, PollRequest, PollSnapshot, PollTimer};
pub use token::{PairingToken, decode_polling_token, decode_radio_token};
