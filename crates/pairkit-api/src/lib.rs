// pairkit-api: Async Rust client for the device pairing platform
//
// Three endpoints matter to pairing: the supported product catalog,
// pairing token issuance for a home, and the per-token pairing status
// that the poll timer hits once a second.

pub mod error;
pub mod platform;
pub mod transport;

pub use error::Error;
pub use platform::PlatformClient;
pub use platform::models::{
    DeviceRecord, PairingStatus, PairingStatusResult, PlatformResponse, ProductIdList,
};
pub use transport::{ACCESS_CODE_HEADER, TlsMode, TransportConfig};
