mod device;
mod error_code;

pub use device::{PairedDevice, PairingBatchResult, PairingMode, RadioMode, partition_supported};
pub use error_code::ErrorCode;
