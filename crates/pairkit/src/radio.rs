//! Radio collaborator for the CLI.
//!
//! A terminal has no WiFi provisioning radio, so this stack only logs.
//! Devices are provisioned by other means and confirmed through the
//! platform's status endpoint.

use pairkit_core::{RadioStack, RadioStart};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct LoggingRadio;

impl RadioStack for LoggingRadio {
    fn start(&self, request: RadioStart) {
        info!(
            mode = %request.mode,
            ssid = %request.ssid,
            timeout_secs = request.timeout.as_secs(),
            "radio start requested (no local radio)"
        );
    }

    fn stop(&self) {
        debug!("radio stop requested (no local radio)");
    }
}
