//! Command handlers and the attempt-following loop they share.

pub mod catalog;
pub mod check;
pub mod config_cmd;
pub mod pair;
pub mod qr;

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use pairkit_core::{PairedDevice, Pairing, PairingEvent, StaticLogin};

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config::Resolved;
use crate::error::{self, CliError};
use crate::output;
use crate::radio::LoggingRadio;

/// Dispatch a command that talks to the platform.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Catalog => catalog::handle(global).await,
        Command::Pair(args) => pair::handle(args, global).await,
        Command::Check(args) => check::handle(args, global).await,
        Command::Qr(args) => qr::handle(args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Config {
            message: "command handled before dispatch".into(),
        }),
    }
}

/// Open a pairing session against the platform and load its catalog.
pub async fn open_session(resolved: &Resolved) -> Result<Pairing, CliError> {
    let login = StaticLogin::new(resolved.home_id());
    let pairing = Pairing::with_platform(
        resolved.session.clone(),
        Arc::new(LoggingRadio),
        Arc::new(login),
    )?;
    let products = pairing.initialize().await?;
    debug!(products, profile = %resolved.profile_name, "session ready");
    Ok(pairing)
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Device ID")]
    device_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Product")]
    product_id: String,
    #[tabled(rename = "Model")]
    model_name: String,
}

impl From<&PairedDevice> for DeviceRow {
    fn from(d: &PairedDevice) -> Self {
        Self {
            status: d
                .error_code
                .map_or_else(|| "paired".into(), |code| code.to_string()),
            device_id: d.device_id.clone(),
            name: d.name.clone(),
            product_id: d.product_id.clone(),
            model_name: d.model_name.clone(),
        }
    }
}

/// Final summary of an attempt, as printed for structured formats.
#[derive(Debug, Default, Serialize)]
pub struct AttemptSummary {
    pub success: Vec<PairedDevice>,
    pub failed: Vec<PairedDevice>,
}

impl AttemptSummary {
    /// Outcome of the attempt as a process result: any paired device is
    /// success, otherwise the first failure decides.
    pub fn into_result(self) -> Result<(), CliError> {
        if !self.success.is_empty() {
            return Ok(());
        }
        match self.failed.iter().find_map(|d| d.error_code) {
            Some(code) => Err(error::from_error_code(code)),
            None => Err(CliError::NoDevicePaired),
        }
    }
}

fn render_summary(format: &OutputFormat, summary: &AttemptSummary) -> String {
    match format {
        OutputFormat::Table | OutputFormat::Plain => {
            let all: Vec<&PairedDevice> = summary.success.iter().chain(&summary.failed).collect();
            output::render_list(
                format,
                &all,
                |d| DeviceRow::from(*d),
                |d| {
                    if d.is_success() {
                        d.device_id.clone()
                    } else {
                        format!("{}\t{}", d.device_id, d.error_code.map(|c| c.code()).unwrap_or_default())
                    }
                },
            )
        }
        _ => output::render_single(format, summary, |_| String::new(), |_| String::new()),
    }
}

fn describe(device: &PairedDevice, color: bool) -> String {
    match device.error_code {
        None => format!(
            "{} {} {}",
            output::paint_ok("✓ paired", color),
            if device.name.is_empty() { &device.device_id } else { &device.name },
            output::paint_dim(&format!("({} / {})", device.device_id, device.product_id), color),
        ),
        Some(code) => {
            let subject = if device.device_id.is_empty() {
                String::new()
            } else {
                format!(" {}", device.device_id)
            };
            format!(
                "{} {code} ({}){subject}",
                output::paint_err("✗ failed", color),
                code.code()
            )
        }
    }
}

// ── Attempt follower ────────────────────────────────────────────────

/// Follow one attempt's events until its completion summary arrives.
///
/// Ctrl-C stops the attempt; the session still delivers the stop failure
/// and the completion. With `json-compact` output every event is streamed
/// to stdout as one JSON line.
pub async fn follow_attempt(
    pairing: &Pairing,
    mut events: broadcast::Receiver<PairingEvent>,
    global: &GlobalOpts,
) -> Result<AttemptSummary, CliError> {
    let color = output::should_color(&global.color);
    let stream = matches!(global.output, OutputFormat::JsonCompact);
    let mut stop_requested = false;

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c(), if !stop_requested => {
                stop_requested = true;
                output::print_progress("stopping...", global.quiet);
                pairing.stop_pairing()?;
                continue;
            }
        };

        let event = match event {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event stream lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return Err(CliError::SessionClosed),
        };

        if stream {
            output::print_output(&output::render_json(&event, true), global.quiet);
        }

        match event {
            PairingEvent::Success { devices } | PairingEvent::Failure { devices } => {
                if !stream {
                    for device in &devices {
                        output::print_progress(&describe(device, color), global.quiet);
                    }
                }
            }
            PairingEvent::Complete { success, failed } => {
                let summary = AttemptSummary { success, failed };
                if !stream {
                    output::print_output(&render_summary(&global.output, &summary), global.quiet);
                }
                return Ok(summary);
            }
        }
    }
}
