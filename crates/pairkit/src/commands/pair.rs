//! `pairkit pair`: run one attempt and report devices as they pair.

use pairkit_core::{PairingMode, PairingRequest};
use tracing::info;

use crate::cli::{GlobalOpts, PairArgs};
use crate::config;
use crate::error::CliError;

use super::{follow_attempt, open_session};

pub async fn handle(args: PairArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let ssid = resolved.ssid(args.ssid)?;
    let mode = PairingMode::from(args.mode);

    // A cloud-issued token needs a home to issue it for.
    if args.token.is_empty() && resolved.home_id().is_none() {
        return Err(CliError::NoHome {
            profile: resolved.profile_name,
        });
    }
    let password = resolved.wifi_password(args.password)?;

    let mut request = PairingRequest::new(ssid, password)
        .with_token(args.token)
        .with_mode(mode);
    if let Some(secs) = args.timeout {
        request = request.with_timeout(secs);
    }
    if let Some(secs) = args.margin {
        request = request.with_margin(secs);
    }

    let pairing = open_session(&resolved).await?;
    let events = pairing.events();
    pairing.start_pairing(request)?;
    info!(%mode, "pairing started");

    let summary = follow_attempt(&pairing, events, global).await;
    pairing.shutdown().await;
    summary?.into_result()
}
