//! `pairkit qr`: print a QR-mode pairing payload, optionally following
//! the attempt it starts.

use serde::Serialize;

use crate::cli::{GlobalOpts, QrArgs};
use crate::error::CliError;
use crate::{config, output};

use super::{follow_attempt, open_session};

#[derive(Debug, Serialize)]
struct QrCode {
    payload: String,
}

pub async fn handle(args: QrArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let ssid = resolved.ssid(args.ssid)?;
    if args.token.is_empty() && resolved.home_id().is_none() {
        return Err(CliError::NoHome {
            profile: resolved.profile_name,
        });
    }
    let password = resolved.wifi_password(args.password)?;

    let pairing = open_session(&resolved).await?;
    let events = pairing.events();
    let payload = match pairing.start_qr_pairing(ssid, password, args.token).await {
        Ok(payload) => payload,
        Err(e) => {
            pairing.shutdown().await;
            return Err(e.into());
        }
    };

    let code = QrCode { payload };
    let out = output::render_single(&global.output, &code, |c| c.payload.clone(), |c| {
        c.payload.clone()
    });
    output::print_output(&out, global.quiet);

    if !args.wait {
        pairing.reset_pairing()?;
        pairing.shutdown().await;
        return Ok(());
    }

    let summary = follow_attempt(&pairing, events, global).await;
    pairing.shutdown().await;
    summary?.into_result()
}
