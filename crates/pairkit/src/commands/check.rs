//! `pairkit check`: poll pairing status for an API-supplied token.

use crate::cli::{CheckArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;

use super::{follow_attempt, open_session};

pub async fn handle(args: CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.token.trim().is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "must not be empty".into(),
        });
    }

    let resolved = config::resolve(global)?;
    let pairing = open_session(&resolved).await?;
    let events = pairing.events();
    pairing.check_pairing_status(args.token, args.timeout)?;

    let summary = follow_attempt(&pairing, events, global).await;
    pairing.shutdown().await;
    summary?.into_result()
}
