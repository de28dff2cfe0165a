//! Resolves the active profile and CLI flag overrides into a
//! `SessionConfig` plus the per-command defaults (home, WiFi network).

use std::io::IsTerminal;
use std::time::Duration;

use secrecy::SecretString;
use tracing::debug;

use pairkit_config::{Config, Profile, SecretKind};
use pairkit_core::{SessionConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a pairing command needs from configuration.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub profile: Profile,
    pub session: SessionConfig,
}

impl Resolved {
    /// Home used for cloud-issued tokens.
    pub fn home_id(&self) -> Option<String> {
        self.profile.home_id.clone().filter(|h| !h.is_empty())
    }

    /// WiFi network to provision: flag, else the profile's.
    pub fn ssid(&self, flag: Option<String>) -> Result<String, CliError> {
        flag.or_else(|| self.profile.ssid.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CliError::Validation {
                field: "ssid".into(),
                reason: "pass --ssid or set ssid in the profile".into(),
            })
    }

    /// WiFi password: flag, then the profile's secret, then an
    /// interactive prompt when stdin is a terminal.
    pub fn wifi_password(&self, flag: Option<String>) -> Result<SecretString, CliError> {
        if let Some(password) = flag {
            return Ok(SecretString::from(password));
        }
        if let Some(secret) =
            pairkit_config::resolve_secret(&self.profile, &self.profile_name, SecretKind::WifiPassword)
        {
            return Ok(secret);
        }
        if std::io::stdin().is_terminal() {
            let password = rpassword::prompt_password("WiFi password: ")?;
            return Ok(SecretString::from(password));
        }
        Err(CliError::MissingSecret {
            secret: "WiFi password".into(),
            profile: self.profile_name.clone(),
        })
    }
}

/// Profile name from `--profile`, else the config's default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| cfg.active_profile_name().to_owned())
}

/// Load config and apply CLI overrides.
///
/// A missing profile is only an error when it was asked for by name;
/// otherwise the built-in defaults apply.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = pairkit_config::load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => {
            debug!(profile = %profile_name, "no profile configured, using defaults");
            Profile::default()
        }
    };

    apply_overrides(&mut profile, global);

    let mut session = pairkit_config::profile_to_session_config(&profile, &profile_name, &cfg.defaults)?;
    if global.insecure {
        session.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        session.request_timeout = Duration::from_secs(secs);
    }
    if let Some(ref code) = global.access_code {
        session.access_code = Some(SecretString::from(code.clone()));
    }

    Ok(Resolved {
        profile_name,
        profile,
        session,
    })
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref platform) = global.platform {
        profile.platform = Some(platform.clone());
    }
    if let Some(ref home) = global.home_id {
        profile.home_id = Some(home.clone());
    }
}
