//! Config subcommand handlers.

use std::collections::HashMap;

use dialoguer::{Confirm, Input, Select};

use pairkit_config::{Config, Defaults, Profile, SecretKind};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::{config, output};

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking secrets.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "request_timeout = {}", cfg.defaults.request_timeout);
    let _ = writeln!(out, "pairing_timeout = {}", cfg.defaults.pairing_timeout);
    let _ = writeln!(out, "timeout_margin = {}", cfg.defaults.timeout_margin);

    let mut names: Vec<_> = cfg.profiles.iter().collect();
    names.sort_by(|a, b| a.0.cmp(b.0));
    for (name, p) in names {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref platform) = p.platform {
            let _ = writeln!(out, "platform = \"{platform}\"");
        }
        if p.debug {
            let _ = writeln!(out, "debug = true");
        }
        if let Some(ref home) = p.home_id {
            let _ = writeln!(out, "home_id = \"{home}\"");
        }
        if let Some(ref ssid) = p.ssid {
            let _ = writeln!(out, "ssid = \"{ssid}\"");
        }
        if p.wifi_password.is_some() {
            let _ = writeln!(out, "wifi_password = \"****\"");
        }
        if let Some(ref env) = p.wifi_password_env {
            let _ = writeln!(out, "wifi_password_env = \"{env}\"");
        }
        if p.access_code.is_some() {
            let _ = writeln!(out, "access_code = \"****\"");
        }
        if let Some(ref env) = p.access_code_env {
            let _ = writeln!(out, "access_code_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.pairing_timeout {
            let _ = writeln!(out, "pairing_timeout = {timeout}");
        }
        if let Some(margin) = p.timeout_margin {
            let _ = writeln!(out, "timeout_margin = {margin}");
        }
    }

    out
}

/// Copy of `cfg` with plaintext secrets masked, for structured output.
fn redacted(cfg: &Config) -> Config {
    let mask = |s: &Option<String>| s.as_ref().map(|_| "****".to_owned());
    Config {
        default_profile: cfg.default_profile.clone(),
        defaults: Defaults {
            output: cfg.defaults.output.clone(),
            color: cfg.defaults.color.clone(),
            request_timeout: cfg.defaults.request_timeout,
            pairing_timeout: cfg.defaults.pairing_timeout,
            timeout_margin: cfg.defaults.timeout_margin,
        },
        profiles: cfg
            .profiles
            .iter()
            .map(|(name, p)| {
                let masked = Profile {
                    wifi_password: mask(&p.wifi_password),
                    access_code: mask(&p.access_code),
                    ..p.clone()
                };
                (name.clone(), masked)
            })
            .collect(),
    }
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt(e.to_string())
}

/// Offer to store a secret in the system keyring or return it for the
/// plaintext config.
///
/// Returns `Some(secret)` if the user chose plaintext, `None` if stored in
/// the keyring.
fn prompt_keyring_storage(
    secret: String,
    profile_name: &str,
    kind: SecretKind,
    label: &str,
) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {label}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        pairkit_config::store_secret(profile_name, kind, &secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = pairkit_config::load_config_or_default();
            let out = output::render_single(
                &global.output,
                &redacted(&cfg),
                format_config_redacted,
                |_| "config".into(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", pairkit_config::config_path().display());
            Ok(())
        }
    }
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = pairkit_config::config_path();
    eprintln!("pairkit configuration wizard\n");

    if config_path.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} exists. Add or replace a profile?", config_path.display()))
            .default(true)
            .interact()
            .map_err(prompt_err)?;
        if !overwrite {
            return Ok(());
        }
    }

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Platform
    let platforms = &["Production", "Staging (debug)", "Custom URL"];
    let (platform, debug) = match Select::new()
        .with_prompt("Pairing platform")
        .items(platforms)
        .default(0)
        .interact()
        .map_err(prompt_err)?
    {
        0 => (None, false),
        1 => (None, true),
        _ => {
            let url: String = Input::new()
                .with_prompt("Platform URL")
                .interact_text()
                .map_err(prompt_err)?;
            pairkit_config::parse_platform_url(&url)?;
            (Some(url), false)
        }
    };

    // 3. Home and WiFi defaults
    let home_id: String = Input::new()
        .with_prompt("Home id (blank to always pass --token)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let ssid: String = Input::new()
        .with_prompt("Default WiFi network (blank for none)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    // 4. Secrets
    let wifi_password = match rpassword::prompt_password("WiFi password (blank to skip): ")
        .map_err(prompt_err)?
    {
        pw if pw.is_empty() => None,
        pw => prompt_keyring_storage(pw, &profile_name, SecretKind::WifiPassword, "WiFi password")?,
    };
    let access_code = match rpassword::prompt_password("SDK access code (blank to skip): ")
        .map_err(prompt_err)?
    {
        code if code.is_empty() => None,
        code => prompt_keyring_storage(code, &profile_name, SecretKind::AccessCode, "access code")?,
    };

    // 5. Build profile and config
    let profile = Profile {
        platform,
        debug,
        home_id: optional(&home_id),
        ssid: optional(&ssid),
        wifi_password,
        access_code,
        ..Profile::default()
    };

    let mut cfg = if config_path.exists() {
        pairkit_config::load_config_or_default()
    } else {
        Config {
            default_profile: Some(profile_name.clone()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    };
    cfg.profiles.insert(profile_name.clone(), profile);
    if !cfg.profiles.contains_key(cfg.active_profile_name()) {
        cfg.default_profile = Some(profile_name.clone());
    }

    // 6. Write config
    let path = pairkit_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {}", config::active_profile_name(global, &cfg));
    eprintln!("\n  Test it: pairkit catalog");
    Ok(())
}
