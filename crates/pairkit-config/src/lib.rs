//! Configuration for the pairkit CLI.
//!
//! TOML profiles, secret resolution (env var, OS keyring, plaintext) and
//! translation to `pairkit_core::SessionConfig`. The CLI layers its own
//! flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use pairkit_core::config::{DEBUG_PLATFORM_URL, DEFAULT_PLATFORM_URL};
use pairkit_core::{SessionConfig, TlsVerification};

/// Keyring service name secrets are stored under.
pub const KEYRING_SERVICE: &str = "pairkit";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {secret} configured for profile '{profile}'")]
    MissingSecret { secret: String, profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named platform profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Overall pairing timeout in seconds.
    #[serde(default = "default_pairing_timeout")]
    pub pairing_timeout: u32,

    /// Seconds before the deadline at which the radio stack stops.
    #[serde(default)]
    pub timeout_margin: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            request_timeout: default_request_timeout(),
            pairing_timeout: default_pairing_timeout(),
            timeout_margin: 0,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_pairing_timeout() -> u32 {
    SessionConfig::DEFAULT_PAIRING_TIMEOUT_SECS
}

/// A named platform profile.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Platform base URL. Overrides `debug` when set.
    pub platform: Option<String>,

    /// Use the staging platform instead of production.
    #[serde(default)]
    pub debug: bool,

    /// Home the platform issues pairing tokens for.
    pub home_id: Option<String>,

    /// Default WiFi network to provision devices onto.
    pub ssid: Option<String>,

    /// WiFi password (plaintext; prefer keyring or env var).
    pub wifi_password: Option<String>,

    /// Environment variable name holding the WiFi password.
    pub wifi_password_env: Option<String>,

    /// SDK access code (plaintext; prefer keyring or env var).
    pub access_code: Option<String>,

    /// Environment variable name holding the access code.
    pub access_code_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    /// Override the request timeout.
    pub request_timeout: Option<u64>,

    /// Override the pairing timeout.
    pub pairing_timeout: Option<u32>,

    /// Override the timeout margin.
    pub timeout_margin: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "pairkit", "pairkit").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pairkit");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path`, with `PAIRKIT_` environment overrides.
///
/// Nested keys use a double underscore, e.g. `PAIRKIT_DEFAULTS__OUTPUT`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PAIRKIT_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret resolution ───────────────────────────────────────────────

/// Secrets a profile can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    WifiPassword,
    AccessCode,
}

impl SecretKind {
    fn keyring_suffix(self) -> &'static str {
        match self {
            Self::WifiPassword => "wifi-password",
            Self::AccessCode => "access-code",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::WifiPassword => "WiFi password",
            Self::AccessCode => "access code",
        }
    }
}

/// Resolve a secret: profile env var, then OS keyring, then plaintext.
pub fn resolve_secret(
    profile: &Profile,
    profile_name: &str,
    kind: SecretKind,
) -> Option<SecretString> {
    let (env_name, plaintext) = match kind {
        SecretKind::WifiPassword => (&profile.wifi_password_env, &profile.wifi_password),
        SecretKind::AccessCode => (&profile.access_code_env, &profile.access_code),
    };

    // 1. Profile's *_env → env var lookup
    if let Some(env_name) = env_name {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Some(secret) = keyring_lookup(profile_name, kind) {
        return Some(secret);
    }

    // 3. Plaintext in config
    plaintext.clone().map(SecretString::from)
}

/// Like [`resolve_secret`] but missing is an error.
pub fn require_secret(
    profile: &Profile,
    profile_name: &str,
    kind: SecretKind,
) -> Result<SecretString, ConfigError> {
    resolve_secret(profile, profile_name, kind).ok_or_else(|| ConfigError::MissingSecret {
        secret: kind.label().into(),
        profile: profile_name.into(),
    })
}

/// Store a secret in the OS keyring for a profile.
pub fn store_secret(profile_name: &str, kind: SecretKind, value: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name, kind))?;
    entry.set_password(value)?;
    Ok(())
}

fn keyring_lookup(profile_name: &str, kind: SecretKind) -> Option<SecretString> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name, kind)).ok()?;
    entry.get_password().ok().map(SecretString::from)
}

fn keyring_user(profile_name: &str, kind: SecretKind) -> String {
    format!("{profile_name}/{}", kind.keyring_suffix())
}

// ── Translation to SessionConfig ────────────────────────────────────

/// Platform URL for a profile: explicit override, else debug or
/// production.
pub fn platform_url(profile: &Profile) -> Result<Url, ConfigError> {
    let raw = profile.platform.as_deref().unwrap_or(if profile.debug {
        DEBUG_PLATFORM_URL
    } else {
        DEFAULT_PLATFORM_URL
    });
    parse_platform_url(raw)
}

/// Parse a platform URL, making sure it ends with a slash so relative
/// endpoint paths join below it.
pub fn parse_platform_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url: Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "platform".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Build a `SessionConfig` from a profile and global defaults.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let pairing_timeout = profile.pairing_timeout.unwrap_or(defaults.pairing_timeout);
    let margin = profile.timeout_margin.unwrap_or(defaults.timeout_margin);
    if margin >= pairing_timeout {
        return Err(ConfigError::Validation {
            field: "timeout_margin".into(),
            reason: format!("{margin}s must be shorter than the pairing timeout ({pairing_timeout}s)"),
        });
    }

    let mut config = SessionConfig::new(platform_url(profile)?);
    config.tls = tls;
    config.request_timeout =
        Duration::from_secs(profile.request_timeout.unwrap_or(defaults.request_timeout));
    config.pairing_timeout_secs = pairing_timeout;
    config.timeout_margin_secs = margin;
    config.access_code = resolve_secret(profile, profile_name, SecretKind::AccessCode);
    Ok(config)
}
