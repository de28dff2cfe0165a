//! Clap derive structures for the `pairkit` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

use pairkit_core::PairingMode;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pairkit -- pair WiFi devices through the pairkit platform
#[derive(Debug, Parser)]
#[command(
    name = "pairkit",
    version,
    about = "Pair WiFi devices through the pairkit platform",
    long_about = "Drives a pairing session against the pairkit platform.\n\n\
        Loads the supported product catalog, polls pairing status for a\n\
        token and reports every paired or failed device as it arrives.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Platform profile to use
    #[arg(long, short = 'p', env = "PAIRKIT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Platform base URL (overrides profile)
    #[arg(long, env = "PAIRKIT_PLATFORM", global = true)]
    pub platform: Option<String>,

    /// Home the platform issues pairing tokens for
    #[arg(long, env = "PAIRKIT_HOME_ID", global = true)]
    pub home_id: Option<String>,

    /// SDK access code sent with every platform request
    #[arg(long, env = "PAIRKIT_ACCESS_CODE", global = true, hide_env = true)]
    pub access_code: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PAIRKIT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "PAIRKIT_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "PAIRKIT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ModeArg {
    /// Device hotspot mode
    #[default]
    Ap,
    /// Broadcast mode; keeps reporting devices until the timeout
    Ez,
    /// QR code mode
    Qr,
}

impl From<ModeArg> for PairingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Ap => Self::Ap,
            ModeArg::Ez => Self::Ez,
            ModeArg::Qr => Self::Qr,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the product ids the platform can pair
    #[command(alias = "products")]
    Catalog,

    /// Run a pairing attempt and report devices as they pair
    Pair(PairArgs),

    /// Poll pairing status for an existing token
    Check(CheckArgs),

    /// Print the payload for a QR-mode pairing code
    Qr(QrArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Pairing ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PairArgs {
    /// WiFi network to provision (defaults to the profile's ssid)
    #[arg(long)]
    pub ssid: Option<String>,

    /// WiFi password (defaults to the profile's secret, else prompts)
    #[arg(long, env = "PAIRKIT_WIFI_PASSWORD", hide_env = true)]
    pub password: Option<String>,

    /// API-supplied pairing token; empty asks the platform for one
    #[arg(long, default_value = "")]
    pub token: String,

    /// Overall timeout in seconds
    #[arg(long)]
    pub timeout: Option<u32>,

    /// Seconds before the deadline at which the radio stops
    #[arg(long)]
    pub margin: Option<u32>,

    /// Pairing mode
    #[arg(long, value_enum, default_value = "ap")]
    pub mode: ModeArg,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// API-supplied pairing token
    #[arg(long)]
    pub token: String,

    /// Timeout in seconds
    #[arg(long)]
    pub timeout: Option<u32>,
}

#[derive(Debug, Args)]
pub struct QrArgs {
    /// WiFi network to provision (defaults to the profile's ssid)
    #[arg(long)]
    pub ssid: Option<String>,

    /// WiFi password (defaults to the profile's secret, else prompts)
    #[arg(long, env = "PAIRKIT_WIFI_PASSWORD", hide_env = true)]
    pub password: Option<String>,

    /// API-supplied pairing token; empty asks the platform for one
    #[arg(long, default_value = "")]
    pub token: String,

    /// Keep running and report devices once the code is printed
    #[arg(long)]
    pub wait: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Display the current configuration (secrets redacted)
    Show,

    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pair_defaults_to_ap_with_empty_token() {
        let cli = Cli::try_parse_from(["pairkit", "pair", "--ssid", "home"]).unwrap_or_else(|e| {
            panic!("parse failed: {e}");
        });
        let Command::Pair(args) = cli.command else {
            panic!("expected pair");
        };
        assert!(args.token.is_empty());
        assert!(matches!(args.mode, ModeArg::Ap));
        assert_eq!(PairingMode::from(ModeArg::Ez), PairingMode::Ez);
    }
}
