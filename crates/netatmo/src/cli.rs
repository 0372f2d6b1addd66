//! Clap derive structures for the `netatmo-ws` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// Version with build target and module kinds, as written by build.rs.
const LONG_VERSION: &str = match option_env!("NETATMO_WS_LONG_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// netatmo-ws -- poll a Netatmo weather station and publish its readings
#[derive(Debug, Parser)]
#[command(
    name = "netatmo-ws",
    version,
    long_version = LONG_VERSION,
    about = "Poll Netatmo weather stations from the command line",
    long_about = "Logs into the Netatmo cloud, classifies every module of a weather\n\
        station (main, indoor, outdoor, wind, rain) and publishes converted\n\
        driver values (Fahrenheit, inHg, trend codes) on an interval.",
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
    /// Station profile to use
    #[arg(long, short = 'p', env = "NETATMO_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "NETATMO_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Station name or id (overrides profile)
    #[arg(long, short = 's', env = "NETATMO_STATION", global = true)]
    pub station: Option<String>,

    /// Output format (defaults to the config file's, then table)
    #[arg(long, short = 'o', env = "NETATMO_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "NETATMO_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "NETATMO_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

impl GlobalOpts {
    pub fn output_format(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }
}

// ── Output, Color & Log Enums ────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
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

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the station until interrupted
    Run(RunArgs),

    /// Log in, classify the station's modules and list them
    #[command(alias = "disc")]
    Discover,

    /// Log in and print every module's converted readings
    #[command(alias = "q")]
    Query(QueryArgs),

    /// Print the node definitions (drivers and units) per module kind
    Profile,

    /// Manage CLI configuration and secrets
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Time between polls, e.g. "60s" or "5m" (overrides profile)
    #[arg(long, short = 'i', value_parser = parse_interval)]
    pub interval: Option<Duration>,

    /// Re-read the config file and credentials this often, e.g. "5m".
    /// SIGHUP always triggers a re-read.
    #[arg(long, value_parser = parse_interval)]
    pub reload_interval: Option<Duration>,
}

fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".into());
    }
    Ok(interval)
}

// ── Query ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Only show this module (name or address)
    pub module: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the loaded configuration (secrets masked)
    Show,

    /// Store a secret for the active profile in the system keyring
    SetSecret(SetSecretArgs),
}

#[derive(Debug, Args)]
pub struct SetSecretArgs {
    /// Which secret to store
    pub secret: SecretKind,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SecretKind {
    /// Netatmo account password
    Password,
    /// OAuth application client secret
    ClientSecret,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
