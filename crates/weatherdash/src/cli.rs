//! Clap derive structures for the `weatherdash` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use weatherdash_core::{MetricType, ModuleKind, Timelapse};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// weatherdash -- Netatmo weather station dashboard for the terminal
#[derive(Debug, Parser)]
#[command(
    name = "weatherdash",
    version,
    about = "Read your Netatmo weather station from the command line",
    long_about = "Signs in to the Netatmo API, keeps the session alive with refresh\n\
        tokens stored in the system keyring, and renders current station\n\
        readings and historical measurements.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "WEATHERDASH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WEATHERDASH_OUTPUT",
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

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "WEATHERDASH_TIMEOUT", global = true)]
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with your Netatmo account
    Login(LoginArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show current readings of every module
    #[command(alias = "st")]
    Station(StationArgs),

    /// Show historical measurements of one module
    #[command(alias = "m")]
    Measure(MeasureArgs),

    /// Re-fetch station readings on an interval until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account e-mail (prompted when missing)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Account password (prompted when missing)
    #[arg(long, env = "WEATHERDASH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

// ── Station ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StationArgs {
    /// Show the details of a single module (main, outdoor, wind, rain, indoor)
    #[arg(long, short = 'm')]
    pub module: Option<ModuleKind>,
}

// ── Measure ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MeasureArgs {
    /// Module kind (main, outdoor, wind, rain, indoor) or module id
    #[arg(long, short = 'm', default_value = "main")]
    pub module: String,

    /// Metrics to fetch, comma separated
    #[arg(
        long,
        short = 't',
        value_delimiter = ',',
        default_values = ["temperature", "humidity"]
    )]
    pub metrics: Vec<MetricType>,

    /// Time range: 12h, 1d or 1m
    #[arg(long, short = 'r', default_value = "1d")]
    pub range: Timelapse,

    /// Only show the N most recent samples
    #[arg(long, short = 'n')]
    pub last: Option<usize>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Time between refreshes (e.g. 30s, 5m)
    #[arg(long, short = 'i', default_value = "5m")]
    pub interval: humantime::Duration,

    /// Stop after this many refreshes
    #[arg(long, short = 'c')]
    pub count: Option<u32>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the OAuth client secret in the system keyring
    SetSecret {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn measure_defaults() {
        let cli = Cli::try_parse_from(["weatherdash", "measure"]).unwrap();
        let Command::Measure(args) = cli.command else {
            panic!("expected measure command");
        };
        assert_eq!(args.module, "main");
        assert_eq!(args.metrics, vec![MetricType::Temperature, MetricType::Humidity]);
        assert_eq!(args.range, Timelapse::OneDay);
    }

    #[test]
    fn measure_parses_metric_list_and_range() {
        let cli = Cli::try_parse_from([
            "weatherdash",
            "measure",
            "--module",
            "outdoor",
            "--metrics",
            "temperature,co2",
            "--range",
            "12h",
        ])
        .unwrap();
        let Command::Measure(args) = cli.command else {
            panic!("expected measure command");
        };
        assert_eq!(args.metrics, vec![MetricType::Temperature, MetricType::Co2]);
        assert_eq!(args.range, Timelapse::TwelveHours);
    }

    #[test]
    fn unknown_metric_is_rejected() {
        assert!(Cli::try_parse_from(["weatherdash", "measure", "-t", "sunshine"]).is_err());
    }

    #[test]
    fn watch_interval_uses_humantime() {
        let cli = Cli::try_parse_from(["weatherdash", "watch", "-i", "90s"]).unwrap();
        let Command::Watch(args) = cli.command else {
            panic!("expected watch command");
        };
        assert_eq!(*args.interval, std::time::Duration::from_secs(90));
    }
}
