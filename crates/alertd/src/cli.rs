//! Clap derive structures for the `alertd` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// alertd -- watch and acknowledge home alert hub alarms
#[derive(Debug, Parser)]
#[command(
    name = "alertd",
    version,
    about = "Watch, acknowledge and resume alert hub alarms",
    long_about = "A command-line client for a home alert hub.\n\n\
        Follows the hub's server-sent event stream, deduplicates motion and\n\
        temperature alarms, and sends acknowledgment and resume commands.",
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
    /// Hub profile to use
    #[arg(long, short = 'p', env = "ALERTD_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Hub base URL (overrides profile)
    #[arg(long, short = 'u', env = "ALERTD_URL", global = true)]
    pub url: Option<String>,

    /// Temperature alarm threshold (overrides profile)
    #[arg(long, env = "ALERTD_THRESHOLD", global = true, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ALERTD_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ALERTD_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ALERTD_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines (default, interactive)
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
    /// Follow the hub's event stream and print alarm state changes
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Acknowledge an active alarm
    Ack(AckArgs),

    /// Resume temperature monitoring after an acknowledgment
    Resume,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit as soon as a motion or temperature alarm becomes active
    #[arg(long)]
    pub until_alarm: bool,

    /// Also print connection status changes
    #[arg(long)]
    pub show_connection: bool,
}

// ── Ack ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AckArgs {
    #[command(subcommand)]
    pub command: AckCommand,
}

#[derive(Debug, Subcommand)]
pub enum AckCommand {
    /// Acknowledge the motion alarm
    Motion,

    /// Acknowledge the temperature alarm and suppress it
    #[command(alias = "temp")]
    Temperature {
        /// Exit right after the acknowledgment instead of waiting to resume
        #[arg(long)]
        no_resume: bool,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// List configured profiles
    Profiles,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
