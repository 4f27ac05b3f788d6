//! Clap derive structures for the `skysync` CLI.
//!
//! Kept free of workspace crates so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// skysync -- keep SkySpark in step with FlightDeck
#[derive(Debug, Parser)]
#[command(
    name = "skysync",
    version,
    about = "Sync FlightDeck point inventories into SkySpark",
    long_about = "Reconciles sites, equipment and points from ACE FlightDeck into a\n\
        SkySpark project. Runs are idempotent: SkySpark ids are written back to\n\
        FlightDeck as haystackRef tags and reused on the next run.",
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
    /// Path to the .env file with configuration [default: .env]
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Logging level (overrides ACE_SKYSPARK_CLI_LOG_LEVEL; RUST_LOG wins over both)
    #[arg(long, global = true, ignore_case = true)]
    pub log_level: Option<LogLevelArg>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Output format for results
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Summary tables
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevelArg {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobFormatArg {
    Yaml,
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Synchronize sites, equipment and points for one site
    Sync(SyncArgs),

    /// Rebuild FlightDeck references from points already in SkySpark
    #[command(name = "sync-refs-from-skyspark")]
    SyncRefs(SyncRefsArgs),

    /// Copy FlightDeck history into SkySpark for synced points
    WriteHistory(WriteHistoryArgs),

    /// Report entities whose timezone differs from the project's
    CheckTimezones(CheckTimezonesArgs),

    /// Show version and the active configuration
    Version,

    /// Write a template .env file
    Init(InitArgs),

    /// Run or generate saved job files
    Job(JobArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// FlightDeck site name (falls back to FLIGHTDECK_SITE)
    #[arg(long)]
    pub site: Option<String>,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Only sync the first N points, sorted by name
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,

    /// Include points not configured for collection
    #[arg(long)]
    pub sync_all: bool,

    /// Entities per SkySpark commit
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SyncRefsArgs {
    /// Only recover points belonging to this FlightDeck site
    #[arg(long)]
    pub site: Option<String>,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct WriteHistoryArgs {
    /// FlightDeck site name (falls back to FLIGHTDECK_SITE)
    #[arg(long)]
    pub site: Option<String>,

    /// Range start: RFC 3339 or YYYY-MM-DD
    #[arg(long)]
    pub start: String,

    /// Range end: RFC 3339 or YYYY-MM-DD (inclusive day)
    #[arg(long)]
    pub end: String,

    /// Only process the first N points, sorted by name
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,

    /// Samples per hisWrite call
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: Option<u64>,

    /// Report what would be written without writing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct CheckTimezonesArgs {
    /// Restrict the audit to one SkySpark site (refName or dis)
    #[arg(long)]
    pub site: Option<String>,

    /// Attempt to fix mismatches (not supported by SkySpark)
    #[arg(long)]
    pub fix: bool,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing .env file
    #[arg(long)]
    pub force: bool,
}

// ── Jobs ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct JobArgs {
    #[command(subcommand)]
    pub command: JobCommand,
}

#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// Run every section of a job file in order
    Run {
        /// Job file (.yaml, .yml or .json)
        file: PathBuf,

        /// Force dry-run for every section
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a job file template
    Template {
        #[arg(long, default_value = "yaml")]
        format: JobFormatArg,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
