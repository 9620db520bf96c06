//! CLI argument definitions for the CRF metadata engine.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "crf-metadata",
    version,
    about = "Decide which CRFs and requisitions are required at a subject visit",
    long_about = "Evaluate BCPP rule groups against a subject's visit history.\n\n\
                  Reads a JSON history document (subjects, visits, recorded values)\n\
                  and reports the REQUIRED / NOT_REQUIRED state of each target."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Engine configuration (TOML); built-in defaults when omitted.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log subject identifiers instead of redacting them.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the registered rule groups.
    Groups,

    /// Evaluate rule groups at one visit.
    Evaluate(EvaluateArgs),

    /// Show the derived HIV / ART status at every visit of a subject.
    Status(StatusArgs),
}

#[derive(Args)]
pub struct HistoryArgs {
    /// JSON history document.
    #[arg(long = "history", value_name = "FILE")]
    pub history: PathBuf,

    /// Subject identifier.
    #[arg(long = "subject", value_name = "ID")]
    pub subject: String,
}

#[derive(Args)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub history: HistoryArgs,

    /// Visit code (e.g. T0).
    #[arg(long = "visit", value_name = "CODE")]
    pub visit: String,

    /// Evaluate one rule group.
    #[arg(long = "group", value_name = "NAME", conflicts_with = "source")]
    pub group: Option<String>,

    /// Evaluate every group triggered by this form (default: subjectvisit).
    #[arg(long = "source", value_name = "MODEL")]
    pub source: Option<String>,

    /// Print metadata entries as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub history: HistoryArgs,

    /// Print snapshots as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
