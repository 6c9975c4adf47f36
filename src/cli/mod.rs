//! CLI argument parsing for batchkit.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use batchkit::logging::LogLevel;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Batchkit: run scheduled programs as single-instance, suppressible, logged jobs.
///
/// State lives under the application's config directory:
/// - jobs/<mnemonic>.pid holds the pid of the running instance
/// - suppress/name-<x>.suppress flags disable runs
/// - main.yml supplies defaults, overridden by BATCHKIT_* variables and flags
#[derive(Parser, Debug)]
#[command(name = "batchkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Application name; selects the default config and log directories.
    #[arg(long, global = true, default_value = "batchkit")]
    pub app: String,

    /// Config root (holds jobs/, suppress/ and main.yml).
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Config file to load instead of <config root>/main.yml. Must exist.
    #[arg(long, global = true, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Minimum log level: debug, info, warning, error, critical or 10-50.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Do not log to stderr.
    #[arg(long, global = true)]
    pub no_console_log: bool,

    /// Do not log to a file.
    #[arg(long, global = true)]
    pub no_file_log: bool,

    /// Directory for log files.
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Available commands for batchkit.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command as a single-instance job.
    ///
    /// Takes the job lock, checks suppression flags, runs the command and
    /// releases the lock. Exits 4 if another instance holds the lock.
    Run(RunArgs),

    /// Job lock management commands.
    Lock(LockCommand),

    /// Suppression flag commands.
    Suppress(SuppressCommand),

    /// Configuration commands.
    Config(ConfigCommand),
}

/// Arguments for the `run` command.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Job mnemonic; instances with different mnemonics run independently.
    #[arg(short, long)]
    pub mnemonic: Option<String>,

    /// Seconds to wait for a running instance to finish.
    #[arg(long, value_name = "SECS")]
    pub wait: Option<u64>,

    /// Hold the lock for this many seconds instead of running a command.
    #[arg(long, value_name = "SECS", conflicts_with_all = ["exec", "command"])]
    pub hold: Option<u64>,

    /// Exit 0 instead of 4 when another instance holds the lock.
    #[arg(long)]
    pub busy_ok: bool,

    /// Name checked against suppression flags (name-<NAME>.suppress).
    #[arg(long, value_name = "NAME")]
    pub suppress_name: Option<String>,

    /// Command line to run, split with shell quoting rules.
    #[arg(long, value_name = "CMD", conflicts_with = "command")]
    pub exec: Option<String>,

    /// Command and arguments to run.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all job locks with owner pid and age.
    List(LockListArgs),

    /// Show the lock state of one job.
    Status(LockStatusArgs),

    /// Remove a job lock.
    ///
    /// A lock held by a running process is only removed with --force.
    Clear(LockClearArgs),
}

/// Arguments for the `lock list` command.
#[derive(Parser, Debug)]
pub struct LockListArgs {
    /// Print JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `lock status` command.
#[derive(Parser, Debug)]
pub struct LockStatusArgs {
    /// Job mnemonic (default: the configured mnemonic).
    #[arg(short, long)]
    pub mnemonic: Option<String>,

    /// Print JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Job mnemonic (default: the configured mnemonic).
    #[arg(short, long)]
    pub mnemonic: Option<String>,

    /// Remove the lock even if its owner is still running.
    #[arg(long)]
    pub force: bool,
}

/// Suppression subcommands.
#[derive(Parser, Debug)]
pub struct SuppressCommand {
    #[command(subcommand)]
    pub action: SuppressAction,
}

/// Available suppression actions. Omitting NAME means "all".
#[derive(Subcommand, Debug)]
pub enum SuppressAction {
    /// List suppression flags.
    List,

    /// Report whether NAME is suppressed.
    Check { name: Option<String> },

    /// Suppress NAME.
    Add { name: Option<String> },

    /// Lift the suppression of NAME.
    Remove { name: Option<String> },
}

/// Configuration subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Available configuration actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the merged configuration and where each value came from.
    Show,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
