//! techlib CLI: technology library specialization and characterization.
//!
//! Provides `techlib specialize` to list the specializations a technology
//! document expands to, and `techlib characterize` to measure them through
//! the configured synthesis backend.

#![warn(missing_docs)]

mod characterize;
mod pipeline;
mod specialize;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// techlib: characterize technology libraries for high-level synthesis.
#[derive(Parser, Debug)]
#[command(name = "techlib", version, about = "Technology library characterization")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Raise log verbosity (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to a custom `techlib.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the specializations of a technology document.
    Specialize(SpecializeArgs),
    /// Characterize cells through the configured backend.
    Characterize(CharacterizeArgs),
}

/// Arguments for the `techlib specialize` subcommand.
#[derive(Parser, Debug)]
pub struct SpecializeArgs {
    /// Technology document to expand.
    pub technology: PathBuf,

    /// Only list units of this library.
    #[arg(short, long)]
    pub library: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `techlib characterize` subcommand.
#[derive(Parser, Debug)]
pub struct CharacterizeArgs {
    /// Technology document holding the templates and reference cells.
    pub technology: PathBuf,

    /// Cells to characterize: `all` or `component-cell,component-cell,...`.
    #[arg(long, default_value = "all")]
    pub cells: String,

    /// Output document (default: `run.output` from the configuration).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Concurrent synthesis jobs (default: `run.workers`).
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Summary format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Summary output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Log verbosity level.
    pub verbose: u8,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    pipeline::init_logging(&global);

    let result = match cli.command {
        Command::Specialize(ref args) => specialize::run(args, &global),
        Command::Characterize(ref args) => characterize::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
