mod classify;
mod config;
mod discover;
mod patterns;
mod processor;
mod report;
mod scan;
mod session;
mod summary;
mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Extracts network-performance indicators from backup component log files
/// (backup server, proxy, repository, WAN accelerator) and aggregates them
/// into a per-session CSV report.
#[derive(Parser, Debug)]
#[command(name = "netperf-scan", version, about)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "netperf.toml")]
    config: PathBuf,

    /// Extra logging (pattern matches, per-file details)
    #[arg(short, long)]
    verbose: bool,

    /// Only errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse logs and write the CSV report
    Scan {
        /// Log file or directory to scan
        #[arg(short, long)]
        input: PathBuf,

        /// Report path (default: <FOLDERNAME>.CSV in the output directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show lines matching a known metric pattern (quick check)
    Validate {
        /// Log file or directory to check
        #[arg(short, long)]
        input: PathBuf,

        /// Stop after this many matching lines
        #[arg(long, default_value_t = 40)]
        limit: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = match config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Scan { input, out } => scan::handle_scan(&input, out.as_deref(), &config)
            .map(|summary| println!("{summary}"))
            .map_err(|e| e.to_string()),
        Command::Validate { input, limit } => validate::handle_validate(&input, limit, &config)
            .map(|_| ())
            .map_err(|e| e.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
