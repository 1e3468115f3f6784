//! # sdv CLI entry point
//!
//! Parses command-line arguments, initialises tracing, and dispatches to
//! subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use sdv_cli::parse_path::{run_parse_path, ParsePathArgs};
use sdv_cli::run::{run_interruptible, RunArgs};
use sdv_cli::EXIT_FATAL;

/// Sample-data conformance harness.
///
/// Checks every sample JSON document under a sample tree against the JSON
/// Schema its location names, and reports samples whose verdict differs from
/// the `shouldPass` / `shouldFail` directory they live in.
#[derive(Parser, Debug)]
#[command(name = "sdv", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check all samples against the schema corpus.
    Run(RunArgs),

    /// Show the identity encoded in sample locations.
    ParsePath(ParsePathArgs),
}

fn init_tracing(verbose: u8, format: LogFormat) {
    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    tracing::debug!("sdv CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Run(args) => run_interruptible(args),
        Commands::ParsePath(args) => {
            let stdout = std::io::stdout();
            run_parse_path(&args, &mut stdout.lock())
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
