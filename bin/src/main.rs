//! quilla CLI - Session-aligned OHLCV bar aggregation for futures ticks.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use display::Format;

#[derive(Parser)]
#[command(name = "quilla")]
#[command(about = "Session-aligned OHLCV bar aggregation for futures ticks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate recorded ticks into session-aligned bars
    Aggregate {
        /// Input CSV tick file
        input: PathBuf,

        /// Trading session windows (e.g. "09:00-11:30,13:30-15:00")
        #[arg(short, long)]
        sessions: String,

        /// Trading day the slice table is built for (YYYY-MM-DD).
        /// Defaults to the first tick's trading day.
        #[arg(short, long)]
        date: Option<String>,

        /// Bar interval in seconds
        #[arg(short, long, default_value = "60")]
        interval: i64,

        /// Output file path. Defaults to <input stem>.<format>
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,

        /// Synthesize zero-volume bars for slices with no data
        #[arg(long)]
        gap_fill: bool,
    },

    /// Print the slice table a session schedule produces
    Schedule {
        /// Trading session windows (e.g. "09:00-11:30,13:30-15:00")
        sessions: String,

        /// Trading day to build the table for (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Bar interval in seconds
        #[arg(short, long, default_value = "60")]
        interval: i64,
    },

    /// List supported output formats
    Formats,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Aggregate {
            input,
            sessions,
            date,
            interval,
            output,
            format,
            gap_fill,
        } => commands::aggregate::aggregate(
            &input,
            &sessions,
            date.as_deref(),
            interval,
            output,
            format,
            gap_fill,
        ),
        Commands::Schedule {
            sessions,
            date,
            interval,
        } => commands::schedule::schedule(&sessions, &date, interval),
        Commands::Formats => commands::formats::formats(),
    }
}
