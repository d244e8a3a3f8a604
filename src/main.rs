//! Sentinel CLI - Command-line interface for running and inspecting matches.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{ArgAction, Parser, Subcommand};
use sentinel::strategies::StrategyKind;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Sentinel - A deterministic two-team tower-defense engine
#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a single match between two stock strategies
    Run {
        /// BLUE strategy (idle, defender, rusher, farmer)
        blue: StrategyKind,

        /// RED strategy (idle, defender, rusher, farmer)
        red: StrategyKind,

        /// Map generation seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Map file (JSON) instead of a generated map
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Generated map width
        #[arg(long, default_value = "24")]
        width: u32,

        /// Generated map height
        #[arg(long, default_value = "12")]
        height: u32,

        /// Turn limit (overrides the config file)
        #[arg(short, long)]
        turns: Option<u32>,

        /// Match config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Save replay log to file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Suppress progress messages
        #[arg(short, long)]
        quiet: bool,
    },

    /// Inspect or verify a saved replay
    Replay {
        /// Replay log file (JSON)
        #[arg(required = true)]
        recording: PathBuf,

        /// Show the state at the start of this tick
        #[arg(short, long)]
        tick: Option<u32>,

        /// Re-simulate the match and check it reproduces the recorded result
        #[arg(long)]
        verify: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Run many seeded matches in parallel and aggregate statistics
    Tournament {
        /// Entrants (2 or more); every ordered pair plays in turn
        #[arg(required = true, num_args = 2..)]
        strategies: Vec<StrategyKind>,

        /// Number of games to run
        #[arg(short, long, default_value = "1000")]
        games: u64,

        /// Starting seed (increments for each game)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Turn limit per game
        #[arg(short, long)]
        turns: Option<u32>,

        /// Generated map width
        #[arg(long, default_value = "24")]
        width: u32,

        /// Generated map height
        #[arg(long, default_value = "12")]
        height: u32,

        /// Match config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format: text, json, or csv
        #[arg(short, long, default_value = "text")]
        format: cli::TournamentFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Run {
            blue,
            red,
            seed,
            map,
            width,
            height,
            turns,
            config,
            format,
            save,
            quiet,
        } => cli::run::execute(
            blue,
            red,
            seed,
            map,
            (width, height),
            turns,
            config,
            format,
            save,
            quiet,
        ),

        Commands::Replay {
            recording,
            tick,
            verify,
            format,
        } => cli::replay::execute(recording, tick, verify, format),

        Commands::Tournament {
            strategies,
            games,
            seed,
            threads,
            turns,
            width,
            height,
            config,
            format,
            progress,
        } => cli::tournament::execute(
            strategies,
            games,
            seed,
            threads,
            turns,
            (width, height),
            config,
            format,
            progress,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
