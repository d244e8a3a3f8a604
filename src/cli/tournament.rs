//! Tournament command implementation.

use super::output::{JsonTournamentResult, format_tournament_csv, format_tournament_text};
use super::{CliError, TournamentFormat, load_config, resolve_seed};
use indicatif::{ProgressBar, ProgressStyle};
use sentinel::strategies::StrategyKind;
use sentinel::tournament::{TournamentConfig, run_tournament};
use std::path::PathBuf;
use std::time::Instant;

/// Execute the tournament command.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or output fails.
#[allow(clippy::too_many_arguments, clippy::cast_precision_loss)]
pub(crate) fn execute(
    strategies: Vec<StrategyKind>,
    games: u64,
    seed: Option<u64>,
    threads: Option<usize>,
    turns: Option<u32>,
    size: (u32, u32),
    config_path: Option<PathBuf>,
    format: TournamentFormat,
    progress: bool,
) -> Result<(), CliError> {
    // Set thread pool size if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let base_seed = resolve_seed(seed);

    let mut match_config = load_config(config_path.as_deref())?;
    if let Some(t) = turns {
        match_config.turn_limit = t;
    }
    let config = TournamentConfig {
        map_width: size.0,
        map_height: size.1,
        match_config,
    };

    // Progress bar
    let pb = if progress {
        let pb = ProgressBar::new(games);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games ({per_sec})")
            .map_err(|e| CliError::new(format!("Invalid progress template: {e}")))?
            .progress_chars("=>-");
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let stats = run_tournament(&strategies, games, base_seed, &config, pb.as_ref());

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    let duration = start.elapsed();

    // Calculate games per second
    let games_per_sec = if duration.as_secs_f64() > 0.0 {
        (stats.games_played + stats.invalid) as f64 / duration.as_secs_f64()
    } else {
        0.0
    };

    // Output based on format
    match format {
        TournamentFormat::Text => {
            println!();
            println!("Base seed: {base_seed}");
            print!("{}", format_tournament_text(&stats, &strategies));
            println!();
            println!(
                "Duration: {:.2}s ({:.0} games/sec)",
                duration.as_secs_f64(),
                games_per_sec
            );
        }
        TournamentFormat::Json => {
            let json_result = JsonTournamentResult::from_stats(&stats, &strategies);
            println!("{}", serde_json::to_string_pretty(&json_result)?);
        }
        TournamentFormat::Csv => {
            print!("{}", format_tournament_csv(&stats, &strategies));
        }
    }

    Ok(())
}
