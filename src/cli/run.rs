//! Run command implementation.

use super::output::{JsonMatchReport, format_result_text};
use super::{CliError, OutputFormat, load_config, resolve_seed};
use sentinel::strategies::StrategyKind;
use sentinel::tournament::generate_map;
use sentinel::{MapModel, TickEngine};
use std::path::PathBuf;
use std::sync::Arc;

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the map or config cannot be loaded, the match is
/// invalid, or the replay cannot be saved.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute(
    blue: StrategyKind,
    red: StrategyKind,
    seed: Option<u64>,
    map_path: Option<PathBuf>,
    size: (u32, u32),
    turns: Option<u32>,
    config_path: Option<PathBuf>,
    format: OutputFormat,
    save: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(t) = turns {
        config.turn_limit = t;
    }

    // A map file takes precedence over generation
    let (map, seed) = match map_path {
        Some(path) => (MapModel::load(&path)?, None),
        None => {
            let seed = resolve_seed(seed);
            (generate_map(seed, size.0, size.1)?, Some(seed))
        }
    };

    if !quiet {
        match seed {
            Some(seed) => println!("Running {blue} vs {red} on {} (seed {seed})...", map.name()),
            None => println!("Running {blue} vs {red} on {}...", map.name()),
        }
        println!();
    }

    let blue_strategy = blue.build(map.clone(), &config.catalog);
    let red_strategy = red.build(map.clone(), &config.catalog);
    let map_name = map.name().to_string();
    let mut engine = TickEngine::new(Arc::new(map), blue_strategy, red_strategy, config);
    let outcome = engine.run_game();
    let replay = engine.into_replay();

    // Save even for invalid matches, they are the ones worth inspecting
    if let Some(save_path) = save {
        replay.save(&save_path)?;
        if !quiet {
            println!("Replay saved to: {}", save_path.display());
            println!();
        }
    }

    let result = outcome?;
    let names = &replay.header.strategies;
    match format {
        OutputFormat::Text => {
            print!("{}", format_result_text(&result, names, &map_name, seed));
        }
        OutputFormat::Json => {
            let report = JsonMatchReport {
                seed,
                map: &map_name,
                strategies: names,
                result: &result,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
