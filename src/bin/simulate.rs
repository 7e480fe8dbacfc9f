//! Random-bot self-play CLI.
//!
//! Plays conquest games between random bots and writes one JSON record per
//! game.
//!
//! Usage:
//!   cargo run --release --bin simulate -- [OPTIONS]
//!
//! Options:
//!   --games N       Number of games to play (default: 10)
//!   --players N     Bots per game (default: 3)
//!   --height N      Board height (default: 5)
//!   --width N       Board width (default: 5)
//!   --armies N      Starting armies per player (default: 5)
//!   --per-turn N    Armies placed per deploy (default: 1)
//!   --cards         Enable territory cards
//!   --aggression P  Chance a bot attacks when it can (default: 0.8)
//!   --max-commands N  Command budget per game (default: 10000)
//!   --threads N     Number of parallel threads (default: 4)
//!   --seed N        Random seed, 0 for entropy (default: 0)
//!   --output FILE   Output file path (default: stdout)
//!   --quiet         Suppress summary output

use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::process;
use std::str::FromStr;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use conquest::simulate::{self, SimulationConfig, Summary};

fn parse_value<T: FromStr>(flag: &str, value: Option<&String>) -> T {
    let Some(value) = value else {
        eprintln!("{} needs a value", flag);
        print_usage();
        process::exit(2);
    };
    match value.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("invalid {} value: '{}'", flag, value);
            process::exit(2);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conquest=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = SimulationConfig::default();
    let mut output_path: Option<String> = None;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args.get(i + 1);
        match flag {
            "--games" => {
                config.num_games = parse_value(flag, value);
                i += 1;
            }
            "--players" => {
                config.players = parse_value(flag, value);
                i += 1;
            }
            "--height" => {
                config.options.height = parse_value(flag, value);
                i += 1;
            }
            "--width" => {
                config.options.width = parse_value(flag, value);
                i += 1;
            }
            "--armies" => {
                config.options.starting_armies_per_player = parse_value(flag, value);
                i += 1;
            }
            "--per-turn" => {
                config.options.armies_deployed_per_turn = parse_value(flag, value);
                i += 1;
            }
            "--cards" => config.options.territory_cards = true,
            "--aggression" => {
                config.aggression = parse_value(flag, value);
                i += 1;
            }
            "--max-commands" => {
                config.max_commands = parse_value(flag, value);
                i += 1;
            }
            "--threads" => {
                config.threads = parse_value(flag, value);
                i += 1;
            }
            "--seed" => {
                config.seed = parse_value(flag, value);
                i += 1;
            }
            "--output" => {
                output_path = Some(parse_value(flag, value));
                i += 1;
            }
            "--quiet" => quiet = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if let Err(e) = config.options.validate() {
        eprintln!("invalid game options: {}", e);
        process::exit(1);
    }

    if !quiet {
        eprintln!(
            "Simulating {} games: {} bots, {}x{} board, {} armies ({} per deploy), {} threads",
            config.num_games,
            config.players,
            config.options.height,
            config.options.width,
            config.options.starting_armies_per_player,
            config.options.armies_deployed_per_turn,
            config.threads
        );
    }

    let start = Instant::now();
    let games = match simulate::run_simulation(&config) {
        Ok(games) => games,
        Err(e) => {
            eprintln!("failed to start worker threads: {}", e);
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    if !quiet {
        eprintln!(
            "Completed {} games in {:.2}s",
            games.len(),
            elapsed.as_secs_f64()
        );
        eprint!("{}", Summary::from_games(&games));
    }

    let written = match &output_path {
        Some(path) => File::create(path)
            .and_then(|file| simulate::write_jsonl(&games, &mut BufWriter::new(file))),
        None => {
            let stdout = io::stdout();
            simulate::write_jsonl(&games, &mut BufWriter::new(stdout.lock()))
        }
    };
    if let Err(e) = written {
        eprintln!("failed to write output: {}", e);
        process::exit(1);
    }
    if let (Some(path), false) = (&output_path, quiet) {
        eprintln!("Wrote {} games to {}", games.len(), path);
    }
}

fn print_usage() {
    eprintln!("Usage: simulate [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --games N         Number of games to play (default: 10)");
    eprintln!("  --players N       Bots per game (default: 3)");
    eprintln!("  --height N        Board height (default: 5)");
    eprintln!("  --width N         Board width (default: 5)");
    eprintln!("  --armies N        Starting armies per player (default: 5)");
    eprintln!("  --per-turn N      Armies placed per deploy (default: 1)");
    eprintln!("  --cards           Enable territory cards");
    eprintln!("  --aggression P    Chance a bot attacks when it can (default: 0.8)");
    eprintln!("  --max-commands N  Command budget per game (default: 10000)");
    eprintln!("  --threads N       Number of parallel threads (default: 4)");
    eprintln!("  --seed N          Random seed, 0 for entropy (default: 0)");
    eprintln!("  --output FILE     Output file path (default: stdout)");
    eprintln!("  --quiet           Suppress summary output");
    eprintln!("  --help            Show this help");
}
