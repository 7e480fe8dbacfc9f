//! Conquest session server over stdin/stdout.
//!
//! Reads one text command per line from stdin (see [`conquest::protocol`]),
//! feeds it to a single session, and writes every outbound notification to
//! stdout as a JSON line. Logs go to stderr.
//!
//! Usage:
//!   conquest [--config FILE] [--secret CODE] [--height N] [--width N]
//!            [--armies N] [--per-turn N] [--cards] [--seed N]

use std::env;
use std::process;
use std::str::FromStr;

use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use conquest::config::SessionConfig;
use conquest::protocol::{parse_line, Line};
use conquest::session::{spawn_session, Outbound};

const DEFAULT_SECRET: &str = "conquest";

struct Args {
    config: SessionConfig,
    seed: u64,
}

fn parse_value<T: FromStr>(flag: &str, value: Option<&String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("{} needs a value", flag))?;
    value
        .parse()
        .map_err(|_| format!("invalid {} value: '{}'", flag, value))
}

fn parse_args(args: &[String]) -> Result<Option<Args>, String> {
    let mut config = SessionConfig::new(DEFAULT_SECRET, Default::default());
    let mut seed = 0;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args.get(i + 1);
        match flag {
            "--config" => {
                let path = value.ok_or("--config needs a value")?;
                config = SessionConfig::load(path).map_err(|e| e.to_string())?;
                i += 1;
            }
            "--secret" => {
                config.secret_code = parse_value(flag, value)?;
                i += 1;
            }
            "--height" => {
                config.options.height = parse_value(flag, value)?;
                i += 1;
            }
            "--width" => {
                config.options.width = parse_value(flag, value)?;
                i += 1;
            }
            "--armies" => {
                config.options.starting_armies_per_player = parse_value(flag, value)?;
                i += 1;
            }
            "--per-turn" => {
                config.options.armies_deployed_per_turn = parse_value(flag, value)?;
                i += 1;
            }
            "--seed" => {
                seed = parse_value(flag, value)?;
                i += 1;
            }
            "--cards" => config.options.territory_cards = true,
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
        i += 1;
    }
    Ok(Some(Args { config, seed }))
}

fn print_usage() {
    eprintln!("Usage: conquest [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config FILE   JSON session config (secret_code, options)");
    eprintln!("  --secret CODE   Secret code for start/restart (default: {})", DEFAULT_SECRET);
    eprintln!("  --height N      Board height (default: 5)");
    eprintln!("  --width N       Board width (default: 5)");
    eprintln!("  --armies N      Starting armies per player (default: 5)");
    eprintln!("  --per-turn N    Armies placed per deploy (default: 1)");
    eprintln!("  --cards         Enable territory cards");
    eprintln!("  --seed N        Random seed, 0 for entropy (default: 0)");
    eprintln!("  --help          Show this help");
}

async fn write_notifications(mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    let mut stdout = io::stdout();
    while let Some(message) = outbound.recv().await {
        let mut line = match serde_json::to_string(&message) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "failed to encode notification");
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = stdout.write_all(line.as_bytes()).await {
            error!(error = %e, "stdout closed");
            break;
        }
        if let Err(e) = stdout.flush().await {
            error!(error = %e, "stdout closed");
            break;
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conquest=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(Some(args)) => args,
        Ok(None) => return,
        Err(e) => {
            eprintln!("{}", e);
            print_usage();
            process::exit(2);
        }
    };

    let (handle, outbound, session_task) = match spawn_session(args.config, args.seed) {
        Ok(spawned) => spawned,
        Err(e) => {
            error!(error = %e, "invalid session configuration");
            process::exit(1);
        }
    };
    let writer = tokio::spawn(write_notifications(outbound));

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "failed to read stdin");
                break;
            }
        };
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Line::Quit)) => break,
            Ok(Some(Line::Command(command))) => {
                if handle.send(command).await.is_err() {
                    error!("session stopped unexpectedly");
                    break;
                }
            }
            Err(e) => warn!(error = %e, line = %line.trim(), "ignoring malformed command"),
        }
    }

    // Closing the mailbox lets the session drain and the writer flush.
    drop(handle);
    if let Err(e) = session_task.await {
        error!(error = %e, "session task failed");
    }
    if let Err(e) = writer.await {
        error!(error = %e, "notification writer failed");
    }
    info!("shutting down");
}
