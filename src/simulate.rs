//! Random-bot self-play.
//!
//! Plays complete sessions through the coordinator with bots that pick
//! uniformly among legal-looking moves. Used for balance statistics and as a
//! smoke test that every game terminates.

use std::fmt;
use std::io::{self, Write};
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::board::{Location, PlayerId};
use crate::config::SessionConfig;
use crate::game::{GameStartOptions, PlayerStats};
use crate::session::{Command, Notification, Session, Stage};

const SECRET: &str = "self-play";

/// Configuration for a batch of simulated games.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub num_games: usize,
    /// Bots per game.
    pub players: usize,
    pub options: GameStartOptions,
    /// Chance that a bot with a legal attack takes it instead of ceasing.
    pub aggression: f64,
    /// Commands per game before the game is abandoned as unfinished.
    pub max_commands: usize,
    /// Worker threads; 1 plays games sequentially.
    pub threads: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            num_games: 10,
            players: 3,
            options: GameStartOptions::default(),
            aggression: 0.8,
            max_commands: 10_000,
            threads: 4,
            seed: 0,
        }
    }
}

/// The outcome of one simulated game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    pub game_id: usize,
    /// Display name of the highest-scoring player at the end.
    pub winner: Option<String>,
    /// Every owned territory belonged to the winner.
    pub conquest: bool,
    /// The command budget ran out before game over.
    pub truncated: bool,
    pub commands: usize,
    pub deploys: usize,
    pub rejected_deploys: usize,
    pub attacks: usize,
    pub invalid_attacks: usize,
    pub captures: usize,
    pub final_stats: Vec<PlayerStats>,
}

#[derive(Debug, Default)]
struct Counters {
    commands: usize,
    deploys: usize,
    rejected_deploys: usize,
    attacks: usize,
    invalid_attacks: usize,
    captures: usize,
}

impl Counters {
    fn record(&mut self, notifications: impl IntoIterator<Item = Notification>) {
        for notification in notifications {
            match notification {
                Notification::DeployConfirmed => self.deploys += 1,
                Notification::DeployRejected { .. } => self.rejected_deploys += 1,
                Notification::AttackOutcome { .. } => self.attacks += 1,
                Notification::InvalidAttack { .. } => self.invalid_attacks += 1,
                _ => {}
            }
        }
    }
}

/// Plays one game to completion (or to the command budget).
pub fn play_game(config: &SimulationConfig, game_id: usize, rng: &mut SmallRng) -> GameRecord {
    let session_seed = rng.gen_range(1..=u64::MAX);
    let session_config = SessionConfig::new(SECRET, config.options);
    let mut session = match Session::with_seed(session_config, session_seed) {
        Ok(session) => session,
        Err(err) => {
            debug!(game_id, error = %err, "simulation options rejected");
            return GameRecord {
                game_id,
                winner: None,
                conquest: false,
                truncated: true,
                commands: 0,
                deploys: 0,
                rejected_deploys: 0,
                attacks: 0,
                invalid_attacks: 0,
                captures: 0,
                final_stats: Vec::new(),
            };
        }
    };

    let mut counters = Counters::default();
    let host = PlayerId::from("host");
    let mut setup: Vec<Command> = (0..config.players)
        .map(|i| Command::Join {
            player: PlayerId::new(format!("bot{}", i)),
            name: format!("Bot {}", i),
        })
        .collect();
    setup.push(Command::Start {
        requester: host,
        secret_code: SECRET.to_string(),
        options: None,
    });
    for command in setup {
        counters.commands += 1;
        session.handle(command);
    }

    while session.stage() != Stage::GameOver && counters.commands < config.max_commands {
        let Some(me) = session.game().current_player().cloned() else {
            break;
        };
        let command = match session.stage() {
            Stage::Deploying => Command::Deploy {
                location: choose_deploy(&session, &me, rng),
                player: me,
            },
            Stage::Attacking => match choose_attack(&session, &me, rng) {
                Some((from, to)) if rng.gen_bool(config.aggression.clamp(0.0, 1.0)) => {
                    Command::Attack { player: me, from, to }
                }
                _ => Command::CeaseAttacking { player: me },
            },
            Stage::Starting | Stage::GameOver => break,
        };

        let target = match &command {
            Command::Attack { player, to, .. } => Some((player.clone(), *to)),
            _ => None,
        };
        counters.commands += 1;
        let out = session.handle(command);
        counters.record(out.into_iter().map(|o| o.notification));

        if let Some((attacker, to)) = target {
            let captured = session
                .game()
                .board()
                .territory(to)
                .map(|t| t.is_owned_by(&attacker))
                .unwrap_or(false);
            if captured {
                counters.captures += 1;
            }
        }
    }

    let status = session.game().game_status();
    let owners: Vec<&str> = status
        .board
        .iter()
        .filter_map(|t| t.owner.as_deref())
        .collect();
    let winner = status
        .player_stats
        .iter()
        .max_by_key(|s| s.score)
        .map(|s| s.name.clone());
    let conquest = match (&winner, owners.first()) {
        (Some(name), Some(_)) => owners.iter().all(|o| *o == name.as_str()),
        _ => false,
    };

    GameRecord {
        game_id,
        winner,
        conquest,
        truncated: session.stage() != Stage::GameOver,
        commands: counters.commands,
        deploys: counters.deploys,
        rejected_deploys: counters.rejected_deploys,
        attacks: counters.attacks,
        invalid_attacks: counters.invalid_attacks,
        captures: counters.captures,
        final_stats: status.player_stats,
    }
}

/// Picks a territory the bot owns or one nobody owns.
fn choose_deploy(session: &Session, me: &PlayerId, rng: &mut SmallRng) -> Location {
    let candidates: Vec<Location> = session
        .game()
        .board()
        .territories()
        .iter()
        .filter(|t| t.owner.is_none() || t.is_owned_by(me))
        .map(|t| t.location)
        .collect();
    candidates
        .choose(rng)
        .copied()
        .unwrap_or(Location::new(0, 0))
}

/// Picks a random attack from any territory with armies to spare.
fn choose_attack(session: &Session, me: &PlayerId, rng: &mut SmallRng) -> Option<(Location, Location)> {
    let board = session.game().board();
    let moves: Vec<(Location, Location)> = board
        .owned_by(me)
        .filter(|t| t.armies > 1)
        .flat_map(move |t| {
            board
                .neighbors(t.location)
                .into_iter()
                .filter(move |n| !n.is_owned_by(me))
                .map(move |n| (t.location, n.location))
        })
        .collect();
    moves.choose(rng).copied()
}

fn game_rng(seed: u64, game_id: usize) -> SmallRng {
    if seed != 0 {
        SmallRng::seed_from_u64(seed.wrapping_add(game_id as u64))
    } else {
        SmallRng::from_entropy()
    }
}

/// Plays `config.num_games` games, in parallel when `config.threads > 1`.
///
/// Records come back ordered by game id. Each game derives its own RNG from
/// the seed, so a non-zero seed reproduces the batch regardless of thread
/// count.
pub fn run_simulation(config: &SimulationConfig) -> Result<Vec<GameRecord>, rayon::ThreadPoolBuildError> {
    let started = Instant::now();
    let play = |i: usize| {
        let mut rng = game_rng(config.seed, i);
        let record = play_game(config, i, &mut rng);
        debug!(
            game_id = i,
            winner = record.winner.as_deref().unwrap_or("none"),
            commands = record.commands,
            "game finished"
        );
        record
    };

    let games: Vec<GameRecord> = if config.threads > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()?;
        pool.install(|| (0..config.num_games).into_par_iter().map(play).collect())
    } else {
        (0..config.num_games).map(play).collect()
    };

    info!(
        games = games.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "simulation complete"
    );
    Ok(games)
}

/// Writes one JSON object per game, one per line.
pub fn write_jsonl<W: Write>(games: &[GameRecord], out: &mut W) -> io::Result<()> {
    for game in games {
        serde_json::to_writer(&mut *out, game)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub games: usize,
    pub conquests: usize,
    pub truncated: usize,
    pub avg_commands: f64,
    pub avg_attacks: f64,
    pub avg_captures: f64,
    /// Wins per display name, most first.
    pub wins: Vec<(String, usize)>,
}

impl Summary {
    pub fn from_games(games: &[GameRecord]) -> Self {
        let total = games.len().max(1) as f64;
        let mut wins: Vec<(String, usize)> = Vec::new();
        for winner in games.iter().filter_map(|g| g.winner.as_ref()) {
            match wins.iter_mut().find(|(name, _)| name == winner) {
                Some((_, count)) => *count += 1,
                None => wins.push((winner.clone(), 1)),
            }
        }
        wins.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Summary {
            games: games.len(),
            conquests: games.iter().filter(|g| g.conquest).count(),
            truncated: games.iter().filter(|g| g.truncated).count(),
            avg_commands: games.iter().map(|g| g.commands).sum::<usize>() as f64 / total,
            avg_attacks: games.iter().map(|g| g.attacks).sum::<usize>() as f64 / total,
            avg_captures: games.iter().map(|g| g.captures).sum::<usize>() as f64 / total,
            wins,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Summary ===")?;
        writeln!(f, "Games: {}", self.games)?;
        writeln!(f, "Conquests: {}", self.conquests)?;
        writeln!(f, "Unfinished: {}", self.truncated)?;
        writeln!(f, "Avg commands/game: {:.1}", self.avg_commands)?;
        writeln!(f, "Avg attacks/game: {:.1}", self.avg_attacks)?;
        writeln!(f, "Avg captures/game: {:.1}", self.avg_captures)?;
        writeln!(f, "Wins:")?;
        for (name, count) in &self.wins {
            let pct = 100.0 * *count as f64 / self.games.max(1) as f64;
            writeln!(f, "  {:>8}: {} ({:.1}%)", name, count, pct)?;
        }
        Ok(())
    }
}
