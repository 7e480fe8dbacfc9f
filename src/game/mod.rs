//! Rules engine.
//!
//! Owns deployment, combat resolution, turn order, elimination, and status
//! projection. The [`Game`] aggregate is mutated by exactly one caller at a
//! time; see [`crate::session`] for the command loop that drives it.

pub mod cards;
pub mod combat;
pub mod engine;
pub mod options;
pub mod state;
pub mod status;

pub use cards::CardHands;
pub use combat::{Dice, SeededDice, TryAttackResult, MAX_ATTACKER_DICE, MAX_DEFENDER_DICE};
pub use engine::Game;
pub use options::{GameStartOptions, MAX_BOARD_CELLS, MAX_STARTING_ARMIES};
pub use state::{ActionType, GameAction, GameState};
pub use status::{GameStatus, PlayerStats, TerritoryStatus};
