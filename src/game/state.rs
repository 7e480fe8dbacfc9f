//! Phase and last-action types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Location;

/// The coarse game phase. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Initializing,
    Joining,
    Deploying,
    Attacking,
    GameOver,
}

impl GameState {
    /// Phases in which a current player is defined.
    pub const fn has_turns(self) -> bool {
        matches!(self, GameState::Deploying | GameState::Attacking)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameState::Initializing => "initializing",
            GameState::Joining => "joining",
            GameState::Deploying => "deploying",
            GameState::Attacking => "attacking",
            GameState::GameOver => "game over",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Deploy,
    Attack,
}

/// The most recently committed action, kept for status reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub location: Location,
    pub destination: Option<Location>,
}

impl GameAction {
    pub fn deploy(location: Location) -> Self {
        GameAction {
            action_type: ActionType::Deploy,
            location,
            destination: None,
        }
    }

    pub fn attack(from: Location, to: Location) -> Self {
        GameAction {
            action_type: ActionType::Attack,
            location: from,
            destination: Some(to),
        }
    }
}
