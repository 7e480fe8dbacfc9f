//! Read-only status snapshots.

use serde::Serialize;

use super::state::{GameAction, GameState};
use crate::board::Location;

/// One territory as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerritoryStatus {
    pub location: Location,
    /// Display name of the owner.
    pub owner: Option<String>,
    pub armies: u32,
}

/// Per-player holdings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    pub name: String,
    pub armies: u32,
    pub territories: u32,
    pub score: u32,
}

impl PlayerStats {
    pub fn new(name: String, armies: u32, territories: u32) -> Self {
        PlayerStats {
            name,
            armies,
            territories,
            score: armies.saturating_add(territories.saturating_mul(2)),
        }
    }
}

/// A point-in-time projection of the whole game, computed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameStatus {
    pub players: Vec<String>,
    pub state: GameState,
    pub board: Vec<TerritoryStatus>,
    pub player_stats: Vec<PlayerStats>,
    pub current_player: Option<String>,
    pub last_action: Option<GameAction>,
}

impl GameStatus {
    pub fn stats_for(&self, name: &str) -> Option<&PlayerStats> {
        self.player_stats.iter().find(|s| s.name == name)
    }

    pub fn territory(&self, location: Location) -> Option<&TerritoryStatus> {
        self.board.iter().find(|t| t.location == location)
    }
}
