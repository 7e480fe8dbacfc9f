//! Game start options.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Largest board accepted, in territories.
pub const MAX_BOARD_CELLS: u64 = 10_000;

/// Largest per-player army allotment accepted. With a full board this keeps
/// every army total inside `u32`.
pub const MAX_STARTING_ARMIES: u32 = 100_000;

/// Board and army settings for one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameStartOptions {
    pub height: u32,
    pub width: u32,
    /// Armies each player places over the whole deploy phase.
    pub starting_armies_per_player: u32,
    /// Maximum armies placed by a single deploy command.
    pub armies_deployed_per_turn: u32,
    /// Award territory cards on capture and cash in sets automatically.
    pub territory_cards: bool,
}

impl Default for GameStartOptions {
    fn default() -> Self {
        GameStartOptions {
            height: 5,
            width: 5,
            starting_armies_per_player: 5,
            armies_deployed_per_turn: 1,
            territory_cards: false,
        }
    }
}

impl GameStartOptions {
    pub fn new(
        height: u32,
        width: u32,
        starting_armies_per_player: u32,
        armies_deployed_per_turn: u32,
    ) -> Self {
        GameStartOptions {
            height,
            width,
            starting_armies_per_player,
            armies_deployed_per_turn,
            territory_cards: false,
        }
    }

    pub fn with_territory_cards(mut self, enabled: bool) -> Self {
        self.territory_cards = enabled;
        self
    }

    /// Rejects any zero-valued dimension or army count, boards larger than
    /// [`MAX_BOARD_CELLS`], and allotments above [`MAX_STARTING_ARMIES`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("height", self.height),
            ("width", self.width),
            ("starting_armies_per_player", self.starting_armies_per_player),
            ("armies_deployed_per_turn", self.armies_deployed_per_turn),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(ConfigError::NonPositive { field });
            }
        }
        let cells = u64::from(self.height)
            .checked_mul(u64::from(self.width))
            .unwrap_or(u64::MAX);
        if cells > MAX_BOARD_CELLS {
            return Err(ConfigError::BoardTooLarge {
                cells,
                max: MAX_BOARD_CELLS,
            });
        }
        if self.starting_armies_per_player > MAX_STARTING_ARMIES {
            return Err(ConfigError::TooLarge {
                field: "starting_armies_per_player",
                max: MAX_STARTING_ARMIES,
            });
        }
        Ok(())
    }
}
