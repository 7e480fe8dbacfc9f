//! Inbound commands and outbound notifications.

use serde::Serialize;

use crate::board::{Location, PlayerId};
use crate::game::{GameStartOptions, GameStatus, TerritoryStatus};

/// A request delivered by the transport layer.
///
/// Every variant names the identity that sent it, which is also where any
/// direct reply goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join {
        player: PlayerId,
        name: String,
    },
    Start {
        requester: PlayerId,
        secret_code: String,
        options: Option<GameStartOptions>,
    },
    Restart {
        requester: PlayerId,
        secret_code: String,
        options: Option<GameStartOptions>,
    },
    Deploy {
        player: PlayerId,
        location: Location,
    },
    Attack {
        player: PlayerId,
        from: Location,
        to: Location,
    },
    CeaseAttacking {
        player: PlayerId,
    },
    /// Read-only status query.
    Status {
        requester: PlayerId,
    },
    /// The transport's mistake budget for this player ran out.
    PlayerEjected {
        player: PlayerId,
    },
    PlayerDisconnected {
        player: PlayerId,
    },
}

impl Command {
    /// The identity that issued the command.
    pub fn sender(&self) -> &PlayerId {
        match self {
            Command::Join { player, .. }
            | Command::Deploy { player, .. }
            | Command::Attack { player, .. }
            | Command::CeaseAttacking { player }
            | Command::PlayerEjected { player }
            | Command::PlayerDisconnected { player } => player,
            Command::Start { requester, .. }
            | Command::Restart { requester, .. }
            | Command::Status { requester } => requester,
        }
    }
}

/// A message for the transport layer to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Notification {
    JoinAccepted { name: String },
    JoinRejected { reason: String },
    GameStarting,
    InvalidSecretCode,
    NotEnoughPlayers,
    InvalidOptions { reason: String },
    /// The command is not accepted in the current stage.
    RequestRejected { reason: String },
    YourTurnToDeploy { board: Vec<TerritoryStatus> },
    YourTurnToAttack { board: Vec<TerritoryStatus> },
    DeployConfirmed,
    DeployRejected { player: PlayerId },
    AttackOutcome { message: String },
    InvalidAttack { player: PlayerId, reason: String },
    PlayerEjected { player: PlayerId },
    GameStatus { status: GameStatus },
    GameOver { status: GameStatus },
}

/// Where a notification should go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "player")]
pub enum Recipient {
    Player(PlayerId),
    Everyone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outbound {
    pub to: Recipient,
    pub notification: Notification,
}
