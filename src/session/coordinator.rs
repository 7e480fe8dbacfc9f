//! The per-session phase and turn state machine.
//!
//! [`Session::handle`] takes one command at a time, checks it against the
//! current [`Stage`] and turn owner, drives the [`Game`], and returns the
//! notifications to deliver. Every rejection is reported to the sender; no
//! command can leave the session in an invalid state.

use tracing::{debug, info, warn};

use super::command::{Command, Notification, Outbound, Recipient};
use crate::board::{Location, PlayerId};
use crate::config::{ConfigError, SessionConfig};
use crate::game::{
    Game, GameAction, GameStartOptions, GameState, SeededDice, TerritoryStatus, TryAttackResult,
};

/// Coordinator phase. Coarser than [`GameState`]: the engine's `Joining` and
/// `Initializing` both map onto `Starting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Starting,
    Deploying,
    Attacking,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Ejected,
    Disconnected,
}

/// One game session.
#[derive(Debug)]
pub struct Session {
    secret_code: String,
    /// Options used by the most recent start, reused when a start carries none.
    options: GameStartOptions,
    game: Game,
    stage: Stage,
    dice: SeededDice,
    outbox: Vec<Outbound>,
}

impl Session {
    /// Creates a session with entropy-seeded shuffles and dice.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        Self::with_seed(config, 0)
    }

    /// Creates a session whose roster shuffle and dice derive from `seed`
    /// (0 = entropy). Fails if the configuration is invalid.
    pub fn with_seed(config: SessionConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Session {
            secret_code: config.secret_code,
            options: config.options,
            game: Game::with_seed(seed),
            stage: Stage::Starting,
            dice: SeededDice::new(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            outbox: Vec::new(),
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Processes one command and returns the notifications it produced, in
    /// the order they should be delivered.
    pub fn handle(&mut self, command: Command) -> Vec<Outbound> {
        debug!(stage = ?self.stage, sender = %command.sender(), ?command, "handling command");
        match command {
            Command::Join { player, name } => self.on_join(player, name),
            Command::Start {
                requester,
                secret_code,
                options,
            } => self.on_start(requester, &secret_code, options, false),
            Command::Restart {
                requester,
                secret_code,
                options,
            } => self.on_start(requester, &secret_code, options, true),
            Command::Deploy { player, location } => self.on_deploy(player, location),
            Command::Attack { player, from, to } => self.on_attack(player, from, to),
            Command::CeaseAttacking { player } => self.on_cease(player),
            Command::Status { requester } => {
                let status = self.game.game_status();
                self.tell(&requester, Notification::GameStatus { status });
            }
            Command::PlayerEjected { player } => self.on_removed(player, Removal::Ejected),
            Command::PlayerDisconnected { player } => {
                self.on_removed(player, Removal::Disconnected)
            }
        }
        std::mem::take(&mut self.outbox)
    }

    fn tell(&mut self, player: &PlayerId, notification: Notification) {
        self.outbox.push(Outbound {
            to: Recipient::Player(player.clone()),
            notification,
        });
    }

    fn broadcast(&mut self, notification: Notification) {
        self.outbox.push(Outbound {
            to: Recipient::Everyone,
            notification,
        });
    }

    fn broadcast_status(&mut self) {
        let status = self.game.game_status();
        self.broadcast(Notification::GameStatus { status });
    }

    fn board_snapshot(&self) -> Vec<TerritoryStatus> {
        self.game.game_status().board
    }

    fn name_of(&self, player: &PlayerId) -> String {
        self.game
            .display_name(player)
            .map(str::to_string)
            .unwrap_or_else(|| player.to_string())
    }

    fn on_join(&mut self, player: PlayerId, name: String) {
        match self.stage {
            Stage::Starting | Stage::GameOver => {
                if self.game.add_player(player.clone(), name.clone()) {
                    info!(player = %player, name = %name, "player joined");
                    self.tell(&player, Notification::JoinAccepted { name });
                } else {
                    self.tell(
                        &player,
                        Notification::JoinRejected {
                            reason: "already joined".to_string(),
                        },
                    );
                }
            }
            Stage::Deploying | Stage::Attacking => {
                debug!(player = %player, "join refused mid-game");
                self.tell(
                    &player,
                    Notification::JoinRejected {
                        reason: "unable to join, game in progress".to_string(),
                    },
                );
            }
        }
    }

    fn on_start(
        &mut self,
        requester: PlayerId,
        secret_code: &str,
        options: Option<GameStartOptions>,
        restart: bool,
    ) {
        match self.stage {
            Stage::Starting => {}
            Stage::Deploying | Stage::Attacking => {
                self.tell(
                    &requester,
                    Notification::RequestRejected {
                        reason: "game already in progress".to_string(),
                    },
                );
                return;
            }
            Stage::GameOver if !restart => {
                self.tell(
                    &requester,
                    Notification::RequestRejected {
                        reason: "game is over, send restart".to_string(),
                    },
                );
                return;
            }
            Stage::GameOver => {
                if secret_code != self.secret_code {
                    warn!(player = %requester, "restart with wrong secret code");
                    self.tell(&requester, Notification::InvalidSecretCode);
                    return;
                }
                info!(player = %requester, "restarting session");
                self.stage = Stage::Starting;
            }
        }
        self.begin_game(requester, secret_code, options);
    }

    fn begin_game(
        &mut self,
        requester: PlayerId,
        secret_code: &str,
        options: Option<GameStartOptions>,
    ) {
        if secret_code != self.secret_code {
            warn!(player = %requester, "start with wrong secret code");
            self.tell(&requester, Notification::InvalidSecretCode);
            return;
        }
        if self.game.players().is_empty() {
            self.tell(&requester, Notification::NotEnoughPlayers);
            return;
        }
        let options = options.unwrap_or(self.options);
        if let Err(err) = self.game.initialize_game(&options) {
            warn!(player = %requester, error = %err, "start with invalid options");
            self.tell(
                &requester,
                Notification::InvalidOptions {
                    reason: err.to_string(),
                },
            );
            return;
        }
        self.options = options;
        self.game.start_game();
        self.stage = Stage::Deploying;
        info!(
            players = self.game.players().len(),
            height = self.game.board().height(),
            width = self.game.board().width(),
            "game starting"
        );

        self.broadcast(Notification::GameStarting);
        if let Some(first) = self.game.current_player().cloned() {
            self.prompt_deploy(&first);
        }
        self.broadcast_status();
    }

    fn prompt_deploy(&mut self, player: &PlayerId) {
        debug!(player = %player, "deploy turn");
        let board = self.board_snapshot();
        self.tell(player, Notification::YourTurnToDeploy { board });
    }

    fn prompt_attack(&mut self, player: &PlayerId) {
        debug!(player = %player, "attack turn");
        let board = self.board_snapshot();
        self.tell(player, Notification::YourTurnToAttack { board });
    }

    fn on_deploy(&mut self, player: PlayerId, location: Location) {
        if self.stage != Stage::Deploying {
            self.tell(&player, Notification::DeployRejected { player: player.clone() });
            return;
        }
        if !self.game.contains(&player) {
            debug!(player = %player, "dropping deploy from non-member");
            return;
        }

        // Out-of-turn deploys never move the turn, so one player cannot skip
        // another's deploy.
        if !self.game.is_current(&player) {
            debug!(player = %player, "deploy out of turn");
            self.tell(&player, Notification::DeployRejected { player: player.clone() });
        } else if self.game.try_place_army(&player, location) {
            info!(player = %self.name_of(&player), %location, "army deployed");
            self.game.set_last_action(Some(GameAction::deploy(location)));
            self.tell(&player, Notification::DeployConfirmed);
            self.advance_turn();
        } else {
            warn!(player = %self.name_of(&player), %location, "deploy rejected");
            self.tell(&player, Notification::DeployRejected { player: player.clone() });
            self.advance_turn();
        }
        self.broadcast_status();
    }

    /// True when the attack phase can no longer produce a move.
    fn attacking_is_finished(&self) -> bool {
        self.game.players().len() <= 1 || !self.game.any_player_can_attack()
    }

    fn reject_attack(&mut self, player: &PlayerId, reason: impl Into<String>) {
        self.tell(
            player,
            Notification::InvalidAttack {
                player: player.clone(),
                reason: reason.into(),
            },
        );
    }

    fn on_attack(&mut self, player: PlayerId, from: Location, to: Location) {
        if self.stage != Stage::Attacking {
            self.reject_attack(&player, "not in the attack phase");
            return;
        }
        if self.attacking_is_finished() {
            self.end_game();
            return;
        }
        if !self.game.is_current(&player) {
            debug!(player = %player, "attack out of turn");
            self.reject_attack(&player, "not your turn");
            return;
        }
        if !self.game.player_can_attack(&player) {
            self.reject_attack(&player, "none of your territories can attack");
            self.advance_turn();
            return;
        }

        let result = self
            .game
            .try_attack_with(&player, from, to, &mut self.dice)
            .unwrap_or_else(|err| TryAttackResult::invalid(err.to_string()));

        if result.attack_invalid {
            let reason = result.message.unwrap_or_else(|| "invalid attack".to_string());
            warn!(player = %self.name_of(&player), %from, %to, reason = %reason, "invalid attack");
            self.game.set_last_action(None);
            self.reject_attack(&player, reason);
            self.prompt_attack(&player);
            return;
        }

        info!(
            player = %self.name_of(&player),
            %from,
            %to,
            can_continue = result.can_continue,
            "attack resolved"
        );
        self.game.set_last_action(Some(GameAction::attack(from, to)));
        self.tell(
            &player,
            Notification::AttackOutcome {
                message: format!("Successfully attacked from {} to {}", from, to),
            },
        );

        if self.game.state() != GameState::Attacking {
            self.end_game();
            return;
        }
        self.broadcast_status();
        if self.game.player_can_attack(&player) {
            self.prompt_attack(&player);
        } else {
            self.advance_turn();
        }
    }

    fn on_cease(&mut self, player: PlayerId) {
        if self.stage != Stage::Attacking {
            self.reject_attack(&player, "not in the attack phase");
            return;
        }
        if self.attacking_is_finished() {
            self.end_game();
            return;
        }
        if !self.game.is_current(&player) {
            self.reject_attack(&player, "not your turn");
            return;
        }
        info!(player = %self.name_of(&player), "ceased attacking");
        self.advance_turn();
        self.broadcast_status();
    }

    fn on_removed(&mut self, player: PlayerId, removal: Removal) {
        let name = self.name_of(&player);
        let removed = self.game.remove_player(&player);
        if removal == Removal::Ejected {
            warn!(player = %name, "player ejected");
            self.broadcast(Notification::PlayerEjected { player: player.clone() });
        }
        if !removed {
            return;
        }
        info!(player = %name, ?removal, remaining = self.game.players().len(), "player removed");

        match self.stage {
            Stage::Starting | Stage::GameOver => {}
            Stage::Deploying | Stage::Attacking => {
                if self.game.players().is_empty() {
                    self.end_game();
                    return;
                }
                if self.game.state() == GameState::Attacking && self.attacking_is_finished() {
                    self.end_game();
                    return;
                }
                if self.game.current_player().is_none() {
                    self.advance_turn();
                } else if self.stage == Stage::Deploying
                    && self.game.state() == GameState::Attacking
                {
                    self.stage = Stage::Attacking;
                    info!("all armies deployed, attack phase begins");
                    if let Some(current) = self.game.current_player().cloned() {
                        self.prompt_attack(&current);
                    }
                }
                self.broadcast_status();
            }
        }
    }

    /// Moves the turn on and prompts whoever is up, following the engine's
    /// phase. Deploy turns skip players with nothing left to place; attack
    /// turns skip players with no possible attack.
    fn advance_turn(&mut self) {
        match self.game.state() {
            GameState::Deploying => {
                if let Some(next) = self.advance_to(|game, p| game.remaining_armies(p) > 0) {
                    self.prompt_deploy(&next);
                }
            }
            GameState::Attacking => {
                if self.stage == Stage::Deploying {
                    self.stage = Stage::Attacking;
                    info!("all armies deployed, attack phase begins");
                }
                if let Some(next) = self.advance_to(Game::player_can_attack) {
                    self.prompt_attack(&next);
                }
            }
            _ => {}
        }
    }

    /// Advances to the next player satisfying `eligible`. When nobody does,
    /// lands on the plain successor.
    fn advance_to(&mut self, eligible: impl Fn(&Game, &PlayerId) -> bool) -> Option<PlayerId> {
        let first = self.game.next_player()?;
        if eligible(&self.game, &first) {
            return Some(first);
        }
        for _ in 1..self.game.players().len() {
            let candidate = self.game.next_player()?;
            if eligible(&self.game, &candidate) {
                return Some(candidate);
            }
        }
        self.game.next_player()
    }

    fn end_game(&mut self) {
        self.game.set_game_over();
        self.stage = Stage::GameOver;
        let status = self.game.game_status();
        info!(
            players = status.players.len(),
            leader = status
                .player_stats
                .iter()
                .max_by_key(|s| s.score)
                .map(|s| s.name.as_str())
                .unwrap_or("none"),
            "game over"
        );
        self.broadcast(Notification::GameOver { status });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameStatus, MAX_STARTING_ARMIES};

    const CODE: &str = "letmein";

    fn id(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    fn loc(row: i32, column: i32) -> Location {
        Location::new(row, column)
    }

    fn session() -> Session {
        Session::with_seed(SessionConfig::new(CODE, GameStartOptions::default()), 17).unwrap()
    }

    fn join(session: &mut Session, player: &str) -> Vec<Outbound> {
        session.handle(Command::Join {
            player: id(player),
            name: player.to_uppercase(),
        })
    }

    fn start(session: &mut Session, options: GameStartOptions) -> Vec<Outbound> {
        session.handle(Command::Start {
            requester: id("host"),
            secret_code: CODE.to_string(),
            options: Some(options),
        })
    }

    fn to_player<'a>(out: &'a [Outbound], player: &str) -> Vec<&'a Notification> {
        out.iter()
            .filter(|o| o.to == Recipient::Player(id(player)))
            .map(|o| &o.notification)
            .collect()
    }

    fn broadcasts(out: &[Outbound]) -> Vec<&Notification> {
        out.iter()
            .filter(|o| o.to == Recipient::Everyone)
            .map(|o| &o.notification)
            .collect()
    }

    fn current(session: &Session) -> PlayerId {
        session.game().current_player().cloned().unwrap()
    }

    fn final_status(out: &[Outbound]) -> Option<&GameStatus> {
        out.iter().find_map(|o| match &o.notification {
            Notification::GameOver { status } => Some(status),
            _ => None,
        })
    }

    /// Two players, each deploys once and the attack phase opens.
    fn in_attack_phase(options: GameStartOptions, homes: [Location; 2]) -> Session {
        let mut s = session();
        join(&mut s, "a");
        join(&mut s, "b");
        start(&mut s, options);
        for home in homes {
            let me = current(&s);
            s.handle(Command::Deploy { player: me, location: home });
        }
        assert_eq!(s.stage(), Stage::Attacking);
        s
    }

    #[test]
    fn invalid_config_fails_fast() {
        let err = Session::new(SessionConfig::new("", GameStartOptions::default())).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySecretCode));
        let err = Session::new(SessionConfig::new(CODE, GameStartOptions::new(5, 0, 5, 1)))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NonPositive { field: "width" }));
    }

    #[test]
    fn join_accepted_then_duplicate_rejected() {
        let mut s = session();
        let out = join(&mut s, "a");
        assert_eq!(
            to_player(&out, "a"),
            vec![&Notification::JoinAccepted { name: "A".into() }]
        );
        let out = join(&mut s, "a");
        assert!(matches!(to_player(&out, "a")[0], Notification::JoinRejected { .. }));
        assert_eq!(s.game().players().len(), 1);
    }

    #[test]
    fn wrong_secret_code_changes_nothing() {
        let mut s = session();
        join(&mut s, "a");
        let out = s.handle(Command::Start {
            requester: id("host"),
            secret_code: "nope".into(),
            options: None,
        });
        assert_eq!(to_player(&out, "host"), vec![&Notification::InvalidSecretCode]);
        assert_eq!(s.stage(), Stage::Starting);
        assert_eq!(s.game().state(), GameState::Joining);
    }

    #[test]
    fn start_without_players_is_refused() {
        let mut s = session();
        let out = start(&mut s, GameStartOptions::default());
        assert_eq!(to_player(&out, "host"), vec![&Notification::NotEnoughPlayers]);
        assert_eq!(s.stage(), Stage::Starting);
    }

    #[test]
    fn start_with_bad_options_is_refused() {
        let mut s = session();
        join(&mut s, "a");
        let out = start(&mut s, GameStartOptions::new(5, 5, 0, 1));
        assert!(matches!(
            to_player(&out, "host")[0],
            Notification::InvalidOptions { .. }
        ));
        assert_eq!(s.stage(), Stage::Starting);
    }

    #[test]
    fn start_with_oversized_options_is_refused() {
        let mut s = session();
        join(&mut s, "a");
        join(&mut s, "b");
        for options in [
            GameStartOptions::new(2, 2, 3_000_000_000, 1),
            GameStartOptions::new(100_000, 100_000, 5, 1),
            GameStartOptions::new(u32::MAX, u32::MAX, 5, 1),
        ] {
            let out = start(&mut s, options);
            assert!(matches!(
                to_player(&out, "host")[0],
                Notification::InvalidOptions { .. }
            ));
            assert_eq!(s.stage(), Stage::Starting);
        }
        let out = s.handle(Command::Deploy { player: id("a"), location: loc(0, 0) });
        assert_eq!(
            to_player(&out, "a"),
            vec![&Notification::DeployRejected { player: id("a") }]
        );
    }

    #[test]
    fn largest_allotment_deploys_without_overflow() {
        let mut s = session();
        for p in ["a", "b", "c"] {
            join(&mut s, p);
        }
        let armies = MAX_STARTING_ARMIES;
        start(&mut s, GameStartOptions::new(2, 2, armies, armies));
        for home in [loc(0, 0), loc(0, 1), loc(1, 1)] {
            let me = current(&s);
            let out = s.handle(Command::Deploy { player: me.clone(), location: home });
            assert_eq!(to_player(&out, me.as_str())[0], &Notification::DeployConfirmed);
        }
        assert_eq!(s.stage(), Stage::Attacking);
        let status = s.game().game_status();
        assert!(status.player_stats.iter().all(|p| p.armies == armies));
    }

    #[test]
    fn start_prompts_first_player_to_deploy() {
        let mut s = session();
        join(&mut s, "a");
        join(&mut s, "b");
        let out = start(&mut s, GameStartOptions::default());
        assert_eq!(s.stage(), Stage::Deploying);
        assert_eq!(broadcasts(&out)[0], &Notification::GameStarting);
        let first = current(&s);
        let prompts = to_player(&out, first.as_str());
        assert!(matches!(prompts[0], Notification::YourTurnToDeploy { board } if board.len() == 25));
    }

    #[test]
    fn join_refused_mid_game() {
        let mut s = session();
        join(&mut s, "a");
        start(&mut s, GameStartOptions::default());
        let out = join(&mut s, "late");
        assert_eq!(
            to_player(&out, "late"),
            vec![&Notification::JoinRejected {
                reason: "unable to join, game in progress".into()
            }]
        );
    }

    #[test]
    fn second_start_is_rejected_in_progress() {
        let mut s = session();
        join(&mut s, "a");
        start(&mut s, GameStartOptions::default());
        let out = start(&mut s, GameStartOptions::default());
        assert!(matches!(
            to_player(&out, "host")[0],
            Notification::RequestRejected { .. }
        ));
    }

    #[test]
    fn two_full_deploys_open_attack_phase() {
        let mut s = session();
        join(&mut s, "a");
        join(&mut s, "b");
        start(&mut s, GameStartOptions::new(5, 5, 5, 5));

        let first = current(&s);
        let out = s.handle(Command::Deploy { player: first.clone(), location: loc(0, 0) });
        assert_eq!(to_player(&out, first.as_str())[0], &Notification::DeployConfirmed);
        let second = current(&s);
        assert_ne!(first, second);
        assert!(matches!(
            to_player(&out, second.as_str())[0],
            Notification::YourTurnToDeploy { .. }
        ));

        let out = s.handle(Command::Deploy { player: second.clone(), location: loc(4, 4) });
        assert_eq!(s.stage(), Stage::Attacking);
        assert_eq!(s.game().state(), GameState::Attacking);
        let attacker = current(&s);
        assert!(to_player(&out, attacker.as_str())
            .iter()
            .any(|n| matches!(n, Notification::YourTurnToAttack { .. })));
        assert!(matches!(broadcasts(&out).last(), Some(Notification::GameStatus { .. })));
    }

    #[test]
    fn failed_deploy_still_advances_turn() {
        let mut s = session();
        join(&mut s, "a");
        join(&mut s, "b");
        start(&mut s, GameStartOptions::new(3, 3, 4, 1));
        let first = current(&s);
        let out = s.handle(Command::Deploy { player: first.clone(), location: loc(9, 9) });
        assert_eq!(
            to_player(&out, first.as_str())[0],
            &Notification::DeployRejected { player: first.clone() }
        );
        assert_ne!(current(&s), first);
        assert!(s.game().last_action().is_none());
    }

    #[test]
    fn deploy_out_of_turn_is_rejected_without_advancing() {
        let mut s = session();
        join(&mut s, "a");
        join(&mut s, "b");
        start(&mut s, GameStartOptions::new(3, 3, 4, 1));
        let first = current(&s);
        let other = s.game().players().iter().find(|p| **p != first).cloned().unwrap();
        let out = s.handle(Command::Deploy { player: other.clone(), location: loc(0, 0) });
        assert_eq!(
            to_player(&out, other.as_str())[0],
            &Notification::DeployRejected { player: other.clone() }
        );
        assert_eq!(current(&s), first);
    }

    #[test]
    fn deploy_from_stranger_is_dropped() {
        let mut s = session();
        join(&mut s, "a");
        start(&mut s, GameStartOptions::default());
        let out = s.handle(Command::Deploy { player: id("ghost"), location: loc(0, 0) });
        assert!(out.is_empty());
    }

    #[test]
    fn deploy_turns_skip_finished_players() {
        let mut s = session();
        join(&mut s, "a");
        join(&mut s, "b");
        start(&mut s, GameStartOptions::new(3, 3, 2, 2));
        let first = current(&s);
        s.handle(Command::Deploy { player: first.clone(), location: loc(0, 0) });
        let second = current(&s);
        // A wasted deploy leaves second behind; first has nothing left to place.
        s.handle(Command::Deploy { player: second.clone(), location: loc(0, 0) });
        assert_eq!(current(&s), second);
        s.handle(Command::Deploy { player: second.clone(), location: loc(2, 2) });
        assert_eq!(s.stage(), Stage::Attacking);
    }

    #[test]
    fn attack_outside_attack_phase_is_invalid() {
        let mut s = session();
        join(&mut s, "a");
        start(&mut s, GameStartOptions::default());
        let out = s.handle(Command::Attack { player: id("a"), from: loc(0, 0), to: loc(0, 1) });
        assert!(matches!(
            to_player(&out, "a")[0],
            Notification::InvalidAttack { .. }
        ));
        assert_eq!(s.stage(), Stage::Deploying);
    }

    #[test]
    fn attack_out_of_turn_is_invalid() {
        let mut s = in_attack_phase(GameStartOptions::new(3, 3, 4, 4), [loc(0, 0), loc(2, 2)]);
        let attacker = current(&s);
        let other = s.game().players().iter().find(|p| **p != attacker).cloned().unwrap();
        let out = s.handle(Command::Attack { player: other.clone(), from: loc(0, 0), to: loc(0, 1) });
        assert_eq!(
            to_player(&out, other.as_str()),
            vec![&Notification::InvalidAttack { player: other.clone(), reason: "not your turn".into() }]
        );
        assert_eq!(current(&s), attacker);
    }

    #[test]
    fn invalid_attack_reoffers_same_player() {
        let mut s = in_attack_phase(GameStartOptions::new(3, 3, 4, 4), [loc(0, 0), loc(2, 2)]);
        let attacker = current(&s);
        let home = s
            .game()
            .board()
            .owned_by(&attacker)
            .map(|t| t.location)
            .next()
            .unwrap();
        let out = s.handle(Command::Attack { player: attacker.clone(), from: home, to: loc(1, 1) });
        let replies = to_player(&out, attacker.as_str());
        assert!(matches!(replies[0], Notification::InvalidAttack { .. }));
        assert!(matches!(replies[1], Notification::YourTurnToAttack { .. }));
        assert_eq!(current(&s), attacker);
    }

    #[test]
    fn attack_on_unknown_location_is_reported() {
        let mut s = in_attack_phase(GameStartOptions::new(3, 3, 4, 4), [loc(0, 0), loc(2, 2)]);
        let attacker = current(&s);
        let out = s.handle(Command::Attack { player: attacker.clone(), from: loc(0, 0), to: loc(7, 7) });
        match to_player(&out, attacker.as_str())[0] {
            Notification::InvalidAttack { reason, .. } => assert!(reason.contains("(7, 7)")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(s.stage(), Stage::Attacking);
    }

    #[test]
    fn valid_attack_reports_outcome() {
        let mut s = in_attack_phase(GameStartOptions::new(3, 3, 4, 4), [loc(0, 0), loc(2, 2)]);
        let attacker = current(&s);
        let home = s
            .game()
            .board()
            .owned_by(&attacker)
            .map(|t| t.location)
            .next()
            .unwrap();
        let target = if home == loc(0, 0) { loc(0, 1) } else { loc(2, 1) };
        let out = s.handle(Command::Attack { player: attacker.clone(), from: home, to: target });
        let expected = format!("Successfully attacked from {} to {}", home, target);
        assert_eq!(
            to_player(&out, attacker.as_str())[0],
            &Notification::AttackOutcome { message: expected }
        );
        assert_eq!(s.game().last_action(), Some(GameAction::attack(home, target)));
    }

    fn home_of(s: &Session, player: &PlayerId) -> Location {
        s.game()
            .board()
            .owned_by(player)
            .map(|t| t.location)
            .next()
            .unwrap()
    }

    #[test]
    fn attacker_with_armies_to_spare_keeps_turn() {
        // At most two armies are lost per attack, so both stacks stay large.
        let mut s = in_attack_phase(GameStartOptions::new(1, 2, 10, 10), [loc(0, 0), loc(0, 1)]);
        let attacker = current(&s);
        let other = s.game().players().iter().find(|p| **p != attacker).cloned().unwrap();
        let from = home_of(&s, &attacker);
        let to = home_of(&s, &other);

        let out = s.handle(Command::Attack { player: attacker.clone(), from, to });
        assert_eq!(s.stage(), Stage::Attacking);
        assert_eq!(current(&s), attacker);
        let replies = to_player(&out, attacker.as_str());
        assert!(matches!(replies[0], Notification::AttackOutcome { .. }));
        assert!(matches!(replies.last(), Some(Notification::YourTurnToAttack { .. })));
        assert!(to_player(&out, other.as_str()).is_empty());
    }

    #[test]
    fn attacker_left_unable_to_attack_passes_turn() {
        let mut s = in_attack_phase(GameStartOptions::new(1, 2, 10, 10), [loc(0, 0), loc(0, 1)]);
        let attacker = current(&s);
        let other = s.game().players().iter().find(|p| **p != attacker).cloned().unwrap();
        let from = home_of(&s, &attacker);
        let to = home_of(&s, &other);
        // One attacking die against two: the first lost roll leaves a single army.
        s.game.board_mut().territory_mut(from).unwrap().armies = 2;

        let mut passed = None;
        for _ in 0..50 {
            let out = s.handle(Command::Attack { player: attacker.clone(), from, to });
            assert_eq!(s.stage(), Stage::Attacking);
            if current(&s) == attacker {
                assert!(matches!(
                    to_player(&out, attacker.as_str()).last(),
                    Some(Notification::YourTurnToAttack { .. })
                ));
                continue;
            }
            passed = Some(out);
            break;
        }
        let out = passed.expect("attacker never lost a roll");
        assert_eq!(current(&s), other);
        assert_eq!(s.game().board().territory(from).unwrap().armies, 1);
        assert!(!s.game().player_can_attack(&attacker));
        assert!(to_player(&out, attacker.as_str())
            .iter()
            .all(|n| !matches!(n, Notification::YourTurnToAttack { .. })));
        assert!(matches!(
            to_player(&out, other.as_str())[0],
            Notification::YourTurnToAttack { .. }
        ));
    }

    #[test]
    fn current_player_without_attacks_is_rejected_and_passed() {
        let mut s = in_attack_phase(GameStartOptions::new(1, 2, 4, 4), [loc(0, 0), loc(0, 1)]);
        let attacker = current(&s);
        let other = s.game().players().iter().find(|p| **p != attacker).cloned().unwrap();
        let from = home_of(&s, &attacker);
        let to = home_of(&s, &other);
        s.game.board_mut().territory_mut(from).unwrap().armies = 1;

        let out = s.handle(Command::Attack { player: attacker.clone(), from, to });
        assert_eq!(
            to_player(&out, attacker.as_str()),
            vec![&Notification::InvalidAttack {
                player: attacker.clone(),
                reason: "none of your territories can attack".into()
            }]
        );
        assert_eq!(s.stage(), Stage::Attacking);
        assert_eq!(current(&s), other);
        assert!(matches!(
            to_player(&out, other.as_str())[0],
            Notification::YourTurnToAttack { .. }
        ));
        assert_eq!(s.game().board().territory(to).unwrap().armies, 4);
    }

    #[test]
    fn cease_advances_turn() {
        let mut s = in_attack_phase(GameStartOptions::new(3, 3, 4, 4), [loc(0, 0), loc(2, 2)]);
        let attacker = current(&s);
        let out = s.handle(Command::CeaseAttacking { player: attacker.clone() });
        let next = current(&s);
        assert_ne!(next, attacker);
        assert!(matches!(
            to_player(&out, next.as_str())[0],
            Notification::YourTurnToAttack { .. }
        ));
    }

    #[test]
    fn nobody_able_to_attack_ends_game_on_next_command() {
        // One army each: no territory can ever attack.
        let mut s = in_attack_phase(GameStartOptions::new(3, 3, 1, 1), [loc(0, 0), loc(2, 2)]);
        let attacker = current(&s);
        let out = s.handle(Command::CeaseAttacking { player: attacker });
        assert_eq!(s.stage(), Stage::GameOver);
        assert_eq!(s.game().state(), GameState::GameOver);
        let status = final_status(&out).unwrap();
        assert_eq!(status.players.len(), 2);
    }

    #[test]
    fn conquest_ends_game() {
        let mut s = in_attack_phase(GameStartOptions::new(1, 2, 6, 6), [loc(0, 0), loc(0, 1)]);
        let mut out = Vec::new();
        for _ in 0..200 {
            if s.stage() == Stage::GameOver {
                break;
            }
            let me = current(&s);
            let (from, to) = if s.game().board().territory(loc(0, 0)).unwrap().is_owned_by(&me) {
                (loc(0, 0), loc(0, 1))
            } else {
                (loc(0, 1), loc(0, 0))
            };
            out = s.handle(Command::Attack { player: me, from, to });
        }
        assert_eq!(s.stage(), Stage::GameOver);
        assert!(final_status(&out).is_some());
    }

    #[test]
    fn removing_current_attacker_advances_turn() {
        let mut s = session();
        for p in ["a", "b", "c"] {
            join(&mut s, p);
        }
        start(&mut s, GameStartOptions::new(3, 3, 3, 3));
        for home in [loc(0, 0), loc(1, 1), loc(2, 2)] {
            let me = current(&s);
            s.handle(Command::Deploy { player: me, location: home });
        }
        assert_eq!(s.stage(), Stage::Attacking);
        let gone = current(&s);
        let out = s.handle(Command::PlayerDisconnected { player: gone.clone() });
        let next = current(&s);
        assert_ne!(next, gone);
        assert!(!s.game().contains(&gone));
        assert!(matches!(
            to_player(&out, next.as_str())[0],
            Notification::YourTurnToAttack { .. }
        ));
    }

    #[test]
    fn removal_leaving_one_player_ends_game() {
        let mut s = in_attack_phase(GameStartOptions::new(3, 3, 4, 4), [loc(0, 0), loc(2, 2)]);
        let out = s.handle(Command::PlayerEjected { player: id("a") });
        assert!(broadcasts(&out).contains(&&Notification::PlayerEjected { player: id("a") }));
        assert_eq!(s.stage(), Stage::GameOver);
        assert!(final_status(&out).is_some());
    }

    #[test]
    fn removing_last_deployer_opens_attack_phase() {
        let mut s = session();
        for p in ["a", "b", "c"] {
            join(&mut s, p);
        }
        start(&mut s, GameStartOptions::new(3, 3, 2, 2));
        let first = current(&s);
        s.handle(Command::Deploy { player: first, location: loc(0, 0) });
        let second = current(&s);
        s.handle(Command::Deploy { player: second, location: loc(2, 2) });
        let third = current(&s);
        s.handle(Command::PlayerDisconnected { player: third });
        assert_eq!(s.stage(), Stage::Attacking);
        assert_eq!(s.game().players().len(), 2);
        assert!(s.game().current_player().is_some());
    }

    #[test]
    fn ejecting_a_stranger_is_harmless() {
        let mut s = session();
        join(&mut s, "a");
        let out = s.handle(Command::PlayerEjected { player: id("nobody") });
        assert_eq!(broadcasts(&out), vec![&Notification::PlayerEjected { player: id("nobody") }]);
        assert_eq!(s.game().players().len(), 1);
    }

    #[test]
    fn restart_after_game_over() {
        let mut s = in_attack_phase(GameStartOptions::new(3, 3, 1, 1), [loc(0, 0), loc(2, 2)]);
        let me = current(&s);
        s.handle(Command::CeaseAttacking { player: me });
        assert_eq!(s.stage(), Stage::GameOver);

        let out = start(&mut s, GameStartOptions::default());
        assert!(matches!(to_player(&out, "host")[0], Notification::RequestRejected { .. }));

        let out = s.handle(Command::Restart {
            requester: id("host"),
            secret_code: "bad".into(),
            options: None,
        });
        assert_eq!(to_player(&out, "host"), vec![&Notification::InvalidSecretCode]);
        assert_eq!(s.stage(), Stage::GameOver);

        join(&mut s, "c");
        let out = s.handle(Command::Restart {
            requester: id("host"),
            secret_code: CODE.into(),
            options: None,
        });
        assert_eq!(broadcasts(&out)[0], &Notification::GameStarting);
        assert_eq!(s.stage(), Stage::Deploying);
        assert_eq!(s.game().players().len(), 3);
        // Options from the previous start are reused.
        assert_eq!(s.game().options(), &GameStartOptions::new(3, 3, 1, 1));
        assert!(s.game().board().territories().iter().all(|t| t.owner.is_none()));
    }

    #[test]
    fn status_goes_only_to_requester() {
        let mut s = session();
        join(&mut s, "a");
        let out = s.handle(Command::Status { requester: id("watcher") });
        assert_eq!(out.len(), 1);
        assert!(matches!(
            to_player(&out, "watcher")[0],
            Notification::GameStatus { status } if status.players == vec!["A".to_string()]
        ));
    }
}
