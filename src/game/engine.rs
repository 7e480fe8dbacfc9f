//! The rules engine.
//!
//! [`Game`] owns the board, the roster in turn order, the current-turn
//! pointer, and the phase. Every operation takes the acting player and any
//! target explicitly; validation failures come back as values and leave the
//! state untouched. The engine performs no I/O.

use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::cards::{card_from_roll, CardHands};
use super::combat::{
    attacker_dice_count, compare_rolls, defender_dice_count, roll_sorted, Dice, SeededDice,
    TryAttackResult,
};
use super::options::GameStartOptions;
use super::state::{GameAction, GameState};
use super::status::{GameStatus, PlayerStats, TerritoryStatus};
use crate::board::{Board, BoardError, Location, PlayerId};
use crate::config::ConfigError;

/// Authoritative state for one game.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    players: Vec<PlayerId>,
    names: HashMap<PlayerId, String>,
    /// Index into `players` of the current player.
    turn: usize,
    /// The current player was removed; the next advance lands on `turn` itself.
    turn_vacated: bool,
    state: GameState,
    options: GameStartOptions,
    cards: Option<CardHands>,
    last_action: Option<GameAction>,
    rng: SmallRng,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// Creates an empty game in the joining phase with an entropy-seeded shuffle.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Creates an empty game whose roster shuffle is driven by `seed` (0 = entropy).
    pub fn with_seed(seed: u64) -> Self {
        let rng = if seed != 0 {
            SmallRng::seed_from_u64(seed)
        } else {
            SmallRng::from_entropy()
        };
        Game {
            board: Board::empty(),
            players: Vec::new(),
            names: HashMap::new(),
            turn: 0,
            turn_vacated: false,
            state: GameState::Joining,
            options: GameStartOptions::default(),
            cards: None,
            last_action: None,
            rng,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn options(&self) -> &GameStartOptions {
        &self.options
    }

    /// Roster in turn order.
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn contains(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }

    pub fn display_name(&self, player: &PlayerId) -> Option<&str> {
        self.names.get(player).map(String::as_str)
    }

    pub fn last_action(&self) -> Option<GameAction> {
        self.last_action
    }

    pub fn set_last_action(&mut self, action: Option<GameAction>) {
        self.last_action = action;
    }

    pub fn cards(&self) -> Option<&CardHands> {
        self.cards.as_ref()
    }

    /// Adds a player to the end of the roster. Returns false if already present.
    pub fn add_player(&mut self, player: PlayerId, name: impl Into<String>) -> bool {
        if self.contains(&player) {
            return false;
        }
        self.names.insert(player.clone(), name.into());
        self.players.push(player);
        true
    }

    /// Builds a fresh board and records the army settings.
    ///
    /// Wipes all territory ownership, card hands, and the last action. The
    /// roster is kept.
    pub fn initialize_game(&mut self, options: &GameStartOptions) -> Result<(), ConfigError> {
        options.validate()?;
        self.board = Board::new(options.height, options.width);
        self.options = *options;
        self.cards = options.territory_cards.then(CardHands::new);
        self.last_action = None;
        self.turn = 0;
        self.turn_vacated = false;
        self.state = GameState::Initializing;
        Ok(())
    }

    /// Shuffles the roster, makes its first entry current, and opens deployment.
    ///
    /// The caller must ensure the roster is non-empty.
    pub fn start_game(&mut self) {
        debug_assert!(!self.players.is_empty(), "start_game with an empty roster");
        self.players.shuffle(&mut self.rng);
        self.turn = 0;
        self.turn_vacated = false;
        self.state = GameState::Deploying;
        debug!(players = self.players.len(), "game started");
    }

    /// The player whose commands are currently authoritative.
    pub fn current_player(&self) -> Option<&PlayerId> {
        if self.turn_vacated || (!self.state.has_turns() && self.state != GameState::GameOver) {
            return None;
        }
        self.players.get(self.turn)
    }

    pub fn is_current(&self, player: &PlayerId) -> bool {
        self.current_player() == Some(player)
    }

    /// Advances the turn to the next roster entry, wrapping around.
    ///
    /// Returns `None` when the roster is empty.
    pub fn next_player(&mut self) -> Option<PlayerId> {
        if self.players.is_empty() {
            return None;
        }
        if self.turn_vacated {
            self.turn %= self.players.len();
            self.turn_vacated = false;
        } else {
            self.turn = (self.turn + 1) % self.players.len();
        }
        Some(self.players[self.turn].clone())
    }

    /// Armies the player has yet to place during deployment.
    pub fn remaining_armies(&self, player: &PlayerId) -> u32 {
        if !self.contains(player) {
            return 0;
        }
        self.options
            .starting_armies_per_player
            .saturating_sub(self.board.armies_of(player))
    }

    /// Unplaced armies summed over the roster.
    pub fn total_remaining_armies(&self) -> u64 {
        self.players
            .iter()
            .map(|p| u64::from(self.remaining_armies(p)))
            .sum()
    }

    /// Places one deploy increment for `player` at `location`.
    ///
    /// Fails without mutation outside the deploy phase, for players with no
    /// armies left, for off-board locations, and for territories held by
    /// someone else. Moves the game to the attack phase once every player's
    /// allotment is on the board.
    pub fn try_place_army(&mut self, player: &PlayerId, location: Location) -> bool {
        if self.state != GameState::Deploying {
            return false;
        }
        let remaining = self.remaining_armies(player);
        if remaining == 0 {
            return false;
        }
        let increment = remaining.min(self.options.armies_deployed_per_turn);

        let Ok(territory) = self.board.territory_mut(location) else {
            return false;
        };
        if territory.owner.is_none() {
            territory.claim(player.clone(), increment);
        } else if territory.is_owned_by(player) {
            territory.armies = territory.armies.saturating_add(increment);
        } else {
            return false;
        }

        if self.total_remaining_armies() == 0 {
            self.state = GameState::Attacking;
            debug!("all armies deployed, attack phase begins");
        }
        true
    }

    /// True iff the player holds a territory with more than one army that
    /// borders a territory they do not own.
    pub fn player_can_attack(&self, player: &PlayerId) -> bool {
        self.board
            .owned_by(player)
            .filter(|t| t.armies > 1)
            .any(|t| {
                self.board
                    .neighbors(t.location)
                    .iter()
                    .any(|n| !n.is_owned_by(player))
            })
    }

    pub fn any_player_can_attack(&self) -> bool {
        self.players.iter().any(|p| self.player_can_attack(p))
    }

    /// Resolves one assault with freshly seeded dice (seed 0 = entropy).
    pub fn try_attack(
        &mut self,
        attacker: &PlayerId,
        from: Location,
        to: Location,
        seed: u64,
    ) -> Result<TryAttackResult, BoardError> {
        let mut dice = SeededDice::new(seed);
        self.try_attack_with(attacker, from, to, &mut dice)
    }

    /// Resolves one assault using the supplied dice.
    ///
    /// Unknown locations are errors; every other rule violation is reported
    /// through [`TryAttackResult::attack_invalid`] with the board unchanged.
    pub fn try_attack_with<D: Dice + ?Sized>(
        &mut self,
        attacker: &PlayerId,
        from: Location,
        to: Location,
        dice: &mut D,
    ) -> Result<TryAttackResult, BoardError> {
        let attacking = self.board.territory(from)?;
        let defending = self.board.territory(to)?;

        if self.state != GameState::Attacking {
            return Ok(TryAttackResult::invalid(format!(
                "attacks are not allowed while {}",
                self.state
            )));
        }
        if !attacking.is_owned_by(attacker) {
            return Ok(TryAttackResult::invalid(format!("you do not own {}", from)));
        }
        if defending.is_owned_by(attacker) {
            return Ok(TryAttackResult::invalid(format!("you already own {}", to)));
        }
        if attacking.armies <= 1 {
            return Ok(TryAttackResult::invalid(format!(
                "{} needs more than one army to attack",
                from
            )));
        }
        if !self.board.attack_target_is_valid(from, to) {
            return Ok(TryAttackResult::invalid(format!(
                "{} is not adjacent to {}",
                to, from
            )));
        }

        let attack_rolls = roll_sorted(dice, attacker_dice_count(attacking.armies));
        let defend_rolls = roll_sorted(dice, defender_dice_count(defending.armies));
        let losses = compare_rolls(&attack_rolls, &defend_rolls);

        let (attacking, defending) = self.board.pair_mut(from, to)?;
        attacking.armies = attacking.armies.saturating_sub(losses.attacker);
        defending.armies = defending.armies.saturating_sub(losses.defender);

        if defending.armies >= 1 {
            return Ok(TryAttackResult::resolved(attacking.armies > 1));
        }

        // A capture means every pairing was won, so the attacker still has
        // at least two armies. All but one move in.
        debug_assert!(attacking.armies >= 2);
        let moved = attacking.armies - 1;
        defending.claim(attacker.clone(), moved);
        attacking.armies -= moved;

        if let Some(cards) = self.cards.as_mut() {
            let bonus = cards.draw(attacker, card_from_roll(dice.roll()));
            if bonus > 0 {
                defending.armies = defending.armies.saturating_add(bonus);
                debug!(player = %attacker, bonus, "territory card set cashed in");
            }
        }

        debug!(player = %attacker, %from, %to, "territory captured");
        if self.is_conquered() {
            self.state = GameState::GameOver;
            debug!(player = %attacker, "board conquered");
        }
        Ok(TryAttackResult::captured())
    }

    /// True when every owned territory belongs to one player.
    fn is_conquered(&self) -> bool {
        let mut owners = self.board.territories().iter().filter_map(|t| t.owner.as_ref());
        match owners.next() {
            Some(first) => owners.all(|o| o == first),
            None => false,
        }
    }

    pub fn set_game_over(&mut self) {
        self.state = GameState::GameOver;
    }

    /// Drops a player from the roster and releases their territories.
    ///
    /// The turn pointer is not advanced; if the removed player held the turn
    /// the caller should call [`Game::next_player`]. Returns false if the
    /// player was not in the roster.
    pub fn remove_player(&mut self, player: &PlayerId) -> bool {
        let Some(index) = self.players.iter().position(|p| p == player) else {
            return false;
        };
        self.players.remove(index);
        self.names.remove(player);

        if index < self.turn {
            self.turn -= 1;
        } else if index == self.turn {
            self.turn_vacated = true;
        }

        for territory in self.board.territories_mut() {
            if territory.is_owned_by(player) {
                territory.release();
            }
        }
        if let Some(cards) = self.cards.as_mut() {
            cards.remove_player(player);
        }

        if self.state == GameState::Deploying
            && !self.players.is_empty()
            && self.total_remaining_armies() == 0
        {
            self.state = GameState::Attacking;
        }
        true
    }

    /// Projects the current board and roster into a fresh snapshot.
    pub fn game_status(&self) -> GameStatus {
        let name_of = |player: &PlayerId| -> String {
            self.names
                .get(player)
                .cloned()
                .unwrap_or_else(|| player.to_string())
        };

        let board = self
            .board
            .territories()
            .iter()
            .map(|t| TerritoryStatus {
                location: t.location,
                owner: t.owner.as_ref().map(name_of),
                armies: t.armies,
            })
            .collect();

        let player_stats = self
            .players
            .iter()
            .map(|p| {
                PlayerStats::new(
                    name_of(p),
                    self.board.armies_of(p),
                    self.board.territory_count_of(p) as u32,
                )
            })
            .collect();

        GameStatus {
            players: self.players.iter().map(name_of).collect(),
            state: self.state,
            board,
            player_stats,
            current_player: self.current_player().map(name_of),
            last_action: self.last_action,
        }
    }
}
