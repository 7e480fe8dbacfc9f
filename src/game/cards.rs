//! Territory cards.
//!
//! When enabled, every capture draws a card valued 1 to 3 into the captor's
//! hand. A hand holding a set (three equal values, or one each of 1, 2 and 3)
//! is cashed in on the spot for bonus armies, and each cash-in raises the
//! bonus for the next one.

use std::collections::HashMap;

use crate::board::PlayerId;

pub const MAX_HAND: usize = 6;
pub const SET_BONUS: u32 = 5;

/// Maps a die roll onto a card value in `1..=3`.
pub fn card_from_roll(roll: u8) -> u8 {
    roll.clamp(1, 6).div_ceil(2)
}

/// Card hands for every player plus the escalating turn-in counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardHands {
    hands: HashMap<PlayerId, Vec<u8>>,
    turn_ins: u32,
}

impl Default for CardHands {
    fn default() -> Self {
        CardHands {
            hands: HashMap::new(),
            turn_ins: 1,
        }
    }
}

impl CardHands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hand(&self, player: &PlayerId) -> &[u8] {
        self.hands.get(player).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Multiplier applied to the next cash-in.
    pub fn turn_ins(&self) -> u32 {
        self.turn_ins
    }

    /// Adds `card` to the player's hand and cashes in any sets.
    ///
    /// Returns the bonus armies earned. A full hand drops the drawn card but
    /// still checks for sets.
    pub fn draw(&mut self, player: &PlayerId, card: u8) -> u32 {
        let hand = self.hands.entry(player.clone()).or_default();
        if hand.len() < MAX_HAND {
            hand.push(card);
        }

        let mut bonus = 0;
        while let Some(set) = find_set(hand) {
            for card in set {
                if let Some(pos) = hand.iter().position(|c| *c == card) {
                    hand.swap_remove(pos);
                }
            }
            bonus += self.turn_ins * SET_BONUS;
            self.turn_ins += 1;
        }
        bonus
    }

    pub fn remove_player(&mut self, player: &PlayerId) {
        self.hands.remove(player);
    }
}

/// Finds three cards forming a set, preferring three of a kind.
fn find_set(hand: &[u8]) -> Option<[u8; 3]> {
    let mut counts = [0usize; 4];
    for &card in hand {
        if let Some(slot) = counts.get_mut(card as usize) {
            *slot += 1;
        }
    }
    for value in 1..=3u8 {
        if counts[value as usize] >= 3 {
            return Some([value; 3]);
        }
    }
    if counts[1] > 0 && counts[2] > 0 && counts[3] > 0 {
        return Some([1, 2, 3]);
    }
    None
}
