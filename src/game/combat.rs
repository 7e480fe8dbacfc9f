//! Dice-based combat resolution.
//!
//! An assault rolls up to three attacker dice and up to two defender dice.
//! Both sets are sorted high to low and compared pairwise; each pairing costs
//! the loser one army, with ties going to the defender. The attacker always
//! keeps one army out of the fight, so an assault never empties the attacking
//! territory.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

pub const MAX_ATTACKER_DICE: usize = 3;
pub const MAX_DEFENDER_DICE: usize = 2;

/// A source of six-sided die rolls.
pub trait Dice {
    /// Returns a value in `1..=6`.
    fn roll(&mut self) -> u8;
}

/// Dice backed by a seedable PRNG.
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: SmallRng,
}

impl SeededDice {
    /// Seed 0 draws fresh entropy; any other seed is fully reproducible.
    pub fn new(seed: u64) -> Self {
        let rng = if seed != 0 {
            SmallRng::seed_from_u64(seed)
        } else {
            SmallRng::from_entropy()
        };
        SeededDice { rng }
    }
}

impl Dice for SeededDice {
    fn roll(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }
}

/// Number of dice the attacker rolls from a territory holding `armies`.
pub fn attacker_dice_count(armies: u32) -> usize {
    (armies as usize).min(MAX_ATTACKER_DICE).saturating_sub(1)
}

/// Number of dice the defender rolls from a territory holding `armies`.
pub fn defender_dice_count(armies: u32) -> usize {
    (armies as usize).min(MAX_DEFENDER_DICE)
}

/// Rolls `count` dice and returns them sorted high to low.
pub fn roll_sorted<D: Dice + ?Sized>(dice: &mut D, count: usize) -> Vec<u8> {
    let mut rolls: Vec<u8> = (0..count).map(|_| dice.roll()).collect();
    rolls.sort_unstable_by(|a, b| b.cmp(a));
    rolls
}

/// Armies lost by each side in one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Casualties {
    pub attacker: u32,
    pub defender: u32,
}

/// Compares descending-sorted rolls pairwise.
///
/// Only as many pairings as both sides have dice are fought. The attacker
/// must roll strictly higher to win a pairing.
pub fn compare_rolls(attack: &[u8], defend: &[u8]) -> Casualties {
    let mut losses = Casualties::default();
    for (a, d) in attack.iter().zip(defend.iter()) {
        if a > d {
            losses.defender += 1;
        } else {
            losses.attacker += 1;
        }
    }
    losses
}

/// The outcome of an attack request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TryAttackResult {
    /// The request broke a rule; nothing on the board changed.
    pub attack_invalid: bool,
    /// The attacker may keep pressing this same assault.
    pub can_continue: bool,
    /// Why the attack was rejected, when it was.
    pub message: Option<String>,
}

impl TryAttackResult {
    pub fn invalid(message: impl Into<String>) -> Self {
        TryAttackResult {
            attack_invalid: true,
            can_continue: false,
            message: Some(message.into()),
        }
    }

    /// The defending territory fell.
    pub fn captured() -> Self {
        TryAttackResult {
            attack_invalid: false,
            can_continue: false,
            message: None,
        }
    }

    pub fn resolved(can_continue: bool) -> Self {
        TryAttackResult {
            attack_invalid: false,
            can_continue,
            message: None,
        }
    }
}
