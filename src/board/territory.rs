//! Ownable grid cells.

use super::location::Location;
use super::player::PlayerId;

/// A single ownable cell of the board.
///
/// An unowned territory always holds zero armies; an owned one always holds
/// at least one. The rules engine maintains this through [`Territory::claim`]
/// and [`Territory::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Territory {
    pub location: Location,
    pub owner: Option<PlayerId>,
    pub armies: u32,
}

impl Territory {
    /// Creates an unowned territory with no armies.
    pub fn new(location: Location) -> Self {
        Self {
            location,
            owner: None,
            armies: 0,
        }
    }

    pub fn is_owned_by(&self, player: &PlayerId) -> bool {
        self.owner.as_ref() == Some(player)
    }

    /// Hands the territory to `player` with the given garrison.
    pub fn claim(&mut self, player: PlayerId, armies: u32) {
        debug_assert!(armies > 0, "owned territory must hold armies");
        self.owner = Some(player);
        self.armies = armies;
    }

    /// Returns the territory to the unowned state.
    pub fn release(&mut self) {
        self.owner = None;
        self.armies = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_territory_is_unowned() {
        let t = Territory::new(Location::new(0, 1));
        assert!(t.owner.is_none());
        assert_eq!(t.armies, 0);
    }

    #[test]
    fn claim_and_release() {
        let alice = PlayerId::from("alice");
        let mut t = Territory::new(Location::new(0, 0));
        t.claim(alice.clone(), 3);
        assert!(t.is_owned_by(&alice));
        assert!(!t.is_owned_by(&PlayerId::from("bob")));
        assert_eq!(t.armies, 3);

        t.release();
        assert!(t.owner.is_none());
        assert_eq!(t.armies, 0);
    }
}
