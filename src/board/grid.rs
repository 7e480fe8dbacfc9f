//! The territory grid and its adjacency queries.
//!
//! Territories are stored row-major in a flat vector so that a location maps
//! to an index in O(1). Adjacency is orthogonal only: two cells are neighbours
//! when they share an edge. The relation is symmetric by construction.

use thiserror::Error;

use super::location::Location;
use super::player::PlayerId;
use super::territory::Territory;

/// Errors from board lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("no territory at {0}")]
    NotFound(Location),
}

/// The fixed grid of territories for one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    height: u32,
    width: u32,
    territories: Vec<Territory>,
}

impl Board {
    /// Generates a `height` x `width` grid of unowned territories.
    pub fn new(height: u32, width: u32) -> Self {
        let mut territories = Vec::with_capacity((height as usize) * (width as usize));
        for r in 0..height {
            for c in 0..width {
                territories.push(Territory::new(Location::new(r as i32, c as i32)));
            }
        }
        Board {
            height,
            width,
            territories,
        }
    }

    /// A board with no territories, used before the first game is initialised.
    pub fn empty() -> Self {
        Board::new(0, 0)
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// All territories in row-major order.
    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    pub(crate) fn territories_mut(&mut self) -> &mut [Territory] {
        &mut self.territories
    }

    fn index_of(&self, location: Location) -> Option<usize> {
        if location.row < 0 || location.column < 0 {
            return None;
        }
        let (r, c) = (location.row as u32, location.column as u32);
        if r >= self.height || c >= self.width {
            return None;
        }
        Some(r as usize * self.width as usize + c as usize)
    }

    pub fn contains(&self, location: Location) -> bool {
        self.index_of(location).is_some()
    }

    /// Looks up the territory at `location`.
    pub fn territory(&self, location: Location) -> Result<&Territory, BoardError> {
        self.index_of(location)
            .map(|i| &self.territories[i])
            .ok_or(BoardError::NotFound(location))
    }

    pub fn territory_mut(&mut self, location: Location) -> Result<&mut Territory, BoardError> {
        match self.index_of(location) {
            Some(i) => Ok(&mut self.territories[i]),
            None => Err(BoardError::NotFound(location)),
        }
    }

    /// Returns mutable references to two distinct territories at once.
    pub(crate) fn pair_mut(
        &mut self,
        a: Location,
        b: Location,
    ) -> Result<(&mut Territory, &mut Territory), BoardError> {
        let ia = self.index_of(a).ok_or(BoardError::NotFound(a))?;
        let ib = self.index_of(b).ok_or(BoardError::NotFound(b))?;
        debug_assert_ne!(ia, ib, "pair_mut requires distinct locations");
        if ia < ib {
            let (lo, hi) = self.territories.split_at_mut(ib);
            Ok((&mut lo[ia], &mut hi[0]))
        } else {
            let (lo, hi) = self.territories.split_at_mut(ia);
            Ok((&mut hi[0], &mut lo[ib]))
        }
    }

    /// Returns every on-board territory orthogonally adjacent to `location`.
    ///
    /// An off-board location has no neighbours.
    pub fn neighbors(&self, location: Location) -> Vec<&Territory> {
        if !self.contains(location) {
            return Vec::new();
        }
        location
            .orthogonal()
            .into_iter()
            .filter_map(|l| self.index_of(l))
            .map(|i| &self.territories[i])
            .collect()
    }

    /// True iff `to` is a neighbour of `from`.
    pub fn attack_target_is_valid(&self, from: Location, to: Location) -> bool {
        self.contains(from) && self.contains(to) && from.is_orthogonal_to(to)
    }

    /// Iterates over the territories owned by `player`.
    pub fn owned_by<'a>(&'a self, player: &'a PlayerId) -> impl Iterator<Item = &'a Territory> + 'a {
        self.territories.iter().filter(move |t| t.is_owned_by(player))
    }

    /// Sum of armies on all territories owned by `player`.
    pub fn armies_of(&self, player: &PlayerId) -> u32 {
        self.owned_by(player)
            .fold(0u32, |total, t| total.saturating_add(t.armies))
    }

    pub fn territory_count_of(&self, player: &PlayerId) -> usize {
        self.owned_by(player).count()
    }
}
