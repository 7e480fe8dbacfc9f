//! Board representation.
//!
//! Contains the grid of territories, coordinate types, player identities, and
//! orthogonal adjacency queries. The board holds ownership data only; all
//! game rules live in [`crate::game`].

pub mod grid;
pub mod location;
pub mod player;
pub mod territory;

pub use grid::{Board, BoardError};
pub use location::Location;
pub use player::PlayerId;
pub use territory::Territory;
