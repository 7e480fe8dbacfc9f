//! Conquest: a territory-conquest rules engine and session coordinator.
//!
//! Exposes the board model, the rules engine, the per-session command state
//! machine and its async mailbox, the text protocol parser, and the self-play
//! simulator for use by the binaries, benchmarks, and integration tests.

pub mod board;
pub mod config;
pub mod game;
pub mod protocol;
pub mod session;
pub mod simulate;
