//! Core traits and types for games searched by the MCTS engine
//!
//! This crate provides the one abstraction the search needs from a game:
//! - `GameState`: an immutable position with legal-move generation, move
//!   application that returns a new state, and terminal scoring
//! - `GameError`: failures a game implementation may report
//!
//! Everything about the rules lives behind the trait; the search never
//! inspects a board directly.

pub mod game;

pub use game::{GameError, GameState};
