//! The game state trait the search is generic over.

use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

/// Errors a game implementation can report to the search.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GameError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Game is already over")]
    GameOver,

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// A game position as seen by the search.
///
/// Implementations must have value semantics: `apply_move` returns a new
/// state and never mutates `self`, so a state referenced by one tree node is
/// never changed by expanding another.
///
/// # Perspective
///
/// `outcome` is scored from the point of view of the player to move in the
/// terminal position. In an alternating game where the previous move won,
/// the player to move has lost, so the outcome is `-1.0`.
///
/// # Example
///
/// ```rust
/// use engine_core::{GameError, GameState};
///
/// /// Take one or two stones; whoever takes the last stone wins.
/// #[derive(Debug, Clone)]
/// struct Nim(u8);
///
/// impl GameState for Nim {
///     type Move = u8;
///
///     fn legal_moves(&self) -> Vec<u8> {
///         (1..=2).filter(|&n| n <= self.0).collect()
///     }
///
///     fn apply_move(&self, mv: u8) -> Result<Self, GameError> {
///         if mv == 0 || mv > self.0.min(2) {
///             return Err(GameError::IllegalMove(mv.to_string()));
///         }
///         Ok(Nim(self.0 - mv))
///     }
///
///     fn is_terminal(&self) -> bool {
///         self.0 == 0
///     }
///
///     fn outcome(&self) -> Option<f32> {
///         // The opponent took the last stone.
///         self.is_terminal().then_some(-1.0)
///     }
/// }
///
/// let s = Nim(3).apply_move(2).unwrap();
/// assert_eq!(s.legal_moves(), vec![1]);
/// ```
pub trait GameState: Clone + Debug + Send + Sync + 'static {
    /// A move in this game. Small and `Copy`; the order returned by
    /// [`GameState::legal_moves`] is the canonical order used to break ties.
    type Move: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Whether the player to move changes after every move.
    ///
    /// When true, values are negated at each ply during backpropagation and
    /// a child's mean value is negated when its parent scores it.
    const ALTERNATING: bool = true;

    /// Legal moves in canonical order. Empty for terminal states.
    fn legal_moves(&self) -> Vec<Self::Move>;

    /// Return the state reached by playing `mv`, leaving `self` untouched.
    fn apply_move(&self, mv: Self::Move) -> Result<Self, GameError>;

    /// True once the game has ended.
    fn is_terminal(&self) -> bool;

    /// Final score from the perspective of the player to move, in `[-1, 1]`.
    /// `None` while the game is still running.
    fn outcome(&self) -> Option<f32>;
}
