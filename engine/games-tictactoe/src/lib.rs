//! TicTacToe game implementation for the MCTS engine
//!
//! This crate provides a complete reference implementation of TicTacToe
//! demonstrating how to implement the `GameState` trait for the search.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::GameState;
//! use games_tictactoe::State;
//!
//! let state = State::new();
//! assert_eq!(state.legal_moves().len(), 9);
//!
//! let next = state.apply_move(4).unwrap();
//! assert_eq!(next.legal_moves().len(), 8);
//! ```

use std::fmt;

use engine_core::{GameError, GameState};
use serde::{Deserialize, Serialize};

/// Number of cells on the board, and therefore the size of the move space.
pub const NUM_CELLS: usize = 9;

/// Winning positions (rows, columns, diagonals)
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

/// TicTacToe game state
///
/// Represents the complete state of a TicTacToe game including the board,
/// current player, and winner information. The state is `Copy`, so applying
/// a move always produces an independent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    /// Board representation: 0=empty, 1=X, 2=O
    board: [u8; NUM_CELLS],
    /// Current player: 1=X, 2=O
    current_player: u8,
    /// Winner: 0=none/ongoing, 1=X, 2=O, 3=draw
    winner: u8,
}

impl State {
    /// Create a new initial game state
    pub fn new() -> Self {
        Self {
            board: [0; NUM_CELLS],
            current_player: 1, // X goes first
            winner: 0,
        }
    }

    /// Build a state from a board, inferring the player to move and the winner.
    ///
    /// X always moves first, so the board must hold as many X as O, or one
    /// more X.
    pub fn from_board(board: [u8; NUM_CELLS]) -> Result<Self, GameError> {
        if let Some(cell) = board.iter().find(|&&c| c > 2) {
            return Err(GameError::InvalidState(format!("Invalid board cell: {cell}")));
        }

        let xs = board.iter().filter(|&&c| c == 1).count();
        let os = board.iter().filter(|&&c| c == 2).count();
        if xs != os && xs != os + 1 {
            return Err(GameError::InvalidState(format!(
                "Piece counts out of turn: {xs} X, {os} O"
            )));
        }

        Ok(Self {
            board,
            current_player: if xs == os { 1 } else { 2 },
            winner: Self::check_winner(&board),
        })
    }

    /// Replay a sequence of moves from the initial position.
    pub fn from_moves(moves: &[u8]) -> Result<Self, GameError> {
        moves
            .iter()
            .try_fold(Self::new(), |state, &mv| state.apply_move(mv))
    }

    /// Board cells: 0=empty, 1=X, 2=O
    pub fn board(&self) -> &[u8; NUM_CELLS] {
        &self.board
    }

    /// Player to move: 1=X, 2=O
    pub fn current_player(&self) -> u8 {
        self.current_player
    }

    /// Winner: 0=none/ongoing, 1=X, 2=O, 3=draw
    pub fn winner(&self) -> u8 {
        self.winner
    }

    /// Check if the game is over
    pub fn is_done(&self) -> bool {
        self.winner != 0
    }

    /// Check for winner on the board
    fn check_winner(board: &[u8; NUM_CELLS]) -> u8 {
        for line in &LINES {
            let [a, b, c] = *line;
            if board[a] != 0 && board[a] == board[b] && board[b] == board[c] {
                return board[a]; // Return the winning player
            }
        }

        // Check for draw (board full but no winner)
        if board.iter().all(|&cell| cell != 0) {
            return 3; // Draw
        }

        0 // Game ongoing
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState for State {
    type Move = u8;

    /// Empty positions in ascending order.
    fn legal_moves(&self) -> Vec<u8> {
        if self.is_done() {
            return Vec::new();
        }

        (0..NUM_CELLS as u8)
            .filter(|&pos| self.board[pos as usize] == 0)
            .collect()
    }

    fn apply_move(&self, position: u8) -> Result<Self, GameError> {
        if self.is_done() {
            return Err(GameError::GameOver);
        }
        if position as usize >= NUM_CELLS || self.board[position as usize] != 0 {
            return Err(GameError::IllegalMove(format!("position {position}")));
        }

        let mut new_state = *self;
        new_state.board[position as usize] = self.current_player;
        new_state.winner = Self::check_winner(&new_state.board);

        // Switch player if game not over
        if new_state.winner == 0 {
            new_state.current_player = if self.current_player == 1 { 2 } else { 1 };
        }

        Ok(new_state)
    }

    fn is_terminal(&self) -> bool {
        self.is_done()
    }

    /// A finished game is scored for the player to move. The player who
    /// completed a line is never the one to move, so a win reads as `-1.0`.
    fn outcome(&self) -> Option<f32> {
        match self.winner {
            0 => None,
            3 => Some(0.0),
            _ => Some(-1.0),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.board.chunks(3) {
            let cells: Vec<&str> = row
                .iter()
                .map(|c| match c {
                    1 => "X",
                    2 => "O",
                    _ => ".",
                })
                .collect();
            writeln!(f, "{}", cells.join(" "))?;
        }
        Ok(())
    }
}
