//! Monte Carlo Tree Search (MCTS) implementation for AlphaZero-style game playing.
//!
//! This crate provides a game-agnostic MCTS implementation that works with any
//! game implementing the `engine-core` [`GameState`](engine_core::GameState) trait.
//!
//! # Overview
//!
//! MCTS is a search algorithm that builds a search tree by running simulations.
//! Each simulation consists of four phases:
//!
//! 1. **Selection**: Traverse the tree using UCB (Upper Confidence Bound) to
//!    balance exploration and exploitation
//! 2. **Expansion**: When reaching a leaf, expand it by adding children for
//!    each legal move
//! 3. **Evaluation**: Use a policy/value predictor (or uniform prior for testing)
//!    to estimate the value of the new state, or the game outcome at a terminal
//! 4. **Backpropagation**: Update visit counts and value estimates along the
//!    path from leaf to root, negating the value at each ply
//!
//! # Usage
//!
//! ```rust
//! use games_tictactoe::State;
//! use mcts::{run_mcts, MctsConfig, UniformEvaluator};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let evaluator = UniformEvaluator::new();
//! let config = MctsConfig::for_testing();
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//!
//! let result = run_mcts(&evaluator, config, State::new(), &mut rng).unwrap();
//!
//! println!("Best move: {}", result.action);
//! println!("Visits: {:?}", result.visits);
//! println!("Value: {}", result.value);
//! ```
//!
//! # Configuration
//!
//! The [`MctsConfig`] struct controls search behavior:
//!
//! - `num_simulations`: Number of simulations per search (default: 800)
//! - `c_puct`: Exploration constant for UCB (default: 1.25)
//! - `dirichlet_alpha`: Noise parameter for exploration at root (default: 0.3)
//! - `temperature`: Temperature for move selection (1.0 = proportional, 0.0 = greedy)
//!
//! # Evaluators
//!
//! The search requires an [`Evaluator`] to estimate policy and value:
//!
//! - [`UniformEvaluator`]: Returns uniform policy over legal moves (for testing)
//! - [`RolloutEvaluator`]: Uniform policy, value from a random playout
//! - Custom evaluators can wrap neural network inference
//!
//! # Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                         MctsSearch                          |
//! +-------------------------------------------------------------+
//! |  +-------------+  +-------------+  +---------------------+  |
//! |  |  MctsTree   |  |  GameState  |  |     Evaluator       |  |
//! |  |  (arena)    |  | (game rules)|  | (policy/value)      |  |
//! |  +------+------+  +------+------+  +----------+----------+  |
//! |         |                |                    |             |
//! |         v                v                    v             |
//! |  +-------------------------------------------------------+  |
//! |  |              select -> expand -> evaluate ->          |  |
//! |  |                     backpropagate                     |  |
//! |  +-------------------------------------------------------+  |
//! +-------------------------------------------------------------+
//! ```

pub mod config;
pub mod evaluator;
pub mod node;
pub mod policy;
pub mod search;
pub mod tree;

// Re-export main types
pub use config::MctsConfig;
pub use evaluator::{EvalResult, Evaluator, EvaluatorError, RolloutEvaluator, UniformEvaluator};
pub use node::{MctsNode, NodeId};
pub use search::{run_mcts, MctsSearch, SearchError, SearchPhase, SearchResult, SearchStats};
pub use tree::{MctsTree, TreeStats};
