//! MCTS search implementation.
//!
//! Implements the core MCTS algorithm:
//! 1. Selection: Traverse tree using UCB to find a leaf
//! 2. Expansion: Add children to the leaf using policy prior
//! 3. Evaluation: Get value estimate from evaluator (or the game outcome)
//! 4. Backpropagation: Update statistics along the path
//!
//! A simulation only touches visit statistics once its value is known, so a
//! simulation that fails part way leaves no trace in the tree.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use engine_core::{GameError, GameState};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::MctsConfig;
use crate::evaluator::{Evaluator, EvaluatorError};
use crate::node::NodeId;
use crate::policy;
use crate::tree::MctsTree;

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Root state is terminal or has no legal moves")]
    TerminalState,

    #[error("Predictor failure: {0}")]
    PredictorFailure(#[from] EvaluatorError),

    #[error("Node {0:?} expanded twice")]
    DoubleExpansion(NodeId),

    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Search cancelled before any simulation completed")]
    Cancelled,
}

impl SearchError {
    /// Collaborator failures only cost the simulation they happen in.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SearchError::PredictorFailure(_) | SearchError::Game(_))
    }
}

/// Where the driver is within a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Selecting,
    Expanding,
    Evaluating,
    Backpropagating,
    Done,
}

/// Result of an MCTS search.
#[derive(Debug, Clone)]
pub struct SearchResult<M> {
    /// Move to play
    pub action: M,

    /// Visit counts of every root child, in canonical move order
    pub visits: Vec<(M, u32)>,

    /// Policy distribution over moves (visit counts adjusted by temperature)
    pub policy: Vec<(M, f32)>,

    /// Value estimate at root, for the player to move
    pub value: f32,

    /// Number of simulations completed by this search
    pub simulations: u32,
}

/// Counters collected while searching.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    /// Simulations that completed and were backpropagated
    pub simulations: u32,
    /// Simulations abandoned after a collaborator failure
    pub discarded: u32,
    /// Evaluator calls that expanded a node
    pub nodes_expanded: u32,
    /// Deepest path walked during selection
    pub max_depth: u32,
    pub elapsed: Duration,
}

/// MCTS search state.
pub struct MctsSearch<'a, S: GameState, E: Evaluator<S> + ?Sized> {
    tree: MctsTree<S>,
    evaluator: &'a E,
    config: MctsConfig,
    phase: SearchPhase,
    stats: SearchStats,
    /// Root noise is mixed in once per search, not once per `run`
    noise_applied: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, S: GameState, E: Evaluator<S> + ?Sized> MctsSearch<'a, S, E> {
    /// Create a new MCTS search from the given game state.
    pub fn new(evaluator: &'a E, config: MctsConfig, state: S) -> Result<Self, SearchError> {
        Self::from_tree(evaluator, config, MctsTree::new(state))
    }

    /// Continue searching an existing tree, e.g. one kept by [`MctsTree::reroot`].
    pub fn from_tree(
        evaluator: &'a E,
        config: MctsConfig,
        tree: MctsTree<S>,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let root = tree.get(tree.root());
        let state = root
            .state
            .as_ref()
            .ok_or_else(|| GameError::InvalidState("root state missing".into()))?;
        if root.is_terminal() || state.legal_moves().is_empty() {
            return Err(SearchError::TerminalState);
        }

        Ok(Self {
            tree,
            evaluator,
            config,
            phase: SearchPhase::Idle,
            stats: SearchStats::default(),
            noise_applied: false,
            cancel: None,
        })
    }

    /// Stop between simulations once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run the MCTS search for the configured number of simulations.
    ///
    /// Returns [`SearchError::Cancelled`] if the cancel flag stops the call
    /// before one of its own simulations completed, even when a reused tree
    /// already carries statistics.
    pub fn run(&mut self, rng: &mut ChaCha20Rng) -> Result<SearchResult<S::Move>, SearchError> {
        let started = Instant::now();
        let root_id = self.tree.root();

        if self.is_cancelled() {
            self.phase = SearchPhase::Idle;
            return Err(SearchError::Cancelled);
        }

        // First, expand the root if needed. Nothing can be recommended
        // without it, so failure here is fatal.
        if !self.tree.get(root_id).is_expanded() {
            self.phase = SearchPhase::Expanding;
            // The root's own value estimate is not backpropagated.
            self.expand_node(root_id)?;
        }

        // Add Dirichlet noise to root if configured
        if self.config.dirichlet_alpha > 0.0 && !self.noise_applied {
            self.add_dirichlet_noise(rng);
            self.noise_applied = true;
        }

        let mut completed = 0u32;
        for _ in 0..self.config.num_simulations {
            if self.is_cancelled() {
                debug!(completed, "MCTS search cancelled");
                break;
            }

            match self.simulate() {
                Ok(()) => {
                    self.stats.simulations += 1;
                    completed += 1;
                }
                Err(e) if e.is_recoverable() && self.tree.get(root_id).visit_count > 0 => {
                    self.stats.discarded += 1;
                    debug!(error = %e, "Discarding failed MCTS simulation");
                }
                Err(e) => {
                    self.phase = SearchPhase::Idle;
                    return Err(e);
                }
            }
        }

        self.stats.elapsed += started.elapsed();
        if completed == 0 && self.is_cancelled() {
            self.phase = SearchPhase::Idle;
            return Err(SearchError::Cancelled);
        }
        self.phase = SearchPhase::Done;

        let root = self.tree.get(root_id);
        let visits = self.tree.root_visits();
        let action = policy::select_move(&visits, self.config.temperature, rng)
            .ok_or(SearchError::TerminalState)?;
        let policy = self.tree.root_policy(self.config.temperature);

        debug!(
            simulations = completed,
            discarded = self.stats.discarded,
            nodes = self.tree.len(),
            max_depth = self.stats.max_depth,
            root_value = root.mean_value(),
            elapsed_ms = self.stats.elapsed.as_millis() as u64,
            "MCTS search complete"
        );

        Ok(SearchResult {
            action,
            visits,
            policy,
            value: root.mean_value(),
            simulations: completed,
        })
    }

    /// Run a single simulation (select -> expand -> evaluate -> backpropagate).
    fn simulate(&mut self) -> Result<(), SearchError> {
        // Selection: traverse to a leaf
        self.phase = SearchPhase::Selecting;
        let (leaf_id, path) = self.select()?;

        // Terminal leaves are scored by the game, others by the evaluator.
        // We call the evaluator ONCE and use its policy for priors and its
        // value for backprop.
        let value = match self.tree.get(leaf_id).terminal_value {
            Some(outcome) => {
                self.phase = SearchPhase::Evaluating;
                outcome
            }
            None => {
                self.phase = SearchPhase::Expanding;
                self.expand_node(leaf_id)?
            }
        };

        // Backpropagation
        self.phase = SearchPhase::Backpropagating;
        self.tree.backpropagate(&path, value);

        trace!(
            leaf = leaf_id.0,
            path_len = path.len(),
            value = value,
            "MCTS simulation complete"
        );

        Ok(())
    }

    /// Select a leaf node by traversing the tree using UCB.
    /// Returns the leaf and the root-to-leaf path.
    fn select(&mut self) -> Result<(NodeId, Vec<NodeId>), SearchError> {
        let mut path = vec![self.tree.root()];
        let mut current = self.tree.root();

        // Stop at terminal or unexpanded nodes
        while !self.tree.get(current).is_leaf() {
            let child_id = policy::select_child(&self.tree, current, self.config.c_puct)
                .ok_or_else(|| GameError::InvalidState("expanded node without children".into()))?;

            self.tree.ensure_state(child_id)?;
            path.push(child_id);
            current = child_id;
        }

        self.stats.max_depth = self.stats.max_depth.max(path.len() as u32 - 1);
        Ok((current, path))
    }

    /// Expand a node by adding all legal children.
    /// Returns the value estimate from the evaluator (to be used for backpropagation).
    ///
    /// The tree is only modified once the evaluator output has been validated.
    fn expand_node(&mut self, node_id: NodeId) -> Result<f32, SearchError> {
        let node = self.tree.get(node_id);
        let state = node
            .state
            .as_ref()
            .ok_or_else(|| GameError::InvalidState("expanding a node without state".into()))?;

        let legal = state.legal_moves();
        if legal.is_empty() {
            return Err(
                GameError::InvalidState("non-terminal state without legal moves".into()).into(),
            );
        }

        let eval = self.evaluator.evaluate(state)?;
        let priors = eval.normalized_priors(&legal)?;

        self.tree.expand(node_id, &priors)?;
        self.stats.nodes_expanded += 1;

        self.phase = SearchPhase::Evaluating;
        Ok(eval.value)
    }

    /// Add Dirichlet noise to root node priors for exploration.
    fn add_dirichlet_noise(&mut self, rng: &mut ChaCha20Rng) {
        let root_id = self.tree.root();
        let children: Vec<NodeId> = self
            .tree
            .get(root_id)
            .children
            .iter()
            .map(|(_, id)| *id)
            .collect();

        if children.is_empty() {
            return;
        }

        let Some(noise) = dirichlet_noise(children.len(), self.config.dirichlet_alpha, rng) else {
            warn!(
                alpha = self.config.dirichlet_alpha,
                "Invalid Dirichlet alpha, skipping root noise"
            );
            return;
        };

        // Mix noise with existing priors
        let eps = self.config.dirichlet_epsilon;
        for (child_id, n) in children.into_iter().zip(noise) {
            let child = self.tree.get_mut(child_id);
            child.prior = (1.0 - eps) * child.prior + eps * n;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Get the search tree (for inspection/debugging).
    pub fn tree(&self) -> &MctsTree<S> {
        &self.tree
    }

    /// Take the tree, e.g. to reroot it after committing a move.
    pub fn into_tree(self) -> MctsTree<S> {
        self.tree
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }
}

/// Generate Dirichlet-distributed noise using Gamma variates.
/// Returns None if `alpha` is not a valid Gamma shape.
fn dirichlet_noise<R: Rng + ?Sized>(n: usize, alpha: f32, rng: &mut R) -> Option<Vec<f32>> {
    use rand_distr::{Distribution, Gamma};

    let gamma = Gamma::new(alpha as f64, 1.0).ok()?;
    let mut samples: Vec<f32> = (0..n).map(|_| gamma.sample(rng) as f32).collect();

    // Normalize
    let sum: f32 = samples.iter().sum();
    if sum > 0.0 {
        for s in &mut samples {
            *s /= sum;
        }
    } else {
        samples.fill(1.0 / n as f32);
    }

    Some(samples)
}

/// Convenience function to run a single MCTS search.
pub fn run_mcts<S: GameState, E: Evaluator<S> + ?Sized>(
    evaluator: &E,
    config: MctsConfig,
    state: S,
    rng: &mut ChaCha20Rng,
) -> Result<SearchResult<S::Move>, SearchError> {
    let mut search = MctsSearch::new(evaluator, config, state)?;
    search.run(rng)
}
