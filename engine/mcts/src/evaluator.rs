//! Evaluator trait for position evaluation.
//!
//! The evaluator provides policy (move probabilities) and value estimates
//! for game states. In AlphaZero, this is a neural network. For testing,
//! we provide a uniform evaluator that returns equal priors, and a rollout
//! evaluator that scores positions by random playouts.

use std::collections::HashMap;
use std::sync::Mutex;

use engine_core::GameState;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Malformed evaluator output: {0}")]
    MalformedOutput(String),
}

/// Result of evaluating a game state.
#[derive(Debug, Clone)]
pub struct EvalResult<M> {
    /// Policy: (move, probability) pairs.
    /// Only legal moves matter; anything else is ignored and the remaining
    /// mass is renormalized by the search.
    pub priors: Vec<(M, f32)>,

    /// Value estimate for the player to move.
    /// Range: -1.0 (certain loss) to +1.0 (certain win).
    pub value: f32,
}

impl<M: Copy + Eq + std::hash::Hash> EvalResult<M> {
    /// Uniform priors over `legal` with the given value.
    pub fn uniform(legal: &[M], value: f32) -> Self {
        let prob = if legal.is_empty() {
            0.0
        } else {
            1.0 / legal.len() as f32
        };
        Self {
            priors: legal.iter().map(|&mv| (mv, prob)).collect(),
            value,
        }
    }

    /// Check the value and return priors restricted to `legal`, in the
    /// order of `legal`, summing to 1.
    ///
    /// Negative or non-finite probabilities are malformed. Legal moves the
    /// evaluator left out get zero. If no probability mass falls on a legal
    /// move the distribution falls back to uniform.
    pub fn normalized_priors(&self, legal: &[M]) -> Result<Vec<(M, f32)>, EvaluatorError> {
        if !self.value.is_finite() {
            return Err(EvaluatorError::MalformedOutput(format!(
                "value is not finite: {}",
                self.value
            )));
        }

        let mut by_move: HashMap<M, f32> = HashMap::with_capacity(self.priors.len());
        for &(mv, p) in &self.priors {
            if !p.is_finite() || p < 0.0 {
                return Err(EvaluatorError::MalformedOutput(format!(
                    "invalid probability {p}"
                )));
            }
            *by_move.entry(mv).or_insert(0.0) += p;
        }

        let masked: Vec<(M, f32)> = legal
            .iter()
            .map(|&mv| (mv, by_move.get(&mv).copied().unwrap_or(0.0)))
            .collect();
        let total: f32 = masked.iter().map(|(_, p)| p).sum();

        if total <= 0.0 || !total.is_finite() {
            if !legal.is_empty() {
                warn!(
                    legal_moves = legal.len(),
                    "Evaluator put no mass on legal moves, using uniform priors"
                );
            }
            return Ok(Self::uniform(legal, self.value).priors);
        }

        Ok(masked.into_iter().map(|(mv, p)| (mv, p / total)).collect())
    }
}

/// Trait for position evaluators.
///
/// Implementations could be:
/// - UniformEvaluator: Returns uniform policy (for testing)
/// - RolloutEvaluator: Random rollouts to terminal state
/// - A neural network wrapper living outside this crate
pub trait Evaluator<S: GameState>: Send + Sync {
    /// Evaluate a single non-terminal game state.
    ///
    /// # Returns
    /// Move probabilities and a value estimate from the perspective of the
    /// player to move in `state`.
    fn evaluate(&self, state: &S) -> Result<EvalResult<S::Move>, EvaluatorError>;
}

/// Uniform evaluator that assigns equal probability to all legal moves.
/// Value is always 0.0 (neutral). Useful for testing MCTS without a model.
#[derive(Debug, Clone, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl<S: GameState> Evaluator<S> for UniformEvaluator {
    fn evaluate(&self, state: &S) -> Result<EvalResult<S::Move>, EvaluatorError> {
        Ok(EvalResult::uniform(&state.legal_moves(), 0.0))
    }
}

/// Random rollout evaluator that plays random moves to terminal state.
/// Priors are uniform; the value is the playout's outcome, translated back
/// to the perspective of the player to move in the evaluated state.
#[derive(Debug)]
pub struct RolloutEvaluator {
    /// Maximum rollout depth to prevent infinite games
    pub max_depth: u32,
    rng: Mutex<ChaCha20Rng>,
}

impl Default for RolloutEvaluator {
    fn default() -> Self {
        Self::new(100, 0)
    }
}

impl RolloutEvaluator {
    pub fn new(max_depth: u32, seed: u64) -> Self {
        Self {
            max_depth,
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
        }
    }

    fn rollout<S: GameState>(&self, state: &S) -> Result<f32, EvaluatorError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| EvaluatorError::EvaluationFailed("rollout rng poisoned".into()))?;

        let mut current = state.clone();
        let mut depth = 0u32;

        while !current.is_terminal() {
            if depth >= self.max_depth {
                // Undecided within the horizon
                return Ok(0.0);
            }
            let moves = current.legal_moves();
            let mv = *moves.choose(&mut *rng).ok_or_else(|| {
                EvaluatorError::InvalidState("non-terminal state without legal moves".into())
            })?;
            current = current
                .apply_move(mv)
                .map_err(|e| EvaluatorError::InvalidState(e.to_string()))?;
            depth += 1;
        }

        let outcome = current.outcome().unwrap_or(0.0);
        // Outcome is for the player to move at the end of the playout
        if S::ALTERNATING && depth % 2 == 1 {
            Ok(-outcome)
        } else {
            Ok(outcome)
        }
    }
}

impl<S: GameState> Evaluator<S> for RolloutEvaluator {
    fn evaluate(&self, state: &S) -> Result<EvalResult<S::Move>, EvaluatorError> {
        let value = self.rollout(state)?;
        Ok(EvalResult::uniform(&state.legal_moves(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_tictactoe::State;

    #[test]
    fn test_uniform_evaluator() {
        let eval = UniformEvaluator::new();

        // X at 0, O at 4, X at 8: six cells left
        let state = State::from_moves(&[0, 4, 8]).unwrap();
        let result = eval.evaluate(&state).unwrap();

        assert_eq!(result.priors.len(), 6);
        let expected_prob = 1.0 / 6.0;
        for (mv, p) in &result.priors {
            assert!(![0, 4, 8].contains(mv));
            assert!((p - expected_prob).abs() < 1e-6);
        }

        // Value should be neutral
        assert!((result.value).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_evaluator_all_legal() {
        let eval = UniformEvaluator::new();
        let result = eval.evaluate(&State::new()).unwrap();

        let expected_prob = 1.0 / 9.0;
        assert_eq!(result.priors.len(), 9);
        for (_, p) in &result.priors {
            assert!((p - expected_prob).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normalized_priors_masks_illegal_moves() {
        let result = EvalResult {
            priors: vec![(0u8, 0.5), (1, 0.3), (2, 0.2)],
            value: 0.1,
        };

        // Move 0 is illegal; remaining mass 0.5 is rescaled
        let priors = result.normalized_priors(&[1, 2]).unwrap();
        assert_eq!(priors.len(), 2);
        assert_eq!(priors[0].0, 1);
        assert!((priors[0].1 - 0.6).abs() < 1e-6);
        assert!((priors[1].1 - 0.4).abs() < 1e-6);

        let sum: f32 = priors.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_priors_follow_legal_order() {
        let result = EvalResult {
            priors: vec![(7u8, 0.25), (3, 0.75)],
            value: 0.0,
        };
        let priors = result.normalized_priors(&[3, 5, 7]).unwrap();
        let moves: Vec<u8> = priors.iter().map(|(mv, _)| *mv).collect();
        assert_eq!(moves, vec![3, 5, 7]);
        assert!(priors[1].1.abs() < 1e-6);
    }

    #[test]
    fn test_normalized_priors_zero_mass_falls_back_to_uniform() {
        let result = EvalResult {
            priors: vec![(0u8, 1.0)],
            value: 0.0,
        };
        let priors = result.normalized_priors(&[1, 2, 3, 4]).unwrap();
        for (_, p) in &priors {
            assert!((p - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normalized_priors_reject_malformed_output() {
        let negative = EvalResult {
            priors: vec![(0u8, -0.1), (1, 1.1)],
            value: 0.0,
        };
        assert!(matches!(
            negative.normalized_priors(&[0, 1]),
            Err(EvaluatorError::MalformedOutput(_))
        ));

        let nan_value = EvalResult {
            priors: vec![(0u8, 1.0)],
            value: f32::NAN,
        };
        assert!(matches!(
            nan_value.normalized_priors(&[0]),
            Err(EvaluatorError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_rollout_evaluator_scores_forced_win() {
        // X O X / O X X / O O .  with X to move: cell 8 wins.
        let state = State::from_board([1, 2, 1, 2, 1, 1, 2, 2, 0]).unwrap();
        assert_eq!(state.current_player(), 1);

        let eval = RolloutEvaluator::new(10, 7);
        let result = eval.evaluate(&state).unwrap();

        assert_eq!(result.priors, vec![(8, 1.0)]);
        assert!((result.value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rollout_evaluator_depth_cap() {
        let eval = RolloutEvaluator::new(0, 7);
        let result = eval.evaluate(&State::new()).unwrap();
        assert!(result.value.abs() < 1e-6);
    }

    #[test]
    fn test_rollout_values_stay_in_range() {
        let eval = RolloutEvaluator::new(100, 3);
        for _ in 0..50 {
            let value = eval.evaluate(&State::new()).unwrap().value;
            assert!((-1.0..=1.0).contains(&value));
        }
    }
}
