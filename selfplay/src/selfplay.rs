//! Self-play game loop driving MCTS for both players

use anyhow::{anyhow, Result};
use engine_core::GameState;
use games_tictactoe::{State, NUM_CELLS};
use mcts::{
    Evaluator, MctsSearch, MctsTree, RolloutEvaluator, SearchError, UniformEvaluator,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{Config, EvaluatorKind};
use crate::samples::{backfill_outcome, Sample, SampleWriter};

/// One finished game.
#[derive(Debug)]
pub struct GameRecord {
    /// 1 = X, 2 = O, 3 = draw
    pub winner: u8,
    pub plies: u32,
    pub samples: Vec<Sample>,
    /// Completed simulations across every search of the game
    pub simulations: u32,
    /// Simulations dropped after evaluator or game failures
    pub discarded: u32,
}

/// A game stopped by the shutdown flag before it finished.
#[derive(Debug, Error)]
#[error("game {game} interrupted at ply {ply}, dropping {dropped} positions")]
pub struct Interrupted {
    pub game: u32,
    pub ply: u32,
    /// Positions recorded before the stop; they have no outcome and are not written
    pub dropped: usize,
}

/// Totals over a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub games: u32,
    pub x_wins: u32,
    pub o_wins: u32,
    pub draws: u32,
    pub failed: u32,
    pub positions: usize,
    /// Positions of an interrupted game that were not written
    pub dropped_positions: usize,
    pub discarded: u32,
}

impl RunSummary {
    fn record(&mut self, game: &GameRecord) {
        self.games += 1;
        match game.winner {
            1 => self.x_wins += 1,
            2 => self.o_wins += 1,
            _ => self.draws += 1,
        }
        self.positions += game.samples.len();
        self.discarded += game.discarded;
    }
}

pub struct SelfPlay {
    config: Config,
    evaluator: Box<dyn Evaluator<State>>,
    rng: ChaCha20Rng,
    shutdown: Arc<AtomicBool>,
}

impl SelfPlay {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let evaluator: Box<dyn Evaluator<State>> = match config.evaluator_kind()? {
            EvaluatorKind::Uniform => Box::new(UniformEvaluator::new()),
            EvaluatorKind::Rollout => Box::new(RolloutEvaluator::new(
                config.rollout_depth,
                // Keep rollouts independent of the move-sampling stream
                config.seed.wrapping_add(1),
            )),
        };

        info!(
            evaluator = %config.evaluator,
            num_simulations = config.num_simulations,
            temp_threshold = config.temp_threshold,
            "Self-play initialized"
        );

        Ok(Self::with_evaluator(config, evaluator))
    }

    /// Build a runner around an already constructed evaluator.
    pub fn with_evaluator(config: Config, evaluator: Box<dyn Evaluator<State>>) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(config.seed),
            config,
            evaluator,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the run between simulations once set.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Play one game from the empty board, keeping the searched subtree
    /// between moves.
    pub fn play_game(&mut self, game: u32) -> Result<GameRecord> {
        let mut tree = MctsTree::new(State::new());
        let mut samples = Vec::with_capacity(NUM_CELLS);
        let mut ply = 0u32;
        let mut simulations = 0u32;
        let mut discarded = 0u32;

        let final_state = loop {
            let state = *tree
                .root_state()
                .ok_or_else(|| anyhow!("root state missing at ply {}", ply))?;
            if state.is_terminal() {
                break state;
            }

            let config = self
                .config
                .mcts_config()
                .with_temperature(self.config.temperature_at(ply));
            let carried = tree.get(tree.root()).visit_count;

            let mut search = MctsSearch::from_tree(self.evaluator.as_ref(), config, tree)?
                .with_cancel_flag(Arc::clone(&self.shutdown));
            let result = match search.run(&mut self.rng) {
                Ok(result) => result,
                Err(SearchError::Cancelled) => {
                    return Err(Interrupted {
                        game,
                        ply,
                        dropped: samples.len(),
                    }
                    .into())
                }
                Err(e) => return Err(e.into()),
            };

            simulations += result.simulations;
            discarded += search.stats().discarded;
            debug!(
                game,
                ply,
                action = result.action,
                carried,
                value = result.value,
                "Move selected"
            );

            samples.push(Sample::new(game, ply, &state, &result.policy, result.value));
            tree = search.into_tree().reroot(result.action)?;
            ply += 1;
        };

        backfill_outcome(&mut samples, final_state.winner());

        Ok(GameRecord {
            winner: final_state.winner(),
            plies: ply,
            samples,
            simulations,
            discarded,
        })
    }

    /// Play the configured number of games, writing samples if `writer` is set.
    pub fn run(&mut self, mut writer: Option<&mut SampleWriter>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let run_start = Instant::now();

        for game in 0..self.config.games {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Shutdown requested, stopping self-play");
                break;
            }

            let started = Instant::now();
            let record = match self.play_game(game) {
                Ok(record) => record,
                Err(e) => match e.downcast::<Interrupted>() {
                    Ok(stop) => {
                        warn!(
                            game = stop.game,
                            ply = stop.ply,
                            dropped = stop.dropped,
                            "Game interrupted by shutdown, partial positions not written"
                        );
                        summary.dropped_positions += stop.dropped;
                        break;
                    }
                    Err(e) => {
                        error!("Game {} failed: {}", game + 1, e);
                        summary.failed += 1;
                        continue;
                    }
                },
            };

            if let Some(w) = writer.as_deref_mut() {
                w.write_batch(&record.samples)?;
            }
            summary.record(&record);

            debug!(
                game = game + 1,
                plies = record.plies,
                winner = record.winner,
                simulations = record.simulations,
                duration_ms = started.elapsed().as_millis() as u64,
                "Game completed"
            );

            let completed = summary.games;
            if self.config.log_interval > 0 && completed % self.config.log_interval == 0 {
                info!(
                    "Completed {} games (X: {}, O: {}, draws: {}, last: {:.2}s)",
                    completed,
                    summary.x_wins,
                    summary.o_wins,
                    summary.draws,
                    started.elapsed().as_secs_f64()
                );
            }
        }

        if let Some(w) = writer {
            w.flush()?;
        }

        info!(
            games = summary.games,
            failed = summary.failed,
            positions = summary.positions,
            dropped = summary.dropped_positions,
            discarded = summary.discarded,
            elapsed_s = format!("{:.2}", run_start.elapsed().as_secs_f64()),
            "Self-play finished"
        );

        Ok(summary)
    }
}
