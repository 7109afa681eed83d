//! Configuration for the self-play runner
//!
//! Configuration is loaded from config.toml with environment variable overrides.
//! CLI arguments take highest priority, followed by env vars, then config.toml.

use anyhow::{anyhow, Result};
use clap::Parser;
use engine_config::{load_config, CentralConfig};
use mcts::MctsConfig;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

fn default_games() -> u32 {
    CENTRAL_CONFIG.selfplay.games
}

fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_data_dir() -> String {
    CENTRAL_CONFIG.common.data_dir.clone()
}

fn default_log_interval() -> u32 {
    CENTRAL_CONFIG.selfplay.log_interval
}

fn default_seed() -> u64 {
    CENTRAL_CONFIG.common.seed
}

fn default_num_simulations() -> u32 {
    CENTRAL_CONFIG.mcts.num_simulations
}

fn default_c_puct() -> f32 {
    CENTRAL_CONFIG.mcts.c_puct as f32
}

fn default_temperature() -> f32 {
    CENTRAL_CONFIG.mcts.temperature as f32
}

fn default_temp_threshold() -> u32 {
    CENTRAL_CONFIG.mcts.temp_threshold
}

fn default_dirichlet_alpha() -> f32 {
    CENTRAL_CONFIG.mcts.dirichlet_alpha as f32
}

fn default_dirichlet_weight() -> f32 {
    CENTRAL_CONFIG.mcts.dirichlet_weight as f32
}

fn default_evaluator() -> String {
    CENTRAL_CONFIG.selfplay.evaluator.clone()
}

fn default_rollout_depth() -> u32 {
    CENTRAL_CONFIG.selfplay.rollout_depth
}

fn default_output() -> String {
    CENTRAL_CONFIG.selfplay.output.clone()
}

/// Leaf evaluator used by both players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorKind {
    Uniform,
    Rollout,
}

impl std::str::FromStr for EvaluatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(Self::Uniform),
            "rollout" => Ok(Self::Rollout),
            other => Err(anyhow!(
                "unknown evaluator '{}', expected 'uniform' or 'rollout'",
                other
            )),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "selfplay")]
#[command(about = "MCTS self-play runner for tic-tac-toe")]
#[command(
    long_about = "Plays tic-tac-toe games with MCTS choosing moves for both sides and
optionally writes one JSON line per position (board, visit policy, outcome).

Configuration is loaded from config.toml with MCTS_<SECTION>_<KEY> environment
overrides. CLI arguments take highest priority."
)]
pub struct Config {
    /// Number of games to play
    #[arg(long, default_value_t = default_games())]
    pub games: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,

    /// Directory that relative output paths are resolved against
    #[arg(long, default_value_t = default_data_dir())]
    pub data_dir: String,

    /// Log progress every N games (0 to disable)
    #[arg(long, default_value_t = default_log_interval())]
    pub log_interval: u32,

    /// Seed for search and move sampling
    #[arg(long, default_value_t = default_seed())]
    pub seed: u64,

    /// Number of MCTS simulations per move
    #[arg(long, default_value_t = default_num_simulations())]
    pub num_simulations: u32,

    /// Exploration constant
    #[arg(long, default_value_t = default_c_puct())]
    pub c_puct: f32,

    /// Move sampling temperature for the opening plies
    #[arg(long, default_value_t = default_temperature())]
    pub temperature: f32,

    /// Ply after which moves are chosen greedily (0 to never switch)
    #[arg(long, default_value_t = default_temp_threshold())]
    pub temp_threshold: u32,

    /// Dirichlet noise concentration at the root (0 disables noise)
    #[arg(long, default_value_t = default_dirichlet_alpha())]
    pub dirichlet_alpha: f32,

    /// Fraction of the root prior replaced by noise
    #[arg(long, default_value_t = default_dirichlet_weight())]
    pub dirichlet_weight: f32,

    /// Leaf evaluator: uniform or rollout
    #[arg(long, default_value_t = default_evaluator())]
    pub evaluator: String,

    /// Maximum plies per random rollout
    #[arg(long, default_value_t = default_rollout_depth())]
    pub rollout_depth: u32,

    /// JSONL file for training samples, relative to `data_dir` unless
    /// absolute (empty to skip writing)
    #[arg(long, default_value_t = default_output())]
    pub output: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.games == 0 {
            return Err(anyhow!("games must be greater than 0"));
        }

        if self.num_simulations == 0 {
            return Err(anyhow!("num_simulations must be greater than 0"));
        }

        self.evaluator_kind()?;

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        // Remaining numeric ranges are owned by the search config.
        self.mcts_config()
            .validate()
            .map_err(|e| anyhow!("invalid search settings: {}", e))?;

        Ok(())
    }

    pub fn evaluator_kind(&self) -> Result<EvaluatorKind> {
        self.evaluator.parse()
    }

    /// Search configuration for the opening plies.
    pub fn mcts_config(&self) -> MctsConfig {
        MctsConfig::for_training()
            .with_simulations(self.num_simulations)
            .with_c_puct(self.c_puct)
            .with_temperature(self.temperature)
            .with_dirichlet(self.dirichlet_alpha, self.dirichlet_weight)
    }

    /// Sampling temperature for the move at `ply` (0-based).
    pub fn temperature_at(&self, ply: u32) -> f32 {
        if self.temp_threshold > 0 && ply >= self.temp_threshold {
            0.0
        } else {
            self.temperature
        }
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        if self.output.is_empty() {
            return None;
        }
        let output = Path::new(&self.output);
        if output.is_absolute() {
            Some(output.to_path_buf())
        } else {
            Some(Path::new(&self.data_dir).join(output))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn base_config() -> Config {
        Config {
            games: 2,
            log_level: "info".into(),
            data_dir: "./data".into(),
            log_interval: 1,
            seed: 7,
            num_simulations: 50,
            c_puct: 1.25,
            temperature: 1.0,
            temp_threshold: 0,
            dirichlet_alpha: 0.3,
            dirichlet_weight: 0.25,
            evaluator: "uniform".into(),
            rollout_depth: 9,
            output: String::new(),
        }
    }

    #[test]
    fn validate_accepts_valid_configuration() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_games() {
        let mut cfg = base_config();
        cfg.games = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("games"));
    }

    #[test]
    fn validate_rejects_zero_simulations() {
        let mut cfg = base_config();
        cfg.num_simulations = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("num_simulations"));
    }

    #[test]
    fn validate_rejects_unknown_evaluator() {
        let mut cfg = base_config();
        cfg.evaluator = "oracle".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("unknown evaluator"));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut cfg = base_config();
        cfg.log_level = "nope".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("invalid log level"));
    }

    #[test]
    fn validate_rejects_bad_search_settings() {
        let mut cfg = base_config();
        cfg.c_puct = -1.0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("invalid search settings"));
    }

    #[test]
    fn evaluator_kind_parses() {
        let mut cfg = base_config();
        assert_eq!(cfg.evaluator_kind().unwrap(), EvaluatorKind::Uniform);
        cfg.evaluator = "rollout".into();
        assert_eq!(cfg.evaluator_kind().unwrap(), EvaluatorKind::Rollout);
    }

    #[test]
    fn temperature_schedule_switches_to_greedy() {
        let mut cfg = base_config();
        assert_eq!(cfg.temperature_at(8), 1.0);

        cfg.temp_threshold = 3;
        assert_eq!(cfg.temperature_at(2), 1.0);
        assert_eq!(cfg.temperature_at(3), 0.0);
        assert_eq!(cfg.temperature_at(7), 0.0);
    }

    #[test]
    fn output_path_empty_means_none() {
        let cfg = base_config();
        assert!(cfg.output_path().is_none());
    }

    #[test]
    fn output_path_resolves_against_data_dir() {
        let mut cfg = base_config();
        cfg.output = "selfplay/samples.jsonl".into();
        assert_eq!(
            cfg.output_path(),
            Some(PathBuf::from("./data/selfplay/samples.jsonl"))
        );

        cfg.output = "/tmp/samples.jsonl".into();
        assert_eq!(cfg.output_path(), Some(PathBuf::from("/tmp/samples.jsonl")));
    }

    #[test]
    fn cli_overrides_defaults() {
        let cfg = Config::parse_from([
            "selfplay",
            "--games",
            "3",
            "--evaluator",
            "rollout",
            "--data-dir",
            "/srv/mcts",
        ]);
        assert_eq!(cfg.games, 3);
        assert_eq!(cfg.evaluator, "rollout");
        assert_eq!(cfg.data_dir, "/srv/mcts");
    }
}
