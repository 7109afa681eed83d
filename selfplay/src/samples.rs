//! Training sample records and their JSONL sink.
//!
//! Each position visited during a game becomes one [`Sample`]: the board the
//! search saw, the visit distribution it produced, and the final game outcome
//! from the perspective of the player who was to move.

use anyhow::{Context, Result};
use games_tictactoe::{State, NUM_CELLS};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Game index within the run
    pub game: u32,
    /// 0-based ply of this position
    pub ply: u32,
    /// Cell contents: 0 empty, 1 X, 2 O
    pub board: [u8; NUM_CELLS],
    /// Player to move (1 = X, 2 = O)
    pub to_move: u8,
    /// Visit distribution over all cells, zero for illegal ones
    pub policy: Vec<f32>,
    /// Root value estimate from the search
    pub search_value: f32,
    /// Final outcome for `to_move`; filled once the game ends
    pub value: Option<f32>,
}

impl Sample {
    pub fn new(game: u32, ply: u32, state: &State, policy: &[(u8, f32)], search_value: f32) -> Self {
        let mut dense = vec![0.0; NUM_CELLS];
        for &(mv, p) in policy {
            dense[mv as usize] = p;
        }
        Self {
            game,
            ply,
            board: *state.board(),
            to_move: state.current_player(),
            policy: dense,
            search_value,
            value: None,
        }
    }
}

/// Fill in `value` for every sample of a finished game.
///
/// `winner` uses the board encoding: 1 = X, 2 = O, 3 = draw.
pub fn backfill_outcome(samples: &mut [Sample], winner: u8) {
    for s in samples {
        s.value = Some(match winner {
            3 => 0.0,
            w if w == s.to_move => 1.0,
            _ => -1.0,
        });
    }
}

/// Appends samples to a JSON Lines file.
pub struct SampleWriter {
    out: BufWriter<File>,
    written: usize,
}

impl SampleWriter {
    /// Open `path` for appending, creating parent directories as needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        debug!(path = %path.display(), "Opened sample output");
        Ok(Self {
            out: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write_batch(&mut self, samples: &[Sample]) -> Result<()> {
        for sample in samples {
            serde_json::to_writer(&mut self.out, sample)?;
            self.out.write_all(b"\n")?;
        }
        self.written += samples.len();
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("selfplay-samples-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_sample_policy_is_dense() {
        let state = State::from_moves(&[4]).unwrap();
        let sample = Sample::new(0, 1, &state, &[(0, 0.25), (8, 0.75)], 0.1);
        assert_eq!(sample.policy.len(), NUM_CELLS);
        assert_eq!(sample.policy[0], 0.25);
        assert_eq!(sample.policy[8], 0.75);
        assert_eq!(sample.policy[4], 0.0);
        assert_eq!(sample.to_move, 2);
        assert_eq!(sample.board[4], 1);
        assert!(sample.value.is_none());
    }

    #[test]
    fn test_backfill_outcome_signs() {
        let s0 = Sample::new(0, 0, &State::new(), &[], 0.0);
        let s1 = Sample::new(0, 1, &State::from_moves(&[0]).unwrap(), &[], 0.0);
        let mut samples = vec![s0, s1];

        backfill_outcome(&mut samples, 1);
        assert_eq!(samples[0].value, Some(1.0)); // X to move, X won
        assert_eq!(samples[1].value, Some(-1.0));

        backfill_outcome(&mut samples, 3);
        assert!(samples.iter().all(|s| s.value == Some(0.0)));
    }

    #[test]
    fn test_writer_appends_json_lines() {
        let path = temp_path("append.jsonl");
        let _ = std::fs::remove_file(&path);

        let mut samples = vec![
            Sample::new(0, 0, &State::new(), &[(4, 1.0)], 0.0),
            Sample::new(0, 1, &State::from_moves(&[4]).unwrap(), &[(0, 1.0)], 0.0),
        ];
        backfill_outcome(&mut samples, 3);

        let mut writer = SampleWriter::create(&path).unwrap();
        writer.write_batch(&samples).unwrap();
        writer.write_batch(&samples[..1]).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.written(), 3);

        let reader = BufReader::new(File::open(&path).unwrap());
        let lines: Vec<Sample> = reader
            .lines()
            .map(|l| serde_json::from_str(&l.unwrap()).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], samples[1]);

        std::fs::remove_file(&path).unwrap();
    }
}
