//! Self-play runner
//!
//! Plays tic-tac-toe games with MCTS choosing moves for both sides:
//! 1. Loads settings from config.toml, `MCTS_*` env vars and the CLI
//! 2. Runs one search per move, keeping the subtree of the played move
//! 3. Appends one JSON line per position to `--output` when set
//! 4. Stops after the current simulation on Ctrl-C

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod samples;
mod selfplay;

use crate::config::Config;
use crate::samples::SampleWriter;
use crate::selfplay::SelfPlay;

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Raise `flag` on Ctrl-C so the running search stops between simulations.
fn install_shutdown_handler(flag: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        info!("Shutdown signal received, stopping self-play...");
        flag.store(true, Ordering::Relaxed);
    })
    .context("failed to install Ctrl-C handler")
}

fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");
    info!(
        games = config.games,
        seed = config.seed,
        output = ?config.output_path(),
        "Starting self-play"
    );

    let mut writer = config.output_path().map(SampleWriter::create).transpose()?;
    let mut player = SelfPlay::new(config)?;
    install_shutdown_handler(player.shutdown_flag())?;

    match player.run(writer.as_mut()) {
        Ok(summary) => {
            info!(
                "Played {} games: X {} / O {} / draws {}",
                summary.games, summary.x_wins, summary.o_wins, summary.draws
            );
            if summary.dropped_positions > 0 {
                info!(
                    "Interrupted game left {} positions unwritten",
                    summary.dropped_positions
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("Self-play failed: {}", e);
            Err(e)
        }
    }
}
