// stride_replay/src/main.rs

//! Replays a recorded measurement log through the contact-aided invariant EKF.
//!
//! To run with the bundled configuration:
//! `cargo run --bin stride-replay`

use anyhow::{bail, Context, Result};
use clap::Parser;
use stride_core::prelude::{Estimator, Replayer};
use stride_replay::{cli::Cli, config::ReplayConfig};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore error if already set.
    let _ = fmt().with_env_filter(env_filter).try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // --- 1. Load Replay Configuration ---
    // The bundled default may be absent; an explicitly requested file may not.
    let config_path = cli.config_path();
    let shown = config_path.display();
    if cli.config_is_explicit() && !config_path.exists() {
        bail!("configuration file not found: {shown}");
    }
    info!("Loading configuration from: {shown}");
    let figment = cli.apply_overrides(ReplayConfig::figment(&config_path));
    let config = ReplayConfig::from_figment(&figment)
        .with_context(|| format!("invalid configuration in {shown}"))?;

    // --- 2. Build the Filter ---
    let filter = config.build_filter();
    if !cli.quiet {
        info!("Noise parameters:\n{}", filter.noise_params());
        info!("Initial state:\n{}", filter.state());
    }

    // --- 3. Replay the Log ---
    let log_file = &config.replay.log_file;
    let mut replayer = Replayer::with_window(filter, config.dt_window());
    let stats = replayer
        .replay_file(log_file)
        .with_context(|| format!("replay of {} aborted", log_file.display()))?;

    // --- 4. Report ---
    if !cli.quiet {
        info!("Final state:\n{}", replayer.estimator().state());
    }
    info!(
        imu = stats.imu_records,
        contact = stats.contact_records,
        kinematic = stats.kinematic_records,
        unrecognized = stats.unrecognized_records,
        propagations = stats.propagations,
        skipped = stats.skipped_propagations,
        "Replay complete"
    );
    Ok(())
}
