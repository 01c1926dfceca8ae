// stride_replay/src/cli.rs

use clap::Parser;
use figment::{providers::Serialized, Figment};
use std::path::PathBuf;

/// The default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "assets/config/replay.toml";

/// Stride: replay a recorded IMU / contact / kinematics log through a
/// contact-aided invariant EKF.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the replay configuration TOML file
    /// [default: assets/config/replay.toml].
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Replay this log instead of the one named in the configuration.
    #[arg(short, long)]
    pub log: Option<PathBuf>,

    /// Lower (exclusive) bound of the admissible propagation interval, in seconds.
    #[arg(long)]
    pub dt_min: Option<f64>,

    /// Upper (exclusive) bound of the admissible propagation interval, in seconds.
    #[arg(long)]
    pub dt_max: Option<f64>,

    /// Do not print the initial and final filter state.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}

impl Cli {
    /// Whether the user picked a configuration file explicitly. An explicit
    /// file must exist, the default one may be absent.
    pub fn config_is_explicit(&self) -> bool {
        self.config.is_some()
    }

    /// The configuration file to load.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Layers the command-line overrides on top of an existing configuration.
    pub fn apply_overrides(&self, mut figment: Figment) -> Figment {
        if let Some(log) = &self.log {
            figment = figment.merge(Serialized::default("replay.log_file", log));
        }
        if let Some(dt_min) = self.dt_min {
            figment = figment.merge(Serialized::default("replay.dt_min", dt_min));
        }
        if let Some(dt_max) = self.dt_max {
            figment = figment.merge(Serialized::default("replay.dt_max", dt_max));
        }
        figment
    }
}
