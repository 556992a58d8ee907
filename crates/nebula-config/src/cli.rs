//! Command-line argument parsing for the sky table baker.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Sky table baker command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "nebula-skybake", about = "Bake atmospheric scattering lookup tables")]
pub struct CliArgs {
    /// Sun elevation above the horizon, in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub sun_elevation: Option<f32>,

    /// Sun azimuth, in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub sun_azimuth: Option<f32>,

    /// Camera height above ground, in kilometres.
    #[arg(long)]
    pub camera_altitude: Option<f32>,

    /// Multiple-scattering contribution scale.
    #[arg(long)]
    pub ms_contribution: Option<f32>,

    /// Output directory for baked tables.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(elevation) = args.sun_elevation {
            self.sun.elevation_deg = elevation;
        }
        if let Some(azimuth) = args.sun_azimuth {
            self.sun.azimuth_deg = azimuth;
        }
        if let Some(altitude) = args.camera_altitude {
            self.view.camera_altitude_km = altitude;
        }
        if let Some(ms) = args.ms_contribution {
            self.atmosphere.ms_contribution = ms;
        }
        if let Some(ref dir) = args.output {
            self.output.directory = dir.clone();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
