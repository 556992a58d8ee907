//! Bakes the atmosphere lookup tables for one sun and camera setup and
//! writes them as PNG images.
//!
//! Run with: `cargo run -p nebula-skybake -- --sun-elevation 5 --output out`

mod export;

use std::path::PathBuf;

use clap::Parser;
use nebula_atmosphere::{
    AtmosphereError, AtmosphereParams, AtmospherePipeline, LutSettings, SunDisk, ViewParams,
};
use nebula_config::{CliArgs, Config};
use thiserror::Error;
use tracing::{error, info};

use crate::export::{Export, ExportError};

#[derive(Debug, Error)]
enum BakeError {
    #[error(transparent)]
    Atmosphere(#[from] AtmosphereError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(|| {
        Config::default_dir().unwrap_or_else(|e| {
            eprintln!("{e}, using the working directory");
            PathBuf::from(".")
        })
    });

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    nebula_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match bake(&config) {
        Ok(written) => info!(
            "Baked {} images into {}",
            written.len(),
            config.output.directory.display()
        ),
        Err(e) => {
            error!("Bake failed: {e}");
            std::process::exit(1);
        }
    }
}

fn bake(config: &Config) -> Result<Vec<PathBuf>, BakeError> {
    let params = AtmosphereParams::from(&config.atmosphere);
    let view = ViewParams::from_config(&config.view, &config.sun);
    let settings = LutSettings::from(&config.luts);
    let sun = SunDisk::from(&config.sun);

    info!(
        "Sun at {:.1} deg elevation, camera at {:.2} km",
        config.sun.elevation_deg, config.view.camera_altitude_km
    );

    let mut pipeline = AtmospherePipeline::new(settings)?;
    let luts = pipeline.run_frame(&params, &view)?;

    let export = Export {
        params: &params,
        view: &view,
        sun: &sun,
        luts: &luts,
        exposure: config.output.exposure,
        sky_preview_width: config.output.sky_preview_width,
    };
    Ok(export.write_all(&config.output.directory)?)
}
