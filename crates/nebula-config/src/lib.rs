//! Configuration system for the sky table baker.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AtmosphereConfig, CONFIG_FILE_NAME, Config, DebugConfig, LutConfig, OutputConfig, SunConfig,
    ViewConfig,
};
pub use error::ConfigError;
