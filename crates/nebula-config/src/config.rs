//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Top-level sky baking configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Physical composition of the atmosphere.
    pub atmosphere: AtmosphereConfig,
    /// Lookup-table resolutions and sample counts.
    pub luts: LutConfig,
    /// Camera placement used for the per-frame tables.
    pub view: ViewConfig,
    /// Sun position and disk appearance.
    pub sun: SunConfig,
    /// Where baked tables are written.
    pub output: OutputConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Atmosphere composition. Distances in kilometres, coefficients per kilometre.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AtmosphereConfig {
    /// Planet radius at ground level.
    pub ground_radius_km: f32,
    /// Height of the atmosphere shell above the ground.
    pub thickness_km: f32,
    /// Mie asymmetry factor `g` in `(-1, 1)`.
    pub mie_g: f32,
    /// Scale applied to the multiple-scattering term (1.0 = physical).
    pub ms_contribution: f32,
    /// Linear RGB ground albedo.
    pub ground_albedo: [f32; 3],
    /// Rayleigh scattering coefficient at sea level.
    pub rayleigh_scattering: [f32; 3],
    /// Mie scattering coefficient at sea level.
    pub mie_scattering: [f32; 3],
    /// Mie absorption coefficient at sea level.
    pub mie_absorption: [f32; 3],
    /// Ozone absorption coefficient at the layer peak.
    pub ozone_absorption: [f32; 3],
}

/// Lookup-table resolutions and raymarch quality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LutConfig {
    /// Transmittance table size (cos zenith x height).
    pub transmittance_size: [u32; 2],
    /// Raymarch steps per transmittance texel.
    pub transmittance_steps: u32,
    /// Multiple-scattering table size (cos zenith x height).
    pub multi_scattering_size: [u32; 2],
    /// Raymarch steps per sampled multiple-scattering direction.
    pub multi_scattering_steps: u32,
    /// Square root of the number of directions sampled per multiple-scattering texel.
    pub multi_scattering_sample_count: u32,
    /// Sky-view table size (azimuth x altitude).
    pub sky_view_size: [u32; 2],
    /// Raymarch steps per sky-view texel.
    pub sky_view_steps: u32,
    /// Aerial-perspective volume size (screen x, screen y, depth slices).
    pub aerial_perspective_size: [u32; 3],
    /// Raymarch steps per aerial-perspective texel.
    pub aerial_perspective_steps: u32,
    /// Distance covered by the last aerial-perspective slice.
    pub aerial_perspective_max_distance_km: f32,
}

/// Camera used when baking the per-frame tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    /// Camera height above the atmosphere origin.
    pub camera_altitude_km: f32,
    /// Camera pitch above the horizon, in degrees.
    pub camera_pitch_deg: f32,
    /// Camera heading, in degrees clockwise from -Z.
    pub camera_heading_deg: f32,
    /// Vertical field of view, in degrees.
    pub fov_y_deg: f32,
    /// Viewport aspect ratio (width / height).
    pub aspect_ratio: f32,
}

/// Sun position and disk appearance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SunConfig {
    /// Sun elevation above the horizon, in degrees.
    pub elevation_deg: f32,
    /// Sun azimuth, in degrees clockwise from -Z.
    pub azimuth_deg: f32,
    /// Angular radius of the sun disk, in degrees.
    pub angular_radius_deg: f32,
    /// Linear RGB illuminance the tables are scaled by.
    pub illuminance: [f32; 3],
    /// Multiplier applied to the disk relative to the sky.
    pub disk_intensity: f32,
}

/// Output settings for baked tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the baked images are written to.
    pub directory: PathBuf,
    /// Exposure applied before tone-mapping preview images.
    pub exposure: f32,
    /// Width of the equirectangular sky preview (height is half).
    pub sky_preview_width: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for JSON log files in debug builds.
    pub log_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            ground_radius_km: 6360.0,
            thickness_km: 100.0,
            mie_g: 0.8,
            ms_contribution: 1.0,
            ground_albedo: [0.3; 3],
            rayleigh_scattering: [5.802e-3, 13.558e-3, 33.1e-3],
            mie_scattering: [3.996e-3; 3],
            mie_absorption: [4.4e-3; 3],
            ozone_absorption: [0.650e-3, 1.881e-3, 0.085e-3],
        }
    }
}

impl Default for LutConfig {
    fn default() -> Self {
        Self {
            transmittance_size: [256, 64],
            transmittance_steps: 40,
            multi_scattering_size: [32, 32],
            multi_scattering_steps: 20,
            multi_scattering_sample_count: 8,
            sky_view_size: [192, 108],
            sky_view_steps: 32,
            aerial_perspective_size: [32, 32, 32],
            aerial_perspective_steps: 16,
            aerial_perspective_max_distance_km: 32.0,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            camera_altitude_km: 0.5,
            camera_pitch_deg: 5.0,
            camera_heading_deg: 0.0,
            fov_y_deg: 60.0,
            aspect_ratio: 16.0 / 9.0,
        }
    }
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            elevation_deg: 20.0,
            azimuth_deg: 0.0,
            angular_radius_deg: 0.2666,
            illuminance: [1.0; 3],
            disk_intensity: 20.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("sky-luts"),
            exposure: 10.0,
            sky_preview_width: 512,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Default config directory for the current platform.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("nebula-skybake"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("ground_radius_km: 6360.0"));
        assert!(ron_str.contains("transmittance_steps: 40"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.atmosphere.ms_contribution = 0.5;
        config.sun.elevation_deg = -3.0;
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(atmosphere: (thickness_km: 60.0), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.atmosphere.thickness_km, 60.0);
        assert_eq!(config.atmosphere.ground_radius_km, 6360.0);
        assert_eq!(config.luts, LutConfig::default());
        assert_eq!(config.sun, SunConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_coefficients_are_non_negative() {
        let atmosphere = AtmosphereConfig::default();
        let coefficients = [
            atmosphere.rayleigh_scattering,
            atmosphere.mie_scattering,
            atmosphere.mie_absorption,
            atmosphere.ozone_absorption,
            atmosphere.ground_albedo,
        ];
        for rgb in coefficients {
            assert!(rgb.iter().all(|c| *c >= 0.0), "negative coefficient in {rgb:?}");
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.luts.sky_view_size = [256, 128];
        config.view.camera_altitude_km = 10.0;
        config.output.directory = PathBuf::from("/tmp/luts");

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_ron_comments_preserved() {
        let ron_str = "// This is a comment\n(\n  // Another comment\n)";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config, Config::default());
    }
}
