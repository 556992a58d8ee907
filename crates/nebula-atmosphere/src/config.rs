//! Conversions from the persisted configuration into generator inputs.

use glam::Vec3;
use nebula_config::{AtmosphereConfig, SunConfig, ViewConfig};

use crate::mapping::direction_from_angles;
use crate::params::{AtmosphereParams, ViewParams, sun_direction_from_angles};
use crate::shading::SunDisk;

/// Pitch limit that keeps the camera basis well defined.
const MAX_PITCH_DEG: f32 = 89.0;

impl From<&AtmosphereConfig> for AtmosphereParams {
    fn from(config: &AtmosphereConfig) -> Self {
        Self {
            ground_radius_km: config.ground_radius_km,
            thickness_km: config.thickness_km,
            mie_g: config.mie_g,
            ms_contribution: config.ms_contribution,
            ground_albedo: Vec3::from_array(config.ground_albedo),
            rayleigh_scattering: Vec3::from_array(config.rayleigh_scattering),
            mie_scattering: Vec3::from_array(config.mie_scattering),
            mie_absorption: Vec3::from_array(config.mie_absorption),
            ozone_absorption: Vec3::from_array(config.ozone_absorption),
        }
    }
}

impl From<&SunConfig> for SunDisk {
    fn from(config: &SunConfig) -> Self {
        Self {
            angular_radius_rad: config.angular_radius_deg.to_radians(),
            illuminance: Vec3::from_array(config.illuminance),
            disk_intensity: config.disk_intensity,
        }
    }
}

impl ViewParams {
    /// Camera and sun described by the configuration. The camera sits above
    /// the atmosphere origin at `camera_altitude_km`.
    pub fn from_config(view: &ViewConfig, sun: &SunConfig) -> Self {
        let pitch = view.camera_pitch_deg.clamp(-MAX_PITCH_DEG, MAX_PITCH_DEG);
        let forward = direction_from_angles(view.camera_heading_deg.to_radians(), pitch.to_radians());
        Self::looking_at_horizon(
            view.camera_altitude_km,
            forward,
            sun_direction_from_angles(sun.elevation_deg.to_radians(), sun.azimuth_deg.to_radians()),
            view.fov_y_deg.to_radians(),
            view.aspect_ratio,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_earth() {
        let params = AtmosphereParams::from(&AtmosphereConfig::default());
        assert_eq!(params, AtmosphereParams::earth());
    }

    #[test]
    fn test_sun_disk_from_config() {
        let disk = SunDisk::from(&SunConfig::default());
        assert!((disk.angular_radius_rad - SunDisk::default().angular_radius_rad).abs() < 1e-7);
        assert_eq!(disk.disk_intensity, 20.0);
    }

    #[test]
    fn test_view_from_config() {
        let view_config = ViewConfig {
            camera_pitch_deg: 0.0,
            camera_heading_deg: 90.0,
            ..ViewConfig::default()
        };
        let view = ViewParams::from_config(&view_config, &SunConfig::default());
        assert_eq!(view.validate(), Ok(()));
        assert!((view.camera_forward - Vec3::X).length() < 1e-5, "{}", view.camera_forward);
        assert!((view.camera_height_km() - view_config.camera_altitude_km).abs() < 1e-6);
        assert!(view.sun_direction.y > 0.0);
    }

    #[test]
    fn test_vertical_pitch_is_clamped() {
        let view_config = ViewConfig {
            camera_pitch_deg: 90.0,
            ..ViewConfig::default()
        };
        let view = ViewParams::from_config(&view_config, &SunConfig::default());
        assert_eq!(view.validate(), Ok(()));
    }
}
