//! Resolutions and sample counts for the LUT generators.

use glam::{UVec2, UVec3};

use crate::error::AtmosphereError;
use crate::lut::LutId;

/// Generator settings. Changing any field invalidates the static tables.
#[derive(Clone, Debug, PartialEq)]
pub struct LutSettings {
    pub transmittance_size: UVec2,
    pub transmittance_steps: u32,
    pub multi_scattering_size: UVec2,
    pub multi_scattering_steps: u32,
    /// Square root of the number of directions sampled per MS texel.
    pub multi_scattering_sample_count: u32,
    pub sky_view_size: UVec2,
    pub sky_view_steps: u32,
    /// Screen x, screen y, depth slices.
    pub aerial_perspective_size: UVec3,
    pub aerial_perspective_steps: u32,
    /// View distance covered by the last depth slice.
    pub aerial_perspective_max_distance_km: f32,
}

impl Default for LutSettings {
    fn default() -> Self {
        Self {
            transmittance_size: UVec2::new(256, 64),
            transmittance_steps: 40,
            multi_scattering_size: UVec2::new(32, 32),
            multi_scattering_steps: 20,
            multi_scattering_sample_count: 8,
            sky_view_size: UVec2::new(192, 108),
            sky_view_steps: 32,
            aerial_perspective_size: UVec3::new(32, 32, 32),
            aerial_perspective_steps: 16,
            aerial_perspective_max_distance_km: 32.0,
        }
    }
}

impl LutSettings {
    /// Small tables for previews and tests.
    pub fn low() -> Self {
        Self {
            transmittance_size: UVec2::new(64, 16),
            transmittance_steps: 40,
            multi_scattering_size: UVec2::new(16, 16),
            multi_scattering_steps: 10,
            multi_scattering_sample_count: 4,
            sky_view_size: UVec2::new(48, 27),
            sky_view_steps: 16,
            aerial_perspective_size: UVec3::new(8, 8, 8),
            aerial_perspective_steps: 8,
            aerial_perspective_max_distance_km: 32.0,
        }
    }

    /// Reject zero-sized tables and a non-positive aerial-perspective range.
    pub fn validate(&self) -> Result<(), AtmosphereError> {
        let sizes = [
            (LutId::Transmittance, self.transmittance_size.extend(1)),
            (LutId::MultiScattering, self.multi_scattering_size.extend(1)),
            (LutId::SkyView, self.sky_view_size.extend(1)),
            (LutId::AerialPerspective, self.aerial_perspective_size),
        ];
        for (lut, size) in sizes {
            if size.min_element() == 0 {
                return Err(AtmosphereError::EmptyLut { lut });
            }
        }
        if self.multi_scattering_sample_count == 0 {
            return Err(AtmosphereError::EmptyLut {
                lut: LutId::MultiScattering,
            });
        }
        if !(self.aerial_perspective_max_distance_km.is_finite()
            && self.aerial_perspective_max_distance_km > 0.0)
        {
            return Err(AtmosphereError::InvalidParams(format!(
                "aerial perspective distance must be positive, got {}",
                self.aerial_perspective_max_distance_km
            )));
        }
        Ok(())
    }

    /// Texel count of a table.
    pub fn texel_count(&self, lut: LutId) -> u64 {
        let size = match lut {
            LutId::Transmittance => self.transmittance_size.extend(1),
            LutId::MultiScattering => self.multi_scattering_size.extend(1),
            LutId::SkyView => self.sky_view_size.extend(1),
            LutId::AerialPerspective => self.aerial_perspective_size,
        };
        u64::from(size.x) * u64::from(size.y) * u64::from(size.z)
    }
}

impl From<&nebula_config::LutConfig> for LutSettings {
    fn from(config: &nebula_config::LutConfig) -> Self {
        Self {
            transmittance_size: UVec2::from_array(config.transmittance_size),
            transmittance_steps: config.transmittance_steps,
            multi_scattering_size: UVec2::from_array(config.multi_scattering_size),
            multi_scattering_steps: config.multi_scattering_steps,
            multi_scattering_sample_count: config.multi_scattering_sample_count,
            sky_view_size: UVec2::from_array(config.sky_view_size),
            sky_view_steps: config.sky_view_steps,
            aerial_perspective_size: UVec3::from_array(config.aerial_perspective_size),
            aerial_perspective_steps: config.aerial_perspective_steps,
            aerial_perspective_max_distance_km: config.aerial_perspective_max_distance_km,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(LutSettings::default().validate(), Ok(()));
        assert_eq!(LutSettings::low().validate(), Ok(()));
    }

    #[test]
    fn test_zero_axis_rejected() {
        let mut settings = LutSettings::default();
        settings.sky_view_size.y = 0;
        assert_eq!(
            settings.validate(),
            Err(AtmosphereError::EmptyLut { lut: LutId::SkyView })
        );

        let mut settings = LutSettings::default();
        settings.aerial_perspective_size.z = 0;
        assert_eq!(
            settings.validate(),
            Err(AtmosphereError::EmptyLut {
                lut: LutId::AerialPerspective
            })
        );
    }

    #[test]
    fn test_texel_count() {
        let settings = LutSettings::default();
        assert_eq!(settings.texel_count(LutId::Transmittance), 256 * 64);
        assert_eq!(settings.texel_count(LutId::AerialPerspective), 32 * 32 * 32);
    }

    #[test]
    fn test_from_config_matches_defaults() {
        let config = nebula_config::LutConfig::default();
        assert_eq!(LutSettings::from(&config), LutSettings::default());
    }
}
