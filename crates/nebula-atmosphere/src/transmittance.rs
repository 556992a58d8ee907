//! Transmittance LUT: fraction of sunlight reaching a point, indexed by the
//! cosine of the sun zenith angle and the height above ground.

use glam::{UVec2, Vec3};

use crate::geometry::sphere_intersect_distance;
use crate::lut::{Lut2d, LutId, texel_center_uv};
use crate::mapping::{lut_uv_at, synthetic_sun_direction, uv_to_zenith_height};
use crate::optics;
use crate::params::AtmosphereParams;
use crate::raymarch::{exp3, sample_schedule};
use crate::settings::LutSettings;

/// The generated transmittance table.
#[derive(Clone, Debug, PartialEq)]
pub struct TransmittanceLut(Lut2d);

impl TransmittanceLut {
    pub fn new(lut: Lut2d) -> Self {
        Self(lut)
    }

    pub fn lut(&self) -> &Lut2d {
        &self.0
    }

    /// Transmittance toward `sun_direction` from a planet-relative `position`.
    pub fn sample_at(&self, position: Vec3, sun_direction: Vec3, params: &AtmosphereParams) -> Vec3 {
        self.0.sample(lut_uv_at(position, sun_direction, params))
    }
}

/// Transmittance from `height_km` toward a sun at `cos_zenith` to the top of
/// the atmosphere. Zero when the planet blocks the sun.
pub fn compute_transmittance(
    params: &AtmosphereParams,
    height_km: f32,
    cos_zenith: f32,
    steps: u32,
) -> Vec3 {
    let position = Vec3::new(0.0, params.ground_radius_km + height_km, 0.0);
    let sun_direction = synthetic_sun_direction(cos_zenith);

    if sphere_intersect_distance(position, sun_direction, params.ground_radius_km) > 0.0 {
        return Vec3::ZERO;
    }

    let exit = sphere_intersect_distance(position, sun_direction, params.top_radius_km());
    if exit <= 0.0 {
        return Vec3::ONE;
    }

    let optical_depth = sample_schedule(0.0, exit, steps).fold(Vec3::ZERO, |depth, (t, dt)| {
        let sample = position + sun_direction * t;
        let height = sample.length() - params.ground_radius_km;
        depth + optics::scattering(height, params).extinction * dt
    });

    exp3(optical_depth)
}

pub fn generate_transmittance_lut(params: &AtmosphereParams, settings: &LutSettings) -> TransmittanceLut {
    let size = settings.transmittance_size;
    let lut = Lut2d::generate(LutId::Transmittance, size, |texel: UVec2| {
        let uv = texel_center_uv(texel, size);
        let (cos_zenith, height) = uv_to_zenith_height(uv, params.thickness_km);
        compute_transmittance(params, height, cos_zenith, settings.transmittance_steps)
    });
    TransmittanceLut(lut)
}
