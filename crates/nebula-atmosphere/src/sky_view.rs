//! Sky-view LUT: distant sky luminance seen from the camera, indexed by
//! world azimuth and a horizon-centred altitude curve.

use glam::{UVec2, Vec3};

use crate::lut::{Lut2d, LutId, texel_center_uv};
use crate::mapping::{direction_to_sky_view_uv, sky_view_uv_to_direction};
use crate::multi_scattering::MultiScatteringLut;
use crate::params::{AtmosphereParams, ViewParams};
use crate::raymarch::{RaymarchInput, UNBOUNDED_DISTANCE_KM, integrate};
use crate::settings::LutSettings;
use crate::transmittance::TransmittanceLut;

/// Lowest camera height used for the table, so the horizon stays well defined.
pub const MIN_VIEW_HEIGHT_KM: f32 = 1e-3;

/// Camera height used when generating and sampling the sky view.
///
/// Kept inside the atmosphere shell. Shells thinner than twice the margin
/// collapse the range toward their mid height.
pub fn clamp_view_height(height_km: f32, params: &AtmosphereParams) -> f32 {
    let floor = MIN_VIEW_HEIGHT_KM.min(params.thickness_km * 0.5);
    height_km
        .min(params.thickness_km - MIN_VIEW_HEIGHT_KM)
        .max(floor)
}

/// The generated sky-view table.
#[derive(Clone, Debug, PartialEq)]
pub struct SkyViewLut(Lut2d);

impl SkyViewLut {
    pub fn new(lut: Lut2d) -> Self {
        Self(lut)
    }

    pub fn lut(&self) -> &Lut2d {
        &self.0
    }

    /// Sky luminance toward a unit world `direction` for a camera at
    /// `view_height_km` above ground.
    pub fn sample(&self, params: &AtmosphereParams, view_height_km: f32, direction: Vec3) -> Vec3 {
        let view_radius = params.ground_radius_km + clamp_view_height(view_height_km, params);
        self.0.sample(direction_to_sky_view_uv(
            direction,
            view_radius,
            params.ground_radius_km,
        ))
    }
}

pub fn generate_sky_view_lut(
    params: &AtmosphereParams,
    view: &ViewParams,
    settings: &LutSettings,
    transmittance_lut: &TransmittanceLut,
    multi_scattering_lut: &MultiScatteringLut,
) -> SkyViewLut {
    let size = settings.sky_view_size;
    let view_radius = params.ground_radius_km + clamp_view_height(view.camera_height_km(), params);
    let origin = Vec3::new(0.0, view_radius, 0.0);

    let lut = Lut2d::generate(LutId::SkyView, size, |texel: UVec2| {
        let uv = texel_center_uv(texel, size);
        let direction = sky_view_uv_to_direction(uv, view_radius, params.ground_radius_km);
        let input = RaymarchInput {
            origin,
            direction,
            sun_direction: view.sun_direction,
            steps: settings.sky_view_steps,
            max_distance_km: UNBOUNDED_DISTANCE_KM,
        };
        integrate(&input, params, transmittance_lut, multi_scattering_lut).luminance
    });
    SkyViewLut(lut)
}
