//! Aerial-perspective volume: in-scattered luminance and opacity between the
//! camera and a set of depth slices along each screen ray.

use glam::{UVec3, Vec2, Vec3, Vec4};

use crate::lut::{Lut3d, LutId, texel_center};
use crate::mapping::{distance_to_slice, slice_to_distance};
use crate::multi_scattering::MultiScatteringLut;
use crate::params::{AtmosphereParams, ViewParams};
use crate::raymarch::{RaymarchInput, integrate};
use crate::settings::LutSettings;
use crate::sky_view::MIN_VIEW_HEIGHT_KM;
use crate::transmittance::TransmittanceLut;

/// The generated aerial-perspective volume.
///
/// Texels hold `(luminance, opacity)` where opacity is one minus the mean
/// transmittance between the camera and the slice.
#[derive(Clone, Debug, PartialEq)]
pub struct AerialPerspectiveLut {
    lut: Lut3d,
    max_distance_km: f32,
}

impl AerialPerspectiveLut {
    pub fn new(lut: Lut3d, max_distance_km: f32) -> Self {
        Self {
            lut,
            max_distance_km,
        }
    }

    pub fn lut(&self) -> &Lut3d {
        &self.lut
    }

    pub fn max_distance_km(&self) -> f32 {
        self.max_distance_km
    }

    /// Luminance and opacity at screen `uv` and view distance `distance_km`.
    pub fn sample(&self, uv: Vec2, distance_km: f32) -> Vec4 {
        let slices = self.lut.size().z;
        if slices == 0 {
            return Vec4::ZERO;
        }
        let w = distance_to_slice(distance_km, slices, self.max_distance_km) / slices as f32;
        self.lut.sample(uv.extend(w))
    }
}

/// World-space direction of the camera ray through screen `uv`.
///
/// `uv` has its origin at the top-left of the screen. The ray is unprojected
/// through the near plane (`ndc.z = 0`).
pub fn view_ray_direction(view: &ViewParams, uv: Vec2) -> Vec3 {
    let ndc = Vec4::new(2.0 * uv.x - 1.0, 1.0 - 2.0 * uv.y, 0.0, 1.0);
    let unprojected = view.inverse_projection * ndc;
    let view_space = if unprojected.w.abs() > f32::EPSILON {
        unprojected.truncate() / unprojected.w
    } else {
        unprojected.truncate()
    };
    view.view_to_world(view_space.normalize_or_zero())
        .normalize_or_zero()
}

pub fn generate_aerial_perspective_lut(
    params: &AtmosphereParams,
    view: &ViewParams,
    settings: &LutSettings,
    transmittance_lut: &TransmittanceLut,
    multi_scattering_lut: &MultiScatteringLut,
) -> AerialPerspectiveLut {
    let size = settings.aerial_perspective_size;
    let max_distance = settings.aerial_perspective_max_distance_km;
    let height = view.camera_height_km().max(MIN_VIEW_HEIGHT_KM);
    let origin = Vec3::new(0.0, params.ground_radius_km + height, 0.0);

    let lut = Lut3d::generate(LutId::AerialPerspective, size, |texel: UVec3| {
        let uv = Vec2::new(texel_center(texel.x, size.x), texel_center(texel.y, size.y));
        let input = RaymarchInput {
            origin,
            direction: view_ray_direction(view, uv),
            sun_direction: view.sun_direction,
            steps: settings.aerial_perspective_steps,
            max_distance_km: slice_to_distance(texel.z, size.z, max_distance),
        };
        let result = integrate(&input, params, transmittance_lut, multi_scattering_lut);
        let opacity = 1.0 - result.transmittance.element_sum() / 3.0;
        result.luminance.extend(opacity)
    });

    AerialPerspectiveLut::new(lut, max_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multi_scattering::generate_multi_scattering_lut;
    use crate::params::sun_direction_from_angles;
    use crate::transmittance::generate_transmittance_lut;

    fn tilted_view() -> ViewParams {
        ViewParams::looking_at_horizon(
            0.5,
            Vec3::new(0.0, 0.25, -1.0),
            sun_direction_from_angles(30f32.to_radians(), 1.0),
            60f32.to_radians(),
            1.0,
        )
    }

    fn volume(view: &ViewParams) -> AerialPerspectiveLut {
        let params = AtmosphereParams::earth();
        let settings = LutSettings::low();
        let t = generate_transmittance_lut(&params, &settings);
        let ms = generate_multi_scattering_lut(&params, &settings, &t);
        generate_aerial_perspective_lut(&params, view, &settings, &t, &ms)
    }

    #[test]
    fn test_opacity_grows_with_depth() {
        let ap = volume(&tilted_view());
        let size = ap.lut().size();
        let (x, y) = (size.x / 2, size.y / 2);
        let near = ap.lut().texel(x, y, 0);
        let far = ap.lut().texel(x, y, size.z - 1);
        assert!(near.w < far.w, "near opacity {} >= far opacity {}", near.w, far.w);
        assert!(near.w >= 0.0 && far.w <= 1.0);
        assert!(far.truncate().cmpgt(near.truncate()).all());
    }

    #[test]
    fn test_center_ray_is_forward() {
        let view = tilted_view();
        let dir = view_ray_direction(&view, Vec2::splat(0.5));
        assert!((dir - view.camera_forward).length() < 1e-4, "got {dir}");
    }

    #[test]
    fn test_top_of_screen_looks_up() {
        let view = ViewParams::default();
        let top = view_ray_direction(&view, Vec2::new(0.5, 0.0));
        let bottom = view_ray_direction(&view, Vec2::new(0.5, 1.0));
        assert!(top.y > 0.0 && bottom.y < 0.0, "top {top} bottom {bottom}");
        let half_fov = (top.y).asin();
        assert!((half_fov - 30f32.to_radians()).abs() < 1e-3, "half fov {half_fov}");
    }

    #[test]
    fn test_sample_at_slice_center_matches_texel() {
        let ap = volume(&tilted_view());
        let size = ap.lut().size();
        let uv = Vec2::new(texel_center(3, size.x), texel_center(2, size.y));
        let distance = slice_to_distance(5, size.z, ap.max_distance_km());
        let sampled = ap.sample(uv, distance);
        let texel = ap.lut().texel(3, 2, 5);
        assert!((sampled - texel).length() < 1e-4, "{sampled} vs {texel}");
    }
}
