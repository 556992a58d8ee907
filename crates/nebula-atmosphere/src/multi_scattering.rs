//! Multiple-scattering LUT: second-order isotropic scattering closed with a
//! geometric series, indexed like the transmittance table.

use std::f32::consts::PI;

use glam::{UVec2, Vec3};

use crate::geometry::sphere_intersect_distance;
use crate::lut::{Lut2d, LutId, texel_center_uv};
use crate::mapping::{lut_uv_at, synthetic_sun_direction, uv_to_zenith_height};
use crate::optics::{self, mie_phase, rayleigh_phase};
use crate::params::AtmosphereParams;
use crate::raymarch::{UNBOUNDED_DISTANCE_KM, atmosphere_segment, exp3, sample_schedule, step_integral};
use crate::settings::LutSettings;
use crate::transmittance::TransmittanceLut;

/// Upper bound on the per-channel series ratio so the closure stays finite.
const MAX_TRANSFER: f32 = 0.999;

/// The generated multiple-scattering table.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiScatteringLut(Lut2d);

impl MultiScatteringLut {
    pub fn new(lut: Lut2d) -> Self {
        Self(lut)
    }

    pub fn lut(&self) -> &Lut2d {
        &self.0
    }

    /// Multiple-scattering contribution at a planet-relative `position`.
    pub fn sample_at(&self, position: Vec3, sun_direction: Vec3, params: &AtmosphereParams) -> Vec3 {
        self.0.sample(lut_uv_at(position, sun_direction, params))
    }
}

/// Direction on the unit sphere; `phi` is measured from +Y.
fn spherical_direction(theta: f32, phi: f32) -> Vec3 {
    Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos())
}

/// Second-order luminance and transfer factor averaged over the sphere.
fn integrate_sphere(
    params: &AtmosphereParams,
    transmittance_lut: &TransmittanceLut,
    position: Vec3,
    sun_direction: Vec3,
    steps: u32,
    sample_count: u32,
) -> (Vec3, Vec3) {
    let inv_samples = 1.0 / (sample_count * sample_count) as f32;
    let mut luminance_total = Vec3::ZERO;
    let mut transfer_total = Vec3::ZERO;

    for i in 0..sample_count {
        for j in 0..sample_count {
            let theta = PI * (i as f32 + 0.5) / sample_count as f32;
            let phi = (1.0 - 2.0 * (j as f32 + 0.5) / sample_count as f32)
                .clamp(-1.0, 1.0)
                .acos();
            let direction = spherical_direction(theta, phi);

            let Some((start, end)) =
                atmosphere_segment(position, direction, UNBOUNDED_DISTANCE_KM, params)
            else {
                continue;
            };

            let cos_theta = direction.dot(sun_direction);
            let phase_r = rayleigh_phase(cos_theta);
            let phase_m = mie_phase(cos_theta, params.mie_g);

            let mut luminance = Vec3::ZERO;
            let mut transfer = Vec3::ZERO;
            let mut transmittance = Vec3::ONE;

            for (t, dt) in sample_schedule(start, end - start, steps) {
                let sample = position + direction * t;
                let height = sample.length() - params.ground_radius_km;
                let medium = optics::scattering(height, params);
                let step_transmittance = exp3(medium.extinction * dt);

                let scattering = medium.rayleigh + medium.mie;
                transfer += transmittance
                    * step_integral(scattering, medium.extinction, step_transmittance, dt);

                let sun_transmittance = transmittance_lut.sample_at(sample, sun_direction, params);
                let in_scattering =
                    (medium.rayleigh * phase_r + medium.mie * phase_m) * sun_transmittance;
                luminance += transmittance
                    * step_integral(in_scattering, medium.extinction, step_transmittance, dt);

                transmittance *= step_transmittance;
            }

            let ground = sphere_intersect_distance(position, direction, params.ground_radius_km);
            if ground > 0.0 && position.dot(sun_direction) > 0.0 {
                let hit = (position + direction * ground).normalize() * params.ground_radius_km;
                luminance += transmittance
                    * params.ground_albedo
                    * transmittance_lut.sample_at(hit, sun_direction, params);
            }

            luminance_total += luminance * inv_samples;
            transfer_total += transfer * inv_samples;
        }
    }

    (luminance_total, transfer_total)
}

/// Multiple-scattering texel value at `height_km` for a sun at `cos_zenith`.
///
/// The second-order luminance `L` is extended to all orders with
/// `L / (1 - f_ms)` and scaled by `ms_contribution`.
pub fn compute_multi_scattering(
    params: &AtmosphereParams,
    transmittance_lut: &TransmittanceLut,
    height_km: f32,
    cos_zenith: f32,
    steps: u32,
    sample_count: u32,
) -> Vec3 {
    if steps == 0 || sample_count == 0 {
        return Vec3::ZERO;
    }
    let position = Vec3::new(0.0, params.ground_radius_km + height_km, 0.0);
    let sun_direction = synthetic_sun_direction(cos_zenith);

    let (luminance, transfer) = integrate_sphere(
        params,
        transmittance_lut,
        position,
        sun_direction,
        steps,
        sample_count,
    );

    let ratio = transfer.min(Vec3::splat(MAX_TRANSFER));
    params.ms_contribution * luminance / (Vec3::ONE - ratio)
}

pub fn generate_multi_scattering_lut(
    params: &AtmosphereParams,
    settings: &LutSettings,
    transmittance_lut: &TransmittanceLut,
) -> MultiScatteringLut {
    let size = settings.multi_scattering_size;
    let lut = Lut2d::generate(LutId::MultiScattering, size, |texel: UVec2| {
        let uv = texel_center_uv(texel, size);
        let (cos_zenith, height) = uv_to_zenith_height(uv, params.thickness_km);
        compute_multi_scattering(
            params,
            transmittance_lut,
            height,
            cos_zenith,
            settings.multi_scattering_steps,
            settings.multi_scattering_sample_count,
        )
    });
    MultiScatteringLut(lut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmittance::generate_transmittance_lut;

    fn transmittance(params: &AtmosphereParams) -> TransmittanceLut {
        generate_transmittance_lut(params, &LutSettings::low())
    }

    #[test]
    fn test_texels_non_negative() {
        let params = AtmosphereParams::earth();
        let settings = LutSettings::low();
        let t = transmittance(&params);
        let lut = generate_multi_scattering_lut(&params, &settings, &t);
        assert_eq!(lut.lut().texels().len(), 16 * 16);
        for texel in lut.lut().texels() {
            assert!(texel.is_finite(), "texel {texel} not finite");
            assert!(texel.min_element() >= 0.0, "texel {texel} negative");
        }
    }

    #[test]
    fn test_monotonic_in_contribution() {
        let mut params = AtmosphereParams::earth();
        let t = transmittance(&params);

        let mut at = |contribution: f32| {
            params.ms_contribution = contribution;
            compute_multi_scattering(&params, &t, 1.0, 0.5, 10, 4)
        };
        let none = at(0.0);
        let half = at(0.5);
        let full = at(1.0);
        let double = at(2.0);

        assert_eq!(none, Vec3::ZERO);
        assert!(half.cmpgt(none).all(), "half {half}");
        assert!(full.cmpgt(half).all(), "full {full} vs half {half}");
        assert!(double.cmpgt(full).all(), "double {double} vs full {full}");
        assert!((full - 2.0 * half).length() < 1e-5 * full.length(), "full {full} half {half}");
    }

    #[test]
    fn test_sun_up_brighter_than_sun_down() {
        let params = AtmosphereParams::earth();
        let t = transmittance(&params);
        let day = compute_multi_scattering(&params, &t, 0.5, 0.9, 10, 4);
        let night = compute_multi_scattering(&params, &t, 0.5, -0.9, 10, 4);
        assert!(day.element_sum() > night.element_sum(), "day {day} night {night}");
    }

    #[test]
    fn test_spherical_direction_is_unit() {
        for (theta, phi) in [(0.3, 0.2), (2.0, 1.5), (PI, PI)] {
            let d = spherical_direction(theta, phi);
            assert!((d.length() - 1.0).abs() < 1e-5);
        }
        assert!((spherical_direction(0.0, 0.0) - Vec3::Y).length() < 1e-6);
    }
}
