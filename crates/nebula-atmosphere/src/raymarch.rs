//! Single-ray integration of in-scattered luminance and transmittance.
//!
//! Shared by the sky-view and aerial-perspective generators. Positions are
//! planet-relative: the planet centre is the origin and +Y is up.

use glam::Vec3;

use crate::geometry::{sphere_intersect, sphere_intersect_distance};
use crate::multi_scattering::MultiScatteringLut;
use crate::optics::{self, mie_phase, rayleigh_phase};
use crate::params::AtmosphereParams;
use crate::transmittance::TransmittanceLut;

/// Fraction of a step at which each sample is placed.
pub const SAMPLE_OFFSET: f32 = 0.3;

/// Max distance used when only the atmosphere and ground should bound a ray.
pub const UNBOUNDED_DISTANCE_KM: f32 = 1.0e9;

/// Extinction below which a channel is treated as non-absorbing.
const MIN_EXTINCTION: f32 = 1e-9;

/// One ray to integrate.
#[derive(Clone, Copy, Debug)]
pub struct RaymarchInput {
    /// Planet-relative start of the ray.
    pub origin: Vec3,
    /// Unit view direction.
    pub direction: Vec3,
    /// Unit vector toward the sun.
    pub sun_direction: Vec3,
    pub steps: u32,
    /// Clip distance along the ray, in km.
    pub max_distance_km: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScatteringResult {
    /// In-scattered luminance per unit sun illuminance.
    pub luminance: Vec3,
    /// Transmittance from the origin to the end of the marched segment.
    pub transmittance: Vec3,
}

impl ScatteringResult {
    /// Nothing scattered, nothing absorbed.
    pub const EMPTY: Self = Self {
        luminance: Vec3::ZERO,
        transmittance: Vec3::ONE,
    };
}

/// The part of a ray that lies inside the atmosphere and above the ground,
/// clipped to `max_distance_km`. `None` when that part is empty.
pub fn atmosphere_segment(
    origin: Vec3,
    direction: Vec3,
    max_distance_km: f32,
    params: &AtmosphereParams,
) -> Option<(f32, f32)> {
    let (entry, exit) = sphere_intersect(origin, direction, params.top_radius_km());
    if exit < 0.0 {
        return None;
    }

    let start = entry.max(0.0);
    let mut end = exit.min(max_distance_km);

    let ground = sphere_intersect_distance(origin, direction, params.ground_radius_km);
    if ground > 0.0 {
        end = end.min(ground);
    }

    (end > start).then_some((start, end))
}

/// Sample positions along `[start, start + length]` as `(t, dt)` pairs.
///
/// Sample `i` sits at `start + (i + 0.3) / steps * length`; `dt` is the
/// distance from the previous sample, measured from `start` for the first.
pub fn sample_schedule(start: f32, length: f32, steps: u32) -> impl Iterator<Item = (f32, f32)> {
    let mut previous = start;
    (0..steps).map(move |i| {
        let t = start + (i as f32 + SAMPLE_OFFSET) / steps as f32 * length;
        let dt = t - previous;
        previous = t;
        (t, dt)
    })
}

/// Per-channel `exp(-v)`.
pub(crate) fn exp3(v: Vec3) -> Vec3 {
    Vec3::new((-v.x).exp(), (-v.y).exp(), (-v.z).exp())
}

/// Analytic integral of a constant source `source` over a step of length `dt`
/// with extinction `extinction`, given the step's transmittance.
///
/// Channels with no extinction fall back to `source * dt`.
pub(crate) fn step_integral(source: Vec3, extinction: Vec3, step_transmittance: Vec3, dt: f32) -> Vec3 {
    let channel = |s: f32, sigma: f32, t: f32| {
        if sigma > MIN_EXTINCTION {
            (s - s * t) / sigma
        } else {
            s * dt
        }
    };
    Vec3::new(
        channel(source.x, extinction.x, step_transmittance.x),
        channel(source.y, extinction.y, step_transmittance.y),
        channel(source.z, extinction.z, step_transmittance.z),
    )
}

/// March one ray through the atmosphere, accumulating single scattering from
/// the sun and the multiple-scattering approximation.
pub fn integrate(
    input: &RaymarchInput,
    params: &AtmosphereParams,
    transmittance_lut: &TransmittanceLut,
    multi_scattering_lut: &MultiScatteringLut,
) -> ScatteringResult {
    if input.steps == 0 || input.max_distance_km <= 0.0 {
        return ScatteringResult::EMPTY;
    }
    let Some((start, end)) =
        atmosphere_segment(input.origin, input.direction, input.max_distance_km, params)
    else {
        return ScatteringResult::EMPTY;
    };

    let cos_theta = input.direction.dot(input.sun_direction);
    let phase_r = rayleigh_phase(cos_theta);
    let phase_m = mie_phase(cos_theta, params.mie_g);

    let mut luminance = Vec3::ZERO;
    let mut transmittance = Vec3::ONE;

    for (t, dt) in sample_schedule(start, end - start, input.steps) {
        let position = input.origin + input.direction * t;
        let height = position.length() - params.ground_radius_km;
        let medium = optics::scattering(height, params);

        let step_transmittance = exp3(medium.extinction * dt);
        let sun_transmittance = transmittance_lut.sample_at(position, input.sun_direction, params);
        // The table already carries `ms_contribution`.
        let multi_scattering = multi_scattering_lut.sample_at(position, input.sun_direction, params);

        let in_scattering = medium.rayleigh * (phase_r * sun_transmittance + multi_scattering)
            + medium.mie * (phase_m * sun_transmittance + multi_scattering);

        luminance += step_integral(in_scattering, medium.extinction, step_transmittance, dt)
            * transmittance;
        transmittance *= step_transmittance;
    }

    ScatteringResult {
        luminance,
        transmittance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut::{Lut2d, LutId};
    use glam::UVec2;

    fn flat_luts(transmittance: Vec3, multi_scattering: Vec3) -> (TransmittanceLut, MultiScatteringLut) {
        let size = UVec2::new(4, 4);
        (
            TransmittanceLut::new(Lut2d::generate(LutId::Transmittance, size, |_| transmittance)),
            MultiScatteringLut::new(Lut2d::generate(LutId::MultiScattering, size, |_| {
                multi_scattering
            })),
        )
    }

    fn ground_input(params: &AtmosphereParams, steps: u32, max_distance_km: f32) -> RaymarchInput {
        RaymarchInput {
            origin: Vec3::new(0.0, params.ground_radius_km + 0.5, 0.0),
            direction: Vec3::new(0.0, 0.2, -1.0).normalize(),
            sun_direction: Vec3::Y,
            steps,
            max_distance_km,
        }
    }

    #[test]
    fn test_zero_steps_is_empty() {
        let params = AtmosphereParams::earth();
        let (t, ms) = flat_luts(Vec3::ONE, Vec3::ZERO);
        let result = integrate(&ground_input(&params, 0, 100.0), &params, &t, &ms);
        assert_eq!(result, ScatteringResult::EMPTY);
    }

    #[test]
    fn test_zero_distance_is_empty() {
        let params = AtmosphereParams::earth();
        let (t, ms) = flat_luts(Vec3::ONE, Vec3::ZERO);
        let result = integrate(&ground_input(&params, 16, 0.0), &params, &t, &ms);
        assert_eq!(result, ScatteringResult::EMPTY);
    }

    #[test]
    fn test_ray_missing_atmosphere_is_empty() {
        let params = AtmosphereParams::earth();
        let (t, ms) = flat_luts(Vec3::ONE, Vec3::ZERO);
        let input = RaymarchInput {
            origin: Vec3::new(0.0, params.top_radius_km() + 10.0, 0.0),
            direction: Vec3::Y,
            sun_direction: Vec3::Y,
            steps: 16,
            max_distance_km: UNBOUNDED_DISTANCE_KM,
        };
        assert_eq!(integrate(&input, &params, &t, &ms), ScatteringResult::EMPTY);
    }

    #[test]
    fn test_longer_rays_scatter_more() {
        let params = AtmosphereParams::earth();
        let (t, ms) = flat_luts(Vec3::ONE, Vec3::ZERO);
        let near = integrate(&ground_input(&params, 32, 1.0), &params, &t, &ms);
        let far = integrate(&ground_input(&params, 32, 30.0), &params, &t, &ms);
        assert!(far.luminance.cmpgt(near.luminance).all());
        assert!(far.transmittance.cmplt(near.transmittance).all());
        assert!(near.transmittance.max_element() <= 1.0);
        assert!(far.transmittance.min_element() > 0.0);
    }

    #[test]
    fn test_multi_scattering_adds_light() {
        let params = AtmosphereParams::earth();
        let (t, no_ms) = flat_luts(Vec3::ONE, Vec3::ZERO);
        let (_, some_ms) = flat_luts(Vec3::ONE, Vec3::splat(0.1));
        let input = ground_input(&params, 32, 30.0);
        let without = integrate(&input, &params, &t, &no_ms);
        let with = integrate(&input, &params, &t, &some_ms);
        assert!(with.luminance.cmpgt(without.luminance).all());
        assert_eq!(with.transmittance, without.transmittance);
    }

    #[test]
    fn test_segment_stops_at_ground() {
        let params = AtmosphereParams::earth();
        let origin = Vec3::new(0.0, params.ground_radius_km + 1.0, 0.0);
        let (start, end) = atmosphere_segment(origin, Vec3::NEG_Y, UNBOUNDED_DISTANCE_KM, &params)
            .expect("ray into the ground has a segment");
        assert_eq!(start, 0.0);
        assert!((end - 1.0).abs() < 1e-2, "end {end}");
    }

    #[test]
    fn test_schedule_offsets() {
        let samples: Vec<_> = sample_schedule(2.0, 10.0, 4).collect();
        assert_eq!(samples.len(), 4);
        assert!((samples[0].0 - 2.75).abs() < 1e-6);
        assert!((samples[0].1 - 0.75).abs() < 1e-6);
        assert!((samples[1].1 - 2.5).abs() < 1e-6);
        assert!((samples[3].0 - 10.25).abs() < 1e-5);
    }

    #[test]
    fn test_step_integral_without_extinction() {
        let value = step_integral(Vec3::splat(2.0), Vec3::ZERO, Vec3::ONE, 0.5);
        assert_eq!(value, Vec3::ONE);
    }
}
