//! Mappings between LUT texture coordinates and physical quantities.
//!
//! - Transmittance / multiple scattering: `(cos sun zenith, height)` ↔ `uv`,
//!   affine on both axes.
//! - Sky view: `(azimuth, altitude)` ↔ `uv`, with a signed-square altitude
//!   curve that keeps `v = 0.5` on the horizon at any camera height.
//! - Aerial perspective: depth slice ↔ distance, squared so that slices
//!   bunch up near the camera.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Vec2, Vec3};

use crate::params::AtmosphereParams;

/// Texture coordinate of a `(cos zenith, height)` pair, clamped to `[0, 1]`.
pub fn zenith_height_to_uv(cos_zenith: f32, height_km: f32, thickness_km: f32) -> Vec2 {
    Vec2::new(
        (0.5 + 0.5 * cos_zenith).clamp(0.0, 1.0),
        (height_km / thickness_km).clamp(0.0, 1.0),
    )
}

/// Inverse of [`zenith_height_to_uv`]: returns `(cos zenith, height)`.
pub fn uv_to_zenith_height(uv: Vec2, thickness_km: f32) -> (f32, f32) {
    (2.0 * uv.x - 1.0, thickness_km * uv.y)
}

/// Texture coordinate for looking up a zenith/height table at a
/// planet-relative `position` with the sun along `sun_direction`.
pub fn lut_uv_at(position: Vec3, sun_direction: Vec3, params: &AtmosphereParams) -> Vec2 {
    let radius = position.length();
    let up = position / radius;
    zenith_height_to_uv(
        sun_direction.dot(up),
        radius - params.ground_radius_km,
        params.thickness_km,
    )
}

/// Sun direction making angle `acos(cos_zenith)` with +Y, used to build the
/// synthetic sample for a zenith/height texel.
pub fn synthetic_sun_direction(cos_zenith: f32) -> Vec3 {
    let cos_zenith = cos_zenith.clamp(-1.0, 1.0);
    let sin_zenith = (1.0 - cos_zenith * cos_zenith).max(0.0).sqrt();
    Vec3::new(0.0, cos_zenith, -sin_zenith)
}

/// Angle between the local horizontal and the geometric horizon seen from
/// `view_radius_km`. Zero on the ground, growing with altitude.
pub fn horizon_angle(view_radius_km: f32, ground_radius_km: f32) -> f32 {
    let radius = view_radius_km.max(ground_radius_km);
    let horizon_distance = (radius * radius - ground_radius_km * ground_radius_km)
        .max(0.0)
        .sqrt();
    FRAC_PI_2 - (horizon_distance / radius).clamp(-1.0, 1.0).acos()
}

/// Unit direction for a sky-view `(azimuth, altitude)` pair in radians.
///
/// Azimuth 0 looks down -Z, azimuth π/2 looks down +X.
pub fn direction_from_angles(azimuth: f32, altitude: f32) -> Vec3 {
    Vec3::new(
        altitude.cos() * azimuth.sin(),
        altitude.sin(),
        -altitude.cos() * azimuth.cos(),
    )
}

/// `(azimuth, altitude)` of a sky-view texture coordinate.
pub fn sky_view_uv_to_angles(uv: Vec2, view_radius_km: f32, ground_radius_km: f32) -> (f32, f32) {
    let azimuth = (2.0 * uv.x - 1.0) * PI;
    let v_signed = 2.0 * uv.y - 1.0;
    let altitude = v_signed.signum() * v_signed * v_signed * FRAC_PI_2
        - horizon_angle(view_radius_km, ground_radius_km);
    (azimuth, altitude)
}

/// World direction of a sky-view texture coordinate.
pub fn sky_view_uv_to_direction(uv: Vec2, view_radius_km: f32, ground_radius_km: f32) -> Vec3 {
    let (azimuth, altitude) = sky_view_uv_to_angles(uv, view_radius_km, ground_radius_km);
    direction_from_angles(azimuth, altitude)
}

/// Inverse of [`sky_view_uv_to_direction`] for a unit `direction`.
pub fn direction_to_sky_view_uv(direction: Vec3, view_radius_km: f32, ground_radius_km: f32) -> Vec2 {
    let altitude = direction.y.clamp(-1.0, 1.0).asin();
    let azimuth = direction.x.atan2(-direction.z);

    let offset = altitude + horizon_angle(view_radius_km, ground_radius_km);
    let v_signed = offset.signum() * (offset.abs() / FRAC_PI_2).sqrt();

    Vec2::new(
        (0.5 + 0.5 * azimuth / PI).clamp(0.0, 1.0),
        (0.5 + 0.5 * v_signed).clamp(0.0, 1.0),
    )
}

/// Distance at the centre of depth slice `slice` out of `slice_count`.
///
/// The half-slice offset keeps slice 0 from collapsing onto the camera.
pub fn slice_to_distance(slice: u32, slice_count: u32, max_distance_km: f32) -> f32 {
    let t = (slice as f32 + 0.5) / slice_count as f32;
    t * t * max_distance_km
}

/// Continuous slice coordinate of a view distance; the inverse of
/// [`slice_to_distance`] before the half-slice offset, so a slice centre maps
/// to `slice + 0.5`.
pub fn distance_to_slice(distance_km: f32, slice_count: u32, max_distance_km: f32) -> f32 {
    (distance_km.max(0.0) / max_distance_km).sqrt() * slice_count as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: f32 = 6360.0;
    const THICKNESS: f32 = 100.0;

    #[test]
    fn test_zenith_height_roundtrip() {
        for i in 0..=20 {
            for j in 0..=10 {
                let z = -1.0 + i as f32 * 0.1;
                let h = j as f32 * THICKNESS / 10.0;
                let uv = zenith_height_to_uv(z, h, THICKNESS);
                let (z2, h2) = uv_to_zenith_height(uv, THICKNESS);
                assert!((z - z2).abs() < 1e-5, "cos zenith {z} -> {z2}");
                assert!((h - h2).abs() < 1e-3, "height {h} -> {h2}");
            }
        }
    }

    #[test]
    fn test_zenith_height_clamps() {
        let uv = zenith_height_to_uv(1.5, 250.0, THICKNESS);
        assert_eq!(uv, Vec2::ONE);
        let uv = zenith_height_to_uv(-3.0, -5.0, THICKNESS);
        assert_eq!(uv, Vec2::ZERO);
    }

    #[test]
    fn test_lut_uv_at_matches_synthetic_sample() {
        let params = AtmosphereParams::earth();
        let position = Vec3::new(0.0, R + 25.0, 0.0);
        let sun = synthetic_sun_direction(0.3);
        let uv = lut_uv_at(position, sun, &params);
        assert!((uv - zenith_height_to_uv(0.3, 25.0, THICKNESS)).length() < 1e-4);
    }

    #[test]
    fn test_horizon_angle() {
        assert!(horizon_angle(R, R).abs() < 1e-6);
        assert!(horizon_angle(R - 1.0, R).abs() < 1e-6);
        let high = horizon_angle(R + 100.0, R);
        let expected = (R / (R + 100.0)).acos();
        assert!((high - expected).abs() < 1e-3, "{high} vs {expected}");
    }

    #[test]
    fn test_sky_view_middle_row_is_horizon() {
        for view_height in [0.001_f32, 1.0, 10.0, 80.0] {
            let radius = R + view_height;
            let dir = sky_view_uv_to_direction(Vec2::new(0.3, 0.5), radius, R);
            let horizon_dip = horizon_angle(radius, R);
            let altitude = dir.y.asin();
            assert!(
                (altitude + horizon_dip).abs() < 1e-4,
                "v=0.5 must sit on the horizon at height {view_height}"
            );
        }
    }

    #[test]
    fn test_sky_view_roundtrip() {
        let radius = R + 2.0;
        for &(u, v) in &[(0.1, 0.2), (0.4, 0.45), (0.55, 0.7), (0.9, 0.95), (0.25, 0.52)] {
            let uv = Vec2::new(u, v);
            let dir = sky_view_uv_to_direction(uv, radius, R);
            let back = direction_to_sky_view_uv(dir, radius, R);
            assert!((uv - back).length() < 1e-3, "{uv} -> {dir} -> {back}");
        }
    }

    #[test]
    fn test_sky_view_top_is_zenith() {
        let dir = sky_view_uv_to_direction(Vec2::new(0.5, 1.0), R, R);
        assert!((dir - Vec3::Y).length() < 1e-4, "got {dir}");
    }

    #[test]
    fn test_slice_distance_monotonic() {
        let mut previous = 0.0;
        for slice in 0..32 {
            let d = slice_to_distance(slice, 32, 32.0);
            assert!(d > previous, "slice {slice} distance {d} <= {previous}");
            previous = d;
        }
        assert!(slice_to_distance(0, 32, 32.0) > 0.0);
        assert!(slice_to_distance(31, 32, 32.0) < 32.0);
    }

    #[test]
    fn test_distance_to_slice_inverts_center() {
        for slice in [0, 5, 17, 31] {
            let d = slice_to_distance(slice, 32, 32.0);
            let s = distance_to_slice(d, 32, 32.0);
            assert!((s - (slice as f32 + 0.5)).abs() < 1e-3, "slice {slice} -> {s}");
        }
    }
}
