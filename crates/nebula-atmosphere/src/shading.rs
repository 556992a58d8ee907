//! Consumers of the generated tables: sky and sun shading, and aerial
//! perspective applied over opaque geometry.

use glam::{Vec2, Vec3, Vec4};

use crate::aerial_perspective::AerialPerspectiveLut;
use crate::geometry::sphere_intersect_distance;
use crate::mapping::distance_to_slice;
use crate::params::AtmosphereParams;
use crate::sky_view::{SkyViewLut, clamp_view_height};
use crate::transmittance::TransmittanceLut;

/// Per-channel exponent of the solar limb-darkening law `mu^alpha`.
const LIMB_DARKENING: Vec3 = Vec3::new(0.397, 0.503, 0.652);

/// Appearance of the sun.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunDisk {
    pub angular_radius_rad: f32,
    /// Illuminance at the top of the atmosphere; scales every table lookup.
    pub illuminance: Vec3,
    /// Luminance of the disk relative to `illuminance`.
    pub disk_intensity: f32,
}

impl Default for SunDisk {
    fn default() -> Self {
        Self {
            angular_radius_rad: 0.2666f32.to_radians(),
            illuminance: Vec3::ONE,
            disk_intensity: 20.0,
        }
    }
}

impl SunDisk {
    /// Limb-darkened disk weight for a view direction, zero off the disk.
    pub fn disk_weight(&self, direction: Vec3, sun_direction: Vec3) -> Vec3 {
        let cos_angle = direction.dot(sun_direction).clamp(-1.0, 1.0);
        let cos_radius = self.angular_radius_rad.cos();
        if cos_angle < cos_radius {
            return Vec3::ZERO;
        }
        let r = (cos_angle.acos() / self.angular_radius_rad).min(1.0);
        let mu = (1.0 - r * r).max(0.0).sqrt();
        Vec3::new(
            mu.powf(LIMB_DARKENING.x),
            mu.powf(LIMB_DARKENING.y),
            mu.powf(LIMB_DARKENING.z),
        )
    }
}

/// Sky luminance toward a unit world `direction`, including the sun disk
/// when it is not hidden by the ground.
pub fn sky_radiance(
    params: &AtmosphereParams,
    sky_view: &SkyViewLut,
    transmittance: &TransmittanceLut,
    view_height_km: f32,
    direction: Vec3,
    sun_direction: Vec3,
    sun: &SunDisk,
) -> Vec3 {
    let mut luminance = sky_view.sample(params, view_height_km, direction) * sun.illuminance;

    let disk = sun.disk_weight(direction, sun_direction);
    if disk.max_element() > 0.0 {
        let position = Vec3::new(
            0.0,
            params.ground_radius_km + clamp_view_height(view_height_km, params),
            0.0,
        );
        if sphere_intersect_distance(position, direction, params.ground_radius_km) < 0.0 {
            luminance += disk
                * sun.illuminance
                * sun.disk_intensity
                * transmittance.sample_at(position, sun_direction, params);
        }
    }

    luminance
}

/// Blend aerial perspective over a surface `color` seen at screen `uv` and
/// view distance `distance_km`.
///
/// Between the camera and the first slice centre the volume is faded in
/// linearly, so nearby surfaces are left untouched.
pub fn apply_aerial_perspective(
    aerial_perspective: &AerialPerspectiveLut,
    color: Vec3,
    uv: Vec2,
    distance_km: f32,
    sun_illuminance: Vec3,
) -> Vec3 {
    let slices = aerial_perspective.lut().size().z;
    if slices == 0 || distance_km <= 0.0 {
        return color;
    }

    let mut sample: Vec4 = aerial_perspective.sample(uv, distance_km);
    let slice = distance_to_slice(distance_km, slices, aerial_perspective.max_distance_km());
    if slice < 0.5 {
        sample *= slice / 0.5;
    }

    let opacity = sample.w.clamp(0.0, 1.0);
    color * (1.0 - opacity) + sample.truncate() * sun_illuminance
}
