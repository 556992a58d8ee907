//! Parameter snapshots consumed by the LUT generators.
//!
//! [`AtmosphereParams`] changes rarely and drives the static tables;
//! [`ViewParams`] is rebuilt every frame. Both are plain values: a pipeline run
//! works on the copy it was handed, never on state the host keeps mutating.

use glam::{Mat4, Vec3};

use crate::error::AtmosphereError;

/// Tolerance used when checking that direction vectors are unit length.
const UNIT_TOLERANCE: f32 = 1e-3;

/// Physical description of the atmosphere. Distances in km, coefficients in km⁻¹.
#[derive(Clone, Debug, PartialEq)]
pub struct AtmosphereParams {
    /// Planet radius at ground level.
    pub ground_radius_km: f32,
    /// Height of the atmosphere shell above the ground.
    pub thickness_km: f32,
    /// Mie asymmetry factor for the Cornette-Shanks phase function.
    pub mie_g: f32,
    /// Scale of the multiple-scattering term.
    pub ms_contribution: f32,
    /// Linear RGB ground albedo.
    pub ground_albedo: Vec3,
    pub rayleigh_scattering: Vec3,
    pub mie_scattering: Vec3,
    pub mie_absorption: Vec3,
    pub ozone_absorption: Vec3,
}

impl Default for AtmosphereParams {
    fn default() -> Self {
        Self::earth()
    }
}

impl AtmosphereParams {
    /// Earth's atmosphere as commonly used for real-time sky rendering.
    pub fn earth() -> Self {
        Self {
            ground_radius_km: 6360.0,
            thickness_km: 100.0,
            mie_g: 0.8,
            ms_contribution: 1.0,
            ground_albedo: Vec3::splat(0.3),
            rayleigh_scattering: Vec3::new(5.802e-3, 13.558e-3, 33.1e-3),
            mie_scattering: Vec3::splat(3.996e-3),
            mie_absorption: Vec3::splat(4.4e-3),
            ozone_absorption: Vec3::new(0.650e-3, 1.881e-3, 0.085e-3),
        }
    }

    /// Radius of the top of the atmosphere.
    pub fn top_radius_km(&self) -> f32 {
        self.ground_radius_km + self.thickness_km
    }

    /// Check the invariants every generator relies on.
    pub fn validate(&self) -> Result<(), AtmosphereError> {
        if !(self.ground_radius_km.is_finite() && self.ground_radius_km > 0.0) {
            return Err(AtmosphereError::InvalidParams(format!(
                "ground radius must be positive, got {}",
                self.ground_radius_km
            )));
        }
        if !(self.thickness_km.is_finite() && self.thickness_km > 0.0) {
            return Err(AtmosphereError::InvalidParams(format!(
                "atmosphere thickness must be positive, got {}",
                self.thickness_km
            )));
        }
        if !(self.mie_g > -1.0 && self.mie_g < 1.0) {
            return Err(AtmosphereError::InvalidParams(format!(
                "mie asymmetry must lie in (-1, 1), got {}",
                self.mie_g
            )));
        }
        if !(self.ms_contribution.is_finite() && self.ms_contribution >= 0.0) {
            return Err(AtmosphereError::InvalidParams(format!(
                "multiple-scattering contribution must be non-negative, got {}",
                self.ms_contribution
            )));
        }

        let coefficients = [
            ("ground albedo", self.ground_albedo),
            ("rayleigh scattering", self.rayleigh_scattering),
            ("mie scattering", self.mie_scattering),
            ("mie absorption", self.mie_absorption),
            ("ozone absorption", self.ozone_absorption),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() || value.min_element() < 0.0 {
                return Err(AtmosphereError::InvalidParams(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Per-frame camera and sun state. World units are kilometres, +Y is up.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewParams {
    pub camera_position: Vec3,
    /// Camera basis in world space. View space looks down -Z, so a view-space
    /// direction `d` maps to `right * d.x + up * d.y - forward * d.z`.
    pub camera_right: Vec3,
    pub camera_up: Vec3,
    pub camera_forward: Vec3,
    pub inverse_projection: Mat4,
    /// Unit vector pointing toward the sun.
    pub sun_direction: Vec3,
    /// World-space point treated as ground level.
    pub atmosphere_origin: Vec3,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self::looking_at_horizon(
            0.5,
            Vec3::NEG_Z,
            sun_direction_from_angles(20f32.to_radians(), 0.0),
            60f32.to_radians(),
            16.0 / 9.0,
        )
    }
}

impl ViewParams {
    /// Camera at `altitude_km` above the origin looking along `forward`.
    ///
    /// `forward` need not be normalized; it must not be parallel to +Y.
    pub fn looking_at_horizon(
        altitude_km: f32,
        forward: Vec3,
        sun_direction: Vec3,
        fov_y: f32,
        aspect_ratio: f32,
    ) -> Self {
        let forward = forward.normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        let projection = Mat4::perspective_rh(fov_y, aspect_ratio, 0.01, 1000.0);
        Self {
            camera_position: Vec3::new(0.0, altitude_km, 0.0),
            camera_right: right,
            camera_up: up,
            camera_forward: forward,
            inverse_projection: projection.inverse(),
            sun_direction: sun_direction.normalize(),
            atmosphere_origin: Vec3::ZERO,
        }
    }

    /// Camera height above the atmosphere origin. Negative when underground.
    pub fn camera_height_km(&self) -> f32 {
        (self.camera_position - self.atmosphere_origin).y
    }

    /// Rotate a view-space direction into world space.
    pub fn view_to_world(&self, direction: Vec3) -> Vec3 {
        self.camera_right * direction.x + self.camera_up * direction.y
            - self.camera_forward * direction.z
    }

    /// Check that the sun and camera basis vectors are unit length.
    pub fn validate(&self) -> Result<(), AtmosphereError> {
        let vectors = [
            ("sun direction", self.sun_direction),
            ("camera right", self.camera_right),
            ("camera up", self.camera_up),
            ("camera forward", self.camera_forward),
        ];
        for (name, value) in vectors {
            if !value.is_finite() || (value.length() - 1.0).abs() > UNIT_TOLERANCE {
                return Err(AtmosphereError::InvalidView(format!(
                    "{name} must be unit length, got {value}"
                )));
            }
        }
        if !self.camera_position.is_finite() || !self.atmosphere_origin.is_finite() {
            return Err(AtmosphereError::InvalidView(
                "camera position and atmosphere origin must be finite".to_string(),
            ));
        }
        if !self.inverse_projection.is_finite() {
            return Err(AtmosphereError::InvalidView(
                "inverse projection must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Direction toward the sun for an elevation above the horizon and an azimuth
/// measured clockwise from -Z, both in radians.
///
/// Uses the same azimuth convention as the sky-view table.
pub fn sun_direction_from_angles(elevation: f32, azimuth: f32) -> Vec3 {
    Vec3::new(
        elevation.cos() * azimuth.sin(),
        elevation.sin(),
        -elevation.cos() * azimuth.cos(),
    )
}
