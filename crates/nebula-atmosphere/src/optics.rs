//! Optical properties of the atmosphere as a function of height.

use std::f32::consts::PI;

use glam::Vec3;

use crate::params::AtmosphereParams;

/// Height over which Rayleigh density falls off by `1/e`.
pub const RAYLEIGH_SCALE_HEIGHT_KM: f32 = 8.0;
/// Height over which Mie density falls off by `1/e`.
pub const MIE_SCALE_HEIGHT_KM: f32 = 1.2;
/// Height of peak ozone density.
pub const OZONE_PEAK_HEIGHT_KM: f32 = 40.179;
/// Half-width of the triangular ozone profile.
pub const OZONE_HALF_WIDTH_KM: f32 = 17.83;

/// Scattering and extinction coefficients at one point of the medium, in km⁻¹.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MediumSample {
    pub rayleigh: Vec3,
    pub mie: Vec3,
    /// Rayleigh + Mie scattering plus Mie and ozone absorption.
    pub extinction: Vec3,
}

/// Evaluate the medium at `height_km` above ground. Negative heights are
/// treated as ground level.
pub fn scattering(height_km: f32, params: &AtmosphereParams) -> MediumSample {
    let height = height_km.max(0.0);
    let rayleigh_density = (-height / RAYLEIGH_SCALE_HEIGHT_KM).exp();
    let mie_density = (-height / MIE_SCALE_HEIGHT_KM).exp();
    let ozone_density = ozone_density(height);

    let rayleigh = params.rayleigh_scattering * rayleigh_density;
    let mie = params.mie_scattering * mie_density;
    let mie_absorption = params.mie_absorption * mie_density;
    let ozone_absorption = params.ozone_absorption * ozone_density;

    MediumSample {
        rayleigh,
        mie,
        extinction: rayleigh + mie + mie_absorption + ozone_absorption,
    }
}

/// Triangular ozone profile, zero outside the layer.
pub fn ozone_density(height_km: f32) -> f32 {
    (1.0 - (height_km - OZONE_PEAK_HEIGHT_KM).abs() / OZONE_HALF_WIDTH_KM).max(0.0)
}

pub fn rayleigh_phase(cos_theta: f32) -> f32 {
    3.0 / (16.0 * PI) * (1.0 + cos_theta * cos_theta)
}

/// Cornette-Shanks phase function with asymmetry `g`.
pub fn mie_phase(cos_theta: f32, g: f32) -> f32 {
    let g2 = g * g;
    let num = 3.0 * (1.0 - g2) * (1.0 + cos_theta * cos_theta);
    let denom = 8.0 * PI * (2.0 + g2) * (1.0 + g2 - 2.0 * g * cos_theta).powf(1.5);
    num / denom
}
