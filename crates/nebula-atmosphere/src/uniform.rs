//! Packed parameter buffers for hosts that run the generators on the GPU.
//!
//! Layouts follow WGSL uniform rules: every `vec3<f32>` starts on a 16-byte
//! boundary, so each one is followed by an explicit padding word.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, UVec2, UVec3, Vec3};

use crate::error::AtmosphereError;
use crate::params::{AtmosphereParams, ViewParams};
use crate::settings::LutSettings;

/// Atmosphere parameters as seen by the generator shaders. 96 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct AtmosphereUniform {
    /// Planet radius in km. (offset 0)
    pub ground_radius_km: f32,
    /// Atmosphere thickness in km. (offset 4)
    pub thickness_km: f32,
    /// Mie asymmetry. (offset 8)
    pub mie_g: f32,
    /// Multiple-scattering scale. (offset 12)
    pub ms_contribution: f32,
    /// (offset 16)
    pub ground_albedo: [f32; 3],
    pub _pad0: f32,
    /// (offset 32)
    pub rayleigh_scattering: [f32; 3],
    pub _pad1: f32,
    /// (offset 48)
    pub mie_scattering: [f32; 3],
    pub _pad2: f32,
    /// (offset 64)
    pub mie_absorption: [f32; 3],
    pub _pad3: f32,
    /// (offset 80)
    pub ozone_absorption: [f32; 3],
    pub _pad4: f32,
}

static_assertions::assert_eq_size!(AtmosphereUniform, [u8; 96]);

impl From<&AtmosphereParams> for AtmosphereUniform {
    fn from(params: &AtmosphereParams) -> Self {
        Self {
            ground_radius_km: params.ground_radius_km,
            thickness_km: params.thickness_km,
            mie_g: params.mie_g,
            ms_contribution: params.ms_contribution,
            ground_albedo: params.ground_albedo.to_array(),
            _pad0: 0.0,
            rayleigh_scattering: params.rayleigh_scattering.to_array(),
            _pad1: 0.0,
            mie_scattering: params.mie_scattering.to_array(),
            _pad2: 0.0,
            mie_absorption: params.mie_absorption.to_array(),
            _pad3: 0.0,
            ozone_absorption: params.ozone_absorption.to_array(),
            _pad4: 0.0,
        }
    }
}

impl From<&AtmosphereUniform> for AtmosphereParams {
    fn from(uniform: &AtmosphereUniform) -> Self {
        Self {
            ground_radius_km: uniform.ground_radius_km,
            thickness_km: uniform.thickness_km,
            mie_g: uniform.mie_g,
            ms_contribution: uniform.ms_contribution,
            ground_albedo: Vec3::from_array(uniform.ground_albedo),
            rayleigh_scattering: Vec3::from_array(uniform.rayleigh_scattering),
            mie_scattering: Vec3::from_array(uniform.mie_scattering),
            mie_absorption: Vec3::from_array(uniform.mie_absorption),
            ozone_absorption: Vec3::from_array(uniform.ozone_absorption),
        }
    }
}

/// Per-frame camera and sun state. 160 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ViewUniform {
    /// Column-major inverse projection. (offset 0)
    pub inverse_projection: [[f32; 4]; 4],
    /// (offset 64)
    pub camera_position: [f32; 3],
    pub _pad0: f32,
    /// (offset 80)
    pub camera_right: [f32; 3],
    pub _pad1: f32,
    /// (offset 96)
    pub camera_up: [f32; 3],
    pub _pad2: f32,
    /// (offset 112)
    pub camera_forward: [f32; 3],
    pub _pad3: f32,
    /// (offset 128)
    pub sun_direction: [f32; 3],
    pub _pad4: f32,
    /// (offset 144)
    pub atmosphere_origin: [f32; 3],
    pub _pad5: f32,
}

static_assertions::assert_eq_size!(ViewUniform, [u8; 160]);

impl From<&ViewParams> for ViewUniform {
    fn from(view: &ViewParams) -> Self {
        Self {
            inverse_projection: view.inverse_projection.to_cols_array_2d(),
            camera_position: view.camera_position.to_array(),
            _pad0: 0.0,
            camera_right: view.camera_right.to_array(),
            _pad1: 0.0,
            camera_up: view.camera_up.to_array(),
            _pad2: 0.0,
            camera_forward: view.camera_forward.to_array(),
            _pad3: 0.0,
            sun_direction: view.sun_direction.to_array(),
            _pad4: 0.0,
            atmosphere_origin: view.atmosphere_origin.to_array(),
            _pad5: 0.0,
        }
    }
}

impl From<&ViewUniform> for ViewParams {
    fn from(uniform: &ViewUniform) -> Self {
        Self {
            camera_position: Vec3::from_array(uniform.camera_position),
            camera_right: Vec3::from_array(uniform.camera_right),
            camera_up: Vec3::from_array(uniform.camera_up),
            camera_forward: Vec3::from_array(uniform.camera_forward),
            inverse_projection: Mat4::from_cols_array_2d(&uniform.inverse_projection),
            sun_direction: Vec3::from_array(uniform.sun_direction),
            atmosphere_origin: Vec3::from_array(uniform.atmosphere_origin),
        }
    }
}

/// Table sizes and sample counts. 64 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LutSettingsUniform {
    /// (offset 0)
    pub transmittance_size: [u32; 2],
    pub transmittance_steps: u32,
    pub multi_scattering_steps: u32,
    /// (offset 16)
    pub multi_scattering_size: [u32; 2],
    pub multi_scattering_sample_count: u32,
    pub sky_view_steps: u32,
    /// (offset 32)
    pub sky_view_size: [u32; 2],
    pub aerial_perspective_steps: u32,
    pub aerial_perspective_max_distance_km: f32,
    /// (offset 48)
    pub aerial_perspective_size: [u32; 3],
    pub _pad0: u32,
}

static_assertions::assert_eq_size!(LutSettingsUniform, [u8; 64]);

impl From<&LutSettings> for LutSettingsUniform {
    fn from(settings: &LutSettings) -> Self {
        Self {
            transmittance_size: settings.transmittance_size.to_array(),
            transmittance_steps: settings.transmittance_steps,
            multi_scattering_steps: settings.multi_scattering_steps,
            multi_scattering_size: settings.multi_scattering_size.to_array(),
            multi_scattering_sample_count: settings.multi_scattering_sample_count,
            sky_view_steps: settings.sky_view_steps,
            sky_view_size: settings.sky_view_size.to_array(),
            aerial_perspective_steps: settings.aerial_perspective_steps,
            aerial_perspective_max_distance_km: settings.aerial_perspective_max_distance_km,
            aerial_perspective_size: settings.aerial_perspective_size.to_array(),
            _pad0: 0,
        }
    }
}

impl From<&LutSettingsUniform> for LutSettings {
    fn from(uniform: &LutSettingsUniform) -> Self {
        Self {
            transmittance_size: UVec2::from_array(uniform.transmittance_size),
            transmittance_steps: uniform.transmittance_steps,
            multi_scattering_size: UVec2::from_array(uniform.multi_scattering_size),
            multi_scattering_steps: uniform.multi_scattering_steps,
            multi_scattering_sample_count: uniform.multi_scattering_sample_count,
            sky_view_size: UVec2::from_array(uniform.sky_view_size),
            sky_view_steps: uniform.sky_view_steps,
            aerial_perspective_size: UVec3::from_array(uniform.aerial_perspective_size),
            aerial_perspective_steps: uniform.aerial_perspective_steps,
            aerial_perspective_max_distance_km: uniform.aerial_perspective_max_distance_km,
        }
    }
}

/// Byte view and checked decoding shared by the uniform types.
pub trait UniformBytes: Pod {
    fn to_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decode from a buffer of exactly `size_of::<Self>()` bytes. The buffer
    /// need not be aligned.
    fn from_bytes(bytes: &[u8]) -> Result<Self, AtmosphereError> {
        let expected = std::mem::size_of::<Self>();
        if bytes.len() != expected {
            return Err(AtmosphereError::LayoutMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

impl UniformBytes for AtmosphereUniform {}
impl UniformBytes for ViewUniform {}
impl UniformBytes for LutSettingsUniform {}
