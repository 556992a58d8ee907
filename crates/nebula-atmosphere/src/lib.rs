//! Precomputed atmospheric scattering lookup tables.
//!
//! Builds the four tables a renderer needs to shade sky, sun and aerial
//! perspective without marching the view every frame:
//!
//! - [`TransmittanceLut`] and [`MultiScatteringLut`] depend only on
//!   [`AtmosphereParams`] and are cached until those change.
//! - [`SkyViewLut`] and [`AerialPerspectiveLut`] also depend on the per-frame
//!   [`ViewParams`] and are rebuilt every frame.
//!
//! [`AtmospherePipeline`] schedules the generators; [`sky_radiance`] and
//! [`apply_aerial_perspective`] consume the results. Distances are in
//! kilometres throughout.

mod aerial_perspective;
mod config;
mod error;
pub mod geometry;
mod lut;
pub mod mapping;
mod multi_scattering;
pub mod optics;
mod params;
mod pipeline;
pub mod raymarch;
mod settings;
mod shading;
mod sky_view;
mod transmittance;
mod uniform;

pub use aerial_perspective::{
    AerialPerspectiveLut, generate_aerial_perspective_lut, view_ray_direction,
};
pub use error::AtmosphereError;
pub use lut::{Lut2d, Lut3d, LutId, texel_center, texel_center_uv};
pub use multi_scattering::{
    MultiScatteringLut, compute_multi_scattering, generate_multi_scattering_lut,
};
pub use params::{AtmosphereParams, ViewParams, sun_direction_from_angles};
pub use pipeline::{
    AtmospherePipeline, Cadence, Dispatch, DispatchPlan, DispatchStep, FrameLuts, PipelineGraph,
    StageNode, StaticLuts, lut_extent, workgroup_size,
};
pub use raymarch::{RaymarchInput, ScatteringResult, integrate};
pub use settings::LutSettings;
pub use shading::{SunDisk, apply_aerial_perspective, sky_radiance};
pub use sky_view::{MIN_VIEW_HEIGHT_KM, SkyViewLut, clamp_view_height, generate_sky_view_lut};
pub use transmittance::{TransmittanceLut, compute_transmittance, generate_transmittance_lut};
pub use uniform::{AtmosphereUniform, LutSettingsUniform, UniformBytes, ViewUniform};
