//! Image export of baked tables: tone mapping, volume tiling and the
//! equirectangular sky preview.

use std::f32::consts::{FRAC_PI_2, PI};
use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use nebula_atmosphere::{
    AtmosphereParams, FrameLuts, Lut2d, Lut3d, LutId, SunDisk, ViewParams, mapping, sky_radiance,
};
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// ExportError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ExportError {
    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Encoding or writing an image failed.
    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// How texel values are turned into 8-bit pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Encoding {
    /// Values already in `[0, 1]`, clamped and written as-is.
    Linear,
    /// Luminance, exposed and compressed with `1 - exp(-x)`, then gamma encoded.
    ToneMapped { exposure: f32 },
}

impl Encoding {
    pub fn encode(self, value: Vec3) -> [u8; 3] {
        let mapped = match self {
            Encoding::Linear => value,
            Encoding::ToneMapped { exposure } => {
                let v = (value * exposure).max(Vec3::ZERO);
                Vec3::ONE - Vec3::new((-v.x).exp(), (-v.y).exp(), (-v.z).exp())
            }
        };
        let gamma = match self {
            Encoding::Linear => 1.0,
            Encoding::ToneMapped { .. } => 1.0 / 2.2,
        };
        let to_byte = |c: f32| (c.clamp(0.0, 1.0).powf(gamma) * 255.0).round() as u8;
        [to_byte(mapped.x), to_byte(mapped.y), to_byte(mapped.z)]
    }
}

/// Encoding used for each table in the exported images.
pub fn encoding_for(lut: LutId, exposure: f32) -> Encoding {
    match lut {
        LutId::Transmittance => Encoding::Linear,
        _ => Encoding::ToneMapped { exposure },
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

pub fn lut2d_image(lut: &Lut2d, encoding: Encoding) -> image::RgbImage {
    let size = lut.size();
    image::RgbImage::from_fn(size.x, size.y, |x, y| {
        image::Rgb(encoding.encode(lut.texel(x, y)))
    })
}

/// Depth slices side by side, slice 0 on the left.
pub fn lut3d_image(lut: &Lut3d, encoding: Encoding) -> image::RgbImage {
    let size = lut.size();
    image::RgbImage::from_fn(size.x * size.z, size.y, |x, y| {
        let texel = lut.texel(x % size.x, y, x / size.x);
        image::Rgb(encoding.encode(texel.truncate()))
    })
}

/// Opacity channel of a volume, slices side by side.
pub fn opacity_image(lut: &Lut3d) -> image::GrayImage {
    let size = lut.size();
    image::GrayImage::from_fn(size.x * size.z, size.y, |x, y| {
        let opacity = lut.texel(x % size.x, y, x / size.x).w;
        image::Luma([(opacity.clamp(0.0, 1.0) * 255.0).round() as u8])
    })
}

/// Equirectangular render of the whole sky, `width` by `width / 2`.
///
/// The centre column looks down -Z; the top row is the zenith.
pub fn sky_preview(
    params: &AtmosphereParams,
    luts: &FrameLuts,
    view: &ViewParams,
    sun: &SunDisk,
    width: u32,
    exposure: f32,
) -> image::RgbImage {
    let height = (width / 2).max(1);
    let encoding = Encoding::ToneMapped { exposure };
    image::RgbImage::from_fn(width, height, |x, y| {
        let uv = Vec2::new(
            (x as f32 + 0.5) / width as f32,
            (y as f32 + 0.5) / height as f32,
        );
        let azimuth = (uv.x - 0.5) * 2.0 * PI;
        let altitude = FRAC_PI_2 - uv.y * PI;
        let direction = mapping::direction_from_angles(azimuth, altitude);
        let radiance = sky_radiance(
            params,
            &luts.sky_view,
            &luts.transmittance,
            view.camera_height_km(),
            direction,
            view.sun_direction,
            sun,
        );
        image::Rgb(encoding.encode(radiance))
    })
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Everything needed to export one baked frame.
pub struct Export<'a> {
    pub params: &'a AtmosphereParams,
    pub view: &'a ViewParams,
    pub sun: &'a SunDisk,
    pub luts: &'a FrameLuts,
    pub exposure: f32,
    pub sky_preview_width: u32,
}

impl Export<'_> {
    /// Write every table plus the sky preview into `dir`, returning the
    /// written paths.
    pub fn write_all(&self, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        std::fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let exposure = self.exposure;
        let mut written = Vec::new();

        let two_d: [(LutId, &Lut2d); 3] = [
            (LutId::Transmittance, self.luts.transmittance.lut()),
            (LutId::MultiScattering, self.luts.multi_scattering.lut()),
            (LutId::SkyView, self.luts.sky_view.lut()),
        ];
        for (id, lut) in two_d {
            let image = lut2d_image(lut, encoding_for(id, exposure));
            written.push(save_png(dir, id.name(), image)?);
        }

        let volume = self.luts.aerial_perspective.lut();
        let id = LutId::AerialPerspective;
        written.push(save_png(dir, id.name(), lut3d_image(volume, encoding_for(id, exposure)))?);
        written.push(save_png(dir, "aerial_perspective_opacity", opacity_image(volume))?);

        let preview = sky_preview(
            self.params,
            self.luts,
            self.view,
            self.sun,
            self.sky_preview_width,
            exposure,
        );
        written.push(save_png(dir, "sky_preview", preview)?);

        Ok(written)
    }
}

fn save_png(dir: &Path, name: &str, image: impl Into<image::DynamicImage>) -> Result<PathBuf, ExportError> {
    let path = dir.join(format!("{name}.png"));
    image.into().save(&path)?;
    info!("Wrote {}", path.display());
    Ok(path)
}
