//! Texel storage for the lookup tables and the sampling a GPU sampler would do.
//!
//! Texel `i` along an axis of `n` texels is centred at `(i + 0.5) / n`.
//! Sampling is bilinear (trilinear for volumes) with clamp-to-edge addressing,
//! so CPU consumers see the same values a host's linear sampler returns.

use std::fmt;

use glam::{UVec2, UVec3, Vec2, Vec3, Vec4};
use rayon::prelude::*;

/// Stable logical name of each lookup table.
///
/// Hosts bind their own texture resources to these names; the core never
/// deals in engine resource identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LutId {
    Transmittance,
    MultiScattering,
    SkyView,
    AerialPerspective,
}

impl LutId {
    /// All tables in dependency order.
    pub const ALL: [LutId; 4] = [
        LutId::Transmittance,
        LutId::MultiScattering,
        LutId::SkyView,
        LutId::AerialPerspective,
    ];

    /// Name used in logs, dispatch labels and output file names.
    pub fn name(self) -> &'static str {
        match self {
            LutId::Transmittance => "transmittance",
            LutId::MultiScattering => "multi_scattering",
            LutId::SkyView => "sky_view",
            LutId::AerialPerspective => "aerial_perspective",
        }
    }

    /// Whether the table is a 3D volume.
    pub fn is_volume(self) -> bool {
        matches!(self, LutId::AerialPerspective)
    }
}

impl fmt::Display for LutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Centre of texel `index` along an axis of `size` texels, in `[0, 1]`.
pub fn texel_center(index: u32, size: u32) -> f32 {
    (index as f32 + 0.5) / size as f32
}

/// Centre of a 2D texel in texture coordinates.
pub fn texel_center_uv(texel: UVec2, size: UVec2) -> Vec2 {
    Vec2::new(texel_center(texel.x, size.x), texel_center(texel.y, size.y))
}

/// A 2D table of RGB texels, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Lut2d {
    id: LutId,
    size: UVec2,
    texels: Vec<Vec3>,
}

impl Lut2d {
    /// Run `texel_fn` for every texel on the rayon pool and collect the table.
    ///
    /// Each texel is independent; rows are handed out as work items. The
    /// table only exists once every texel has been written.
    pub fn generate<F>(id: LutId, size: UVec2, texel_fn: F) -> Self
    where
        F: Fn(UVec2) -> Vec3 + Sync,
    {
        let mut texels = vec![Vec3::ZERO; (size.x * size.y) as usize];
        if !texels.is_empty() {
            texels
                .par_chunks_mut(size.x as usize)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, texel) in row.iter_mut().enumerate() {
                        *texel = texel_fn(UVec2::new(x as u32, y as u32));
                    }
                });
        }
        Self { id, size, texels }
    }

    /// Build a table from existing texels.
    ///
    /// # Panics
    ///
    /// Panics if `texels.len()` does not match `size`.
    pub fn from_texels(id: LutId, size: UVec2, texels: Vec<Vec3>) -> Self {
        assert_eq!(
            texels.len(),
            (size.x * size.y) as usize,
            "texel count must match the table size"
        );
        Self { id, size, texels }
    }

    pub fn id(&self) -> LutId {
        self.id
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn texels(&self) -> &[Vec3] {
        &self.texels
    }

    /// Texel at integer coordinates, clamped to the table edge.
    pub fn texel(&self, x: u32, y: u32) -> Vec3 {
        if self.texels.is_empty() {
            return Vec3::ZERO;
        }
        let x = x.min(self.size.x - 1);
        let y = y.min(self.size.y - 1);
        self.texels[(y * self.size.x + x) as usize]
    }

    /// UV coordinate of a texel's centre.
    pub fn texel_uv(&self, texel: UVec2) -> Vec2 {
        texel_center_uv(texel, self.size)
    }

    /// Bilinear, clamp-to-edge sample.
    pub fn sample(&self, uv: Vec2) -> Vec3 {
        if self.texels.is_empty() {
            return Vec3::ZERO;
        }
        let (x0, x1, tx) = filter_axis(uv.x, self.size.x);
        let (y0, y1, ty) = filter_axis(uv.y, self.size.y);
        let row0 = self.texel(x0, y0).lerp(self.texel(x1, y0), tx);
        let row1 = self.texel(x0, y1).lerp(self.texel(x1, y1), tx);
        row0.lerp(row1, ty)
    }
}

/// A 3D table of RGBA texels, stored slice by slice.
#[derive(Clone, Debug, PartialEq)]
pub struct Lut3d {
    id: LutId,
    size: UVec3,
    texels: Vec<Vec4>,
}

impl Lut3d {
    /// Run `texel_fn` for every texel on the rayon pool and collect the volume.
    pub fn generate<F>(id: LutId, size: UVec3, texel_fn: F) -> Self
    where
        F: Fn(UVec3) -> Vec4 + Sync,
    {
        let mut texels = vec![Vec4::ZERO; (size.x * size.y * size.z) as usize];
        if !texels.is_empty() {
            let width = size.x as usize;
            texels
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(row_index, row)| {
                    let y = (row_index as u32) % size.y;
                    let z = (row_index as u32) / size.y;
                    for (x, texel) in row.iter_mut().enumerate() {
                        *texel = texel_fn(UVec3::new(x as u32, y, z));
                    }
                });
        }
        Self { id, size, texels }
    }

    pub fn id(&self) -> LutId {
        self.id
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Texel at integer coordinates, clamped to the volume edge.
    pub fn texel(&self, x: u32, y: u32, z: u32) -> Vec4 {
        if self.texels.is_empty() {
            return Vec4::ZERO;
        }
        let x = x.min(self.size.x - 1);
        let y = y.min(self.size.y - 1);
        let z = z.min(self.size.z - 1);
        self.texels[((z * self.size.y + y) * self.size.x + x) as usize]
    }

    /// Texels of one depth slice, row-major.
    pub fn slice(&self, z: u32) -> &[Vec4] {
        let len = (self.size.x * self.size.y) as usize;
        let start = z as usize * len;
        self.texels.get(start..start + len).unwrap_or(&[])
    }

    /// Trilinear, clamp-to-edge sample.
    pub fn sample(&self, uvw: Vec3) -> Vec4 {
        if self.texels.is_empty() {
            return Vec4::ZERO;
        }
        let (x0, x1, tx) = filter_axis(uvw.x, self.size.x);
        let (y0, y1, ty) = filter_axis(uvw.y, self.size.y);
        let (z0, z1, tz) = filter_axis(uvw.z, self.size.z);
        let plane = |z: u32| {
            let row0 = self.texel(x0, y0, z).lerp(self.texel(x1, y0, z), tx);
            let row1 = self.texel(x0, y1, z).lerp(self.texel(x1, y1, z), tx);
            row0.lerp(row1, ty)
        };
        plane(z0).lerp(plane(z1), tz)
    }
}

/// Neighbouring texel indices and blend weight for a normalized coordinate.
fn filter_axis(coord: f32, size: u32) -> (u32, u32, f32) {
    let x = coord * size as f32 - 0.5;
    let base = x.floor();
    let weight = if base.is_finite() { x - base } else { 0.0 };
    let last = i64::from(size) - 1;
    let i0 = (base as i64).clamp(0, last) as u32;
    let i1 = (base as i64 + 1).clamp(0, last) as u32;
    (i0, i1, weight)
}
