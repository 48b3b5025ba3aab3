use std::fmt;

use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::Dims;
use crate::foundation::error::{TerraError, TerraResult};

const XXH3_SEED: u64 = 0x5e1f_a3c0_9b27_d4e1;

/// 2D elevation grid stored row-major (`index = y * width + x`).
///
/// Snapshots are shared as `Arc<Heightmap>` once cached and are never mutated afterwards; steps
/// always produce a fresh grid.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Heightmap {
    dims: Dims,
    data: Vec<f32>,
}

/// Summary statistics for one heightmap.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct HeightStats {
    /// Lowest elevation.
    pub min: f32,
    /// Highest elevation.
    pub max: f32,
    /// Mean elevation.
    pub mean: f32,
}

/// Stable 128-bit content hash of a heightmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

impl Heightmap {
    /// Flat zero-elevation grid.
    pub fn new(dims: Dims) -> Self {
        Self {
            dims,
            data: vec![0.0; dims.cells()],
        }
    }

    /// Grid filled with a constant elevation.
    pub fn filled(dims: Dims, value: f32) -> Self {
        Self {
            dims,
            data: vec![value; dims.cells()],
        }
    }

    /// Wrap existing row-major data; the length must equal `width * height`.
    pub fn from_vec(dims: Dims, data: Vec<f32>) -> TerraResult<Self> {
        if data.len() != dims.cells() {
            return Err(TerraError::configuration(format!(
                "heightmap data has {} cells, expected {} for {dims}",
                data.len(),
                dims.cells()
            )));
        }
        Ok(Self { dims, data })
    }

    /// Grid dimensions.
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.dims.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.dims.height
    }

    /// Total cell count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Return `true` for an empty grid.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.dims.width as usize) + (x as usize)
    }

    /// Elevation at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.data[self.idx(x, y)]
    }

    /// Set the elevation at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        let i = self.idx(x, y);
        self.data[i] = value;
    }

    /// Read-only row-major data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable row-major data.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consume the grid and return its data.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Overwrite every cell.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Index and value of the first NaN/infinite cell.
    pub fn first_non_finite(&self) -> Option<(usize, f32)> {
        self.data
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
    }

    /// Min, max and mean elevation. An empty grid reports zeros.
    pub fn stats(&self) -> HeightStats {
        if self.data.is_empty() {
            return HeightStats {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        for &v in &self.data {
            min = min.min(v);
            max = max.max(v);
            sum += f64::from(v);
        }
        HeightStats {
            min,
            max,
            mean: (sum / self.data.len() as f64) as f32,
        }
    }

    /// Content hash over dimensions and the exact bit pattern of every cell.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut h = Xxh3::with_seed(XXH3_SEED);
        h.update(&self.dims.width.to_le_bytes());
        h.update(&self.dims.height.to_le_bytes());
        for v in &self.data {
            h.update(&v.to_bits().to_le_bytes());
        }
        let v = h.digest128();
        Fingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }

    /// Little-endian bytes of every cell, in row-major order.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 4);
        for v in &self.data {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Bilinearly interpolated elevation at a fractional position.
    ///
    /// Positions outside the grid report 0.0.
    pub fn height_interpolated(&self, x: f32, y: f32) -> f32 {
        let Some((x0, y0, tx, ty)) = self.cell_of(x, y) else {
            return 0.0;
        };
        let (x1, y1) = self.clamp_next(x0, y0);
        let h00 = self.at(x0, y0);
        let h10 = self.at(x1, y0);
        let h01 = self.at(x0, y1);
        let h11 = self.at(x1, y1);
        let top = h00 + (h10 - h00) * tx;
        let bottom = h01 + (h11 - h01) * tx;
        top + (bottom - top) * ty
    }

    /// Bilinearly interpolated gradient `(d/dx, d/dy)` at a fractional position.
    pub fn gradient(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let (x0, y0, tx, ty) = self.cell_of(x, y)?;
        let (x1, y1) = self.clamp_next(x0, y0);
        let h00 = self.at(x0, y0);
        let h10 = self.at(x1, y0);
        let h01 = self.at(x0, y1);
        let h11 = self.at(x1, y1);
        let gx = (h10 - h00) * (1.0 - ty) + (h11 - h01) * ty;
        let gy = (h01 - h00) * (1.0 - tx) + (h11 - h10) * tx;
        Some((gx, gy))
    }

    fn cell_of(&self, x: f32, y: f32) -> Option<(u32, u32, f32, f32)> {
        if self.data.is_empty() || !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        let max_x = self.dims.width.saturating_sub(1) as f32;
        let max_y = self.dims.height.saturating_sub(1) as f32;
        if x > max_x || y > max_y {
            return None;
        }
        let x0 = x.floor();
        let y0 = y.floor();
        Some((x0 as u32, y0 as u32, x - x0, y - y0))
    }

    fn clamp_next(&self, x0: u32, y0: u32) -> (u32, u32) {
        (
            (x0 + 1).min(self.dims.width.saturating_sub(1)),
            (y0 + 1).min(self.dims.height.saturating_sub(1)),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/terrain/heightmap.rs"]
mod tests;
