use crate::foundation::core::Dims;
use crate::foundation::error::{TerraError, TerraResult};
use crate::terrain::heightmap::Heightmap;

/// Supplies frame 0 for a new session.
pub trait TerrainProvider {
    /// Produce the initial heightmap for `dims`.
    fn initial_terrain(&self, dims: Dims) -> TerraResult<Heightmap>;
}

impl TerrainProvider for Heightmap {
    fn initial_terrain(&self, dims: Dims) -> TerraResult<Heightmap> {
        if self.dims() != dims {
            return Err(TerraError::configuration(format!(
                "initial terrain is {}, session expects {dims}",
                self.dims()
            )));
        }
        Ok(self.clone())
    }
}

/// Geometric initial-terrain shapes, centred on the grid.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum InitialTerrain {
    /// Constant elevation.
    Flat {
        /// Elevation of every cell.
        #[serde(default)]
        elevation: f32,
    },
    /// Linear cone falling from `height` at the centre to 0 at `radius`.
    Cone {
        /// Base radius in cells.
        #[serde(default = "default_radius")]
        radius: f32,
        /// Peak height.
        #[serde(default = "default_height")]
        height: f32,
    },
    /// Hemisphere `z = sqrt(r² - d²)`.
    SemiSphere {
        /// Radius in cells.
        #[serde(default = "default_radius")]
        radius: f32,
    },
    /// Plateau with a smooth logistic edge at `radius`.
    Sigmoid {
        /// Distance of the edge midpoint from the centre.
        #[serde(default = "default_radius")]
        radius: f32,
        /// Plateau height.
        #[serde(default = "default_height")]
        height: f32,
        /// Edge sharpness (per cell).
        #[serde(default = "default_steepness")]
        steepness: f32,
    },
}

fn default_radius() -> f32 {
    128.0
}

fn default_height() -> f32 {
    100.0
}

fn default_steepness() -> f32 {
    0.1
}

impl Default for InitialTerrain {
    fn default() -> Self {
        Self::Cone {
            radius: default_radius(),
            height: default_height(),
        }
    }
}

impl InitialTerrain {
    /// Check shape parameters.
    pub fn validate(&self) -> TerraResult<()> {
        let finite_positive = |name: &str, v: f32| -> TerraResult<()> {
            if !v.is_finite() || v <= 0.0 {
                return Err(TerraError::configuration(format!(
                    "step0.{name} must be finite and > 0 (got {v})"
                )));
            }
            Ok(())
        };
        match *self {
            Self::Flat { elevation } => {
                if !elevation.is_finite() {
                    return Err(TerraError::configuration(
                        "step0.elevation must be finite",
                    ));
                }
            }
            Self::Cone { radius, height } => {
                finite_positive("radius", radius)?;
                finite_positive("height", height)?;
            }
            Self::SemiSphere { radius } => finite_positive("radius", radius)?,
            Self::Sigmoid {
                radius,
                height,
                steepness,
            } => {
                finite_positive("radius", radius)?;
                finite_positive("height", height)?;
                finite_positive("steepness", steepness)?;
            }
        }
        Ok(())
    }
}

impl TerrainProvider for InitialTerrain {
    fn initial_terrain(&self, dims: Dims) -> TerraResult<Heightmap> {
        self.validate()?;
        let cx = (dims.width as f32 - 1.0) * 0.5;
        let cy = (dims.height as f32 - 1.0) * 0.5;
        let mut hm = Heightmap::new(dims);
        for y in 0..dims.height {
            for x in 0..dims.width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let d2 = dx * dx + dy * dy;
                let z = match *self {
                    Self::Flat { elevation } => elevation,
                    Self::Cone { radius, height } => {
                        let d = d2.sqrt();
                        if d <= radius {
                            height * (1.0 - d / radius)
                        } else {
                            0.0
                        }
                    }
                    Self::SemiSphere { radius } => {
                        let r2 = radius * radius;
                        if d2 <= r2 { (r2 - d2).sqrt() } else { 0.0 }
                    }
                    Self::Sigmoid {
                        radius,
                        height,
                        steepness,
                    } => height / (1.0 + (steepness * (d2.sqrt() - radius)).exp()),
                };
                hm.set(x, y, z);
            }
        }
        Ok(hm)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/terrain/generators.rs"]
mod tests;
