use std::fmt;

use crate::foundation::error::{TerraError, TerraResult};

/// Closed set of step kinds a job can apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Particle-based hydraulic erosion.
    #[serde(alias = "hydraulic_erosion")]
    Hydraulic,
    /// Talus-angle thermal erosion.
    #[serde(alias = "thermal_erosion")]
    Thermal,
}

impl StepKind {
    /// Stable lowercase name, as used in pipeline documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hydraulic => "hydraulic",
            Self::Thermal => "thermal",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step-specific parameters. The variant fixes the job's [`StepKind`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "lowercase")]
pub enum StepConfig {
    /// Hydraulic erosion parameters.
    Hydraulic(HydraulicConfig),
    /// Thermal erosion parameters.
    Thermal(ThermalConfig),
}

impl StepConfig {
    /// Kind of step this configuration drives.
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Hydraulic(_) => StepKind::Hydraulic,
            Self::Thermal(_) => StepKind::Thermal,
        }
    }

    /// Default parameters for `kind`.
    pub fn default_for(kind: StepKind) -> Self {
        match kind {
            StepKind::Hydraulic => Self::Hydraulic(HydraulicConfig::default()),
            StepKind::Thermal => Self::Thermal(ThermalConfig::default()),
        }
    }

    /// Decode the parameter object of a step of `kind`; absent fields take their defaults.
    pub fn from_json(kind: StepKind, params: serde_json::Value) -> TerraResult<Self> {
        let params = if params.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            params
        };
        let cfg = match kind {
            StepKind::Hydraulic => Self::Hydraulic(
                serde_json::from_value(params)
                    .map_err(|e| TerraError::serde(format!("hydraulic config: {e}")))?,
            ),
            StepKind::Thermal => Self::Thermal(
                serde_json::from_value(params)
                    .map_err(|e| TerraError::serde(format!("thermal config: {e}")))?,
            ),
        };
        Ok(cfg)
    }

    /// Check every field against its declared bounds, reporting all violations at once.
    pub fn validate(&self) -> TerraResult<()> {
        let mut b = Bounds::new(self.kind());
        match self {
            Self::Hydraulic(c) => c.check(&mut b),
            Self::Thermal(c) => c.check(&mut b),
        }
        b.finish()
    }
}

/// Hydraulic erosion parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HydraulicConfig {
    /// Droplets simulated per application (>= 1).
    pub num_particles: u32,
    /// Fraction of free capacity eroded per step, `[0, 1]`.
    pub erosion_rate: f64,
    /// Fraction of surplus sediment deposited per step, `[0, 1]`.
    pub deposition_rate: f64,
    /// Water lost per step, `[0, 1]`.
    pub evaporation_rate: f64,
    /// Sediment capacity multiplier (> 0).
    pub sediment_capacity: f64,
    /// Floor on sediment capacity (>= 0).
    pub min_slope: f64,
    /// Direction retention, `[0, 1]`.
    pub inertia: f64,
    /// Gravity acceleration (> 0).
    pub gravity: f64,
    /// Maximum droplet lifetime in steps (>= 1).
    pub max_lifetime: u32,
    /// Initial droplet water volume (> 0).
    pub initial_water: f64,
    /// Initial droplet speed (>= 0).
    pub initial_speed: f64,
    /// Seed for droplet spawn positions.
    pub seed: u64,
}

impl Default for HydraulicConfig {
    fn default() -> Self {
        Self {
            num_particles: 50_000,
            erosion_rate: 0.3,
            deposition_rate: 0.3,
            evaporation_rate: 0.01,
            sediment_capacity: 4.0,
            min_slope: 0.01,
            inertia: 0.05,
            gravity: 4.0,
            max_lifetime: 30,
            initial_water: 1.0,
            initial_speed: 1.0,
            seed: 0,
        }
    }
}

impl HydraulicConfig {
    fn check(&self, b: &mut Bounds) {
        b.at_least_u32("numParticles", self.num_particles, 1);
        b.unit("erosionRate", self.erosion_rate);
        b.unit("depositionRate", self.deposition_rate);
        b.unit("evaporationRate", self.evaporation_rate);
        b.positive("sedimentCapacity", self.sediment_capacity);
        b.non_negative("minSlope", self.min_slope);
        b.unit("inertia", self.inertia);
        b.positive("gravity", self.gravity);
        b.at_least_u32("maxLifetime", self.max_lifetime, 1);
        b.positive("initialWater", self.initial_water);
        b.non_negative("initialSpeed", self.initial_speed);
    }
}

/// Thermal erosion parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ThermalConfig {
    /// Angle of repose in degrees, `[0, 90]`.
    pub talus_angle: f64,
    /// Fraction of excess material moved per iteration, `[0, 1]`.
    pub transfer_rate: f64,
    /// Relaxation iterations per application (>= 1).
    pub iterations: u32,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            talus_angle: 40.0,
            transfer_rate: 0.5,
            iterations: 100,
        }
    }
}

impl ThermalConfig {
    fn check(&self, b: &mut Bounds) {
        b.within("talusAngle", self.talus_angle, 0.0, 90.0);
        b.unit("transferRate", self.transfer_rate);
        b.at_least_u32("iterations", self.iterations, 1);
    }
}

/// Collects bound violations for one step kind.
struct Bounds {
    kind: StepKind,
    errors: Vec<String>,
}

impl Bounds {
    fn new(kind: StepKind) -> Self {
        Self {
            kind,
            errors: Vec::new(),
        }
    }

    fn finite(&mut self, name: &str, v: f64) -> bool {
        if v.is_finite() {
            return true;
        }
        self.errors.push(format!("{name} must be finite (got {v})"));
        false
    }

    fn within(&mut self, name: &str, v: f64, lo: f64, hi: f64) {
        if self.finite(name, v) && !(lo..=hi).contains(&v) {
            self.errors
                .push(format!("{name} must be in [{lo}, {hi}] (got {v})"));
        }
    }

    fn unit(&mut self, name: &str, v: f64) {
        self.within(name, v, 0.0, 1.0);
    }

    fn positive(&mut self, name: &str, v: f64) {
        if self.finite(name, v) && v <= 0.0 {
            self.errors.push(format!("{name} must be > 0 (got {v})"));
        }
    }

    fn non_negative(&mut self, name: &str, v: f64) {
        if self.finite(name, v) && v < 0.0 {
            self.errors.push(format!("{name} must be >= 0 (got {v})"));
        }
    }

    fn at_least_u32(&mut self, name: &str, v: u32, min: u32) {
        if v < min {
            self.errors.push(format!("{name} must be >= {min} (got {v})"));
        }
    }

    fn finish(self) -> TerraResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(TerraError::configuration(format!(
            "{} config: {}",
            self.kind,
            self.errors.join("; ")
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/config.rs"]
mod tests;
