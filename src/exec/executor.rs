use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::foundation::error::StepError;
use crate::job::config::StepConfig;
use crate::terrain::heightmap::Heightmap;

/// Applies one step to a heightmap.
///
/// Contract: pure from the engine's point of view. Same input and config give the same output,
/// and the input is never mutated; the result is a new grid of the same dimensions. The step
/// kind is `config.kind()`.
pub trait StepExecutor: Send + Sync {
    /// Apply `config` to `input`.
    fn apply(&self, input: &Heightmap, config: &StepConfig) -> Result<Heightmap, StepError>;
}

impl<T: StepExecutor + ?Sized> StepExecutor for Arc<T> {
    fn apply(&self, input: &Heightmap, config: &StepConfig) -> Result<Heightmap, StepError> {
        (**self).apply(input, config)
    }
}

impl<T: StepExecutor + ?Sized> StepExecutor for Box<T> {
    fn apply(&self, input: &Heightmap, config: &StepConfig) -> Result<Heightmap, StepError> {
        (**self).apply(input, config)
    }
}

/// Wraps an executor with a wall-clock budget per call.
///
/// Kernels are not preempted; an overrun is detected when the call returns and reported as
/// [`StepError::Timeout`], which the engine treats like any other step failure.
#[derive(Clone, Debug)]
pub struct BudgetedExecutor<E> {
    inner: E,
    budget: Duration,
}

impl<E: StepExecutor> BudgetedExecutor<E> {
    /// Limit every call to `budget`.
    pub fn new(inner: E, budget: Duration) -> Self {
        Self { inner, budget }
    }

    /// Configured budget.
    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl<E: StepExecutor> StepExecutor for BudgetedExecutor<E> {
    fn apply(&self, input: &Heightmap, config: &StepConfig) -> Result<Heightmap, StepError> {
        let t0 = Instant::now();
        let out = self.inner.apply(input, config)?;
        let elapsed = t0.elapsed();
        if elapsed > self.budget {
            return Err(StepError::Timeout {
                elapsed,
                budget: self.budget,
            });
        }
        Ok(out)
    }
}

/// Check a step result before the engine accepts it.
pub(crate) fn check_output(input: &Heightmap, output: &Heightmap) -> Result<(), StepError> {
    if output.dims() != input.dims() {
        return Err(StepError::DimensionMismatch {
            expected: input.dims(),
            actual: output.dims(),
        });
    }
    if let Some((index, value)) = output.first_non_finite() {
        return Err(StepError::NonFinite { index, value });
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/exec/executor.rs"]
mod tests;
