use std::time::Duration;

use super::*;
use crate::foundation::core::Dims;
use crate::job::config::StepKind;

struct Sleepy(Duration);

impl StepExecutor for Sleepy {
    fn apply(&self, input: &Heightmap, _config: &StepConfig) -> Result<Heightmap, StepError> {
        std::thread::sleep(self.0);
        Ok(input.clone())
    }
}

fn grid() -> Heightmap {
    Heightmap::filled(Dims::new(3, 3).unwrap(), 1.0)
}

#[test]
fn budget_overrun_is_a_timeout() {
    let exec = BudgetedExecutor::new(Sleepy(Duration::from_millis(30)), Duration::from_millis(1));
    let err = exec
        .apply(&grid(), &StepConfig::default_for(StepKind::Thermal))
        .unwrap_err();
    assert!(matches!(err, StepError::Timeout { .. }));
}

#[test]
fn budget_within_limit_passes_output_through() {
    let exec = BudgetedExecutor::new(Sleepy(Duration::ZERO), Duration::from_secs(10));
    assert_eq!(exec.budget(), Duration::from_secs(10));
    let out = exec
        .apply(&grid(), &StepConfig::default_for(StepKind::Thermal))
        .unwrap();
    assert_eq!(out, grid());
}

#[test]
fn check_output_rejects_shape_change_and_non_finite() {
    let input = grid();
    let wider = Heightmap::filled(Dims::new(4, 3).unwrap(), 1.0);
    assert!(matches!(
        check_output(&input, &wider),
        Err(StepError::DimensionMismatch { .. })
    ));
    let mut nan = grid();
    nan.set(1, 1, f32::NAN);
    assert!(matches!(
        check_output(&input, &nan),
        Err(StepError::NonFinite { index: 4, .. })
    ));
    assert!(check_output(&input, &grid()).is_ok());
}

#[test]
fn arc_and_box_forward() {
    let arc: Arc<dyn StepExecutor> = Arc::new(Sleepy(Duration::ZERO));
    let boxed: Box<dyn StepExecutor> = Box::new(Sleepy(Duration::ZERO));
    let cfg = StepConfig::default_for(StepKind::Hydraulic);
    assert!(arc.apply(&grid(), &cfg).is_ok());
    assert!(boxed.apply(&grid(), &cfg).is_ok());
}
