use super::*;

#[test]
fn defaults_match_documented_values() {
    let h = HydraulicConfig::default();
    assert_eq!(h.num_particles, 50_000);
    assert_eq!(h.max_lifetime, 30);
    assert_eq!(h.sediment_capacity, 4.0);
    let t = ThermalConfig::default();
    assert_eq!(t.talus_angle, 40.0);
    assert_eq!(t.iterations, 100);
    assert!(StepConfig::default_for(StepKind::Hydraulic).validate().is_ok());
    assert!(StepConfig::default_for(StepKind::Thermal).validate().is_ok());
}

#[test]
fn from_json_fills_missing_fields() {
    let cfg = StepConfig::from_json(
        StepKind::Thermal,
        serde_json::json!({ "talusAngle": 30.0 }),
    )
    .unwrap();
    let StepConfig::Thermal(t) = cfg else {
        panic!("expected thermal config");
    };
    assert_eq!(t.talus_angle, 30.0);
    assert_eq!(t.transfer_rate, 0.5);

    let cfg = StepConfig::from_json(StepKind::Hydraulic, serde_json::Value::Null).unwrap();
    assert_eq!(cfg, StepConfig::default_for(StepKind::Hydraulic));
}

#[test]
fn from_json_rejects_unknown_fields() {
    let err = StepConfig::from_json(StepKind::Thermal, serde_json::json!({ "talus": 30 }))
        .unwrap_err();
    assert!(matches!(err, TerraError::Serde(_)));
    assert!(err.to_string().contains("thermal config"));
}

#[test]
fn validate_reports_every_violation() {
    let cfg = StepConfig::Hydraulic(HydraulicConfig {
        num_particles: 0,
        erosion_rate: 1.5,
        gravity: f64::NAN,
        ..HydraulicConfig::default()
    });
    let msg = cfg.validate().unwrap_err().to_string();
    assert!(msg.starts_with("configuration error: hydraulic config:"), "{msg}");
    assert!(msg.contains("numParticles must be >= 1"));
    assert!(msg.contains("erosionRate must be in [0, 1]"));
    assert!(msg.contains("gravity must be finite"));
}

#[test]
fn thermal_bounds() {
    let steep = StepConfig::Thermal(ThermalConfig {
        talus_angle: 91.0,
        ..ThermalConfig::default()
    });
    assert!(steep.validate().is_err());
    let edge = StepConfig::Thermal(ThermalConfig {
        talus_angle: 90.0,
        transfer_rate: 0.0,
        iterations: 1,
    });
    assert!(edge.validate().is_ok());
}

#[test]
fn step_kind_names() {
    assert_eq!(StepKind::Hydraulic.to_string(), "hydraulic");
    let k: StepKind = serde_json::from_str("\"thermal_erosion\"").unwrap();
    assert_eq!(k, StepKind::Thermal);
    assert_eq!(
        StepConfig::default_for(StepKind::Thermal).kind(),
        StepKind::Thermal
    );
}
