use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        TerraError::configuration("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        TerraError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        TerraError::ConcurrentRun(SessionId(3))
            .to_string()
            .contains("session-3")
    );
}

#[test]
fn coverage_gap_lists_frames_compactly() {
    let err = TerraError::CoverageGap {
        uncovered_frames: [6, 7, 8, 9, 10].into_iter().map(FrameIndex).collect(),
    };
    let msg = err.to_string();
    assert!(msg.contains("5 uncovered frame(s)"), "{msg}");
    assert!(msg.ends_with("6-10"), "{msg}");
}

#[test]
fn step_execution_keeps_source() {
    let err = TerraError::StepExecution {
        job_id: JobId::new("rain"),
        frame: FrameIndex(5),
        source: StepError::NonFinite {
            index: 3,
            value: f32::NAN,
        },
    };
    let msg = err.to_string();
    assert!(msg.contains("'rain'"));
    assert!(msg.contains("frame 5"));
    let source = std::error::Error::source(&err).expect("source");
    assert!(source.to_string().contains("non-finite"));
}

#[test]
fn pre_execution_classification() {
    assert!(TerraError::configuration("x").is_pre_execution());
    assert!(
        TerraError::CoverageGap {
            uncovered_frames: vec![FrameIndex(1)]
        }
        .is_pre_execution()
    );
    assert!(!TerraError::NotCached(FrameIndex(2)).is_pre_execution());
    assert!(
        !TerraError::StepExecution {
            job_id: JobId::new("a"),
            frame: FrameIndex(1),
            source: StepError::kernel("boom"),
        }
        .is_pre_execution()
    );
}

#[test]
fn contiguous_ranges_collapse_runs() {
    let frames: Vec<FrameIndex> = [2, 6, 7, 8, 11].into_iter().map(FrameIndex).collect();
    let ranges = contiguous_ranges(&frames);
    assert_eq!(ranges.len(), 3);
    assert_eq!(format_frame_list(&frames), "2, 6-8, 11");
    assert_eq!(format_frame_list(&[]), "");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = TerraError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
