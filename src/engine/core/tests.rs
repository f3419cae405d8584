use super::*;
use std::time::Duration;

use crate::analysis::BrainState;
use crate::safety::SafetyReason;
use crate::signal::BandPowers;
use crate::source::{ReplaySource, SourceProfile, SyntheticSource};

fn test_engine() -> EngineHandle {
    EngineHandle::with_telemetry(AppConfig::default(), Arc::new(TelemetryHub::default()))
}

fn focus_sample(ts: u64) -> Sample {
    Sample::new(ts, BandPowers::new(0.1, 0.1, 0.05, 0.25, 0.1), 0.9)
}

#[test]
fn test_ingest_reaches_focus() {
    let engine = test_engine();
    let mut last = None;
    for ts in 0..64 {
        last = Some(engine.ingest(focus_sample(ts)).unwrap());
    }
    let output = last.unwrap();
    assert_eq!(output.classification.state, BrainState::Focus);
    assert!(engine.actuation_permitted().unwrap());
}

#[test]
fn test_ingest_rejects_invalid_sample() {
    let engine = test_engine();
    let err = engine
        .ingest(Sample::new(0, BandPowers::default(), -0.5))
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidSample(_)));
    assert_eq!(engine.last_verdict().unwrap(), None);
}

#[test]
fn test_emergency_round_trip() {
    let engine = test_engine();
    engine.ingest(focus_sample(0)).unwrap();

    let verdict = engine.set_emergency(true).unwrap();
    assert_eq!(verdict.reason, SafetyReason::Disabled);
    assert!(!engine.actuation_permitted().unwrap());

    let verdict = engine.reset_emergency().unwrap();
    assert!(verdict.safe);
    assert!(engine.actuation_permitted().unwrap());
    assert_eq!(engine.telemetry().unsafe_count(SafetyReason::Disabled), 1);
}

#[test]
fn test_headband_disconnect() {
    let engine = test_engine();
    let verdict = engine.set_headband_connected(false).unwrap();
    assert!(!verdict.safe);
    assert_eq!(engine.last_verdict().unwrap(), Some(verdict));
}

#[test]
fn test_apply_patch_updates_config_and_pipeline() {
    let engine = test_engine();
    engine
        .apply_patch(ParamPatch {
            quality_threshold: Some(0.95),
            ..ParamPatch::default()
        })
        .unwrap();
    assert!((engine.config_snapshot().safety.quality_threshold - 0.95).abs() < 1e-6);

    let output = engine.ingest(focus_sample(0)).unwrap();
    assert_eq!(
        output.final_verdict().unwrap().reason,
        SafetyReason::PoorSignal
    );
}

#[test]
fn test_apply_patch_clamps_values() {
    let engine = test_engine();
    engine
        .apply_patch(ParamPatch {
            beta_high: Some(4.0),
            ..ParamPatch::default()
        })
        .unwrap();
    assert_eq!(engine.config_snapshot().classifier.beta_high, 1.0);
}

#[test]
fn test_empty_patch_is_noop() {
    let engine = test_engine();
    let before = engine.config_snapshot();
    engine.apply_patch(ParamPatch::default()).unwrap();
    assert_eq!(engine.config_snapshot(), before);
}

#[test]
fn test_param_patch_from_json() {
    let patch: ParamPatch =
        serde_json::from_str(r#"{"alpha_high":0.2,"verdict_mode":"merged"}"#).unwrap();
    assert_eq!(patch.alpha_high, Some(0.2));
    assert_eq!(patch.verdict_mode, Some(VerdictMode::Merged));
    assert!(patch.beta_high.is_none());
}

#[test]
fn test_stop_without_start_fails() {
    let engine = test_engine();
    assert_eq!(engine.stop_stream().unwrap_err(), PipelineError::NotRunning);
}

#[test]
fn test_double_start_fails() {
    let engine = test_engine();
    let source = SyntheticSource::with_seed(SourceProfile::Demo, 1).with_rate(200);
    engine.start_stream(Box::new(source), Pacing::RealTime).unwrap();

    let again = SyntheticSource::with_seed(SourceProfile::Demo, 2);
    assert_eq!(
        engine
            .start_stream(Box::new(again), Pacing::RealTime)
            .unwrap_err(),
        PipelineError::AlreadyRunning
    );
    assert!(engine.is_streaming());
    engine.stop_stream().unwrap();
    assert!(!engine.is_streaming());
}

#[test]
fn test_unpaced_replay_is_fully_processed() {
    let engine = test_engine();
    let samples: Vec<Sample> = (0..100).map(focus_sample).collect();
    engine
        .start_stream(Box::new(ReplaySource::from_samples(samples)), Pacing::Unpaced)
        .unwrap();

    for _ in 0..500 {
        if engine.source_finished() {
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }

    let summary = engine.stop_stream().unwrap();
    assert!(summary.source_exhausted);
    assert_eq!(summary.pushed, 100);
    assert_eq!(summary.processed, 100);
    assert_eq!(summary.dropped, 0);
    assert!(engine.actuation_permitted().unwrap());
}

#[test]
fn test_verdict_stream_without_runtime() {
    let engine = test_engine();
    let mut rx = engine.verdict_stream();
    engine.set_emergency(true).unwrap();

    let verdict = rx.blocking_recv().unwrap();
    assert_eq!(verdict.reason, SafetyReason::Disabled);
}

#[test]
fn test_non_finite_patch_keeps_gate_closed() {
    let engine = test_engine();
    engine
        .apply_patch(ParamPatch {
            quality_threshold: Some(f32::NAN),
            beta_high: Some(f32::INFINITY),
            ..ParamPatch::default()
        })
        .unwrap();

    let config = engine.config_snapshot();
    assert_eq!(config.safety.quality_threshold, 0.45);
    assert_eq!(config.classifier.beta_high, 0.18);

    let output = engine
        .ingest(Sample::new(0, BandPowers::new(0.1, 0.1, 0.05, 0.25, 0.1), 0.0))
        .unwrap();
    assert_eq!(
        output.final_verdict().unwrap().reason,
        SafetyReason::PoorSignal
    );
    assert!(!engine.actuation_permitted().unwrap());
}

#[test]
fn test_classification_stream_without_runtime() {
    let engine = test_engine();
    let mut rx = engine.classification_stream();
    for ts in 0..4 {
        engine.ingest(focus_sample(ts)).unwrap();
    }

    for _ in 0..4 {
        let result = rx.blocking_recv().unwrap();
        assert_eq!(result.state, BrainState::Focus);
    }
}
