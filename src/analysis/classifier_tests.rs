use super::*;
use crate::signal::BandPowers;

/// Helper to create an AggregateRecord with the bands the rules look at
fn create_aggregate(alpha: f32, beta: f32, quality: f32) -> AggregateRecord {
    AggregateRecord::new(BandPowers::new(0.0, 0.0, alpha, beta, 0.0), quality)
}

fn create_classifier() -> StateClassifier {
    StateClassifier::default()
}

#[test]
fn test_classify_focus() {
    let classifier = create_classifier();

    // beta = 0.20 > 0.18 AND alpha = 0.05 < 0.12 = FOCUS
    let result = classifier.classify(&create_aggregate(0.05, 0.20, 1.0));

    assert_eq!(
        result.state,
        BrainState::Focus,
        "Expected Focus for high beta and low alpha"
    );
    assert_eq!(result.reason, "High beta + low alpha");
    assert!((result.confidence - 0.8).abs() < 1e-6);
    assert!(result.safe);
}

#[test]
fn test_classify_relax() {
    let classifier = create_classifier();

    let result = classifier.classify(&create_aggregate(0.20, 0.10, 1.0));

    assert_eq!(result.state, BrainState::Relax);
    assert_eq!(result.reason, "High alpha");
    assert!((result.confidence - 0.75).abs() < 1e-6);
}

#[test]
fn test_classify_fatigue() {
    let classifier = create_classifier();

    let result = classifier.classify(&create_aggregate(0.03, 0.03, 1.0));

    assert_eq!(
        result.state,
        BrainState::Fatigue,
        "Expected Fatigue for low alpha ({}) and low beta ({})",
        0.03,
        0.03
    );
    assert_eq!(result.reason, "Low overall activity");
    assert!((result.confidence - 0.85).abs() < 1e-6);
}

#[test]
fn test_classify_default_when_no_rule_matches() {
    let classifier = create_classifier();

    let result = classifier.classify(&create_aggregate(0.10, 0.10, 1.0));

    assert_eq!(result.state, BrainState::Relax);
    assert_eq!(result.reason, "", "Default rule carries an empty reason");
    assert!((result.confidence - 0.5).abs() < 1e-6);
}

#[test]
fn test_gamma_does_not_affect_rules() {
    let classifier = create_classifier();

    let quiet = AggregateRecord::new(BandPowers::new(0.0, 0.0, 0.05, 0.20, 0.0), 1.0);
    let noisy = AggregateRecord::new(BandPowers::new(0.9, 0.9, 0.05, 0.20, 0.9), 1.0);

    assert_eq!(classifier.classify(&quiet), classifier.classify(&noisy));
}

#[test]
fn test_rule_priority_focus_before_fatigue() {
    // With a fatigue floor raised above both bands, rule 1 still wins when it matches
    let classifier = StateClassifier::new(ClassifierThresholds {
        low_activity: 0.5,
        ..ClassifierThresholds::default()
    });

    let result = classifier.classify(&create_aggregate(0.05, 0.20, 1.0));
    assert_eq!(result.state, BrainState::Focus);
}

#[test]
fn test_threshold_boundaries_are_strict() {
    let classifier = create_classifier();

    // beta exactly at 0.18 is not "> 0.18"
    let result = classifier.classify(&create_aggregate(0.05, 0.18, 1.0));
    assert_ne!(result.state, BrainState::Focus);

    // alpha exactly at 0.12 is not "> 0.12" nor "< 0.12"
    let result = classifier.classify(&create_aggregate(0.12, 0.10, 1.0));
    assert_eq!(result.reason, "");

    // alpha and beta exactly at 0.06 are not "< 0.06"
    let result = classifier.classify(&create_aggregate(0.06, 0.06, 1.0));
    assert_ne!(result.state, BrainState::Fatigue);
}

#[test]
fn test_confidence_discounted_by_quality() {
    let classifier = create_classifier();

    let result = classifier.classify(&create_aggregate(0.05, 0.25, 0.9));
    assert!(
        (result.confidence - 0.72).abs() < 1e-5,
        "Expected 0.8 * 0.9, got {}",
        result.confidence
    );
    assert!(result.safe);
}

#[test]
fn test_zero_quality_yields_zero_confidence() {
    let classifier = create_classifier();

    for agg in [
        create_aggregate(0.05, 0.20, 0.0),
        create_aggregate(0.20, 0.10, 0.0),
        create_aggregate(0.03, 0.03, 0.0),
        create_aggregate(0.10, 0.10, 0.0),
    ] {
        let result = classifier.classify(&agg);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.safe, "Zero confidence must not be flagged safe");
    }
}

#[test]
fn test_safe_flag_threshold() {
    let classifier = create_classifier();

    // Default rule: 0.5 * 0.5 = 0.25, which is not > 0.25
    let result = classifier.classify(&create_aggregate(0.10, 0.10, 0.5));
    assert!(!result.safe);

    // 0.5 * 0.52 = 0.26 > 0.25
    let result = classifier.classify(&create_aggregate(0.10, 0.10, 0.52));
    assert!(result.safe);
}

#[test]
fn test_classify_is_deterministic() {
    let classifier = create_classifier();
    let agg = create_aggregate(0.07, 0.22, 0.83);

    let first = classifier.classify(&agg);
    let second = classifier.classify(&agg);
    assert_eq!(first, second);
}

#[test]
fn test_custom_thresholds() {
    let classifier = StateClassifier::new(ClassifierThresholds {
        beta_high: 0.3,
        alpha_high: 0.2,
        low_activity: 0.01,
        min_safe_confidence: 0.9,
    });

    // Would be Focus with defaults; beta 0.25 is below the raised threshold
    let result = classifier.classify(&create_aggregate(0.05, 0.25, 1.0));
    assert_eq!(result.state, BrainState::Relax);
    assert_eq!(result.reason, "");
    assert!(!result.safe, "0.5 is below the raised safe threshold");
}

#[test]
fn test_set_thresholds() {
    let mut classifier = create_classifier();
    let agg = create_aggregate(0.05, 0.20, 1.0);
    assert_eq!(classifier.classify(&agg).state, BrainState::Focus);

    classifier.set_thresholds(ClassifierThresholds {
        beta_high: 0.5,
        ..ClassifierThresholds::default()
    });
    assert_ne!(classifier.classify(&agg).state, BrainState::Focus);
    assert_eq!(classifier.thresholds().beta_high, 0.5);
}

#[test]
fn test_result_serializes_state_label() {
    let classifier = create_classifier();
    let result = classifier.classify(&create_aggregate(0.03, 0.03, 1.0));
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["state"], "Fatigue");
    assert_eq!(json["reason"], "Low overall activity");
}
