use serde_json::json;

use super::*;
use crate::classify;
use shared::domain::GestureLabel;

#[test]
fn resolves_every_known_key_spelling() {
    assert_eq!(resolve_finger_key("thumbTip"), Some(FingerId::Thumb));
    assert_eq!(resolve_finger_key("VNHLKITIP"), Some(FingerId::Index));
    assert_eq!(
        resolve_finger_key("VNHumanHandPoseObservationJointName(_rawValue: VNHLKMTIP)"),
        Some(FingerId::Middle)
    );
    assert_eq!(resolve_finger_key("ring"), Some(FingerId::Ring));
    assert_eq!(resolve_finger_key(" pinkyTip "), Some(FingerId::Pinky));
    assert_eq!(resolve_finger_key("indexDIP"), None);
    assert_eq!(resolve_finger_key("wrist"), None);
}

#[test]
fn builds_sample_from_mixed_key_schemes() {
    let payload = json!({
        "VNHumanHandPoseObservationJointName(_rawValue: VNHLKTTIP)": {"x": 0.2, "y": 0.9, "confidence": 0.8},
        "indexTip": {"x": 0.5, "y": 0.3, "confidence": 0.95},
        "VNHLKMTIP": {"x": 0.5, "y": 0.3, "confidence": 0.95},
        "ringTip": {"x": 0.5, "y": 0.9, "confidence": 0.85},
        "pinky": {"x": 0.5, "y": 0.9, "confidence": 0.85},
        "wrist": {"x": 0.5, "y": 0.99, "confidence": 1.0}
    });

    let sample = PoseSample::from_json(&payload);
    assert!(sample.is_complete());
    assert_eq!(sample.len(), 5);
    assert_eq!(classify(&sample).label, GestureLabel::Scissors);
}

#[test]
fn missing_fields_take_defaults() {
    let payload = json!({ "thumbTip": {"confidence": 0.7} });
    let sample = PoseSample::from_json(&payload);
    let thumb = sample.get(FingerId::Thumb).expect("thumb");
    assert_eq!(*thumb, Observation::new(0.5, 0.5, 0.7));
    assert!(!sample.is_complete());
}

#[test]
fn empty_observations_count_as_missing() {
    let payload = json!({
        "thumbTip": {},
        "indexTip": {},
        "middleTip": {},
        "ringTip": {},
        "pinkyTip": {}
    });
    let sample = PoseSample::from_json(&payload);
    assert!(sample.is_empty());
    assert_eq!(classify(&sample), ClassificationResult::unknown());
}

#[test]
fn later_key_for_same_finger_wins() {
    let wrapped = "VNHumanHandPoseObservationJointName(_rawValue: VNHLKTTIP)";

    let mut plain_last = Map::new();
    plain_last.insert(wrapped.to_string(), json!({"x": 0.1, "y": 0.1, "confidence": 0.9}));
    plain_last.insert("thumbTip".to_string(), json!({"x": 0.9, "y": 0.9, "confidence": 0.9}));
    let sample = PoseSample::from_json_map(&plain_last);
    assert_eq!(sample.get(FingerId::Thumb), Some(&Observation::new(0.9, 0.9, 0.9)));

    let mut wrapped_last = Map::new();
    wrapped_last.insert("thumbTip".to_string(), json!({"x": 0.9, "y": 0.9, "confidence": 0.9}));
    wrapped_last.insert(wrapped.to_string(), json!({"x": 0.1, "y": 0.1, "confidence": 0.9}));
    let sample = PoseSample::from_json_map(&wrapped_last);
    assert_eq!(sample.get(FingerId::Thumb), Some(&Observation::new(0.1, 0.1, 0.9)));
}

#[test]
fn non_object_values_are_treated_as_absent() {
    let payload = json!({
        "thumbTip": null,
        "indexTip": [0.5, 0.2],
        "middleTip": {"x": "left"}
    });
    assert!(PoseSample::from_json(&payload).is_empty());
    assert!(PoseSample::from_json(&json!("not a map")).is_empty());
}
