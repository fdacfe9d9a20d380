use shared::domain::FingerId;

const VISION_JOINT_PREFIX: &str = "VNHumanHandPoseObservationJointName(_rawValue: ";

/// Every fingertip key spelling seen from clients, old and new.
const FINGER_KEYS: &[(&str, FingerId)] = &[
    ("thumbTip", FingerId::Thumb),
    ("VNHLKTTIP", FingerId::Thumb),
    ("thumb", FingerId::Thumb),
    ("indexTip", FingerId::Index),
    ("VNHLKITIP", FingerId::Index),
    ("index", FingerId::Index),
    ("middleTip", FingerId::Middle),
    ("VNHLKMTIP", FingerId::Middle),
    ("middle", FingerId::Middle),
    ("ringTip", FingerId::Ring),
    ("VNHLKRTIP", FingerId::Ring),
    ("ring", FingerId::Ring),
    ("pinkyTip", FingerId::Pinky),
    ("VNHLKPTIP", FingerId::Pinky),
    ("pinky", FingerId::Pinky),
];

/// Maps an external joint key to a fingertip, if it names one.
///
/// Accepts the bare names above and the `Debug`-style wrapper the iOS
/// Vision framework produces, e.g.
/// `VNHumanHandPoseObservationJointName(_rawValue: VNHLKTTIP)`.
pub fn resolve_finger_key(key: &str) -> Option<FingerId> {
    let key = key.trim();
    let key = key
        .strip_prefix(VISION_JOINT_PREFIX)
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(key);

    FINGER_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, finger)| *finger)
}
