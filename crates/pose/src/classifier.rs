use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::domain::{FingerId, GestureLabel};
use tracing::debug;

use crate::{Observation, PoseSample};

// Calibration constants. These were tuned against a single camera setup and
// are kept as-is for compatibility with existing clients.

/// Observations below this confidence count as bent, not missing.
pub const QUALITY_THRESHOLD: f64 = 0.4;
const THUMB_MAX_Y: f64 = 0.6;
const THUMB_MIN_X: f64 = 0.3;
const PINKY_MAX_Y: f64 = 0.6;
const LONG_FINGER_MAX_Y: f64 = 0.45;

const ROCK_CLOSED: f64 = 0.9;
const ROCK_NOISY: f64 = 0.6;
const SCISSORS_INDEX_ONLY: f64 = 0.7;
const SCISSORS_INDEX_MIDDLE: f64 = 0.95;
const SCISSORS_THUMB_INDEX: f64 = 0.9;
const SCISSORS_OTHER_PAIR: f64 = 0.85;
const PAPER_OPEN: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: GestureLabel,
    pub confidence: f64,
}

impl ClassificationResult {
    pub fn new(label: GestureLabel, confidence: f64) -> Self {
        Self { label, confidence }
    }

    /// Result for samples missing one or more fingertips.
    pub fn unknown() -> Self {
        Self::new(GestureLabel::Unknown, 0.0)
    }

    pub fn is_unknown(&self) -> bool {
        self.label == GestureLabel::Unknown
    }
}

/// Extended/bent verdict per finger, in canonical order.
pub type FingerStates = BTreeMap<FingerId, bool>;

fn is_extended(finger: FingerId, observation: &Observation) -> bool {
    if observation.confidence < QUALITY_THRESHOLD {
        return false;
    }
    match finger {
        FingerId::Thumb => observation.y < THUMB_MAX_Y && observation.x > THUMB_MIN_X,
        FingerId::Pinky => observation.y < PINKY_MAX_Y,
        FingerId::Index | FingerId::Middle | FingerId::Ring => observation.y < LONG_FINGER_MAX_Y,
    }
}

/// Per-finger extension verdicts, or `None` if the sample is incomplete.
pub fn extension_states(sample: &PoseSample) -> Option<FingerStates> {
    let mut states = FingerStates::new();
    for finger in FingerId::ALL {
        let observation = sample.get(finger)?;
        let extended = is_extended(finger, observation);
        debug!(
            %finger,
            x = observation.x,
            y = observation.y,
            confidence = observation.confidence,
            extended,
            "fingertip evaluated"
        );
        states.insert(finger, extended);
    }
    Some(states)
}

/// Classifies a fingertip sample into rock, paper or scissors.
///
/// Never fails: an incomplete sample yields [`ClassificationResult::unknown`].
pub fn classify(sample: &PoseSample) -> ClassificationResult {
    let Some(states) = extension_states(sample) else {
        debug!(fingers = sample.len(), "incomplete pose sample");
        return ClassificationResult::unknown();
    };

    let extended = |finger: FingerId| states.get(&finger).copied().unwrap_or(false);
    let extended_count = states.values().filter(|e| **e).count();

    let result = match extended_count {
        0 => ClassificationResult::new(GestureLabel::Rock, ROCK_CLOSED),
        1 if extended(FingerId::Index) => {
            ClassificationResult::new(GestureLabel::Scissors, SCISSORS_INDEX_ONLY)
        }
        1 => ClassificationResult::new(GestureLabel::Rock, ROCK_NOISY),
        2 if extended(FingerId::Index) && extended(FingerId::Middle) => {
            ClassificationResult::new(GestureLabel::Scissors, SCISSORS_INDEX_MIDDLE)
        }
        2 if extended(FingerId::Thumb) && extended(FingerId::Index) => {
            ClassificationResult::new(GestureLabel::Scissors, SCISSORS_THUMB_INDEX)
        }
        2 => ClassificationResult::new(GestureLabel::Scissors, SCISSORS_OTHER_PAIR),
        _ => ClassificationResult::new(GestureLabel::Paper, PAPER_OPEN),
    };

    debug!(
        extended_count,
        label = %result.label,
        confidence = result.confidence,
        "pose classified"
    );
    result
}

#[cfg(test)]
#[path = "tests/classifier_tests.rs"]
mod tests;
