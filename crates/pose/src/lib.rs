//! Fingertip pose samples and the rock/paper/scissors classifier.
//!
//! A [`PoseSample`] is built once per request from whatever joint keys the
//! phone sent; [`classify`] is a pure function over it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::domain::FingerId;

mod classifier;
mod keys;

pub use classifier::{
    classify, extension_states, ClassificationResult, FingerStates, QUALITY_THRESHOLD,
};
pub use keys::resolve_finger_key;

/// One tracked fingertip, normalized to the camera frame. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default = "centered")]
    pub x: f64,
    #[serde(default = "centered")]
    pub y: f64,
    #[serde(default)]
    pub confidence: f64,
}

fn centered() -> f64 {
    0.5
}

impl Observation {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseSample {
    fingers: BTreeMap<FingerId, Observation>,
}

impl PoseSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, finger: FingerId, observation: Observation) -> Self {
        self.fingers.insert(finger, observation);
        self
    }

    /// Builds a sample from a JSON object keyed by joint name.
    ///
    /// Keys are resolved through [`resolve_finger_key`]; unknown joints, empty
    /// objects and values that are not observation objects are skipped. When
    /// two keys resolve to the same finger the later one in the request wins.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let mut fingers = BTreeMap::new();
        for (key, value) in map {
            let Some(finger) = resolve_finger_key(key) else {
                continue;
            };
            if !value.as_object().is_some_and(|fields| !fields.is_empty()) {
                continue;
            }
            match serde_json::from_value::<Observation>(value.clone()) {
                Ok(observation) => {
                    fingers.insert(finger, observation);
                }
                Err(error) => {
                    tracing::debug!(%key, %error, "skipping malformed fingertip observation");
                }
            }
        }
        Self { fingers }
    }

    /// Like [`PoseSample::from_json_map`]; anything other than an object
    /// yields an empty sample.
    pub fn from_json(value: &Value) -> Self {
        value
            .as_object()
            .map(Self::from_json_map)
            .unwrap_or_default()
    }

    pub fn get(&self, finger: FingerId) -> Option<&Observation> {
        self.fingers.get(&finger)
    }

    /// True when all five fingertips are present.
    pub fn is_complete(&self) -> bool {
        FingerId::ALL.iter().all(|f| self.fingers.contains_key(f))
    }

    pub fn len(&self) -> usize {
        self.fingers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingers.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/sample_tests.rs"]
mod sample_tests;
