//! Maps gateway-level intents onto the hand's wire vocabulary.

use std::fmt;

use shared::domain::{GestureLabel, StructuralCommand};
use thiserror::Error;

pub const SERVO_COUNT: u8 = 6;
pub const MAX_SERVO_ANGLE: u16 = 180;

const GESTURE_ALIASES: &[(&str, GestureLabel)] = &[
    ("石头", GestureLabel::Rock),
    ("剪刀", GestureLabel::Scissors),
    ("布", GestureLabel::Paper),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("{0}")]
    InvalidArgument(String),
}

fn invalid(message: impl Into<String>) -> TranslateError {
    TranslateError::InvalidArgument(message.into())
}

/// A single validated line for the device, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WireCommand(String);

impl WireCommand {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for WireCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<StructuralCommand> for WireCommand {
    fn from(kind: StructuralCommand) -> Self {
        WireCommand(kind.token().to_string())
    }
}

fn canonical_gesture(name: &str) -> Option<GestureLabel> {
    if let Some((_, label)) = GESTURE_ALIASES.iter().find(|(alias, _)| *alias == name) {
        return Some(*label);
    }
    [GestureLabel::Rock, GestureLabel::Paper, GestureLabel::Scissors]
        .into_iter()
        .find(|label| label.as_str().eq_ignore_ascii_case(name))
}

fn single_digit(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_digit() => Some(c),
        _ => None,
    }
}

/// Named gesture, permissive: unknown names are forwarded verbatim and left
/// for the device to judge.
pub fn gesture(name: &str) -> Result<WireCommand, TranslateError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("gesture must not be empty"));
    }
    if let Some(label) = canonical_gesture(name) {
        return Ok(WireCommand(label.as_str().to_string()));
    }
    raw(name)
}

/// Rock/paper/scissors only.
pub fn rps(name: &str) -> Result<WireCommand, TranslateError> {
    let name = name.trim();
    canonical_gesture(name)
        .map(|label| WireCommand(label.as_str().to_string()))
        .ok_or_else(|| invalid(format!("'{name}' is not rock, paper or scissors")))
}

/// A single base-10 digit, 0 through 9.
pub fn digit(text: &str) -> Result<WireCommand, TranslateError> {
    let text = text.trim();
    single_digit(text)
        .map(|c| WireCommand(c.to_string()))
        .ok_or_else(|| invalid(format!("'{text}' is not a single digit 0-9")))
}

/// Mirrors a classified gesture on the hand; `Unknown` has no command.
pub fn for_label(label: GestureLabel) -> Option<WireCommand> {
    label
        .to_command_token()
        .map(|token| WireCommand(token.to_string()))
}

pub fn structural(kind: StructuralCommand) -> WireCommand {
    kind.into()
}

/// Direct angle for one servo, `SERVO:<index>:<angle>`.
pub fn servo(index: u8, angle: u16) -> Result<WireCommand, TranslateError> {
    if index >= SERVO_COUNT {
        return Err(invalid(format!(
            "servo index {index} out of range 0-{}",
            SERVO_COUNT - 1
        )));
    }
    if angle > MAX_SERVO_ANGLE {
        return Err(invalid(format!(
            "servo angle {angle} out of range 0-{MAX_SERVO_ANGLE}"
        )));
    }
    Ok(WireCommand(format!("SERVO:{index}:{angle}")))
}

/// Any non-empty single-line token.
pub fn raw(text: &str) -> Result<WireCommand, TranslateError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(invalid("command must not be empty"));
    }
    if text.contains(['\r', '\n']) {
        return Err(invalid("command must be a single line"));
    }
    Ok(WireCommand(text.to_string()))
}

#[cfg(test)]
#[path = "tests/translator_tests.rs"]
mod tests;
