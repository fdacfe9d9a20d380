use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerId {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl FingerId {
    /// Canonical order, thumb first.
    pub const ALL: [FingerId; 5] = [
        FingerId::Thumb,
        FingerId::Index,
        FingerId::Middle,
        FingerId::Ring,
        FingerId::Pinky,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FingerId::Thumb => "thumb",
            FingerId::Index => "index",
            FingerId::Middle => "middle",
            FingerId::Ring => "ring",
            FingerId::Pinky => "pinky",
        }
    }
}

impl fmt::Display for FingerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GestureLabel {
    Rock,
    Paper,
    Scissors,
    Unknown,
}

impl GestureLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            GestureLabel::Rock => "ROCK",
            GestureLabel::Paper => "PAPER",
            GestureLabel::Scissors => "SCISSORS",
            GestureLabel::Unknown => "UNKNOWN",
        }
    }

    /// Device token for this gesture, `None` for `Unknown`.
    pub fn to_command_token(self) -> Option<&'static str> {
        match self {
            GestureLabel::Unknown => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Whole-hand commands with a single hardcoded device token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralCommand {
    FullOpen,
    FullClose,
    Reset,
}

impl StructuralCommand {
    pub fn token(self) -> &'static str {
        match self {
            StructuralCommand::FullOpen => "OPENMAX",
            StructuralCommand::FullClose => "CLOSEMAX",
            StructuralCommand::Reset => "RESET",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}
