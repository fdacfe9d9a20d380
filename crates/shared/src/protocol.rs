use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{FingerId, GestureLabel},
    error::{ApiError, ErrorCode},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommandRequest {
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureRequest {
    pub gesture: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberRequest {
    pub number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServoRequest {
    pub index: u8,
    pub angle: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acknowledgements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            command: None,
            acknowledgements: Vec::new(),
            error: None,
        }
    }

    pub fn failed(error: &ApiError) -> Self {
        Self {
            success: false,
            message: error.message.clone(),
            command: None,
            acknowledgements: Vec::new(),
            error: Some(error.code),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub device_connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub baud_rate: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub gesture: GestureLabel,
    pub confidence: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fingers: BTreeMap<FingerId, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalyzeResponse {
    /// Response for a request body that could not be read as a joint map.
    pub fn rejected(error: &ApiError) -> Self {
        Self {
            gesture: GestureLabel::Unknown,
            confidence: 0.0,
            success: false,
            fingers: BTreeMap::new(),
            command: None,
            error: Some(error.message.clone()),
        }
    }
}
