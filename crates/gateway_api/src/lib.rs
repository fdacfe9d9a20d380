use std::sync::Arc;

use chrono::Utc;
use device_link::{DeviceLink, LinkError};
use pose::{classify, extension_states, PoseSample};
use serde_json::Value;
use shared::{
    domain::StructuralCommand,
    error::{ApiError, ErrorCode},
    protocol::{AnalyzeResponse, CommandResponse, ConnectRequest, StatusResponse},
};
use tracing::{info, warn};

pub mod translator;

use translator::{TranslateError, WireCommand};

#[derive(Clone)]
pub struct ApiContext {
    pub link: Arc<DeviceLink>,
    /// Ports tried, in order, when a connect request names none.
    pub candidates: Vec<String>,
    pub default_baud_rate: u32,
}

pub async fn status(ctx: &ApiContext) -> StatusResponse {
    let link = ctx.link.status().await;
    StatusResponse {
        status: "running".to_string(),
        device_connected: link.is_connected(),
        port: link.address,
        baud_rate: link.baud_rate,
        timestamp: Utc::now(),
    }
}

pub async fn connect(ctx: &ApiContext, req: ConnectRequest) -> Result<CommandResponse, ApiError> {
    let baud_rate = req.baud_rate.unwrap_or(ctx.default_baud_rate);
    let port = req
        .port
        .as_deref()
        .map(str::trim)
        .filter(|port| !port.is_empty());

    let bound = match port {
        Some(port) => {
            ctx.link
                .connect(port, baud_rate)
                .await
                .map_err(link_error)?;
            port.to_string()
        }
        None => ctx
            .link
            .auto_connect(&ctx.candidates, baud_rate)
            .await
            .map_err(link_error)?,
    };

    Ok(CommandResponse::ok(format!(
        "device connected on {bound} at {baud_rate} baud"
    )))
}

pub async fn disconnect(ctx: &ApiContext) -> CommandResponse {
    ctx.link.disconnect().await;
    CommandResponse::ok("device disconnected")
}

pub async fn send_raw(ctx: &ApiContext, command: &str) -> Result<CommandResponse, ApiError> {
    let command = translator::raw(command).map_err(invalid)?;
    transmit(ctx, command, "command").await
}

pub async fn send_gesture(ctx: &ApiContext, gesture: &str) -> Result<CommandResponse, ApiError> {
    let command = translator::gesture(gesture).map_err(invalid)?;
    transmit(ctx, command, "gesture").await
}

pub async fn send_rps(ctx: &ApiContext, gesture: &str) -> Result<CommandResponse, ApiError> {
    let command = translator::rps(gesture).map_err(invalid)?;
    transmit(ctx, command, "rps gesture").await
}

pub async fn send_number(ctx: &ApiContext, number: &str) -> Result<CommandResponse, ApiError> {
    let command = translator::digit(number).map_err(invalid)?;
    transmit(ctx, command, "number gesture").await
}

pub async fn send_structural(
    ctx: &ApiContext,
    kind: StructuralCommand,
) -> Result<CommandResponse, ApiError> {
    transmit(ctx, translator::structural(kind), "hand command").await
}

pub async fn send_servo(
    ctx: &ApiContext,
    index: u8,
    angle: u16,
) -> Result<CommandResponse, ApiError> {
    let command = translator::servo(index, angle).map_err(invalid)?;
    transmit(ctx, command, "servo command").await
}

/// Classifies a raw joint map without touching the device.
pub fn classify_payload(payload: &Value) -> AnalyzeResponse {
    let sample = PoseSample::from_json(payload);
    let result = classify(&sample);
    if result.is_unknown() {
        warn!(fingers = sample.len(), "pose sample incomplete");
    } else {
        info!(gesture = %result.label, confidence = result.confidence, "pose classified");
    }
    AnalyzeResponse {
        gesture: result.label,
        confidence: result.confidence,
        success: true,
        fingers: extension_states(&sample).unwrap_or_default(),
        command: None,
        error: None,
    }
}

/// Classifies and, when `actuate` is set, mirrors the gesture on the hand.
///
/// A failed send is reported in `command`; the classification itself still
/// succeeds.
pub async fn analyze_hand(ctx: &ApiContext, payload: &Value, actuate: bool) -> AnalyzeResponse {
    let mut response = classify_payload(payload);
    if !actuate {
        return response;
    }
    if let Some(command) = translator::for_label(response.gesture) {
        response.command = Some(match transmit(ctx, command, "gesture").await {
            Ok(sent) => sent,
            Err(err) => CommandResponse::failed(&err),
        });
    }
    response
}

async fn transmit(
    ctx: &ApiContext,
    command: WireCommand,
    what: &str,
) -> Result<CommandResponse, ApiError> {
    let receipt = ctx
        .link
        .send_command(command.as_str())
        .await
        .map_err(link_error)?;
    Ok(CommandResponse {
        success: true,
        message: format!("{what} '{command}' sent"),
        command: Some(receipt.token),
        acknowledgements: receipt.acknowledgements,
        error: None,
    })
}

fn invalid(err: TranslateError) -> ApiError {
    ApiError::invalid(err.to_string())
}

fn link_error(err: LinkError) -> ApiError {
    let code = match &err {
        LinkError::LinkUnavailable => ErrorCode::LinkUnavailable,
        LinkError::ConnectFailed { .. } | LinkError::NoCandidateAvailable { .. } => {
            ErrorCode::ConnectFailed
        }
        LinkError::Io(_) => ErrorCode::Io,
    };
    ApiError::new(code, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
