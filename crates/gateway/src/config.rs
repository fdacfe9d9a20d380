use std::{env, fs, time::Duration};

use anyhow::Context;
use device_link::{LinkConfig, DEFAULT_ACK_WINDOW, DEFAULT_BAUD_RATE, DEFAULT_SETTLE_DELAY};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "gateway.toml";

const DEFAULT_CANDIDATES: &[&str] = &[
    "/dev/tty.usbserial-210",
    "/dev/ttyUSB0",
    "/dev/ttyUSB1",
    "/dev/ttyACM0",
    "/dev/ttyACM1",
    "COM1",
    "COM2",
    "COM3",
    "COM4",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub gateway_bind: String,
    pub serial_port: Option<String>,
    pub serial_candidates: Vec<String>,
    pub baud_rate: u32,
    pub settle_delay_ms: u64,
    pub ack_window_ms: u64,
    pub auto_connect: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway_bind: "0.0.0.0:8081".into(),
            serial_port: None,
            serial_candidates: DEFAULT_CANDIDATES.iter().map(|c| c.to_string()).collect(),
            baud_rate: DEFAULT_BAUD_RATE,
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            ack_window_ms: DEFAULT_ACK_WINDOW.as_millis() as u64,
            auto_connect: true,
        }
    }
}

impl Settings {
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            ack_window: Duration::from_millis(self.ack_window_ms),
        }
    }

    /// Candidate ports in connect order; an explicit port goes first.
    pub fn candidates(&self) -> Vec<String> {
        let mut candidates = Vec::with_capacity(self.serial_candidates.len() + 1);
        if let Some(port) = &self.serial_port {
            candidates.push(port.clone());
        }
        for candidate in &self.serial_candidates {
            if !candidates.contains(candidate) {
                candidates.push(candidate.clone());
            }
        }
        candidates
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    serial_port: Option<String>,
    serial_candidates: Option<Vec<String>>,
    baud_rate: Option<u32>,
    settle_delay_ms: Option<u64>,
    ack_window_ms: Option<u64>,
    auto_connect: Option<bool>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = env::var("GATEWAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if let Ok(raw) = fs::read_to_string(&path) {
        apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse gateway config '{path}'"))?;
    }

    apply_env(&mut settings, |key| env::var(key).ok());
    Ok(settings)
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.bind_addr {
        settings.gateway_bind = v;
    }
    if let Some(v) = file_cfg.serial_port {
        settings.serial_port = Some(v);
    }
    if let Some(v) = file_cfg.serial_candidates {
        settings.serial_candidates = v;
    }
    if let Some(v) = file_cfg.baud_rate {
        settings.baud_rate = v;
    }
    if let Some(v) = file_cfg.settle_delay_ms {
        settings.settle_delay_ms = v;
    }
    if let Some(v) = file_cfg.ack_window_ms {
        settings.ack_window_ms = v;
    }
    if let Some(v) = file_cfg.auto_connect {
        settings.auto_connect = v;
    }
    Ok(())
}

pub(crate) fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("GATEWAY_BIND") {
        settings.gateway_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.gateway_bind = v;
    }

    if let Some(v) = lookup("SERIAL_PORT") {
        settings.serial_port = Some(v);
    }
    if let Some(v) = lookup("APP__SERIAL_PORT") {
        settings.serial_port = Some(v);
    }

    if let Some(v) = lookup("APP__SERIAL_CANDIDATES") {
        settings.serial_candidates = parse_candidates(&v);
    }

    if let Some(parsed) = lookup("APP__BAUD_RATE").and_then(|v| v.parse().ok()) {
        settings.baud_rate = parsed;
    }
    if let Some(parsed) = lookup("APP__SETTLE_DELAY_MS").and_then(|v| v.parse().ok()) {
        settings.settle_delay_ms = parsed;
    }
    if let Some(parsed) = lookup("APP__ACK_WINDOW_MS").and_then(|v| v.parse().ok()) {
        settings.ack_window_ms = parsed;
    }
    if let Some(parsed) = lookup("APP__AUTO_CONNECT").and_then(|v| parse_flag(&v)) {
        settings.auto_connect = parsed;
    }
}

fn parse_candidates(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
