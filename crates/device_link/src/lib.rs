//! Owns the serial connection to the hand and serializes commands onto it.

use std::{io, sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::domain::ConnectionState;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

mod serial;

pub use serial::{available_ports, TokioSerialConnector};

pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// The board resets when the port opens and drops bytes until it is back up.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_ACK_WINDOW: Duration = Duration::from_millis(100);

const LINE_TERMINATOR: u8 = b'\n';
const DIAGNOSTIC_MARKERS: [&str; 2] = ["disconnected", "error"];

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("device link is not connected")]
    LinkUnavailable,
    #[error("failed to open serial endpoint '{address}': {source}")]
    ConnectFailed {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("no serial endpoint could be opened; tried: {}", .attempted.join(", "))]
    NoCandidateAvailable { attempted: Vec<String> },
    #[error("serial I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Opens serial endpoints. Swapped out in tests.
#[async_trait]
pub trait SerialConnector: Send + Sync {
    async fn open(&self, address: &str, baud_rate: u32) -> io::Result<Box<dyn SerialSession>>;
}

#[async_trait]
pub trait SerialSession: Send {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
    async fn flush(&mut self) -> io::Result<()>;
    /// Reads whole lines until `window` elapses or the device stops talking.
    async fn read_lines(&mut self, window: Duration) -> io::Result<Vec<String>>;
    async fn close(&mut self) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    pub settle_delay: Duration,
    pub ack_window: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            ack_window: DEFAULT_ACK_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: ConnectionState,
    pub address: Option<String>,
    pub baud_rate: u32,
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            address: None,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

impl LinkStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// What came back after a command was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReceipt {
    pub token: String,
    pub acknowledgements: Vec<String>,
}

impl CommandReceipt {
    /// Acknowledgement lines that mention a servo fault.
    pub fn diagnostics(&self) -> Vec<&str> {
        self.acknowledgements
            .iter()
            .map(String::as_str)
            .filter(|line| is_diagnostic_line(line))
            .collect()
    }
}

fn is_diagnostic_line(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    DIAGNOSTIC_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn is_closed_endpoint(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}

/// The single owner of the serial endpoint.
///
/// Connect, disconnect and send all hold one async mutex, so at most one
/// command is on the wire at a time. Status queries read a snapshot and do
/// not wait behind in-flight I/O.
pub struct DeviceLink {
    connector: Arc<dyn SerialConnector>,
    config: LinkConfig,
    session: Mutex<Option<Box<dyn SerialSession>>>,
    status: RwLock<LinkStatus>,
}

impl DeviceLink {
    pub fn new(connector: Arc<dyn SerialConnector>, config: LinkConfig) -> Self {
        Self {
            connector,
            config,
            session: Mutex::new(None),
            status: RwLock::new(LinkStatus::default()),
        }
    }

    pub fn config(&self) -> LinkConfig {
        self.config
    }

    pub async fn status(&self) -> LinkStatus {
        self.status.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.status.read().await.is_connected()
    }

    /// Opens `address` and waits out the settle delay before reporting ready.
    ///
    /// An already open session is closed first. On failure the link stays
    /// disconnected.
    pub async fn connect(&self, address: &str, baud_rate: u32) -> Result<(), LinkError> {
        let mut session = self.session.lock().await;
        if let Some(mut previous) = session.take() {
            close_quietly(previous.as_mut()).await;
            self.mark_disconnected().await;
        }

        info!(%address, baud_rate, "opening serial endpoint");
        let opened = match self.connector.open(address, baud_rate).await {
            Ok(opened) => opened,
            Err(source) => {
                error!(%address, error = %source, "failed to open serial endpoint");
                return Err(LinkError::ConnectFailed {
                    address: address.to_string(),
                    source,
                });
            }
        };

        if !self.config.settle_delay.is_zero() {
            let delay_ms = self.config.settle_delay.as_millis() as u64;
            debug!(delay_ms, "waiting for device to settle");
            tokio::time::sleep(self.config.settle_delay).await;
        }

        *session = Some(opened);
        *self.status.write().await = LinkStatus {
            state: ConnectionState::Connected,
            address: Some(address.to_string()),
            baud_rate,
        };
        info!(%address, baud_rate, "device link connected");
        Ok(())
    }

    /// Tries each candidate in order and stops at the first that opens.
    pub async fn auto_connect<S: AsRef<str>>(
        &self,
        candidates: &[S],
        baud_rate: u32,
    ) -> Result<String, LinkError> {
        let mut attempted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let address = candidate.as_ref();
            info!(%address, "trying serial candidate");
            attempted.push(address.to_string());
            match self.connect(address, baud_rate).await {
                Ok(()) => return Ok(address.to_string()),
                Err(err) => debug!(%address, error = %err, "candidate rejected"),
            }
        }
        warn!(attempted = attempted.len(), "no serial candidate could be opened");
        Err(LinkError::NoCandidateAvailable { attempted })
    }

    /// Closes the endpoint if open. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        if let Some(mut open) = session.take() {
            close_quietly(open.as_mut()).await;
            info!("device link disconnected");
        }
        self.mark_disconnected().await;
    }

    /// Writes `token` plus a newline, then drains acknowledgements for the
    /// configured window.
    ///
    /// Fails fast with [`LinkError::LinkUnavailable`] when disconnected; no
    /// reconnect is attempted. A missing acknowledgement is not a failure.
    pub async fn send_command(&self, token: &str) -> Result<CommandReceipt, LinkError> {
        let mut session = self.session.lock().await;
        let Some(open) = session.as_mut() else {
            warn!(%token, "command dropped, device link is not connected");
            return Err(LinkError::LinkUnavailable);
        };

        let mut frame = Vec::with_capacity(token.len() + 1);
        frame.extend_from_slice(token.as_bytes());
        frame.push(LINE_TERMINATOR);

        let written = match open.write_all(&frame).await {
            Ok(()) => open.flush().await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            if is_closed_endpoint(&err) {
                warn!(%token, error = %err, "serial endpoint closed underneath the link");
                if let Some(mut closed) = session.take() {
                    close_quietly(closed.as_mut()).await;
                }
                self.mark_disconnected().await;
            } else {
                warn!(%token, error = %err, "serial write failed");
            }
            return Err(LinkError::Io(err));
        }

        let acknowledgements = match session.as_mut() {
            Some(open) => match open.read_lines(self.config.ack_window).await {
                Ok(lines) => lines,
                Err(err) => {
                    debug!(%token, error = %err, "acknowledgement drain failed");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let receipt = CommandReceipt {
            token: token.to_string(),
            acknowledgements,
        };
        if receipt.acknowledgements.is_empty() {
            debug!(%token, "command sent, no acknowledgement within window");
        } else {
            info!(%token, acknowledgements = ?receipt.acknowledgements, "command acknowledged");
        }
        for line in receipt.diagnostics() {
            warn!(%token, %line, "device reported a fault");
        }
        Ok(receipt)
    }

    async fn mark_disconnected(&self) {
        let mut status = self.status.write().await;
        status.state = ConnectionState::Disconnected;
        status.address = None;
    }
}

async fn close_quietly(session: &mut dyn SerialSession) {
    if let Err(err) = session.close().await {
        debug!(error = %err, "error while closing serial session");
    }
}

#[cfg(test)]
#[path = "tests/link_tests.rs"]
mod tests;
