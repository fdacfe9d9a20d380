use std::{io, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader},
    time::{timeout_at, Instant},
};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::{SerialConnector, SerialSession};

const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Opens real serial ports through `tokio-serial`.
#[derive(Debug, Clone)]
pub struct TokioSerialConnector {
    timeout: Duration,
}

impl Default for TokioSerialConnector {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PORT_TIMEOUT,
        }
    }
}

impl TokioSerialConnector {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl SerialConnector for TokioSerialConnector {
    async fn open(&self, address: &str, baud_rate: u32) -> io::Result<Box<dyn SerialSession>> {
        let stream = tokio_serial::new(address, baud_rate)
            .timeout(self.timeout)
            .open_native_async()
            .map_err(io::Error::from)?;
        Ok(Box::new(TokioSerialSession {
            port: BufReader::new(stream),
            pending: Vec::new(),
        }))
    }
}

struct TokioSerialSession {
    port: BufReader<SerialStream>,
    /// Bytes of a line still in flight when the last drain window closed.
    pending: Vec<u8>,
}

#[async_trait]
impl SerialSession for TokioSerialSession {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.get_mut().write_all(bytes).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port.get_mut().flush().await
    }

    async fn read_lines(&mut self, window: Duration) -> io::Result<Vec<String>> {
        drain_lines(&mut self.port, &mut self.pending, Instant::now() + window).await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.port.get_mut().shutdown().await
    }
}

/// Reads complete lines until `deadline`. A line cut off by the deadline stays
/// in `pending` and is finished by the next drain.
async fn drain_lines<R>(
    reader: &mut R,
    pending: &mut Vec<u8>,
    deadline: Instant,
) -> io::Result<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    loop {
        // read_until keeps partial bytes in `pending` when the timeout cancels it.
        match timeout_at(deadline, reader.read_until(b'\n', pending)).await {
            Err(_elapsed) => break,
            Ok(Ok(0)) => break,
            Ok(Ok(_)) => {
                if pending.last() != Some(&b'\n') {
                    break;
                }
                let line = String::from_utf8_lossy(pending).trim().to_string();
                pending.clear();
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            Ok(Err(err)) if err.kind() == io::ErrorKind::TimedOut => break,
            Ok(Err(err)) => return Err(err),
        }
    }
    Ok(lines)
}

/// Names of the serial ports the OS currently reports.
pub fn available_ports() -> io::Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(io::Error::from)?;
    Ok(ports.into_iter().map(|port| port.port_name).collect())
}

#[cfg(test)]
#[path = "tests/serial_tests.rs"]
mod serial_tests;
