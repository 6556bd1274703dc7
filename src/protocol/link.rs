//! Serial transport to the LED controller

use super::frame::OutputFrame;
use serialport::SerialPort;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Link errors
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Failed to enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),

    #[error("Write failed: {0}")]
    Write(#[source] io::Error),

    #[error("Flush failed: {0}")]
    Flush(#[source] io::Error),
}

/// Serial link configuration
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,

    /// Baud rate
    pub baud_rate: u32,

    /// Pause after opening so the board can finish its reset
    pub settle_delay: Duration,

    /// Longest wait for an acknowledgement line
    pub read_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 115_200,
            settle_delay: Duration::from_secs(2),
            read_timeout: Duration::from_secs(1),
        }
    }
}

#[cfg(target_os = "windows")]
fn default_port() -> &'static str {
    "COM3"
}

#[cfg(not(target_os = "windows"))]
fn default_port() -> &'static str {
    "/dev/ttyUSB0"
}

/// Where frames go and acknowledgements come from.
pub trait FrameLink {
    /// Write one frame. Any failure is a lost link.
    fn send(&mut self, frame: &OutputFrame) -> Result<(), LinkError>;

    /// Read one acknowledgement line, trimmed.
    ///
    /// Timeouts and read faults yield `None`; acknowledgements are advisory.
    fn read_ack(&mut self) -> Option<String>;
}

/// Line-oriented link over any byte stream. Dropping it closes the port.
///
/// Acknowledgement bytes that arrive without their newline before a read
/// times out are held until the rest of the line shows up.
pub struct SerialLink<T: Read + Write> {
    port: BufReader<T>,
    name: String,
    pending: Vec<u8>,
}

impl SerialLink<Box<dyn SerialPort>> {
    /// Open the configured port and wait out the board reset.
    pub fn open(config: &LinkConfig) -> Result<Self, LinkError> {
        log::info!(
            "Opening serial port {} at {} baud",
            config.port,
            config.baud_rate
        );

        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| LinkError::Open {
                port: config.port.clone(),
                source,
            })?;

        if !config.settle_delay.is_zero() {
            log::info!(
                "Waiting {} ms for the controller to reset",
                config.settle_delay.as_millis()
            );
            thread::sleep(config.settle_delay);
        }

        Ok(Self::new(port, config.port.clone()))
    }
}

impl<T: Read + Write> SerialLink<T> {
    pub fn new(port: T, name: impl Into<String>) -> Self {
        Self {
            port: BufReader::new(port),
            name: name.into(),
            pending: Vec::new(),
        }
    }

    pub fn get_ref(&self) -> &T {
        self.port.get_ref()
    }
}

impl<T: Read + Write> FrameLink for SerialLink<T> {
    fn send(&mut self, frame: &OutputFrame) -> Result<(), LinkError> {
        let bytes = frame.encode();
        let port = self.port.get_mut();
        port.write_all(&bytes).map_err(LinkError::Write)?;
        port.flush().map_err(LinkError::Flush)
    }

    fn read_ack(&mut self) -> Option<String> {
        match self.port.read_until(b'\n', &mut self.pending) {
            Ok(_) if self.pending.ends_with(b"\n") => {
                let line = std::mem::take(&mut self.pending);
                Some(String::from_utf8_lossy(&line).trim().to_string())
            }
            // EOF before the newline; keep what we have
            Ok(_) => None,
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                if !self.pending.is_empty() {
                    log::debug!(
                        "Partial acknowledgement held ({} bytes)",
                        self.pending.len()
                    );
                }
                None
            }
            Err(e) => {
                log::warn!("Acknowledgement read failed on {}: {}", self.name, e);
                self.pending.clear();
                None
            }
        }
    }
}

impl<T: Read + Write> Drop for SerialLink<T> {
    fn drop(&mut self) {
        log::info!("Serial link {} closed", self.name);
    }
}

/// Names of serial ports visible to the OS
pub fn list_ports() -> Result<Vec<String>, LinkError> {
    let ports = serialport::available_ports().map_err(LinkError::Enumerate)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
