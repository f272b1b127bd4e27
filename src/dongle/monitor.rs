// Copyright 2026 FlooCast Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Serial port discovery and lifecycle.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serialport::{DataBits, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits};
use tracing::{debug, info, warn};

pub const DONGLE_VID: u16 = 0x0A12;
pub const DONGLE_PID: u16 = 0x4007;
const PRODUCT_TAG: &str = "FMA120";

const BAUD_RATE: u32 = 921_600;
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Port handle shared between the read loop and command writers.
pub type SharedPort = Arc<Mutex<Option<Box<dyn SerialPort>>>>;

/// Outcome of one discovery/lifecycle poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// Port is open and the device is still enumerated.
    Open,
    /// Port was just opened on the named device path.
    Opened(String),
    /// Device present but the port is held by another process.
    Busy,
    /// Open failed for a non-contention reason.
    Error,
    /// The open port's device vanished from enumeration.
    Lost,
    /// No device found, nothing open.
    Idle,
}

/// True when the enumerated port is the dongle.
pub fn matches_dongle(info: &SerialPortInfo) -> bool {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => {
            usb.vid == DONGLE_VID
                && usb.pid == DONGLE_PID
                && usb.product.as_deref().is_some_and(|p| p.contains(PRODUCT_TAG))
        }
        _ => false,
    }
}

/// Owns open/close/read of the dongle's serial port.
///
/// The handle itself lives in a [`SharedPort`] so the connection interface
/// can write commands from other threads while the monitor drives the read
/// side.
pub struct PortMonitor {
    port: SharedPort,
    port_name: Option<String>,
}

impl PortMonitor {
    pub fn new(port: SharedPort) -> Self {
        Self {
            port,
            port_name: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.port_name.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Advance the discovery/lifecycle state by one step.
    pub fn poll(&mut self) -> PollStatus {
        if let Some(name) = &self.port_name {
            if Self::enumerate().iter().any(|p| &p.port_name == name) {
                return PollStatus::Open;
            }
            info!(port = %name, "device vanished from enumeration");
            self.reset();
            return PollStatus::Lost;
        }

        let Some(name) = Self::enumerate()
            .into_iter()
            .find(matches_dongle)
            .map(|p| p.port_name)
        else {
            return PollStatus::Idle;
        };

        match self.open(&name) {
            Ok(()) => {
                info!(port = %name, "serial port opened");
                self.port_name = Some(name.clone());
                PollStatus::Opened(name)
            }
            Err(e) if is_contention_error(&e) => {
                debug!(port = %name, error = %e, "port held by another process");
                PollStatus::Busy
            }
            Err(e) => {
                warn!(port = %name, error = %e, "failed to open port");
                self.reset();
                PollStatus::Error
            }
        }
    }

    /// Read one CRLF-terminated line if bytes are waiting.
    ///
    /// Returns `Ok(None)` when the receive buffer is empty. A timeout
    /// mid-line returns the partial data so the caller counts it as a parse
    /// failure rather than an I/O error.
    pub fn read_line(&self) -> io::Result<Option<Vec<u8>>> {
        let mut guard = self.port.lock();
        let Some(port) = guard.as_mut() else {
            return Ok(None);
        };
        match port.bytes_to_read() {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(io::Error::other(e)),
        }

        let mut line = Vec::with_capacity(40);
        let mut byte = [0u8; 1];
        loop {
            match port.read(&mut byte) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "serial port closed",
                    ))
                }
                Ok(_) => {
                    line.push(byte[0]);
                    if line.ends_with(b"\r\n") {
                        line.truncate(line.len() - 2);
                        return Ok(Some(line));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Ok(Some(line));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Close the port and forget the device path.
    pub fn reset(&mut self) {
        if let Some(name) = self.port_name.take() {
            debug!(port = %name, "closing serial port");
        }
        *self.port.lock() = None;
    }

    fn enumerate() -> Vec<SerialPortInfo> {
        match serialport::available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!(error = %e, "serial enumeration failed");
                Vec::new()
            }
        }
    }

    fn open(&self, name: &str) -> serialport::Result<()> {
        let builder = serialport::new(name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .timeout(READ_TIMEOUT);

        #[cfg(unix)]
        let port: Box<dyn SerialPort> = {
            let mut native = builder.open_native()?;
            if let Err(e) = native.set_exclusive(true) {
                warn!(port = %name, error = %e, "exclusive access not granted");
            }
            Box::new(native)
        };
        #[cfg(not(unix))]
        let port = builder.open()?;

        *self.port.lock() = Some(port);
        Ok(())
    }
}

/// Classify an open failure as contention rather than a hard fault.
pub fn is_contention_error(err: &serialport::Error) -> bool {
    let text = err.to_string().to_lowercase();
    ["lock", "busy", "unavailable", "use", "permission"]
        .iter()
        .any(|needle| text.contains(needle))
}
