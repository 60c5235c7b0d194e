//! Byte transports connecting the frame decoder to a receiver.

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use serialport::SerialPortType;
use tracing::debug;

use crate::{Error, Result};

/// Read timeout applied to serial devices.
///
/// A finite timeout keeps the decode loop cancellable: a quiet line surfaces
/// as [`std::io::ErrorKind::TimedOut`] rather than blocking forever, giving
/// the loop a chance to observe its cancellation flag between reads.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Capability set shared by every transport.
///
/// The concrete variant is chosen once at startup via [`open`]; nothing
/// downstream depends on which one is active. The underlying handle is
/// released on drop, on every exit path.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// Transport selection, decided once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// Named serial device at a baud rate.
    Serial { path: String, baud: u32 },
    /// USB-serial bridge located by vendor/product id.
    UsbBridge { vid: u16, pid: u16, baud: u32 },
    /// Replay of a captured session; end of file ends the stream.
    Replay { path: PathBuf },
}

/// Open the configured transport.
///
/// # Errors
/// Any open failure is fatal and aborts startup: the device cannot be opened,
/// no USB device matches the requested vendor/product id, or the replay file
/// does not exist.
pub fn open(config: &TransportConfig) -> Result<Box<dyn Transport>> {
    match config {
        TransportConfig::Serial { path, baud } => {
            debug!(path, baud, "opening serial device");
            let port = serialport::new(path.as_str(), *baud)
                .timeout(READ_TIMEOUT)
                .open()?;
            Ok(Box::new(port))
        }
        TransportConfig::UsbBridge { vid, pid, baud } => {
            let port = serialport::available_ports()?
                .into_iter()
                .find(|p| {
                    matches!(&p.port_type,
                        SerialPortType::UsbPort(info) if info.vid == *vid && info.pid == *pid)
                })
                .ok_or(Error::NoDevice {
                    vid: *vid,
                    pid: *pid,
                })?;
            debug!(name = %port.port_name, vid, pid, "found usb bridge");
            let port = serialport::new(port.port_name.as_str(), *baud)
                .timeout(READ_TIMEOUT)
                .open()?;
            Ok(Box::new(port))
        }
        TransportConfig::Replay { path } => {
            debug!(?path, "opening replay file");
            Ok(Box::new(File::open(path)?))
        }
    }
}
