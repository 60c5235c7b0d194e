#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serial(#[from] serialport::Error),

    /// Frame failed its checksum. Decoding continues at the next preamble.
    #[error("crc mismatch for message {msg_type:#06x}: want {want:#06x}, got {got:#06x}")]
    Crc { msg_type: u16, want: u16, got: u16 },

    /// Payload too short for the message type it was dispatched as.
    #[error("short payload for message {msg_type:#06x}: {len} bytes")]
    ShortPayload { msg_type: u16, len: usize },

    #[error("no usb device matching {vid:04x}:{pid:04x}")]
    NoDevice { vid: u16, pid: u16 },
}

impl Error {
    /// True when the decode loop may continue after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Crc { .. } | Error::ShortPayload { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
