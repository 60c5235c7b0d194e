//! SBP wire framing.
//!
//! Messages are framed as
//!
//! ```text
//! 0x55 | msg_type:u16 LE | sender:u16 LE | len:u8 | payload[len] | crc:u16 LE
//! ```
//!
//! where the CRC-16/XMODEM covers everything between the preamble and the
//! CRC itself.

mod bytes;
mod decoder;

pub use decoder::*;

use crc::{Crc, CRC_16_XMODEM};

/// Discriminator identifying what kind of message a frame carries.
pub type MsgType = u16;

/// Marks the start of a frame on the wire.
pub const PREAMBLE: u8 = 0x55;

/// Human-readable text printed by the receiver.
pub const MSG_PRINT: MsgType = 0x0010;
/// Satellite acquisition result; see [`crate::acq::AcqRecord`].
pub const MSG_ACQ_RESULT: MsgType = 0x0015;

pub(crate) const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// One decoded message extracted from a transport's byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: MsgType,
    /// Identifier of the device that sent the message.
    pub sender: u16,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Bytes between the preamble and the payload: type, sender and length.
    pub const HEADER_LEN: usize = 5;
    /// The payload length is carried in a single byte.
    pub const MAX_PAYLOAD: usize = 255;

    /// Encode this frame in wire format, preamble and CRC included.
    ///
    /// # Panics
    /// If the payload is longer than [`Frame::MAX_PAYLOAD`].
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = u8::try_from(self.payload.len()).expect("payload too long to frame");
        let mut out = Vec::with_capacity(1 + Self::HEADER_LEN + self.payload.len() + 2);
        out.push(PREAMBLE);
        out.extend_from_slice(&self.msg_type.to_le_bytes());
        out.extend_from_slice(&self.sender.to_le_bytes());
        out.push(len);
        out.extend_from_slice(&self.payload);
        let crc = CRC16.checksum(&out[1..]);
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }
}
