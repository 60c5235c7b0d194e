use std::io::{ErrorKind, Read};

use tracing::trace;

use super::bytes::Bytes;
use super::{Frame, MsgType, CRC16, PREAMBLE};
use crate::{Error, Result};

/// Reconstructs discrete frames from a transport's byte stream.
///
/// A corrupt frame never ends the stream: on a checksum mismatch everything
/// after the offending preamble byte is pushed back and re-scanned, and the
/// error is surfaced for the caller to log. Only preamble bytes are ever
/// consumed for good, so a frame following corrupt data is still found.
///
/// End of the underlying stream is a clean completion, not an error; a
/// trailing partial frame is dropped.
pub struct FrameDecoder<R>
where
    R: Read + Send,
{
    bytes: Bytes<R>,
    /// Count of frames successfully decoded.
    pub num_frames: usize,
    /// Count of checksum mismatches seen.
    pub num_crc_errors: usize,
}

impl<R> FrameDecoder<R>
where
    R: Read + Send,
{
    pub fn new(reader: R) -> Self {
        FrameDecoder {
            bytes: Bytes::new(reader),
            num_frames: 0,
            num_crc_errors: 0,
        }
    }

    /// Decode the next frame, or `Ok(None)` when the stream ends.
    ///
    /// A read timeout or interruption mid-frame pushes the partial frame back
    /// and returns the error; the next call resumes losslessly.
    ///
    /// # Errors
    /// [`Error::Crc`] when a frame fails its checksum (recoverable), or
    /// [`Error::Io`] for underlying read failures.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.bytes.next() {
                Ok(PREAMBLE) => {}
                Ok(_) => continue,
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                Err(err) => return Err(Error::Io(err)),
            }

            let mut working = vec![PREAMBLE];
            if self.take(&mut working, Frame::HEADER_LEN)?.is_none() {
                return Ok(None);
            }
            let msg_type = MsgType::from_le_bytes([working[1], working[2]]);
            let sender = u16::from_le_bytes([working[3], working[4]]);
            let len = working[5] as usize;

            if self.take(&mut working, len + 2)?.is_none() {
                return Ok(None);
            }
            let crc_at = working.len() - 2;
            let got = u16::from_le_bytes([working[crc_at], working[crc_at + 1]]);
            let want = CRC16.checksum(&working[1..crc_at]);
            if want != got {
                self.num_crc_errors += 1;
                // A good frame may start anywhere after the bad preamble;
                // push everything back and re-scan.
                self.bytes.unread(&working[1..]);
                return Err(Error::Crc {
                    msg_type,
                    want,
                    got,
                });
            }

            self.num_frames += 1;
            trace!(msg_type, sender, len, offset = self.bytes.offset(), "frame");
            return Ok(Some(Frame {
                msg_type,
                sender,
                payload: working[Frame::HEADER_LEN + 1..crc_at].to_vec(),
            }));
        }
    }

    // Pull `n` more bytes into the working set. `Ok(None)` means the stream
    // ended mid-frame. On a timeout or interruption the working set goes back
    // so the next call can resume the same frame.
    fn take(&mut self, working: &mut Vec<u8>, n: usize) -> Result<Option<()>> {
        for _ in 0..n {
            match self.bytes.next() {
                Ok(b) => working.push(b),
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                Err(err) => {
                    if matches!(
                        err.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) {
                        self.bytes.unread(working);
                    }
                    return Err(Error::Io(err));
                }
            }
        }
        Ok(Some(()))
    }
}

impl<R> IntoIterator for FrameDecoder<R>
where
    R: Read + Send,
{
    type Item = Result<Frame>;
    type IntoIter = FrameIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        FrameIter { decoder: self }
    }
}

/// Iterates frames from a [`FrameDecoder`]. Created via
/// ``FrameDecoder::into_iter``.
///
/// ## Errors
/// The iterator ends at end of stream; any other error is passed on for the
/// consumer to act on.
pub struct FrameIter<R>
where
    R: Read + Send,
{
    decoder: FrameDecoder<R>,
}

impl<R> Iterator for FrameIter<R>
where
    R: Read + Send,
{
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.decoder.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Creates an iterator producing the frames in `reader`'s byte stream.
///
/// Decoding starts at the first preamble byte found; anything before it is
/// skipped. The iterator ends cleanly at end of stream.
///
/// # Errors
/// Checksum failures and read errors are yielded as `Err` items.
pub fn read_frames<'a, R>(reader: R) -> impl Iterator<Item = Result<Frame>> + 'a
where
    R: Read + Send + 'a,
{
    FrameDecoder::new(reader).into_iter()
}
