use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read};

/// Byte reader with pushback.
///
/// Bytes consumed from the underlying reader can be returned with
/// [`Bytes::unread`] and will be produced again, in their original order,
/// before anything further is read. The frame decoder relies on this to
/// re-scan bytes after a failed checksum and to resume a frame interrupted by
/// a read timeout.
pub struct Bytes<R> {
    reader: R,
    num_read: usize,
    pending: VecDeque<u8>,
}

impl<R: Read> Bytes<R> {
    pub fn new(reader: R) -> Self {
        Bytes {
            reader,
            num_read: 0,
            pending: VecDeque::new(),
        }
    }

    /// Produce the next byte. End of stream maps to
    /// [`ErrorKind::UnexpectedEof`].
    pub fn next(&mut self) -> io::Result<u8> {
        if let Some(b) = self.pending.pop_front() {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        let n = self.reader.read(&mut buf)?;
        if n == 0 {
            return Err(ErrorKind::UnexpectedEof.into());
        }
        self.num_read += 1;
        Ok(buf[0])
    }

    /// Return bytes to the stream; the first byte of `dat` is produced by the
    /// next call to [`Bytes::next`].
    pub fn unread(&mut self, dat: &[u8]) {
        for &b in dat.iter().rev() {
            self.pending.push_front(b);
        }
    }

    /// Count of bytes consumed so far, pending pushback excluded.
    pub fn offset(&self) -> usize {
        self.num_read - self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_and_unread_preserve_order() {
        let dat = [10, 20, 30, 40];
        let mut bytes = Bytes::new(&dat[..]);

        assert_eq!(bytes.next().unwrap(), 10);
        assert_eq!(bytes.next().unwrap(), 20);
        assert_eq!(bytes.offset(), 2);

        bytes.unread(&[10, 20]);
        assert_eq!(bytes.offset(), 0);

        assert_eq!(bytes.next().unwrap(), 10);
        assert_eq!(bytes.next().unwrap(), 20);
        assert_eq!(bytes.next().unwrap(), 30);
        assert_eq!(bytes.offset(), 3);
    }

    #[test]
    fn unread_stacks_in_front_of_earlier_pushback() {
        let dat = [1, 2];
        let mut bytes = Bytes::new(&dat[..]);

        assert_eq!(bytes.next().unwrap(), 1);
        assert_eq!(bytes.next().unwrap(), 2);
        bytes.unread(&[2]);
        bytes.unread(&[1]);

        assert_eq!(bytes.next().unwrap(), 1);
        assert_eq!(bytes.next().unwrap(), 2);
    }

    #[test]
    fn end_of_stream_is_unexpected_eof() {
        let dat: &[u8] = &[];
        let mut bytes = Bytes::new(dat);
        let err = bytes.next().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
