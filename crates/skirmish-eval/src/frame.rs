//! Length-prefixed framing.
//!
//! Every frame on the socket, in both directions, is the payload length in
//! ASCII decimal, an underscore, then exactly that many payload bytes:
//!
//! ```text
//! 11_{"ok":true}
//! ```
//!
//! There is no terminator and no checksum. Once a reader loses its place in
//! the stream there is no way to find the next frame boundary, so anything
//! that does not parse cleanly is a [`LinkError::Framing`].

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::LinkError;

/// Byte separating the length prefix from the payload.
pub const DELIMITER: u8 = b'_';

/// Largest payload accepted from the server.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Longest accepted length prefix (`MAX_FRAME_LEN` has 7 digits).
pub const MAX_LEN_DIGITS: usize = 7;

/// Frame `payload` for the wire.
pub fn encode_frame(payload: &str) -> Vec<u8> {
    format!("{}{}{payload}", payload.len(), char::from(DELIMITER)).into_bytes()
}

/// Parse one complete frame from the front of `bytes`.
///
/// Returns the payload and the total number of bytes the frame occupies, or
/// `None` if `bytes` does not yet hold the whole frame.
///
/// # Errors
///
/// Returns [`LinkError::Framing`] if the length prefix is not a decimal
/// number within [`MAX_FRAME_LEN`].
pub fn parse_frame(bytes: &[u8]) -> Result<Option<(&[u8], usize)>, LinkError> {
    let Some(delimiter) = bytes.iter().position(|&b| b == DELIMITER) else {
        if bytes.len() > MAX_LEN_DIGITS {
            return Err(LinkError::Framing(format!(
                "no delimiter within {MAX_LEN_DIGITS} bytes"
            )));
        }
        return Ok(None);
    };
    let (prefix, rest) = bytes.split_at(delimiter);
    let len = parse_length(prefix)?;
    let body = rest.get(1..).unwrap_or_default();
    Ok(body
        .get(..len)
        .map(|payload| (payload, delimiter.saturating_add(1).saturating_add(len))))
}

fn parse_length(prefix: &[u8]) -> Result<usize, LinkError> {
    let valid = !prefix.is_empty()
        && prefix.len() <= MAX_LEN_DIGITS
        && prefix.iter().all(u8::is_ascii_digit);
    let len = core::str::from_utf8(prefix)
        .ok()
        .filter(|_| valid)
        .and_then(|digits| digits.parse::<usize>().ok())
        .ok_or_else(|| {
            LinkError::Framing(format!(
                "invalid length prefix {:?}",
                String::from_utf8_lossy(prefix)
            ))
        })?;
    if len > MAX_FRAME_LEN {
        return Err(LinkError::Framing(format!(
            "frame of {len} bytes exceeds {MAX_FRAME_LEN}"
        )));
    }
    Ok(len)
}

/// Reads frames from a buffered stream.
///
/// Progress through the current frame is kept in the reader itself, so a call
/// to [`FrameReader::next_frame`] that is cancelled (for example by a
/// timeout) loses nothing: the next call carries on from the same byte.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    prefix: Vec<u8>,
    payload: Vec<u8>,
    filled: usize,
    expected: Option<usize>,
    frames_read: u64,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    /// Wrap a buffered reader.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            prefix: Vec::new(),
            payload: Vec::new(),
            filled: 0,
            expected: None,
            frames_read: 0,
        }
    }

    /// Number of complete frames read so far.
    pub const fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next complete frame payload.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Closed`] if the stream ends between frames
    /// - [`LinkError::Framing`] if it ends inside a frame or the prefix is bad
    /// - [`LinkError::Io`] if the underlying read fails
    pub async fn next_frame(&mut self) -> Result<Vec<u8>, LinkError> {
        let len = match self.expected {
            Some(len) => len,
            None => {
                let len = self.read_prefix().await?;
                self.expected = Some(len);
                self.payload = vec![0; len];
                self.filled = 0;
                len
            }
        };

        while self.filled < len {
            let Some(unfilled) = self.payload.get_mut(self.filled..) else {
                break;
            };
            let read = self
                .reader
                .read(unfilled)
                .await
                .map_err(|e| LinkError::Io(e.to_string()))?;
            if read == 0 {
                return Err(LinkError::Framing(format!(
                    "connection closed after {} of {len} payload bytes",
                    self.filled
                )));
            }
            self.filled = self.filled.saturating_add(read);
        }

        self.expected = None;
        self.filled = 0;
        self.frames_read = self.frames_read.saturating_add(1);
        Ok(core::mem::take(&mut self.payload))
    }

    async fn read_prefix(&mut self) -> Result<usize, LinkError> {
        loop {
            let available = self
                .reader
                .fill_buf()
                .await
                .map_err(|e| LinkError::Io(e.to_string()))?;
            if available.is_empty() {
                return Err(if self.prefix.is_empty() {
                    LinkError::Closed
                } else {
                    LinkError::Framing("connection closed inside a length prefix".to_owned())
                });
            }

            let (consumed, done) = match available.iter().position(|&b| b == DELIMITER) {
                Some(at) => {
                    self.prefix.extend_from_slice(available.get(..at).unwrap_or_default());
                    (at.saturating_add(1), true)
                }
                None => {
                    self.prefix.extend_from_slice(available);
                    (available.len(), false)
                }
            };
            self.reader.consume(consumed);

            if done {
                let len = parse_length(&self.prefix);
                self.prefix.clear();
                return len;
            }
            if self.prefix.len() > MAX_LEN_DIGITS {
                return Err(LinkError::Framing(format!(
                    "no delimiter within {MAX_LEN_DIGITS} bytes"
                )));
            }
        }
    }
}
