//! Length-prefixed framing for stream-socket links.
//!
//! ```text
//! +--------+--------+--------+-------------------+
//! | marker | len_lo | len_hi | data[0..len]      |
//! +--------+--------+--------+-------------------+
//! ```
//!
//! The host writes frames with marker `'<'` (0x3C); the radio answers with
//! marker `'>'` (0x3E).

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ValidationError;

/// Marker byte on host → radio frames.
pub const OUTBOUND_MARKER: u8 = b'<';
/// Marker byte on radio → host frames.
pub const INBOUND_MARKER: u8 = b'>';
/// Marker plus 16-bit length.
pub const FRAME_HEADER_LEN: usize = 3;
/// Largest payload the 16-bit length can describe.
pub const MAX_FRAME_PAYLOAD: usize = u16::MAX as usize;

/// Result of one [`FrameCodec::decode`] attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameDecode {
    /// A complete payload.
    Frame(Vec<u8>),
    /// The buffer did not start with the inbound marker; this byte was dropped.
    Skipped(u8),
    /// More data is needed.
    Incomplete,
}

/// Reassembly buffer for inbound length-prefixed frames.
#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: BytesMut,
}

impl FrameCodec {
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to take one frame from the front of the buffer.
    ///
    /// A leading byte other than `'>'` is discarded on its own and reported
    /// as [`FrameDecode::Skipped`]; scanning resumes from the next byte on
    /// the following call. Partial headers and payloads stay buffered.
    pub fn decode(&mut self) -> FrameDecode {
        let Some(&first) = self.buffer.first() else {
            return FrameDecode::Incomplete;
        };
        if first != INBOUND_MARKER {
            self.buffer.advance(1);
            log::trace!("frame resync: dropped 0x{:02X}", first);
            return FrameDecode::Skipped(first);
        }

        if self.buffer.len() < FRAME_HEADER_LEN {
            return FrameDecode::Incomplete;
        }

        let len = u16::from_le_bytes([self.buffer[1], self.buffer[2]]) as usize;
        if self.buffer.len() < FRAME_HEADER_LEN + len {
            return FrameDecode::Incomplete;
        }

        self.buffer.advance(FRAME_HEADER_LEN);
        FrameDecode::Frame(self.buffer.split_to(len).to_vec())
    }

    /// Next complete frame, skipping over any resync bytes.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.decode() {
                FrameDecode::Frame(frame) => return Some(frame),
                FrameDecode::Skipped(_) => continue,
                FrameDecode::Incomplete => return None,
            }
        }
    }

    /// Frame `data` for host → radio transmission.
    pub fn encode(data: &[u8]) -> Result<Vec<u8>, ValidationError> {
        let len = u16::try_from(data.len()).map_err(|_| ValidationError::FrameTooLong {
            max: MAX_FRAME_PAYLOAD,
            actual: data.len(),
        })?;
        let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + data.len());
        buf.put_u8(OUTBOUND_MARKER);
        buf.put_u16_le(len);
        buf.extend_from_slice(data);
        Ok(buf)
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
