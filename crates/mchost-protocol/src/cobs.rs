//! Consistent Overhead Byte Stuffing for `0x00`-delimited serial links.
//!
//! [`encode`] removes every zero byte from a payload so a single `0x00` can
//! terminate the frame on the wire. The delimiter itself is not part of the
//! encoded output; [`encode_frame`] appends it.

use bytes::{Buf, BytesMut};

/// Frame delimiter on COBS links.
pub const DELIMITER: u8 = 0x00;

/// Longest run a single code byte can describe.
const MAX_RUN_CODE: u8 = 0xFF;

/// Encode `data`, eliminating all `0x00` bytes.
///
/// Overhead is one leading code byte plus one byte per 254 data bytes.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 254 + 2);
    let mut code_idx = 0usize;
    let mut code: u8 = 1;
    out.push(0);

    for &b in data {
        if b == 0 {
            out[code_idx] = code;
            code = 1;
            code_idx = out.len();
            out.push(0);
        } else {
            out.push(b);
            code += 1;
            if code == MAX_RUN_CODE {
                out[code_idx] = code;
                code = 1;
                code_idx = out.len();
                out.push(0);
            }
        }
    }
    out[code_idx] = code;
    out
}

/// Encode `data` and append the frame delimiter.
pub fn encode_frame(data: &[u8]) -> Vec<u8> {
    let mut out = encode(data);
    out.push(DELIMITER);
    out
}

/// Decode a COBS run (delimiter already stripped).
///
/// Never fails. If a code byte announces more bytes than remain, or a zero
/// code byte appears, decoding stops and whatever was restored so far is
/// returned.
pub fn decode(encoded: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded.len());
    let mut idx = 0usize;

    while idx < encoded.len() {
        let code = encoded[idx];
        if code == 0 {
            log::trace!("COBS: zero code byte at offset {}, stopping", idx);
            break;
        }
        idx += 1;

        let run = code as usize - 1;
        if idx + run > encoded.len() {
            log::trace!(
                "COBS: run of {} at offset {} overruns {} byte input",
                run,
                idx - 1,
                encoded.len()
            );
            break;
        }
        out.extend_from_slice(&encoded[idx..idx + run]);
        idx += run;

        // A full run carries no implied zero, nor does the final run.
        if code != MAX_RUN_CODE && idx < encoded.len() {
            out.push(0);
        }
    }
    out
}

/// Splits a raw serial byte stream into decoded frames.
///
/// Bytes are accumulated until a delimiter arrives; each complete run is
/// COBS-decoded. Empty runs (back-to-back delimiters) are skipped.
#[derive(Debug, Default)]
pub struct CobsDeframer {
    buffer: BytesMut,
}

impl CobsDeframer {
    pub fn new() -> Self {
        CobsDeframer {
            buffer: BytesMut::with_capacity(512),
        }
    }

    /// Add received bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Next complete decoded frame, or `None` until a delimiter arrives.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let end = self.buffer.iter().position(|&b| b == DELIMITER)?;
            let run = self.buffer.split_to(end);
            self.buffer.advance(1);
            if !run.is_empty() {
                return Some(decode(&run));
            }
        }
    }

    /// Bytes received since the last delimiter.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
