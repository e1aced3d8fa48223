//! Splitting long text or binary payloads into radio-sized chunks and
//! sending them in order.

use std::thread;
use std::time::Duration;

use mchost_protocol::PublicKeyPrefix;
use tracing::{debug, warn};

use crate::engine::{Companion, RequestOptions};
use crate::error::Result;

/// Split `text` into chunks of at most `limit` bytes.
///
/// Each break prefers the last newline within the limit, then the last
/// space, then a hard cut; a newline or space used as the break is dropped.
/// Hard cuts never split a UTF-8 character, so a chunk may come out short
/// (or, if `limit` is smaller than one character, hold that one character).
pub fn split_text(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > limit {
        let window = &rest.as_bytes()[..=limit];
        let boundary = [b'\n', b' ']
            .iter()
            .find_map(|&sep| window.iter().rposition(|&b| b == sep).filter(|&i| i > 0));

        let (chunk, next) = match boundary {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => {
                let mut cut = limit;
                while !rest.is_char_boundary(cut) {
                    cut -= 1;
                }
                if cut == 0 {
                    cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
                }
                rest.split_at(cut)
            }
        };
        chunks.push(chunk.to_string());
        rest = next;
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// Split `data` into `limit`-byte slices; only the last may be shorter.
pub fn split_exact(data: &[u8], limit: usize) -> Vec<Vec<u8>> {
    data.chunks(limit.max(1)).map(<[u8]>::to_vec).collect()
}

/// Progress of a chunked send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkProgress {
    Sending { index: usize, total: usize },
    Sent { index: usize, total: usize, success: bool },
    /// `success` is true only if every chunk succeeded.
    Complete { total: usize, success: bool },
}

/// Sends long messages as a sequence of chunks through a [`Companion`].
///
/// Chunks go out strictly one after another with a fixed pause between them.
/// A failed chunk is reported and not retried; the remaining chunks are
/// still sent.
pub struct MessageSender<'a> {
    companion: &'a Companion,
    limit: usize,
    delay: Duration,
    options: RequestOptions,
}

impl<'a> MessageSender<'a> {
    /// Sender using the session's configured chunk limit and delay.
    pub fn new(companion: &'a Companion) -> Self {
        let config = companion.config();
        MessageSender {
            companion,
            limit: config.message_chunk_limit,
            delay: config.message_chunk_delay(),
            options: RequestOptions::default(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Options applied to each chunk's send.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Send `text` to a contact. Returns whether every chunk was accepted.
    ///
    /// Fails only if `recipient` is not a valid prefix, before any chunk is sent.
    pub fn send_direct(
        &self,
        recipient: &[u8],
        text: &str,
        progress: impl FnMut(ChunkProgress),
    ) -> Result<bool> {
        self.direct(recipient, &split_text(text, self.limit), progress)
    }

    /// Send `data` to a contact as exact `limit`-byte slices, unaltered.
    pub fn send_direct_exact(
        &self,
        recipient: &[u8],
        data: &[u8],
        progress: impl FnMut(ChunkProgress),
    ) -> Result<bool> {
        self.direct(recipient, &split_exact(data, self.limit), progress)
    }

    /// Send `text` to a channel. Returns whether every chunk was accepted.
    pub fn send_channel(
        &self,
        channel_idx: u8,
        text: &str,
        progress: impl FnMut(ChunkProgress),
    ) -> Result<bool> {
        Ok(self.channel(channel_idx, &split_text(text, self.limit), progress))
    }

    /// Send `data` to a channel as exact `limit`-byte slices, unaltered.
    pub fn send_channel_exact(
        &self,
        channel_idx: u8,
        data: &[u8],
        progress: impl FnMut(ChunkProgress),
    ) -> Result<bool> {
        Ok(self.channel(channel_idx, &split_exact(data, self.limit), progress))
    }

    fn direct<T: AsRef<[u8]>>(
        &self,
        recipient: &[u8],
        chunks: &[T],
        progress: impl FnMut(ChunkProgress),
    ) -> Result<bool> {
        PublicKeyPrefix::try_from_slice(recipient)?;
        Ok(self.send_chunks(
            chunks,
            |chunk| {
                self.companion
                    .send_text_message(recipient, chunk, &self.options)
                    .map(|_| ())
            },
            progress,
        ))
    }

    fn channel<T: AsRef<[u8]>>(
        &self,
        channel_idx: u8,
        chunks: &[T],
        progress: impl FnMut(ChunkProgress),
    ) -> bool {
        self.send_chunks(
            chunks,
            |chunk| {
                self.companion
                    .send_channel_message(channel_idx, chunk, &self.options)
            },
            progress,
        )
    }

    fn send_chunks<T: AsRef<[u8]>>(
        &self,
        chunks: &[T],
        mut send: impl FnMut(&[u8]) -> Result<()>,
        mut progress: impl FnMut(ChunkProgress),
    ) -> bool {
        let total = chunks.len();
        let mut all_sent = true;
        debug!(total, limit = self.limit, "sending chunked message");

        for (index, chunk) in chunks.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            progress(ChunkProgress::Sending { index, total });
            let success = match send(chunk.as_ref()) {
                Ok(()) => true,
                Err(e) => {
                    warn!(index, total, error = %e, "chunk not sent");
                    false
                }
            };
            all_sent &= success;
            progress(ChunkProgress::Sent {
                index,
                total,
                success,
            });
        }

        progress(ChunkProgress::Complete {
            total,
            success: all_sent,
        });
        all_sent
    }
}
