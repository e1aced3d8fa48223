//! Physical links to the radio.
//!
//! Two kinds exist. A delimiter transport (serial) passes raw bytes through
//! and leaves COBS framing to the engine. A self-framing transport (TCP)
//! strips its own length-prefixed framing and hands back one payload per
//! [`Transport::receive`] call.

#[cfg(unix)]
mod serial;
mod tcp;

#[cfg(unix)]
pub use serial::SerialTransport;
pub use tcp::TcpTransport;

use crate::error::TransportError;

/// A byte link to a companion radio.
///
/// Methods take `&self`: the engine's receive loop reads while callers write
/// from other threads, so implementations guard their read and write halves
/// independently.
pub trait Transport: Send + Sync {
    fn is_open(&self) -> bool;

    /// `true` if the engine must COBS-frame outgoing commands and deframe
    /// incoming bytes itself.
    fn requires_delimiter_framing(&self) -> bool;

    fn open(&self) -> Result<(), TransportError>;

    /// Close the link. Closing a closed transport is a no-op.
    fn close(&self) -> Result<(), TransportError>;

    /// Write `data` in full, within a bounded time.
    fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Read what is available into `buf`.
    ///
    /// Returns `Ok(None)` when nothing arrived within the transport's bounded
    /// read timeout. A self-framing transport returns one complete payload
    /// per call, which may be empty. Fails with [`TransportError::Closed`]
    /// once the peer is gone.
    fn receive(&self, buf: &mut [u8]) -> Result<Option<usize>, TransportError>;

    /// Bytes that can be read without blocking.
    fn bytes_available(&self) -> Result<usize, TransportError>;
}
