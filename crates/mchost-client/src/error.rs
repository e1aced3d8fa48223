//! Error types for transports and the protocol engine.

use std::time::Duration;

use mchost_protocol::{FirmwareErrorCode, ResponseKind, ValidationError};
use thiserror::Error;

use crate::engine::ConnectionState;

/// Failures of the physical link.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport is not open")]
    NotOpen,

    #[error("connection closed by peer")]
    Closed,

    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),

    #[error("frame of {needed} bytes does not fit receive buffer of {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    #[error("could not resolve address: {0}")]
    Resolve(String),

    #[error(transparent)]
    Framing(#[from] ValidationError),
}

#[cfg(unix)]
impl From<nix::errno::Errno> for TransportError {
    fn from(errno: nix::errno::Errno) -> Self {
        TransportError::Io(std::io::Error::from(errno))
    }
}

/// Errors returned by [`Companion`](crate::Companion) operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An argument was rejected before anything was sent.
    #[error("invalid argument: {0}")]
    Validation(#[from] ValidationError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No matching reply arrived before the deadline. The session stays usable.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,

    /// The radio answered with an error frame.
    #[error("device error: {0}")]
    Device(FirmwareErrorCode),

    #[error("not connected")]
    NotConnected,

    #[error("operation not allowed while {0}")]
    InvalidState(ConnectionState),

    /// The link went down while waiting for a reply.
    #[error("connection lost")]
    Disconnected,

    /// The handshake failed; the session is back to disconnected.
    #[error("connect failed: {0}")]
    Connect(#[source] Box<Error>),

    #[error("unexpected response: {0:?}")]
    UnexpectedResponse(ResponseKind),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
