//! Length-prefixed framing over a TCP stream.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use mchost_protocol::{FrameCodec, FrameDecode};
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::Transport;
use crate::config::{TcpConfig, READ_TIMEOUT, WRITE_TIMEOUT};
use crate::error::TransportError;

/// Read half: the socket plus its reassembly buffer.
struct Reader {
    stream: TcpStream,
    codec: FrameCodec,
}

/// Self-framing transport for radios reachable over TCP.
///
/// Outbound payloads get a `'<'` + length header; inbound `'>'` frames are
/// reassembled across arbitrary read boundaries.
pub struct TcpTransport {
    config: TcpConfig,
    reader: Mutex<Option<Reader>>,
    writer: Mutex<Option<TcpStream>>,
}

impl TcpTransport {
    pub fn new(config: TcpConfig) -> Self {
        TcpTransport {
            config,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    /// Transport for `address` with default settings.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self::new(TcpConfig {
            address: address.into(),
            ..TcpConfig::default()
        })
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    fn connect(&self) -> Result<TcpStream, TransportError> {
        let address = &self.config.address;
        let addrs = address
            .to_socket_addrs()
            .map_err(|e| TransportError::Resolve(format!("{}: {}", address, e)))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout()) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%addr, error = %e, "TCP connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(match last_err {
            Some(e) => TransportError::Io(e),
            None => TransportError::Resolve(address.clone()),
        })
    }
}

/// Move one decoded frame into `buf`, dropping stray bytes ahead of it.
///
/// `None` means the codec needs more input.
fn take_frame(codec: &mut FrameCodec, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
    loop {
        match codec.decode() {
            FrameDecode::Frame(frame) => {
                if frame.len() > buf.len() {
                    return Err(TransportError::BufferTooSmall {
                        needed: frame.len(),
                        available: buf.len(),
                    });
                }
                buf[..frame.len()].copy_from_slice(&frame);
                return Ok(Some(frame.len()));
            }
            FrameDecode::Skipped(byte) => {
                trace!("discarded stray byte 0x{:02X} before frame marker", byte);
            }
            FrameDecode::Incomplete => return Ok(None),
        }
    }
}

impl Transport for TcpTransport {
    fn is_open(&self) -> bool {
        self.writer.lock().is_some()
    }

    fn requires_delimiter_framing(&self) -> bool {
        false
    }

    fn open(&self) -> Result<(), TransportError> {
        if self.is_open() {
            return Ok(());
        }

        let stream = self.connect()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        let writer = stream.try_clone()?;

        *self.reader.lock() = Some(Reader {
            stream,
            codec: FrameCodec::new(),
        });
        *self.writer.lock() = Some(writer);
        debug!(address = %self.config.address, "TCP transport open");
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        // Shut the socket down first so a reader blocked in `receive` returns.
        if let Some(writer) = self.writer.lock().take() {
            let _ = writer.shutdown(Shutdown::Both);
            debug!(address = %self.config.address, "TCP transport closed");
        }
        self.reader.lock().take();
        Ok(())
    }

    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let framed = FrameCodec::encode(data)?;
        let mut guard = self.writer.lock();
        let stream = guard.as_mut().ok_or(TransportError::NotOpen)?;
        stream.write_all(&framed).map_err(|e| match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::WriteTimeout(WRITE_TIMEOUT),
            _ => TransportError::Io(e),
        })
    }

    fn receive(&self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        let mut guard = self.reader.lock();
        let reader = guard.as_mut().ok_or(TransportError::NotOpen)?;

        if let Some(n) = take_frame(&mut reader.codec, buf)? {
            return Ok(Some(n));
        }

        let mut chunk = [0u8; 4096];
        match reader.stream.read(&mut chunk) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => reader.codec.push(&chunk[..n]),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        }

        take_frame(&mut reader.codec, buf)
    }

    fn bytes_available(&self) -> Result<usize, TransportError> {
        let guard = self.reader.lock();
        let reader = guard.as_ref().ok_or(TransportError::NotOpen)?;
        Ok(reader.codec.buffered_len())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
