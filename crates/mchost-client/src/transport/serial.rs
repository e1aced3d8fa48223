//! Raw serial link (unix tty) with termios configuration.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::time::Instant;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::termios::{self, BaudRate, ControlFlags, FlushArg, SetArg, SpecialCharacterIndices};
use parking_lot::Mutex;
use tracing::debug;

use super::Transport;
use crate::config::{SerialConfig, READ_TIMEOUT, WRITE_TIMEOUT};
use crate::error::TransportError;

nix::ioctl_read_bad!(fionread, libc::FIONREAD, libc::c_int);

/// Delimiter-framed transport over a serial device, 8N1.
///
/// Reads return after at most 100 ms (`VMIN=0`, `VTIME=1`); writes wait at
/// most one second for the device to accept bytes.
pub struct SerialTransport {
    config: SerialConfig,
    reader: Mutex<Option<File>>,
    writer: Mutex<Option<File>>,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        SerialTransport {
            config,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.config.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.config.baud_rate
    }
}

fn baud_rate(rate: u32) -> Result<BaudRate, TransportError> {
    let baud = match rate {
        9_600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        #[cfg(target_os = "linux")]
        460_800 => BaudRate::B460800,
        #[cfg(target_os = "linux")]
        921_600 => BaudRate::B921600,
        other => return Err(TransportError::UnsupportedBaudRate(other)),
    };
    Ok(baud)
}

/// Raw mode, 8N1, bounded reads.
fn configure(file: &File, baud: BaudRate) -> Result<(), TransportError> {
    let mut tio = termios::tcgetattr(file)?;
    termios::cfmakeraw(&mut tio);
    tio.control_flags
        .insert(ControlFlags::CS8 | ControlFlags::CLOCAL | ControlFlags::CREAD);
    tio.control_flags
        .remove(ControlFlags::PARENB | ControlFlags::CSTOPB);
    tio.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
    // VTIME counts tenths of a second.
    tio.control_chars[SpecialCharacterIndices::VTIME as usize] =
        (READ_TIMEOUT.as_millis() / 100).max(1) as u8;
    termios::cfsetspeed(&mut tio, baud)?;
    termios::tcsetattr(file, SetArg::TCSANOW, &tio)?;
    termios::tcflush(file, FlushArg::TCIOFLUSH)?;
    Ok(())
}

/// `VTIME` only applies to blocking descriptors.
fn clear_nonblocking(file: &File) -> Result<(), TransportError> {
    let fd = file.as_raw_fd();
    // SAFETY: fd is a valid open descriptor owned by `file`.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags == -1 {
        return Err(std::io::Error::last_os_error().into());
    }
    // SAFETY: as above; only O_NONBLOCK is changed.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } == -1 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

impl Transport for SerialTransport {
    fn is_open(&self) -> bool {
        self.writer.lock().is_some()
    }

    fn requires_delimiter_framing(&self) -> bool {
        true
    }

    fn open(&self) -> Result<(), TransportError> {
        if self.is_open() {
            return Ok(());
        }
        let baud = baud_rate(self.config.baud_rate)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&self.config.path)?;
        configure(&file, baud)?;
        clear_nonblocking(&file)?;
        let writer = file.try_clone()?;

        *self.reader.lock() = Some(file);
        *self.writer.lock() = Some(writer);
        debug!(path = %self.config.path, baud = self.config.baud_rate, "serial transport open");
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.writer.lock().take().is_some() {
            debug!(path = %self.config.path, "serial transport closed");
        }
        self.reader.lock().take();
        Ok(())
    }

    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.writer.lock();
        let file = guard.as_mut().ok_or(TransportError::NotOpen)?;

        let deadline = Instant::now() + WRITE_TIMEOUT;
        let mut written = 0;
        while written < data.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::WriteTimeout(WRITE_TIMEOUT));
            }
            let wait_ms = remaining.as_millis().min(u16::MAX as u128) as u16;
            let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLOUT)];
            if poll(&mut fds, PollTimeout::from(wait_ms))? == 0 {
                return Err(TransportError::WriteTimeout(WRITE_TIMEOUT));
            }
            match file.write(&data[written..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => written += n,
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn receive(&self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        let mut guard = self.reader.lock();
        let file = guard.as_mut().ok_or(TransportError::NotOpen)?;
        match file.read(buf) {
            // With VMIN=0 a zero-length read is the timeout, not end of file.
            Ok(0) => Ok(None),
            Ok(n) => Ok(Some(n)),
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn bytes_available(&self) -> Result<usize, TransportError> {
        let guard = self.writer.lock();
        let file = guard.as_ref().ok_or(TransportError::NotOpen)?;
        let mut count: libc::c_int = 0;
        // SAFETY: the descriptor is open and `count` outlives the call.
        unsafe { fionread(file.as_raw_fd(), &mut count) }?;
        Ok(count.max(0) as usize)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
