//! In-process companion radio for driving the engine in tests.
//!
//! [`pair`] returns a [`MockTransport`] for the engine and the [`Device`] end
//! of the same link. [`spawn_device`] runs a script on the device end that
//! answers each command the engine writes.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use mchost_client::{Transport, TransportError};
use mchost_protocol::cobs::{self, CobsDeframer};
use mchost_protocol::*;
use parking_lot::Mutex;

/// Read bound of the mock link.
pub const POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Serial-like: raw bytes, COBS done by the engine.
    Delimited,
    /// TCP-like: one payload per receive.
    SelfFraming,
}

pub struct MockTransport {
    framing: Framing,
    fail_open: bool,
    open: AtomicBool,
    to_device: Sender<Vec<u8>>,
    from_device: Receiver<Vec<u8>>,
    pending: Mutex<Vec<u8>>,
}

impl MockTransport {
    /// A transport whose `open` always fails.
    pub fn failing(framing: Framing) -> Self {
        let (mut transport, _device) = pair(framing);
        transport.fail_open = true;
        transport
    }
}

impl Transport for MockTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn requires_delimiter_framing(&self) -> bool {
        self.framing == Framing::Delimited
    }

    fn open(&self) -> Result<(), TransportError> {
        if self.fail_open {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such device",
            )));
        }
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.to_device
            .send(data.to_vec())
            .map_err(|_| TransportError::Closed)
    }

    fn receive(&self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }

        let mut pending = self.pending.lock();
        if !pending.is_empty() {
            let n = pending.len().min(buf.len());
            buf[..n].copy_from_slice(&pending[..n]);
            pending.drain(..n);
            return Ok(Some(n));
        }

        match self.from_device.recv_timeout(POLL) {
            Ok(bytes) => match self.framing {
                Framing::SelfFraming => {
                    if bytes.len() > buf.len() {
                        return Err(TransportError::BufferTooSmall {
                            needed: bytes.len(),
                            available: buf.len(),
                        });
                    }
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(Some(bytes.len()))
                }
                Framing::Delimited => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    pending.extend_from_slice(&bytes[n..]);
                    Ok(Some(n))
                }
            },
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn bytes_available(&self) -> Result<usize, TransportError> {
        Ok(self.pending.lock().len() + self.from_device.len())
    }
}

/// The radio's end of a mock link.
pub struct Device {
    framing: Framing,
    commands: Receiver<Vec<u8>>,
    replies: Sender<Vec<u8>>,
    deframer: CobsDeframer,
}

impl Device {
    /// Next command payload written by the engine.
    pub fn next_command(&mut self, timeout: Duration) -> Option<Vec<u8>> {
        match self.framing {
            Framing::SelfFraming => self.commands.recv_timeout(timeout).ok(),
            Framing::Delimited => loop {
                if let Some(frame) = self.deframer.next_frame() {
                    return Some(frame);
                }
                let bytes = self.commands.recv_timeout(timeout).ok()?;
                self.deframer.push(&bytes);
            },
        }
    }

    /// Send one frame to the engine. On delimited links the encoded bytes
    /// are delivered in two pieces.
    pub fn send(&self, frame: &[u8]) {
        match self.framing {
            Framing::SelfFraming => {
                let _ = self.replies.send(frame.to_vec());
            }
            Framing::Delimited => {
                let wire = cobs::encode_frame(frame);
                let (head, tail) = wire.split_at(wire.len() / 2);
                let _ = self.replies.send(head.to_vec());
                let _ = self.replies.send(tail.to_vec());
            }
        }
    }

    /// Send bytes exactly as given, bypassing any framing.
    pub fn send_raw(&self, bytes: &[u8]) {
        let _ = self.replies.send(bytes.to_vec());
    }
}

pub fn pair(framing: Framing) -> (MockTransport, Device) {
    let (to_device, commands) = unbounded();
    let (replies, from_device) = unbounded();
    (
        MockTransport {
            framing,
            fail_open: false,
            open: AtomicBool::new(false),
            to_device,
            from_device,
            pending: Mutex::new(Vec::new()),
        },
        Device {
            framing,
            commands,
            replies,
            deframer: CobsDeframer::new(),
        },
    )
}

/// A device running a script on its own thread.
pub struct ScriptedDevice {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Vec<Vec<u8>>>>,
}

impl ScriptedDevice {
    /// Stop the device and return every command it received. Dropping the
    /// device end makes the engine's next read fail as if the link was lost.
    pub fn finish(mut self) -> Vec<Vec<u8>> {
        self.stop.store(true, Ordering::Release);
        self.handle
            .take()
            .map(|h| h.join().expect("device thread panicked"))
            .unwrap_or_default()
    }
}

impl Drop for ScriptedDevice {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

pub fn spawn_device<F>(mut device: Device, mut script: F) -> ScriptedDevice
where
    F: FnMut(&[u8], &Device) + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let device_stop = Arc::clone(&stop);
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        while !device_stop.load(Ordering::Acquire) {
            if let Some(command) = device.next_command(POLL) {
                script(&command, &device);
                seen.push(command);
            }
        }
        seen
    });
    ScriptedDevice {
        stop,
        handle: Some(handle),
    }
}

/// Answer the handshake; returns `false` for any other command.
pub fn answer_handshake(command: &[u8], device: &Device) -> bool {
    if command.first() == Some(&CMD_APP_START) {
        device.send(&self_info_frame("TestNode"));
        true
    } else {
        false
    }
}

// ============================================================================
// Frame builders
// ============================================================================

pub const NODE_KEY: [u8; PUB_KEY_SIZE] = [0x42; PUB_KEY_SIZE];

pub fn self_info_frame(name: &str) -> Vec<u8> {
    let mut frame = vec![RESP_CODE_SELF_INFO, ADV_TYPE_CHAT, 20, 22];
    frame.extend_from_slice(&NODE_KEY);
    frame.extend_from_slice(&0i32.to_le_bytes());
    frame.extend_from_slice(&0i32.to_le_bytes());
    frame.extend_from_slice(&[0, 0, 0, 0]);
    frame.extend_from_slice(&910_525u32.to_le_bytes());
    frame.extend_from_slice(&62_500u32.to_le_bytes());
    frame.extend_from_slice(&[7, 5]);
    frame.extend_from_slice(name.as_bytes());
    frame
}

pub fn contact_frame(key_byte: u8, name: &str) -> Vec<u8> {
    let mut frame = vec![RESP_CODE_CONTACT];
    frame.extend_from_slice(&[key_byte; PUB_KEY_SIZE]);
    frame.extend_from_slice(&[ADV_TYPE_CHAT, 0, 0xFF]);
    frame.extend_from_slice(&[0; CONTACT_PATH_SIZE]);
    let mut name_field = [0u8; NAME_FIELD_SIZE];
    name_field[..name.len()].copy_from_slice(name.as_bytes());
    frame.extend_from_slice(&name_field);
    frame.extend_from_slice(&1_700_000_000u32.to_le_bytes());
    frame
}

pub fn contacts_start_frame(count: u32) -> Vec<u8> {
    let mut frame = vec![RESP_CODE_CONTACTS_START];
    frame.extend_from_slice(&count.to_le_bytes());
    frame
}

pub fn end_of_contacts_frame() -> Vec<u8> {
    let mut frame = vec![RESP_CODE_END_OF_CONTACTS];
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame
}

pub fn current_time_frame(secs: u32) -> Vec<u8> {
    let mut frame = vec![RESP_CODE_CURR_TIME];
    frame.extend_from_slice(&secs.to_le_bytes());
    frame
}

pub fn battery_frame(millivolts: u16) -> Vec<u8> {
    let mut frame = vec![RESP_CODE_BATT_AND_STORAGE];
    frame.extend_from_slice(&millivolts.to_le_bytes());
    frame
}

pub fn sent_frame(expected_ack: u32) -> Vec<u8> {
    let mut frame = vec![RESP_CODE_SENT, 0];
    frame.extend_from_slice(&expected_ack.to_le_bytes());
    frame.extend_from_slice(&5_000u32.to_le_bytes());
    frame
}

pub fn ok_frame() -> Vec<u8> {
    vec![RESP_CODE_OK]
}

pub fn err_frame(code: u8) -> Vec<u8> {
    vec![RESP_CODE_ERR, code]
}

/// Live direct message push (V3 layout).
pub fn direct_push_frame(prefix: [u8; 6], text: &str) -> Vec<u8> {
    let mut frame = vec![RESP_CODE_CONTACT_MSG_RECV_V3 | PUSH_FLAG, 24, 0, 0];
    frame.extend_from_slice(&prefix);
    frame.extend_from_slice(&[0xFF, TXT_TYPE_PLAIN]);
    frame.extend_from_slice(&1_700_000_100u32.to_le_bytes());
    frame.extend_from_slice(text.as_bytes());
    frame
}

/// Queued direct message (V2 layout).
pub fn direct_v2_frame(prefix: [u8; 6], text: &str) -> Vec<u8> {
    let mut frame = vec![RESP_CODE_CONTACT_MSG_RECV];
    frame.extend_from_slice(&prefix);
    frame.extend_from_slice(&[1, TXT_TYPE_PLAIN]);
    frame.extend_from_slice(&1_700_000_200u32.to_le_bytes());
    frame.extend_from_slice(text.as_bytes());
    frame
}

/// Queued channel message (V3 layout).
pub fn channel_v3_frame(channel_idx: u8, body: &str) -> Vec<u8> {
    let mut frame = vec![RESP_CODE_CHANNEL_MSG_RECV_V3, 8, 0, 0, channel_idx, 0xFF, TXT_TYPE_PLAIN];
    frame.extend_from_slice(&1_700_000_300u32.to_le_bytes());
    frame.extend_from_slice(body.as_bytes());
    frame
}
