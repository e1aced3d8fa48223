//! The protocol engine.
//!
//! A [`Companion`] owns one transport. While connected, a background receive
//! loop reads frames, decodes them and routes each one: solicited responses
//! go to the shared [`ResponseQueue`], pushes are broadcast as [`Event`]s and,
//! for text messages, also queued for pull consumers.
//!
//! Requests are serialized: a command is written and its reply awaited under
//! one gate, so at most one command is ever in flight. Replies carry no
//! transaction id and could not be told apart otherwise.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use mchost_protocol::cobs::{self, CobsDeframer};
use mchost_protocol::{
    BatteryStatus, ChannelInfo, ChannelMessage, Command, ContactInfo, DeviceInfo, DirectMessage,
    IncomingMessage, Message, Push, Response, ResponseKind, SelfInfo, SentInfo, MAX_FRAME_PAYLOAD,
};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::cancel::CancelToken;
use crate::config::CompanionConfig;
use crate::error::{Error, Result, TransportError};
use crate::events::{Event, EventBus};
use crate::messages::MessageSender;
use crate::queue::{Expect, ResponseQueue, WaitError};
use crate::transport::Transport;

/// Fits the largest length-prefixed payload.
const RECEIVE_BUFFER_SIZE: usize = MAX_FRAME_PAYLOAD;
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

const CONTACT_STREAM: &[ResponseKind] = &[ResponseKind::Contact, ResponseKind::EndOfContacts];
const SYNC_REPLIES: &[ResponseKind] = &[
    ResponseKind::DirectMessage,
    ResponseKind::ChannelMessage,
    ResponseKind::NoMoreMessages,
];
const CHANNEL_SEND_REPLIES: &[ResponseKind] = &[ResponseKind::Ok, ResponseKind::Sent];

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Transport open, handshake in progress.
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Per-call deadline and cancellation.
///
/// Without an explicit timeout the configured connect or command timeout
/// applies.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// State shared with the receive loop.
struct Shared {
    state: Mutex<ConnectionState>,
    responses: ResponseQueue,
    events: EventBus,
    direct_tx: Sender<DirectMessage>,
    channel_tx: Sender<ChannelMessage>,
    self_info: Mutex<Option<SelfInfo>>,
    device_info: Mutex<Option<DeviceInfo>>,
    stop: AtomicBool,
}

impl Shared {
    fn set_state(&self, new: ConnectionState) {
        let mut state = self.state.lock();
        if *state != new {
            debug!(from = %*state, to = %new, "connection state changed");
            *state = new;
        }
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Classify one deframed frame and route it.
    fn dispatch(&self, frame: &[u8]) {
        if self.events.has_subscribers() {
            self.events.publish(Event::PacketReceived(frame.to_vec()));
        }

        match Message::decode(frame) {
            Some(Message::Response(response)) => {
                trace!(kind = ?response.kind(), "response queued");
                self.responses.push(response);
            }
            Some(Message::Push(push)) => self.handle_push(push),
            None => debug!(
                code = ?frame.first(),
                len = frame.len(),
                "dropping undecodable frame"
            ),
        }
    }

    fn handle_push(&self, push: Push) {
        trace!(?push, "push received");
        let event = match push {
            Push::Advert { public_key } => Event::Advert(public_key),
            Push::PathUpdated { public_key } => Event::PathUpdated(public_key),
            Push::SendConfirmed {
                ack_hash,
                trip_time_ms,
            } => Event::SendConfirmed {
                ack_hash,
                trip_time_ms,
            },
            Push::MessageWaiting => Event::MessageWaiting,
            Push::RawData {
                snr_x4,
                rssi,
                payload,
            } => Event::RawData {
                snr_x4,
                rssi,
                payload,
            },
            Push::LogRxData { snr_x4, rssi, raw } => Event::LogRxData { snr_x4, rssi, raw },
            Push::DirectMessage(msg) => {
                let _ = self.direct_tx.send(msg.clone());
                Event::DirectMessage(msg)
            }
            Push::ChannelMessage(msg) => {
                let _ = self.channel_tx.send(msg.clone());
                Event::ChannelMessage(msg)
            }
        };
        self.events.publish(event);
    }

    /// The link broke underneath a live session.
    fn link_failed(&self, err: &TransportError) {
        warn!(error = %err, "transport failed, session lost");
        self.set_state(ConnectionState::Disconnected);
        self.responses.disconnect();
        self.events.publish(Event::Error(err.to_string()));
    }
}

fn receive_loop(transport: Arc<dyn Transport>, shared: Arc<Shared>) {
    let delimited = transport.requires_delimiter_framing();
    let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];
    let mut deframer = CobsDeframer::new();
    debug!(delimited, "receive loop started");

    while !shared.should_stop() {
        match transport.receive(&mut buf) {
            Ok(None) => {}
            Ok(Some(n)) if delimited => {
                deframer.push(&buf[..n]);
                while let Some(frame) = deframer.next_frame() {
                    shared.dispatch(&frame);
                }
            }
            Ok(Some(n)) => shared.dispatch(&buf[..n]),
            Err(e) => {
                if !shared.should_stop() {
                    shared.link_failed(&e);
                }
                break;
            }
        }
    }
    debug!("receive loop stopped");
}

/// Wait up to `timeout` for `handle` to finish; detach it otherwise.
fn join_bounded(handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!(?timeout, "receive loop did not stop in time, detaching");
            return;
        }
        thread::sleep(JOIN_POLL_INTERVAL);
    }
    if handle.join().is_err() {
        warn!("receive loop panicked");
    }
}

fn now_secs() -> u32 {
    chrono::Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32
}

/// A session with one companion radio.
///
/// All methods take `&self`; a `Companion` can be shared between threads
/// (for example in an `Arc`). Dropping it closes the session.
pub struct Companion {
    transport: Arc<dyn Transport>,
    config: CompanionConfig,
    shared: Arc<Shared>,
    direct_rx: Receiver<DirectMessage>,
    channel_rx: Receiver<ChannelMessage>,
    /// Serializes connect and close.
    lifecycle: Mutex<()>,
    /// Held from writing a command until its reply is resolved.
    command_gate: Mutex<()>,
    /// Held around the transport write only.
    send_gate: Mutex<()>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Companion {
    pub fn new(transport: impl Transport + 'static, config: CompanionConfig) -> Self {
        Self::with_shared_transport(Arc::new(transport), config)
    }

    pub fn with_shared_transport(transport: Arc<dyn Transport>, config: CompanionConfig) -> Self {
        let (direct_tx, direct_rx) = unbounded();
        let (channel_tx, channel_rx) = unbounded();
        Companion {
            transport,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::Disconnected),
                responses: ResponseQueue::new(),
                events: EventBus::new(),
                direct_tx,
                channel_tx,
                self_info: Mutex::new(None),
                device_info: Mutex::new(None),
                stop: AtomicBool::new(false),
            }),
            direct_rx,
            channel_rx,
            lifecycle: Mutex::new(()),
            command_gate: Mutex::new(()),
            send_gate: Mutex::new(()),
            reader: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CompanionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> Receiver<Event> {
        self.shared.events.subscribe()
    }

    /// Identity captured by the last successful handshake.
    pub fn self_info(&self) -> Option<SelfInfo> {
        self.shared.self_info.lock().clone()
    }

    /// Device details captured by the last [`query_device`](Self::query_device).
    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.shared.device_info.lock().clone()
    }

    /// Message layer bound to this session.
    pub fn message_sender(&self) -> MessageSender<'_> {
        MessageSender::new(self)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Open the transport, start the receive loop and perform the handshake.
    ///
    /// On any failure the session is torn down and left disconnected; there
    /// is no retry.
    pub fn connect(&self, options: &RequestOptions) -> Result<SelfInfo> {
        let _lifecycle = self.lifecycle.lock();
        {
            let mut state = self.shared.state.lock();
            if *state != ConnectionState::Disconnected {
                return Err(Error::InvalidState(*state));
            }
            *state = ConnectionState::Connecting;
        }
        debug!("connecting");
        *self.shared.self_info.lock() = None;
        *self.shared.device_info.lock() = None;

        // A previous session may have died without an explicit close.
        if self.stop_receiver() {
            if let Err(e) = self.transport.close() {
                debug!(error = %e, "closing transport of lost session");
            }
        }

        match self.start_session(options) {
            Ok(info) => {
                *self.shared.self_info.lock() = Some(info.clone());
                self.shared.set_state(ConnectionState::Connected);
                self.shared.events.publish(Event::Connected(info.clone()));
                debug!(name = %info.node_name, key = %info.public_key, "connected");
                Ok(info)
            }
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.stop_receiver();
                if let Err(close_err) = self.transport.close() {
                    debug!(error = %close_err, "transport close after failed connect");
                }
                self.shared.set_state(ConnectionState::Disconnected);
                Err(Error::Connect(Box::new(e)))
            }
        }
    }

    fn start_session(&self, options: &RequestOptions) -> Result<SelfInfo> {
        self.transport.open()?;
        self.shared.responses.reset();
        self.shared.stop.store(false, Ordering::Release);

        let transport = Arc::clone(&self.transport);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("mchost-rx".to_string())
            .spawn(move || receive_loop(transport, shared))
            .map_err(TransportError::Io)?;
        *self.reader.lock() = Some(handle);

        let timeout = options
            .timeout
            .unwrap_or_else(|| self.config.connect_timeout());
        let handshake = Command::app_start(self.config.app_name.clone());
        match self.roundtrip(
            &handshake,
            Expect::Kind(ResponseKind::SelfInfo),
            timeout,
            options.cancel.as_ref(),
        )? {
            Response::SelfInfo(info) => Ok(info),
            other => Err(Error::UnexpectedResponse(other.kind())),
        }
    }

    /// Signal the receive loop, wake any waiter and join with a bounded wait.
    ///
    /// Returns `true` if a receive loop was running for this session.
    fn stop_receiver(&self) -> bool {
        let Some(handle) = self.reader.lock().take() else {
            return false;
        };
        self.shared.stop.store(true, Ordering::Release);
        self.shared.responses.disconnect();
        join_bounded(handle, self.config.join_timeout());
        true
    }

    /// Stop the receive loop and close the transport.
    ///
    /// Fires [`Event::Disconnected`] once per session that had connected;
    /// closing an already-closed session does nothing.
    pub fn close(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        let had_session = self.stop_receiver();
        let closed = self.transport.close();
        self.shared.set_state(ConnectionState::Disconnected);
        if had_session {
            debug!("closed");
            self.shared.events.publish(Event::Disconnected);
        }
        closed.map_err(Error::from)
    }

    // ------------------------------------------------------------------
    // Request/response core
    // ------------------------------------------------------------------

    fn ensure_connected(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Connected => Ok(()),
            _ => Err(Error::NotConnected),
        }
    }

    fn command_timeout(&self, options: &RequestOptions) -> Duration {
        options
            .timeout
            .unwrap_or_else(|| self.config.command_timeout())
    }

    fn write_command(&self, command: &Command) -> Result<()> {
        let payload = command.encode();
        let framed;
        let wire: &[u8] = if self.transport.requires_delimiter_framing() {
            framed = cobs::encode_frame(&payload);
            &framed
        } else {
            &payload
        };

        {
            let _send = self.send_gate.lock();
            self.transport.send(wire)?;
        }
        trace!(
            code = format_args!("0x{:02X}", command.code()),
            bytes = %hex::encode(&payload),
            "command sent"
        );
        self.shared.events.publish(Event::PacketSent(payload));
        Ok(())
    }

    /// Take the command gate, drop stale replies and write `command`.
    ///
    /// Anything still queued at this point answers an earlier command that
    /// has already resolved.
    fn begin_command(&self, command: &Command) -> Result<MutexGuard<'_, ()>> {
        let gate = self.command_gate.lock();
        let stale = self.shared.responses.clear();
        if stale > 0 {
            debug!(stale, "discarded late replies to earlier commands");
        }
        self.write_command(command)?;
        Ok(gate)
    }

    fn await_response(
        &self,
        expect: Expect,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<Response> {
        match self.shared.responses.wait_for(expect, timeout, cancel) {
            Ok(Response::Err(code)) => {
                debug!(%code, "device returned error");
                Err(Error::Device(code))
            }
            Ok(response) => Ok(response),
            Err(WaitError::Timeout) => {
                debug!(?expect, ?timeout, "no reply before deadline");
                Err(Error::Timeout(timeout))
            }
            Err(WaitError::Cancelled) => Err(Error::Cancelled),
            Err(WaitError::Disconnected) => Err(Error::Disconnected),
        }
    }

    fn roundtrip(
        &self,
        command: &Command,
        expect: Expect,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<Response> {
        let _gate = self.begin_command(command)?;
        self.await_response(expect, timeout, cancel)
    }

    /// Send `command` and wait for the first response `expect` accepts.
    ///
    /// An error frame from the device is returned as [`Error::Device`].
    pub fn execute(
        &self,
        command: &Command,
        expect: Expect,
        options: &RequestOptions,
    ) -> Result<Response> {
        self.ensure_connected()?;
        self.roundtrip(
            command,
            expect,
            self.command_timeout(options),
            options.cancel.as_ref(),
        )
    }

    fn execute_ok(&self, command: &Command, options: &RequestOptions) -> Result<()> {
        match self.execute(command, Expect::Kind(ResponseKind::Ok), options)? {
            Response::Ok => Ok(()),
            other => Err(Error::UnexpectedResponse(other.kind())),
        }
    }

    // ------------------------------------------------------------------
    // Device
    // ------------------------------------------------------------------

    pub fn query_device(&self, options: &RequestOptions) -> Result<DeviceInfo> {
        match self.execute(
            &Command::device_query(),
            Expect::Kind(ResponseKind::DeviceInfo),
            options,
        )? {
            Response::DeviceInfo(info) => {
                *self.shared.device_info.lock() = Some(info.clone());
                Ok(info)
            }
            other => Err(Error::UnexpectedResponse(other.kind())),
        }
    }

    /// Device clock, seconds since the Unix epoch.
    pub fn get_device_time(&self, options: &RequestOptions) -> Result<u32> {
        match self.execute(
            &Command::GetDeviceTime,
            Expect::Kind(ResponseKind::CurrentTime),
            options,
        )? {
            Response::CurrentTime { time_secs } => Ok(time_secs),
            other => Err(Error::UnexpectedResponse(other.kind())),
        }
    }

    pub fn set_device_time(&self, time_secs: u32, options: &RequestOptions) -> Result<()> {
        self.execute_ok(&Command::SetDeviceTime { time_secs }, options)
    }

    /// Set the device clock to the host's wall clock.
    pub fn sync_device_time(&self, options: &RequestOptions) -> Result<u32> {
        let now = now_secs();
        self.set_device_time(now, options)?;
        Ok(now)
    }

    pub fn get_battery(&self, options: &RequestOptions) -> Result<BatteryStatus> {
        match self.execute(
            &Command::GetBatteryAndStorage,
            Expect::Kind(ResponseKind::Battery),
            options,
        )? {
            Response::Battery(status) => Ok(status),
            other => Err(Error::UnexpectedResponse(other.kind())),
        }
    }

    /// Write the reboot command. The device does not answer it.
    pub fn reboot(&self) -> Result<()> {
        self.ensure_connected()?;
        let _gate = self.begin_command(&Command::Reboot)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------

    /// Send a direct message, timestamped with the host clock.
    ///
    /// `recipient` must hold at least the 6-byte key prefix; it is checked
    /// before anything is written.
    pub fn send_text_message(
        &self,
        recipient: &[u8],
        text: impl AsRef<[u8]>,
        options: &RequestOptions,
    ) -> Result<SentInfo> {
        let command = Command::send_text_message(recipient, text, now_secs())?;
        match self.execute(&command, Expect::Kind(ResponseKind::Sent), options)? {
            Response::Sent(info) => Ok(info),
            other => Err(Error::UnexpectedResponse(other.kind())),
        }
    }

    pub fn send_channel_message(
        &self,
        channel_idx: u8,
        text: impl AsRef<[u8]>,
        options: &RequestOptions,
    ) -> Result<()> {
        let command = Command::send_channel_text_message(channel_idx, text, now_secs());
        self.execute(&command, Expect::OneOf(CHANNEL_SEND_REPLIES), options)?;
        Ok(())
    }

    /// Pop the next message from the radio's offline queue; `None` once it is empty.
    pub fn sync_next_message(&self, options: &RequestOptions) -> Result<Option<IncomingMessage>> {
        match self.execute(
            &Command::SyncNextMessage,
            Expect::OneOf(SYNC_REPLIES),
            options,
        )? {
            Response::DirectMessage(msg) => Ok(Some(IncomingMessage::Direct(msg))),
            Response::ChannelMessage(msg) => Ok(Some(IncomingMessage::Channel(msg))),
            Response::NoMoreMessages => Ok(None),
            other => Err(Error::UnexpectedResponse(other.kind())),
        }
    }

    pub fn send_raw_data(&self, path: &[u8], payload: &[u8], options: &RequestOptions) -> Result<()> {
        let command = Command::send_raw_data(path, payload)?;
        self.execute_ok(&command, options)
    }

    /// Next pushed direct message, waiting up to `timeout`.
    ///
    /// Pushed messages are also broadcast as [`Event::DirectMessage`].
    pub fn next_direct_message(&self, timeout: Duration) -> Option<DirectMessage> {
        self.direct_rx.recv_timeout(timeout).ok()
    }

    pub fn try_next_direct_message(&self) -> Option<DirectMessage> {
        self.direct_rx.try_recv().ok()
    }

    /// Next pushed channel message, waiting up to `timeout`.
    pub fn next_channel_message(&self, timeout: Duration) -> Option<ChannelMessage> {
        self.channel_rx.recv_timeout(timeout).ok()
    }

    pub fn try_next_channel_message(&self) -> Option<ChannelMessage> {
        self.channel_rx.try_recv().ok()
    }

    /// Drop every pushed message still waiting in the pull queues.
    ///
    /// The queues are unbounded; a consumer that reads only [`Event`]s
    /// should call this now and then. Returns how many were dropped.
    pub fn discard_queued_messages(&self) -> usize {
        self.direct_rx.try_iter().count() + self.channel_rx.try_iter().count()
    }

    // ------------------------------------------------------------------
    // Contacts
    // ------------------------------------------------------------------

    /// Download the contact table, optionally only entries modified after `since`.
    ///
    /// Contact frames too short to decode are skipped. The deadline applies to
    /// each frame of the stream, not to the whole download.
    pub fn get_contacts(
        &self,
        since: Option<u32>,
        options: &RequestOptions,
    ) -> Result<Vec<ContactInfo>> {
        self.ensure_connected()?;
        let timeout = self.command_timeout(options);
        let cancel = options.cancel.as_ref();

        let _gate = self.begin_command(&Command::GetContacts { since })?;
        let total = match self.await_response(
            Expect::Kind(ResponseKind::ContactsStart),
            timeout,
            cancel,
        )? {
            Response::ContactsStart { total_count } => total_count as usize,
            other => return Err(Error::UnexpectedResponse(other.kind())),
        };

        let mut contacts = Vec::with_capacity(total.min(1024));
        loop {
            match self.await_response(Expect::OneOf(CONTACT_STREAM), timeout, cancel)? {
                Response::Contact(contact) => contacts.push(contact),
                Response::EndOfContacts { .. } => break,
                other => return Err(Error::UnexpectedResponse(other.kind())),
            }
        }
        if contacts.len() != total {
            debug!(total, received = contacts.len(), "contact count differs from announced total");
        }
        Ok(contacts)
    }

    pub fn get_contact_by_key(&self, public_key: &[u8], options: &RequestOptions) -> Result<ContactInfo> {
        let command = Command::get_contact_by_key(public_key)?;
        match self.execute(&command, Expect::Kind(ResponseKind::Contact), options)? {
            Response::Contact(contact) => Ok(contact),
            other => Err(Error::UnexpectedResponse(other.kind())),
        }
    }

    pub fn remove_contact(&self, public_key: &[u8], options: &RequestOptions) -> Result<()> {
        let command = Command::remove_contact(public_key)?;
        self.execute_ok(&command, options)
    }

    /// Forget the stored route to a contact so the next message floods.
    pub fn reset_path(&self, public_key: &[u8], options: &RequestOptions) -> Result<()> {
        let command = Command::reset_path(public_key)?;
        self.execute_ok(&command, options)
    }

    pub fn share_contact(&self, public_key: &[u8], options: &RequestOptions) -> Result<()> {
        let command = Command::share_contact(public_key)?;
        self.execute_ok(&command, options)
    }

    /// Export a contact as an advert blob; `None` exports this node.
    pub fn export_contact(
        &self,
        public_key: Option<&[u8]>,
        options: &RequestOptions,
    ) -> Result<Vec<u8>> {
        let command = Command::export_contact(public_key)?;
        match self.execute(&command, Expect::Kind(ResponseKind::ExportedContact), options)? {
            Response::ExportedContact { data } => Ok(data),
            other => Err(Error::UnexpectedResponse(other.kind())),
        }
    }

    // ------------------------------------------------------------------
    // Channels and adverts
    // ------------------------------------------------------------------

    pub fn get_channel(&self, index: u8, options: &RequestOptions) -> Result<ChannelInfo> {
        match self.execute(
            &Command::GetChannel { index },
            Expect::Kind(ResponseKind::Channel),
            options,
        )? {
            Response::Channel(info) => Ok(info),
            other => Err(Error::UnexpectedResponse(other.kind())),
        }
    }

    /// Configure channel slot `index`. Name and secret are padded or truncated
    /// to their fixed widths.
    pub fn set_channel(
        &self,
        index: u8,
        name: &str,
        secret: &[u8],
        options: &RequestOptions,
    ) -> Result<()> {
        self.execute_ok(&Command::set_channel(index, name, secret), options)
    }

    pub fn send_self_advert(&self, flood: bool, options: &RequestOptions) -> Result<()> {
        self.execute_ok(&Command::SendSelfAdvert { flood }, options)
    }

    pub fn set_advert_name(&self, name: &str, options: &RequestOptions) -> Result<()> {
        self.execute_ok(
            &Command::SetAdvertName {
                name: name.to_string(),
            },
            options,
        )
    }
}

impl Drop for Companion {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!(error = %e, "close on drop failed");
        }
    }
}
