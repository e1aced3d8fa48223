//! Notifications broadcast by the engine.

use crossbeam_channel::{unbounded, Receiver, Sender};
use mchost_protocol::{ChannelMessage, DirectMessage, PublicKey, SelfInfo};
use parking_lot::Mutex;

/// Everything a subscriber can observe.
///
/// Direct and channel messages are delivered here *and* queued for
/// [`Companion::next_direct_message`](crate::Companion::next_direct_message) /
/// [`Companion::next_channel_message`](crate::Companion::next_channel_message).
/// The two paths are not deduplicated: a consumer reading both sees each
/// message twice.
///
/// The pull queues are unbounded and keep every pushed message until it is
/// read, so an events-only consumer should empty them with
/// [`Companion::discard_queued_messages`](crate::Companion::discard_queued_messages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The handshake completed.
    Connected(SelfInfo),
    /// Fired once per successful `close`.
    Disconnected,
    /// The link failed underneath the session.
    Error(String),
    DirectMessage(DirectMessage),
    ChannelMessage(ChannelMessage),
    Advert(PublicKey),
    PathUpdated(PublicKey),
    SendConfirmed { ack_hash: u32, trip_time_ms: u32 },
    MessageWaiting,
    RawData { snr_x4: i8, rssi: i8, payload: Vec<u8> },
    LogRxData { snr_x4: i8, rssi: i8, raw: Vec<u8> },
    /// Exact command bytes handed to the transport (before any framing).
    PacketSent(Vec<u8>),
    /// Exact bytes of every deframed inbound frame, decodable or not.
    PacketReceived(Vec<u8>),
}

/// Fan-out to any number of subscribers.
///
/// Each subscriber gets its own unbounded channel. Events published before a
/// subscription are not replayed; subscribers whose receiver was dropped are
/// pruned on the next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<Event>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.lock().is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
