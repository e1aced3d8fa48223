//! Frames received from the companion firmware.
//!
//! Every frame kind has a minimum length; anything shorter yields `None`.
//! Fields past the minimum are read only if present and otherwise take
//! zero/empty defaults, so replies from older firmware still decode.

use bytes::Buf;

use crate::constants::*;
use crate::error::FirmwareErrorCode;
use crate::types::*;

/// The kind of a [`Response`], used to match replies to waiting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Ok,
    Err,
    ContactsStart,
    Contact,
    EndOfContacts,
    SelfInfo,
    Sent,
    DirectMessage,
    ChannelMessage,
    CurrentTime,
    NoMoreMessages,
    ExportedContact,
    Battery,
    DeviceInfo,
    Disabled,
    Channel,
}

/// Solicited responses received from the companion firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,

    /// The firmware rejected the last command.
    Err(FirmwareErrorCode),

    ContactsStart {
        total_count: u32,
    },

    Contact(ContactInfo),

    EndOfContacts {
        most_recent_lastmod: u32,
    },

    /// Reply to the handshake.
    SelfInfo(SelfInfo),

    Sent(SentInfo),

    /// A queued direct message (V2 or V3 by opcode).
    DirectMessage(DirectMessage),

    /// A queued channel message (V2 or V3 by opcode).
    ChannelMessage(ChannelMessage),

    CurrentTime {
        time_secs: u32,
    },

    NoMoreMessages,

    ExportedContact {
        data: Vec<u8>,
    },

    Battery(BatteryStatus),

    DeviceInfo(DeviceInfo),

    /// The feature is disabled on this firmware.
    Disabled,

    Channel(ChannelInfo),
}

impl Response {
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::Ok => ResponseKind::Ok,
            Response::Err(_) => ResponseKind::Err,
            Response::ContactsStart { .. } => ResponseKind::ContactsStart,
            Response::Contact(_) => ResponseKind::Contact,
            Response::EndOfContacts { .. } => ResponseKind::EndOfContacts,
            Response::SelfInfo(_) => ResponseKind::SelfInfo,
            Response::Sent(_) => ResponseKind::Sent,
            Response::DirectMessage(_) => ResponseKind::DirectMessage,
            Response::ChannelMessage(_) => ResponseKind::ChannelMessage,
            Response::CurrentTime { .. } => ResponseKind::CurrentTime,
            Response::NoMoreMessages => ResponseKind::NoMoreMessages,
            Response::ExportedContact { .. } => ResponseKind::ExportedContact,
            Response::Battery(_) => ResponseKind::Battery,
            Response::DeviceInfo(_) => ResponseKind::DeviceInfo,
            Response::Disabled => ResponseKind::Disabled,
            Response::Channel(_) => ResponseKind::Channel,
        }
    }

    /// Minimum frame length (opcode included) for a response opcode, or
    /// `None` if the opcode is not a known response.
    pub fn min_len(code: u8) -> Option<usize> {
        let len = match code {
            RESP_CODE_OK | RESP_CODE_ERR | RESP_CODE_NO_MORE_MESSAGES | RESP_CODE_DISABLED => 1,
            RESP_CODE_CONTACTS_START | RESP_CODE_END_OF_CONTACTS | RESP_CODE_EXPORT_CONTACT => 1,
            // key + type + flags + path_len + path + name + last advert
            RESP_CODE_CONTACT => 1 + PUB_KEY_SIZE + 3 + CONTACT_PATH_SIZE + NAME_FIELD_SIZE + 4,
            // advert type + tx power + max tx power + key
            RESP_CODE_SELF_INFO => 1 + 3 + PUB_KEY_SIZE,
            RESP_CODE_SENT => 1 + 1 + 4,
            RESP_CODE_CONTACT_MSG_RECV => 1 + DIRECT_HEADER_LEN,
            RESP_CODE_CONTACT_MSG_RECV_V3 => 1 + 3 + DIRECT_HEADER_LEN,
            RESP_CODE_CHANNEL_MSG_RECV => 1 + CHANNEL_HEADER_LEN,
            RESP_CODE_CHANNEL_MSG_RECV_V3 => 1 + 3 + CHANNEL_HEADER_LEN,
            RESP_CODE_CURR_TIME => 1 + 4,
            RESP_CODE_BATT_AND_STORAGE => 1 + 2,
            RESP_CODE_DEVICE_INFO => 1 + 1,
            RESP_CODE_CHANNEL_INFO => 1 + 1 + NAME_FIELD_SIZE,
            _ => return None,
        };
        Some(len)
    }

    /// Decode a solicited response frame.
    ///
    /// Returns `None` for an empty frame, an unknown opcode, or a frame shorter
    /// than its kind's minimum length.
    pub fn decode(frame: &[u8]) -> Option<Self> {
        let (&code, body) = frame.split_first()?;
        let min = Self::min_len(code)?;
        if frame.len() < min {
            log::trace!(
                "dropping response 0x{:02X}: {} bytes, need {}",
                code,
                frame.len(),
                min
            );
            return None;
        }

        let mut r = FieldReader::new(body);
        let response = match code {
            RESP_CODE_OK => Response::Ok,
            RESP_CODE_ERR => Response::Err(FirmwareErrorCode::from(r.u8())),
            RESP_CODE_CONTACTS_START => Response::ContactsStart {
                total_count: r.u32_le(),
            },
            RESP_CODE_CONTACT => Response::Contact(decode_contact(&mut r)),
            RESP_CODE_END_OF_CONTACTS => Response::EndOfContacts {
                most_recent_lastmod: r.u32_le(),
            },
            RESP_CODE_SELF_INFO => Response::SelfInfo(decode_self_info(&mut r)),
            RESP_CODE_SENT => Response::Sent(SentInfo {
                is_flood: r.u8() != 0,
                expected_ack: r.u32_le(),
                est_timeout_ms: r.u32_le(),
            }),
            RESP_CODE_CONTACT_MSG_RECV => {
                Response::DirectMessage(decode_direct_message(&mut r, WireGeneration::V2))
            }
            RESP_CODE_CONTACT_MSG_RECV_V3 => {
                Response::DirectMessage(decode_direct_message(&mut r, WireGeneration::V3))
            }
            RESP_CODE_CHANNEL_MSG_RECV => {
                Response::ChannelMessage(decode_channel_message(&mut r, WireGeneration::V2))
            }
            RESP_CODE_CHANNEL_MSG_RECV_V3 => {
                Response::ChannelMessage(decode_channel_message(&mut r, WireGeneration::V3))
            }
            RESP_CODE_CURR_TIME => Response::CurrentTime {
                time_secs: r.u32_le(),
            },
            RESP_CODE_NO_MORE_MESSAGES => Response::NoMoreMessages,
            RESP_CODE_EXPORT_CONTACT => Response::ExportedContact {
                data: r.rest().to_vec(),
            },
            RESP_CODE_BATT_AND_STORAGE => Response::Battery(BatteryStatus {
                battery_millivolts: r.u16_le(),
                storage_used_kb: r.u32_le(),
                storage_total_kb: r.u32_le(),
            }),
            RESP_CODE_DEVICE_INFO => Response::DeviceInfo(decode_device_info(&mut r)),
            RESP_CODE_DISABLED => Response::Disabled,
            RESP_CODE_CHANNEL_INFO => Response::Channel(ChannelInfo {
                index: r.u8(),
                name: r.fixed_str(NAME_FIELD_SIZE),
                secret: r.array(),
            }),
            _ => return None,
        };
        Some(response)
    }
}

/// Push notifications from the firmware (unsolicited).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Push {
    /// An advert was heard from `public_key`.
    Advert { public_key: PublicKey },

    PathUpdated { public_key: PublicKey },

    /// A previously sent message was acknowledged.
    SendConfirmed { ack_hash: u32, trip_time_ms: u32 },

    /// Messages are waiting in the radio's offline queue.
    MessageWaiting,

    RawData {
        /// SNR scaled by 4.
        snr_x4: i8,
        rssi: i8,
        payload: Vec<u8>,
    },

    /// Raw over-the-air packet log.
    LogRxData { snr_x4: i8, rssi: i8, raw: Vec<u8> },

    DirectMessage(DirectMessage),

    ChannelMessage(ChannelMessage),
}

impl Push {
    /// Minimum frame length for a push opcode, keyed by the opcode with the
    /// push bit stripped.
    pub fn min_len(code: u8) -> Option<usize> {
        let len = match code | PUSH_FLAG {
            PUSH_CODE_ADVERT | PUSH_CODE_PATH_UPDATED => 1 + PUB_KEY_SIZE,
            PUSH_CODE_SEND_CONFIRMED => 1 + 4,
            PUSH_CODE_MSG_WAITING => 1,
            PUSH_CODE_RAW_DATA => 1 + 3,
            PUSH_CODE_LOG_RX_DATA => 1 + 2,
            PUSH_CODE_CONTACT_MSG_RECV_V3 => 1 + 3 + DIRECT_HEADER_LEN,
            PUSH_CODE_CHANNEL_MSG_RECV_V3 => 1 + 3 + CHANNEL_HEADER_LEN,
            _ => return None,
        };
        Some(len)
    }

    /// Decode a push frame. Returns `None` for unknown or short frames.
    pub fn decode(frame: &[u8]) -> Option<Self> {
        let (&code, body) = frame.split_first()?;
        let min = Self::min_len(code)?;
        if frame.len() < min {
            log::trace!(
                "dropping push 0x{:02X}: {} bytes, need {}",
                code,
                frame.len(),
                min
            );
            return None;
        }

        let mut r = FieldReader::new(body);
        let push = match code | PUSH_FLAG {
            PUSH_CODE_ADVERT => Push::Advert {
                public_key: PublicKey(r.array()),
            },
            PUSH_CODE_PATH_UPDATED => Push::PathUpdated {
                public_key: PublicKey(r.array()),
            },
            PUSH_CODE_SEND_CONFIRMED => Push::SendConfirmed {
                ack_hash: r.u32_le(),
                trip_time_ms: r.u32_le(),
            },
            PUSH_CODE_MSG_WAITING => Push::MessageWaiting,
            PUSH_CODE_RAW_DATA => {
                let snr_x4 = r.i8();
                let rssi = r.i8();
                r.skip(1); // reserved
                Push::RawData {
                    snr_x4,
                    rssi,
                    payload: r.rest().to_vec(),
                }
            }
            PUSH_CODE_LOG_RX_DATA => Push::LogRxData {
                snr_x4: r.i8(),
                rssi: r.i8(),
                raw: r.rest().to_vec(),
            },
            PUSH_CODE_CONTACT_MSG_RECV_V3 => {
                Push::DirectMessage(decode_direct_message(&mut r, WireGeneration::V3))
            }
            PUSH_CODE_CHANNEL_MSG_RECV_V3 => {
                Push::ChannelMessage(decode_channel_message(&mut r, WireGeneration::V3))
            }
            _ => return None,
        };
        Some(push)
    }
}

/// A classified frame: solicited response or unsolicited push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Response(Response),
    Push(Push),
}

impl Message {
    /// Classify by the push bit, then decode.
    pub fn decode(frame: &[u8]) -> Option<Self> {
        let code = *frame.first()?;
        if is_push_code(code) {
            Push::decode(frame).map(Message::Push)
        } else {
            Response::decode(frame).map(Message::Response)
        }
    }
}

/// Direct messages pushed live use the V3 message opcode with bit 7 set.
const PUSH_CODE_CONTACT_MSG_RECV_V3: u8 = RESP_CODE_CONTACT_MSG_RECV_V3 | PUSH_FLAG;
/// Channel messages pushed live use the V3 message opcode with bit 7 set.
const PUSH_CODE_CHANNEL_MSG_RECV_V3: u8 = RESP_CODE_CHANNEL_MSG_RECV_V3 | PUSH_FLAG;

/// prefix + path_len + text_type + timestamp
const DIRECT_HEADER_LEN: usize = PUB_KEY_PREFIX_SIZE + 1 + 1 + 4;
/// channel + path_len + text_type + timestamp
const CHANNEL_HEADER_LEN: usize = 1 + 1 + 1 + 4;

/// Separator between sender name and text in channel message bodies.
const SENDER_SEPARATOR: &[u8] = b": ";

// ============================================================================
// Field decoding
// ============================================================================

/// Cursor over a frame body whose reads yield zero/empty once input runs out.
struct FieldReader<'a> {
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        FieldReader { buf }
    }

    fn u8(&mut self) -> u8 {
        if self.buf.has_remaining() {
            self.buf.get_u8()
        } else {
            0
        }
    }

    fn i8(&mut self) -> i8 {
        self.u8() as i8
    }

    fn u16_le(&mut self) -> u16 {
        if self.buf.remaining() >= 2 {
            self.buf.get_u16_le()
        } else {
            self.buf = &[];
            0
        }
    }

    fn u32_le(&mut self) -> u32 {
        if self.buf.remaining() >= 4 {
            self.buf.get_u32_le()
        } else {
            self.buf = &[];
            0
        }
    }

    fn i32_le(&mut self) -> i32 {
        self.u32_le() as i32
    }

    fn skip(&mut self, n: usize) {
        self.take(n);
    }

    /// Up to `n` bytes; fewer if the frame ends early.
    fn take(&mut self, n: usize) -> &'a [u8] {
        let (head, tail) = self.buf.split_at(n.min(self.buf.len()));
        self.buf = tail;
        head
    }

    /// A fixed-width array, zero-filled where the frame ends early.
    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        let src = self.take(N);
        out[..src.len()].copy_from_slice(src);
        out
    }

    /// A fixed-width, optionally NUL-terminated string field.
    fn fixed_str(&mut self, width: usize) -> String {
        c_string(self.take(width))
    }

    fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.buf)
    }
}

/// Bytes before the first NUL, or the whole field when there is none.
fn c_string(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn decode_contact(r: &mut FieldReader<'_>) -> ContactInfo {
    ContactInfo {
        public_key: PublicKey(r.array()),
        contact_type: r.u8(),
        flags: r.u8(),
        out_path_len: r.i8(),
        out_path: r.array(),
        name: r.fixed_str(NAME_FIELD_SIZE),
        last_advert_timestamp: r.u32_le(),
        gps_lat: r.i32_le(),
        gps_lon: r.i32_le(),
        lastmod: r.u32_le(),
    }
}

fn decode_self_info(r: &mut FieldReader<'_>) -> SelfInfo {
    SelfInfo {
        advert_type: r.u8(),
        tx_power_dbm: r.u8(),
        max_tx_power_dbm: r.u8(),
        public_key: PublicKey(r.array()),
        gps_lat: r.i32_le(),
        gps_lon: r.i32_le(),
        multi_acks: r.u8(),
        advert_loc_policy: r.u8(),
        telemetry_modes: r.u8(),
        manual_add_contacts: r.u8(),
        freq_khz: r.u32_le(),
        bandwidth_hz: r.u32_le(),
        spreading_factor: r.u8(),
        coding_rate: r.u8(),
        node_name: c_string(r.rest()),
    }
}

fn decode_device_info(r: &mut FieldReader<'_>) -> DeviceInfo {
    DeviceInfo {
        firmware_version_code: r.u8(),
        max_contacts_half: r.u8(),
        max_group_channels: r.u8(),
        ble_pin: r.u32_le(),
        build_date: r.fixed_str(12),
        manufacturer: r.fixed_str(40),
        firmware_version: r.fixed_str(20),
    }
}

fn decode_direct_message(r: &mut FieldReader<'_>, generation: WireGeneration) -> DirectMessage {
    let snr_x4 = match generation {
        WireGeneration::V2 => None,
        WireGeneration::V3 => {
            let snr = r.i8();
            r.skip(2); // reserved
            Some(snr)
        }
    };
    let sender_prefix = PublicKeyPrefix(r.array());
    let path_len = r.u8();
    let text_type = TextType::from(r.u8());
    let timestamp = r.u32_le();
    let extra = if text_type == TextType::SignedPlain {
        r.take(4).to_vec()
    } else {
        Vec::new()
    };

    DirectMessage {
        generation,
        sender_prefix,
        path_len,
        text_type,
        timestamp,
        snr_x4,
        extra,
        text: String::from_utf8_lossy(r.rest()).into_owned(),
    }
}

fn decode_channel_message(r: &mut FieldReader<'_>, generation: WireGeneration) -> ChannelMessage {
    let snr_x4 = match generation {
        WireGeneration::V2 => None,
        WireGeneration::V3 => {
            let snr = r.i8();
            r.skip(2); // reserved
            Some(snr)
        }
    };
    let channel_idx = r.u8();
    let path_len = r.u8();
    let text_type = TextType::from(r.u8());
    let timestamp = r.u32_le();
    let (sender, text) = split_sender(r.rest());

    ChannelMessage {
        generation,
        channel_idx,
        path_len,
        text_type,
        timestamp,
        snr_x4,
        sender,
        text,
    }
}

/// Split `"<sender>: <text>"` at the first `": "`; without one, all of it is text.
fn split_sender(body: &[u8]) -> (Option<String>, String) {
    match body
        .windows(SENDER_SEPARATOR.len())
        .position(|w| w == SENDER_SEPARATOR)
    {
        Some(at) => (
            Some(String::from_utf8_lossy(&body[..at]).into_owned()),
            String::from_utf8_lossy(&body[at + SENDER_SEPARATOR.len()..]).into_owned(),
        ),
        None => (None, String::from_utf8_lossy(body).into_owned()),
    }
}
