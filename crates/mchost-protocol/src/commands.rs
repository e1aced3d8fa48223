//! Commands sent from the host to the companion radio.
//!
//! A [`Command`] is built once and encoded once. Constructors that take raw
//! byte slices validate their shape first, so encoding itself cannot fail.

use bytes::BufMut;

use crate::constants::*;
use crate::error::ValidationError;
use crate::types::*;

/// Commands that can be sent to the companion firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Query firmware details.
    DeviceQuery {
        /// Protocol version the host understands.
        app_version: u8,
    },

    /// Session handshake; answered with self info.
    AppStart {
        /// Reserved bytes, sent as zeros.
        reserved: [u8; 7],
        /// Host application name.
        app_name: String,
    },

    /// Send a text message to a contact.
    SendTextMessage {
        text_type: TextType,
        /// Retry attempt number.
        attempt: u8,
        timestamp: u32,
        recipient: PublicKeyPrefix,
        text: Vec<u8>,
    },

    /// Send a text message to a channel.
    SendChannelTextMessage {
        text_type: TextType,
        channel_idx: u8,
        timestamp: u32,
        text: Vec<u8>,
    },

    /// Stream the contact table, optionally only entries modified after `since`.
    GetContacts { since: Option<u32> },

    GetDeviceTime,

    SetDeviceTime { time_secs: u32 },

    /// Broadcast a self advert, flooded or zero-hop.
    SendSelfAdvert { flood: bool },

    SetAdvertName { name: String },

    AddUpdateContact { contact: ContactInfo },

    /// Pop the next queued message.
    SyncNextMessage,

    ResetPath { public_key: PublicKey },

    RemoveContact { public_key: PublicKey },

    ShareContact { public_key: PublicKey },

    GetContactByKey { public_key: PublicKey },

    /// Export a contact as an advert blob (`None` exports self).
    ExportContact { public_key: Option<PublicKey> },

    Reboot,

    GetBatteryAndStorage,

    SetRadioTxPower { power_dbm: u8 },

    /// Send a raw payload along an explicit path (empty path floods).
    SendRawData { path: RawPath, payload: Vec<u8> },

    GetChannel { index: u8 },

    SetChannel { channel: ChannelInfo },
}

impl Command {
    /// Handshake command carrying the host application name.
    pub fn app_start(app_name: impl Into<String>) -> Self {
        Command::AppStart {
            reserved: [0u8; 7],
            app_name: app_name.into(),
        }
    }

    pub fn device_query() -> Self {
        Command::DeviceQuery {
            app_version: APP_PROTOCOL_VERSION,
        }
    }

    /// Plain text message to the contact addressed by `recipient`.
    ///
    /// `recipient` may be a full key or a bare prefix; only its first 6 bytes
    /// go on the wire.
    pub fn send_text_message(
        recipient: &[u8],
        text: impl AsRef<[u8]>,
        timestamp: u32,
    ) -> Result<Self, ValidationError> {
        let recipient = PublicKeyPrefix::try_from_slice(recipient)?;
        Ok(Command::SendTextMessage {
            text_type: TextType::Plain,
            attempt: 0,
            timestamp,
            recipient,
            text: text.as_ref().to_vec(),
        })
    }

    /// Plain text message to channel slot `channel_idx`.
    pub fn send_channel_text_message(
        channel_idx: u8,
        text: impl AsRef<[u8]>,
        timestamp: u32,
    ) -> Self {
        Command::SendChannelTextMessage {
            text_type: TextType::Plain,
            channel_idx,
            timestamp,
            text: text.as_ref().to_vec(),
        }
    }

    pub fn remove_contact(public_key: &[u8]) -> Result<Self, ValidationError> {
        Ok(Command::RemoveContact {
            public_key: PublicKey::try_from_slice(public_key)?,
        })
    }

    pub fn reset_path(public_key: &[u8]) -> Result<Self, ValidationError> {
        Ok(Command::ResetPath {
            public_key: PublicKey::try_from_slice(public_key)?,
        })
    }

    pub fn share_contact(public_key: &[u8]) -> Result<Self, ValidationError> {
        Ok(Command::ShareContact {
            public_key: PublicKey::try_from_slice(public_key)?,
        })
    }

    pub fn get_contact_by_key(public_key: &[u8]) -> Result<Self, ValidationError> {
        Ok(Command::GetContactByKey {
            public_key: PublicKey::try_from_slice(public_key)?,
        })
    }

    pub fn export_contact(public_key: Option<&[u8]>) -> Result<Self, ValidationError> {
        let public_key = public_key.map(PublicKey::try_from_slice).transpose()?;
        Ok(Command::ExportContact { public_key })
    }

    /// Channel definition; `secret` is zero-padded or truncated to 16 bytes
    /// and `name` to 32.
    pub fn set_channel(index: u8, name: impl Into<String>, secret: &[u8]) -> Self {
        let mut fixed = [0u8; CHANNEL_SECRET_SIZE];
        let len = secret.len().min(CHANNEL_SECRET_SIZE);
        fixed[..len].copy_from_slice(&secret[..len]);
        Command::SetChannel {
            channel: ChannelInfo {
                index,
                name: name.into(),
                secret: fixed,
            },
        }
    }

    pub fn send_raw_data(path: &[u8], payload: &[u8]) -> Result<Self, ValidationError> {
        Ok(Command::SendRawData {
            path: RawPath::try_from_slice(path)?,
            payload: payload.to_vec(),
        })
    }

    /// The opcode this command is sent with.
    pub fn code(&self) -> u8 {
        match self {
            Command::DeviceQuery { .. } => CMD_DEVICE_QUERY,
            Command::AppStart { .. } => CMD_APP_START,
            Command::SendTextMessage { .. } => CMD_SEND_TXT_MSG,
            Command::SendChannelTextMessage { .. } => CMD_SEND_CHANNEL_TXT_MSG,
            Command::GetContacts { .. } => CMD_GET_CONTACTS,
            Command::GetDeviceTime => CMD_GET_DEVICE_TIME,
            Command::SetDeviceTime { .. } => CMD_SET_DEVICE_TIME,
            Command::SendSelfAdvert { .. } => CMD_SEND_SELF_ADVERT,
            Command::SetAdvertName { .. } => CMD_SET_ADVERT_NAME,
            Command::AddUpdateContact { .. } => CMD_ADD_UPDATE_CONTACT,
            Command::SyncNextMessage => CMD_SYNC_NEXT_MESSAGE,
            Command::ResetPath { .. } => CMD_RESET_PATH,
            Command::RemoveContact { .. } => CMD_REMOVE_CONTACT,
            Command::ShareContact { .. } => CMD_SHARE_CONTACT,
            Command::GetContactByKey { .. } => CMD_GET_CONTACT_BY_KEY,
            Command::ExportContact { .. } => CMD_EXPORT_CONTACT,
            Command::Reboot => CMD_REBOOT,
            Command::GetBatteryAndStorage => CMD_GET_BATT_AND_STORAGE,
            Command::SetRadioTxPower { .. } => CMD_SET_RADIO_TX_POWER,
            Command::SendRawData { .. } => CMD_SEND_RAW_DATA,
            Command::GetChannel { .. } => CMD_GET_CHANNEL,
            Command::SetChannel { .. } => CMD_SET_CHANNEL,
        }
    }

    /// Encode the command to its wire bytes (opcode first, integers little-endian).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.put_u8(self.code());

        match self {
            Command::DeviceQuery { app_version } => buf.put_u8(*app_version),

            Command::AppStart { reserved, app_name } => {
                buf.put_slice(reserved);
                buf.put_slice(app_name.as_bytes());
            }

            Command::SendTextMessage {
                text_type,
                attempt,
                timestamp,
                recipient,
                text,
            } => {
                buf.put_u8((*text_type).into());
                buf.put_u8(*attempt);
                buf.put_u32_le(*timestamp);
                buf.put_slice(recipient.as_bytes());
                buf.put_slice(text);
            }

            Command::SendChannelTextMessage {
                text_type,
                channel_idx,
                timestamp,
                text,
            } => {
                buf.put_u8((*text_type).into());
                buf.put_u8(*channel_idx);
                buf.put_u32_le(*timestamp);
                buf.put_slice(text);
            }

            Command::GetContacts { since } => {
                if let Some(since) = since {
                    buf.put_u32_le(*since);
                }
            }

            Command::SetDeviceTime { time_secs } => buf.put_u32_le(*time_secs),

            Command::SendSelfAdvert { flood } => buf.put_u8(u8::from(*flood)),

            Command::SetAdvertName { name } => buf.put_slice(name.as_bytes()),

            Command::AddUpdateContact { contact } => {
                buf.put_slice(contact.public_key.as_bytes());
                buf.put_u8(contact.contact_type);
                buf.put_u8(contact.flags);
                buf.put_i8(contact.out_path_len);
                buf.put_slice(&contact.out_path);
                put_fixed(&mut buf, contact.name.as_bytes(), NAME_FIELD_SIZE);
                buf.put_u32_le(contact.last_advert_timestamp);
                buf.put_i32_le(contact.gps_lat);
                buf.put_i32_le(contact.gps_lon);
                // lastmod is left to the radio's clock; a zero here would hide
                // the contact from `since`-filtered listings.
            }

            Command::ResetPath { public_key }
            | Command::RemoveContact { public_key }
            | Command::ShareContact { public_key }
            | Command::GetContactByKey { public_key } => buf.put_slice(public_key.as_bytes()),

            Command::ExportContact { public_key } => {
                if let Some(pk) = public_key {
                    buf.put_slice(pk.as_bytes());
                }
            }

            Command::Reboot => buf.put_slice(b"reboot"),

            Command::SetRadioTxPower { power_dbm } => buf.put_u8(*power_dbm),

            Command::SendRawData { path, payload } => {
                buf.put_u8(path.hop_count());
                buf.put_slice(path.as_bytes());
                buf.put_slice(payload);
            }

            Command::GetChannel { index } => buf.put_u8(*index),

            Command::SetChannel { channel } => {
                buf.put_u8(channel.index);
                put_fixed(&mut buf, channel.name.as_bytes(), NAME_FIELD_SIZE);
                buf.put_slice(&channel.secret);
            }

            Command::GetDeviceTime
            | Command::SyncNextMessage
            | Command::GetBatteryAndStorage => {}
        }

        buf
    }
}

/// Write `data` into a field of exactly `width` bytes, zero-padded or truncated.
fn put_fixed(buf: &mut Vec<u8>, data: &[u8], width: usize) {
    let len = data.len().min(width);
    buf.put_slice(&data[..len]);
    buf.put_bytes(0, width - len);
}
