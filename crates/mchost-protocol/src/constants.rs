//! Opcode registry and protocol sizes.
//!
//! Byte values are fixed by the companion protocol and must not change.

// ============================================================================
// Command Codes (host → radio)
// ============================================================================

/// Handshake: start the app session, answered with `RESP_CODE_SELF_INFO`.
pub const CMD_APP_START: u8 = 0x01;
/// Send a direct text message to a contact.
pub const CMD_SEND_TXT_MSG: u8 = 0x02;
/// Send a text message to a channel.
pub const CMD_SEND_CHANNEL_TXT_MSG: u8 = 0x03;
/// Stream the contact table.
pub const CMD_GET_CONTACTS: u8 = 0x04;
pub const CMD_GET_DEVICE_TIME: u8 = 0x05;
pub const CMD_SET_DEVICE_TIME: u8 = 0x06;
pub const CMD_SEND_SELF_ADVERT: u8 = 0x07;
pub const CMD_SET_ADVERT_NAME: u8 = 0x08;
pub const CMD_ADD_UPDATE_CONTACT: u8 = 0x09;
/// Pop the next message from the radio's offline queue.
pub const CMD_SYNC_NEXT_MESSAGE: u8 = 0x0A;
pub const CMD_SET_RADIO_PARAMS: u8 = 0x0B;
pub const CMD_SET_RADIO_TX_POWER: u8 = 0x0C;
pub const CMD_RESET_PATH: u8 = 0x0D;
pub const CMD_SET_ADVERT_LATLON: u8 = 0x0E;
pub const CMD_REMOVE_CONTACT: u8 = 0x0F;
pub const CMD_SHARE_CONTACT: u8 = 0x10;
pub const CMD_EXPORT_CONTACT: u8 = 0x11;
pub const CMD_IMPORT_CONTACT: u8 = 0x12;
pub const CMD_REBOOT: u8 = 0x13;
pub const CMD_GET_BATT_AND_STORAGE: u8 = 0x14;
pub const CMD_SET_TUNING_PARAMS: u8 = 0x15;
/// Query firmware/device information.
pub const CMD_DEVICE_QUERY: u8 = 0x16;
pub const CMD_EXPORT_PRIVATE_KEY: u8 = 0x17;
pub const CMD_IMPORT_PRIVATE_KEY: u8 = 0x18;
pub const CMD_SEND_RAW_DATA: u8 = 0x19;
pub const CMD_SEND_LOGIN: u8 = 0x1A;
pub const CMD_SEND_STATUS_REQ: u8 = 0x1B;
pub const CMD_HAS_CONNECTION: u8 = 0x1C;
pub const CMD_LOGOUT: u8 = 0x1D;
pub const CMD_GET_CONTACT_BY_KEY: u8 = 0x1E;
pub const CMD_GET_CHANNEL: u8 = 0x1F;
pub const CMD_SET_CHANNEL: u8 = 0x20;

// ============================================================================
// Response Codes (radio → host, solicited)
// ============================================================================

pub const RESP_CODE_OK: u8 = 0x00;
/// Error reply; optionally followed by a firmware error code byte.
pub const RESP_CODE_ERR: u8 = 0x01;
pub const RESP_CODE_CONTACTS_START: u8 = 0x02;
pub const RESP_CODE_CONTACT: u8 = 0x03;
pub const RESP_CODE_END_OF_CONTACTS: u8 = 0x04;
/// Handshake reply to `CMD_APP_START`.
pub const RESP_CODE_SELF_INFO: u8 = 0x05;
/// Direct message, first wire generation.
pub const RESP_CODE_CONTACT_MSG_RECV: u8 = 0x06;
/// Message accepted for transmission.
pub const RESP_CODE_SENT: u8 = 0x07;
/// Channel message, first wire generation.
pub const RESP_CODE_CHANNEL_MSG_RECV: u8 = 0x08;
pub const RESP_CODE_CURR_TIME: u8 = 0x09;
pub const RESP_CODE_NO_MORE_MESSAGES: u8 = 0x0A;
pub const RESP_CODE_EXPORT_CONTACT: u8 = 0x0B;
pub const RESP_CODE_BATT_AND_STORAGE: u8 = 0x0C;
pub const RESP_CODE_DEVICE_INFO: u8 = 0x0D;
pub const RESP_CODE_PRIVATE_KEY: u8 = 0x0E;
pub const RESP_CODE_DISABLED: u8 = 0x0F;
/// Direct message, second wire generation (adds SNR).
pub const RESP_CODE_CONTACT_MSG_RECV_V3: u8 = 0x10;
/// Channel message, second wire generation (adds SNR).
pub const RESP_CODE_CHANNEL_MSG_RECV_V3: u8 = 0x11;
pub const RESP_CODE_CHANNEL_INFO: u8 = 0x12;

// ============================================================================
// Push Codes (radio → host, unsolicited)
// ============================================================================

/// Bit that marks an opcode as an unsolicited push.
pub const PUSH_FLAG: u8 = 0x80;

pub const PUSH_CODE_ADVERT: u8 = 0x80;
pub const PUSH_CODE_PATH_UPDATED: u8 = 0x81;
pub const PUSH_CODE_SEND_CONFIRMED: u8 = 0x82;
pub const PUSH_CODE_MSG_WAITING: u8 = 0x83;
pub const PUSH_CODE_RAW_DATA: u8 = 0x84;
pub const PUSH_CODE_LOGIN_SUCCESS: u8 = 0x85;
pub const PUSH_CODE_LOGIN_FAIL: u8 = 0x86;
pub const PUSH_CODE_STATUS_RESPONSE: u8 = 0x87;
pub const PUSH_CODE_LOG_RX_DATA: u8 = 0x88;

/// Returns `true` if `code` is a push opcode.
#[inline]
pub fn is_push_code(code: u8) -> bool {
    code & PUSH_FLAG != 0
}

// ============================================================================
// Error Codes (payload of RESP_CODE_ERR)
// ============================================================================

pub const ERR_CODE_UNSUPPORTED_CMD: u8 = 1;
pub const ERR_CODE_NOT_FOUND: u8 = 2;
pub const ERR_CODE_TABLE_FULL: u8 = 3;
pub const ERR_CODE_BAD_STATE: u8 = 4;
pub const ERR_CODE_FILE_IO_ERROR: u8 = 5;
pub const ERR_CODE_ILLEGAL_ARG: u8 = 6;

// ============================================================================
// Text and Advert Types
// ============================================================================

pub const TXT_TYPE_PLAIN: u8 = 0;
pub const TXT_TYPE_CLI_DATA: u8 = 1;
pub const TXT_TYPE_SIGNED_PLAIN: u8 = 2;

pub const ADV_TYPE_CHAT: u8 = 1;
pub const ADV_TYPE_REPEATER: u8 = 2;
pub const ADV_TYPE_ROOM_SERVER: u8 = 3;

// ============================================================================
// Sizes
// ============================================================================

/// Size of a public key in bytes.
pub const PUB_KEY_SIZE: usize = 32;
/// Size of the public key prefix used to address contacts on the wire.
pub const PUB_KEY_PREFIX_SIZE: usize = 6;
/// Fixed width of contact and channel name fields.
pub const NAME_FIELD_SIZE: usize = 32;
/// Fixed width of a channel secret.
pub const CHANNEL_SECRET_SIZE: usize = 16;
/// Fixed width of the outbound path stored with a contact.
pub const CONTACT_PATH_SIZE: usize = 16;
/// Protocol version advertised in `CMD_DEVICE_QUERY`.
pub const APP_PROTOCOL_VERSION: u8 = 3;
