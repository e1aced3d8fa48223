//! Value types carried by commands, responses and pushes.

use crate::constants::*;
use crate::error::ValidationError;

/// A 32-byte public key identifying a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicKey(pub [u8; PUB_KEY_SIZE]);

impl PublicKey {
    /// Build a key from a slice that must be exactly 32 bytes long.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, ValidationError> {
        let bytes: [u8; PUB_KEY_SIZE] =
            slice
                .try_into()
                .map_err(|_| ValidationError::InvalidKeyLength {
                    expected: PUB_KEY_SIZE,
                    actual: slice.len(),
                })?;
        Ok(PublicKey(bytes))
    }

    /// The 6-byte routing prefix of this key.
    ///
    /// A prefix only routes a frame; it never proves who sent it.
    pub fn prefix(&self) -> PublicKeyPrefix {
        PublicKeyPrefix::from(self)
    }

    pub fn as_bytes(&self) -> &[u8; PUB_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The first 6 bytes of a public key, used to address contacts on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicKeyPrefix(pub [u8; PUB_KEY_PREFIX_SIZE]);

impl PublicKeyPrefix {
    /// Take the prefix from a slice of at least 6 bytes (a full key is fine).
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, ValidationError> {
        if slice.len() < PUB_KEY_PREFIX_SIZE {
            return Err(ValidationError::PrefixTooShort {
                expected: PUB_KEY_PREFIX_SIZE,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; PUB_KEY_PREFIX_SIZE];
        bytes.copy_from_slice(&slice[..PUB_KEY_PREFIX_SIZE]);
        Ok(PublicKeyPrefix(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; PUB_KEY_PREFIX_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check whether `key` starts with this prefix.
    pub fn matches(&self, key: &PublicKey) -> bool {
        key.0[..PUB_KEY_PREFIX_SIZE] == self.0
    }
}

impl From<&PublicKey> for PublicKeyPrefix {
    fn from(key: &PublicKey) -> Self {
        let mut prefix = [0u8; PUB_KEY_PREFIX_SIZE];
        prefix.copy_from_slice(&key.0[..PUB_KEY_PREFIX_SIZE]);
        PublicKeyPrefix(prefix)
    }
}

impl std::fmt::Display for PublicKeyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Explicit route for a raw packet, at most 255 hops. Empty floods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RawPath(Vec<u8>);

impl RawPath {
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, ValidationError> {
        if u8::try_from(slice.len()).is_err() {
            return Err(ValidationError::PathTooLong {
                max: u8::MAX as usize,
                actual: slice.len(),
            });
        }
        Ok(RawPath(slice.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length byte sent ahead of the path.
    pub fn hop_count(&self) -> u8 {
        // Capped at construction.
        self.0.len() as u8
    }

    pub fn is_flood(&self) -> bool {
        self.0.is_empty()
    }
}

/// A contact stored on the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInfo {
    pub public_key: PublicKey,
    /// Chat, repeater or room server (`ADV_TYPE_*`).
    pub contact_type: u8,
    pub flags: u8,
    /// Outbound path length; negative when unknown (flood).
    pub out_path_len: i8,
    pub out_path: [u8; CONTACT_PATH_SIZE],
    pub name: String,
    pub last_advert_timestamp: u32,
    /// Latitude in microdegrees.
    pub gps_lat: i32,
    /// Longitude in microdegrees.
    pub gps_lon: i32,
    pub lastmod: u32,
}

impl Default for ContactInfo {
    fn default() -> Self {
        ContactInfo {
            public_key: PublicKey::default(),
            contact_type: ADV_TYPE_CHAT,
            flags: 0,
            out_path_len: -1,
            out_path: [0u8; CONTACT_PATH_SIZE],
            name: String::new(),
            last_advert_timestamp: 0,
            gps_lat: 0,
            gps_lon: 0,
            lastmod: 0,
        }
    }
}

impl ContactInfo {
    pub fn latitude(&self) -> f64 {
        self.gps_lat as f64 / 1_000_000.0
    }

    pub fn longitude(&self) -> f64 {
        self.gps_lon as f64 / 1_000_000.0
    }

    /// Check if the contact has a known direct path.
    pub fn has_direct_path(&self) -> bool {
        self.out_path_len >= 0
    }
}

/// A group channel slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelInfo {
    pub index: u8,
    pub name: String,
    /// 128-bit channel secret.
    pub secret: [u8; CHANNEL_SECRET_SIZE],
}

/// Identity and radio settings reported by the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfInfo {
    pub advert_type: u8,
    pub tx_power_dbm: u8,
    pub max_tx_power_dbm: u8,
    pub public_key: PublicKey,
    pub gps_lat: i32,
    pub gps_lon: i32,
    pub multi_acks: u8,
    pub advert_loc_policy: u8,
    pub telemetry_modes: u8,
    pub manual_add_contacts: u8,
    /// Radio frequency in kHz.
    pub freq_khz: u32,
    /// Radio bandwidth in Hz.
    pub bandwidth_hz: u32,
    pub spreading_factor: u8,
    pub coding_rate: u8,
    pub node_name: String,
}

impl SelfInfo {
    pub fn frequency_mhz(&self) -> f64 {
        self.freq_khz as f64 / 1000.0
    }

    pub fn bandwidth_khz(&self) -> f64 {
        self.bandwidth_hz as f64 / 1000.0
    }
}

/// Firmware details returned by `CMD_DEVICE_QUERY`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub firmware_version_code: u8,
    /// Maximum contacts divided by two.
    pub max_contacts_half: u8,
    pub max_group_channels: u8,
    pub ble_pin: u32,
    pub build_date: String,
    pub manufacturer: String,
    pub firmware_version: String,
}

impl DeviceInfo {
    pub fn max_contacts(&self) -> usize {
        (self.max_contacts_half as usize) * 2
    }
}

/// Battery voltage and, on newer firmware, storage usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatteryStatus {
    pub battery_millivolts: u16,
    pub storage_used_kb: u32,
    pub storage_total_kb: u32,
}

impl BatteryStatus {
    pub fn battery_volts(&self) -> f32 {
        self.battery_millivolts as f32 / 1000.0
    }
}

/// Acknowledgement that a message was queued for transmission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentInfo {
    pub is_flood: bool,
    /// ACK hash later echoed by a `SendConfirmed` push.
    pub expected_ack: u32,
    pub est_timeout_ms: u32,
}

/// Text encoding of a message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextType {
    #[default]
    Plain,
    CliData,
    SignedPlain,
    Unknown(u8),
}

impl From<u8> for TextType {
    fn from(value: u8) -> Self {
        match value {
            TXT_TYPE_PLAIN => TextType::Plain,
            TXT_TYPE_CLI_DATA => TextType::CliData,
            TXT_TYPE_SIGNED_PLAIN => TextType::SignedPlain,
            _ => TextType::Unknown(value),
        }
    }
}

impl From<TextType> for u8 {
    fn from(value: TextType) -> Self {
        match value {
            TextType::Plain => TXT_TYPE_PLAIN,
            TextType::CliData => TXT_TYPE_CLI_DATA,
            TextType::SignedPlain => TXT_TYPE_SIGNED_PLAIN,
            TextType::Unknown(v) => v,
        }
    }
}

/// Wire generation of a message frame, fixed by its opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireGeneration {
    /// No SNR byte.
    V2,
    /// Leading SNR byte plus two reserved bytes.
    V3,
}

/// A direct (contact-to-contact) text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessage {
    pub generation: WireGeneration,
    pub sender_prefix: PublicKeyPrefix,
    /// Path length (0xFF = flood).
    pub path_len: u8,
    pub text_type: TextType,
    pub timestamp: u32,
    /// SNR scaled by 4; only carried by V3 frames.
    pub snr_x4: Option<i8>,
    /// Signature prefix for signed messages.
    pub extra: Vec<u8>,
    pub text: String,
}

impl DirectMessage {
    pub fn snr(&self) -> Option<f32> {
        self.snr_x4.map(|s| s as f32 / 4.0)
    }

    pub fn is_flood(&self) -> bool {
        self.path_len == 0xFF
    }
}

/// A group channel text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub generation: WireGeneration,
    pub channel_idx: u8,
    pub path_len: u8,
    pub text_type: TextType,
    pub timestamp: u32,
    pub snr_x4: Option<i8>,
    /// Sender name embedded before the `": "` separator, if any.
    pub sender: Option<String>,
    pub text: String,
}

impl ChannelMessage {
    pub fn snr(&self) -> Option<f32> {
        self.snr_x4.map(|s| s as f32 / 4.0)
    }

    pub fn is_flood(&self) -> bool {
        self.path_len == 0xFF
    }
}

/// Either kind of received text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingMessage {
    Direct(DirectMessage),
    Channel(ChannelMessage),
}
