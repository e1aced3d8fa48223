//! MeshCore Companion Protocol Codec
//!
//! This crate provides the byte-level half of talking to a MeshCore companion
//! radio from a host: framing for both physical links and the typed wire codec.
//! It performs no I/O; see `mchost-client` for transports and the engine.
//!
//! # Protocol Overview
//!
//! Every frame starts with a one-byte opcode:
//!
//! - **Commands** (host → radio): `CMD_*` codes
//! - **Responses** (radio → host): `RESP_CODE_*` codes, solicited by a command
//! - **Push notifications** (radio → host): opcode has bit 7 set (`0x80+`)
//!
//! Frames travel either COBS-encoded between `0x00` delimiters (serial links,
//! see [`cobs`]) or behind a marker byte and a little-endian length (TCP, see
//! [`FrameCodec`]).
//!
//! # Example
//!
//! ```rust
//! use mchost_protocol::{Command, Message};
//!
//! let cmd = Command::send_text_message(&[1, 2, 3, 4, 5, 6], "hi", 1_700_000_000).unwrap();
//! let bytes = cmd.encode();
//! assert_eq!(bytes[0], mchost_protocol::CMD_SEND_TXT_MSG);
//!
//! // A frame with bit 7 set is always a push.
//! assert!(matches!(Message::decode(&[0x83]), Some(Message::Push(_))));
//! ```

pub mod cobs;
mod commands;
mod constants;
mod error;
mod frame;
mod responses;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use responses::*;
pub use types::*;
