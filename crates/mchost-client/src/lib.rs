//! MeshCore Companion Client
//!
//! Host-side engine for companion radios: serial and TCP transports, a
//! background receive loop that separates solicited replies from pushes, and
//! blocking request/response calls with deadlines and cancellation.
//!
//! # Example
//!
//! ```no_run
//! use mchost_client::{Companion, CompanionConfig, RequestOptions, TcpTransport};
//!
//! let companion = Companion::new(
//!     TcpTransport::with_address("192.168.1.50:5000"),
//!     CompanionConfig::default(),
//! );
//! let me = companion.connect(&RequestOptions::default())?;
//! println!("connected to {}", me.node_name);
//!
//! for contact in companion.get_contacts(None, &RequestOptions::default())? {
//!     println!("{} {}", contact.public_key.prefix(), contact.name);
//! }
//! companion.close()?;
//! # Ok::<(), mchost_client::Error>(())
//! ```

mod cancel;
mod config;
mod engine;
mod error;
mod events;
mod messages;
mod ports;
mod queue;
pub mod transport;

pub use cancel::CancelToken;
pub use config::*;
pub use engine::{Companion, ConnectionState, RequestOptions};
pub use error::{Error, Result, TransportError};
pub use events::{Event, EventBus};
pub use messages::{split_exact, split_text, ChunkProgress, MessageSender};
pub use ports::{is_serial_port_name, list_serial_ports, list_serial_ports_in};
pub use queue::Expect;
#[cfg(unix)]
pub use transport::SerialTransport;
pub use transport::{TcpTransport, Transport};

pub use mchost_protocol as protocol;
