//! ticknet - Tick-driven message transport over UDP for real-time games
//!
//! Applications register named message types, write typed fields into
//! [`WireMessage`]s and queue them on connections. Once per tick the
//! [`Session`] packs each connection's queue into a single datagram and
//! dispatches received messages to the registered callbacks.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use ticknet::{Session, SessionConfig, WireMessage};
//!
//! let mut session = Session::bind(SessionConfig::default())?;
//! session.register_message("ping", |msg, _conn| msg.read_u32().is_ok())?;
//! session.add_connection(0, "127.0.0.1:7778".parse::<SocketAddr>().unwrap())?;
//!
//! let mut ping = WireMessage::new(session.message_index("ping").unwrap_or_default());
//! ping.write_u32(1)?;
//! session.send(0, &ping)?;
//!
//! session.process_incoming();
//! session.process_outgoing();
//! # Ok::<(), ticknet::TransportError>(())
//! ```
//!
//! # Features
//!
//! - **Typed byte cursor** - primitives, LEB128 varints and strings with a
//!   per-cursor byte order
//! - **Self-framing messages** - the length field is patched after every write
//! - **Packet batching** - as many queued messages as fit one MTU-sized datagram
//! - **Ack bookkeeping** - sequence numbers and a 16-packet receipt bitfield
//! - **Link simulation** - seeded loss and lag injection on incoming traffic
//!
//! Message type indices come from the alphabetical order of registered
//! names, so both peers must register the same set of names. Peers also
//! address each other through the same connection slot on both sides.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod protocol;
pub mod transport;

pub use protocol::{
    ByteCursor, Endianness, MessageHeader, PacketHeader, WireError, WireMessage, WirePacket,
};
pub use transport::{
    Clock, Connection, DEFAULT_PORT, ManualClock, MessageRegistry, MetricsSnapshot, Session,
    SessionConfig, SystemClock, TransportError,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
