//! Wire format: byte cursor, framed messages and packets
//!
//! Everything in this module is pure data manipulation; sockets and timing
//! live in [`crate::transport`].

mod cursor;
mod error;
mod message;
mod packet;

pub use cursor::{ByteCursor, CursorFlags, Endianness, MAX_VARINT_LEN, varint_len};
pub use error::{Result, WireError};
pub use message::{MAX_FRAMED_MESSAGE, MessageHeader, WireMessage, read_header};
pub use packet::{MAX_MESSAGES_PER_PACKET, PacketHeader, WirePacket};

/// Default capacity of a [`WireMessage`], header included.
pub const MESSAGE_CAPACITY: usize = 128;

/// Message header: `u16` length plus `u8` type index.
pub const MESSAGE_HEADER_SIZE: usize = 3;

/// Ethernet MTU (1500) minus IPv6 (40) and UDP (8) headers.
pub const PACKET_CAPACITY: usize = 1452;

/// Packet header: sender, ack, last received ack, ack bitfield, count.
pub const PACKET_HEADER_SIZE: usize = 8;

/// Largest framed message an empty packet can carry.
pub const MAX_MESSAGE_IN_PACKET: usize = PACKET_CAPACITY - PACKET_HEADER_SIZE;
