//! Datagram framing: packet header followed by concatenated messages
//!
//! # Wire Format
//!
//! ```text
//! 0        1                 3                 5                 7        8
//! +--------+--------+--------+--------+--------+--------+--------+--------+
//! | sender |       ack       |  last recv ack  |   ack bitfield  | count  |
//! +--------+--------+--------+--------+--------+--------+--------+--------+
//! | message 0 | message 1 | ... | message count-1 |
//! +-----------+-----------+-----+-----------------+
//! ```

use bytes::BytesMut;

use super::cursor::ByteCursor;
use super::message::{self, MessageHeader, WireMessage};
use super::{PACKET_CAPACITY, PACKET_HEADER_SIZE, Result, WireError};

const COUNT_OFFSET: usize = 7;

/// Largest number of messages one packet can declare.
pub const MAX_MESSAGES_PER_PACKET: usize = u8::MAX as usize;

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    sender: u8,
    ack: u16,
    last_received_ack: u16,
    ack_bitfield: u16,
    message_count: u8,
}

impl PacketHeader {
    /// Header for a packet that does not carry any messages yet.
    #[must_use]
    pub const fn new(sender: u8, ack: u16, last_received_ack: u16, ack_bitfield: u16) -> Self {
        Self {
            sender,
            ack,
            last_received_ack,
            ack_bitfield,
            message_count: 0,
        }
    }

    /// Connection index the sender stamped on the packet.
    #[must_use]
    pub const fn sender(&self) -> u8 {
        self.sender
    }

    /// Sequence number of this packet on the sender's side.
    #[must_use]
    pub const fn ack(&self) -> u16 {
        self.ack
    }

    /// Most recent sequence the sender had received from us.
    #[must_use]
    pub const fn last_received_ack(&self) -> u16 {
        self.last_received_ack
    }

    /// Which of the sequences before `last_received_ack` were received.
    #[must_use]
    pub const fn ack_bitfield(&self) -> u16 {
        self.ack_bitfield
    }

    /// Number of messages that follow the header.
    #[must_use]
    pub const fn message_count(&self) -> u8 {
        self.message_count
    }
}

/// One UDP datagram payload.
#[derive(Debug, Clone)]
pub struct WirePacket {
    cursor: ByteCursor,
}

impl Default for WirePacket {
    fn default() -> Self {
        Self::new()
    }
}

impl WirePacket {
    /// Empty packet sized to one link-layer datagram.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(PACKET_CAPACITY)
    }

    /// Empty packet with a custom fixed capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cursor: ByteCursor::fixed(capacity.max(PACKET_HEADER_SIZE)),
        }
    }

    /// Wrap received bytes for verification; the header is left untouched.
    #[must_use]
    pub fn from_datagram(data: BytesMut) -> Self {
        Self {
            cursor: ByteCursor::wrap(data),
        }
    }

    /// Copy received bytes into a packet.
    #[must_use]
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            cursor: ByteCursor::from_slice(data),
        }
    }

    /// Serialized bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.as_slice()
    }

    /// Serialized length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cursor.len()
    }

    /// True when not even a header has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor.is_empty()
    }

    /// Fixed capacity of the packet.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cursor.capacity()
    }

    /// Bytes still available for messages.
    #[must_use]
    pub fn writable(&self) -> usize {
        self.cursor.writable()
    }

    /// Bytes not yet consumed by reads.
    #[must_use]
    pub fn readable(&self) -> usize {
        self.cursor.readable()
    }

    /// Offset of the read cursor.
    #[must_use]
    pub fn read_position(&self) -> usize {
        self.cursor.read_position()
    }

    /// Rewind reads to the start of the header.
    pub fn reset_read(&mut self) {
        self.cursor.reset_read();
    }

    /// Discard everything and write `header` as the first bytes.
    pub fn write_header(&mut self, header: &PacketHeader) -> Result<()> {
        self.cursor.reset_write();
        self.cursor.write_u8(header.sender)?;
        self.cursor.write_u16(header.ack)?;
        self.cursor.write_u16(header.last_received_ack)?;
        self.cursor.write_u16(header.ack_bitfield)?;
        self.cursor.write_u8(header.message_count)
    }

    /// Rewind and consume the header.
    pub fn read_header(&mut self) -> Result<PacketHeader> {
        self.cursor.reset_read();
        let header = self.read_header_fields();
        if header.is_err() {
            self.cursor.reset_read();
        }
        header
    }

    fn read_header_fields(&mut self) -> Result<PacketHeader> {
        Ok(PacketHeader {
            sender: self.cursor.read_u8()?,
            ack: self.cursor.read_u16()?,
            last_received_ack: self.cursor.read_u16()?,
            ack_bitfield: self.cursor.read_u16()?,
            message_count: self.cursor.read_u8()?,
        })
    }

    /// Message counter as currently written.
    pub fn message_count(&self) -> Result<u8> {
        self.cursor.peek_u8_at(COUNT_OFFSET)
    }

    /// Append an already-framed message and bump the counter.
    ///
    /// Fails without touching the packet when the message does not fit or
    /// the counter is saturated.
    pub fn write_message(&mut self, message: &WireMessage) -> Result<()> {
        let framed = message.as_framed();
        let available = self.cursor.writable();
        if framed.len() > available {
            return Err(WireError::BufferFull {
                needed: framed.len(),
                available,
            });
        }
        let count = self.message_count()?;
        if usize::from(count) >= MAX_MESSAGES_PER_PACKET {
            return Err(WireError::TooManyMessages {
                max: MAX_MESSAGES_PER_PACKET,
            });
        }
        self.cursor.write_raw(framed)?;
        self.cursor.patch_u8(COUNT_OFFSET, count + 1)
    }

    /// Consume the next message header, leaving its body unread.
    pub fn read_message_header(&mut self) -> Result<MessageHeader> {
        message::read_header(&mut self.cursor)
    }

    /// Skip `len` body bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.cursor.skip(len)
    }

    /// Consume the next message and copy it into a standalone message.
    pub fn read_message(&mut self) -> Result<WireMessage> {
        let start = self.cursor.read_position();
        let header = self.read_message_header()?;
        let body = header.body_len()?;
        let available = self.cursor.readable();
        if body > available {
            return Err(WireError::BodyTruncated {
                declared: body,
                available,
            });
        }
        let framed = &self.cursor.as_slice()[start..start + header.framed_len()];
        let message = WireMessage::from_framed_with(framed, self.cursor.endianness())?;
        self.cursor.skip(body)?;
        Ok(message)
    }

    /// Structural check of a received packet.
    ///
    /// Every declared message must fit in the remaining bytes, reference a
    /// type below `known_types`, and together they must account for every
    /// byte after the header. The read cursor is rewound afterwards.
    pub fn verify(&mut self, max_senders: usize, known_types: usize) -> Result<PacketHeader> {
        let result = self.verify_inner(max_senders, known_types);
        self.cursor.reset_read();
        result
    }

    fn verify_inner(&mut self, max_senders: usize, known_types: usize) -> Result<PacketHeader> {
        let header = self.read_header()?;
        if usize::from(header.sender) >= max_senders {
            return Err(WireError::SenderOutOfRange {
                index: header.sender,
                max: max_senders,
            });
        }
        for _ in 0..header.message_count {
            let message = self.read_message_header()?;
            let body = message.body_len()?;
            let available = self.cursor.readable();
            if body > available {
                return Err(WireError::BodyTruncated {
                    declared: body,
                    available,
                });
            }
            if usize::from(message.type_index()) >= known_types {
                return Err(WireError::UnknownType {
                    index: message.type_index(),
                });
            }
            self.cursor.skip(body)?;
        }
        let extra = self.cursor.readable();
        if extra != 0 {
            return Err(WireError::TrailingBytes { extra });
        }
        Ok(header)
    }
}
