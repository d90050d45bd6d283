//! Framed application message
//!
//! # Wire Format
//!
//! ```text
//! +--------+--------+--------+------------------+
//! |  length (u16)   |  type  |  payload ...     |
//! +--------+--------+--------+------------------+
//! ```
//!
//! `length` counts the type byte and the payload but not itself. It is
//! bumped in place after every successful write, so a message is always
//! ready to be appended to a packet.

use super::cursor::{ByteCursor, Endianness};
use super::{MESSAGE_CAPACITY, MESSAGE_HEADER_SIZE, Result, WireError};

/// Largest framed message the 16-bit length field can describe.
pub const MAX_FRAMED_MESSAGE: usize = 2 + u16::MAX as usize;

const LENGTH_OFFSET: usize = 0;
const TYPE_OFFSET: usize = 2;

/// Decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    length: u16,
    type_index: u8,
}

impl MessageHeader {
    /// Create a header from its raw fields.
    #[must_use]
    pub const fn new(length: u16, type_index: u8) -> Self {
        Self { length, type_index }
    }

    /// Raw length field (type byte plus payload).
    #[must_use]
    pub const fn length(&self) -> u16 {
        self.length
    }

    /// Registry index of the message type.
    #[must_use]
    pub const fn type_index(&self) -> u8 {
        self.type_index
    }

    /// Payload bytes that follow the header.
    ///
    /// A zero length field is malformed: it cannot even hold the type byte.
    pub fn body_len(&self) -> Result<usize> {
        usize::from(self.length)
            .checked_sub(1)
            .ok_or(WireError::EmptyMessage)
    }

    /// Size of the message including its header.
    #[must_use]
    pub fn framed_len(&self) -> usize {
        2 + usize::from(self.length)
    }
}

/// One logical application message.
#[derive(Debug, Clone)]
pub struct WireMessage {
    cursor: ByteCursor,
}

impl WireMessage {
    /// Empty message of the default capacity.
    #[must_use]
    pub fn new(type_index: u8) -> Self {
        Self::with_capacity(type_index, MESSAGE_CAPACITY)
    }

    /// Empty message with a custom fixed capacity (header included).
    #[must_use]
    pub fn with_capacity(type_index: u8, capacity: usize) -> Self {
        Self::with_layout(type_index, capacity, Endianness::default())
    }

    /// Empty message with a custom capacity and byte order.
    #[must_use]
    pub fn with_layout(type_index: u8, capacity: usize, endianness: Endianness) -> Self {
        let capacity = capacity.clamp(MESSAGE_HEADER_SIZE, MAX_FRAMED_MESSAGE);
        let mut cursor = ByteCursor::fixed(capacity).with_endianness(endianness);
        let header = write_empty_header(&mut cursor, type_index);
        debug_assert!(header.is_ok(), "capacity holds at least a header");
        Self { cursor }
    }

    /// Rebuild a message from its framed bytes (header included).
    pub fn from_framed(framed: &[u8]) -> Result<Self> {
        Self::from_framed_with(framed, Endianness::default())
    }

    /// Rebuild a message from framed bytes in the given byte order.
    pub fn from_framed_with(framed: &[u8], endianness: Endianness) -> Result<Self> {
        if framed.len() > MAX_FRAMED_MESSAGE {
            return Err(WireError::LengthOverflow {
                len: framed.len(),
                max: MAX_FRAMED_MESSAGE,
            });
        }
        let mut cursor = ByteCursor::fixed(framed.len().max(MESSAGE_CAPACITY))
            .with_endianness(endianness);
        cursor.write_raw(framed)?;
        let header = read_header(&mut cursor)?;
        let body = header.body_len()?;
        if body != cursor.readable() {
            return Err(WireError::BodyTruncated {
                declared: body,
                available: cursor.readable(),
            });
        }
        Ok(Self { cursor })
    }

    /// Current header.
    #[must_use]
    pub fn header(&self) -> MessageHeader {
        MessageHeader::new(self.length_field(), self.type_index())
    }

    /// Registry index of this message's type.
    #[must_use]
    pub fn type_index(&self) -> u8 {
        self.cursor.peek_u8_at(TYPE_OFFSET).unwrap_or_default()
    }

    /// Raw length field.
    #[must_use]
    pub fn length_field(&self) -> u16 {
        self.cursor.peek_u16_at(LENGTH_OFFSET).unwrap_or_default()
    }

    /// Header plus payload, exactly as it goes on the wire.
    #[must_use]
    pub fn as_framed(&self) -> &[u8] {
        self.cursor.as_slice()
    }

    /// Size of the framed message.
    #[must_use]
    pub fn framed_len(&self) -> usize {
        self.cursor.len()
    }

    /// Payload bytes after the header.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.cursor.as_slice()[MESSAGE_HEADER_SIZE..]
    }

    /// Bytes that can still be written.
    #[must_use]
    pub fn writable(&self) -> usize {
        self.cursor.writable()
    }

    /// Payload bytes not yet read.
    #[must_use]
    pub fn readable(&self) -> usize {
        self.cursor.readable()
    }

    /// Byte order of multi-byte fields.
    #[must_use]
    pub fn endianness(&self) -> Endianness {
        self.cursor.endianness()
    }

    /// Rewind reads to the start of the payload.
    pub fn reset_read(&mut self) {
        self.cursor.reset_read();
        let skipped = self.cursor.skip(MESSAGE_HEADER_SIZE);
        debug_assert!(skipped.is_ok(), "a message always holds its header");
    }

    /// Drop the payload, keeping the type index.
    pub fn reset_write(&mut self) {
        let type_index = self.type_index();
        self.cursor.reset_write();
        let header = write_empty_header(&mut self.cursor, type_index);
        debug_assert!(header.is_ok(), "capacity holds at least a header");
    }

    fn tracked<F>(&mut self, write: F) -> Result<()>
    where
        F: FnOnce(&mut ByteCursor) -> Result<()>,
    {
        let before = self.cursor.len();
        write(&mut self.cursor)?;
        let written = self.cursor.len() - before;
        let length = usize::from(self.length_field()) + written;
        let length = u16::try_from(length).map_err(|_| WireError::LengthOverflow {
            len: length,
            max: u16::MAX as usize,
        })?;
        self.cursor.patch_u16(LENGTH_OFFSET, length)
    }

    /// Append a span in the declared byte order.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.tracked(|cursor| cursor.write_bytes(data))
    }

    /// Append a span verbatim.
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.tracked(|cursor| cursor.write_raw(data))
    }

    /// Append a varint.
    pub fn write_varint(&mut self, value: u32) -> Result<()> {
        self.tracked(|cursor| cursor.write_varint(value))
    }

    /// Append a varint-prefixed string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.tracked(|cursor| cursor.write_string(value))
    }

    /// Copy up to `out.len()` payload bytes; returns the readable count.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> usize {
        self.cursor.read_bytes(out)
    }

    /// Read exactly `out.len()` payload bytes verbatim.
    pub fn read_raw(&mut self, out: &mut [u8]) -> Result<()> {
        self.cursor.read_raw(out)
    }

    /// Read a varint.
    pub fn read_varint(&mut self) -> Result<u32> {
        self.cursor.read_varint()
    }

    /// Read a varint-prefixed string.
    pub fn read_string(&mut self) -> Result<String> {
        self.cursor.read_string()
    }
}

macro_rules! tracked_primitives {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        impl WireMessage {
            $(
                #[doc = concat!("Append a `", stringify!($ty), "` and bump the length field.")]
                pub fn $write(&mut self, value: $ty) -> Result<()> {
                    self.tracked(|cursor| cursor.$write(value))
                }

                #[doc = concat!("Read a `", stringify!($ty), "` from the payload.")]
                pub fn $read(&mut self) -> Result<$ty> {
                    self.cursor.$read()
                }
            )*
        }
    };
}

tracked_primitives! {
    u8 => write_u8, read_u8;
    i8 => write_i8, read_i8;
    u16 => write_u16, read_u16;
    i16 => write_i16, read_i16;
    u32 => write_u32, read_u32;
    i32 => write_i32, read_i32;
    u64 => write_u64, read_u64;
    i64 => write_i64, read_i64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

/// Write a header with an empty payload and leave reads at the payload.
fn write_empty_header(cursor: &mut ByteCursor, type_index: u8) -> Result<()> {
    cursor.write_u16(1)?;
    cursor.write_u8(type_index)?;
    cursor.skip(MESSAGE_HEADER_SIZE)
}

/// Consume a message header from `cursor`.
pub fn read_header(cursor: &mut ByteCursor) -> Result<MessageHeader> {
    let start = cursor.read_position();
    let length = cursor.read_u16();
    let type_index = cursor.read_u8();
    match (length, type_index) {
        (Ok(length), Ok(type_index)) => Ok(MessageHeader::new(length, type_index)),
        (Err(err), _) | (_, Err(err)) => {
            cursor.reset_read();
            cursor.skip(start)?;
            Err(err)
        }
    }
}
