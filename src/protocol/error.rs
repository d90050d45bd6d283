//! Wire codec error types

use thiserror::Error;

/// Errors produced by the cursor, message and packet codecs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Fixed buffer cannot hold the write
    #[error("buffer full: need {needed} bytes, have {available}")]
    BufferFull {
        /// Bytes the write required
        needed: usize,
        /// Bytes left before capacity
        available: usize,
    },

    /// Not enough readable bytes
    #[error("truncated read: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes the read required
        needed: usize,
        /// Bytes left before the write cursor
        available: usize,
    },

    /// Varint ran past its maximum width
    #[error("invalid varint: more than {max_bytes} continuation bytes")]
    InvalidVarint {
        /// Maximum encoded width
        max_bytes: usize,
    },

    /// String blob is not valid UTF-8
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// Message length field would exceed its 16-bit range
    #[error("message length overflow: {len} bytes (max {max})")]
    LengthOverflow {
        /// Length that was requested
        len: usize,
        /// Largest encodable length
        max: usize,
    },

    /// Message declares a length that cannot hold its own type byte
    #[error("message length field is zero")]
    EmptyMessage,

    /// Declared message body is larger than the bytes present
    #[error("message body truncated: declared {declared} bytes, {available} remain")]
    BodyTruncated {
        /// Body bytes the header declared
        declared: usize,
        /// Readable bytes remaining in the packet
        available: usize,
    },

    /// Packet carries bytes after its last declared message
    #[error("{extra} trailing bytes after declared messages")]
    TrailingBytes {
        /// Unconsumed bytes
        extra: usize,
    },

    /// Packet header names a sender slot outside the connection table
    #[error("sender index {index} out of range (max {max})")]
    SenderOutOfRange {
        /// Index carried in the header
        index: u8,
        /// Size of the connection table
        max: usize,
    },

    /// Packet header names a sender slot with no connection in it
    #[error("unknown sender index {index}")]
    UnknownSender {
        /// Index carried in the header
        index: u8,
    },

    /// Message references a type index that is not registered
    #[error("unknown message type index {index}")]
    UnknownType {
        /// Type index carried in the message header
        index: u8,
    },

    /// Message counter would overflow its 8-bit field
    #[error("packet already holds the maximum of {max} messages")]
    TooManyMessages {
        /// Largest encodable message count
        max: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WireError>;
