//! Transport-level error types covering socket, wire, and registry failures.

use super::registry::RegistryError;
use super::socket::SocketError;
use crate::protocol::WireError;
use core::fmt;
use std::net::SocketAddr;

/// Unified error type for session and connection operations.
#[derive(Debug)]
pub enum TransportError {
    /// Underlying socket failure.
    Socket(SocketError),
    /// Message or packet codec failure.
    Wire(WireError),
    /// Message type registration failure.
    Registry(RegistryError),
    /// Connection index outside the fixed table.
    InvalidConnectionIndex {
        /// Index supplied by the caller.
        index: usize,
        /// Size of the connection table.
        max: usize,
    },
    /// No connection occupies the slot.
    NoConnection {
        /// Index supplied by the caller.
        index: usize,
    },
    /// Message can never fit in an empty packet.
    MessageTooLarge {
        /// Framed size of the message.
        len: usize,
        /// Largest framed message a packet can carry.
        max: usize,
    },
    /// Datagram was only partially sent.
    ShortSend {
        /// Destination of the datagram.
        addr: SocketAddr,
        /// Bytes handed to the socket.
        sent: usize,
        /// Bytes in the packet.
        len: usize,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket(err) => write!(f, "socket error: {err}"),
            Self::Wire(err) => write!(f, "wire error: {err}"),
            Self::Registry(err) => write!(f, "registry error: {err}"),
            Self::InvalidConnectionIndex { index, max } => {
                write!(f, "connection index {index} out of range (max {max})")
            }
            Self::NoConnection { index } => write!(f, "no connection in slot {index}"),
            Self::MessageTooLarge { len, max } => {
                write!(f, "message too large: {len} bytes (max {max})")
            }
            Self::ShortSend { addr, sent, len } => {
                write!(f, "short send to {addr}: {sent} of {len} bytes")
            }
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Socket(err) => Some(err),
            Self::Wire(err) => Some(err),
            Self::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SocketError> for TransportError {
    fn from(err: SocketError) -> Self {
        Self::Socket(err)
    }
}

impl From<WireError> for TransportError {
    fn from(err: WireError) -> Self {
        Self::Wire(err)
    }
}

impl From<RegistryError> for TransportError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}
