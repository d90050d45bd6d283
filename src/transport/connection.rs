//! Per-peer state: address, outbound queue and ack bookkeeping.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Instant;

use tracing::{debug, instrument, trace};

use super::ack::{AckOutcome, AckTracker};
use super::error::TransportError;
use super::socket::SocketBinding;
use crate::protocol::{PACKET_CAPACITY, PACKET_HEADER_SIZE, PacketHeader, WireMessage, WirePacket};

/// Slots in a session's connection table.
pub const MAX_CONNECTIONS: usize = 32;

/// What one call to [`Connection::process_outgoing`] put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flushed {
    /// Datagram size.
    pub bytes: usize,
    /// Messages packed into the datagram.
    pub messages: usize,
    /// Sequence stamped on the datagram.
    pub sequence: u16,
}

/// One remote endpoint in the connection table.
#[derive(Debug)]
pub struct Connection {
    index: u8,
    address: SocketAddr,
    outbound: VecDeque<WireMessage>,
    acks: AckTracker,
}

impl Connection {
    /// Connection occupying slot `index`.
    #[must_use]
    pub fn new(index: u8, address: SocketAddr) -> Self {
        Self {
            index,
            address,
            outbound: VecDeque::new(),
            acks: AckTracker::new(),
        }
    }

    /// Slot in the connection table, stamped on every outgoing packet.
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.index
    }

    /// Remote address.
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }

    pub(crate) fn set_address(&mut self, address: SocketAddr) {
        self.address = address;
    }

    /// Messages waiting for a packet.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.outbound.len()
    }

    /// Sequence and ack state.
    #[must_use]
    pub const fn acks(&self) -> &AckTracker {
        &self.acks
    }

    /// Queue a copy of `message` for the next outgoing packet.
    ///
    /// Messages that could never fit an empty packet are rejected rather
    /// than split.
    pub fn send(&mut self, message: &WireMessage) -> Result<(), TransportError> {
        let max = PACKET_CAPACITY - PACKET_HEADER_SIZE;
        if message.framed_len() > max {
            return Err(TransportError::MessageTooLarge {
                len: message.framed_len(),
                max,
            });
        }
        trace!(
            connection = self.index,
            type_index = message.type_index(),
            len = message.framed_len(),
            "message queued"
        );
        self.outbound.push_back(message.clone());
        Ok(())
    }

    /// Update ack state from a verified incoming packet.
    pub(crate) fn on_packet_received(&mut self, header: &PacketHeader, now: Instant) -> AckOutcome {
        if !self.acks.on_receive(header.ack()) {
            trace!(
                connection = self.index,
                sequence = header.ack(),
                "duplicate or stale sequence"
            );
        }
        let outcome = self
            .acks
            .on_ack(header.last_received_ack(), header.ack_bitfield(), now);
        if !outcome.lost.is_empty() {
            debug!(connection = self.index, lost = ?outcome.lost, "packets fell out of ack window");
        }
        outcome
    }

    /// Pack as many queued messages as fit into one packet.
    ///
    /// Messages that do not fit stay queued, in order, for the next call.
    pub fn build_packet(&mut self, now: Instant) -> Result<Option<WirePacket>, TransportError> {
        if self.outbound.is_empty() {
            return Ok(None);
        }
        let stamp = self.acks.on_send(now);
        let mut packet = WirePacket::new();
        packet.write_header(&PacketHeader::new(
            self.index,
            stamp.sequence,
            stamp.last_received,
            stamp.bitfield,
        ))?;
        while let Some(message) = self.outbound.front() {
            if packet.write_message(message).is_err() {
                break;
            }
            self.outbound.pop_front();
        }
        Ok(Some(packet))
    }

    /// Send at most one packet of queued messages.
    #[instrument(level = "trace", skip(self, socket, now), fields(connection = self.index))]
    pub fn process_outgoing(
        &mut self,
        socket: &SocketBinding,
        now: Instant,
    ) -> Result<Option<Flushed>, TransportError> {
        let Some(packet) = self.build_packet(now)? else {
            return Ok(None);
        };
        let header = packet.clone().read_header()?;
        let bytes = packet.as_bytes();
        let sent = socket.send_to(bytes, self.address)?;
        if sent != bytes.len() {
            return Err(TransportError::ShortSend {
                addr: self.address,
                sent,
                len: bytes.len(),
            });
        }
        trace!(
            sequence = header.ack(),
            messages = header.message_count(),
            bytes = sent,
            remaining = self.outbound.len(),
            "packet sent"
        );
        Ok(Some(Flushed {
            bytes: sent,
            messages: usize::from(header.message_count()),
            sequence: header.ack(),
        }))
    }
}
