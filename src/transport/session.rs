//! Tick-driven session: one socket, a fixed connection table and the
//! message registry.
//!
//! The owner drives a session from its main loop:
//!
//! ```no_run
//! use ticknet::{Session, SessionConfig};
//!
//! let mut session = Session::bind(SessionConfig::default())?;
//! loop {
//!     session.process_incoming();
//!     // game logic queues messages with `session.send(..)`
//!     session.process_outgoing();
//! #   break;
//! }
//! # Ok::<(), ticknet::TransportError>(())
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::{debug, error, instrument, trace, warn};

use super::clock::{Clock, SystemClock};
use super::connection::{Connection, MAX_CONNECTIONS};
use super::error::TransportError;
use super::metrics::{DropReason, Metrics, MetricsSnapshot};
use super::registry::MessageRegistry;
use super::simulator::{DelayedPacket, LinkSimulator};
use super::socket::{SocketBinding, SocketError};
use crate::protocol::{PACKET_CAPACITY, PacketHeader, WireError, WireMessage, WirePacket};

/// Port tried first when none is configured.
pub const DEFAULT_PORT: u16 = 7777;

/// Ports tried after [`DEFAULT_PORT`] while the address is in use.
pub const DEFAULT_PORT_RANGE: u16 = 16;

/// One extra byte so oversized datagrams are detected instead of silently
/// truncated.
const RECEIVE_BUFFER_SIZE: usize = PACKET_CAPACITY + 1;

/// Session configuration options.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Local interface to bind.
    pub bind_ip: IpAddr,
    /// Preferred local port.
    pub port: u16,
    /// Additional ports tried after `port` while the address is in use.
    pub port_range: u16,
    /// Probability of discarding each received datagram.
    pub sim_loss: f64,
    /// Lower bound of the simulated delivery delay.
    pub sim_lag_min: Duration,
    /// Upper bound of the simulated delivery delay.
    pub sim_lag_max: Duration,
    /// Seed for loss and lag sampling; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
    /// Datagrams read from the socket per `process_incoming` call.
    pub receive_budget: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            port_range: DEFAULT_PORT_RANGE,
            sim_loss: 0.0,
            sim_lag_min: Duration::ZERO,
            sim_lag_max: Duration::ZERO,
            rng_seed: None,
            receive_budget: 1,
        }
    }
}

/// Socket, connections, registry and delayed-delivery queue of one
/// networking participant.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    socket: Option<SocketBinding>,
    connections: Vec<Option<Connection>>,
    registry: MessageRegistry,
    simulator: LinkSimulator,
    clock: Box<dyn Clock>,
    metrics: Metrics,
    recv_buf: Vec<u8>,
}

impl Session {
    /// Unbound session driven by the system clock.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Unbound session driven by `clock`.
    #[must_use]
    pub fn with_clock<C>(config: SessionConfig, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        let mut simulator = LinkSimulator::new(config.rng_seed);
        simulator.set_loss(config.sim_loss);
        simulator.set_lag(config.sim_lag_min, config.sim_lag_max);
        Self {
            socket: None,
            connections: std::iter::repeat_with(|| None)
                .take(MAX_CONNECTIONS)
                .collect(),
            registry: MessageRegistry::new(),
            simulator,
            clock: Box::new(clock),
            metrics: Metrics::default(),
            recv_buf: vec![0; RECEIVE_BUFFER_SIZE],
            config,
        }
    }

    /// Create a session and bind it to the configured port range.
    pub fn bind(config: SessionConfig) -> Result<Self, TransportError> {
        let (port, range) = (config.port, config.port_range);
        let mut session = Self::new(config);
        session.add_binding(port, range)?;
        Ok(session)
    }

    /// Configuration the session was created with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Bind the socket to `port`, retrying up to `range` following ports.
    ///
    /// Replaces any existing binding.
    pub fn add_binding(&mut self, port: u16, range: u16) -> Result<SocketAddr, TransportError> {
        let binding = SocketBinding::bind_in_range(self.config.bind_ip, port, range)
            .inspect_err(|err| error!(port, range, error = %err, "failed to bind socket"))?;
        let local = binding.local_addr()?;
        debug!(%local, "socket bound");
        self.socket = Some(binding);
        Ok(local)
    }

    /// Bound address, if the socket is open.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref()?.local_addr().ok()
    }

    /// Whether the socket is open.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.socket.is_some()
    }

    /// Put a connection in slot `index`.
    ///
    /// An occupied slot keeps its queue and ack state and only takes the
    /// new address.
    pub fn add_connection(&mut self, index: usize, address: SocketAddr) -> Result<(), TransportError> {
        let slot = self
            .connections
            .get_mut(index)
            .ok_or(TransportError::InvalidConnectionIndex {
                index,
                max: MAX_CONNECTIONS,
            })?;
        match slot {
            Some(existing) => {
                debug!(index, old = %existing.address(), new = %address, "connection address replaced");
                existing.set_address(address);
            }
            None => {
                debug!(index, %address, "connection added");
                // index < MAX_CONNECTIONS
                *slot = Some(Connection::new(index as u8, address));
            }
        }
        Ok(())
    }

    /// Empty slot `index`, dropping its queue and any delayed datagrams.
    pub fn remove_connection(&mut self, index: usize) -> Option<Connection> {
        let removed = self.connections.get_mut(index)?.take()?;
        let discarded = self.simulator.discard_connection(index);
        for _ in 0..discarded {
            self.metrics.record_drop(DropReason::ConnectionGone);
        }
        debug!(index, address = %removed.address(), discarded, "connection removed");
        Some(removed)
    }

    /// Connection in slot `index`.
    #[must_use]
    pub fn connection(&self, index: usize) -> Option<&Connection> {
        self.connections.get(index)?.as_ref()
    }

    /// Mutable connection in slot `index`.
    pub fn connection_mut(&mut self, index: usize) -> Option<&mut Connection> {
        self.connections.get_mut(index)?.as_mut()
    }

    /// Slot of the connection whose address is `address`.
    #[must_use]
    pub fn connection_index(&self, address: SocketAddr) -> Option<usize> {
        self.connections
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|conn| conn.address() == address))
    }

    /// Populated slots in table order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().flatten()
    }

    /// Register a message type; returns its current wire index.
    ///
    /// Indices follow name order, so registering a name can shift the
    /// index of types sorting after it. Registration is refused once the
    /// session has sent or dispatched a packet.
    pub fn register_message<F>(&mut self, name: &str, callback: F) -> Result<u8, TransportError>
    where
        F: FnMut(&mut WireMessage, &mut Connection) -> bool + 'static,
    {
        let index = self.registry.register(name, callback)?;
        debug!(name, index, "message type registered");
        Ok(index)
    }

    /// Wire index of a registered type.
    #[must_use]
    pub fn message_index(&self, name: &str) -> Option<u8> {
        self.registry.index_of(name)
    }

    /// Registered message types.
    #[must_use]
    pub const fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    /// Set the simulated loss probability, clamped to `[0, 1]`.
    pub fn set_sim_loss(&mut self, probability: f64) {
        self.simulator.set_loss(probability);
        debug!(loss = self.simulator.loss(), "simulated loss updated");
    }

    /// Set the simulated delay window, capped at one minute; `max` is raised
    /// to `min` when smaller.
    pub fn set_sim_lag(&mut self, min: Duration, max: Duration) {
        self.simulator.set_lag(min, max);
        let (min, max) = self.simulator.lag();
        debug!(?min, ?max, "simulated lag updated");
    }

    /// Queue `message` on the connection in slot `index`.
    pub fn send(&mut self, index: usize, message: &WireMessage) -> Result<(), TransportError> {
        if index >= MAX_CONNECTIONS {
            return Err(TransportError::InvalidConnectionIndex {
                index,
                max: MAX_CONNECTIONS,
            });
        }
        self.connection_mut(index)
            .ok_or(TransportError::NoConnection { index })?
            .send(message)
    }

    /// Read pending datagrams, then deliver everything that is due.
    ///
    /// At most `receive_budget` datagrams are read per call. Socket
    /// failures other than would-block close the socket.
    #[instrument(level = "trace", skip(self))]
    pub fn process_incoming(&mut self) {
        let now = self.clock.now();
        for _ in 0..self.config.receive_budget.max(1) {
            if !self.receive_one(now) {
                break;
            }
        }
        self.process_incoming_packet_queue();
    }

    fn receive_one(&mut self, now: Instant) -> bool {
        let Some(socket) = self.socket.as_ref() else {
            return false;
        };
        let (len, from) = match socket.try_recv_from(&mut self.recv_buf) {
            Ok(Some(received)) => received,
            Ok(None) => return false,
            Err(err) => {
                error!(error = %err, "receive failed, closing socket");
                self.metrics.record_socket_error();
                self.socket = None;
                return false;
            }
        };
        let datagram = BytesMut::from(&self.recv_buf[..len]);
        self.accept_datagram(now, from, datagram);
        true
    }

    /// Run a received datagram through loss, sender lookup and the delay
    /// queue.
    fn accept_datagram(&mut self, now: Instant, from: SocketAddr, datagram: BytesMut) {
        self.metrics.record_packet_received(datagram.len());
        if !self.simulator.survives() {
            trace!(%from, len = datagram.len(), "datagram dropped by loss simulation");
            self.metrics.record_drop(DropReason::Simulated);
            return;
        }
        let Some(index) = self.connection_index(from) else {
            warn!(%from, "datagram from unknown sender");
            self.metrics.record_drop(DropReason::UnknownSender);
            return;
        };
        if datagram.len() > PACKET_CAPACITY {
            warn!(%from, len = datagram.len(), "oversized datagram");
            self.metrics.record_drop(DropReason::Malformed);
            return;
        }
        let deliver_at = self
            .simulator
            .schedule(now, index, WirePacket::from_datagram(datagram));
        trace!(
            connection = index,
            delay = ?deliver_at.saturating_duration_since(now),
            "datagram queued for delivery"
        );
    }

    /// Verify and dispatch every queued datagram whose delivery time has
    /// passed, earliest first.
    pub fn process_incoming_packet_queue(&mut self) {
        let now = self.clock.now();
        while let Some(DelayedPacket {
            connection,
            mut packet,
            received_at,
            ..
        }) = self.simulator.pop_due(now)
        {
            match self.verify_packet(&mut packet) {
                Ok(header) if usize::from(header.sender()) != connection => {
                    warn!(
                        connection,
                        sender = header.sender(),
                        "sender index does not match source address"
                    );
                    self.metrics.record_drop(DropReason::Malformed);
                }
                Ok(header) => {
                    let delay = now.saturating_duration_since(received_at);
                    self.dispatch(connection, packet, header, delay);
                }
                Err(err) => {
                    warn!(connection, error = %err, "dropping malformed packet");
                    self.metrics.record_drop(DropReason::Malformed);
                }
            }
        }
    }

    /// Structural check against this session's connection table and
    /// registry. Leaves the packet's read cursor at the start.
    ///
    /// Peers share slot numbering, so the header's sender index must name a
    /// populated slot.
    pub fn verify_packet(&self, packet: &mut WirePacket) -> Result<PacketHeader, WireError> {
        let header = packet.verify(MAX_CONNECTIONS, self.registry.len())?;
        if self.connection(usize::from(header.sender())).is_none() {
            return Err(WireError::UnknownSender {
                index: header.sender(),
            });
        }
        Ok(header)
    }

    fn dispatch(&mut self, index: usize, mut packet: WirePacket, header: PacketHeader, delay: Duration) {
        let Some(connection) = self.connections.get_mut(index).and_then(Option::as_mut) else {
            debug!(connection = index, "connection gone before delivery");
            self.metrics.record_drop(DropReason::ConnectionGone);
            return;
        };
        self.metrics.record_delivery_delay(delay);
        self.registry.seal();
        connection.on_packet_received(&header, self.clock.now());

        if let Err(err) = packet.read_header() {
            warn!(connection = index, error = %err, "verified packet lost its header");
            return;
        }
        trace!(
            connection = index,
            sequence = header.ack(),
            messages = header.message_count(),
            "dispatching packet"
        );
        for _ in 0..header.message_count() {
            let mut message = match packet.read_message() {
                Ok(message) => message,
                Err(err) => {
                    warn!(connection = index, error = %err, "stopping dispatch on unreadable message");
                    return;
                }
            };
            let type_index = message.type_index();
            let Some(definition) = self.registry.get_mut(type_index) else {
                warn!(connection = index, type_index, "no handler for message type");
                continue;
            };
            let handled = definition.invoke(&mut message, connection);
            self.metrics.record_dispatch(handled);
            if !handled {
                warn!(
                    connection = index,
                    message = definition.name(),
                    "message callback reported failure"
                );
            }
        }
    }

    /// Send at most one packet per populated connection, in slot order.
    ///
    /// A send failure other than would-block closes the socket.
    #[instrument(level = "trace", skip(self))]
    pub fn process_outgoing(&mut self) {
        let now = self.clock.now();
        let Some(socket) = self.socket.as_ref() else {
            return;
        };
        let mut fatal = None;
        for connection in self.connections.iter_mut().flatten() {
            match connection.process_outgoing(socket, now) {
                Ok(Some(flushed)) => {
                    self.registry.seal();
                    self.metrics
                        .record_packet_sent(flushed.bytes, flushed.messages);
                }
                Ok(None) => {}
                Err(TransportError::Socket(SocketError::Io(err)))
                    if err.kind() == std::io::ErrorKind::WouldBlock =>
                {
                    debug!(connection = connection.index(), "send would block, packet dropped");
                }
                Err(TransportError::Socket(err)) => {
                    fatal = Some(err);
                    break;
                }
                Err(err) => {
                    warn!(connection = connection.index(), error = %err, "packet not sent");
                }
            }
        }
        if let Some(err) = fatal {
            error!(error = %err, "send failed, closing socket");
            self.metrics.record_socket_error();
            self.socket = None;
        }
    }

    /// Counter snapshot.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.totals()
    }

    /// Datagrams waiting in the simulated delay queue.
    #[must_use]
    pub fn pending_deliveries(&self) -> usize {
        self.simulator.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::clock::ManualClock;
    use crate::transport::simulator::MAX_SIM_LAG;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Slot both peers use for each other in the recording session.
    const SLOT: u8 = 3;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn seeded() -> SessionConfig {
        SessionConfig {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            rng_seed: Some(11),
            ..SessionConfig::default()
        }
    }

    fn datagram(sender: u8, sequence: u16, messages: &[WireMessage]) -> BytesMut {
        let mut packet = WirePacket::new();
        packet
            .write_header(&PacketHeader::new(sender, sequence, 0, 0))
            .unwrap();
        for msg in messages {
            packet.write_message(msg).unwrap();
        }
        BytesMut::from(packet.as_bytes())
    }

    /// Session with "echo" registered; payload bytes land in the returned log.
    fn recording_session(clock: ManualClock) -> (Session, Rc<RefCell<Vec<u8>>>) {
        let mut session = Session::with_clock(seeded(), clock);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        session
            .register_message("echo", move |msg, _| {
                sink.borrow_mut().push(msg.read_u8().unwrap_or_default());
                true
            })
            .unwrap();
        session.add_connection(usize::from(SLOT), peer(4000)).unwrap();
        (session, log)
    }

    fn echo(value: u8) -> WireMessage {
        let mut msg = WireMessage::new(0);
        msg.write_u8(value).unwrap();
        msg
    }

    #[test]
    fn connection_slots_are_bounded() {
        let mut session = Session::new(seeded());
        assert!(matches!(
            session.add_connection(MAX_CONNECTIONS, peer(1)),
            Err(TransportError::InvalidConnectionIndex { index: 32, max: 32 })
        ));
        assert!(matches!(
            session.send(4, &WireMessage::new(0)),
            Err(TransportError::NoConnection { index: 4 })
        ));
    }

    #[test]
    fn replacing_connection_keeps_queue() {
        let mut session = Session::new(seeded());
        session.add_connection(5, peer(1)).unwrap();
        session.send(5, &WireMessage::new(0)).unwrap();
        session.add_connection(5, peer(2)).unwrap();

        assert_eq!(session.connections().count(), 1);
        let conn = session.connection(5).unwrap();
        assert_eq!(conn.address(), peer(2));
        assert_eq!(conn.queued(), 1);
        assert_eq!(session.connection_index(peer(2)), Some(5));
        assert_eq!(session.connection_index(peer(1)), None);
    }

    #[test]
    fn zero_lag_dispatches_on_arrival() {
        let (mut session, log) = recording_session(ManualClock::new());
        let now = session.clock.now();
        session.accept_datagram(now, peer(4000), datagram(SLOT, 1, &[echo(1), echo(2)]));
        assert_eq!(session.pending_deliveries(), 1);
        session.process_incoming_packet_queue();

        assert_eq!(*log.borrow(), vec![1, 2]);
        let metrics = session.metrics();
        assert_eq!(metrics.messages_dispatched, 2);
        assert_eq!(metrics.packets_delivered, 1);
        assert_eq!(session.connection(3).unwrap().acks().remote_sequence(), Some(1));
    }

    #[test]
    fn full_loss_dispatches_nothing() {
        let (mut session, log) = recording_session(ManualClock::new());
        session.set_sim_loss(1.0);
        let now = session.clock.now();
        for seq in 1..=20 {
            session.accept_datagram(now, peer(4000), datagram(SLOT, seq, &[echo(0)]));
        }
        session.process_incoming_packet_queue();
        assert!(log.borrow().is_empty());
        assert_eq!(session.metrics().simulated_drops, 20);
    }

    #[test]
    fn lag_holds_packets_until_due() {
        let clock = ManualClock::new();
        let (mut session, log) = recording_session(clock.clone());
        session.set_sim_lag(Duration::from_millis(50), Duration::from_millis(50));
        let now = session.clock.now();
        session.accept_datagram(now, peer(4000), datagram(SLOT, 1, &[echo(7)]));

        clock.advance(Duration::from_millis(49));
        session.process_incoming_packet_queue();
        assert!(log.borrow().is_empty());

        clock.advance(Duration::from_millis(1));
        session.process_incoming_packet_queue();
        assert_eq!(*log.borrow(), vec![7]);
        assert_eq!(session.metrics().avg_delivery_delay_us(), Some(50_000));
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let (mut session, log) = recording_session(ManualClock::new());
        let now = session.clock.now();
        session.accept_datagram(now, peer(5000), datagram(SLOT, 1, &[echo(1)]));
        session.process_incoming_packet_queue();
        assert!(log.borrow().is_empty());
        assert_eq!(session.metrics().unknown_senders, 1);
        assert_eq!(session.pending_deliveries(), 0);
    }

    #[test]
    fn empty_sender_slot_is_rejected() {
        let (mut session, log) = recording_session(ManualClock::new());
        let now = session.clock.now();
        session.accept_datagram(now, peer(4000), datagram(9, 1, &[echo(1)]));
        session.process_incoming_packet_queue();

        assert!(log.borrow().is_empty());
        let metrics = session.metrics();
        assert_eq!(metrics.malformed_packets, 1);
        assert_eq!(metrics.messages_dispatched, 0);

        let mut packet = WirePacket::from_slice(&datagram(9, 1, &[echo(1)]));
        assert_eq!(
            session.verify_packet(&mut packet).unwrap_err(),
            WireError::UnknownSender { index: 9 }
        );
    }

    #[test]
    fn sender_index_must_match_source_address() {
        let (mut session, log) = recording_session(ManualClock::new());
        session.add_connection(8, peer(4001)).unwrap();
        let now = session.clock.now();
        // slot 8 is populated, but the datagram comes from slot 3's address
        session.accept_datagram(now, peer(4000), datagram(8, 1, &[echo(1)]));
        session.process_incoming_packet_queue();

        assert!(log.borrow().is_empty());
        assert_eq!(session.metrics().malformed_packets, 1);
        assert_eq!(session.connection(8).unwrap().acks().remote_sequence(), None);
    }

    #[test]
    fn unbounded_lag_is_capped() {
        let clock = ManualClock::new();
        let (mut session, log) = recording_session(clock.clone());
        session.set_sim_lag(Duration::MAX, Duration::MAX);
        let now = session.clock.now();
        session.accept_datagram(now, peer(4000), datagram(SLOT, 1, &[echo(5)]));
        assert_eq!(session.pending_deliveries(), 1);

        clock.advance(MAX_SIM_LAG);
        session.process_incoming_packet_queue();
        assert_eq!(*log.borrow(), vec![5]);
    }

    #[test]
    fn malformed_and_unknown_type_packets_are_dropped_whole() {
        let (mut session, log) = recording_session(ManualClock::new());
        let now = session.clock.now();

        let mut truncated = datagram(SLOT, 1, &[echo(1)]);
        truncated.truncate(truncated.len() - 1);
        session.accept_datagram(now, peer(4000), truncated);

        let unknown = WireMessage::new(4);
        session.accept_datagram(now, peer(4000), datagram(SLOT, 2, &[echo(2), unknown]));

        session.process_incoming_packet_queue();
        assert!(log.borrow().is_empty());
        assert_eq!(session.metrics().malformed_packets, 2);
    }

    #[test]
    fn failing_callback_does_not_stop_dispatch() {
        let mut session = Session::with_clock(seeded(), ManualClock::new());
        let seen = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&seen);
        session
            .register_message("flaky", move |msg, _| {
                *counter.borrow_mut() += 1;
                msg.read_u8().unwrap_or_default() % 2 == 0
            })
            .unwrap();
        session.add_connection(0, peer(4000)).unwrap();
        let now = session.clock.now();
        session.accept_datagram(
            now,
            peer(4000),
            datagram(0, 1, &[echo(1), echo(2), echo(3)]),
        );
        session.process_incoming_packet_queue();

        assert_eq!(*seen.borrow(), 3);
        assert_eq!(session.metrics().callback_failures, 2);
    }

    #[test]
    fn registry_seals_after_traffic() {
        let (mut session, _log) = recording_session(ManualClock::new());
        session.register_message("zeta", |_, _| true).unwrap();
        let now = session.clock.now();
        session.accept_datagram(now, peer(4000), datagram(SLOT, 1, &[echo(1)]));
        session.process_incoming_packet_queue();

        assert!(matches!(
            session.register_message("alpha", |_, _| true),
            Err(TransportError::Registry(_))
        ));
        assert_eq!(session.message_index("zeta"), Some(1));
    }

    #[test]
    fn removing_connection_discards_delayed_packets() {
        let (mut session, log) = recording_session(ManualClock::new());
        session.set_sim_lag(Duration::from_secs(1), Duration::from_secs(1));
        let now = session.clock.now();
        session.accept_datagram(now, peer(4000), datagram(SLOT, 1, &[echo(1)]));

        let removed = session.remove_connection(3).unwrap();
        assert_eq!(removed.address(), peer(4000));
        assert_eq!(session.pending_deliveries(), 0);
        assert_eq!(session.metrics().orphaned_packets, 1);
        assert!(log.borrow().is_empty());
        assert!(session.remove_connection(3).is_none());
    }

    #[test]
    fn unbound_session_is_inert() {
        let mut session = Session::new(seeded());
        session.add_connection(0, peer(1)).unwrap();
        session.send(0, &WireMessage::new(0)).unwrap();
        session.process_incoming();
        session.process_outgoing();
        assert!(!session.is_bound());
        assert_eq!(session.connection(0).unwrap().queued(), 1);
        assert_eq!(session.metrics().packets_sent, 0);
    }
}
