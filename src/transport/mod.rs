//! Session transport over non-blocking UDP.
//!
//! A [`Session`] owns the socket, a fixed table of [`Connection`]s, the
//! [`MessageRegistry`] and a [`LinkSimulator`] that can inject loss and lag
//! into incoming traffic. Nothing blocks and nothing spawns threads; the
//! owner calls [`Session::process_incoming`] and
//! [`Session::process_outgoing`] once per tick.

mod ack;
mod clock;
mod connection;
mod error;
mod metrics;
mod registry;
mod session;
mod simulator;
mod socket;

pub use ack::{ACK_WINDOW, AckOutcome, AckTracker, MAX_IN_FLIGHT, OutgoingAck, sequence_greater_than};
pub use clock::{Clock, ManualClock, SystemClock};
pub use connection::{Connection, Flushed, MAX_CONNECTIONS};
pub use error::TransportError;
pub use metrics::MetricsSnapshot;
pub use registry::{
    MAX_MESSAGE_TYPES, MessageCallback, MessageDefinition, MessageRegistry, RegistryError,
};
pub use session::{DEFAULT_PORT, DEFAULT_PORT_RANGE, Session, SessionConfig};
pub use simulator::{LinkSimulator, MAX_SIM_LAG};
pub use socket::{SocketBinding, SocketError};
