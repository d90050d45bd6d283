//! Minimal non-blocking UDP socket wrapper.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};

use tracing::{debug, instrument};

/// Error type for socket operations.
#[derive(Debug)]
pub enum SocketError {
    /// Underlying I/O error
    Io(io::Error),
    /// Every port in the retry range was already bound
    PortsExhausted {
        /// First port tried
        first: u16,
        /// Last port tried
        last: u16,
    },
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "socket I/O error: {err}"),
            Self::PortsExhausted { first, last } => {
                write!(f, "no free port in {first}..={last}")
            }
        }
    }
}

impl std::error::Error for SocketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::PortsExhausted { .. } => None,
        }
    }
}

impl From<io::Error> for SocketError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Non-blocking UDP socket owned by a session.
#[derive(Debug)]
pub struct SocketBinding {
    socket: UdpSocket,
}

impl SocketBinding {
    /// Bind to exactly `addr`.
    pub fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket })
    }

    /// Bind to `port`, moving on to `port + 1 ..= port + range` while the
    /// address is in use.
    #[instrument(level = "debug")]
    pub fn bind_in_range(ip: IpAddr, port: u16, range: u16) -> Result<Self, SocketError> {
        let last = port.saturating_add(range);
        for candidate in port..=last {
            match Self::bind(SocketAddr::new(ip, candidate)) {
                Ok(binding) => return Ok(binding),
                Err(SocketError::Io(err)) if err.kind() == io::ErrorKind::AddrInUse => {
                    debug!(port = candidate, "port in use, trying next");
                }
                Err(err) => return Err(err),
            }
        }
        Err(SocketError::PortsExhausted { first: port, last })
    }

    /// Send one datagram.
    pub fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<usize, SocketError> {
        Ok(self.socket.send_to(buf, addr)?)
    }

    /// Receive one datagram if any is pending.
    pub fn try_recv_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, SocketError> {
        match self.socket.recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Access the local address for this binding.
    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.socket.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn ephemeral_bind_reports_port() {
        let binding = SocketBinding::bind_in_range(LOCALHOST, 0, 0).unwrap();
        assert_ne!(binding.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn recv_without_data_does_not_block() {
        let binding = SocketBinding::bind_in_range(LOCALHOST, 0, 0).unwrap();
        let mut buf = [0u8; 16];
        assert!(binding.try_recv_from(&mut buf).unwrap().is_none());
    }

    #[test]
    fn busy_port_moves_to_next() {
        let taken = SocketBinding::bind_in_range(LOCALHOST, 0, 0).unwrap();
        let port = taken.local_addr().unwrap().port();
        if port == u16::MAX {
            return;
        }
        match SocketBinding::bind_in_range(LOCALHOST, port, 1) {
            Ok(binding) => assert_eq!(binding.local_addr().unwrap().port(), port + 1),
            // the neighbouring port may belong to another process
            Err(err) => assert!(matches!(err, SocketError::PortsExhausted { .. })),
        }
    }

    #[test]
    fn busy_port_without_range_fails() {
        let taken = SocketBinding::bind_in_range(LOCALHOST, 0, 0).unwrap();
        let port = taken.local_addr().unwrap().port();
        let err = SocketBinding::bind_in_range(LOCALHOST, port, 0).unwrap_err();
        assert!(matches!(
            err,
            SocketError::PortsExhausted { first, last } if first == port && last == port
        ));
    }
}
