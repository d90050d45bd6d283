use std::time::Duration;

const NANOSECONDS_PER_MICROSECOND: u128 = 1_000;

/// Why an incoming datagram never reached dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DropReason {
    /// Discarded by the loss simulation.
    Simulated,
    /// Source address has no connection.
    UnknownSender,
    /// Failed structural verification.
    Malformed,
    /// Connection slot emptied while the packet was delayed.
    ConnectionGone,
}

/// Per-session counters.
#[derive(Default, Debug)]
pub(crate) struct Metrics {
    snapshot: MetricsSnapshot,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_packet_sent(&mut self, bytes: usize, messages: usize) {
        self.snapshot.packets_sent += 1;
        self.snapshot.bytes_sent += bytes as u64;
        self.snapshot.messages_sent += messages as u64;
    }

    #[inline]
    pub(crate) fn record_packet_received(&mut self, bytes: usize) {
        self.snapshot.packets_received += 1;
        self.snapshot.bytes_received += bytes as u64;
    }

    #[inline]
    pub(crate) fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::Simulated => self.snapshot.simulated_drops += 1,
            DropReason::UnknownSender => self.snapshot.unknown_senders += 1,
            DropReason::Malformed => self.snapshot.malformed_packets += 1,
            DropReason::ConnectionGone => self.snapshot.orphaned_packets += 1,
        }
    }

    #[inline]
    pub(crate) fn record_dispatch(&mut self, handled: bool) {
        self.snapshot.messages_dispatched += 1;
        if !handled {
            self.snapshot.callback_failures += 1;
        }
    }

    #[inline]
    pub(crate) fn record_socket_error(&mut self) {
        self.snapshot.socket_errors += 1;
    }

    #[inline]
    pub(crate) fn record_delivery_delay(&mut self, delay: Duration) {
        let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        self.snapshot.delivery_delay_total_ns =
            self.snapshot.delivery_delay_total_ns.saturating_add(nanos);
        self.snapshot.delivery_delay_max_ns = self.snapshot.delivery_delay_max_ns.max(nanos);
        self.snapshot.packets_delivered += 1;
    }

    #[inline]
    pub(crate) fn totals(&self) -> MetricsSnapshot {
        self.snapshot
    }
}

/// Snapshot of a session's counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Datagrams handed to the socket.
    pub packets_sent: u64,
    /// Bytes handed to the socket.
    pub bytes_sent: u64,
    /// Messages carried by sent datagrams.
    pub messages_sent: u64,
    /// Datagrams read from the socket.
    pub packets_received: u64,
    /// Bytes read from the socket.
    pub bytes_received: u64,
    /// Datagrams discarded by the loss simulation.
    pub simulated_drops: u64,
    /// Datagrams from addresses without a connection.
    pub unknown_senders: u64,
    /// Datagrams rejected by verification.
    pub malformed_packets: u64,
    /// Delayed datagrams whose connection was removed before delivery.
    pub orphaned_packets: u64,
    /// Datagrams that left the delay queue and passed verification.
    pub packets_delivered: u64,
    /// Messages handed to callbacks.
    pub messages_dispatched: u64,
    /// Callbacks that returned `false`.
    pub callback_failures: u64,
    /// Send or receive failures other than would-block.
    pub socket_errors: u64,
    /// Sum of simulated delivery delays.
    pub delivery_delay_total_ns: u64,
    /// Largest simulated delivery delay.
    pub delivery_delay_max_ns: u64,
}

impl MetricsSnapshot {
    /// Average simulated delivery delay in microseconds.
    #[must_use]
    pub fn avg_delivery_delay_us(&self) -> Option<u64> {
        average_microseconds(self.delivery_delay_total_ns, self.packets_delivered)
    }
}

fn average_microseconds(total_ns: u64, count: u64) -> Option<u64> {
    if count == 0 {
        return None;
    }

    let total_ns_u128 = u128::from(total_ns);
    Some((total_ns_u128 / (u128::from(count) * NANOSECONDS_PER_MICROSECOND)) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_are_bucketed() {
        let mut metrics = Metrics::default();
        metrics.record_drop(DropReason::Simulated);
        metrics.record_drop(DropReason::Simulated);
        metrics.record_drop(DropReason::UnknownSender);
        metrics.record_drop(DropReason::Malformed);
        let totals = metrics.totals();
        assert_eq!(totals.simulated_drops, 2);
        assert_eq!(totals.unknown_senders, 1);
        assert_eq!(totals.malformed_packets, 1);
        assert_eq!(totals.orphaned_packets, 0);
    }

    #[test]
    fn average_delay() {
        let mut metrics = Metrics::default();
        assert_eq!(metrics.totals().avg_delivery_delay_us(), None);
        metrics.record_delivery_delay(Duration::from_millis(2));
        metrics.record_delivery_delay(Duration::from_millis(4));
        let totals = metrics.totals();
        assert_eq!(totals.avg_delivery_delay_us(), Some(3_000));
        assert_eq!(totals.delivery_delay_max_ns, 4_000_000);
    }
}
