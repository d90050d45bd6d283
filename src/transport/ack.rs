//! Sequence numbering and acknowledgement bookkeeping.
//!
//! Each outgoing packet is stamped with a 16-bit sequence (the header's
//! `ack` field), the newest sequence received from the peer and a bitfield
//! covering the [`ACK_WINDOW`] sequences before it. Sequence `0` is never
//! stamped so that a peer which has received nothing can say so with a zero
//! `last_received_ack`.
//!
//! Nothing here retransmits; lost packets are only counted.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::trace;

/// Sequences covered by the ack bitfield in addition to `last_received_ack`.
pub const ACK_WINDOW: u16 = 16;

/// Sent packets remembered while waiting for acknowledgement.
pub const MAX_IN_FLIGHT: usize = 256;

/// Whether `a` is newer than `b`, accounting for wrap-around.
#[must_use]
pub const fn sequence_greater_than(a: u16, b: u16) -> bool {
    (a > b && a - b <= 0x8000) || (a < b && b - a > 0x8000)
}

const fn next_sequence(sequence: u16) -> u16 {
    match sequence.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

/// Gap from `older` up to `newer`, skipping the reserved zero sequence.
const fn sequence_distance(newer: u16, older: u16) -> u16 {
    let raw = newer.wrapping_sub(older);
    if newer < older && older != 0 {
        raw.wrapping_sub(1)
    } else {
        raw
    }
}

/// Ack fields to stamp on one outgoing packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutgoingAck {
    /// Sequence of the packet being sent.
    pub sequence: u16,
    /// Newest sequence received from the peer, or `0`.
    pub last_received: u16,
    /// Receipt of the [`ACK_WINDOW`] sequences before `last_received`.
    pub bitfield: u16,
}

/// Result of applying a peer's ack fields.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AckOutcome {
    /// Our sequences newly acknowledged.
    pub acknowledged: Vec<u16>,
    /// Our sequences that fell out of the ack window unacknowledged.
    pub lost: Vec<u16>,
    /// Round trip of the newest acknowledged packet.
    pub rtt_sample: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
struct SentPacket {
    sequence: u16,
    sent_at: Instant,
}

/// Per-connection sequence and ack state.
#[derive(Debug, Clone)]
pub struct AckTracker {
    next_local: u16,
    remote: Option<u16>,
    received_bits: u16,
    in_flight: VecDeque<SentPacket>,
    acknowledged_total: u64,
    lost_total: u64,
    last_rtt: Option<Duration>,
}

impl Default for AckTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AckTracker {
    /// Tracker that has neither sent nor received anything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_local: 1,
            remote: None,
            received_bits: 0,
            in_flight: VecDeque::new(),
            acknowledged_total: 0,
            lost_total: 0,
            last_rtt: None,
        }
    }

    /// Allocate a sequence for an outgoing packet and remember it.
    pub fn on_send(&mut self, now: Instant) -> OutgoingAck {
        let sequence = self.next_local;
        self.next_local = next_sequence(sequence);
        if self.in_flight.len() >= MAX_IN_FLIGHT {
            if let Some(evicted) = self.in_flight.pop_front() {
                trace!(sequence = evicted.sequence, "in-flight window full, counting as lost");
                self.lost_total += 1;
            }
        }
        self.in_flight.push_back(SentPacket {
            sequence,
            sent_at: now,
        });
        OutgoingAck {
            sequence,
            last_received: self.remote.unwrap_or(0),
            bitfield: self.received_bits,
        }
    }

    /// Record a sequence received from the peer.
    ///
    /// Returns `false` for duplicates and for sequences too old to track.
    pub fn on_receive(&mut self, sequence: u16) -> bool {
        if sequence == 0 {
            return false;
        }
        let Some(remote) = self.remote else {
            self.remote = Some(sequence);
            self.received_bits = 0;
            return true;
        };
        if sequence_greater_than(sequence, remote) {
            let shift = u32::from(sequence_distance(sequence, remote));
            let shifted = if shift > u32::from(ACK_WINDOW) {
                0
            } else {
                ((u32::from(self.received_bits) << shift) | (1 << (shift - 1))) as u16
            };
            self.received_bits = shifted;
            self.remote = Some(sequence);
            return true;
        }
        let distance = sequence_distance(remote, sequence);
        if distance == 0 || distance > ACK_WINDOW {
            return false;
        }
        let bit = 1u16 << (distance - 1);
        if self.received_bits & bit != 0 {
            return false;
        }
        self.received_bits |= bit;
        true
    }

    /// Apply the ack fields of a packet from the peer.
    pub fn on_ack(&mut self, last_received: u16, bitfield: u16, now: Instant) -> AckOutcome {
        let mut outcome = AckOutcome::default();
        if last_received == 0 {
            return outcome;
        }
        let mut newest: Option<SentPacket> = None;
        let mut remaining = VecDeque::with_capacity(self.in_flight.len());
        for sent in self.in_flight.drain(..) {
            if sequence_greater_than(sent.sequence, last_received) {
                remaining.push_back(sent);
                continue;
            }
            let distance = sequence_distance(last_received, sent.sequence);
            let acked = distance == 0
                || (distance <= ACK_WINDOW && bitfield & (1 << (distance - 1)) != 0);
            if acked {
                outcome.acknowledged.push(sent.sequence);
                if newest.is_none_or(|current| sequence_greater_than(sent.sequence, current.sequence)) {
                    newest = Some(sent);
                }
            } else if distance > ACK_WINDOW {
                outcome.lost.push(sent.sequence);
            } else {
                remaining.push_back(sent);
            }
        }
        self.in_flight = remaining;
        outcome.rtt_sample = newest.map(|sent| now.saturating_duration_since(sent.sent_at));
        if outcome.rtt_sample.is_some() {
            self.last_rtt = outcome.rtt_sample;
        }
        self.acknowledged_total += outcome.acknowledged.len() as u64;
        self.lost_total += outcome.lost.len() as u64;
        outcome
    }

    /// Newest sequence received from the peer.
    #[must_use]
    pub const fn remote_sequence(&self) -> Option<u16> {
        self.remote
    }

    /// Sequence the next outgoing packet will carry.
    #[must_use]
    pub const fn next_sequence(&self) -> u16 {
        self.next_local
    }

    /// Packets sent and neither acknowledged nor declared lost.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Total packets the peer acknowledged.
    #[must_use]
    pub const fn acknowledged_total(&self) -> u64 {
        self.acknowledged_total
    }

    /// Total packets declared lost.
    #[must_use]
    pub const fn lost_total(&self) -> u64 {
        self.lost_total
    }

    /// Most recent round-trip sample.
    #[must_use]
    pub const fn last_rtt(&self) -> Option<Duration> {
        self.last_rtt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraparound_ordering() {
        assert!(sequence_greater_than(1, 0));
        assert!(sequence_greater_than(2, 65_535));
        assert!(!sequence_greater_than(65_535, 2));
        assert!(!sequence_greater_than(7, 7));
    }

    #[test]
    fn sequences_skip_zero() {
        let mut tracker = AckTracker::new();
        tracker.next_local = u16::MAX;
        let now = Instant::now();
        assert_eq!(tracker.on_send(now).sequence, u16::MAX);
        assert_eq!(tracker.on_send(now).sequence, 1);
    }

    #[test]
    fn receive_builds_bitfield() {
        let mut tracker = AckTracker::new();
        assert!(tracker.on_receive(1));
        assert!(tracker.on_receive(2));
        assert!(tracker.on_receive(4));
        assert!(!tracker.on_receive(4));
        assert_eq!(tracker.remote_sequence(), Some(4));
        // 3 missing, 2 and 1 present
        assert_eq!(tracker.received_bits, 0b110);
        assert!(tracker.on_receive(3));
        assert_eq!(tracker.received_bits, 0b111);
        assert!(!tracker.on_receive(2));
    }

    #[test]
    fn receive_across_wrap() {
        let mut tracker = AckTracker::new();
        assert!(tracker.on_receive(u16::MAX));
        assert!(tracker.on_receive(1));
        assert_eq!(tracker.remote_sequence(), Some(1));
        assert_eq!(tracker.received_bits, 0b1);
    }

    #[test]
    fn large_jump_clears_history() {
        let mut tracker = AckTracker::new();
        tracker.on_receive(1);
        tracker.on_receive(100);
        assert_eq!(tracker.received_bits, 0);
        assert!(!tracker.on_receive(50));
    }

    #[test]
    fn outgoing_carries_receive_state() {
        let mut tracker = AckTracker::new();
        let first = tracker.on_send(Instant::now());
        assert_eq!(first.last_received, 0);
        tracker.on_receive(5);
        tracker.on_receive(6);
        let second = tracker.on_send(Instant::now());
        assert_eq!(second.last_received, 6);
        assert_eq!(second.bitfield, 0b1);
    }

    #[test]
    fn ack_marks_window_and_loss() {
        let mut tracker = AckTracker::new();
        let start = Instant::now();
        for _ in 0..20 {
            tracker.on_send(start);
        }
        let later = start + Duration::from_millis(40);
        // peer saw 20 and 19, skipped 18, saw 17
        let outcome = tracker.on_ack(20, 0b101, later);
        assert_eq!(outcome.acknowledged, vec![17, 19, 20]);
        assert_eq!(outcome.lost, vec![1, 2, 3]);
        assert_eq!(outcome.rtt_sample, Some(Duration::from_millis(40)));
        assert_eq!(tracker.in_flight(), 14);
        assert_eq!(tracker.acknowledged_total(), 3);
        assert_eq!(tracker.lost_total(), 3);
    }

    #[test]
    fn zero_last_received_is_ignored() {
        let mut tracker = AckTracker::new();
        tracker.on_send(Instant::now());
        let outcome = tracker.on_ack(0, u16::MAX, Instant::now());
        assert!(outcome.acknowledged.is_empty());
        assert_eq!(tracker.in_flight(), 1);
    }
}
