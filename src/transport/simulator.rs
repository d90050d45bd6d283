//! Loss and lag injection for incoming datagrams.
//!
//! Every received datagram first survives a Bernoulli trial with success
//! probability `1 - loss`, then waits in a queue until `now + lag`, where
//! `lag` is drawn uniformly from the configured window. The queue stays
//! sorted by delivery time; entries with equal times keep arrival order, so
//! the due prefix is always released oldest-deadline first.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::protocol::WirePacket;

/// Upper bound for either end of the simulated delay window.
pub const MAX_SIM_LAG: Duration = Duration::from_secs(60);

/// A datagram waiting for its simulated delivery time.
#[derive(Debug)]
pub(crate) struct DelayedPacket {
    pub(crate) connection: usize,
    pub(crate) packet: WirePacket,
    pub(crate) received_at: Instant,
    pub(crate) deliver_at: Instant,
}

/// Fault model plus the delayed-delivery queue.
#[derive(Debug)]
pub struct LinkSimulator {
    rng: StdRng,
    loss: f64,
    lag_min: Duration,
    lag_max: Duration,
    queue: VecDeque<DelayedPacket>,
}

impl LinkSimulator {
    /// Pass-through simulator. A seed makes loss and lag reproducible.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            loss: 0.0,
            lag_min: Duration::ZERO,
            lag_max: Duration::ZERO,
            queue: VecDeque::new(),
        }
    }

    /// Set the drop probability, clamped to `[0, 1]`.
    pub fn set_loss(&mut self, probability: f64) {
        self.loss = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
    }

    /// Set the delay window; both ends are capped at [`MAX_SIM_LAG`] and
    /// `max` is raised to `min` when smaller.
    pub fn set_lag(&mut self, min: Duration, max: Duration) {
        self.lag_min = min.min(MAX_SIM_LAG);
        self.lag_max = max.min(MAX_SIM_LAG).max(self.lag_min);
    }

    /// Drop probability.
    #[must_use]
    pub const fn loss(&self) -> f64 {
        self.loss
    }

    /// Delay window.
    #[must_use]
    pub const fn lag(&self) -> (Duration, Duration) {
        (self.lag_min, self.lag_max)
    }

    /// Bernoulli trial: `true` when the datagram survives.
    pub fn survives(&mut self) -> bool {
        self.rng.gen_bool(1.0 - self.loss)
    }

    fn sample_lag(&mut self) -> Duration {
        if self.lag_min == self.lag_max {
            self.lag_min
        } else {
            self.rng.gen_range(self.lag_min..=self.lag_max)
        }
    }

    /// Queue `packet` for delivery after a sampled delay.
    pub(crate) fn schedule(&mut self, now: Instant, connection: usize, packet: WirePacket) -> Instant {
        let lag = self.sample_lag();
        // an instant this far out cannot be represented; deliver now instead
        let deliver_at = now.checked_add(lag).unwrap_or(now);
        let position = self
            .queue
            .partition_point(|entry| entry.deliver_at <= deliver_at);
        self.queue.insert(
            position,
            DelayedPacket {
                connection,
                packet,
                received_at: now,
                deliver_at,
            },
        );
        deliver_at
    }

    /// Remove the earliest entry if it is due.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<DelayedPacket> {
        if self.queue.front()?.deliver_at <= now {
            self.queue.pop_front()
        } else {
            None
        }
    }

    /// Datagrams waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drop everything queued for `connection`; returns how many.
    pub(crate) fn discard_connection(&mut self, connection: usize) -> usize {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.connection != connection);
        before - self.queue.len()
    }
}
