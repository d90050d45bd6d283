//! Transport layer performance benchmarks
//!
//! Measures per-tick bookkeeping without touching a socket.

use std::net::SocketAddr;
use std::time::Instant;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ticknet::transport::{AckTracker, LinkSimulator};
use ticknet::{Connection, WireMessage};

/// Benchmark packing a connection's queue into packets
fn bench_build_packet(c: &mut Criterion) {
    let mut group = c.benchmark_group("connection");
    let addr = SocketAddr::from(([127, 0, 0, 1], 7777));

    for queued in [1usize, 16, 64] {
        group.bench_with_input(BenchmarkId::new("build_packet", queued), &queued, |b, &queued| {
            let mut msg = WireMessage::new(0);
            msg.write_raw(&[0; 40]).unwrap();
            b.iter(|| {
                let mut conn = Connection::new(0, addr);
                for _ in 0..queued {
                    conn.send(&msg).unwrap();
                }
                let now = Instant::now();
                while let Some(packet) = conn.build_packet(now).unwrap() {
                    black_box(packet);
                }
            });
        });
    }

    group.finish();
}

/// Benchmark ack bookkeeping for a steady stream
fn bench_ack_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("ack_tracker");

    group.bench_function("send_receive_ack", |b| {
        let mut tracker = AckTracker::new();
        let now = Instant::now();
        let mut remote = 0u16;
        b.iter(|| {
            let stamp = tracker.on_send(now);
            remote = remote.wrapping_add(1).max(1);
            tracker.on_receive(black_box(remote));
            black_box(tracker.on_ack(stamp.sequence, 0xFFFF, now));
        });
    });

    group.finish();
}

/// Benchmark the loss trial
fn bench_simulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator");

    group.bench_function("survives", |b| {
        let mut sim = LinkSimulator::new(Some(1));
        sim.set_loss(0.1);
        b.iter(|| black_box(sim.survives()));
    });

    group.finish();
}

criterion_group!(benches, bench_build_packet, bench_ack_tracker, bench_simulator);
criterion_main!(benches);
