use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use ticknet::protocol::{ByteCursor, MAX_MESSAGE_IN_PACKET, MESSAGE_HEADER_SIZE};
use ticknet::{PacketHeader, WireMessage, WirePacket};

fn bench_cursor(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor");

    group.throughput(Throughput::Elements(64));
    group.bench_function("write_varint_64", |b| {
        let mut cursor = ByteCursor::fixed(64 * 5);
        b.iter(|| {
            cursor.reset_write();
            for i in 0..64u32 {
                cursor.write_varint(black_box(i << (i % 28))).unwrap();
            }
        });
    });

    group.throughput(Throughput::Elements(32));
    group.bench_function("write_f32_32", |b| {
        let mut cursor = ByteCursor::fixed(32 * 4);
        b.iter(|| {
            cursor.reset_write();
            for i in 0..32u16 {
                cursor.write_f32(black_box(f32::from(i) * 0.5)).unwrap();
            }
        });
    });

    group.bench_function("string_roundtrip", |b| {
        let mut cursor = ByteCursor::fixed(64);
        b.iter(|| {
            cursor.reset_write();
            cursor.write_string(black_box("player-position-update")).unwrap();
            black_box(cursor.read_string().unwrap());
        });
    });

    group.finish();
}

fn bench_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("message");

    group.throughput(Throughput::Bytes(32));
    group.bench_function("build_transform", |b| {
        b.iter(|| {
            let mut msg = WireMessage::new(black_box(3));
            msg.write_u32(7).unwrap();
            for axis in [1.0f32, 2.0, 3.0, 0.0, 0.0, 0.0, 1.0] {
                msg.write_f32(axis).unwrap();
            }
            black_box(msg)
        });
    });

    group.finish();
}

fn full_packet() -> WirePacket {
    let mut packet = WirePacket::new();
    packet
        .write_header(&PacketHeader::new(0, 1, 0, 0))
        .unwrap();
    let payload = vec![0xA5; 61];
    loop {
        let mut msg = WireMessage::with_capacity(0, MESSAGE_HEADER_SIZE + payload.len());
        msg.write_raw(&payload).unwrap();
        if packet.write_message(&msg).is_err() {
            break;
        }
    }
    packet
}

fn bench_packet(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet");

    let packet = full_packet();
    group.throughput(Throughput::Bytes(packet.len() as u64));
    group.bench_function("verify_full", |b| {
        let mut packet = packet.clone();
        b.iter(|| black_box(packet.verify(32, 1).unwrap()));
    });

    group.bench_function("read_all_messages", |b| {
        let mut packet = packet.clone();
        b.iter(|| {
            let header = packet.read_header().unwrap();
            for _ in 0..header.message_count() {
                black_box(packet.read_message().unwrap());
            }
        });
    });

    group.throughput(Throughput::Bytes(MAX_MESSAGE_IN_PACKET as u64));
    group.bench_function("fill", |b| b.iter(|| black_box(full_packet())));

    group.finish();
}

criterion_group!(benches, bench_cursor, bench_message, bench_packet);
criterion_main!(benches);
