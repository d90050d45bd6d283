//! Ping-pong between two sessions on loopback

use std::cell::Cell;
use std::net::{IpAddr, Ipv4Addr};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use ticknet::{Session, SessionConfig, WireMessage};

const ROUNDS: u32 = 10;

fn register(session: &mut Session, replies: Option<Rc<Cell<u32>>>) -> Result<(), Box<dyn std::error::Error>> {
    session.register_message("ping", |msg, conn| {
        let Ok(value) = msg.read_u32() else {
            return false;
        };
        let mut pong = WireMessage::new(1);
        pong.write_u32(value).is_ok() && conn.send(&pong).is_ok()
    })?;
    session.register_message("pong", move |msg, _| match (msg.read_u32(), &replies) {
        (Ok(value), Some(replies)) => {
            println!("pong {value}");
            replies.set(replies.get() + 1);
            true
        }
        _ => false,
    })?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("ticknet Ping-Pong Example");
    println!("=========================\n");

    let config = SessionConfig {
        bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        port_range: 0,
        ..SessionConfig::default()
    };
    let mut client = Session::bind(config.clone())?;
    let mut server = Session::bind(config)?;
    let client_addr = client.local_addr().ok_or("client not bound")?;
    let server_addr = server.local_addr().ok_or("server not bound")?;
    println!("client {client_addr} <-> server {server_addr}");

    client.add_connection(0, server_addr)?;
    server.add_connection(0, client_addr)?;
    server.set_sim_lag(Duration::from_millis(5), Duration::from_millis(20));

    let replies = Rc::new(Cell::new(0));
    register(&mut client, Some(Rc::clone(&replies)))?;
    register(&mut server, None)?;

    let ping_index = client.message_index("ping").ok_or("ping not registered")?;
    for value in 0..ROUNDS {
        let mut ping = WireMessage::new(ping_index);
        ping.write_u32(value)?;
        client.send(0, &ping)?;
    }

    let start = Instant::now();
    while replies.get() < ROUNDS && start.elapsed() < Duration::from_secs(2) {
        client.process_outgoing();
        server.process_incoming();
        server.process_outgoing();
        client.process_incoming();
        thread::sleep(Duration::from_millis(1));
    }

    let stats = client.metrics();
    println!(
        "\n{} of {ROUNDS} pongs in {:?} ({} packets sent, {} received)",
        replies.get(),
        start.elapsed(),
        stats.packets_sent,
        stats.packets_received,
    );
    if let Some(rtt) = client.connection(0).and_then(|conn| conn.acks().last_rtt()) {
        println!("last round trip: {rtt:?}");
    }
    Ok(())
}
